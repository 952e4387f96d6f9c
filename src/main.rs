use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use voice_agents::commerce::OrderStore;
use voice_agents::config::{load_config, load_dotenv, AgentConfig};
use voice_agents::console::run_console;
use voice_agents::fraud::FraudDatabase;
use voice_agents::llm::client::{GroqLLM, LLMConfig};
use voice_agents::llm::integration::LLMIntegration;
use voice_agents::Persona;

#[derive(Parser, Debug)]
#[command(name = "voice-agent", author, version, about, long_about = None)]
struct Args {
    /// Directory for orders, leads and the fraud database (overrides VOICE_AGENT_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Seconds between simulated delivery updates (overrides DELIVERY_TICK_SECS)
    #[arg(long, global = true)]
    delivery_tick_secs: Option<u64>,

    /// Chat model to use (overrides LLM_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Talk to an agent through the terminal
    Console {
        #[arg(long, value_enum, default_value_t = Persona::Shop)]
        persona: Persona,
    },
    /// Manage the fraud case database
    FraudDb {
        #[command(subcommand)]
        action: FraudDbAction,
    },
    /// Inspect and cancel shop orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// List the models available to the configured API key
    Models,
}

#[derive(Subcommand, Debug)]
enum FraudDbAction {
    /// Create the database and table
    Init,
    /// Insert the sample cases if the database is empty
    Seed,
    List,
    Stats,
    Export {
        #[arg(default_value = "fraud_cases_backup.json")]
        path: PathBuf,
    },
    /// Replace every case with the contents of a JSON backup
    Import { path: PathBuf },
    /// Delete every case
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum OrdersAction {
    List,
    Show { id: String },
    Cancel { id: String },
}

fn agent_config(args: &Args) -> Result<AgentConfig> {
    let mut config = AgentConfig::from_env().context("Invalid agent configuration")?;
    if let Some(dir) = &args.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(secs) = args.delivery_tick_secs {
        if secs == 0 {
            bail!("--delivery-tick-secs must be at least 1");
        }
        config = config.with_delivery_tick(Duration::from_secs(secs));
    }
    if let Some(model) = &args.model {
        config.model = Some(model.clone());
    }
    Ok(config)
}

async fn console(config: &AgentConfig, persona: Persona) -> Result<()> {
    let api_config = load_config().context("Failed to load configuration")?;
    let integration = LLMIntegration::new(&api_config, config, persona)
        .context("Failed to initialize LLM integration")?;
    log::info!("🤖 LLM integration initialized");

    run_console(integration, persona).await?;
    Ok(())
}

fn fraud_db(config: &AgentConfig, action: FraudDbAction) -> Result<()> {
    let path = config.fraud_db_file();
    let db = FraudDatabase::open(&path)
        .with_context(|| format!("Failed to open fraud database at {}", path.display()))?;

    match action {
        FraudDbAction::Init => println!("✅ Fraud database ready at {}", path.display()),
        FraudDbAction::Seed => {
            let added = db.seed_sample_cases()?;
            if added == 0 {
                println!("ℹ️  Database already has cases, nothing seeded");
            } else {
                println!("🌱 Seeded {} sample cases", added);
            }
        }
        FraudDbAction::List => {
            let cases = db.all_cases()?;
            if cases.is_empty() {
                println!("No fraud cases. Run `voice-agent fraud-db seed` to add samples.");
            }
            for case in cases {
                println!(
                    "{}  {:<16} card *{}  {:<20} {} at {}",
                    case.id,
                    case.user_name,
                    case.card_ending,
                    case.status,
                    case.transaction_amount,
                    case.transaction_name
                );
            }
        }
        FraudDbAction::Stats => {
            let stats = db.statistics()?;
            println!("📊 Fraud case statistics");
            println!("   total:               {}", stats.total_cases);
            println!("   pending:             {}", stats.pending);
            println!("   confirmed fraud:     {}", stats.confirmed_fraud);
            println!("   confirmed safe:      {}", stats.confirmed_safe);
            println!("   verification failed: {}", stats.verification_failed);
        }
        FraudDbAction::Export { path } => {
            let count = db.export_to_json(&path)?;
            println!("💾 Exported {} cases to {}", count, path.display());
        }
        FraudDbAction::Import { path } => {
            let count = db
                .import_from_json(&path)
                .with_context(|| format!("Failed to import {}", path.display()))?;
            println!("📥 Imported {} cases from {}", count, path.display());
        }
        FraudDbAction::Clear { yes } => {
            if !yes {
                bail!("Refusing to delete every case without --yes");
            }
            let removed = db.clear_all()?;
            println!("🧹 Deleted {} cases", removed);
        }
    }
    Ok(())
}

fn orders(config: &AgentConfig, action: OrdersAction) -> Result<()> {
    let store = OrderStore::open(config.orders_file())?;

    match action {
        OrdersAction::List => {
            let orders = store.list();
            if orders.is_empty() {
                println!("No orders yet in {}", store.path().display());
            }
            for order in orders {
                println!(
                    "{}  {:<17} {:>7} {}  {}",
                    order.id, order.status, order.total, order.currency, order.created_at
                );
            }
        }
        OrdersAction::Show { id } => {
            let order = store
                .find(&id)
                .with_context(|| format!("Order {} not found", id))?;
            println!("{}", serde_json::to_string_pretty(&order)?);
        }
        OrdersAction::Cancel { id } => {
            let order = store.cancel(&id)?;
            println!("🛑 Order {} is now {}", order.id, order.status);
        }
    }
    Ok(())
}

async fn models(config: &AgentConfig) -> Result<()> {
    let api_config = load_config().context("Failed to load configuration")?;
    let llm = GroqLLM::with_config(
        api_config.groq_key().to_string(),
        &config.base_url,
        LLMConfig::for_agent(config),
    )?;

    for model in llm.get_models().await? {
        let marker = if model == llm.model() { " (selected)" } else { "" };
        println!("{}{}", model, marker);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = agent_config(&args)?;
    log::info!("🚀 Data directory: {}", config.data_dir.display());

    match args.command {
        Command::Console { persona } => console(&config, persona).await,
        Command::FraudDb { action } => fraud_db(&config, action),
        Command::Orders { action } => orders(&config, action),
        Command::Models => models(&config).await,
    }
}
