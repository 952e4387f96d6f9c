//! The agents this binary can run, and what each one brings with it.

use clap::ValueEnum;
use std::sync::Arc;
use strum::{Display, EnumString};

use crate::commerce::OrderStore;
use crate::config::AgentConfig;
use crate::error::Result;
use crate::fraud::FraudDatabase;
use crate::llm::prompts::{PromptBuilder, SystemPrompts};
use crate::llm::tools::barista::BaristaTools;
use crate::llm::tools::fraud::FraudTools;
use crate::llm::tools::sdr::SdrTools;
use crate::llm::tools::shop::ShopTools;
use crate::llm::tools::tutor::TutorTools;
use crate::llm::tools::ToolRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Persona {
    /// Ramu Kaka at Dr Abhishek Shop
    Shop,
    /// Card fraud alert desk
    Fraud,
    /// Coffee shop order taker
    Barista,
    /// Sales development rep
    Sdr,
    /// Programming tutor
    Tutor,
}

impl Persona {
    fn persona_prompt(self) -> &'static str {
        match self {
            Persona::Shop => SystemPrompts::shopkeeper(),
            Persona::Fraud => SystemPrompts::fraud_analyst(),
            Persona::Barista => SystemPrompts::barista(),
            Persona::Sdr => SystemPrompts::sales_rep(),
            Persona::Tutor => SystemPrompts::tutor(),
        }
    }

    /// Full system prompt: persona block, today's date and the voice rules
    pub fn instructions(self) -> String {
        PromptBuilder::new()
            .add_persona(self.persona_prompt())
            .add_context(&format!(
                "Today's date is {}",
                chrono::Local::now().format("%A, %-d %B %Y")
            ))
            .add_guidelines(SystemPrompts::voice_guidelines())
            .build()
    }

    /// First thing the agent says when a session starts
    pub fn greeting(self) -> &'static str {
        match self {
            Persona::Shop => {
                "Namaste! Ramu Kaka here from Dr Abhishek Shop. Looking for mugs, tees, hoodies, or maybe a new phone?"
            }
            Persona::Fraud => {
                "Hello, this is Meera from the card security desk. We noticed an unusual transaction. May I have your full name, please?"
            }
            Persona::Barista => "Hi, welcome to Brew Haven! What can I get started for you today?",
            Persona::Sdr => {
                "Hi, this is Arjun from Dr Abhishek Shop for Business. What brings you to us today?"
            }
            Persona::Tutor => {
                "Hello! I'm Professor Priya. Would you like to learn, be quizzed, or teach a concept back to me?"
            }
        }
    }

    /// Open this persona's stores and register its tools
    pub fn build_registry(self, config: &AgentConfig) -> Result<ToolRegistry> {
        let mut registry = ToolRegistry::new();

        match self {
            Persona::Shop => {
                let orders = Arc::new(OrderStore::open(config.orders_file())?);
                registry.register_toolbox(Arc::new(ShopTools::new(orders, config.delivery_tick)));
            }
            Persona::Fraud => {
                let db = FraudDatabase::open(config.fraud_db_file())?;
                let seeded = db.seed_sample_cases()?;
                if seeded > 0 {
                    log::info!("🌱 Seeded {} sample fraud cases", seeded);
                }
                registry.register_toolbox(Arc::new(FraudTools::new(Arc::new(db))));
            }
            Persona::Barista => {
                registry.register_toolbox(Arc::new(BaristaTools::new(config.coffee_orders_file())));
            }
            Persona::Sdr => {
                registry.register_toolbox(Arc::new(SdrTools::new(config.leads_file())));
            }
            Persona::Tutor => {
                registry.register_toolbox(Arc::new(TutorTools::new(config.tutor_progress_file())));
            }
        }

        Ok(registry)
    }
}
