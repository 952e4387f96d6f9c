//! Coffee shop barista: builds up one drink order per conversation.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::{
    check_cancelled, no_parameters, opt_str_arg, str_list_arg, Tool, ToolError, ToolResult,
    Toolbox,
};
use crate::commerce::orders::utc_now;
use crate::store::JsonListStore;

pub const DRINK_SIZES: &[&str] = &["small", "medium", "large"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoffeeOrder {
    pub drink_type: Option<String>,
    pub size: Option<String>,
    pub milk: Option<String>,
    #[serde(default)]
    pub extras: Vec<String>,
    pub name: Option<String>,
}

impl CoffeeOrder {
    /// Fields still needed before the order can be saved
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.drink_type.is_none() {
            missing.push("drink_type");
        }
        if self.size.is_none() {
            missing.push("size");
        }
        if self.milk.is_none() {
            missing.push("milk");
        }
        if self.name.is_none() {
            missing.push("name");
        }
        missing
    }

    pub fn describe(&self) -> String {
        let unset = || "not chosen yet".to_string();
        let extras = if self.extras.is_empty() {
            "none".to_string()
        } else {
            self.extras.join(", ")
        };
        format!(
            "Drink: {}. Size: {}. Milk: {}. Extras: {}. Name: {}.",
            self.drink_type.clone().unwrap_or_else(unset),
            self.size.clone().unwrap_or_else(unset),
            self.milk.clone().unwrap_or_else(unset),
            extras,
            self.name.clone().unwrap_or_else(unset)
        )
    }
}

/// A finished order as written to `coffee_orders.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCoffeeOrder {
    pub drink_type: String,
    pub size: String,
    pub milk: String,
    pub extras: Vec<String>,
    pub name: String,
    pub timestamp: String,
}

pub struct BaristaTools {
    order: Mutex<CoffeeOrder>,
    store: JsonListStore<SavedCoffeeOrder>,
}

impl BaristaTools {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            order: Mutex::new(CoffeeOrder::default()),
            store: JsonListStore::new(path),
        }
    }

    pub async fn current_order(&self) -> CoffeeOrder {
        self.order.lock().await.clone()
    }

    pub fn saved_orders(&self) -> Vec<SavedCoffeeOrder> {
        self.store.load_all()
    }

    async fn update_coffee_order(&self, arguments: &Value) -> Result<ToolResult, ToolError> {
        let size = opt_str_arg(arguments, "size").map(|s| s.to_lowercase());
        if let Some(size) = &size {
            if !DRINK_SIZES.contains(&size.as_str()) {
                return Ok(ToolResult::Escalation(format!(
                    "We only have {} sizes. Ask the customer to pick one.",
                    DRINK_SIZES.join(", ")
                )));
            }
        }

        let mut order = self.order.lock().await;
        if let Some(drink) = opt_str_arg(arguments, "drink_type") {
            order.drink_type = Some(drink.to_lowercase());
        }
        if size.is_some() {
            order.size = size;
        }
        if let Some(milk) = opt_str_arg(arguments, "milk") {
            order.milk = Some(milk.to_lowercase());
        }
        if let Some(extras) = str_list_arg(arguments, "extras") {
            order.extras = extras.into_iter().map(|e| e.to_lowercase()).collect();
        }
        if let Some(name) = opt_str_arg(arguments, "name") {
            order.name = Some(name);
        }

        let missing = order.missing_fields();
        let next = if missing.is_empty() {
            "The order is complete. Read it back and save it once the customer confirms.".to_string()
        } else {
            format!("Still need: {}.", missing.join(", "))
        };
        Ok(ToolResult::Response(format!("{} {}", order.describe(), next)))
    }

    async fn show_coffee_order(&self) -> Result<ToolResult, ToolError> {
        let order = self.order.lock().await;
        Ok(ToolResult::Response(order.describe()))
    }

    async fn save_coffee_order(&self) -> Result<ToolResult, ToolError> {
        let mut order = self.order.lock().await;

        let (Some(drink_type), Some(size), Some(milk), Some(name)) = (
            order.drink_type.clone(),
            order.size.clone(),
            order.milk.clone(),
            order.name.clone(),
        ) else {
            return Ok(ToolResult::Escalation(format!(
                "The order is incomplete. Still need: {}.",
                order.missing_fields().join(", ")
            )));
        };

        let saved = SavedCoffeeOrder {
            drink_type,
            size,
            milk,
            extras: order.extras.clone(),
            name,
            timestamp: utc_now(),
        };
        self.store
            .append(saved.clone())
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        log::info!("☕ Saved coffee order for {}", saved.name);

        *order = CoffeeOrder::default();
        Ok(ToolResult::Response(format!(
            "Order saved: a {} {} with {} milk for {}. It will be ready shortly.",
            saved.size, saved.drink_type, saved.milk, saved.name
        )))
    }
}

#[async_trait::async_trait]
impl Toolbox for BaristaTools {
    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                "update_coffee_order",
                "Set any of the drink details the customer mentioned. Unmentioned fields stay as they are.",
                json!({
                    "type": "object",
                    "properties": {
                        "drink_type": {"type": "string", "description": "e.g. latte, cappuccino, cold brew"},
                        "size": {"type": "string", "enum": DRINK_SIZES},
                        "milk": {"type": "string", "description": "e.g. whole, oat, almond, none"},
                        "extras": {"type": "array", "items": {"type": "string"}, "description": "e.g. extra shot, caramel"},
                        "name": {"type": "string", "description": "Customer's name for the cup"}
                    },
                    "required": []
                }),
            ),
            Tool::new("show_coffee_order", "Read back the current drink order.", no_parameters()),
            Tool::new(
                "save_coffee_order",
                "Save the completed order. Fails if any detail is missing.",
                no_parameters(),
            ),
        ]
    }

    async fn call(
        &self,
        name: &str,
        arguments: Value,
        cancel_token: CancellationToken,
    ) -> Result<ToolResult, ToolError> {
        check_cancelled(&cancel_token)?;

        match name {
            "update_coffee_order" => self.update_coffee_order(&arguments).await,
            "show_coffee_order" => self.show_coffee_order().await,
            "save_coffee_order" => self.save_coffee_order().await,
            _ => Err(ToolError::NotFound(format!("Tool '{}' not found", name))),
        }
    }
}
