use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::catalog::{product_by_id, Product};
use super::orders::{LineItem, Order};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

impl CartLine {
    pub fn size(&self) -> Option<&str> {
        self.attrs.get("size").map(String::as_str)
    }
}

impl From<&CartLine> for LineItem {
    fn from(line: &CartLine) -> Self {
        LineItem {
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            attrs: line.attrs.clone(),
        }
    }
}

/// One traced action, kept for debugging a conversation afterwards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub time: String,
    pub action: String,
    #[serde(default)]
    pub details: Value,
}

/// Per-session shop state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopSession {
    pub customer_name: Option<String>,
    pub session_id: String,
    pub started_at: String,
    pub cart: Vec<CartLine>,
    pub orders: Vec<Order>,
    pub history: Vec<HistoryEntry>,
    /// Product ids from the last catalog listing, so "the second one" resolves against it
    #[serde(default)]
    pub last_listing: Vec<String>,
}

impl Default for ShopSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ShopSession {
    pub fn new() -> Self {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        Self {
            customer_name: None,
            session_id: uuid[..8].to_string(),
            started_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            cart: Vec::new(),
            orders: Vec::new(),
            history: Vec::new(),
            last_listing: Vec::new(),
        }
    }

    pub fn record(&mut self, action: &str, details: Value) {
        self.history.push(HistoryEntry {
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            action: action.to_string(),
            details,
        });
    }

    pub fn add_to_cart(&mut self, product: &Product, quantity: u32, size: Option<&str>) {
        let mut attrs = BTreeMap::new();
        if let Some(size) = size {
            attrs.insert("size".to_string(), size.to_string());
        }
        self.cart.push(CartLine {
            product_id: product.id.to_string(),
            quantity: quantity.max(1),
            attrs,
        });
    }

    pub fn clear_cart(&mut self) {
        self.cart.clear();
    }

    /// Sum of the cart at catalog prices; lines for unknown products are skipped
    pub fn cart_total(&self) -> u64 {
        self.cart
            .iter()
            .filter_map(|line| product_by_id(&line.product_id).map(|p| p.price * u64::from(line.quantity)))
            .sum()
    }

    pub fn line_items(&self) -> Vec<LineItem> {
        self.cart.iter().map(LineItem::from).collect()
    }

    /// The last listing resolved back to catalog entries
    pub fn listing_products(&self) -> Vec<&'static Product> {
        self.last_listing
            .iter()
            .filter_map(|id| product_by_id(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_session() {
        let session = ShopSession::new();
        assert_eq!(session.session_id.len(), 8);
        assert!(session.started_at.ends_with('Z'));
        assert!(session.cart.is_empty());
    }

    #[test]
    fn test_cart_total_and_items() {
        let mut session = ShopSession::new();
        let tee = product_by_id("tee-001").unwrap();
        let mug = product_by_id("mug-002").unwrap();

        session.add_to_cart(tee, 2, Some("M"));
        session.add_to_cart(mug, 0, None);

        assert_eq!(session.cart_total(), 799 * 2 + 599);
        assert_eq!(session.cart[0].size(), Some("M"));
        assert_eq!(session.cart[1].quantity, 1);

        let items = session.line_items();
        assert_eq!(items[0].attrs.get("size").map(String::as_str), Some("M"));

        session.clear_cart();
        assert_eq!(session.cart_total(), 0);
    }

    #[test]
    fn test_history_records_actions() {
        let mut session = ShopSession::new();
        session.record("clear_cart", json!({}));
        session.record("add_to_cart", json!({"product_id": "mug-001", "quantity": 1}));

        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history[1].details["product_id"], "mug-001");
    }
}
