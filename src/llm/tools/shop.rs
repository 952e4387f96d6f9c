//! Tools for Ramu Kaka, the Dr Abhishek Shop voice shopkeeper.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::{
    check_cancelled, no_parameters, opt_bool_arg, opt_str_arg, opt_u64_arg, str_arg, Tool,
    ToolError, ToolResult, Toolbox,
};
use crate::commerce::catalog::{
    self, category_from_query, find_product_by_ref, list_products, normalize_category,
    product_by_id, ProductFilters, CURRENCY,
};
use crate::commerce::delivery::spawn_delivery_flow;
use crate::commerce::orders::{Order, OrderError, OrderStore};
use crate::commerce::session::ShopSession;

pub const SHOP_NAME: &str = "Dr Abhishek Shop";
const MAX_LISTED: usize = 8;

pub struct ShopTools {
    session: Mutex<ShopSession>,
    orders: Arc<OrderStore>,
    delivery_tick: Duration,
}

impl ShopTools {
    pub fn new(orders: Arc<OrderStore>, delivery_tick: Duration) -> Self {
        Self {
            session: Mutex::new(ShopSession::new()),
            orders,
            delivery_tick,
        }
    }

    /// A copy of the current session state
    pub async fn session(&self) -> ShopSession {
        self.session.lock().await.clone()
    }

    async fn show_catalog(&self, arguments: &Value) -> Result<ToolResult, ToolError> {
        let q = opt_str_arg(arguments, "q");
        let mut category = opt_str_arg(arguments, "category").map(|c| normalize_category(&c));
        if category.is_none() {
            category = q
                .as_deref()
                .and_then(category_from_query)
                .map(str::to_string);
        }

        let filters = ProductFilters {
            q,
            category,
            min_price: opt_u64_arg(arguments, "min_price")?,
            max_price: opt_u64_arg(arguments, "max_price")?,
            color: opt_str_arg(arguments, "color"),
            size: opt_str_arg(arguments, "size"),
        };
        let products = list_products(&filters);
        log::debug!("🔎 Catalog search {:?} matched {} products", filters, products.len());

        if products.is_empty() {
            return Ok(ToolResult::Escalation(
                "Sorry, I couldn't find any items that match. Would you like to try another search?"
                    .to_string(),
            ));
        }

        let shown = &products[..products.len().min(MAX_LISTED)];
        let mut lines = vec![format!(
            "Here are the top {} items I found at {}:",
            shown.len(),
            SHOP_NAME
        )];
        for (idx, p) in shown.iter().enumerate() {
            let sizes = if p.sizes.is_empty() {
                String::new()
            } else {
                format!(" (sizes: {})", p.sizes.join(", "))
            };
            lines.push(format!(
                "{}. {} - {} {} (id: {}){}",
                idx + 1,
                p.name,
                p.price,
                p.currency,
                p.id,
                sizes
            ));
        }
        lines.push(
            "You can say: 'I want the second item in size M' or 'add mug-001 to my cart, quantity 2'."
                .to_string(),
        );
        if shown.iter().any(|p| p.category == "mobile") {
            lines.push(
                "To buy a phone say: 'Add phone-002 to my cart' or 'I want the second phone, quantity 1'."
                    .to_string(),
            );
        }

        let mut session = self.session.lock().await;
        let results: Vec<String> = shown.iter().map(|p| p.id.to_string()).collect();
        session.record("show_catalog", json!({ "results": results }));
        session.last_listing = results;

        Ok(ToolResult::Response(lines.join("\n")))
    }

    async fn add_to_cart(&self, arguments: &Value) -> Result<ToolResult, ToolError> {
        let product_ref = str_arg(arguments, "product_ref")?;
        let quantity = opt_u64_arg(arguments, "quantity")?.unwrap_or(1).clamp(1, 99) as u32;
        let size = opt_str_arg(arguments, "size").map(|s| s.to_uppercase());

        let mut session = self.session.lock().await;

        // only "the second one" or "2" points into what was just listed
        let from_listing = if catalog::is_positional_ref(&product_ref) {
            find_product_by_ref(&product_ref, &session.listing_products())
        } else {
            None
        };
        let product = from_listing
            .or_else(|| find_product_by_ref(&product_ref, &catalog::all_products()));
        let Some(product) = product else {
            return Ok(ToolResult::Escalation(
                "I couldn't resolve which product you meant. Try using the item id or say 'show catalog' to hear options."
                    .to_string(),
            ));
        };

        if let Some(size) = &size {
            if product.sizes.is_empty() {
                return Ok(ToolResult::Escalation(format!(
                    "{} doesn't come in sizes. Ask the customer to confirm without a size.",
                    product.name
                )));
            }
            if !product.sizes.contains(&size.as_str()) {
                return Ok(ToolResult::Escalation(format!(
                    "{} is not available in size {}. Available sizes: {}.",
                    product.name,
                    size,
                    product.sizes.join(", ")
                )));
            }
        }

        session.add_to_cart(product, quantity, size.as_deref());
        session.record(
            "add_to_cart",
            json!({ "product_id": product.id, "quantity": quantity, "size": size }),
        );
        log::info!("🛒 Added {} x {} to cart", quantity, product.id);

        let size_text = size.map(|s| format!(" in size {}", s)).unwrap_or_default();
        Ok(ToolResult::Response(format!(
            "Added {} x {}{} to your cart. What would you like to do next?",
            quantity, product.name, size_text
        )))
    }

    async fn show_cart(&self) -> Result<ToolResult, ToolError> {
        let session = self.session.lock().await;
        if session.cart.is_empty() {
            return Ok(ToolResult::Response(
                "Your cart is empty. You can say 'show catalog' to browse items.".to_string(),
            ));
        }

        let mut lines = vec!["Items in your cart:".to_string()];
        for line in &session.cart {
            let Some(p) = product_by_id(&line.product_id) else {
                continue;
            };
            let size_text = line
                .size()
                .map(|s| format!(", size {}", s))
                .unwrap_or_default();
            lines.push(format!(
                "- {} x {}{}: {} {}",
                p.name,
                line.quantity,
                size_text,
                p.price * u64::from(line.quantity),
                CURRENCY
            ));
        }
        lines.push(format!("Cart total: {} {}", session.cart_total(), CURRENCY));
        lines.push("Say 'place my order' to checkout or 'clear cart' to empty the cart.".to_string());
        Ok(ToolResult::Response(lines.join("\n")))
    }

    async fn clear_cart(&self) -> Result<ToolResult, ToolError> {
        let mut session = self.session.lock().await;
        session.clear_cart();
        session.record("clear_cart", json!({}));
        Ok(ToolResult::Response(
            "Your cart has been cleared. What would you like to do next?".to_string(),
        ))
    }

    async fn place_order(&self, arguments: &Value) -> Result<ToolResult, ToolError> {
        let confirm = opt_bool_arg(arguments, "confirm").unwrap_or(true);
        let mut session = self.session.lock().await;

        if session.cart.is_empty() {
            return Ok(ToolResult::Escalation(
                "Your cart is empty, nothing to place. Would you like to browse items?".to_string(),
            ));
        }
        if !confirm {
            return Ok(ToolResult::Response(
                "Okay, I haven't placed the order. Your cart is still saved.".to_string(),
            ));
        }

        let order = self
            .orders
            .create_order(&session.line_items(), CURRENCY)
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        session.record("place_order", json!({ "order_id": order.id }));
        session.orders.push(order.clone());
        session.clear_cart();
        drop(session);

        spawn_delivery_flow(self.orders.clone(), order.id.clone(), self.delivery_tick);

        Ok(ToolResult::Response(format!(
            "Order placed. Order ID {}. Total {} {}. You can ask me for the order status anytime. What would you like to do next?",
            order.id, order.total, order.currency
        )))
    }

    async fn last_order(&self) -> Result<ToolResult, ToolError> {
        let Some(order) = self.orders.most_recent() else {
            return Ok(ToolResult::Response("You have no past orders yet.".to_string()));
        };

        let mut lines = vec![format!(
            "Most recent order: {} - placed {}, currently {}",
            order.id,
            order.created_at,
            order.status.spoken()
        )];
        for item in &order.items {
            lines.push(format!(
                "- {} x {}: {} {}",
                item.name, item.quantity, item.line_total, order.currency
            ));
        }
        lines.push(format!("Total: {} {}", order.total, order.currency));
        Ok(ToolResult::Response(lines.join("\n")))
    }

    /// Explicit id, else the latest order of this session, else the latest order overall
    async fn resolve_order(&self, arguments: &Value) -> Option<Order> {
        if let Some(id) = opt_str_arg(arguments, "order_id") {
            return self.orders.find(&id);
        }
        let session_latest = self
            .session
            .lock()
            .await
            .orders
            .last()
            .map(|o| o.id.clone());
        match session_latest {
            Some(id) => self.orders.find(&id),
            None => self.orders.most_recent(),
        }
    }

    async fn order_status(&self, arguments: &Value) -> Result<ToolResult, ToolError> {
        let Some(order) = self.resolve_order(arguments).await else {
            return Ok(ToolResult::Escalation(
                "I couldn't find that order. Please check the order ID.".to_string(),
            ));
        };
        Ok(ToolResult::Response(format!(
            "Order {} is currently {}.",
            order.id,
            order.status.spoken()
        )))
    }

    async fn cancel_order(&self, arguments: &Value) -> Result<ToolResult, ToolError> {
        let Some(order) = self.resolve_order(arguments).await else {
            return Ok(ToolResult::Escalation(
                "I couldn't find that order. Please check the order ID.".to_string(),
            ));
        };

        match self.orders.cancel(&order.id) {
            Ok(order) => {
                let mut session = self.session.lock().await;
                session.record("cancel_order", json!({ "order_id": order.id }));
                if let Some(own) = session.orders.iter_mut().find(|o| o.id == order.id) {
                    *own = order.clone();
                }
                Ok(ToolResult::Response(format!(
                    "Order {} has been cancelled.",
                    order.id
                )))
            }
            Err(e @ OrderError::NotCancellable { .. }) => Ok(ToolResult::Escalation(format!(
                "{}. Let the customer know politely.",
                e
            ))),
            Err(e) => Err(ToolError::ExecutionFailed(e.to_string())),
        }
    }

    async fn set_customer_name(&self, arguments: &Value) -> Result<ToolResult, ToolError> {
        let name = str_arg(arguments, "name")?;
        let mut session = self.session.lock().await;
        session.customer_name = Some(name.clone());
        session.record("set_customer_name", json!({ "name": name }));
        Ok(ToolResult::Response(format!(
            "Noted, the customer's name is {}.",
            name
        )))
    }
}

#[async_trait::async_trait]
impl Toolbox for ShopTools {
    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                "show_catalog",
                "Search the shop catalog and return a short spoken summary of matching products (name, price, id).",
                json!({
                    "type": "object",
                    "properties": {
                        "q": {"type": "string", "description": "Search query (optional)"},
                        "category": {"type": "string", "description": "Category such as mug, tshirt, hoodie, raincoat, laptop, storage, mobile (optional)"},
                        "min_price": {"type": "integer", "description": "Minimum price in INR (optional)"},
                        "max_price": {"type": "integer", "description": "Maximum price in INR (optional)"},
                        "color": {"type": "string", "description": "Color (optional)"},
                        "size": {"type": "string", "description": "Clothing size such as S, M, L, XL (optional)"}
                    },
                    "required": []
                }),
            ),
            Tool::new(
                "add_to_cart",
                "Resolve a product reference and add it to the customer's cart.",
                json!({
                    "type": "object",
                    "properties": {
                        "product_ref": {"type": "string", "description": "Reference to product: id, name, or spoken ref like 'second hoodie'"},
                        "quantity": {"type": "integer", "description": "Quantity, default 1"},
                        "size": {"type": "string", "description": "Size (optional)"}
                    },
                    "required": ["product_ref"]
                }),
            ),
            Tool::new("show_cart", "Read back the items in the cart with the total.", no_parameters()),
            Tool::new("clear_cart", "Remove everything from the cart.", no_parameters()),
            Tool::new(
                "place_order",
                "Create an order from the cart, persist it and start delivery tracking.",
                json!({
                    "type": "object",
                    "properties": {
                        "confirm": {"type": "boolean", "description": "Confirm order placement, default true"}
                    },
                    "required": []
                }),
            ),
            Tool::new("last_order", "Describe the most recent order.", no_parameters()),
            Tool::new(
                "order_status",
                "Tell the customer where an order is in delivery.",
                json!({
                    "type": "object",
                    "properties": {
                        "order_id": {"type": "string", "description": "Order id (optional, defaults to the latest order)"}
                    },
                    "required": []
                }),
            ),
            Tool::new(
                "cancel_order",
                "Cancel an order that has not been delivered yet.",
                json!({
                    "type": "object",
                    "properties": {
                        "order_id": {"type": "string", "description": "Order id (optional, defaults to the latest order)"}
                    },
                    "required": []
                }),
            ),
            Tool::new(
                "set_customer_name",
                "Remember the customer's name for this conversation.",
                json!({
                    "type": "object",
                    "properties": {
                        "name": {"type": "string", "description": "Customer's name"}
                    },
                    "required": ["name"]
                }),
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
            "show_catalog" => self.show_catalog(&arguments).await,
            "add_to_cart" => self.add_to_cart(&arguments).await,
            "show_cart" => self.show_cart().await,
            "clear_cart" => self.clear_cart().await,
            "place_order" => self.place_order(&arguments).await,
            "last_order" => self.last_order().await,
            "order_status" => self.order_status(&arguments).await,
            "cancel_order" => self.cancel_order(&arguments).await,
            "set_customer_name" => self.set_customer_name(&arguments).await,
            _ => Err(ToolError::NotFound(format!("Tool '{}' not found", name))),
        }
    }
}
