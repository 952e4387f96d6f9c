use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use strum::{Display, EnumString};
use thiserror::Error;

use super::catalog::{product_by_id, CURRENCY};
use crate::store::{JsonListStore, StoreError};

#[derive(Error, Debug)]
pub enum OrderError {
    #[error("Product {0} not found")]
    UnknownProduct(String),
    #[error("Order {0} not found")]
    UnknownOrder(String),
    #[error("Order {id} is already {status} and cannot be cancelled")]
    NotCancellable { id: String, status: OrderStatus },
    #[error("An order needs at least one item")]
    Empty,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    Received,
    Confirmed,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// The next step of the delivery sequence; `None` once delivered or cancelled
    pub fn next(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Received => Some(OrderStatus::Confirmed),
            OrderStatus::Confirmed => Some(OrderStatus::Shipped),
            OrderStatus::Shipped => Some(OrderStatus::OutForDelivery),
            OrderStatus::OutForDelivery => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Short phrase for speech, e.g. "out for delivery"
    pub fn spoken(self) -> String {
        self.to_string().replace('_', " ")
    }
}

fn default_status() -> OrderStatus {
    OrderStatus::Received
}

/// One requested line before pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub unit_price: u64,
    pub quantity: u32,
    pub line_total: u64,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub items: Vec<OrderItem>,
    pub total: u64,
    pub currency: String,
    pub created_at: String,
    // Orders written before tracking existed read as freshly received.
    #[serde(default = "default_status")]
    pub status: OrderStatus,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Outcome of one delivery tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved(OrderStatus),
    Halted,
    Finished,
}

pub fn utc_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn new_order_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("order-{}", &uuid[..8])
}

/// Orders persisted to a JSON file shared by every shop session
pub struct OrderStore {
    store: JsonListStore<Order>,
}

impl OrderStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OrderError> {
        let store = JsonListStore::new(path);
        store.ensure_exists()?;
        Ok(Self { store })
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Price each line from the catalog and persist the order as `received`
    pub fn create_order(&self, line_items: &[LineItem], currency: &str) -> Result<Order, OrderError> {
        if line_items.is_empty() {
            return Err(OrderError::Empty);
        }

        let mut items = Vec::with_capacity(line_items.len());
        let mut total = 0u64;
        for line in line_items {
            let product = product_by_id(&line.product_id)
                .ok_or_else(|| OrderError::UnknownProduct(line.product_id.clone()))?;
            let quantity = line.quantity.max(1);
            let line_total = product.price * u64::from(quantity);
            total += line_total;
            items.push(OrderItem {
                product_id: product.id.to_string(),
                name: product.name.to_string(),
                unit_price: product.price,
                quantity,
                line_total,
                attrs: line.attrs.clone(),
            });
        }

        let now = utc_now();
        let order = Order {
            id: new_order_id(),
            items,
            total,
            currency: if currency.is_empty() {
                CURRENCY.to_string()
            } else {
                currency.to_string()
            },
            created_at: now.clone(),
            status: OrderStatus::Received,
            updated_at: Some(now),
        };

        self.store.append(order.clone())?;
        log::info!(
            "🧾 Order {} saved: {} items, total {} {}",
            order.id,
            order.items.len(),
            order.total,
            order.currency
        );
        Ok(order)
    }

    pub fn list(&self) -> Vec<Order> {
        self.store.load_all()
    }

    pub fn most_recent(&self) -> Option<Order> {
        self.store.load_all().pop()
    }

    pub fn find(&self, id: &str) -> Option<Order> {
        let id = id.trim();
        self.store.load_all().into_iter().find(|o| o.id == id)
    }

    /// Move an order one step along the delivery sequence, unless it was cancelled
    pub fn advance(&self, id: &str) -> Result<Advance, OrderError> {
        let outcome = self.store.update(
            |o| o.id == id,
            |order| match order.status {
                OrderStatus::Cancelled => Advance::Halted,
                status => match status.next() {
                    Some(next) => {
                        order.status = next;
                        order.updated_at = Some(utc_now());
                        Advance::Moved(next)
                    }
                    None => Advance::Finished,
                },
            },
        )?;
        outcome.ok_or_else(|| OrderError::UnknownOrder(id.to_string()))
    }

    /// Mark an order cancelled. Cancelling a cancelled order is a no-op.
    pub fn cancel(&self, id: &str) -> Result<Order, OrderError> {
        let outcome = self.store.update(
            |o| o.id == id,
            |order| match order.status {
                OrderStatus::Delivered => Err(OrderError::NotCancellable {
                    id: order.id.clone(),
                    status: order.status,
                }),
                OrderStatus::Cancelled => Ok(order.clone()),
                _ => {
                    order.status = OrderStatus::Cancelled;
                    order.updated_at = Some(utc_now());
                    Ok(order.clone())
                }
            },
        )?;
        let order = outcome.ok_or_else(|| OrderError::UnknownOrder(id.to_string()))??;
        log::info!("🛑 Order {} is now {}", order.id, order.status);
        Ok(order)
    }
}
