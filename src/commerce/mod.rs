//! The shop: catalog, carts, persisted orders and simulated delivery.

pub mod catalog;
pub mod delivery;
pub mod orders;
pub mod session;

pub use catalog::{find_product_by_ref, list_products, Product, ProductFilters, CATALOG};
pub use delivery::{simulate_delivery_flow, spawn_delivery_flow};
pub use orders::{Advance, LineItem, Order, OrderError, OrderItem, OrderStatus, OrderStore};
pub use session::{CartLine, ShopSession};
