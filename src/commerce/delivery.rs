//! Simulated order tracking.
//!
//! A placed order walks `received -> confirmed -> shipped -> out_for_delivery
//! -> delivered`, one step per tick. The order is re-read from the store on
//! every tick, so a cancellation made elsewhere stops the walk for good.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::orders::{Advance, OrderError, OrderStore};

/// Advance `order_id` every `interval` until it is delivered, cancelled or gone.
///
/// Returns the number of steps taken.
pub async fn simulate_delivery_flow(
    store: Arc<OrderStore>,
    order_id: String,
    interval: Duration,
) -> usize {
    let mut steps = 0;
    loop {
        tokio::time::sleep(interval).await;

        match store.advance(&order_id) {
            Ok(Advance::Moved(status)) => {
                steps += 1;
                log::info!("🚚 Order {} is now {}", order_id, status);
            }
            Ok(Advance::Halted) => {
                log::info!("🛑 Order {} was cancelled, tracking stopped", order_id);
                break;
            }
            Ok(Advance::Finished) => break,
            Err(OrderError::UnknownOrder(_)) => {
                log::warn!("⚠️  Order {} disappeared, tracking stopped", order_id);
                break;
            }
            Err(e) => {
                log::error!("❌ Failed to advance order {}: {}", order_id, e);
                break;
            }
        }
    }
    steps
}

/// Run [`simulate_delivery_flow`] as a detached background task
pub fn spawn_delivery_flow(
    store: Arc<OrderStore>,
    order_id: String,
    interval: Duration,
) -> JoinHandle<usize> {
    log::debug!(
        "⏱️  Tracking order {} every {:?}",
        order_id,
        interval
    );
    tokio::spawn(simulate_delivery_flow(store, order_id, interval))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commerce::catalog::CURRENCY;
    use crate::commerce::orders::{LineItem, OrderStatus};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn place(store: &OrderStore) -> String {
        store
            .create_order(
                &[LineItem {
                    product_id: "mug-001".into(),
                    quantity: 1,
                    attrs: BTreeMap::new(),
                }],
                CURRENCY,
            )
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_flow_reaches_delivered() {
        let dir = tempdir().unwrap();
        let store = Arc::new(OrderStore::open(dir.path().join("orders.json")).unwrap());
        let id = place(&store);

        let steps =
            simulate_delivery_flow(store.clone(), id.clone(), Duration::from_millis(5)).await;

        assert_eq!(steps, 4);
        assert_eq!(store.find(&id).unwrap().status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_cancelled_order_is_not_advanced() {
        let dir = tempdir().unwrap();
        let store = Arc::new(OrderStore::open(dir.path().join("orders.json")).unwrap());
        let id = place(&store);
        store.cancel(&id).unwrap();

        let steps =
            simulate_delivery_flow(store.clone(), id.clone(), Duration::from_millis(5)).await;

        assert_eq!(steps, 0);
        assert_eq!(store.find(&id).unwrap().status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_mid_flow_stops_tracking() {
        let dir = tempdir().unwrap();
        let store = Arc::new(OrderStore::open(dir.path().join("orders.json")).unwrap());
        let id = place(&store);

        let handle = spawn_delivery_flow(store.clone(), id.clone(), Duration::from_millis(40));

        // wait for the first step, then cancel before the walk can finish
        let mut confirmed = false;
        for _ in 0..100 {
            if store.find(&id).unwrap().status != OrderStatus::Received {
                confirmed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert!(confirmed);
        store.cancel(&id).unwrap();

        let steps = handle.await.unwrap();
        assert!(steps >= 1 && steps < 4, "unexpected step count {}", steps);
        assert_eq!(store.find(&id).unwrap().status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_missing_order_stops_immediately() {
        let dir = tempdir().unwrap();
        let store = Arc::new(OrderStore::open(dir.path().join("orders.json")).unwrap());

        let steps =
            simulate_delivery_flow(store, "order-ghost".into(), Duration::from_millis(1)).await;
        assert_eq!(steps, 0);
    }
}
