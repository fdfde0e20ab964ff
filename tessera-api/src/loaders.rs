//! Per-entity loader executors.
//!
//! Customers have a batch endpoint, so one batch becomes one upstream call.
//! Orders do not; their executor fans out one call per key concurrently and
//! keeps each key's failure to itself.

use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::future::join_all;
use tessera_core::{Customer, LegacyRecord, Order, UpstreamError};
use tessera_storage::{BatchFn, BatchLoader, KeyFailurePolicy, KeyOutcome};

use crate::telemetry::METRICS;
use crate::upstream::LegacyClient;

type Outcomes<V> = HashMap<String, KeyOutcome<V, UpstreamError>>;

fn record_batch(loader: &str, size: usize) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_loader_batch(loader, size);
    }
}

// ============================================================================
// CUSTOMERS
// ============================================================================

pub struct CustomerBatchFn {
    client: LegacyClient,
}

impl CustomerBatchFn {
    pub fn new(client: LegacyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BatchFn for CustomerBatchFn {
    type Key = String;
    type Value = Customer;
    type Error = UpstreamError;

    async fn load(&self, keys: &[String]) -> Outcomes<Customer> {
        record_batch("customers", keys.len());

        match self.client.fetch_customers_batch(keys).await {
            // Indexed by id, so row order and unknown rows do not matter.
            Ok(rows) => rows
                .into_iter()
                .filter(|row| keys.iter().any(|k| k == row.record_id()))
                .map(|row| (row.customer_id.clone(), KeyOutcome::Found(row.into())))
                .collect(),
            Err(err) => keys
                .iter()
                .map(|key| (key.clone(), KeyOutcome::Failed(err.clone())))
                .collect(),
        }
    }
}

// ============================================================================
// ORDERS
// ============================================================================

pub struct OrderBatchFn {
    client: LegacyClient,
}

impl OrderBatchFn {
    pub fn new(client: LegacyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BatchFn for OrderBatchFn {
    type Key = String;
    type Value = Order;
    type Error = UpstreamError;

    async fn load(&self, keys: &[String]) -> Outcomes<Order> {
        record_batch("orders", keys.len());

        let fetches = keys.iter().map(|id| async move {
            let result = self.client.fetch_order(id).await;
            (id.clone(), result)
        });

        join_all(fetches)
            .await
            .into_iter()
            .filter_map(|(id, result)| match result {
                Ok(order) => Some((id, KeyOutcome::Found(order.into()))),
                Err(err) if err.is_not_found() => None,
                Err(err) => Some((id, KeyOutcome::Failed(err))),
            })
            .collect()
    }
}

// ============================================================================
// LOADER SET
// ============================================================================

pub type CustomerLoader = BatchLoader<CustomerBatchFn>;
pub type OrderLoader = BatchLoader<OrderBatchFn>;

/// One loader per entity kind, all issuing calls through the same
/// credential-bound client.
///
/// A failed customer lookup reaches its caller as an error. Failed orders
/// resolve as absent so one bad order never fails its siblings.
#[derive(Clone)]
pub struct Loaders {
    pub customers: CustomerLoader,
    pub orders: OrderLoader,
}

impl Loaders {
    pub fn new(client: &LegacyClient) -> Self {
        Self {
            customers: BatchLoader::with_policy(
                "customers",
                CustomerBatchFn::new(client.clone()),
                KeyFailurePolicy::Error,
            ),
            orders: BatchLoader::new("orders", OrderBatchFn::new(client.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use std::time::Duration;
    use tessera_test_utils::{fixtures, MockLegacy};

    fn client(mock: &MockLegacy) -> LegacyClient {
        let policy = RetryPolicy {
            backoff_base: Duration::from_millis(1),
            ..RetryPolicy::default()
        };
        match LegacyClient::new(&mock.base_url(), policy) {
            Ok(client) => client,
            Err(e) => panic!("client: {}", e),
        }
    }

    #[tokio::test]
    async fn test_customer_batch_reindexes_rows() -> Result<(), Box<dyn std::error::Error>> {
        let mock = MockLegacy::start().await?;
        let batch_fn = CustomerBatchFn::new(client(&mock));

        let keys = vec![
            fixtures::CHIDI.to_string(),
            "c-404".to_string(),
            fixtures::ADA.to_string(),
        ];
        let outcomes = batch_fn.load(&keys).await;

        assert_eq!(outcomes.len(), 2);
        assert!(matches!(
            outcomes.get(fixtures::ADA),
            Some(KeyOutcome::Found(c)) if c.name == "Ada Okafor"
        ));
        assert!(matches!(
            outcomes.get(fixtures::CHIDI),
            Some(KeyOutcome::Found(c)) if c.name == "Chidi Nwosu"
        ));
        assert!(!outcomes.contains_key("c-404"));
        Ok(())
    }

    #[tokio::test]
    async fn test_customer_batch_failure_marks_every_key() -> Result<(), Box<dyn std::error::Error>> {
        let mock = MockLegacy::start().await?;
        mock.fail_always("/customers", 503);
        let batch_fn = CustomerBatchFn::new(client(&mock));

        let keys = vec![fixtures::ADA.to_string(), fixtures::BOLA.to_string()];
        let outcomes = batch_fn.load(&keys).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.values().all(|o| matches!(
            o,
            KeyOutcome::Failed(UpstreamError::Unavailable { attempts: 3, .. })
        )));
        assert_eq!(mock.hits("/customers"), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_order_fan_out_isolates_failures() -> Result<(), Box<dyn std::error::Error>> {
        let mock = MockLegacy::start().await?;
        mock.fail_always("/orders/o-101", 500);
        let batch_fn = OrderBatchFn::new(client(&mock));

        let keys = vec![
            fixtures::ADA_PAID_ORDER.to_string(),
            fixtures::ADA_NEW_ORDER.to_string(),
            "o-999".to_string(),
        ];
        let outcomes = batch_fn.load(&keys).await;

        assert!(matches!(
            outcomes.get(fixtures::ADA_PAID_ORDER),
            Some(KeyOutcome::Found(o)) if o.status == "PAID"
        ));
        assert!(matches!(
            outcomes.get(fixtures::ADA_NEW_ORDER),
            Some(KeyOutcome::Failed(_))
        ));
        // Not found is omitted, not failed.
        assert!(!outcomes.contains_key("o-999"));
        Ok(())
    }

    #[tokio::test]
    async fn test_customer_loader_surfaces_failures() -> Result<(), Box<dyn std::error::Error>> {
        let mock = MockLegacy::start().await?;
        mock.fail_always("/customers", 503);
        let loaders = Loaders::new(&client(&mock));

        assert_eq!(loaders.customers.policy(), KeyFailurePolicy::Error);
        assert_eq!(loaders.orders.policy(), KeyFailurePolicy::Absent);
        assert!(matches!(
            loaders.customers.load(fixtures::ADA.to_string()).await,
            Err(tessera_storage::LoadError::Failed(UpstreamError::Unavailable { attempts: 3, .. }))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_loaders_share_credential() -> Result<(), Box<dyn std::error::Error>> {
        let mock = MockLegacy::start().await?;
        let loaders = Loaders::new(&client(&mock).with_credential(Some("Bearer t")));

        let (customer, order) = tokio::join!(
            loaders.customers.load(fixtures::BOLA.to_string()),
            loaders.orders.load(fixtures::BOLA_CANCELED_ORDER.to_string()),
        );
        assert_eq!(customer?.map(|c| c.tier), Some("FREE".to_string()));
        assert_eq!(order?.map(|o| o.total), Some(20.0));

        let seen = mock.authorizations();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|a| a.as_deref() == Some("Bearer t")));
        Ok(())
    }
}
