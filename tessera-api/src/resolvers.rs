//! Field resolution over a [`RequestContext`].
//!
//! Single-entity lookups surface upstream failures (except not-found, which
//! is `None`). List relationships tolerate them: a failed or missing order is
//! logged and left out.

use std::collections::HashMap;

use tessera_core::{cache_key, Customer, EntityKind, Order};

use crate::context::RequestContext;
use crate::error::ApiResult;
use crate::telemetry::METRICS;

fn record_cache_lookup(hit: bool) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_cache_lookup(hit);
    }
}

impl RequestContext {
    /// Root `customer(id)`: cache first, then a direct upstream call. Only
    /// found customers are cached.
    pub async fn resolve_customer(&self, id: &str) -> ApiResult<Option<Customer>> {
        let key = cache_key(EntityKind::Customer, id);
        if let Some(customer) = self.cache.get(&key) {
            record_cache_lookup(true);
            tracing::debug!(request_id = %self.request_id, key = %key, "Cache hit");
            return Ok(Some(customer));
        }
        record_cache_lookup(false);

        match self.client.fetch_customer(id).await {
            Ok(legacy) => {
                let customer = Customer::from(legacy);
                self.cache.set(&key, customer.clone(), self.cache_ttl);
                Ok(Some(customer))
            }
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Root `customers(ids)`: one batch call, no cache, no loader. Results
    /// follow the requested order; unknown ids are left out.
    pub async fn resolve_customers(&self, ids: &[String]) -> ApiResult<Vec<Customer>> {
        let rows = self.client.fetch_customers_batch(ids).await?;
        let by_id: HashMap<String, Customer> = rows
            .into_iter()
            .map(|row| (row.customer_id.clone(), Customer::from(row)))
            .collect();

        Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
    }

    /// Root `order(id)`.
    pub async fn resolve_order(&self, id: &str) -> ApiResult<Option<Order>> {
        match self.client.fetch_order(id).await {
            Ok(legacy) => Ok(Some(legacy.into())),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// `Customer.orders`: relation references, then one concurrent loader
    /// call per reference. Missing and failed orders are dropped.
    pub async fn resolve_customer_orders(&self, customer_id: &str) -> ApiResult<Vec<Order>> {
        let refs = self.client.fetch_customer_orders(customer_id).await?;
        let ids: Vec<String> = refs.into_iter().map(|r| r.id).collect();

        let orders = self
            .loaders
            .orders
            .load_many(&ids)
            .await
            .into_iter()
            .zip(&ids)
            .filter_map(|(result, id)| match result {
                Ok(order) => order,
                Err(err) => {
                    tracing::warn!(
                        request_id = %self.request_id,
                        customer_id,
                        order_id = %id,
                        error = %err,
                        "Dropping order that failed to load"
                    );
                    None
                }
            })
            .collect();
        Ok(orders)
    }

    /// `Order.customer`: the owning customer through the loader, `None`
    /// when it cannot be found. A failed lookup is an error.
    pub async fn resolve_order_customer(&self, order: &Order) -> ApiResult<Option<Customer>> {
        Ok(self
            .loaders
            .customers
            .load(order.customer_id.clone())
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::context::ContextBuilder;
    use crate::error::ErrorCode;
    use std::time::Duration;
    use tessera_test_utils::{fixtures, MockLegacy};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn builder(mock: &MockLegacy) -> ApiResult<ContextBuilder> {
        ContextBuilder::from_config(&GatewayConfig {
            legacy_base_url: mock.base_url(),
            backoff_base: Duration::from_millis(1),
            ..GatewayConfig::default()
        })
    }

    #[tokio::test]
    async fn test_root_customer_is_cached_across_requests() -> TestResult {
        let mock = MockLegacy::start().await?;
        let builder = builder(&mock)?;

        let first = builder.build("r1", None).resolve_customer(fixtures::ADA).await?;
        let second = builder.build("r2", None).resolve_customer(fixtures::ADA).await?;

        assert_eq!(first.as_ref().map(|c| c.name.as_str()), Some("Ada Okafor"));
        assert_eq!(first, second);
        assert_eq!(mock.hits("/customers/c-001"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_root_customer_is_none_and_not_cached() -> TestResult {
        let mock = MockLegacy::start().await?;
        let ctx = builder(&mock)?.build("r", None);

        assert_eq!(ctx.resolve_customer("c-404").await?, None);
        assert_eq!(ctx.resolve_customer("c-404").await?, None);
        assert_eq!(mock.hits("/customers/c-404"), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_root_failure_surfaces_unavailable() -> TestResult {
        let mock = MockLegacy::start().await?;
        mock.fail_always("/orders/o-100", 502);
        let ctx = builder(&mock)?.build("r", None);

        let err = match ctx.resolve_order(fixtures::ADA_PAID_ORDER).await {
            Err(err) => err,
            Ok(order) => panic!("expected failure, got {:?}", order),
        };
        assert_eq!(err.code, ErrorCode::ServiceUnavailable);
        assert_eq!(mock.hits("/orders/o-100"), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_customers_follow_requested_order() -> TestResult {
        let mock = MockLegacy::start().await?;
        let ctx = builder(&mock)?.build("r", None);

        let ids = vec![
            fixtures::CHIDI.to_string(),
            "c-404".to_string(),
            fixtures::ADA.to_string(),
        ];
        let customers = ctx.resolve_customers(&ids).await?;
        let names: Vec<&str> = customers.iter().map(|c| c.name.as_str()).collect();

        assert_eq!(names, vec!["Chidi Nwosu", "Ada Okafor"]);
        assert_eq!(mock.batch_requests().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_order_is_dropped_from_relationship() -> TestResult {
        let mock = MockLegacy::start().await?;
        mock.fail_always("/orders/o-101", 500);
        let ctx = builder(&mock)?.build("r", None);

        let orders = ctx.resolve_customer_orders(fixtures::ADA).await?;
        let ids: Vec<&str> = orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec![fixtures::ADA_PAID_ORDER]);
        Ok(())
    }

    #[tokio::test]
    async fn test_order_customer_failure_is_an_error() -> TestResult {
        let mock = MockLegacy::start().await?;
        mock.fail_always("/customers", 503);
        let ctx = builder(&mock)?.build("r", None);

        let order = match fixtures::legacy_order(fixtures::ADA_PAID_ORDER) {
            Some(order) => Order::from(order),
            None => panic!("fixture missing"),
        };
        let err = match ctx.resolve_order_customer(&order).await {
            Err(err) => err,
            Ok(owner) => panic!("expected failure, got {:?}", owner),
        };
        assert_eq!(err.code, ErrorCode::ServiceUnavailable);
        assert_eq!(mock.hits("/customers"), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_order_customer_absent_is_none() -> TestResult {
        let mock = MockLegacy::start().await?;
        let ctx = builder(&mock)?.build("r", None);

        let mut order = match fixtures::legacy_order(fixtures::BOLA_CANCELED_ORDER) {
            Some(order) => Order::from(order),
            None => panic!("fixture missing"),
        };
        let owner = ctx.resolve_order_customer(&order).await?;
        assert_eq!(owner.map(|c| c.id), Some(fixtures::BOLA.to_string()));

        order.customer_id = "c-404".to_string();
        assert_eq!(ctx.resolve_order_customer(&order).await?, None);
        Ok(())
    }
}
