//! Property-Based Tests for Aggregation over Generated Legacy Data
//!
//! For any legacy data set and any requested id list (duplicates and unknown
//! ids included):
//! - `customers(ids)` returns the known customers in requested order
//! - the customer loader resolves every requested key in order, reaching
//!   upstream with exactly one batch of distinct ids
//! - an order's `customer` resolves to its owner, or absent when the owner is
//!   not in the data set

use std::collections::HashSet;
use std::time::Duration;

use proptest::prelude::*;
use tessera_api::{ContextBuilder, GatewayConfig};
use tessera_core::{Customer, LegacyCustomer, Order};
use tessera_test_utils::{generators::*, MockLegacy};

// ============================================================================
// TEST CONFIGURATION
// ============================================================================

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 24,
        ..ProptestConfig::default()
    }
}

/// Customers with distinct ids.
fn arb_customers(max: usize) -> impl Strategy<Value = Vec<LegacyCustomer>> {
    prop::collection::vec(arb_legacy_customer(), 0..max).prop_map(|customers| {
        let mut seen = HashSet::new();
        customers
            .into_iter()
            .filter(|c| seen.insert(c.customer_id.clone()))
            .collect()
    })
}

/// Customer set plus a request list drawn from those ids and some unknown
/// ones.
fn arb_data_set() -> impl Strategy<Value = (Vec<LegacyCustomer>, Vec<String>)> {
    arb_customers(8).prop_flat_map(|customers| {
        let known: Vec<String> = customers.iter().map(|c| c.customer_id.clone()).collect();
        let pick = if known.is_empty() {
            arb_record_id("x").boxed()
        } else {
            prop_oneof![
                3 => prop::sample::select(known),
                1 => arb_record_id("x"),
            ]
            .boxed()
        };
        (Just(customers), prop::collection::vec(pick, 0..12))
    })
}

fn runtime() -> Result<tokio::runtime::Runtime, TestCaseError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| TestCaseError::fail(e.to_string()))
}

fn contexts(mock: &MockLegacy) -> Result<ContextBuilder, TestCaseError> {
    ContextBuilder::from_config(&GatewayConfig {
        legacy_base_url: mock.base_url(),
        backoff_base: Duration::from_millis(1),
        ..GatewayConfig::default()
    })
    .map_err(|e| TestCaseError::fail(e.to_string()))
}

fn expected_customers(customers: &[LegacyCustomer], ids: &[String]) -> Vec<Customer> {
    ids.iter()
        .filter_map(|id| customers.iter().find(|c| &c.customer_id == id))
        .cloned()
        .map(Customer::from)
        .collect()
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(config())]

    #[test]
    fn prop_customers_follow_requested_order((customers, ids) in arb_data_set()) {
        let runtime = runtime()?;
        let result = runtime.block_on(async {
            let mock = MockLegacy::start_with(customers.clone(), Vec::new(), Duration::ZERO)
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let ctx = contexts(&mock)?.build("prop", None);
            let resolved = ctx
                .resolve_customers(&ids)
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            Ok::<_, TestCaseError>((resolved, mock.batch_requests().len()))
        })?;

        prop_assert_eq!(result.0, expected_customers(&customers, &ids));
        prop_assert_eq!(result.1, usize::from(!ids.is_empty()));
    }

    #[test]
    fn prop_customer_loader_single_batch_of_distinct_ids((customers, ids) in arb_data_set()) {
        let runtime = runtime()?;
        let (results, batches) = runtime.block_on(async {
            let mock = MockLegacy::start_with(customers.clone(), Vec::new(), Duration::ZERO)
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let ctx = contexts(&mock)?.build("prop", None);
            let results = ctx.loaders.customers.load_many(&ids).await;
            Ok::<_, TestCaseError>((results, mock.batch_requests()))
        })?;

        prop_assert_eq!(results.len(), ids.len());
        for (id, result) in ids.iter().zip(&results) {
            let expected = customers
                .iter()
                .find(|c| &c.customer_id == id)
                .cloned()
                .map(Customer::from);
            prop_assert_eq!(result, &Ok(expected));
        }

        let mut distinct = Vec::new();
        for id in &ids {
            if !distinct.contains(id) {
                distinct.push(id.clone());
            }
        }
        if distinct.is_empty() {
            prop_assert!(batches.is_empty());
        } else {
            prop_assert_eq!(batches, vec![distinct]);
        }
    }

    #[test]
    fn prop_order_customer_resolves_owner_or_absent(
        customers in arb_customers(4),
        order in arb_legacy_order(),
    ) {
        let runtime = runtime()?;
        let owner = runtime.block_on(async {
            let mock = MockLegacy::start_with(customers.clone(), vec![order.clone()], Duration::ZERO)
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let ctx = contexts(&mock)?.build("prop", None);
            ctx.resolve_order_customer(&Order::from(order.clone()))
                .await
                .map_err(|e| TestCaseError::fail(e.to_string()))
        })?;

        let expected = customers
            .iter()
            .find(|c| c.customer_id == order.customer_id)
            .cloned()
            .map(Customer::from);
        prop_assert_eq!(owner, expected);
    }
}
