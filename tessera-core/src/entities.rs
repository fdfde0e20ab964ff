//! Legacy record shapes and the graph-shaped entities derived from them.
//!
//! Legacy records use the record service's snake_case field names. Graph
//! entities use the names the graph API exposes. The mapping is a pure
//! `From` conversion applied once per record; nothing is kept in legacy
//! shape after it.

use serde::{Deserialize, Serialize};

use crate::EntityKind;

// ============================================================================
// LEGACY RECORDS
// ============================================================================

/// Record returned by `GET /customers/{id}` and inside `GET /customers?ids=`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyCustomer {
    pub customer_id: String,
    pub full_name: String,
    pub email_address: String,
    pub tier: String,
}

/// Record returned by `GET /orders/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyOrder {
    pub order_id: String,
    pub customer_id: String,
    pub status: String,
    pub total_amount: f64,
    pub created_at: String,
}

/// Body of `GET /customers?ids=a,b,c`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyCustomerRows {
    #[serde(default)]
    pub rows: Vec<LegacyCustomer>,
}

/// One entry of the `orders` array in `GET /customers/{id}/orders`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyOrderRef {
    pub order_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Body of `GET /customers/{id}/orders`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyCustomerOrders {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub orders: Vec<LegacyOrderRef>,
}

/// A legacy record that knows its own identifier.
///
/// Batch responses come back in arbitrary order, so executors index them by
/// this id before handing results back to a loader.
pub trait LegacyRecord {
    const KIND: EntityKind;

    fn record_id(&self) -> &str;
}

impl LegacyRecord for LegacyCustomer {
    const KIND: EntityKind = EntityKind::Customer;

    fn record_id(&self) -> &str {
        &self.customer_id
    }
}

impl LegacyRecord for LegacyOrder {
    const KIND: EntityKind = EntityKind::Order;

    fn record_id(&self) -> &str {
        &self.order_id
    }
}

// ============================================================================
// RELATION REFERENCES
// ============================================================================

/// Lightweight `(id, status)` pair from a "list relations of X" call.
///
/// Only drives per-id lookups; never returned to graph callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRef {
    pub id: String,
    pub status: Option<String>,
}

impl From<LegacyOrderRef> for RelationRef {
    fn from(r: LegacyOrderRef) -> Self {
        Self {
            id: r.order_id,
            status: r.status,
        }
    }
}

// ============================================================================
// GRAPH ENTITIES
// ============================================================================

/// Customer as exposed by the graph API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub tier: String,
}

impl From<LegacyCustomer> for Customer {
    fn from(c: LegacyCustomer) -> Self {
        Self {
            id: c.customer_id,
            name: c.full_name,
            email: c.email_address,
            tier: c.tier,
        }
    }
}

/// Order as exposed by the graph API. `customer_id` is the foreign reference
/// used to resolve the owning customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub status: String,
    pub total: f64,
    pub created_at: String,
    pub customer_id: String,
}

impl From<LegacyOrder> for Order {
    fn from(o: LegacyOrder) -> Self {
        Self {
            id: o.order_id,
            status: o.status,
            total: o.total_amount,
            created_at: o.created_at,
            customer_id: o.customer_id,
        }
    }
}

/// Cache key for an entity of `kind` with identifier `id`.
pub fn cache_key(kind: EntityKind, id: &str) -> String {
    format!("{}:{}", kind, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_mapping() -> Result<(), serde_json::Error> {
        let legacy: LegacyCustomer = serde_json::from_str(
            r#"{"customer_id":"c-001","full_name":"Ada Okafor","email_address":"ada@example.com","tier":"PRO"}"#,
        )?;
        assert_eq!(legacy.record_id(), "c-001");

        let customer = Customer::from(legacy);
        assert_eq!(customer.id, "c-001");
        assert_eq!(customer.name, "Ada Okafor");
        assert_eq!(customer.email, "ada@example.com");
        assert_eq!(customer.tier, "PRO");
        Ok(())
    }

    #[test]
    fn test_order_mapping_keeps_foreign_key() {
        let order = Order::from(LegacyOrder {
            order_id: "o-100".to_string(),
            customer_id: "c-001".to_string(),
            status: "PAID".to_string(),
            total_amount: 199.0,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        });
        assert_eq!(order.id, "o-100");
        assert_eq!(order.customer_id, "c-001");
        assert_eq!(order.total, 199.0);
        assert_eq!(order.created_at, "2026-01-01T00:00:00Z");
    }

    #[test]
    fn test_missing_collections_default_to_empty() -> Result<(), serde_json::Error> {
        let rows: LegacyCustomerRows = serde_json::from_str("{}")?;
        assert!(rows.rows.is_empty());

        let orders: LegacyCustomerOrders = serde_json::from_str(r#"{"customer_id":"c-009"}"#)?;
        assert!(orders.orders.is_empty());
        Ok(())
    }

    #[test]
    fn test_relation_ref_status_is_optional() -> Result<(), serde_json::Error> {
        let body: LegacyCustomerOrders = serde_json::from_str(
            r#"{"customer_id":"c-001","orders":[{"order_id":"o-100","status":"PAID"},{"order_id":"o-101"}]}"#,
        )?;
        let refs: Vec<RelationRef> = body.orders.into_iter().map(RelationRef::from).collect();
        assert_eq!(refs[0].status.as_deref(), Some("PAID"));
        assert_eq!(refs[1].id, "o-101");
        assert_eq!(refs[1].status, None);
        Ok(())
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key(EntityKind::Customer, "c-001"), "customer:c-001");
    }
}
