//! Tessera Test Utilities
//!
//! Shared test infrastructure for the Tessera workspace:
//! - Fixtures mirroring the legacy service's demo data set
//! - Proptest generators for legacy records
//! - An in-process mock of the legacy record service with fault injection

pub mod mock_legacy;

pub use mock_legacy::{Fault, MockLegacy};

pub use tessera_core::{
    Customer, EntityKind, LegacyCustomer, LegacyOrder, Order, RelationRef, UpstreamError,
};

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! The legacy demo data set: three customers, four orders.

    use super::*;

    pub const ADA: &str = "c-001";
    pub const BOLA: &str = "c-002";
    pub const CHIDI: &str = "c-003";

    pub const ADA_PAID_ORDER: &str = "o-100";
    pub const ADA_NEW_ORDER: &str = "o-101";
    pub const BOLA_CANCELED_ORDER: &str = "o-200";
    pub const CHIDI_PAID_ORDER: &str = "o-300";

    fn customer(id: &str, name: &str, email: &str, tier: &str) -> LegacyCustomer {
        LegacyCustomer {
            customer_id: id.to_string(),
            full_name: name.to_string(),
            email_address: email.to_string(),
            tier: tier.to_string(),
        }
    }

    fn order(id: &str, customer_id: &str, status: &str, total: f64, created_at: &str) -> LegacyOrder {
        LegacyOrder {
            order_id: id.to_string(),
            customer_id: customer_id.to_string(),
            status: status.to_string(),
            total_amount: total,
            created_at: created_at.to_string(),
        }
    }

    pub fn legacy_customers() -> Vec<LegacyCustomer> {
        vec![
            customer(ADA, "Ada Okafor", "ada@example.com", "PRO"),
            customer(BOLA, "Bola Adeyemi", "bola@example.com", "FREE"),
            customer(CHIDI, "Chidi Nwosu", "chidi@example.com", "ENT"),
        ]
    }

    pub fn legacy_orders() -> Vec<LegacyOrder> {
        vec![
            order(ADA_PAID_ORDER, ADA, "PAID", 199.0, "2026-03-01T09:00:00.000Z"),
            order(ADA_NEW_ORDER, ADA, "NEW", 49.0, "2026-03-02T09:00:00.000Z"),
            order(BOLA_CANCELED_ORDER, BOLA, "CANCELED", 20.0, "2026-03-02T08:00:00.000Z"),
            order(CHIDI_PAID_ORDER, CHIDI, "PAID", 999.0, "2026-03-02T07:00:00.000Z"),
        ]
    }

    pub fn legacy_customer(id: &str) -> Option<LegacyCustomer> {
        legacy_customers().into_iter().find(|c| c.customer_id == id)
    }

    pub fn legacy_order(id: &str) -> Option<LegacyOrder> {
        legacy_orders().into_iter().find(|o| o.order_id == id)
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for legacy records.

    use super::*;
    use proptest::prelude::*;

    /// Identifier in the legacy `x-NNN` style.
    pub fn arb_record_id(prefix: &'static str) -> impl Strategy<Value = String> {
        (0u16..1000).prop_map(move |n| format!("{}-{:03}", prefix, n))
    }

    pub fn arb_tier() -> impl Strategy<Value = String> {
        prop_oneof![Just("FREE"), Just("PRO"), Just("ENT")].prop_map(str::to_string)
    }

    pub fn arb_order_status() -> impl Strategy<Value = String> {
        prop_oneof![Just("NEW"), Just("PAID"), Just("CANCELED")].prop_map(str::to_string)
    }

    pub fn arb_legacy_customer() -> impl Strategy<Value = LegacyCustomer> {
        (arb_record_id("c"), "[A-Z][a-z]{2,8} [A-Z][a-z]{2,8}", arb_tier()).prop_map(
            |(customer_id, full_name, tier)| LegacyCustomer {
                email_address: format!("{}@example.com", customer_id),
                customer_id,
                full_name,
                tier,
            },
        )
    }

    pub fn arb_legacy_order() -> impl Strategy<Value = LegacyOrder> {
        (
            arb_record_id("o"),
            arb_record_id("c"),
            arb_order_status(),
            0u32..100_000,
        )
            .prop_map(|(order_id, customer_id, status, cents)| LegacyOrder {
                order_id,
                customer_id,
                status,
                total_amount: f64::from(cents) / 100.0,
                created_at: "2026-03-01T00:00:00.000Z".to_string(),
            })
    }
}
