//! Tessera Core - Entity Types
//!
//! Pure data structures with no I/O. Every other Tessera crate depends on
//! this one for entity kinds, legacy and graph record shapes, and the
//! upstream error taxonomy.

pub mod entities;
pub mod enums;
pub mod error;

pub use entities::{
    cache_key, Customer, LegacyCustomer, LegacyCustomerOrders, LegacyCustomerRows, LegacyOrder,
    LegacyOrderRef, LegacyRecord, Order, RelationRef,
};
pub use enums::{EntityKind, FailureClass};
pub use error::{ConfigError, UpstreamError, UpstreamResult};
