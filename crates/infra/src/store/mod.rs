//! Relational storage boundary for learner-owned rows.
//!
//! Stores never authorize. They enforce the data-layer guarantees (unique
//! natural keys, referential integrity, atomic registration, cascade on
//! identity removal, profile timestamps) and accept a pre-computed
//! `ReadScope` for row-scoped listing.

pub mod in_memory;
pub mod postgres;
pub mod schema;
pub mod r#trait;

pub use in_memory::InMemoryLearningStore;
pub use postgres::PostgresLearningStore;
pub use r#trait::{LearningStore, SharedStore, StoreError};
pub use schema::SCHEMA;
