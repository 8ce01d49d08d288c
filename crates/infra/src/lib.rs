//! Infrastructure layer: storage, the access gate, lifecycle listeners, config.

pub mod config;
pub mod gate;
pub mod lifecycle;
pub mod store;
pub mod workers;

pub use config::{ConfigError, PostgresConfig, StoreConfig};
pub use gate::AccessGate;
pub use lifecycle::{IdentityLifecycle, Registration};
pub use store::{
    InMemoryLearningStore, LearningStore, PostgresLearningStore, SCHEMA, SharedStore, StoreError,
};
pub use workers::{EventWorker, WorkerHandle};
