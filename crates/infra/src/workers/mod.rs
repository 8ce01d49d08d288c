//! Background workers driven by event bus subscriptions.

pub mod event_worker;

pub use event_worker::{EventWorker, WorkerHandle};
