//! `learnhub-events`: event contracts and pub/sub mechanics.
//!
//! Identity lifecycle events arrive from the external authentication authority
//! and are fanned out to listeners through an [`EventBus`].

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
