use chrono::{DateTime, Utc};

/// A domain-agnostic event.
///
/// Events are immutable facts. They may be delivered more than once, so every
/// consumer must be idempotent.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "identity.registered").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred at the source.
    fn occurred_at(&self) -> DateTime<Utc>;
}
