//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Every learnhub row is keyed by a natural key (e.g. identity + course) rather
/// than a surrogate id, so `Id` is usually a small composite key type.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
