//! `learnhub-auth`: pure authorization boundary.
//!
//! This crate is intentionally decoupled from storage: it decides whether a
//! caller may act on a row owned by some identity, and how row-scoped reads
//! must be narrowed. Role membership is resolved by the caller of this crate
//! (the access gate) through a privileged lookup, never read from tokens.

pub mod authorize;
pub mod claims;
pub mod identity;
pub mod policy;
pub mod principal;
pub mod roles;

pub use authorize::{
    AuthorizationExplanation, AuthzError, DenialKind, authorize, explain_authorization, read_scope,
};
pub use claims::{AccessClaims, TokenValidationError, validate_claims};
pub use identity::{IdentityDeleted, IdentityEvent, IdentityRegistered};
pub use policy::{Action, ReadScope, Resource, Rule, rule_for};
pub use principal::Caller;
pub use roles::Role;
