use serde::Serialize;
use thiserror::Error;

use learnhub_core::{DomainError, IdentityId};

use crate::policy::{Action, ReadScope, Resource, Rule, rule_for};
use crate::Caller;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: {action} on {resource} ({kind:?})")]
    Forbidden {
        resource: Resource,
        action: Action,
        kind: DenialKind,
    },
}

/// Authorization detail stays in logs; callers only ever see the opaque
/// `Forbidden`, which is the same error a missing row produces.
impl From<AuthzError> for DomainError {
    fn from(_: AuthzError) -> Self {
        DomainError::Forbidden
    }
}

/// Authorize `caller` to perform `action` on a `resource` row owned by `owner`.
///
/// - No IO
/// - No panics
/// - Pure policy check; the admin bit must already be resolved
pub fn authorize(
    caller: &Caller,
    resource: Resource,
    action: Action,
    owner: IdentityId,
) -> Result<(), AuthzError> {
    let rule = rule_for(resource, action);
    if rule.permits(caller, owner) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            resource,
            action,
            kind: denial_kind(rule, caller),
        })
    }
}

/// Compute the pre-filter for a row-scoped read of `resource`.
pub fn read_scope(caller: &Caller, resource: Resource) -> Result<ReadScope, AuthzError> {
    match rule_for(resource, Action::Read) {
        Rule::OwnerOrAdmin if caller.is_admin() => Ok(ReadScope::All),
        Rule::OwnerOrAdmin | Rule::Owner => Ok(ReadScope::Owner(caller.identity_id())),
        Rule::AdminOnly if caller.is_admin() => Ok(ReadScope::All),
        rule => Err(AuthzError::Forbidden {
            resource,
            action: Action::Read,
            kind: denial_kind(rule, caller),
        }),
    }
}

fn denial_kind(rule: Rule, caller: &Caller) -> DenialKind {
    match rule {
        Rule::Owner | Rule::OwnerOrAdmin => DenialKind::NotOwner,
        Rule::AdminOnly if !caller.is_admin() => DenialKind::AdminRequired,
        Rule::AdminOnly => DenialKind::NotPermitted,
        Rule::SystemOnly | Rule::CascadeOnly => DenialKind::SystemManaged,
        Rule::Denied => DenialKind::NotPermitted,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// The row belongs to someone else and the rule has no admin override.
    NotOwner,
    /// The operation needs the admin role.
    AdminRequired,
    /// Rows of this kind are only written by lifecycle triggers.
    SystemManaged,
    /// The operation does not exist for this resource.
    NotPermitted,
}

/// Detailed explanation of an authorization decision.
///
/// Never returned to callers; intended for structured audit logging.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub resource: Resource,
    pub action: Action,
    pub rule: Rule,
    pub granted: bool,
    pub caller_id: IdentityId,
    pub owner_id: IdentityId,
    pub caller_is_owner: bool,
    pub caller_is_admin: bool,
    pub reason: String,
    pub denial: Option<DenialKind>,
}

/// Explain why an authorization decision was made (or would be made).
pub fn explain_authorization(
    caller: &Caller,
    resource: Resource,
    action: Action,
    owner: IdentityId,
) -> AuthorizationExplanation {
    let rule = rule_for(resource, action);
    let granted = rule.permits(caller, owner);
    let caller_is_owner = caller.owns(owner);

    let reason = match (rule, granted) {
        (Rule::Owner, true) => "caller owns the row".to_string(),
        (Rule::OwnerOrAdmin, true) if caller_is_owner => "caller owns the row".to_string(),
        (Rule::OwnerOrAdmin, true) => "admin read override".to_string(),
        (Rule::AdminOnly, true) => "caller holds the admin role".to_string(),
        (Rule::Owner, false) => format!("{action} on {resource} is restricted to the owner"),
        (Rule::OwnerOrAdmin, false) => {
            format!("{action} on {resource} is restricted to the owner or an admin")
        }
        (Rule::AdminOnly, false) => format!("{action} on {resource} requires the admin role"),
        (Rule::SystemOnly, _) => format!("{resource} rows are created at registration only"),
        (Rule::CascadeOnly, _) => format!("{resource} rows are removed with their identity only"),
        (Rule::Denied, _) => format!("{action} is not supported on {resource}"),
    };

    AuthorizationExplanation {
        resource,
        action,
        rule,
        granted,
        caller_id: caller.identity_id(),
        owner_id: owner,
        caller_is_owner,
        caller_is_admin: caller.is_admin(),
        reason,
        denial: (!granted).then(|| denial_kind(rule, caller)),
    }
}
