//! Row-level policy table.
//!
//! Every learnhub row is owned by exactly one identity. Whether a caller may
//! act on a row depends only on the (resource, action) pair, whether the
//! caller owns the row, and whether the caller holds `admin`.

use serde::{Deserialize, Serialize};

use learnhub_core::IdentityId;

use crate::Caller;

/// Kinds of rows guarded by the policy table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Profile,
    RoleAssignment,
    Enrollment,
    ExerciseCompletion,
    ResourceBookmark,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Profile,
        Resource::RoleAssignment,
        Resource::Enrollment,
        Resource::ExerciseCompletion,
        Resource::ResourceBookmark,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Resource::Profile => "profile",
            Resource::RoleAssignment => "role_assignment",
            Resource::Enrollment => "enrollment",
            Resource::ExerciseCompletion => "exercise_completion",
            Resource::ResourceBookmark => "resource_bookmark",
        }
    }
}

impl core::fmt::Display for Resource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell of the policy table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Only the owning identity.
    Owner,
    /// The owning identity, or any admin.
    OwnerOrAdmin,
    /// Any admin, regardless of ownership.
    AdminOnly,
    /// Performed by the registration listener; no caller may do it.
    SystemOnly,
    /// Happens only through identity deletion.
    CascadeOnly,
    /// Not an operation on this resource at all.
    Denied,
}

impl Rule {
    /// Whether `caller` may act on a row owned by `owner` under this rule.
    pub fn permits(self, caller: &Caller, owner: IdentityId) -> bool {
        match self {
            Rule::Owner => caller.identity_id() == owner,
            Rule::OwnerOrAdmin => caller.identity_id() == owner || caller.is_admin(),
            Rule::AdminOnly => caller.is_admin(),
            Rule::SystemOnly | Rule::CascadeOnly | Rule::Denied => false,
        }
    }
}

/// The policy table.
pub const fn rule_for(resource: Resource, action: Action) -> Rule {
    use Action::*;
    use Resource::*;

    match (resource, action) {
        (Profile, Create) => Rule::SystemOnly,
        (Profile, Read) => Rule::OwnerOrAdmin,
        (Profile, Update) => Rule::Owner,
        (Profile, Delete) => Rule::CascadeOnly,

        (RoleAssignment, Read) => Rule::OwnerOrAdmin,
        (RoleAssignment, Create | Update | Delete) => Rule::AdminOnly,

        (Enrollment, Create | Update) => Rule::Owner,
        (Enrollment, Read) => Rule::OwnerOrAdmin,
        (Enrollment, Delete) => Rule::Denied,

        (ExerciseCompletion, Create) => Rule::Owner,
        (ExerciseCompletion, Read) => Rule::OwnerOrAdmin,
        (ExerciseCompletion, Update | Delete) => Rule::Denied,

        (ResourceBookmark, Create | Update | Delete) => Rule::Owner,
        (ResourceBookmark, Read) => Rule::OwnerOrAdmin,
    }
}

/// Row filter applied by the store *inside* a query.
///
/// Reads are narrowed before rows are materialized, so a caller never
/// receives (or causes construction of) rows it may not see.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadScope {
    /// Every row (admin read override).
    All,
    /// Only rows owned by this identity.
    Owner(IdentityId),
}

impl ReadScope {
    pub fn permits(&self, owner: IdentityId) -> bool {
        match self {
            ReadScope::All => true,
            ReadScope::Owner(id) => *id == owner,
        }
    }

    /// The owner filter to bind into a query, `None` meaning unfiltered.
    pub fn owner(&self) -> Option<IdentityId> {
        match self {
            ReadScope::All => None,
            ReadScope::Owner(id) => Some(*id),
        }
    }
}
