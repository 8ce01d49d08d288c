use learnhub_core::IdentityId;

/// A fully resolved caller for a single operation.
///
/// The admin bit is looked up from the role table for every operation; a
/// `Caller` must not outlive the request it was resolved for, and nothing
/// cached by a client (session role, display name) feeds into it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Caller {
    identity_id: IdentityId,
    admin: bool,
}

impl Caller {
    pub fn new(identity_id: IdentityId, admin: bool) -> Self {
        Self { identity_id, admin }
    }

    pub fn identity_id(&self) -> IdentityId {
        self.identity_id
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    pub fn owns(&self, owner: IdentityId) -> bool {
        self.identity_id == owner
    }
}
