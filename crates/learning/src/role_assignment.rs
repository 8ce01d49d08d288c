use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use learnhub_auth::Role;
use learnhub_core::{Entity, IdentityId};

use crate::Owned;

/// An (identity, role) grant. The pair is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub identity_id: IdentityId,
    pub role: Role,
    pub granted_at: DateTime<Utc>,
}

impl RoleAssignment {
    pub fn new(identity_id: IdentityId, role: Role, granted_at: DateTime<Utc>) -> Self {
        Self {
            identity_id,
            role,
            granted_at,
        }
    }
}

impl Entity for RoleAssignment {
    type Id = (IdentityId, Role);

    fn id(&self) -> Self::Id {
        (self.identity_id, self.role)
    }
}

impl Owned for RoleAssignment {
    fn owner(&self) -> IdentityId {
        self.identity_id
    }
}
