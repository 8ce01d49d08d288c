//! Identity lifecycle events published by the authentication authority.
//!
//! learnhub does not manage identities. It reacts to these two facts: a new
//! identity exists (create its profile and student role) and an identity is
//! gone (cascade every row it owns).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use learnhub_core::IdentityId;
use learnhub_events::Event;

/// A new identity was registered with the authentication authority.
///
/// `display_name` and `student_id` come from free-form registration metadata
/// and are normalized by the registration listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRegistered {
    pub identity_id: IdentityId,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// An identity was deleted from the authentication authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityDeleted {
    pub identity_id: IdentityId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IdentityEvent {
    Registered(IdentityRegistered),
    Deleted(IdentityDeleted),
}

impl IdentityEvent {
    pub fn identity_id(&self) -> IdentityId {
        match self {
            IdentityEvent::Registered(e) => e.identity_id,
            IdentityEvent::Deleted(e) => e.identity_id,
        }
    }
}

impl Event for IdentityEvent {
    fn event_type(&self) -> &'static str {
        match self {
            IdentityEvent::Registered(_) => "identity.registered",
            IdentityEvent::Deleted(_) => "identity.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            IdentityEvent::Registered(e) => e.occurred_at,
            IdentityEvent::Deleted(e) => e.occurred_at,
        }
    }
}
