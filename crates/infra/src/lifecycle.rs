//! Identity lifecycle listener.
//!
//! Registration is the only path that creates a profile and the initial
//! student role; identity deletion is the only path that removes them. Both
//! react to events from the authentication authority, which delivers
//! at-least-once: a redelivered registration hits the uniqueness constraints
//! and is treated as already applied. Removed identities are remembered, so a
//! registration arriving after the deletion does not bring the account back.

use std::io;
use std::sync::Arc;

use chrono::Utc;
use tokio::runtime::Handle;
use tracing::{debug, info};

use learnhub_auth::{IdentityDeleted, IdentityEvent, IdentityRegistered, Role};
use learnhub_core::{DomainError, DomainResult};
use learnhub_events::{Event, EventBus};
use learnhub_learning::{NewProfile, Profile, RoleAssignment};

use crate::store::LearningStore;
use crate::workers::{EventWorker, WorkerHandle};

/// Rows written for a newly registered identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub profile: Profile,
    pub role: RoleAssignment,
}

pub struct IdentityLifecycle<S: ?Sized> {
    store: Arc<S>,
}

impl<S> IdentityLifecycle<S>
where
    S: LearningStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create the profile and student role for a new identity, atomically.
    ///
    /// Fails with `Conflict` if either row already exists.
    pub async fn register(&self, event: &IdentityRegistered) -> DomainResult<Registration> {
        let now = Utc::now();
        let fields = NewProfile::from_registration(
            event.display_name.as_deref(),
            event.student_id.as_deref(),
        );
        let profile = Profile::create(event.identity_id, fields, now);
        let role = RoleAssignment::new(event.identity_id, Role::Student, now);

        self.store.register_identity(&profile, &role).await?;
        info!(identity_id = %event.identity_id, "identity registered");

        Ok(Registration { profile, role })
    }

    /// Remove an identity and everything it owns.
    pub async fn remove(&self, event: &IdentityDeleted) -> DomainResult<bool> {
        let existed = self.store.remove_identity(event.identity_id).await?;
        info!(identity_id = %event.identity_id, existed, "identity removed");
        Ok(existed)
    }

    /// Apply one lifecycle event. Safe to call again with the same event.
    pub async fn handle(&self, event: IdentityEvent) -> DomainResult<()> {
        debug!(
            event_type = event.event_type(),
            identity_id = %event.identity_id(),
            "handling identity event"
        );
        match event {
            IdentityEvent::Registered(registered) => match self.register(&registered).await {
                Ok(_) => Ok(()),
                Err(DomainError::Conflict(what)) => {
                    debug!(
                        identity_id = %registered.identity_id,
                        duplicate = %what,
                        "registration already applied"
                    );
                    Ok(())
                }
                Err(err) => Err(err),
            },
            IdentityEvent::Deleted(deleted) => self.remove(&deleted).await.map(|_| ()),
        }
    }
}

impl<S> IdentityLifecycle<S>
where
    S: LearningStore + ?Sized + 'static,
{
    /// Drive this listener from a bus subscription on a worker thread.
    ///
    /// Each event is handled to completion on `runtime` before the next one
    /// is received.
    pub fn spawn_listener<B>(self: Arc<Self>, bus: B, runtime: Handle) -> io::Result<WorkerHandle>
    where
        B: EventBus<IdentityEvent> + Send + Sync + 'static,
    {
        EventWorker::spawn("identity-lifecycle", bus, move |event: IdentityEvent| {
            runtime.block_on(self.handle(event))
        })
    }
}
