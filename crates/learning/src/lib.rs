//! `learnhub-learning`: learner-owned rows and the progress calculator.
//!
//! Every type here is a plain value: validation happens on construction, and
//! nothing performs IO. Authorization and persistence live in `learnhub-infra`.

pub mod bookmark;
pub mod completion;
pub mod enrollment;
pub mod profile;
pub mod progress;
pub mod role_assignment;

pub use bookmark::{BookmarkKey, NewBookmark, ResourceBookmark};
pub use completion::{CompletionKey, ExerciseCompletion, NewCompletion};
pub use enrollment::{Enrollment, EnrollmentKey};
pub use profile::{DEFAULT_DISPLAY_NAME, NewProfile, Profile, ProfileChanges};
pub use progress::{Percent, compute_progress, validate_total};
pub use role_assignment::RoleAssignment;

use learnhub_core::IdentityId;

/// A row owned by exactly one identity.
///
/// Ownership is what the row-level policy keys on, and what identity deletion
/// cascades over.
pub trait Owned {
    fn owner(&self) -> IdentityId;
}
