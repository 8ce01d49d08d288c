use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use learnhub_core::IdentityId;

/// Access-token claims model (transport-agnostic).
///
/// The minimal set of claims learnhub needs once a token has been decoded and
/// verified by the authentication authority's SDK. Roles are deliberately
/// absent: they are resolved from the role table on every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject / identity identifier.
    pub sub: IdentityId,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate access-token claims and yield the caller identity.
///
/// Signature verification / decoding is outside this crate.
pub fn validate_claims(
    claims: &AccessClaims,
    now: DateTime<Utc>,
) -> Result<IdentityId, TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(claims.sub)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn claims(issued: DateTime<Utc>, ttl: Duration) -> AccessClaims {
        AccessClaims {
            sub: IdentityId::new(),
            issued_at: issued,
            expires_at: issued + ttl,
        }
    }

    #[test]
    fn valid_token_yields_subject() {
        let now = Utc::now();
        let c = claims(now - Duration::minutes(1), Duration::hours(1));
        assert_eq!(validate_claims(&c, now).unwrap(), c.sub);
    }

    #[test]
    fn expired_token_rejected() {
        let now = Utc::now();
        let c = claims(now - Duration::hours(2), Duration::hours(1));
        assert_eq!(validate_claims(&c, now), Err(TokenValidationError::Expired));
    }

    #[test]
    fn future_token_rejected() {
        let now = Utc::now();
        let c = claims(now + Duration::minutes(5), Duration::hours(1));
        assert_eq!(validate_claims(&c, now), Err(TokenValidationError::NotYetValid));
    }

    #[test]
    fn inverted_window_rejected() {
        let now = Utc::now();
        let c = claims(now, Duration::zero());
        assert_eq!(validate_claims(&c, now), Err(TokenValidationError::InvalidTimeWindow));
    }
}
