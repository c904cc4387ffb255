//! [`User`] account activation definitions.
//!
//! A [`User`] starts [`Status::Pending`] and becomes [`Status::Active`] by
//! presenting a [`Token`] issued for it. The [`Token`] is a bearer capability:
//! possessing an authentic, unexpired one is enough to activate the account.
//!
//! [`Status::Active`]: user::Status::Active
//! [`Status::Pending`]: user::Status::Pending

pub mod codec;

use std::time::Duration;

use common::{unit, DateTime, DateTimeOf};
use derive_more::{AsRef, Debug, Display, Error, From, FromStr, Into};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::User;
use crate::domain::user;

pub use self::codec::Codec;

/// Claims sealed into an activation [`Token`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Claims {
    /// ID of the [`User`] to activate.
    #[serde(rename = "uid")]
    pub user_id: user::Id,

    /// [`DateTime`] when these [`Claims`] were issued.
    #[serde(rename = "iat", with = "common::datetime::serde::unix_timestamp")]
    pub issued_at: IssueDateTime,

    /// [`DateTime`] when these [`Claims`] expire.
    #[serde(rename = "exp", with = "common::datetime::serde::unix_timestamp")]
    pub expires_at: ExpirationDateTime,

    /// [`Nonce`] distinguishing [`Claims`] reissued for the same [`User`].
    pub nonce: Nonce,
}

impl Claims {
    /// Issues new [`Claims`] for the provided [`User`] at the `now` moment.
    ///
    /// Timestamps are truncated to whole seconds, so the [`Claims`] survive
    /// encoding unchanged.
    #[must_use]
    pub fn issue(user_id: user::Id, now: DateTime, ttl: Ttl) -> Self {
        let issued_at = now.truncated_to_seconds();
        Self {
            user_id,
            issued_at: issued_at.coerce(),
            expires_at: (issued_at + Duration::from(ttl)).coerce(),
            nonce: Nonce::new(),
        }
    }

    /// Checks these [`Claims`] against the provided `now` moment.
    ///
    /// Upper bound is closed: [`Claims`] are already expired at the exact
    /// [`Claims::expires_at`] moment.
    ///
    /// # Errors
    ///
    /// With [`Expired`] if `now` is not before [`Claims::expires_at`].
    pub fn validate(&self, now: DateTime) -> Result<(), Expired> {
        if now >= self.expires_at.coerce() {
            return Err(Expired {
                expires_at: self.expires_at,
            });
        }
        Ok(())
    }

    /// Indicates whether these [`Claims`] are well-formed, i.e. expire
    /// strictly after being issued.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.expires_at.coerce::<()>() > self.issued_at.coerce()
    }
}

/// Error of [`Claims`] being used at or after their expiration.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("`Claims` expired at {}", expires_at.unix_timestamp())]
pub struct Expired {
    /// [`DateTime`] when the [`Claims`] expired.
    pub expires_at: ExpirationDateTime,
}

/// Random value making every issued [`Claims`] unique.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[serde(transparent)]
pub struct Nonce(Uuid);

impl Nonce {
    /// Generates a new random [`Nonce`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Nonce {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque activation token, as handed to a [`User`].
///
/// Any string is accepted here: authenticity is only established by
/// [`Codec::decode()`].
#[derive(AsRef, Clone, Debug, Display, Eq, From, FromStr, Into, PartialEq)]
#[as_ref(str)]
#[debug("Token(..)")]
#[from(String, &str)]
pub struct Token(String);

/// Time-to-live of an activation [`Token`], in whole seconds.
#[derive(Clone, Copy, Debug, Eq, Into, Ord, PartialEq, PartialOrd)]
pub struct Ttl(Duration);

impl Ttl {
    /// Longest allowed [`Ttl`], 366 days.
    pub const MAX: Self = Self(Duration::from_secs(366 * 24 * 60 * 60));

    /// Creates a new [`Ttl`] out of the provided [`Duration`], dropping its
    /// sub-second part.
    ///
    /// [`None`] is returned if less than a second remains, or if it exceeds
    /// [`Ttl::MAX`].
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        let secs = duration.as_secs();
        (secs > 0 && secs <= Self::MAX.0.as_secs())
            .then(|| Self(Duration::from_secs(secs)))
    }
}

/// Result of an atomic [`User`] activation attempt in a store.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Transition {
    /// [`User`] was pending and is active now.
    Activated,

    /// [`User`] was active already, nothing changed.
    AlreadyActive,

    /// [`User`] doesn't exist, nothing changed.
    Missing,
}

/// Outcome of an activation [`Token`] verification.
///
/// Every variant is an expected result rather than an operational failure.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Outcome {
    /// [`Token`] is malformed, tampered, or sealed with an unknown key.
    ///
    /// The client has to request a new one.
    DecryptionError,

    /// [`Token`] is authentic, but expired.
    ///
    /// The client has to request a new one.
    ExpirationError,

    /// [`User`] is active already, so the [`Token`] changes nothing.
    ///
    /// The client should be directed to log in.
    AlreadyActivatedError,

    /// [`Token`] is authentic, but its [`User`] doesn't exist.
    UserNotFound,

    /// [`User`] has been activated by this very verification.
    Success,
}

/// [`DateTime`] when [`Claims`] were issued.
pub type IssueDateTime = DateTimeOf<(Claims, unit::Issuance)>;

/// [`DateTime`] when [`Claims`] expire.
pub type ExpirationDateTime = DateTimeOf<(Claims, unit::Expiration)>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::domain::user;

    use super::{Claims, Ttl};

    fn at(secs: i64) -> DateTime {
        DateTime::from_unix_timestamp(secs).unwrap()
    }

    #[test]
    fn ttl_requires_whole_second() {
        assert_eq!(Ttl::new(Duration::ZERO), None);
        assert_eq!(Ttl::new(Duration::from_millis(999)), None);
        assert_eq!(
            Ttl::new(Duration::from_millis(1500)),
            Ttl::new(Duration::from_secs(1)),
        );
    }

    #[test]
    fn ttl_is_bounded_above() {
        let max = Duration::from(Ttl::MAX);

        assert_eq!(Ttl::new(max), Some(Ttl::MAX));
        assert_eq!(Ttl::new(max + Duration::from_millis(999)), Some(Ttl::MAX));
        assert_eq!(Ttl::new(max + Duration::from_secs(1)), None);
        assert_eq!(
            Ttl::new(Duration::from_secs(400_000 * 365 * 24 * 60 * 60)),
            None,
        );

        let claims = Claims::issue(user::Id::new(), DateTime::now(), Ttl::MAX);
        assert!(claims.is_well_formed());
    }

    #[test]
    fn issues_second_aligned_claims() {
        let now = at(1_700_000_000) + Duration::from_micros(654_321);
        let ttl = Ttl::new(Duration::from_secs(60)).unwrap();

        let claims = Claims::issue(user::Id::new(), now, ttl);

        assert_eq!(claims.issued_at.unix_timestamp(), 1_700_000_000);
        assert_eq!(claims.expires_at.unix_timestamp(), 1_700_000_060);
        assert!(claims.is_well_formed());
    }

    #[test]
    fn reissued_claims_differ_by_nonce() {
        let id = user::Id::new();
        let ttl = Ttl::new(Duration::from_secs(60)).unwrap();

        let first = Claims::issue(id, at(1_700_000_000), ttl);
        let second = Claims::issue(id, at(1_700_000_000), ttl);

        assert_ne!(first.nonce, second.nonce);
        assert_ne!(first, second);
    }

    #[test]
    fn expires_exactly_at_expiration_moment() {
        let ttl = Ttl::new(Duration::from_secs(60)).unwrap();
        let claims = Claims::issue(user::Id::new(), at(1_000), ttl);

        let just_before = at(1_059) + Duration::from_micros(999_999);

        assert!(claims.validate(at(1_059)).is_ok());
        assert!(claims.validate(just_before).is_ok());
        assert!(claims.validate(at(1_060)).is_err());
        assert!(claims.validate(at(1_061)).is_err());
    }

    #[test]
    fn rejects_non_positive_lifetime() {
        let mut claims = Claims::issue(
            user::Id::new(),
            at(1_000),
            Ttl::new(Duration::from_secs(1)).unwrap(),
        );
        assert!(claims.is_well_formed());

        claims.expires_at = claims.issued_at.coerce();
        assert!(!claims.is_well_formed());
    }
}
