//! Account activation definitions.

use common::DateTime;
use derive_more::{AsRef, From, Into};
use juniper::{GraphQLEnum, GraphQLObject, GraphQLScalar};
use service::{
    domain::user::activation, task::deliver_activation_emails::DeliveryError,
};

use crate::{
    api::{self, scalar},
    define_error, AsError, Context, Error,
};

/// Activation token, as received in the confirmation email.
#[derive(AsRef, Clone, Debug, From, GraphQLScalar, Into)]
#[graphql(
    name = "ActivationToken",
    with = scalar::Via::<activation::Token>,
)]
pub struct Token(activation::Token);

/// Outcome of an `activateUser` mutation.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ActivationOutcome")]
pub enum Outcome {
    /// `ActivationToken` is malformed or forged.
    DecryptionError,

    /// `ActivationToken` has expired, a new one should be requested.
    ExpirationError,

    /// `User` has already been activated, and should just log in.
    AlreadyActivatedError,

    /// `User` the `ActivationToken` was issued for doesn't exist.
    UserNotFound,

    /// `User` has been activated.
    Success,
}

impl From<activation::Outcome> for Outcome {
    fn from(outcome: activation::Outcome) -> Self {
        use activation::Outcome as O;

        match outcome {
            O::DecryptionError => Self::DecryptionError,
            O::ExpirationError => Self::ExpirationError,
            O::AlreadyActivatedError => Self::AlreadyActivatedError,
            O::UserNotFound => Self::UserNotFound,
            O::Success => Self::Success,
        }
    }
}

impl Outcome {
    /// Returns the stable numeric code of this [`Outcome`].
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::DecryptionError => 1,
            Self::ExpirationError => 2,
            Self::AlreadyActivatedError => 3,
            Self::UserNotFound => 4,
            Self::Success => 5,
        }
    }

    /// Returns the human-readable message of this [`Outcome`].
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::DecryptionError => {
                "Token is invalid. Please contact support."
            }
            Self::ExpirationError => "Account confirmation link has expired!",
            Self::AlreadyActivatedError => {
                "You were already activated. Please login with your account!"
            }
            Self::UserNotFound => "The user does not exist!",
            Self::Success => {
                "Thank you for your confirmation. Please login with your \
                 account!"
            }
        }
    }
}

/// Result of an `activateUser` mutation.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(context = Context)]
pub struct ActivationResult {
    /// Outcome of the activation.
    pub outcome: Outcome,

    /// Numeric code of the `outcome`.
    pub code: i32,

    /// Message to show to the `User`.
    pub message: String,
}

impl From<activation::Outcome> for ActivationResult {
    fn from(outcome: activation::Outcome) -> Self {
        let outcome = Outcome::from(outcome);
        Self {
            outcome,
            code: outcome.code(),
            message: outcome.message().to_owned(),
        }
    }
}

/// Result of a `sendActivationEmail` mutation.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(context = Context, name = "SendActivationEmailResult")]
pub struct SendResult {
    /// `User` the email has been sent to.
    pub user: api::User,

    /// `DateTime` when the sent `ActivationToken` expires.
    pub expires_at: DateTime,
}

impl AsError for service::command::activate_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for DeliveryError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Mailer(_) | Self::Abandoned => {
                Some(ActivationError::DeliveryFailed.into())
            }
        }
    }
}

define_error! {
    enum ActivationError {
        #[code = "DELIVERY_FAILED"]
        #[status = INTERNAL_SERVER_ERROR]
        #[message = "Activation email could not be delivered, try again later"]
        DeliveryFailed,
    }
}

#[cfg(test)]
mod spec {
    use service::domain::user::activation;

    use super::{ActivationResult, Outcome};

    #[test]
    fn maps_outcomes() {
        for (outcome, code, message) in [
            (
                activation::Outcome::DecryptionError,
                1,
                "Token is invalid. Please contact support.",
            ),
            (
                activation::Outcome::ExpirationError,
                2,
                "Account confirmation link has expired!",
            ),
            (
                activation::Outcome::AlreadyActivatedError,
                3,
                "You were already activated. Please login with your account!",
            ),
            (
                activation::Outcome::UserNotFound,
                4,
                "The user does not exist!",
            ),
            (
                activation::Outcome::Success,
                5,
                "Thank you for your confirmation. Please login with your \
                 account!",
            ),
        ] {
            let res = ActivationResult::from(outcome);

            assert_eq!(res.outcome, Outcome::from(outcome));
            assert_eq!(res.code, code);
            assert_eq!(res.message, message);
        }
    }
}
