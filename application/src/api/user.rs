//! [`User`]-related definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    define_error, AsError, Context, Error,
};

/// A [`User`] of the platform.
#[derive(Clone, Debug, From)]
pub struct User(domain::User);

/// A `User` of the platform, as far as its account activation is concerned.
#[graphql_object(context = Context)]
impl User {
    /// Unique identifier of this `User`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// Email the activation link of this `User` is sent to.
    #[must_use]
    pub fn email(&self) -> Email {
        self.0.email.clone().into()
    }

    /// Indicates whether this `User` has confirmed the account.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "User.isActive",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.0.is_active()
    }

    /// `DateTime` when this `User` was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// `DateTime` when this `User` confirmed the account.
    ///
    /// `null` while the `User` is not active.
    #[must_use]
    pub fn activated_at(&self) -> Option<DateTime> {
        self.0.activated_at.map(|at| at.coerce())
    }
}

/// Unique identifier of a `User`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::user::Id)]
#[into(domain::user::Id)]
#[graphql(name = "UserId", transparent)]
pub struct Id(Uuid);

/// Email of a `User`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "UserEmail",
    with = scalar::Via::<domain::user::Email>,
)]
pub struct Email(domain::user::Email);

impl AsError for service::command::issue_activation_token::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::JsonWebTokenEncodeError(_) => None,
            Self::UserNotExists(_) => Some(UserError::NotExists.into()),
        }
    }
}

define_error! {
    enum UserError {
        #[code = "USER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`User` does not exist"]
        NotExists,
    }
}
