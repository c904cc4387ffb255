//! [`Mailer`]-related definitions.
//!
//! Actual mail transport is provided by the platform, this crate only defines
//! the message it expects to get delivered.

mod log;

use derive_more::{Display, Error as StdError};

use crate::domain::user::{self, activation};

pub use self::log::Log;

/// Outbound email delivery.
pub use common::Handler as Mailer;

/// Message carrying an activation [`activation::Token`] to its [`User`].
///
/// [`User`]: crate::domain::User
#[derive(Clone, Debug)]
pub struct Deliver {
    /// [`user::Email`] to deliver the [`activation::Token`] to.
    pub to: user::Email,

    /// [`activation::Token`] to deliver.
    pub token: activation::Token,

    /// [`DateTime`] when the [`activation::Token`] expires.
    ///
    /// [`DateTime`]: common::DateTime
    pub expires_at: activation::ExpirationDateTime,
}

/// [`Mailer`] error.
#[derive(Clone, Debug, Display, StdError)]
pub enum Error {
    /// Mail transport refused or failed to deliver the message.
    #[display("Mail transport failed: {_0}")]
    Transport(#[error(not(source))] String),
}
