//! [`Command`] definition.

pub mod activate_user;
pub mod issue_activation_token;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    activate_user::ActivateUser, issue_activation_token::IssueActivationToken,
};
