//! [`Command`] for issuing an activation [`Token`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::user::activation::Token;
use crate::{
    domain::{
        user::{self, activation},
        User,
    },
    infra::{database, mailer, Clock, Database},
    task::deliver_activation_emails::Receipt,
    Service,
};

use super::Command;

/// [`Command`] for issuing an activation [`Token`] and queueing it for
/// delivery to its [`User`].
///
/// Doesn't change the [`User`]'s activation status, so may be executed
/// repeatedly. Every issued [`Token`] stays valid until its own expiration.
#[derive(Clone, Debug, From)]
pub enum IssueActivationToken {
    /// Issue a [`Token`] for the provided [`User`].
    ForUser(User),

    /// Issue a [`Token`] for the [`User`] with the provided ID.
    ByUserId(user::Id),
}

/// Output of [`IssueActivationToken`] [`Command`].
#[derive(Debug)]
pub struct Output {
    /// Issued [`Token`].
    pub token: activation::Token,

    /// [`User`] the [`Token`] has been issued for.
    pub user: User,

    /// [`DateTime`] when the [`Token`] expires.
    ///
    /// [`DateTime`]: common::DateTime
    pub expires_at: activation::ExpirationDateTime,

    /// [`Receipt`] of the [`Token`] delivery.
    ///
    /// Delivery proceeds whether it's awaited or dropped.
    pub delivery: Receipt,
}

impl<Db, Clk> Command<IssueActivationToken> for Service<Db, Clk>
where
    Db: Database<
        Select<By<Option<User>, user::Id>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
    Clk: Clock,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: IssueActivationToken,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;
        use IssueActivationToken as Cmd;

        let user = match cmd {
            Cmd::ForUser(user) => user,
            Cmd::ByUserId(user_id) => self
                .database()
                .execute(Select(By::new(user_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::UserNotExists(user_id))
                .map_err(tracerr::wrap!())?,
        };

        let claims = activation::Claims::issue(
            user.id,
            self.clock().now(),
            self.config().activation_ttl,
        );
        let token = self
            .config()
            .activation_codec
            .encode(&claims)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let delivery = self.outbox().enqueue(mailer::Deliver {
            to: user.email.clone(),
            token: token.clone(),
            expires_at: claims.expires_at,
        });
        log::debug!(
            user_id = %user.id,
            expires_at = %claims.expires_at.to_rfc3339(),
            "activation token issued",
        );

        Ok(Output {
            token,
            user,
            expires_at: claims.expires_at,
            delivery,
        })
    }
}

/// Error of [`IssueActivationToken`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`jsonwebtoken`] encoding error.
    #[display("Failed to encode a JSON Web Token: {_0}")]
    JsonWebTokenEncodeError(jsonwebtoken::errors::Error),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}
