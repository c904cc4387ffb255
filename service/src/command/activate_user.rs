//! [`Command`] for activating a [`User`] by an activation [`Token`].

use common::operations::{By, Select, Update};
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
    infra::{database, Clock, Database},
    Service,
};

use super::Command;

/// [`Command`] for activating a [`User`] by an activation [`Token`].
///
/// Checks are applied in a fixed order, the first failing one deciding the
/// [`activation::Outcome`]:
/// 1. [`Token`] decodes ([`activation::Outcome::DecryptionError`]);
/// 2. [`Token`] is not expired ([`activation::Outcome::ExpirationError`]);
/// 3. [`User`] exists ([`activation::Outcome::UserNotFound`]);
/// 4. [`User`] is not active yet
///    ([`activation::Outcome::AlreadyActivatedError`]);
/// 5. [`User`] gets activated by this very execution
///    ([`activation::Outcome::AlreadyActivatedError`] if another one won,
///    [`activation::Outcome::UserNotFound`] if it's gone meanwhile).
#[derive(Clone, Debug, From)]
pub struct ActivateUser {
    /// [`Token`] presented by the [`User`].
    pub token: activation::Token,
}

impl<Db, Clk> Command<ActivateUser> for Service<Db, Clk>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<user::Status>, user::Id>>,
            Ok = Option<user::Status>,
            Err = Traced<database::Error>,
        > + Database<
            Update<
                By<
                    activation::Transition,
                    (user::Id, user::ActivationDateTime),
                >,
            >,
            Ok = activation::Transition,
            Err = Traced<database::Error>,
        >,
    Clk: Clock,
{
    type Ok = activation::Outcome;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ActivateUser,
    ) -> Result<Self::Ok, Self::Err> {
        use activation::Outcome as O;
        use ExecutionError as E;

        let claims = match self.config().activation_codec.decode(&cmd.token) {
            Ok(claims) => claims,
            Err(e) => {
                log::debug!("rejected activation token: {e}");
                return Ok(O::DecryptionError);
            }
        };

        let now = self.clock().now();
        if let Err(e) = claims.validate(now) {
            log::debug!(user_id = %claims.user_id, "{e}");
            return Ok(O::ExpirationError);
        }

        let user_id = claims.user_id;
        if self
            .database()
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .is_none()
        {
            return Ok(O::UserNotFound);
        }

        match self
            .database()
            .execute(Select(By::<Option<user::Status>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        {
            // Deleted in between.
            None => return Ok(O::UserNotFound),
            Some(user::Status::Active) => return Ok(O::AlreadyActivatedError),
            Some(user::Status::Pending) => {}
        }

        let activated_at: user::ActivationDateTime = now.coerce();
        Ok(
            match self
                .database()
                .execute(Update(By::<activation::Transition, _>::new((
                    user_id,
                    activated_at,
                ))))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
            {
                activation::Transition::Activated => {
                    log::info!(user_id = %user_id, "`User` activated");
                    O::Success
                }
                activation::Transition::AlreadyActive => {
                    O::AlreadyActivatedError
                }
                // Deleted in between.
                activation::Transition::Missing => O::UserNotFound,
            },
        )
    }
}

/// Error of [`ActivateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}
