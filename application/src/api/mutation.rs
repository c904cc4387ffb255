//! GraphQL [`Mutation`]s definitions.

use juniper::graphql_object;
use service::{command, Command as _};

use crate::{api, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Activates the `User` the provided `ActivationToken` was issued for.
    ///
    /// Every possible result is reported as an `ActivationOutcome`, so this
    /// mutation only fails on internal errors.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "activateUser",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn activate_user(
        token: api::activation::Token,
        ctx: &Context,
    ) -> Result<api::activation::ActivationResult, Error> {
        ctx.service()
            .execute(command::ActivateUser {
                token: token.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Issues a new `ActivationToken` for the `User` with the provided ID and
    /// emails it to the `User`.
    ///
    /// Previously issued `ActivationToken`s stay valid until they expire.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `USER_NOT_EXISTS` - the `User` with the provided ID does not exist;
    /// - `DELIVERY_FAILED` - the email could not be delivered, and may be
    ///                       requested again.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "sendActivationEmail",
            otel.name = Self::SPAN_NAME,
            user_id = %user_id,
        ),
    )]
    pub async fn send_activation_email(
        user_id: api::user::Id,
        ctx: &Context,
    ) -> Result<api::activation::SendResult, Error> {
        let command::issue_activation_token::Output {
            user,
            expires_at,
            delivery,
            ..
        } = ctx
            .service()
            .execute(command::IssueActivationToken::ByUserId(user_id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        delivery
            .wait()
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        Ok(api::activation::SendResult {
            user: user.into(),
            expires_at: expires_at.coerce(),
        })
    }
}
