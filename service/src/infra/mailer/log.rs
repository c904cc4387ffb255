//! [`Log`] [`Mailer`] implementation.

use derive_more::Debug;
use tracerr::Traced;

use crate::infra::{mailer, Mailer};

use super::Deliver;

/// [`Mailer`] writing messages into the log instead of sending them.
///
/// Meant for development deployments without a mail transport.
#[derive(Clone, Debug)]
pub struct Log {
    /// Prefix of the activation link, the token is appended to it.
    link_prefix: String,
}

impl Log {
    /// Creates a new [`Log`] [`Mailer`] building activation links from the
    /// provided prefix.
    #[must_use]
    pub fn new(link_prefix: impl Into<String>) -> Self {
        Self {
            link_prefix: link_prefix.into(),
        }
    }

    /// Builds an activation link for the provided [`Deliver`] message.
    #[must_use]
    pub fn link(&self, msg: &Deliver) -> String {
        format!("{}{}", self.link_prefix, msg.token)
    }
}

impl Mailer<Deliver> for Log {
    type Ok = ();
    type Err = Traced<mailer::Error>;

    async fn execute(&self, msg: Deliver) -> Result<Self::Ok, Self::Err> {
        tracing::info!(
            to = %msg.to,
            expires_at = %msg.expires_at.to_rfc3339(),
            link = %self.link(&msg),
            "activation email delivered to log",
        );
        Ok(())
    }
}
