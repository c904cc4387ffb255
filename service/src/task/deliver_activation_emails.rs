//! [`DeliverActivationEmails`] [`Task`].

use std::convert::Infallible;

use common::operations::{Perform, Start};
use derive_more::{Display, Error, From};
use tokio::{
    sync::{mpsc, oneshot},
    task,
};
use tracerr::Traced;
use tracing as log;

use crate::infra::{mailer, Mailer};

use super::Task;

/// [`Task`] delivering activation emails off the issuing path.
///
/// Every [`mailer::Deliver`] message is handed to the [`Mailer`] on its own,
/// so a slow delivery doesn't hold the ones queued after it.
#[derive(Clone, Copy, Debug)]
pub struct DeliverActivationEmails<M> {
    /// [`Mailer`] to deliver messages with.
    mailer: M,
}

impl<M> DeliverActivationEmails<M> {
    /// Creates a new [`DeliverActivationEmails`] [`Task`] delivering with the
    /// provided [`Mailer`].
    #[must_use]
    pub fn new(mailer: M) -> Self {
        Self { mailer }
    }
}

impl<M> Task<Start<Inbox>> for DeliverActivationEmails<M>
where
    Self: Task<Perform<mailer::Deliver>, Ok = (), Err = Traced<DeliveryError>>
        + Clone
        + 'static,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(mut inbox): Start<Inbox>,
    ) -> Result<Self::Ok, Self::Err> {
        while let Some(Delivery { message, report }) = inbox.0.recv().await {
            let this = self.clone();
            drop(task::spawn_local(async move {
                let res = this.execute(Perform(message)).await;
                if let Err(e) = &res {
                    log::error!("`task::DeliverActivationEmails` failed: {e}");
                }
                // Nobody may be waiting for the `Receipt`.
                _ = report.send(res);
            }));
        }
        log::debug!("`task::DeliverActivationEmails` inbox closed");
        Ok(())
    }
}

impl<M> Task<Perform<mailer::Deliver>> for DeliverActivationEmails<M>
where
    M: Mailer<mailer::Deliver, Ok = (), Err = Traced<mailer::Error>>,
{
    type Ok = ();
    type Err = Traced<DeliveryError>;

    async fn execute(
        &self,
        Perform(message): Perform<mailer::Deliver>,
    ) -> Result<Self::Ok, Self::Err> {
        self.mailer
            .execute(message)
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }
}

/// Queued [`mailer::Deliver`] message along with its [`Receipt`] end.
#[derive(Debug)]
struct Delivery {
    /// Message to deliver.
    message: mailer::Deliver,

    /// Sender of the delivery result to the [`Receipt`].
    report: oneshot::Sender<Result<(), Traced<DeliveryError>>>,
}

/// Sending half of the [`DeliverActivationEmails`] queue.
#[derive(Clone, Debug)]
pub struct Outbox(mpsc::UnboundedSender<Delivery>);

impl Outbox {
    /// Enqueues the provided [`mailer::Deliver`] message without waiting for
    /// its delivery.
    ///
    /// If the [`DeliverActivationEmails`] [`Task`] is gone already, the
    /// returned [`Receipt`] resolves to [`DeliveryError::Abandoned`].
    #[must_use]
    pub fn enqueue(&self, message: mailer::Deliver) -> Receipt {
        let (report, receipt) = oneshot::channel();
        if let Err(mpsc::error::SendError(Delivery { message, .. })) =
            self.0.send(Delivery { message, report })
        {
            log::warn!(
                to = %message.to,
                "`task::DeliverActivationEmails` is not running, \
                 activation email is abandoned",
            );
        }
        Receipt(receipt)
    }
}

/// Receiving half of the [`DeliverActivationEmails`] queue.
#[derive(Debug)]
pub struct Inbox(mpsc::UnboundedReceiver<Delivery>);

/// Creates a new linked [`Outbox`] and [`Inbox`] pair.
#[must_use]
pub fn channel() -> (Outbox, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Outbox(tx), Inbox(rx))
}

/// Handle to the result of a single enqueued [`mailer::Deliver`] message.
///
/// May be dropped freely: delivery doesn't depend on it being awaited.
#[derive(Debug)]
pub struct Receipt(oneshot::Receiver<Result<(), Traced<DeliveryError>>>);

impl Receipt {
    /// Waits for the delivery to finish.
    ///
    /// # Errors
    ///
    /// With a [`DeliveryError`] if the message wasn't delivered.
    pub async fn wait(self) -> Result<(), Traced<DeliveryError>> {
        self.0
            .await
            .unwrap_or_else(|_| Err(tracerr::new!(DeliveryError::Abandoned)))
    }
}

/// Error of delivering an activation email.
#[derive(Debug, Display, Error, From)]
pub enum DeliveryError {
    /// [`Mailer`] failed to deliver the message.
    #[display("`Mailer` failed: {_0}")]
    Mailer(mailer::Error),

    /// Message was dropped before being handed to a [`Mailer`].
    #[display("Delivery was abandoned")]
    #[from(ignore)]
    Abandoned,
}

#[cfg(test)]
mod spec {
    use std::sync::{Arc, Mutex};

    use common::operations::Start;
    use tokio::task::LocalSet;
    use tracerr::Traced;

    use crate::{
        domain::user::{self, activation},
        infra::{mailer, Mailer},
        task::Task as _,
    };

    use super::{channel, DeliverActivationEmails, DeliveryError};

    #[derive(Clone, Debug, Default)]
    struct Recording(Arc<Mutex<Vec<mailer::Deliver>>>);

    impl Mailer<mailer::Deliver> for Recording {
        type Ok = ();
        type Err = Traced<mailer::Error>;

        async fn execute(
            &self,
            msg: mailer::Deliver,
        ) -> Result<Self::Ok, Self::Err> {
            if msg.to.to_string() == "bounce@example.com" {
                return Err(tracerr::new!(mailer::Error::Transport(
                    "mailbox unavailable".into()
                )));
            }
            self.0.lock().unwrap().push(msg);
            Ok(())
        }
    }

    fn message(to: &str) -> mailer::Deliver {
        mailer::Deliver {
            to: user::Email::new(to).unwrap(),
            token: activation::Token::from("token"),
            expires_at: common::DateTime::now().coerce(),
        }
    }

    #[tokio::test]
    async fn reports_each_delivery() {
        let mailer = Recording::default();
        let (outbox, inbox) = channel();
        let task = DeliverActivationEmails::new(mailer.clone());

        LocalSet::new()
            .run_until(async move {
                let worker =
                    tokio::task::spawn_local(async move {
                        task.execute(Start(inbox)).await
                    });

                let ok = outbox.enqueue(message("jane@example.com"));
                let bounced = outbox.enqueue(message("bounce@example.com"));

                ok.wait().await.unwrap();
                assert!(matches!(
                    bounced.wait().await.unwrap_err().as_ref(),
                    DeliveryError::Mailer(mailer::Error::Transport(_)),
                ));

                drop(outbox);
                worker.await.unwrap().unwrap();
            })
            .await;

        let sent = mailer.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to.to_string(), "jane@example.com");
    }

    #[tokio::test]
    async fn abandons_when_not_running() {
        let (outbox, inbox) = channel();
        drop(inbox);

        let err = outbox
            .enqueue(message("jane@example.com"))
            .wait()
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), DeliveryError::Abandoned));
    }
}
