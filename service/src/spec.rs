use std::{
    future::{Future, IntoFuture as _},
    pin::pin,
    sync::{Arc, Mutex},
    time::Duration,
};

use common::{
    operations::{By, Insert, Select, Update},
    DateTime,
};
use futures::future::{self, Either};
use secrecy::SecretString;
use tracerr::Traced;

use crate::{
    command::{
        activate_user, issue_activation_token, ActivateUser,
        IssueActivationToken,
    },
    domain::{
        user::{
            self,
            activation::{
                self,
                codec::{Key, KeyVersion},
                Outcome, Transition,
            },
        },
        User,
    },
    infra::{clock, database, mailer, Clock as _, Database, Mailer},
    query,
    task::{self, deliver_activation_emails::DeliveryError},
    Command, Config, Query as _, Service,
};

/// [`Mailer`] recording delivered messages.
#[derive(Clone, Debug, Default)]
struct Recording {
    sent: Arc<Mutex<Vec<mailer::Deliver>>>,
    failing: bool,
}

impl Recording {
    fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<mailer::Deliver> {
        self.sent.lock().unwrap().clone()
    }
}

impl Mailer<mailer::Deliver> for Recording {
    type Ok = ();
    type Err = Traced<mailer::Error>;

    async fn execute(
        &self,
        msg: mailer::Deliver,
    ) -> Result<Self::Ok, Self::Err> {
        if self.failing {
            return Err(tracerr::new!(mailer::Error::Transport(
                "connection refused".into()
            )));
        }
        self.sent.lock().unwrap().push(msg);
        Ok(())
    }
}

type TestService = Service<database::Memory, clock::Manual>;

const TTL: Duration = Duration::from_secs(3600);

fn codec(current: u32, versions: &[u32]) -> activation::Codec {
    activation::Codec::new(
        KeyVersion::from(current),
        versions.iter().map(|&v| Key {
            version: KeyVersion::from(v),
            secret: SecretString::from(format!("secret-{v}-").repeat(8)),
        }),
    )
    .unwrap()
}

fn config(codec: activation::Codec) -> Config {
    Config {
        activation_codec: codec,
        activation_ttl: activation::Ttl::new(TTL).unwrap(),
    }
}

fn service(
    codec: activation::Codec,
    db: database::Memory,
    mailer: Recording,
    clock: clock::Manual,
) -> (TestService, task::Background) {
    Service::with_clock(config(codec), db, mailer, clock)
}

fn manual_clock() -> clock::Manual {
    clock::Manual::new(DateTime::from_unix_timestamp(1_700_000_000).unwrap())
}

/// Runs the provided `body` while driving the [`task::Background`].
async fn with_background<F>(bg: task::Background, body: F) -> F::Output
where
    F: Future,
{
    match future::select(bg.into_future(), pin!(body)).await {
        Either::Left((res, _)) => panic!("`Background` stopped: {res:?}"),
        Either::Right((out, _)) => out,
    }
}

async fn pending_user(db: &database::Memory, email: &str) -> User {
    let user = User {
        id: user::Id::new(),
        email: user::Email::new(email).unwrap(),
        status: user::Status::Pending,
        created_at: DateTime::now().coerce(),
        activated_at: None,
    };
    db.execute(Insert(user.clone())).await.unwrap();
    user
}

async fn verify<Db>(
    svc: &Service<Db, clock::Manual>,
    token: &activation::Token,
) -> Outcome
where
    Service<Db, clock::Manual>: Command<
        ActivateUser,
        Ok = Outcome,
        Err = Traced<activate_user::ExecutionError>,
    >,
{
    svc.execute(ActivateUser {
        token: token.clone(),
    })
    .await
    .unwrap()
}

/// [`database::Memory`] answering reads with a `seen` snapshot of a [`User`],
/// while activating in the actual storage.
#[derive(Clone, Debug)]
struct Stale {
    db: database::Memory,
    seen: User,
}

impl Database<Select<By<Option<User>, user::Id>>> for Stale {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok((by.into_inner() == self.seen.id).then(|| self.seen.clone()))
    }
}

impl Database<Select<By<Option<user::Status>, user::Id>>> for Stale {
    type Ok = Option<user::Status>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<user::Status>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok((by.into_inner() == self.seen.id).then_some(self.seen.status))
    }
}

impl Database<Update<By<Transition, (user::Id, user::ActivationDateTime)>>>
    for Stale
{
    type Ok = Transition;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        op: Update<By<Transition, (user::Id, user::ActivationDateTime)>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.db.execute(op).await
    }
}

#[tokio::test]
async fn activates_end_to_end() {
    let db = database::Memory::default();
    let mailer = Recording::default();
    let clock = manual_clock();
    let (svc, bg) =
        service(codec(1, &[1]), db.clone(), mailer.clone(), clock.clone());

    with_background(bg, async {
        let alice = pending_user(&db, "alice@example.com").await;
        let bob = pending_user(&db, "bob@example.com").await;

        let issued = svc
            .execute(IssueActivationToken::ForUser(alice.clone()))
            .await
            .unwrap();
        assert_eq!(
            issued.expires_at.unix_timestamp(),
            1_700_000_000 + 3600,
        );
        issued.delivery.wait().await.unwrap();

        assert_eq!(verify(&svc, &issued.token).await, Outcome::Success);
        assert_eq!(
            verify(&svc, &issued.token).await,
            Outcome::AlreadyActivatedError,
        );

        let stored = svc
            .execute(query::user::ById::by(alice.id))
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_active());
        assert!(stored.activated_at.is_some());

        let late = svc
            .execute(IssueActivationToken::ByUserId(bob.id))
            .await
            .unwrap();
        clock.advance(TTL);
        assert_eq!(verify(&svc, &late.token).await, Outcome::ExpirationError);
        assert_eq!(
            svc.execute(query::user::StatusById::by(bob.id))
                .await
                .unwrap(),
            Some(user::Status::Pending),
        );
    })
    .await;
}

#[tokio::test]
async fn expires_at_exact_moment() {
    let db = database::Memory::default();
    let clock = manual_clock();
    let (svc, bg) = service(
        codec(1, &[1]),
        db.clone(),
        Recording::default(),
        clock.clone(),
    );

    with_background(bg, async {
        let user = pending_user(&db, "jane@example.com").await;
        let issued = svc
            .execute(IssueActivationToken::ForUser(user))
            .await
            .unwrap();

        clock.advance(TTL);
        assert_eq!(verify(&svc, &issued.token).await, Outcome::ExpirationError);
    })
    .await;

    let clock = manual_clock();
    let (svc, bg) = service(
        codec(1, &[1]),
        db.clone(),
        Recording::default(),
        clock.clone(),
    );
    with_background(bg, async {
        let user = pending_user(&db, "john@example.com").await;
        let issued = svc
            .execute(IssueActivationToken::ForUser(user))
            .await
            .unwrap();

        clock.advance(TTL - Duration::from_secs(1));
        assert_eq!(verify(&svc, &issued.token).await, Outcome::Success);
    })
    .await;
}

#[tokio::test]
async fn activates_exactly_once_concurrently() {
    let db = database::Memory::default();
    let (svc, bg) = service(
        codec(1, &[1]),
        db.clone(),
        Recording::default(),
        manual_clock(),
    );

    with_background(bg, async {
        let user = pending_user(&db, "jane@example.com").await;
        let issued = svc
            .execute(IssueActivationToken::ForUser(user))
            .await
            .unwrap();

        let outcomes =
            future::join_all((0..8).map(|_| verify(&svc, &issued.token)))
                .await;

        assert_eq!(
            outcomes.iter().filter(|o| **o == Outcome::Success).count(),
            1,
        );
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| **o == Outcome::AlreadyActivatedError)
                .count(),
            7,
        );
    })
    .await;
}

#[tokio::test]
async fn reports_unknown_user() {
    let (svc, bg) = service(
        codec(1, &[1]),
        database::Memory::default(),
        Recording::default(),
        manual_clock(),
    );

    with_background(bg, async {
        let claims = activation::Claims::issue(
            user::Id::new(),
            svc.clock().now(),
            svc.config().activation_ttl,
        );
        let token = svc.config().activation_codec.encode(&claims).unwrap();

        assert_eq!(verify(&svc, &token).await, Outcome::UserNotFound);

        let missing = user::Id::new();
        let err = svc
            .execute(IssueActivationToken::ByUserId(missing))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            issue_activation_token::ExecutionError::UserNotExists(id)
                if *id == missing,
        ));
    })
    .await;
}

#[tokio::test]
async fn rejects_tampering_before_expiration() {
    let db = database::Memory::default();
    let clock = manual_clock();
    let (svc, bg) = service(
        codec(1, &[1]),
        db.clone(),
        Recording::default(),
        clock.clone(),
    );

    with_background(bg, async {
        let user = pending_user(&db, "jane@example.com").await;
        let issued = svc
            .execute(IssueActivationToken::ForUser(user.clone()))
            .await
            .unwrap();
        clock.advance(TTL * 2);

        let mut tampered = issued.token.to_string();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        assert_eq!(
            verify(&svc, &tampered.into()).await,
            Outcome::DecryptionError,
        );
        assert_eq!(verify(&svc, &issued.token).await, Outcome::ExpirationError);
        assert_eq!(
            verify(&svc, &"not-a-token".into()).await,
            Outcome::DecryptionError,
        );
    })
    .await;
}

#[tokio::test]
async fn survives_key_rotation() {
    let db = database::Memory::default();
    let clock = manual_clock();

    let (old, old_bg) = service(
        codec(1, &[1]),
        db.clone(),
        Recording::default(),
        clock.clone(),
    );
    let (alice, bob) = with_background(old_bg, async {
        let alice = pending_user(&db, "alice@example.com").await;
        let bob = pending_user(&db, "bob@example.com").await;
        let alice = old
            .execute(IssueActivationToken::ForUser(alice))
            .await
            .unwrap();
        let bob = old
            .execute(IssueActivationToken::ForUser(bob))
            .await
            .unwrap();
        (alice.token, bob.token)
    })
    .await;

    let (rotating, rotating_bg) = service(
        codec(2, &[1, 2]),
        db.clone(),
        Recording::default(),
        clock.clone(),
    );
    with_background(rotating_bg, async {
        assert_eq!(verify(&rotating, &alice).await, Outcome::Success);
    })
    .await;

    let (rotated, rotated_bg) = service(
        codec(2, &[2]),
        db.clone(),
        Recording::default(),
        clock.clone(),
    );
    with_background(rotated_bg, async {
        assert_eq!(verify(&rotated, &bob).await, Outcome::DecryptionError);
    })
    .await;
}

#[tokio::test]
async fn delivers_issued_token() {
    let db = database::Memory::default();
    let mailer = Recording::default();
    let (svc, bg) =
        service(codec(1, &[1]), db.clone(), mailer.clone(), manual_clock());

    with_background(bg, async {
        let user = pending_user(&db, "jane@example.com").await;
        let issued = svc
            .execute(IssueActivationToken::ForUser(user.clone()))
            .await
            .unwrap();
        issued.delivery.wait().await.unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, user.email);
        assert_eq!(sent[0].token, issued.token);
        assert_eq!(sent[0].expires_at, issued.expires_at);
    })
    .await;
}

#[tokio::test]
async fn reports_failed_delivery_separately() {
    let db = database::Memory::default();
    let (svc, bg) = service(
        codec(1, &[1]),
        db.clone(),
        Recording::failing(),
        manual_clock(),
    );

    with_background(bg, async {
        let user = pending_user(&db, "jane@example.com").await;
        let issued = svc
            .execute(IssueActivationToken::ForUser(user))
            .await
            .unwrap();
        let token = issued.token.clone();

        let err = issued.delivery.wait().await.unwrap_err();
        assert!(matches!(err.as_ref(), DeliveryError::Mailer(_)));

        assert_eq!(verify(&svc, &token).await, Outcome::Success);
    })
    .await;
}

#[tokio::test]
async fn reports_activation_lost_to_concurrent_one() {
    let db = database::Memory::default();
    let clock = manual_clock();
    let seen = pending_user(&db, "jane@example.com").await;
    let (svc, bg) = Service::with_clock(
        config(codec(1, &[1])),
        Stale {
            db: db.clone(),
            seen: seen.clone(),
        },
        Recording::default(),
        clock.clone(),
    );

    with_background(bg, async {
        let issued = svc
            .execute(IssueActivationToken::ForUser(seen.clone()))
            .await
            .unwrap();

        let winner = By::<Transition, _>::new((seen.id, clock.now().coerce()));
        assert_eq!(
            db.execute(Update(winner)).await.unwrap(),
            Transition::Activated,
        );

        assert_eq!(
            verify(&svc, &issued.token).await,
            Outcome::AlreadyActivatedError,
        );
    })
    .await;
}

#[tokio::test]
async fn reports_user_deleted_during_activation() {
    let db = database::Memory::default();
    let clock = manual_clock();
    let (svc, bg) = Service::with_clock(
        config(codec(1, &[1])),
        Stale {
            db: db.clone(),
            seen: User {
                id: user::Id::new(),
                email: user::Email::new("gone@example.com").unwrap(),
                status: user::Status::Pending,
                created_at: DateTime::now().coerce(),
                activated_at: None,
            },
        },
        Recording::default(),
        clock.clone(),
    );

    with_background(bg, async {
        let gone = svc.database().seen.clone();
        let issued = svc
            .execute(IssueActivationToken::ForUser(gone))
            .await
            .unwrap();

        assert_eq!(verify(&svc, &issued.token).await, Outcome::UserNotFound);
    })
    .await;
}

#[tokio::test]
async fn stamps_activation_with_service_clock() {
    let db = database::Memory::default();
    let clock = manual_clock();
    let (svc, bg) = service(
        codec(1, &[1]),
        db.clone(),
        Recording::default(),
        clock.clone(),
    );

    with_background(bg, async {
        let user = pending_user(&db, "jane@example.com").await;
        let issued = svc
            .execute(IssueActivationToken::ForUser(user.clone()))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(90));

        assert_eq!(verify(&svc, &issued.token).await, Outcome::Success);

        let stored = svc
            .execute(query::user::ById::by(user.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            stored.activated_at.map(|at| at.unix_timestamp()),
            Some(1_700_000_000 + 90),
        );
    })
    .await;
}
