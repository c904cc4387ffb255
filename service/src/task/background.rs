//! Background environment for running [`Task`]s.

use std::{
    error::Error,
    future::{Future, IntoFuture},
    iter,
};

use futures::{
    future::{self, LocalBoxFuture},
    FutureExt as _, TryFutureExt as _,
};
use tokio::task;

#[cfg(doc)]
use crate::Task;

/// Background environment for running [`Task`]s.
#[derive(Debug, Default)]
pub struct Background {
    /// Local set of tasks.
    set: task::LocalSet,

    /// Handles of spawned tasks.
    handles: Vec<task::JoinHandle<Result<(), BoxedError>>>,
}

/// Shortcut for a [`Background`] [`Task`] error.
type BoxedError = Box<dyn Error + 'static>;

impl Background {
    /// Spawns a new [`Task`] inside the [`Background`] environment.
    ///
    /// The [`Task`] may [`task::spawn_local()`] further futures, as it runs
    /// inside the same [`task::LocalSet`].
    pub fn spawn<F, E>(&mut self, future: F)
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: Error + 'static,
    {
        self.handles.push(self.set.spawn_local(
            future.map_err(|e| BoxedError::from(Box::new(e))),
        ));
    }
}

impl IntoFuture for Background {
    type Output = Result<(), BoxedError>;
    type IntoFuture = LocalBoxFuture<'static, Self::Output>;

    /// Runs all the spawned [`Task`]s, resolving on the first failed one.
    fn into_future(self) -> Self::IntoFuture {
        let Self { set, handles } = self;
        future::try_join_all(iter::once(set.map(Ok).boxed_local()).chain(
            handles.into_iter().map(|h| {
                h.map(|r| match r {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(e),
                    Err(e) => Err(BoxedError::from(Box::new(e))),
                })
                .boxed_local()
            }),
        ))
        .map_ok(drop)
        .boxed_local()
    }
}

#[cfg(test)]
mod spec {
    use std::{cell::Cell, rc::Rc};

    use derive_more::{Display, Error};
    use tokio::task;

    use super::Background;

    #[derive(Debug, Display, Error)]
    #[display("boom")]
    struct Boom;

    #[tokio::test]
    async fn runs_nested_local_tasks() {
        let counter = Rc::new(Cell::new(0));

        let mut bg = Background::default();
        let c = Rc::clone(&counter);
        bg.spawn(async move {
            task::spawn_local(async move { c.set(c.get() + 1) })
                .await
                .map_err(|_| Boom)
        });

        bg.await.unwrap();
        assert_eq!(counter.get(), 1);
    }

    #[tokio::test]
    async fn fails_on_task_error() {
        let mut bg = Background::default();
        bg.spawn(async { Err::<(), _>(Boom) });

        assert_eq!(bg.await.unwrap_err().to_string(), "boom");
    }
}
