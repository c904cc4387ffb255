//! Postgres [`Database`] implementation.

mod impls;

use deadpool_postgres::Runtime;
use derive_more::{Display, Error as StdError, From};
use tokio_postgres::{types::ToSql, NoTls, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database;
#[cfg(doc)]
use crate::infra::Database;

pub use deadpool_postgres::{
    Config, CreatePoolError as PoolCreationError, Pool, PoolError,
};
pub use refinery::embed_migrations;

/// Postgres [`Database`] client.
///
/// Every operation checks out its own pooled connection, so clones are cheap
/// and may be used concurrently.
#[derive(Clone, Debug)]
pub struct Postgres {
    /// [`Pool`] of connections.
    pool: Pool,
}

impl Postgres {
    /// Creates a new [`Postgres`] client with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If failed to create a new [`Pool`].
    pub fn new(conf: &Config) -> Result<Self, Traced<database::Error>> {
        let pool = conf
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)?;
        Ok(Self { pool })
    }

    /// Checks out a connection from the [`Pool`].
    async fn connection(
        &self,
    ) -> Result<deadpool_postgres::Client, Traced<database::Error>> {
        self.pool
            .get()
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)
    }

    /// Queries the provided statement with the given parameters and returns
    /// the optional resulting row.
    async fn query_opt<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .query_opt(stmt, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)
    }
}

/// Postgres database [`Error`].
#[derive(Debug, Display, StdError, From)]
pub enum Error {
    /// Connection error.
    #[display("Connection error: {_0}")]
    Connection(tokio_postgres::Error),

    /// Error of creating a new [`Pool`].
    #[display("Failed to create a new `Pool`: {_0}")]
    PoolCreationError(PoolCreationError),

    /// [`Pool`] error.
    #[display("`Pool` error: {_0}")]
    PoolError(PoolError),
}
