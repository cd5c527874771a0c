//! Postgres [`Database`] implementation.

pub mod client;
mod impls;

use deadpool_postgres::Runtime;
use derive_more::{Deref, Display, Error as StdError, From};
use tokio_postgres::NoTls;
use tracerr::Traced;

use crate::infra::database;
#[cfg(doc)]
use crate::infra::Database;

pub use refinery::embed_migrations;

pub use self::client::{Connection, NonTx, Tx};

pub use deadpool_postgres::Config;

/// Postgres [`Database`] client.
///
/// Non-transactional by default, becomes [`Tx`] once [`Transact`]ed.
///
/// [`Transact`]: common::operations::Transact
#[derive(Clone, Copy, Debug, Deref)]
pub struct Postgres<T = NonTx>(T);

impl Postgres {
    /// Creates a new [`Postgres`] client with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If failed to create a new [`Postgres`] client.
    pub fn new(conf: &Config) -> Result<Self, Traced<database::Error>> {
        let pool = conf
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)?;
        Ok(Self(NonTx::from_pool(pool)))
    }
}

/// Postgres database [`Error`].
#[derive(Debug, Display, StdError, From)]
pub enum Error {
    /// Statement failed on the server or the connection broke.
    #[display("Postgres statement failed: {_0}")]
    Statement(tokio_postgres::Error),

    /// [`Config`] doesn't describe a usable pool.
    #[display("Failed to build the Postgres pool: {_0}")]
    PoolCreation(deadpool_postgres::CreatePoolError),

    /// No pooled connection could be provided.
    #[display("Failed to take a pooled Postgres connection: {_0}")]
    Pool(deadpool_postgres::PoolError),
}
