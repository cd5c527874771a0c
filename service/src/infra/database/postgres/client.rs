//! Postgres database clients and the [`Connection`] they expose.

use std::{fmt, future::Future, sync::Arc};

use deadpool_postgres::{Object, Pool};
use futures::{FutureExt as _, TryFutureExt as _};
use ouroboros::self_referencing;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{self, postgres};

/// Statement runner shared by the [`NonTx`] and [`Tx`] clients.
pub trait Connection {
    /// Runs the provided statement and returns all the rows it produced.
    ///
    /// # Errors
    ///
    /// If failed to query the statement.
    fn query<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<Vec<Row>, Traced<database::Error>>>
    where
        T: ToStatement + ?Sized;

    /// Runs the provided statement expected to produce zero or one row.
    ///
    /// # Errors
    ///
    /// If failed to query the statement, or it produced several rows.
    fn query_opt<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<Option<Row>, Traced<database::Error>>>
    where
        T: ToStatement + ?Sized;

    /// Runs the provided statement and returns how many rows it touched.
    ///
    /// # Errors
    ///
    /// If failed to execute the statement.
    fn exec<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = Result<u64, Traced<database::Error>>>
    where
        T: ToStatement + ?Sized;
}

/// Non-transactional Postgres database client.
///
/// Every statement runs on its own [`Pool`]ed connection, which goes back to
/// the [`Pool`] right after.
#[derive(Clone, Debug)]
pub struct NonTx {
    /// [`Pool`] to take connections from.
    pool: Pool,
}

impl NonTx {
    /// Wraps the provided [`Pool`].
    #[must_use]
    pub(crate) fn from_pool(pool: Pool) -> Self {
        Self { pool }
    }

    /// Takes a connection out of the [`Pool`].
    ///
    /// # Errors
    ///
    /// If the [`Pool`] failed to provide a connection.
    pub(crate) async fn connection(
        &self,
    ) -> Result<Object, Traced<database::Error>> {
        self.pool
            .get()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

impl Connection for NonTx {
    async fn query<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        let conn = self.connection().await.map_err(tracerr::wrap!())?;
        conn.query(stmt, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }

    async fn query_opt<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        let conn = self.connection().await.map_err(tracerr::wrap!())?;
        conn.query_opt(stmt, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }

    async fn exec<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        let conn = self.connection().await.map_err(tracerr::wrap!())?;
        conn.execute(stmt, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

/// Open transaction pinned to the pooled connection it was started on.
///
/// The connection goes back to the [`Pool`] only when this is dropped.
#[self_referencing]
struct Transaction {
    /// Pooled connection the transaction runs on.
    conn: Object,

    /// [`None`] once committed.
    #[borrows(mut conn)]
    #[not_covariant]
    open: Option<deadpool_postgres::Transaction<'this>>,
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("committed", &self.with_open(|open| open.is_none()))
            .finish_non_exhaustive()
    }
}

impl Transaction {
    /// Issues `BEGIN` on the provided pooled connection.
    async fn begin(conn: Object) -> Result<Self, Traced<database::Error>> {
        Self::try_new_async_send(conn, |c| {
            c.transaction().map_ok(Some).boxed()
        })
        .await
        .map_err(tracerr::from_and_wrap!(=> postgres::Error))
        .map_err(tracerr::map_from)
    }

    /// Returns the still open [`deadpool_postgres::Transaction`].
    fn open(&self) -> &deadpool_postgres::Transaction<'_> {
        self.with_open(|open| open.as_ref().expect("used after commit"))
    }

    /// Issues `COMMIT`.
    async fn commit(mut self) -> Result<(), Traced<database::Error>> {
        #[expect(
            clippy::redundant_closure_for_method_calls,
            reason = "different variance, see \
                      https://doc.rust-lang.org/nomicon/subtyping.html#variance"
        )]
        self.with_open_mut(|open| open.take())
            .expect("committed only once")
            .commit()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

/// Transactional Postgres database client.
///
/// `BEGIN` is issued lazily, right before the first statement, and the
/// transaction is rolled back if this client is dropped without being
/// [`Tx::commit()`]ed. Clones share the same transaction.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`Pool`] to take the transaction connection from.
    pool: NonTx,

    /// Lazily started [`Transaction`].
    slot: Arc<Mutex<Option<Transaction>>>,
}

impl Tx {
    /// Creates a new [`Tx`] client drawing from the same [`Pool`] as the
    /// provided [`NonTx`] client.
    #[must_use]
    pub fn from_non_tx(client: &NonTx) -> Self {
        Self {
            pool: client.clone(),
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the [`Transaction`] of this [`Tx`] client, beginning it on
    /// first use.
    async fn transaction(
        &self,
    ) -> Result<MappedMutexGuard<'_, Transaction>, Traced<database::Error>>
    {
        let mut slot = self.slot.lock().await;
        let tx = if let Some(tx) = slot.take() {
            tx
        } else {
            let conn = self.pool.connection().await.map_err(tracerr::wrap!())?;
            Transaction::begin(conn).await.map_err(tracerr::wrap!())?
        };

        Ok(MutexGuard::map(slot, |slot| slot.insert(tx)))
    }

    /// Commits this [`Tx`] client.
    ///
    /// Does nothing if no statement was run in this [`Tx`] client.
    ///
    /// # Errors
    ///
    /// If failed to commit transaction of this [`Tx`] client.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let tx = self.slot.lock().await.take();
        match tx {
            Some(tx) => tx.commit().await.map_err(tracerr::wrap!()),
            None => Ok(()),
        }
    }
}

impl Connection for Tx {
    async fn query<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        let tx = self.transaction().await.map_err(tracerr::wrap!())?;
        tx.open()
            .query(stmt, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }

    async fn query_opt<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        let tx = self.transaction().await.map_err(tracerr::wrap!())?;
        tx.open()
            .query_opt(stmt, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }

    async fn exec<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        let tx = self.transaction().await.map_err(tracerr::wrap!())?;
        tx.open()
            .execute(stmt, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}
