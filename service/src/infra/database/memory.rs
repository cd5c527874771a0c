//! In-memory [`Database`] implementation.

use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use common::operations::{By, Commit, Insert, Lock, Select, Transact, Update};
use derive_more::{Deref, Display, Error as StdError};
use itertools::Itertools as _;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracerr::Traced;

use crate::{
    domain::{payment, sale, Sale},
    infra::{database, Database},
    read,
};

/// Stored [`Sale`]s.
pub type Sales = HashMap<sale::Id, Sale>;

/// In-memory [`Database`] client.
///
/// Non-transactional by default, becomes [`Tx`] once [`Transact`]ed. A [`Tx`]
/// holds the whole store exclusively from its first operation until it's
/// [`Commit`]ted or dropped, so concurrent [`Tx`]s are fully serialized.
#[derive(Clone, Debug, Default, Deref)]
pub struct Memory<T = NonTx>(T);

impl Memory {
    /// Creates a new empty [`Memory`] client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following operation of this [`Memory`] client (and all
    /// its clones) fail with an [`Error::Unavailable`] if `available` is
    /// `false`.
    pub fn set_available(&self, available: bool) {
        self.0.store.unavailable.store(!available, Ordering::SeqCst);
    }
}

/// State shared between all the [`Memory`] clients of the same store.
#[derive(Debug, Default)]
struct Store {
    /// Committed [`Sale`]s.
    sales: Arc<Mutex<Sales>>,

    /// Indicator whether this [`Store`] rejects all operations.
    unavailable: AtomicBool,
}

impl Store {
    /// Checks whether this [`Store`] is available.
    fn ensure_available(&self) -> Result<(), Traced<database::Error>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(tracerr::new!(database::Error::from(
                Error::Unavailable
            )));
        }
        Ok(())
    }
}

/// Access to the [`Sales`] of a [`Memory`] client.
pub trait Access {
    /// Runs the provided function over the [`Sales`] visible to this client.
    ///
    /// # Errors
    ///
    /// If the store is unavailable.
    fn access<R>(
        &self,
        f: impl FnOnce(&mut Sales) -> R + Send,
    ) -> impl Future<Output = Result<R, Traced<database::Error>>> + Send
    where
        R: Send;
}

/// Non-transactional [`Memory`] client.
///
/// Every operation is applied to the committed [`Sale`]s immediately.
#[derive(Clone, Debug, Default)]
pub struct NonTx {
    /// Underlying [`Store`].
    store: Arc<Store>,
}

impl Access for NonTx {
    async fn access<R>(
        &self,
        f: impl FnOnce(&mut Sales) -> R + Send,
    ) -> Result<R, Traced<database::Error>>
    where
        R: Send,
    {
        self.store.ensure_available().map_err(tracerr::wrap!())?;
        let mut sales = self.store.sales.lock().await;
        Ok(f(&mut sales))
    }
}

/// Transactional [`Memory`] client.
///
/// Operations are applied to a working copy of the [`Sale`]s, which replaces
/// the committed ones on [`Commit`], and is discarded on drop otherwise.
#[derive(Clone, Debug)]
pub struct Tx {
    /// Underlying [`Store`].
    store: Arc<Store>,

    /// Lazily acquired [`Store`] lock along with the working copy.
    state: Arc<Mutex<Option<TxState>>>,
}

/// State of a running [`Tx`].
#[derive(Debug)]
struct TxState {
    /// Exclusive lock of the committed [`Sale`]s.
    committed: OwnedMutexGuard<Sales>,

    /// Working copy of the committed [`Sale`]s.
    working: Sales,
}

impl Access for Tx {
    async fn access<R>(
        &self,
        f: impl FnOnce(&mut Sales) -> R + Send,
    ) -> Result<R, Traced<database::Error>>
    where
        R: Send,
    {
        self.store.ensure_available().map_err(tracerr::wrap!())?;
        let mut state = self.state.lock().await;
        let mut tx = match state.take() {
            Some(tx) => tx,
            None => {
                let committed =
                    Arc::clone(&self.store.sales).lock_owned().await;
                let working = committed.clone();
                TxState { committed, working }
            }
        };
        let out = f(&mut tx.working);
        *state = Some(tx);
        Ok(out)
    }
}

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(Memory(Tx {
            store: Arc::clone(&self.0.store),
            state: Arc::new(Mutex::new(None)),
        }))
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.store.ensure_available().map_err(tracerr::wrap!())?;
        if let Some(TxState {
            mut committed,
            working,
        }) = self.state.lock().await.take()
        {
            *committed = working;
        }
        Ok(())
    }
}

impl<T: Access + Sync> Database<Lock<By<Sale, sale::Id>>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Sale, sale::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Accessing the store is enough to hold it until the end of `Tx`.
        self.access(|_| ()).await.map_err(tracerr::wrap!())
    }
}

impl<T: Access + Sync> Database<Insert<Sale>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(sale): Insert<Sale>,
    ) -> Result<Self::Ok, Self::Err> {
        self.access(|sales| drop(sales.insert(sale.id, sale)))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<T: Access + Sync> Database<Update<Sale>> for Memory<T> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(sale): Update<Sale>,
    ) -> Result<Self::Ok, Self::Err> {
        self.access(|sales| {
            if let Some(stored) = sales.get_mut(&sale.id) {
                *stored = sale;
            }
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<T: Access + Sync> Database<Select<By<Option<Sale>, sale::Id>>>
    for Memory<T>
{
    type Ok = Option<Sale>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Sale>, sale::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.access(|sales| sales.get(&id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<T: Access + Sync> Database<Select<By<Option<Sale>, sale::VehicleId>>>
    for Memory<T>
{
    type Ok = Option<Sale>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Sale>, sale::VehicleId>>,
    ) -> Result<Self::Ok, Self::Err> {
        let vehicle_id = by.into_inner();
        self.access(|sales| {
            sales
                .values()
                .filter(|s| s.vehicle_id == vehicle_id)
                .max_by_key(|s| s.created_at)
                .cloned()
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<T: Access + Sync> Database<Select<By<Option<Sale>, payment::Id>>>
    for Memory<T>
{
    type Ok = Option<Sale>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Sale>, payment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let payment_id = by.into_inner();
        self.access(|sales| {
            sales
                .values()
                .find(|s| s.payment_id() == Some(payment_id))
                .cloned()
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<T: Access + Sync>
    Database<Select<By<Vec<read::sale::ListItem>, sale::Status>>>
    for Memory<T>
{
    type Ok = Vec<read::sale::ListItem>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<read::sale::ListItem>, sale::Status>>,
    ) -> Result<Self::Ok, Self::Err> {
        let status = by.into_inner();
        self.access(|sales| {
            sales
                .values()
                .filter(|s| s.status == status)
                .sorted_by_key(|s| (s.price, s.created_at))
                .map(|s| read::sale::ListItem {
                    id: s.id,
                    vehicle_id: s.vehicle_id.clone(),
                    brand: s.brand.clone(),
                    model: s.model.clone(),
                    price: s.price,
                })
                .collect()
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Store is switched to be unavailable.
    #[display("`Memory` store is unavailable")]
    Unavailable,
}

#[cfg(test)]
mod spec {
    use common::{
        operations::{By, Commit, Insert, Lock, Select, Transact},
        DateTimeOf,
    };
    use rust_decimal::Decimal;

    use crate::{
        domain::{sale, Sale},
        infra::Database as _,
    };

    use super::Memory;

    fn sale(vehicle_id: &str, price: i64) -> Sale {
        Sale::new(vehicle_id, "Fiat", "Toro", Decimal::from(price)).unwrap()
    }

    async fn by_id(db: &Memory, id: sale::Id) -> Option<Sale> {
        db.execute(Select(By::<Option<Sale>, _>::new(id))).await.unwrap()
    }

    #[tokio::test]
    async fn commit_publishes_changes() {
        let db = Memory::new();
        let s = sale("veh-1", 10);

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(s.clone())).await.unwrap();
        tx.execute(Commit).await.unwrap();

        assert_eq!(by_id(&db, s.id).await, Some(s));
    }

    #[tokio::test]
    async fn drop_discards_changes() {
        let db = Memory::new();
        let s = sale("veh-1", 10);

        {
            let tx = db.execute(Transact).await.unwrap();
            tx.execute(Lock(By::<Sale, _>::new(s.id))).await.unwrap();
            tx.execute(Insert(s.clone())).await.unwrap();
        }

        assert_eq!(by_id(&db, s.id).await, None);
    }

    #[tokio::test]
    async fn picks_latest_sale_of_vehicle() {
        let db = Memory::new();
        let mut older = sale("veh-1", 10);
        older.created_at =
            DateTimeOf::from_rfc3339("2020-01-01T00:00:00Z").unwrap();
        let newer = sale("veh-1", 20);
        db.execute(Insert(older)).await.unwrap();
        db.execute(Insert(newer.clone())).await.unwrap();

        let found = db
            .execute(Select(By::<Option<Sale>, _>::new(
                newer.vehicle_id.clone(),
            )))
            .await
            .unwrap();

        assert_eq!(found.map(|s| s.id), Some(newer.id));
    }

    #[tokio::test]
    async fn unavailable_store_fails_operations() {
        let db = Memory::new();
        db.set_available(false);

        assert!(db.execute(Insert(sale("veh-1", 10))).await.is_err());
        let tx = db.execute(Transact).await.unwrap();
        assert!(tx.execute(Commit).await.is_err());

        db.set_available(true);
        assert!(db.execute(Insert(sale("veh-1", 10))).await.is_ok());
    }
}
