//! [`Command`] for purchasing a listed vehicle.

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{payment, sale, Sale},
    infra::{database, Database},
    Service,
};

use super::{Command, ErrorKind};

/// [`Command`] for initiating a purchase of an [`sale::Status::Available`]
/// [`Sale`], moving it to the [`sale::Status::PendingPayment`].
///
/// Returns the [`payment::Id`] the payment gateway is expected to report
/// back.
#[derive(Clone, Debug)]
pub struct Purchase {
    /// ID of the [`Sale`] to purchase.
    pub sale_id: sale::Id,

    /// [`sale::BuyerCpf`] of the buyer.
    pub buyer_cpf: sale::BuyerCpf,
}

impl<Db> Command<Purchase> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Sale, sale::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Sale>, sale::Id>>,
            Ok = Option<Sale>,
            Err = Traced<database::Error>,
        > + Database<Update<Sale>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = payment::Id;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: Purchase) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let Purchase { sale_id, buyer_cpf } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent purchases of the same `Sale`.
        tx.execute(Lock(By::<Sale, _>::new(sale_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut sale = tx
            .execute(Select(By::<Option<Sale>, _>::new(sale_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::SaleNotExists(sale_id))
            .map_err(tracerr::wrap!())?;

        let payment_id = sale
            .purchase(buyer_cpf)
            .map_err(|status| E::SaleNotAvailable(sale_id, status))
            .map_err(tracerr::wrap!())?;

        tx.execute(Update(sale))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Sale(id: {sale_id})` awaits payment `{payment_id}`",
        );

        Ok(payment_id)
    }
}

/// Error of [`Purchase`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Sale`] is not [`sale::Status::Available`].
    #[display("`Sale(id: {_0})` is not available for purchase: {_1}")]
    SaleNotAvailable(sale::Id, sale::Status),

    /// [`Sale`] with the provided ID does not exist.
    #[display("`Sale(id: {_0})` does not exist")]
    SaleNotExists(#[error(not(source))] sale::Id),
}

impl ExecutionError {
    /// Returns the [`ErrorKind`] of this [`ExecutionError`].
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Db(_) => ErrorKind::Store,
            Self::SaleNotAvailable(..) => ErrorKind::Conflict,
            Self::SaleNotExists(_) => ErrorKind::NotFound,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::collections::HashSet;

    use crate::{
        command::{
            fixture::{list_toro, service},
            Command as _, ErrorKind, HandlePaymentWebhook,
        },
        domain::sale,
        query, Query as _, UpdatePolicy,
    };

    use super::Purchase;

    fn purchase(sale_id: sale::Id) -> Purchase {
        Purchase {
            sale_id,
            buyer_cpf: sale::BuyerCpf::new("12345678900").unwrap(),
        }
    }

    #[tokio::test]
    async fn moves_sale_to_pending_payment() {
        let svc = service(UpdatePolicy::Lenient);
        let listed = list_toro(&svc).await;

        let payment_id = svc.execute(purchase(listed.id)).await.unwrap();

        let sale = svc
            .execute(query::sale::ById::by(listed.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sale.status, sale::Status::PendingPayment);
        assert_eq!(sale.payment_id(), Some(payment_id));
        let bought = sale.purchase.unwrap();
        assert_eq!(bought.buyer_cpf.as_ref(), "12345678900");
        assert!(bought.purchased_at.coerce::<()>() >= sale.created_at.coerce());
    }

    #[tokio::test]
    async fn fails_for_unknown_sale() {
        let svc = service(UpdatePolicy::Lenient);

        let err = svc
            .execute(purchase(sale::Id::new()))
            .await
            .unwrap_err();

        assert_eq!(err.as_ref().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn rejects_second_purchase() {
        let svc = service(UpdatePolicy::Lenient);
        let listed = list_toro(&svc).await;
        let payment_id = svc.execute(purchase(listed.id)).await.unwrap();
        let before = svc
            .execute(query::sale::ById::by(listed.id))
            .await
            .unwrap();

        let err = svc.execute(purchase(listed.id)).await.unwrap_err();

        assert_eq!(err.as_ref().kind(), ErrorKind::Conflict);
        let after = svc
            .execute(query::sale::ById::by(listed.id))
            .await
            .unwrap();
        assert_eq!(after, before);
        assert_eq!(after.unwrap().payment_id(), Some(payment_id));
    }

    #[tokio::test]
    async fn rejects_settled_sale() {
        for (status, settled) in [
            ("APPROVED", sale::Status::Sold),
            ("CANCELED", sale::Status::Canceled),
        ] {
            let svc = service(UpdatePolicy::Lenient);
            let listed = list_toro(&svc).await;
            let payment_id = svc.execute(purchase(listed.id)).await.unwrap();
            _ = svc
                .execute(HandlePaymentWebhook {
                    payment_id,
                    status: status.into(),
                })
                .await
                .unwrap();
            let before = svc
                .execute(query::sale::ById::by(listed.id))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(before.status, settled);

            let err = svc.execute(purchase(listed.id)).await.unwrap_err();

            assert_eq!(err.as_ref().kind(), ErrorKind::Conflict, "{settled}");
            let after = svc
                .execute(query::sale::ById::by(listed.id))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(after, before);
            assert_eq!(after.payment_id(), Some(payment_id));
        }
    }

    /// Unlike a plain read-modify-write, the row lock lets only one of the
    /// concurrent purchases through.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_purchases_succeed_once() {
        let svc = service(UpdatePolicy::Lenient);
        let listed = list_toro(&svc).await;

        let tasks = (0..8)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move {
                    svc.execute(purchase(listed.id))
                        .await
                        .map_err(|e| e.as_ref().kind())
                })
            })
            .collect::<Vec<_>>();
        let mut payments = HashSet::new();
        let mut conflicts = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(payment_id) => assert!(payments.insert(payment_id)),
                Err(kind) => {
                    assert_eq!(kind, ErrorKind::Conflict);
                    conflicts += 1;
                }
            }
        }

        assert_eq!(payments.len(), 1);
        assert_eq!(conflicts, 7);
        let sale = svc
            .execute(query::sale::ById::by(listed.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sale.payment_id(), payments.into_iter().next());
    }

    #[tokio::test]
    async fn reports_store_failure() {
        let svc = service(UpdatePolicy::Lenient);
        let listed = list_toro(&svc).await;
        svc.database().set_available(false);

        let err = svc.execute(purchase(listed.id)).await.unwrap_err();

        assert_eq!(err.as_ref().kind(), ErrorKind::Store);
    }
}
