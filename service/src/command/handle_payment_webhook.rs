//! [`Command`] for handling a payment gateway notification.

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

/// [`Command`] for settling a [`sale::Status::PendingPayment`] [`Sale`]
/// with the payment status reported by the payment gateway.
///
/// Duplicate notifications are rejected, since the [`Sale`] is not pending
/// anymore once settled.
#[derive(Clone, Debug)]
pub struct HandlePaymentWebhook {
    /// [`payment::Id`] of the [`Sale`] the notification is about.
    pub payment_id: payment::Id,

    /// Raw payment status, as reported by the payment gateway.
    pub status: String,
}

impl<Db> Command<HandlePaymentWebhook> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Sale>, payment::Id>>,
            Ok = Option<Sale>,
            Err = Traced<database::Error>,
        >,
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
    type Ok = Sale;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: HandlePaymentWebhook,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let HandlePaymentWebhook { payment_id, status } = cmd;

        let sale_id = self
            .database()
            .execute(Select(By::<Option<Sale>, _>::new(payment_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PaymentNotExists(payment_id))
            .map_err(tracerr::wrap!())?
            .id;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent settlements of the same `Sale`.
        tx.execute(Lock(By::<Sale, _>::new(sale_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut sale = tx
            .execute(Select(By::<Option<Sale>, _>::new(sale_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PaymentNotExists(payment_id))
            .map_err(tracerr::wrap!())?;

        if sale.status != sale::Status::PendingPayment {
            return Err(tracerr::new!(E::SaleNotPending(sale.id, sale.status)));
        }

        let outcome = status
            .parse::<payment::Outcome>()
            .map_err(|_| E::InvalidPaymentStatus(status))
            .map_err(tracerr::wrap!())?;

        sale.settle(outcome)
            .map_err(|status| E::SaleNotPending(sale_id, status))
            .map_err(tracerr::wrap!())?;

        tx.execute(Update(sale.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Sale(id: {sale_id})` settled by payment `{payment_id}` as `{}`",
            sale.status,
        );

        Ok(sale)
    }
}

/// Error of [`HandlePaymentWebhook`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Reported payment status is not recognized.
    #[display("invalid payment status received from webhook: `{_0}`")]
    InvalidPaymentStatus(#[error(not(source))] String),

    /// No [`Sale`] awaits the payment with the provided [`payment::Id`].
    #[display("`Sale(payment_id: {_0})` does not exist")]
    PaymentNotExists(#[error(not(source))] payment::Id),

    /// [`Sale`] is not [`sale::Status::PendingPayment`].
    #[display("`Sale(id: {_0})` is not in pending payment status: {_1}")]
    SaleNotPending(sale::Id, sale::Status),
}

impl ExecutionError {
    /// Returns the [`ErrorKind`] of this [`ExecutionError`].
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Db(_) => ErrorKind::Store,
            Self::InvalidPaymentStatus(_) => ErrorKind::Validation,
            Self::PaymentNotExists(_) => ErrorKind::NotFound,
            Self::SaleNotPending(..) => ErrorKind::Conflict,
        }
    }
}
