//! [`Command`] for editing a listed vehicle.

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use rust_decimal::Decimal;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{sale, Sale},
    infra::{database, Database},
    Service, UpdatePolicy,
};

use super::{Command, ErrorKind};

/// [`Command`] for overwriting the brand, model and price of the latest
/// [`Sale`] of a vehicle.
///
/// Whether a non-[`sale::Status::Available`] [`Sale`] may be edited is
/// decided by the configured [`UpdatePolicy`].
#[derive(Clone, Debug)]
pub struct UpdateListing {
    /// ID of the listed vehicle.
    pub vehicle_id: sale::VehicleId,

    /// New brand of the vehicle.
    pub brand: String,

    /// New model of the vehicle.
    pub model: String,

    /// New price of the vehicle.
    pub price: Decimal,
}

impl<Db> Command<UpdateListing> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Sale>, sale::VehicleId>>,
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

    async fn execute(&self, cmd: UpdateListing) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateListing {
            vehicle_id,
            brand,
            model,
            price,
        } = cmd;

        let listing = sale::Listing::new(brand, model, price)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let sale_id = self
            .database()
            .execute(Select(By::<Option<Sale>, _>::new(vehicle_id.clone())))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| E::VehicleNotListed(vehicle_id.clone()))
            .map_err(tracerr::wrap!())?
            .id;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent modifications of the same `Sale`.
        tx.execute(Lock(By::<Sale, _>::new(sale_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut sale = tx
            .execute(Select(By::<Option<Sale>, _>::new(sale_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::VehicleNotListed(vehicle_id))
            .map_err(tracerr::wrap!())?;

        if self.config().update_policy == UpdatePolicy::AvailableOnly
            && sale.status != sale::Status::Available
        {
            return Err(tracerr::new!(E::SaleNotAvailable(sale.id)));
        }

        sale.relist(listing);

        tx.execute(Update(sale.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::debug!("`Sale(id: {})` listing updated", sale.id);

        Ok(sale)
    }
}

/// Error of [`UpdateListing`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// New listing data is invalid.
    #[display("{_0}")]
    #[from]
    Invalid(sale::ValidationError),

    /// [`Sale`] is not [`sale::Status::Available`] anymore, while only such
    /// ones may be edited.
    #[display("`Sale(id: {_0})` is not available for editing")]
    SaleNotAvailable(#[error(not(source))] sale::Id),

    /// No [`Sale`] exists for the vehicle.
    #[display("`Sale(vehicle_id: {_0})` does not exist")]
    VehicleNotListed(#[error(not(source))] sale::VehicleId),
}

impl ExecutionError {
    /// Returns the [`ErrorKind`] of this [`ExecutionError`].
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Db(_) => ErrorKind::Store,
            Self::Invalid(_) => ErrorKind::Validation,
            Self::SaleNotAvailable(_) => ErrorKind::Conflict,
            Self::VehicleNotListed(_) => ErrorKind::NotFound,
        }
    }
}

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;

    use crate::{
        command::{
            fixture::{list_toro, service},
            Command as _, ErrorKind, Purchase,
        },
        domain::sale,
        query,
        Query as _, UpdatePolicy,
    };

    use super::{ExecutionError, UpdateListing};

    fn update(vehicle_id: &str, model: &str, price: i64) -> UpdateListing {
        UpdateListing {
            vehicle_id: sale::VehicleId::new(vehicle_id).unwrap(),
            brand: "Fiat".into(),
            model: model.into(),
            price: Decimal::from(price),
        }
    }

    #[tokio::test]
    async fn overwrites_descriptive_fields() {
        let svc = service(UpdatePolicy::Lenient);
        let listed = list_toro(&svc).await;

        let updated = svc
            .execute(update("veh-1", "Toro Ultra", 170_000))
            .await
            .unwrap();

        assert_eq!(updated.id, listed.id);
        assert_eq!(updated.model.as_ref(), "Toro Ultra");
        assert_eq!(updated.price.amount(), Decimal::from(170_000));
        assert_eq!(updated.status, sale::Status::Available);
        assert_eq!(updated.created_at, listed.created_at);
        assert!(updated.updated_at.coerce::<()>() >= listed.updated_at.coerce());

        let stored = svc
            .execute(query::sale::ById::by(listed.id))
            .await
            .unwrap();
        assert_eq!(stored, Some(updated));
    }

    #[tokio::test]
    async fn fails_for_unknown_vehicle() {
        let svc = service(UpdatePolicy::Lenient);
        _ = list_toro(&svc).await;

        let err = svc
            .execute(update("veh-2", "Toro", 10))
            .await
            .unwrap_err();

        assert_eq!(err.as_ref().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn validates_before_lookup() {
        let svc = service(UpdatePolicy::Lenient);

        let err = svc
            .execute(update("veh-404", "", 0))
            .await
            .unwrap_err();

        assert_eq!(err.as_ref().kind(), ErrorKind::Validation);
        assert!(matches!(
            err.as_ref(),
            ExecutionError::Invalid(sale::ValidationError::NonPositivePrice),
        ));
    }

    #[tokio::test]
    async fn lenient_policy_edits_pending_sale() {
        let svc = service(UpdatePolicy::Lenient);
        let listed = list_toro(&svc).await;
        _ = svc
            .execute(Purchase {
                sale_id: listed.id,
                buyer_cpf: sale::BuyerCpf::new("12345678900").unwrap(),
            })
            .await
            .unwrap();

        let updated = svc
            .execute(update("veh-1", "Toro", 140_000))
            .await
            .unwrap();

        assert_eq!(updated.status, sale::Status::PendingPayment);
        assert_eq!(updated.price.amount(), Decimal::from(140_000));
        assert!(updated.purchase.is_some());
    }

    #[tokio::test]
    async fn available_only_policy_rejects_pending_sale() {
        let svc = service(UpdatePolicy::AvailableOnly);
        let listed = list_toro(&svc).await;
        _ = svc
            .execute(Purchase {
                sale_id: listed.id,
                buyer_cpf: sale::BuyerCpf::new("12345678900").unwrap(),
            })
            .await
            .unwrap();
        let before = svc
            .execute(query::sale::ById::by(listed.id))
            .await
            .unwrap();

        let err = svc
            .execute(update("veh-1", "Toro", 140_000))
            .await
            .unwrap_err();

        assert_eq!(err.as_ref().kind(), ErrorKind::Conflict);
        let after = svc
            .execute(query::sale::ById::by(listed.id))
            .await
            .unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn available_only_policy_edits_available_sale() {
        let svc = service(UpdatePolicy::AvailableOnly);
        _ = list_toro(&svc).await;

        let updated = svc
            .execute(update("veh-1", "Toro", 140_000))
            .await
            .unwrap();

        assert_eq!(updated.price.amount(), Decimal::from(140_000));
    }
}
