//! [`Command`] for listing a vehicle for sale.

use common::operations::Insert;
use derive_more::{Display, Error, From};
use rust_decimal::Decimal;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{sale, Sale},
    infra::{database, Database},
    Service,
};

use super::{Command, ErrorKind};

/// [`Command`] for listing a vehicle for sale, creating a new
/// [`sale::Status::Available`] [`Sale`].
#[derive(Clone, Debug)]
pub struct CreateListing {
    /// ID of the vehicle in the catalog.
    pub vehicle_id: String,

    /// Brand of the vehicle.
    pub brand: String,

    /// Model of the vehicle.
    pub model: String,

    /// Price to list the vehicle for.
    pub price: Decimal,
}

impl<Db> Command<CreateListing> for Service<Db>
where
    Db: Database<Insert<Sale>, Err = Traced<database::Error>>,
{
    type Ok = Sale;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateListing) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateListing {
            vehicle_id,
            brand,
            model,
            price,
        } = cmd;

        let sale = Sale::new(vehicle_id, brand, model, price)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        self.database()
            .execute(Insert(sale.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Sale(id: {})` listed for vehicle `{}`",
            sale.id,
            sale.vehicle_id,
        );

        Ok(sale)
    }
}

/// Error of [`CreateListing`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Listing data is invalid.
    #[display("{_0}")]
    #[from]
    Invalid(sale::ValidationError),
}

impl ExecutionError {
    /// Returns the [`ErrorKind`] of this [`ExecutionError`].
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Db(_) => ErrorKind::Store,
            Self::Invalid(_) => ErrorKind::Validation,
        }
    }
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select};
    use rust_decimal::Decimal;

    use crate::{
        command::{
            fixture::{list_toro, service},
            Command as _, ErrorKind,
        },
        domain::{sale, Sale},
        infra::Database as _,
        UpdatePolicy,
    };

    use super::{CreateListing, ExecutionError};

    fn listing(vehicle_id: &str, price: i64) -> CreateListing {
        CreateListing {
            vehicle_id: vehicle_id.into(),
            brand: "Fiat".into(),
            model: "Toro".into(),
            price: Decimal::from(price),
        }
    }

    #[tokio::test]
    async fn stores_available_sale() {
        let svc = service(UpdatePolicy::Lenient);

        let sale = list_toro(&svc).await;

        assert_eq!(sale.status, sale::Status::Available);
        let stored = svc
            .database()
            .execute(Select(By::<Option<Sale>, _>::new(sale.id)))
            .await
            .unwrap();
        assert_eq!(stored, Some(sale));
    }

    #[tokio::test]
    async fn rejects_invalid_listing() {
        let svc = service(UpdatePolicy::Lenient);

        for (cmd, expected) in [
            (listing("", 10), sale::ValidationError::EmptyVehicleId),
            (listing("veh-1", 0), sale::ValidationError::NonPositivePrice),
            (listing("veh-1", -5), sale::ValidationError::NonPositivePrice),
            (
                CreateListing {
                    brand: String::new(),
                    ..listing("veh-1", 10)
                },
                sale::ValidationError::EmptyBrandOrModel,
            ),
        ] {
            let err = svc.execute(cmd).await.unwrap_err();

            assert_eq!(err.as_ref().kind(), ErrorKind::Validation);
            assert!(
                matches!(
                    err.as_ref(),
                    ExecutionError::Invalid(e) if *e == expected,
                ),
                "unexpected error: {err}",
            );
        }
    }

    #[tokio::test]
    async fn allows_multiple_sales_of_same_vehicle() {
        let svc = service(UpdatePolicy::Lenient);

        let first = svc.execute(listing("veh-1", 10)).await.unwrap();
        let second = svc.execute(listing("veh-1", 10)).await.unwrap();

        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn reports_store_failure() {
        let svc = service(UpdatePolicy::Lenient);
        svc.database().set_available(false);

        let err = svc.execute(listing("veh-1", 10)).await.unwrap_err();

        assert_eq!(err.as_ref().kind(), ErrorKind::Store);
    }
}
