//! [`Query`] collection related to the multiple [`Sale`]s.

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::sale,
    infra::{database, Database},
    read, Service,
};
#[cfg(doc)]
use crate::domain::Sale;

use super::{DatabaseQuery, Query};

/// Queries [`read::sale::ListItem`]s of [`Sale`]s in the provided
/// [`sale::Status`], cheapest first.
pub type ByStatus = DatabaseQuery<By<Vec<read::sale::ListItem>, sale::Status>>;

/// [`Query`] listing [`sale::Status::Available`] [`Sale`]s, cheapest first.
#[derive(Clone, Copy, Debug)]
pub struct ListAvailable;

/// [`Query`] listing [`sale::Status::Sold`] [`Sale`]s, cheapest first.
#[derive(Clone, Copy, Debug)]
pub struct ListSold;

impl<Db> Query<ListAvailable> for Service<Db>
where
    Db: Database<
        Select<By<Vec<read::sale::ListItem>, sale::Status>>,
        Ok = Vec<read::sale::ListItem>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Vec<read::sale::ListItem>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: ListAvailable) -> Result<Self::Ok, Self::Err> {
        self.execute(ByStatus::by(sale::Status::Available))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<Db> Query<ListSold> for Service<Db>
where
    Db: Database<
        Select<By<Vec<read::sale::ListItem>, sale::Status>>,
        Ok = Vec<read::sale::ListItem>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Vec<read::sale::ListItem>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: ListSold) -> Result<Self::Ok, Self::Err> {
        self.execute(ByStatus::by(sale::Status::Sold))
            .await
            .map_err(tracerr::wrap!())
    }
}

#[cfg(test)]
mod spec {
    use common::operations::Insert;
    use rust_decimal::Decimal;

    use crate::{
        domain::{payment, sale, Sale},
        infra::{Database as _, Memory},
        Config, Query as _, Service,
    };

    use super::{ListAvailable, ListSold};

    async fn list(db: &Memory, sales: &[(&str, i64, sale::Status)]) {
        for &(vehicle_id, price, status) in sales {
            let mut sale =
                Sale::new(vehicle_id, "Fiat", "Toro", Decimal::from(price))
                    .unwrap();
            if status != sale::Status::Available {
                _ = sale
                    .purchase(sale::BuyerCpf::new("12345678900").unwrap())
                    .unwrap();
            }
            if status == sale::Status::Sold {
                sale.settle(payment::Outcome::Approved).unwrap();
            }
            db.execute(Insert(sale)).await.unwrap();
        }
    }

    #[tokio::test]
    async fn lists_available_cheapest_first() {
        let db = Memory::new();
        list(
            &db,
            &[
                ("veh-1", 300, sale::Status::Available),
                ("veh-2", 100, sale::Status::Available),
                ("veh-3", 50, sale::Status::Sold),
                ("veh-4", 200, sale::Status::Available),
                ("veh-5", 10, sale::Status::PendingPayment),
            ],
        )
        .await;
        let svc = Service::new(Config::default(), db);

        let items = svc.execute(ListAvailable).await.unwrap();

        let listed = items
            .iter()
            .map(|i| (i.vehicle_id.as_ref(), i.price.amount()))
            .collect::<Vec<_>>();
        assert_eq!(
            listed,
            [
                ("veh-2", Decimal::from(100)),
                ("veh-4", Decimal::from(200)),
                ("veh-1", Decimal::from(300)),
            ],
        );
    }

    #[tokio::test]
    async fn lists_sold_only() {
        let db = Memory::new();
        list(
            &db,
            &[
                ("veh-1", 300, sale::Status::Sold),
                ("veh-2", 100, sale::Status::Available),
                ("veh-3", 50, sale::Status::Sold),
            ],
        )
        .await;
        let svc = Service::new(Config::default(), db);

        let items = svc.execute(ListSold).await.unwrap();

        let listed =
            items.iter().map(|i| i.vehicle_id.as_ref()).collect::<Vec<_>>();
        assert_eq!(listed, ["veh-3", "veh-1"]);
    }

    #[tokio::test]
    async fn empty_listing_is_not_an_error() {
        let svc = Service::new(Config::default(), Memory::new());

        assert!(svc.execute(ListAvailable).await.unwrap().is_empty());
        assert!(svc.execute(ListSold).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn propagates_store_failure() {
        let db = Memory::new();
        db.set_available(false);
        let svc = Service::new(Config::default(), db);

        assert!(svc.execute(ListAvailable).await.is_err());
    }
}
