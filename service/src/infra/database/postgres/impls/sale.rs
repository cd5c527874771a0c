//! [`Sale`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{payment, sale, Sale},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Maps the provided `sales` table [`Row`] into a [`Sale`].
fn sale_from_row(row: &Row) -> Sale {
    let purchase = row
        .get::<_, Option<payment::Id>>("payment_id")
        .map(|payment_id| sale::Purchase {
            payment_id,
            buyer_cpf: row.get("buyer_cpf"),
            purchased_at: row.get("purchased_at"),
        });
    Sale {
        id: row.get("id"),
        vehicle_id: row.get("vehicle_id"),
        brand: row.get("brand"),
        model: row.get("model"),
        price: row.get("price"),
        status: row.get("status"),
        purchase,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl<C> Database<Select<By<Option<Sale>, sale::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Sale>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Sale>, sale::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: sale::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, vehicle_id, brand, model, price, status, \
                   payment_id, buyer_cpf, purchased_at, \
                   created_at, updated_at \
            FROM sales \
            WHERE id = $1::UUID \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(sale_from_row))
    }
}

impl<C> Database<Select<By<Option<Sale>, sale::VehicleId>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<Option<Sale>, sale::Id>>,
        Ok = Option<Sale>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Sale>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Sale>, sale::VehicleId>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let vehicle_id: sale::VehicleId = by.into_inner();

        // Several `Sale`s may reference the same vehicle, the latest one is
        // the actual listing.
        const SQL: &str = "\
            SELECT id \
            FROM sales \
            WHERE vehicle_id = $1::VARCHAR \
            ORDER BY created_at DESC \
            LIMIT 1";
        let Some(row) = self
            .query_opt(SQL, &[&vehicle_id])
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };

        self.execute(Select(By::<Option<Sale>, sale::Id>::new(row.get("id"))))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Select<By<Option<Sale>, payment::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<Option<Sale>, sale::Id>>,
        Ok = Option<Sale>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Sale>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Sale>, payment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let payment_id: payment::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM sales \
            WHERE payment_id = $1::UUID \
            LIMIT 1";
        let Some(row) = self
            .query_opt(SQL, &[&payment_id])
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };

        self.execute(Select(By::<Option<Sale>, sale::Id>::new(row.get("id"))))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Select<By<Vec<read::sale::ListItem>, sale::Status>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<read::sale::ListItem>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<read::sale::ListItem>, sale::Status>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let status: sale::Status = by.into_inner();

        const SQL: &str = "\
            SELECT id, vehicle_id, brand, model, price \
            FROM sales \
            WHERE status = $1::VARCHAR \
            ORDER BY price ASC, created_at ASC";
        Ok(self
            .query(SQL, &[&status])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| read::sale::ListItem {
                id: row.get("id"),
                vehicle_id: row.get("vehicle_id"),
                brand: row.get("brand"),
                model: row.get("model"),
                price: row.get("price"),
            })
            .collect())
    }
}

impl<C> Database<Insert<Sale>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(sale): Insert<Sale>,
    ) -> Result<Self::Ok, Self::Err> {
        let Sale {
            id,
            vehicle_id,
            brand,
            model,
            price,
            status,
            purchase,
            created_at,
            updated_at,
        } = sale;
        let (payment_id, buyer_cpf, purchased_at) = purchase_columns(purchase);

        const SQL: &str = "\
            INSERT INTO sales (\
                id, vehicle_id, brand, model, price, status, \
                payment_id, buyer_cpf, purchased_at, \
                created_at, updated_at \
            ) VALUES (\
                $1::UUID, $2::VARCHAR, $3::VARCHAR, $4::VARCHAR, \
                $5::NUMERIC, $6::VARCHAR, \
                $7::UUID, $8::VARCHAR, $9::TIMESTAMPTZ, \
                $10::TIMESTAMPTZ, $11::TIMESTAMPTZ \
            )";
        self.exec(
            SQL,
            &[
                &id,
                &vehicle_id,
                &brand,
                &model,
                &price,
                &status,
                &payment_id,
                &buyer_cpf,
                &purchased_at,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<Sale>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(sale): Update<Sale>,
    ) -> Result<Self::Ok, Self::Err> {
        // `vehicle_id` and `created_at` never change.
        let Sale {
            id,
            vehicle_id: _,
            brand,
            model,
            price,
            status,
            purchase,
            created_at: _,
            updated_at,
        } = sale;
        let (payment_id, buyer_cpf, purchased_at) = purchase_columns(purchase);

        const SQL: &str = "\
            UPDATE sales \
            SET brand = $2::VARCHAR, \
                model = $3::VARCHAR, \
                price = $4::NUMERIC, \
                status = $5::VARCHAR, \
                payment_id = $6::UUID, \
                buyer_cpf = $7::VARCHAR, \
                purchased_at = $8::TIMESTAMPTZ, \
                updated_at = $9::TIMESTAMPTZ \
            WHERE id = $1::UUID";
        self.exec(
            SQL,
            &[
                &id,
                &brand,
                &model,
                &price,
                &status,
                &payment_id,
                &buyer_cpf,
                &purchased_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Sale, sale::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Sale, sale::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: sale::Id = by.into_inner();

        // Row lock is held until the transaction ends.
        const SQL: &str = "\
            SELECT id \
            FROM sales \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

/// Splits the provided optional [`sale::Purchase`] into its nullable
/// `sales` table columns.
fn purchase_columns(
    purchase: Option<sale::Purchase>,
) -> (
    Option<payment::Id>,
    Option<sale::BuyerCpf>,
    Option<sale::PurchaseDateTime>,
) {
    match purchase {
        Some(sale::Purchase {
            payment_id,
            buyer_cpf,
            purchased_at,
        }) => (Some(payment_id), Some(buyer_cpf), Some(purchased_at)),
        None => (None, None, None),
    }
}
