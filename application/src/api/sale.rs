//! `Sale` endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path,
    },
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service::{
    command,
    domain::{payment, sale, Sale},
    query, read, Command as _,
};

use crate::{define_error, AsError, Error, Service};

define_error! {
    enum SaleError {
        #[code = "SALE_NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "`Sale` with the provided ID does not exist"]
        NotExists,
    }
}

/// Full view of a `Sale`.
#[derive(Clone, Debug, Serialize)]
pub struct View {
    /// ID of the `Sale`.
    pub sale_id: sale::Id,

    /// ID of the listed vehicle.
    pub vehicle_id: String,

    /// Brand of the listed vehicle.
    pub brand: String,

    /// Model of the listed vehicle.
    pub model: String,

    /// Price the vehicle is listed for.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,

    /// Current status of the `Sale`.
    pub status: &'static str,

    /// ID of the awaited payment, if the `Sale` was purchased.
    pub payment_id: Option<payment::Id>,

    /// CPF of the buyer, if the `Sale` was purchased.
    pub buyer_cpf: Option<String>,

    /// Date and time when the purchase was initiated.
    pub purchased_at: Option<sale::PurchaseDateTime>,

    /// Date and time when the `Sale` was created.
    pub created_at: sale::CreationDateTime,

    /// Date and time when the `Sale` was modified the last time.
    pub updated_at: sale::ModificationDateTime,
}

impl From<Sale> for View {
    fn from(sale: Sale) -> Self {
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
        let (payment_id, buyer_cpf, purchased_at) = match purchase {
            Some(sale::Purchase {
                payment_id,
                buyer_cpf,
                purchased_at,
            }) => (
                Some(payment_id),
                Some(buyer_cpf.to_string()),
                Some(purchased_at),
            ),
            None => (None, None, None),
        };

        Self {
            sale_id: id,
            vehicle_id: vehicle_id.to_string(),
            brand: brand.to_string(),
            model: model.to_string(),
            price: price.amount(),
            status: status.as_str(),
            payment_id,
            buyer_cpf,
            purchased_at,
            created_at,
            updated_at,
        }
    }
}

/// Summary of a `Sale` in a listing.
#[derive(Clone, Debug, Serialize)]
pub struct ListItem {
    /// ID of the `Sale`.
    pub sale_id: sale::Id,

    /// ID of the listed vehicle.
    pub vehicle_id: String,

    /// Brand of the listed vehicle.
    pub brand: String,

    /// Model of the listed vehicle.
    pub model: String,

    /// Price the vehicle is listed for.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl From<read::sale::ListItem> for ListItem {
    fn from(item: read::sale::ListItem) -> Self {
        Self {
            sale_id: item.id,
            vehicle_id: item.vehicle_id.to_string(),
            brand: item.brand.to_string(),
            model: item.model.to_string(),
            price: item.price.amount(),
        }
    }
}

/// Request body of [`purchase`] endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct PurchaseRequest {
    /// CPF of the buyer.
    pub buyer_cpf: String,
}

/// Response body of [`purchase`] endpoint.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct PurchaseResponse {
    /// ID of the payment to await the notification for.
    pub payment_id: payment::Id,
}

/// Returns the full view of a `Sale`.
///
/// # Errors
///
/// Possible error codes:
/// - `SALE_NOT_FOUND` - `Sale` with the provided ID does not exist.
#[tracing::instrument(skip_all, fields(http.handler = "getSale"))]
pub async fn get(
    Extension(service): Extension<Service>,
    path: Result<Path<sale::Id>, PathRejection>,
) -> Result<Json<View>, Error> {
    let Path(id) = path.map_err(AsError::into_error)?;

    service
        .execute(query::sale::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .map(|sale| Json(sale.into()))
        .ok_or_else(|| SaleError::NotExists.into())
}

/// Lists available `Sale`s, cheapest first.
#[tracing::instrument(skip_all, fields(http.handler = "listAvailableSales"))]
pub async fn list_available(
    Extension(service): Extension<Service>,
) -> Result<Json<Vec<ListItem>>, Error> {
    let items = service
        .execute(query::ListAvailable)
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(items.into_iter().map(Into::into).collect()))
}

/// Lists sold `Sale`s, cheapest first.
#[tracing::instrument(skip_all, fields(http.handler = "listSoldSales"))]
pub async fn list_sold(
    Extension(service): Extension<Service>,
) -> Result<Json<Vec<ListItem>>, Error> {
    let items = service
        .execute(query::ListSold)
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(items.into_iter().map(Into::into).collect()))
}

/// Initiates a purchase of an available `Sale`.
///
/// # Errors
///
/// Possible error codes:
/// - `EMPTY_BUYER_CPF` - `buyer_cpf` is blank;
/// - `SALE_NOT_FOUND` - `Sale` with the provided ID does not exist;
/// - `SALE_NOT_AVAILABLE` - `Sale` is not available for purchase.
#[tracing::instrument(skip_all, fields(http.handler = "purchaseSale"))]
pub async fn purchase(
    Extension(service): Extension<Service>,
    path: Result<Path<sale::Id>, PathRejection>,
    body: Result<Json<PurchaseRequest>, JsonRejection>,
) -> Result<(http::StatusCode, Json<PurchaseResponse>), Error> {
    define_error! {
        enum PurchaseError {
            #[code = "EMPTY_BUYER_CPF"]
            #[status = BAD_REQUEST]
            #[message = "`buyer_cpf` cannot be empty"]
            EmptyBuyerCpf,
        }
    }

    let Path(sale_id) = path.map_err(AsError::into_error)?;
    let Json(PurchaseRequest { buyer_cpf }) =
        body.map_err(AsError::into_error)?;
    let buyer_cpf =
        sale::BuyerCpf::new(buyer_cpf).ok_or(PurchaseError::EmptyBuyerCpf)?;

    let payment_id = service
        .execute(command::Purchase { sale_id, buyer_cpf })
        .await
        .map_err(AsError::into_error)?;

    Ok((
        http::StatusCode::ACCEPTED,
        Json(PurchaseResponse { payment_id }),
    ))
}

impl AsError for command::purchase::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "SALE_NOT_AVAILABLE"]
                #[status = CONFLICT]
                #[message = "`Sale` is not available for purchase"]
                SaleNotAvailable,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::SaleNotAvailable(..) => Error::SaleNotAvailable.into(),
            Self::SaleNotExists(_) => SaleError::NotExists.into(),
        })
    }
}
