//! Listing endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path,
    },
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service::{command, domain::sale, Command as _};

use crate::{api, define_error, AsError, Error, Service};

/// Request body of [`create`] endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct CreateRequest {
    /// ID of the vehicle in the catalog.
    pub vehicle_id: String,

    /// Brand of the vehicle.
    pub brand: String,

    /// Model of the vehicle.
    pub model: String,

    /// Price to list the vehicle for.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// Response body of [`create`] endpoint.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct CreateResponse {
    /// ID of the created `Sale`.
    pub sale_id: sale::Id,

    /// Status of the created `Sale`.
    pub status: &'static str,

    /// Date and time when the `Sale` was created.
    pub created_at: sale::CreationDateTime,
}

/// Request body of [`update`] endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct UpdateRequest {
    /// New brand of the vehicle.
    pub brand: String,

    /// New model of the vehicle.
    pub model: String,

    /// New price of the vehicle.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// Lists a vehicle for sale.
///
/// # Errors
///
/// Possible error codes:
/// - `EMPTY_VEHICLE_ID` - `vehicle_id` is empty;
/// - `NON_POSITIVE_PRICE` - `price` is zero or negative;
/// - `EMPTY_BRAND_OR_MODEL` - either `brand` or `model` is empty.
#[tracing::instrument(skip_all, fields(http.handler = "createListing"))]
pub async fn create(
    Extension(service): Extension<Service>,
    body: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<(http::StatusCode, Json<CreateResponse>), Error> {
    let Json(CreateRequest {
        vehicle_id,
        brand,
        model,
        price,
    }) = body.map_err(AsError::into_error)?;

    let sale = service
        .execute(command::CreateListing {
            vehicle_id,
            brand,
            model,
            price,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok((
        http::StatusCode::CREATED,
        Json(CreateResponse {
            sale_id: sale.id,
            status: sale.status.as_str(),
            created_at: sale.created_at,
        }),
    ))
}

/// Edits the latest `Sale` of the vehicle.
///
/// # Errors
///
/// Possible error codes:
/// - `NON_POSITIVE_PRICE` - `price` is zero or negative;
/// - `EMPTY_BRAND_OR_MODEL` - either `brand` or `model` is empty;
/// - `VEHICLE_NOT_LISTED` - no `Sale` exists for the vehicle;
/// - `SALE_NOT_AVAILABLE` - `Sale` is not available for editing anymore.
#[tracing::instrument(skip_all, fields(http.handler = "updateListing"))]
pub async fn update(
    Extension(service): Extension<Service>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<api::sale::View>, Error> {
    let Path(vehicle_id) = path.map_err(AsError::into_error)?;
    let vehicle_id = sale::VehicleId::new(vehicle_id)
        .ok_or(sale::ValidationError::EmptyVehicleId)
        .map_err(AsError::into_error)?;
    let Json(UpdateRequest {
        brand,
        model,
        price,
    }) = body.map_err(AsError::into_error)?;

    let sale = service
        .execute(command::UpdateListing {
            vehicle_id,
            brand,
            model,
            price,
        })
        .await
        .map_err(AsError::into_error)?;

    Ok(Json(sale.into()))
}

impl AsError for sale::ValidationError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "EMPTY_VEHICLE_ID"]
                #[status = BAD_REQUEST]
                #[message = "`vehicle_id` cannot be empty"]
                EmptyVehicleId,

                #[code = "NON_POSITIVE_PRICE"]
                #[status = BAD_REQUEST]
                #[message = "`price` must be greater than zero"]
                NonPositivePrice,

                #[code = "EMPTY_BRAND_OR_MODEL"]
                #[status = BAD_REQUEST]
                #[message = "`brand` and `model` are required for listing"]
                EmptyBrandOrModel,
            }
        }

        Some(match self {
            Self::EmptyVehicleId => Error::EmptyVehicleId.into(),
            Self::NonPositivePrice => Error::NonPositivePrice.into(),
            Self::EmptyBrandOrModel => Error::EmptyBrandOrModel.into(),
        })
    }
}

impl AsError for command::create_listing::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Invalid(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::update_listing::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "VEHICLE_NOT_LISTED"]
                #[status = NOT_FOUND]
                #[message = "No `Sale` exists for the vehicle"]
                VehicleNotListed,

                #[code = "SALE_NOT_AVAILABLE"]
                #[status = CONFLICT]
                #[message = "`Sale` is not available for editing"]
                SaleNotAvailable,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::Invalid(e) => return e.try_as_error(),
            Self::SaleNotAvailable(_) => Error::SaleNotAvailable.into(),
            Self::VehicleNotListed(_) => Error::VehicleNotListed.into(),
        })
    }
}
