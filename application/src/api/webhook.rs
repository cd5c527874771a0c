//! Payment gateway webhook endpoints.

use axum::{extract::rejection::JsonRejection, Extension, Json};
use serde::Deserialize;
use service::{command, domain::payment, Command as _};

use crate::{define_error, AsError, Error, Service};

/// Notification sent by the payment gateway.
#[derive(Clone, Debug, Deserialize)]
pub struct PaymentNotification {
    /// ID of the payment the notification is about.
    pub payment_id: payment::Id,

    /// Raw payment status, like `APPROVED` or `CANCELADO`.
    pub status: String,
}

/// Settles the pending payment of a `Sale`.
///
/// # Errors
///
/// Possible error codes:
/// - `PAYMENT_NOT_FOUND` - no `Sale` awaits the payment;
/// - `SALE_NOT_PENDING` - `Sale` is not in pending payment status;
/// - `INVALID_PAYMENT_STATUS` - reported status is not recognized.
#[tracing::instrument(skip_all, fields(http.handler = "paymentWebhook"))]
pub async fn payment(
    Extension(service): Extension<Service>,
    body: Result<Json<PaymentNotification>, JsonRejection>,
) -> Result<http::StatusCode, Error> {
    let Json(PaymentNotification { payment_id, status }) =
        body.map_err(AsError::into_error)?;

    _ = service
        .execute(command::HandlePaymentWebhook { payment_id, status })
        .await
        .map_err(AsError::into_error)?;

    Ok(http::StatusCode::NO_CONTENT)
}

impl AsError for command::handle_payment_webhook::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "PAYMENT_NOT_FOUND"]
                #[status = NOT_FOUND]
                #[message = "No `Sale` awaits the payment"]
                PaymentNotExists,

                #[code = "SALE_NOT_PENDING"]
                #[status = CONFLICT]
                #[message = "`Sale` is not in pending payment status"]
                SaleNotPending,

                #[code = "INVALID_PAYMENT_STATUS"]
                #[status = BAD_REQUEST]
                #[message = "Invalid payment status received from webhook"]
                InvalidPaymentStatus,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::InvalidPaymentStatus(_) => Error::InvalidPaymentStatus.into(),
            Self::PaymentNotExists(_) => Error::PaymentNotExists.into(),
            Self::SaleNotPending(..) => Error::SaleNotPending.into(),
        })
    }
}

#[cfg(test)]
mod spec {
    use service::{
        command::{handle_payment_webhook::ExecutionError, ErrorKind},
        domain::{payment, sale},
    };

    use crate::AsError as _;

    use super::PaymentNotification;

    /// HTTP status every [`ErrorKind`] is expected to be reported with.
    fn status_of(kind: ErrorKind) -> http::StatusCode {
        match kind {
            ErrorKind::Validation => http::StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => http::StatusCode::NOT_FOUND,
            ErrorKind::Conflict => http::StatusCode::CONFLICT,
            ErrorKind::Store => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[test]
    fn maps_errors_consistently_with_kind() {
        for err in [
            ExecutionError::InvalidPaymentStatus("PAID".into()),
            ExecutionError::PaymentNotExists(payment::Id::new()),
            ExecutionError::SaleNotPending(sale::Id::new(), sale::Status::Sold),
        ] {
            assert_eq!(err.as_error().status_code, status_of(err.kind()));
        }
    }

    #[test]
    fn parses_notification() {
        let id = payment::Id::new();

        let n = serde_json::from_str::<PaymentNotification>(&format!(
            r#"{{"payment_id":"{id}","status":"Efetuado"}}"#,
        ))
        .unwrap();

        assert_eq!(n.payment_id, id);
        assert_eq!(n.status, "Efetuado");
    }

    #[test]
    fn rejects_malformed_payment_id() {
        assert!(serde_json::from_str::<PaymentNotification>(
            r#"{"payment_id":"not-a-uuid","status":"APPROVED"}"#,
        )
        .is_err());
    }
}
