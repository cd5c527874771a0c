//! [`Error`]-related definitions.

use std::fmt;

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    response::{IntoResponse, Response},
    Json,
};
use derive_more::Error as StdError;
use itertools::Itertools as _;
use serde::Serialize;
use service::infra::database;
use tracerr::{Trace, Traced};
use tracing as log;

/// Defines a new error type.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[status = $status_code:ident]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        /// Error type.
        #[derive(
            Clone,
            Copy,
            Debug,
            ::derive_more::Display,
            ::derive_more::Error
        )]
        pub enum $name {
            $(
                #[display($message)]
                #[doc = $message]
                $variant,
            )*
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                match err {
                    $(
                        $name::$variant => Self {
                            code: $code,
                            status_code: ::http::StatusCode::$status_code,
                            message: $message.to_string(),
                            backtrace: None,
                        },
                    )*
                }
            }
        }
    };
}

/// REST API [`Error`].
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// [`Error`] code.
    pub code: Code,

    /// [`http::StatusCode`] of this [`Error`].
    pub status_code: http::StatusCode,

    /// Backtrace of this [`Error`].
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// [`Error`] message.
    pub message: String,
}

impl Error {
    /// Create a new [`Error`] representing an internal server error.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self {
            code: "INTERNAL_SERVER_ERROR",
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            backtrace: None,
        }
    }

    /// Create a new [`Error`] representing a malformed request.
    #[must_use]
    pub fn bad_request(msg: &impl ToString) -> Self {
        Self {
            code: "BAD_REQUEST",
            status_code: http::StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            backtrace: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            code,
            status_code: _,
            backtrace,
            message,
        } = self;

        write!(
            f,
            "[{code}]: {message}{}",
            backtrace
                .iter()
                .format_with("\n", |trace, f| f(&format_args!("{trace}"))),
        )
    }
}

/// Body of an [`Error`] response.
#[derive(Debug, Serialize)]
struct Body<'e> {
    /// [`Error`] code.
    code: Code,

    /// [`Error`] message.
    message: &'e str,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if self.status_code.is_server_error() {
            log::error!("{self}");
        } else {
            log::debug!("{self}");
        }

        let body = Body {
            code: self.code,
            message: &self.message,
        };
        (self.status_code, Json(body)).into_response()
    }
}

/// [`Error`] code.
pub type Code = &'static str;

/// Helper trait for converting types into [`Error`]s.
pub trait AsError {
    /// Tries to convert the type into an [`Error`].
    ///
    /// [`None`] is returned if the type cannot be converted into an [`Error`].
    fn try_as_error(&self) -> Option<Error>;

    /// Converts the type into an [`Error`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Converts the type into an [`Error`] by consuming it.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }
}

impl AsError for JsonRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::bad_request(&self.body_text()))
    }
}

impl AsError for PathRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::bad_request(&self.body_text()))
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

#[cfg(test)]
mod spec {
    use axum::response::IntoResponse as _;

    use super::Error;

    define_error! {
        enum Sample {
            #[code = "SAMPLE"]
            #[status = CONFLICT]
            #[message = "Sample conflict"]
            Conflict,
        }
    }

    #[test]
    fn defined_error_converts() {
        let err = Error::from(Sample::Conflict);

        assert_eq!(err.code, "SAMPLE");
        assert_eq!(err.status_code, http::StatusCode::CONFLICT);
        assert_eq!(err.message, "Sample conflict");
        assert_eq!(err.to_string(), "[SAMPLE]: Sample conflict");
    }

    #[test]
    fn responds_with_status_code() {
        let resp = Error::internal(&"boom").into_response();

        assert_eq!(resp.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
