//! [`Command`] definition.

pub mod create_listing;
pub mod handle_payment_webhook;
pub mod purchase;
pub mod update_listing;

use derive_more::Display;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    create_listing::CreateListing,
    handle_payment_webhook::HandlePaymentWebhook, purchase::Purchase,
    update_listing::UpdateListing,
};

/// Kind of a [`Command`] execution error, telling the caller how to react on
/// it.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// Input is malformed, so retrying it as is won't help.
    Validation,

    /// Referenced [`Sale`] doesn't exist.
    ///
    /// [`Sale`]: crate::domain::Sale
    NotFound,

    /// Referenced [`Sale`] is not in the required [`sale::Status`].
    ///
    /// [`Sale`]: crate::domain::Sale
    /// [`sale::Status`]: crate::domain::sale::Status
    Conflict,

    /// [`Database`] failed.
    ///
    /// [`Database`]: crate::infra::Database
    Store,
}
