//! [`Database`]-related implementations.
//!
//! Every persistence operation of the [`Service`] is a separate
//! [`Database`] implementation:
//! - [`Insert`]/[`Update`] of a [`Sale`];
//! - [`Select`] of a [`Sale`] by its [`sale::Id`], [`sale::VehicleId`] or
//!   [`payment::Id`];
//! - [`Select`] of [`read::sale::ListItem`]s by a [`sale::Status`];
//! - [`Transact`], [`Lock`] of a [`Sale`] by its [`sale::Id`] and [`Commit`].
//!
//! [`Commit`]: common::operations::Commit
//! [`Insert`]: common::operations::Insert
//! [`Lock`]: common::operations::Lock
//! [`Select`]: common::operations::Select
//! [`Service`]: crate::Service
//! [`Transact`]: common::operations::Transact
//! [`Update`]: common::operations::Update
//! [`Sale`]: crate::domain::Sale
//! [`payment::Id`]: crate::domain::payment::Id
//! [`read::sale::ListItem`]: crate::read::sale::ListItem
//! [`sale::Id`]: crate::domain::sale::Id
//! [`sale::Status`]: crate::domain::sale::Status
//! [`sale::VehicleId`]: crate::domain::sale::VehicleId

#[cfg(any(test, feature = "memory"))]
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

#[cfg(any(test, feature = "memory"))]
pub use self::memory::Memory;
#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(any(test, feature = "memory"))]
    /// [`Memory`] error.
    Memory(memory::Error),

    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),
}
