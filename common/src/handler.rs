//! [`Handler`] abstractions.

use std::future::Future;

/// Asynchronous handler of `Args`.
///
/// The same trait backs commands, queries and database operations, so a
/// single type implements it once per operation it supports.
pub trait Handler<Args = ()> {
    /// Type of successful [`Handler`] result.
    type Ok;

    /// Type of this [`Handler`] error.
    type Err;

    /// Executes this [`Handler`] with the provided arguments.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
