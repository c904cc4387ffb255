//! [`Handler`] abstractions.

use std::future::Future;

/// Executable handler.
///
/// Every seam of the service is expressed through it: commands, queries,
/// background tasks, database operations and outbound mail delivery.
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
