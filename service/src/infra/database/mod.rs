//! [`Database`]-related implementations.
//!
//! The activation core needs only three operations from a [`Database`]:
//! - [`Select`]ing an `Option<User>` by its [`user::Id`];
//! - [`Select`]ing an `Option<user::Status>` by a [`user::Id`];
//! - [`Update`]ing a [`user::Id`] into an [`activation::Transition`] at the
//!   provided moment, which must be an atomic compare-and-set of
//!   [`user::Status::Pending`] to [`user::Status::Active`], distinguishing a
//!   [`User`] gone meanwhile.
//!
//! [`Select`]: common::operations::Select
//! [`Update`]: common::operations::Update
//! [`activation::Transition`]: crate::domain::user::activation::Transition
//! [`User`]: crate::domain::User
//! [`user::Id`]: crate::domain::user::Id
//! [`user::Status::Active`]: crate::domain::user::Status::Active
//! [`user::Status::Pending`]: crate::domain::user::Status::Pending

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

pub use self::memory::Memory;
#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),
}
