//! Infrastructure layer.

pub mod clock;
pub mod database;
pub mod mailer;

pub use self::{clock::Clock, database::Database, mailer::Mailer};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
