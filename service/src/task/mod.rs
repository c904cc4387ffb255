//! Background [`Task`]s definitions.

mod background;
pub mod deliver_activation_emails;

pub use common::Handler as Task;

pub use self::{
    background::Background,
    deliver_activation_emails::DeliverActivationEmails,
};
