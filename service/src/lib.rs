//! Service contains the account activation logic of the platform.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod task;

use std::error::Error;

use common::operations::Start;
use derive_more::Debug;

use self::{
    domain::user::activation,
    infra::clock,
    task::deliver_activation_emails::{self, Inbox, Outbox},
};
#[cfg(doc)]
use self::infra::{Database, Mailer};

pub use self::{command::Command, query::Query, task::Task};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [`activation::Codec`] sealing activation [`activation::Token`]s.
    pub activation_codec: activation::Codec,

    /// [`activation::Ttl`] of issued activation [`activation::Token`]s.
    pub activation_ttl: activation::Ttl,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, Clk = clock::System> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// [`Clock`] of this [`Service`].
    ///
    /// [`Clock`]: infra::Clock
    clock: Clk,

    /// [`Outbox`] of the [`task::DeliverActivationEmails`].
    #[debug(skip)]
    outbox: Outbox,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`] with the provided parameters, delivering
    /// activation emails with the provided [`Mailer`].
    ///
    /// Returned [`task::Background`] must be run for emails to be delivered.
    pub fn new<Mlr>(
        config: Config,
        database: Db,
        mailer: Mlr,
    ) -> (Self, task::Background)
    where
        task::DeliverActivationEmails<Mlr>:
            Task<Start<Inbox>, Ok = (), Err: Error + 'static> + 'static,
    {
        Self::with_clock(config, database, mailer, clock::System)
    }
}

impl<Db, Clk> Service<Db, Clk> {
    /// Creates a new [`Service`] with the provided parameters, reading the
    /// current time from the provided [`Clock`].
    ///
    /// [`Clock`]: infra::Clock
    pub fn with_clock<Mlr>(
        config: Config,
        database: Db,
        mailer: Mlr,
        clock: Clk,
    ) -> (Self, task::Background)
    where
        task::DeliverActivationEmails<Mlr>:
            Task<Start<Inbox>, Ok = (), Err: Error + 'static> + 'static,
    {
        let (outbox, inbox) = deliver_activation_emails::channel();

        let mut bg = task::Background::default();
        let deliver = task::DeliverActivationEmails::new(mailer);
        bg.spawn(async move { deliver.execute(Start(inbox)).await });

        let this = Self {
            config,
            database,
            clock,
            outbox,
        };
        (this, bg)
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns [`Clock`] of this [`Service`].
    ///
    /// [`Clock`]: infra::Clock
    #[must_use]
    pub fn clock(&self) -> &Clk {
        &self.clock
    }

    /// Returns [`Outbox`] of this [`Service`].
    pub(crate) fn outbox(&self) -> &Outbox {
        &self.outbox
    }
}

#[cfg(test)]
mod spec;
