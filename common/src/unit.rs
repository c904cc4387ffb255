//! Marker types describing moments in an entity lifetime.
//!
//! Used as [`DateTimeOf`] parameters.
//!
//! [`DateTimeOf`]: crate::DateTimeOf

/// Marker type describing an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker type describing an entity activation.
#[derive(Clone, Copy, Debug)]
pub struct Activation;

/// Marker type describing an entity issuance.
#[derive(Clone, Copy, Debug)]
pub struct Issuance;

/// Marker type describing an entity expiration.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;
