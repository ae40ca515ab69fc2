//! Outbound adapters implementing the domain's driven ports.

pub mod jwt;
pub mod notify;
pub mod persistence;
