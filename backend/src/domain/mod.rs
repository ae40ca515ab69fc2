//! Domain model for table occupancy and lifecycle.
//!
//! Entities and pure transitions live in [`table`], [`user`], and [`roster`];
//! the port traits live in [`ports`]; [`membership_service`] wires driven
//! ports into the driving ports the HTTP layer consumes.

pub mod error;
pub mod membership_service;
pub mod ports;
pub mod roster;
pub mod table;
pub mod user;

pub use error::{Error, ErrorCode};
pub use membership_service::{MembershipCommandService, MembershipQueryService};
pub use table::{Occupancy, TABLE_CAPACITY, TableConfig, TableId, TableStatus};
pub use user::{Presence, ProfileView, UserId};
