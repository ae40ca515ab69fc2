//! Ports of the hexagonal core.
//!
//! Driving ports ([`membership`]) are implemented by the domain services and
//! called by the HTTP layer; driven ports (the rest) are implemented by
//! outbound adapters.

mod macros;

pub mod authenticator;
pub mod membership;
pub mod notifier;
pub mod presence_mirror;
pub mod profile_store;
pub mod table_store;

pub(crate) use macros::define_port_error;

#[cfg(test)]
pub use authenticator::MockAuthenticator;
pub use authenticator::{Authenticator, AuthenticatorError};
#[cfg(test)]
pub use membership::{MockTableCommands, MockTableQueries};
pub use membership::{
    DraftRejection, JoinOutcome, LeaveOutcome, SeatView, TableCommands, TableDraft, TableQueries,
    TableSummary, default_table_ttl,
};
#[cfg(test)]
pub use notifier::MockNotifier;
pub use notifier::{MatchNotice, Notifier, NotifierError};
#[cfg(test)]
pub use presence_mirror::MockPresenceMirror;
pub use presence_mirror::{PresenceMirror, PresenceMirrorError};
#[cfg(test)]
pub use profile_store::MockProfileStore;
pub use profile_store::{ProfileStore, ProfileStoreError};
#[cfg(test)]
pub use table_store::MockTableStore;
pub use table_store::{
    JoinCommit, LeaveCommit, MatchFanout, OpenTable, SweepReport, TableStore, TableStoreError,
};
