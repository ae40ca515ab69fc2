//! User identity, presence, and public profile types.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::table::TableId;

/// Validation errors returned by the [`UserId`] constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserIdValidationError {
    /// User identifiers are strictly positive.
    NotPositive,
}

impl fmt::Display for UserIdValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositive => write!(f, "user id must be a positive integer"),
        }
    }
}

impl std::error::Error for UserIdValidationError {}

/// Durable numeric user identifier.
///
/// This is the identifier issued by the external identity provider, distinct
/// from any storage row id. Roster entries, presence pointers, and game
/// session rows all reference users through this value.
///
/// # Examples
/// ```
/// use parlour_backend::domain::UserId;
///
/// let id = UserId::new(7).expect("positive id");
/// assert_eq!(id.get(), 7);
/// assert!(UserId::new(0).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(try_from = "i64", into = "i64")]
pub struct UserId(i64);

impl UserId {
    /// Validate and construct a [`UserId`].
    pub const fn new(id: i64) -> Result<Self, UserIdValidationError> {
        if id > 0 {
            Ok(Self(id))
        } else {
            Err(UserIdValidationError::NotPositive)
        }
    }

    /// Access the raw numeric value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for UserId {
    type Error = UserIdValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for i64 {
    fn from(value: UserId) -> Self {
        value.get()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user's resolved presence: the answer to "which room am I in".
///
/// The table row is the source of truth for occupancy; this value is produced
/// only after the presence mirror has verified (and if necessary repaired)
/// the user's pointer against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// The user does not occupy any table.
    Idle,
    /// The user occupies the given table, which is still live.
    InRoom {
        /// The occupied table.
        table_id: TableId,
    },
}

impl Presence {
    /// Whether the user currently occupies a live table.
    #[must_use]
    pub const fn is_in_room(&self) -> bool {
        matches!(self, Self::InRoom { .. })
    }
}

/// Public profile view used to hydrate listing output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileView {
    /// Durable user identifier.
    pub id: UserId,
    /// Display name shown to other players.
    pub display_name: String,
    /// Reference to the user's avatar, if any.
    pub avatar_ref: Option<String>,
    /// Declared gender code (pass-through from the profile store).
    pub gender: i16,
    /// Contact phone number, if shared.
    pub phone: Option<String>,
}
