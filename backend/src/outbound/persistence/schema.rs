//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. They are used
//! by Diesel for compile-time query validation and type-safe SQL generation.

diesel::table! {
    /// User rows mirroring occupancy.
    ///
    /// `user_id` is the durable identifier issued by the identity provider;
    /// `id` is only the storage key. Occupancy reads and writes key on
    /// `user_id`.
    users (id) {
        /// Storage primary key.
        id -> Int8,
        /// Durable user identifier.
        user_id -> Int8,
        /// Display name shown to other players.
        #[max_length = 64]
        display_name -> Varchar,
        /// Avatar reference, if any.
        avatar_ref -> Nullable<Text>,
        /// Declared gender code.
        gender -> Int2,
        /// Contact phone number, if shared.
        #[max_length = 32]
        phone -> Nullable<Varchar>,
        /// Presence mirror: 0 = idle, 1 = in a room.
        status -> Int2,
        /// Presence mirror: the occupied table, when status is 1.
        current_table_id -> Nullable<Int8>,
        /// Record creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Table rows; the authoritative record of occupancy.
    tables (id) {
        /// Primary key.
        id -> Int8,
        /// Current host's durable user id.
        host_id -> Int8,
        /// JSONB roster of durable user ids, in seating order.
        participants -> Jsonb,
        /// Lifecycle status code: 0 waiting, 1 matched, 2 finished,
        /// 3 cancelled.
        status -> Int2,
        /// Fee arrangement code.
        fee_mode -> Int2,
        /// Scoring tier code.
        scoring_tier -> Int2,
        /// Free-form notes from the host.
        notes -> Text,
        /// Venue identifier.
        venue_id -> Int8,
        /// Session type code.
        session_kind -> Int2,
        /// Gender preference code.
        gender_pref -> Int2,
        /// Planned duration code.
        duration -> Int2,
        /// Planned start of the session.
        start_time -> Timestamptz,
        /// When the table filled, if it has.
        matched_at -> Nullable<Timestamptz>,
        /// Record creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// One row per participant of a matched table.
    game_sessions (id) {
        /// Primary key.
        id -> Int8,
        /// The matched table.
        table_id -> Int8,
        /// Participant's durable user id.
        user_id -> Int8,
        /// Record creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::joinable!(game_sessions -> tables (table_id));

diesel::allow_tables_to_appear_in_same_query!(game_sessions, tables, users);
