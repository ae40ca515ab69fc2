//! Table HTTP handlers.
//!
//! ```text
//! POST /api/v1/tables             Open a new table
//! POST /api/v1/tables/{id}/join   Take a seat (switching if already seated)
//! POST /api/v1/tables/{id}/leave  Give up a seat
//! GET  /api/v1/tables             List open tables
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{TableDraft, TableSummary};
use crate::domain::table::TableId;
use crate::domain::{Error, TABLE_CAPACITY, TableStatus};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::{BearerToken, MaybeBearerToken, optional_user, require_user};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_rfc3339_timestamp, parse_table_id};

/// Request payload for opening a table.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableRequestBody {
    /// Planned start of the session, RFC 3339.
    #[schema(format = "date-time")]
    pub start_time: String,
    /// Venue the session takes place at.
    pub venue_id: i64,
    /// Fee arrangement code.
    #[serde(default)]
    pub fee_mode: Option<i16>,
    /// Scoring tier code.
    #[serde(default)]
    pub scoring_tier: Option<i16>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Session type code.
    #[serde(default)]
    pub session_kind: Option<i16>,
    /// Gender preference code.
    #[serde(default)]
    pub gender_pref: Option<i16>,
    /// Planned duration code.
    #[serde(default)]
    pub duration: Option<i16>,
    /// Table the caller is leaving to open this one, if they are seated.
    #[serde(default)]
    pub current_table_id: Option<i64>,
}

/// Request payload for joining a table. The body is optional; a seated
/// caller may name the table they are switching from.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinTableRequestBody {
    /// Table the caller is leaving for this one.
    #[serde(default)]
    pub current_table_id: Option<i64>,
}

/// Response payload for table creation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableResponseBody {
    /// Identifier of the new table.
    pub table_id: i64,
}

/// Response payload for a successful join.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinTableResponseBody {
    /// Seats taken after the join.
    pub seated: usize,
    /// Whether this join filled the table and started the match.
    pub matched: bool,
}

/// Response payload for a successful leave.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveTableResponseBody {
    /// Seats still taken after the departure.
    pub remaining: usize,
    /// Host after succession.
    pub host_id: i64,
    /// Table status after the departure.
    pub status: TableStatus,
}

/// One occupied seat in a listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeatBody {
    /// Occupant's user id.
    pub user_id: i64,
    /// Display name, when a profile exists.
    pub display_name: Option<String>,
    /// Avatar reference, when a profile exists.
    pub avatar_ref: Option<String>,
    /// Declared gender code, when a profile exists.
    pub gender: Option<i16>,
    /// Whether this occupant hosts the table.
    pub is_host: bool,
    /// Whether this occupant is the authenticated caller.
    pub is_me: bool,
}

/// One open table in a listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableSummaryBody {
    /// Table identifier.
    pub id: i64,
    /// Current host's user id.
    pub host_id: i64,
    /// Occupied seats in seating order.
    pub seats: Vec<SeatBody>,
    /// Number of seats taken.
    pub seats_taken: usize,
    /// Total seats at the table.
    pub capacity: usize,
    /// Fee arrangement code.
    pub fee_mode: i16,
    /// Scoring tier code.
    pub scoring_tier: i16,
    /// Free-form notes.
    pub notes: String,
    /// Venue identifier.
    pub venue_id: i64,
    /// Session type code.
    pub session_kind: i16,
    /// Gender preference code.
    pub gender_pref: i16,
    /// Planned duration code.
    pub duration: i16,
    /// Planned start, RFC 3339.
    #[schema(format = "date-time")]
    pub start_time: String,
    /// Creation time, RFC 3339.
    #[schema(format = "date-time")]
    pub created_at: String,
    /// Whether the authenticated caller occupies this table.
    pub joined: bool,
}

/// Listing response payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListTablesResponseBody {
    /// Open tables, newest first.
    pub tables: Vec<TableSummaryBody>,
}

fn parse_origin(raw: Option<i64>) -> Result<Option<TableId>, Error> {
    raw.map(parse_table_id).transpose()
}

fn parse_draft(body: CreateTableRequestBody) -> Result<TableDraft, Error> {
    let start_time = parse_rfc3339_timestamp(FieldName::new("startTime"), &body.start_time)?;
    Ok(TableDraft {
        start_time,
        venue_id: body.venue_id,
        fee_mode: body.fee_mode,
        scoring_tier: body.scoring_tier,
        notes: body.notes,
        session_kind: body.session_kind,
        gender_pref: body.gender_pref,
        duration: body.duration,
    })
}

fn summary_body(summary: TableSummary) -> TableSummaryBody {
    let seats: Vec<SeatBody> = summary
        .seats
        .into_iter()
        .map(|seat| SeatBody {
            user_id: seat.user_id.get(),
            display_name: seat.display_name,
            avatar_ref: seat.avatar_ref,
            gender: seat.gender,
            is_host: seat.is_host,
            is_me: seat.is_me,
        })
        .collect();
    TableSummaryBody {
        id: summary.id,
        host_id: summary.host_id.get(),
        seats_taken: seats.len(),
        capacity: TABLE_CAPACITY,
        seats,
        fee_mode: summary.config.fee_mode,
        scoring_tier: summary.config.scoring_tier,
        notes: summary.config.notes,
        venue_id: summary.config.venue_id,
        session_kind: summary.config.session_kind,
        gender_pref: summary.config.gender_pref,
        duration: summary.config.duration,
        start_time: summary.config.start_time.to_rfc3339(),
        created_at: summary.created_at.to_rfc3339(),
        joined: summary.joined,
    }
}

/// Open a new table hosted by the caller.
#[utoipa::path(
    post,
    path = "/api/v1/tables",
    request_body = CreateTableRequestBody,
    responses(
        (status = 201, description = "Table opened", body = CreateTableResponseBody),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorized", body = Error),
        (status = 503, description = "Service unavailable", body = Error)
    ),
    tags = ["tables"],
    operation_id = "createTable",
    security(("BearerToken" = []))
)]
#[post("/tables")]
pub async fn create_table(
    state: web::Data<HttpState>,
    token: BearerToken,
    payload: web::Json<CreateTableRequestBody>,
) -> ApiResult<HttpResponse> {
    let host = require_user(&state, &token).await?;
    let body = payload.into_inner();
    let from = parse_origin(body.current_table_id)?;
    let draft = parse_draft(body)?;

    let table_id = state.tables.create_table(host, draft, from).await?;

    Ok(HttpResponse::Created().json(CreateTableResponseBody { table_id }))
}

/// Take a seat at an open table. A caller already seated elsewhere switches
/// tables atomically.
#[utoipa::path(
    post,
    path = "/api/v1/tables/{id}/join",
    params(("id" = i64, Path, description = "Table identifier")),
    request_body = JoinTableRequestBody,
    responses(
        (status = 200, description = "Seat taken", body = JoinTableResponseBody),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorized", body = Error),
        (status = 404, description = "Table not found", body = Error),
        (status = 409, description = "Already seated or table full", body = Error),
        (status = 503, description = "Service unavailable", body = Error)
    ),
    tags = ["tables"],
    operation_id = "joinTable",
    security(("BearerToken" = []))
)]
#[post("/tables/{id}/join")]
pub async fn join_table(
    state: web::Data<HttpState>,
    token: BearerToken,
    path: web::Path<i64>,
    payload: Option<web::Json<JoinTableRequestBody>>,
) -> ApiResult<web::Json<JoinTableResponseBody>> {
    let user = require_user(&state, &token).await?;
    let table_id = parse_table_id(path.into_inner())?;
    let from = parse_origin(payload.and_then(|body| body.current_table_id))?;

    let outcome = state.tables.join_table(user, table_id, from).await?;

    Ok(web::Json(JoinTableResponseBody {
        seated: outcome.seated,
        matched: outcome.matched,
    }))
}

/// Give up a seat at a table.
#[utoipa::path(
    post,
    path = "/api/v1/tables/{id}/leave",
    params(("id" = i64, Path, description = "Table identifier")),
    responses(
        (status = 200, description = "Seat released", body = LeaveTableResponseBody),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorized", body = Error),
        (status = 404, description = "Table not found", body = Error),
        (status = 409, description = "Caller is not seated here", body = Error),
        (status = 503, description = "Service unavailable", body = Error)
    ),
    tags = ["tables"],
    operation_id = "leaveTable",
    security(("BearerToken" = []))
)]
#[post("/tables/{id}/leave")]
pub async fn leave_table(
    state: web::Data<HttpState>,
    token: BearerToken,
    path: web::Path<i64>,
) -> ApiResult<web::Json<LeaveTableResponseBody>> {
    let user = require_user(&state, &token).await?;
    let table_id = parse_table_id(path.into_inner())?;

    let outcome = state.tables.leave_table(user, table_id).await?;

    Ok(web::Json(LeaveTableResponseBody {
        remaining: outcome.remaining,
        host_id: outcome.host_id.get(),
        status: outcome.status,
    }))
}

/// List open tables, sweeping expired ones first. Anonymous callers get the
/// same listing without `joined` markers.
#[utoipa::path(
    get,
    path = "/api/v1/tables",
    responses(
        (status = 200, description = "Open tables, newest first", body = ListTablesResponseBody),
        (status = 503, description = "Service unavailable", body = Error)
    ),
    tags = ["tables"],
    operation_id = "listTables",
    security((), ("BearerToken" = []))
)]
#[get("/tables")]
pub async fn list_tables(
    state: web::Data<HttpState>,
    token: MaybeBearerToken,
) -> ApiResult<web::Json<ListTablesResponseBody>> {
    let caller = optional_user(&state, &token).await;

    let tables = state.queries.list_tables(caller).await?;

    Ok(web::Json(ListTablesResponseBody {
        tables: tables.into_iter().map(summary_body).collect(),
    }))
}

#[cfg(test)]
#[path = "tables_tests.rs"]
mod tests;
