//! Presence HTTP handler.
//!
//! ```text
//! GET /api/v1/presence   Which table, if any, the caller occupies
//! ```

use actix_web::{get, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Error, Presence};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::{BearerToken, require_user};
use crate::inbound::http::state::HttpState;

/// The caller's resolved presence.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PresenceResponseBody {
    /// Whether the caller occupies a live table.
    pub in_room: bool,
    /// The occupied table, when `in_room` is true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_id: Option<i64>,
}

impl From<Presence> for PresenceResponseBody {
    fn from(presence: Presence) -> Self {
        match presence {
            Presence::Idle => Self {
                in_room: false,
                table_id: None,
            },
            Presence::InRoom { table_id } => Self {
                in_room: true,
                table_id: Some(table_id),
            },
        }
    }
}

/// Resolve the caller's presence, repairing a stale mirror first.
#[utoipa::path(
    get,
    path = "/api/v1/presence",
    responses(
        (status = 200, description = "Resolved presence", body = PresenceResponseBody),
        (status = 401, description = "Unauthorized", body = Error),
        (status = 404, description = "Unknown user", body = Error),
        (status = 503, description = "Service unavailable", body = Error)
    ),
    tags = ["presence"],
    operation_id = "getPresence",
    security(("BearerToken" = []))
)]
#[get("/presence")]
pub async fn get_presence(
    state: web::Data<HttpState>,
    token: BearerToken,
) -> ApiResult<web::Json<PresenceResponseBody>> {
    let user = require_user(&state, &token).await?;

    let presence = state.queries.presence(user).await?;

    Ok(web::Json(presence.into()))
}
