//! OpenAPI documentation configuration.
//!
//! Defines the [`ApiDoc`] struct generating the OpenAPI specification for
//! the REST API: all table and presence endpoints, the shared error payload,
//! and the bearer token security scheme. The generated document backs
//! Swagger UI in debug builds.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{Error, ErrorCode, TableStatus};
use crate::inbound::http::presence::PresenceResponseBody;
use crate::inbound::http::tables::{
    CreateTableRequestBody, CreateTableResponseBody, JoinTableRequestBody, JoinTableResponseBody,
    LeaveTableResponseBody, ListTablesResponseBody, SeatBody, TableSummaryBody,
};

/// Enrich the generated document with the bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "BearerToken",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("HS256 token issued by the login service."))
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Parlour backend API",
        description = "HTTP interface for table occupancy, matching, and presence."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("BearerToken" = [])),
    paths(
        crate::inbound::http::tables::create_table,
        crate::inbound::http::tables::join_table,
        crate::inbound::http::tables::leave_table,
        crate::inbound::http::tables::list_tables,
        crate::inbound::http::presence::get_presence,
        crate::inbound::http::health::healthz,
    ),
    components(schemas(
        Error,
        ErrorCode,
        TableStatus,
        CreateTableRequestBody,
        CreateTableResponseBody,
        JoinTableRequestBody,
        JoinTableResponseBody,
        LeaveTableResponseBody,
        SeatBody,
        TableSummaryBody,
        ListTablesResponseBody,
        PresenceResponseBody,
    )),
    tags(
        (name = "tables", description = "Table occupancy and lifecycle"),
        (name = "presence", description = "Caller presence resolution"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
