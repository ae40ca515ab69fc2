//! HTTP inbound adapter exposing REST endpoints.

pub mod auth;
pub mod error;
pub mod health;
pub mod presence;
pub mod state;
pub mod tables;
pub mod validation;

pub use error::{ApiResult, TRACE_ID_HEADER};

use actix_web::web;

/// Register the versioned API routes on a service scope.
pub fn configure_api(config: &mut web::ServiceConfig) {
    config
        .app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
        .service(tables::create_table)
        .service(tables::join_table)
        .service(tables::leave_table)
        .service(tables::list_tables)
        .service(presence::get_presence);
}
