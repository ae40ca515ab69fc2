//! Server construction and middleware wiring.

mod config;

pub use config::ServerConfig;

use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use async_trait::async_trait;
use tracing::debug;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[cfg(debug_assertions)]
use crate::doc::ApiDoc;
use crate::domain::ports::{MatchNotice, Notifier, NotifierError, TableCommands, TableQueries};
use crate::domain::user::UserId;
use crate::domain::{MembershipCommandService, MembershipQueryService};
use crate::inbound::http::health::{HealthState, healthz};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::configure_api;
use crate::middleware::Trace;
use crate::outbound::jwt::JwtAuthenticator;
use crate::outbound::notify::HttpNotifier;
use crate::outbound::persistence::{DieselPresenceMirror, DieselProfileStore, DieselTableStore};

/// Notifier used when no messaging channel is configured. Match transitions
/// still commit; the notices are dropped with a debug log.
struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, user: UserId, notice: MatchNotice) -> Result<(), NotifierError> {
        debug!(
            user_id = %user,
            table_id = notice.table_id,
            "notification channel disabled, dropping match notice"
        );
        Ok(())
    }
}

fn build_notifier(config: &ServerConfig) -> std::io::Result<Arc<dyn Notifier>> {
    match &config.notify {
        Some(notify) => {
            let notifier =
                HttpNotifier::new(notify.clone(), Arc::new(mockable::DefaultClock))
                    .map_err(|err| {
                        std::io::Error::other(format!("notifier client construction failed: {err}"))
                    })?;
            Ok(Arc::new(notifier))
        }
        None => Ok(Arc::new(DisabledNotifier)),
    }
}

/// Build the shared HTTP state from the configured pool and credentials.
fn build_http_state(config: &ServerConfig) -> std::io::Result<web::Data<HttpState>> {
    let store = Arc::new(DieselTableStore::new(config.db_pool.clone()));
    let mirror = Arc::new(DieselPresenceMirror::new(config.db_pool.clone()));
    let profiles = Arc::new(DieselProfileStore::new(config.db_pool.clone()));
    let notifier = build_notifier(config)?;
    let clock = Arc::new(mockable::DefaultClock);

    let commands: Arc<dyn TableCommands> = Arc::new(MembershipCommandService::new(
        store.clone(),
        notifier,
        clock.clone(),
    ));
    let queries: Arc<dyn TableQueries> = Arc::new(MembershipQueryService::new(
        store,
        mirror,
        profiles,
        clock,
        config.table_ttl,
    ));
    let authenticator = Arc::new(JwtAuthenticator::new(&config.auth_secret));

    Ok(web::Data::new(HttpState::new(
        commands,
        queries,
        authenticator,
    )))
}

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
    } = deps;

    let api = web::scope("/api/v1").configure(configure_api);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(api)
        .service(healthz);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    #[cfg(not(debug_assertions))]
    let app = app;

    app
}

/// Construct an Actix HTTP server using the provided health state and
/// configuration.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails or the
/// notifier client cannot be constructed.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let http_state = build_http_state(&config)?;
    let server_health_state = health_state.clone();

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
        })
    })
    .bind(config.bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
