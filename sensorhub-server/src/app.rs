use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::configs::{SchemaManager, Settings, Storage};
use crate::handles::*;
use crate::middlewares::TokenState;
use crate::repositories::{SensorRecordRepository, UserRepository};
use crate::services::{
    AuthService, BrokerService, CommandPublisher, IngestService, QueryService, TokenService, seed_admin,
};

/// Everything the HTTP layer needs, built once by the process root.
#[derive(Clone)]
pub struct Services {
    pub auth_service: Arc<AuthService>,
    pub token_service: Arc<TokenService>,
    pub user_repository: Arc<UserRepository>,
    pub query_service: Arc<QueryService>,
    pub command_publisher: Arc<dyn CommandPublisher>,
    pub cookie_secure: bool,
}

pub fn create_router(services: &Services) -> Router {
    let token_state = TokenState {
        token_service: services.token_service.clone(),
    };

    let auth = auth_router(AuthState {
        auth_service: services.auth_service.clone(),
        token_service: services.token_service.clone(),
        user_repository: services.user_repository.clone(),
        cookie_secure: services.cookie_secure,
    });

    let sensors = sensor_router(
        SensorState {
            query_service: services.query_service.clone(),
        },
        token_state.clone(),
    );

    let control = control_router(
        ControlState {
            command_publisher: services.command_publisher.clone(),
            query_service: services.query_service.clone(),
        },
        token_state.clone(),
    );

    Router::new()
        .merge(auth)
        .merge(sensors)
        .merge(control)
        .merge(view_router(token_state))
        .merge(docs_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Opens the store, seeds the admin account and starts the broker connection.
pub async fn create_app(settings: &Arc<Settings>) -> anyhow::Result<(Router, Arc<BrokerService>)> {
    let storage = Arc::new(Storage::new(settings.database.clone(), SchemaManager::default()).await?);

    let user_repository = Arc::new(UserRepository::new(storage.clone()));
    let sensor_record_repository = Arc::new(SensorRecordRepository::new(storage.clone()));

    let auth_service = Arc::new(AuthService::new());
    let token_service = Arc::new(TokenService::new(settings.auth.clone()));

    seed_admin(&settings.admin, &user_repository, &auth_service).await?;

    let ingest_service = Arc::new(IngestService::new(
        sensor_record_repository.clone(),
        settings.broker.topic.clone(),
    ));
    let broker_service = Arc::new(BrokerService::start(settings.broker.clone(), ingest_service));

    let services = Services {
        auth_service,
        token_service,
        user_repository,
        query_service: Arc::new(QueryService::new(sensor_record_repository)),
        command_publisher: broker_service.clone(),
        cookie_secure: settings.auth.cookie_secure,
    };

    Ok((create_router(&services), broker_service))
}
