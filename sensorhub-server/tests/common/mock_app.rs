use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, Response};
use sensorhub_api::models::LedState;
use sensorhub_server::app::{Services, create_router};
use sensorhub_server::configs::{Admin, Auth, BrokerTopic, Database, SchemaManager, Storage};
use sensorhub_server::handles::*;
use sensorhub_server::middlewares::TokenState;
use sensorhub_server::models::User;
use sensorhub_server::repositories::{SensorRecordRepository, UserRepository};
use sensorhub_server::services::{
    AuthService, CommandPublisher, IngestService, PublishOutcome, QueryService, TokenService, seed_admin,
};
use serde_json::Value;
use tower::ServiceExt;

pub const SENSOR_TOPIC: &str = "22004015/tranvancon";
pub const LED_TOPIC: &str = "22004015/tranvancon/led";
pub const ADMIN_EMAIL: &str = "admin@test.com";
pub const ADMIN_PASSWORD: &str = "password123";

/// Stands in for the broker: records every command it is asked to send.
pub struct RecordingPublisher {
    pub connected: AtomicBool,
    pub commands: Mutex<Vec<LedState>>,
}

impl RecordingPublisher {
    pub fn sent(&self) -> Vec<LedState> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandPublisher for RecordingPublisher {
    async fn publish_led(&self, state: LedState) -> PublishOutcome {
        if !self.connected.load(Ordering::SeqCst) {
            return PublishOutcome::Disconnected;
        }

        self.commands.lock().unwrap().push(state);
        PublishOutcome::Published
    }
}

pub struct MockApp {
    pub router: Router,
    pub storage: Arc<Storage>,
    pub auth_service: Arc<AuthService>,
    pub token_service: Arc<TokenService>,
    pub user_repository: Arc<UserRepository>,
    pub sensor_record_repository: Arc<SensorRecordRepository>,
    pub query_service: Arc<QueryService>,
    pub ingest_service: Arc<IngestService>,
    pub publisher: Arc<RecordingPublisher>,
    pub admin: User,
}

impl MockApp {
    pub async fn new() -> Self {
        let storage = Arc::new(
            Storage::new(
                Database {
                    migration_path: None,
                    clean_start: true,
                    url: String::from("sqlite::memory:"),
                },
                SchemaManager::default(),
            )
            .await
            .unwrap(),
        );

        let auth_service = Arc::new(AuthService::new());
        let token_service = Arc::new(TokenService::new(Auth {
            secret: String::from("test"),
            expiration: 1000,
            cookie_secure: false,
        }));

        let user_repository = Arc::new(UserRepository::new(storage.clone()));
        let sensor_record_repository = Arc::new(SensorRecordRepository::new(storage.clone()));

        let admin = seed_admin(
            &Admin {
                email: ADMIN_EMAIL.to_string(),
                password: ADMIN_PASSWORD.to_string(),
                name: "Test Admin".to_string(),
            },
            &user_repository,
            &auth_service,
        )
        .await
        .unwrap();

        let ingest_service = Arc::new(IngestService::new(
            sensor_record_repository.clone(),
            BrokerTopic {
                sensor_data: SENSOR_TOPIC.to_string(),
                led_control: LED_TOPIC.to_string(),
            },
        ));
        let query_service = Arc::new(QueryService::new(sensor_record_repository.clone()));

        let publisher = Arc::new(RecordingPublisher {
            connected: AtomicBool::new(true),
            commands: Mutex::new(Vec::new()),
        });

        Self {
            router: Router::new(),
            storage,
            auth_service,
            token_service,
            user_repository,
            sensor_record_repository,
            query_service,
            ingest_service,
            publisher,
            admin,
        }
    }

    fn token_state(&self) -> TokenState {
        TokenState {
            token_service: self.token_service.clone(),
        }
    }

    pub fn with_auth_handle(mut self) -> Self {
        let router = auth_router(AuthState {
            auth_service: self.auth_service.clone(),
            token_service: self.token_service.clone(),
            user_repository: self.user_repository.clone(),
            cookie_secure: false,
        });
        self.router = self.router.merge(router);
        self
    }

    pub fn with_sensor_handle(mut self) -> Self {
        let router = sensor_router(
            SensorState {
                query_service: self.query_service.clone(),
            },
            self.token_state(),
        );
        self.router = self.router.merge(router);
        self
    }

    pub fn with_control_handle(mut self) -> Self {
        let router = control_router(
            ControlState {
                command_publisher: self.publisher.clone(),
                query_service: self.query_service.clone(),
            },
            self.token_state(),
        );
        self.router = self.router.merge(router);
        self
    }

    /// The router exactly as the server assembles it.
    pub fn with_all_handles(mut self) -> Self {
        self.router = create_router(&Services {
            auth_service: self.auth_service.clone(),
            token_service: self.token_service.clone(),
            user_repository: self.user_repository.clone(),
            query_service: self.query_service.clone(),
            command_publisher: self.publisher.clone(),
            cookie_secure: false,
        });
        self
    }

    pub fn admin_token(&self) -> String {
        self.token_service.generate_token(&self.admin).unwrap()
    }

    pub async fn publish(&self, topic: &str, payload: &str) -> usize {
        self.ingest_service.handle_message(topic, payload.as_bytes()).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get_authorized(&self, uri: &str) -> Response<Body> {
        let request = Request::builder()
            .uri(uri)
            .method(Method::GET)
            .header("Authorization", format!("Bearer {}", self.admin_token()))
            .body(Body::empty())
            .unwrap();

        self.send(request).await
    }

    pub async fn post_json(&self, uri: &str, body: Value, token: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .uri(uri)
            .method(Method::POST)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }
}

pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get("location")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}
