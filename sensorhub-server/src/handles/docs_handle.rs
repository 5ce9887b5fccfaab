use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::builder().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Sensor Hub API",
        description = "Telemetry queries, LED control and session login for the sensor dashboard."
    ),
    paths(
        crate::handles::auth_handle::login,
        crate::handles::auth_handle::web_login,
        crate::handles::auth_handle::logout,
        crate::handles::sensor_handle::get_dashboard_data,
        crate::handles::sensor_handle::get_chart_data,
        crate::handles::sensor_handle::get_sensor_data_in_range,
        crate::handles::sensor_handle::get_dht_data,
        crate::handles::sensor_handle::get_ldr_data,
        crate::handles::sensor_handle::get_latest_sensor_data,
        crate::handles::sensor_handle::get_sensor_stats,
        crate::handles::control_handle::control_led,
        crate::handles::control_handle::toggle_led,
    ),
    tags(
        (name = "auth", description = "Login and logout"),
        (name = "sensors", description = "Stored sensor readings"),
        (name = "led", description = "LED commands sent over the broker")
    )
)]
pub struct ApiDoc;

pub fn docs_router() -> Router {
    Router::new().route("/api/docs/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
