use std::sync::Arc;

use axum::{http::HeaderValue, middleware, routing::get, Router};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::TokenVerifier;
use crate::config::{AppConfig, SecurityConfig};
use crate::database::DocumentStore;
use crate::error::ApiError;
use crate::handlers::{resource_routes, system, ResourceHandler};
use crate::middleware::{jwt_auth_middleware, request_log_middleware};
use crate::resources;

/// Process-wide collaborators, built once at startup and shared by all requests
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub verifier: Arc<dyn TokenVerifier>,
}

pub fn app(state: AppState, config: &AppConfig) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .with_state(state.store.clone())
        // Protected resources
        .merge(resource_api(&state))
        .fallback(|| async { ApiError::not_found("Route not found") });

    // Global middleware
    if config.api.enable_request_logging {
        router = router.layer(middleware::from_fn(request_log_middleware));
    }
    router
        .layer(cors_layer(&config.security))
        .layer(TraceLayer::new_for_http())
}

/// Every resource kind, behind bearer authentication. `route_layer` keeps
/// unknown paths as 404 instead of 401.
fn resource_api(state: &AppState) -> Router {
    resources::ALL
        .iter()
        .map(|schema| resource_routes(ResourceHandler::new(state.store.clone(), *schema)))
        .fold(Router::new(), |api, routes| api.merge(routes))
        .route_layer(middleware::from_fn_with_state(
            state.verifier.clone(),
            jwt_auth_middleware,
        ))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}
