use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use domain::services::{JoinCodeService, JoinCodeStore};
use shared::jwt::{JwtConfig, JwtError};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    join_rate_limit, metrics_handler, metrics_middleware, trace_id, RateLimiterState,
};
use crate::routes::{health, join_codes};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub join_codes: JoinCodeService,
    pub jwt: Arc<JwtConfig>,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.security.cors_origins.is_empty() {
        // Development default: any origin
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<_> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the router over any join code store.
///
/// Fails only when the configured JWT key material is unusable.
pub fn create_app(config: Config, store: Arc<dyn JoinCodeStore>) -> Result<Router, JwtError> {
    let config = Arc::new(config);
    let jwt = Arc::new(config.auth.jwt_config()?);
    let rate_limiter =
        RateLimiterState::new(config.security.join_rate_limit_per_minute).map(Arc::new);

    let state = AppState {
        config: config.clone(),
        join_codes: JoinCodeService::new(store, config.join_codes.settings()),
        jwt,
        rate_limiter,
    };

    // Guessable endpoints, throttled per user (the middleware also authenticates)
    let join_routes = Router::new()
        .route(
            "/api/v1/join-codes/validate",
            post(join_codes::validate_join_code),
        )
        .route("/api/v1/join-codes/redeem", post(join_codes::redeem_join_code))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            join_rate_limit,
        ));

    // Teacher routes, authenticated by the handlers' UserAuth extractor
    let teacher_routes = Router::new()
        .route("/api/v1/join-codes", post(join_codes::generate_join_code))
        .route(
            "/api/v1/groups/:group_id/join-codes",
            get(join_codes::list_join_codes),
        )
        .route(
            "/api/v1/groups/:group_id/join-codes/:code_id",
            delete(join_codes::deactivate_join_code),
        );

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Ok(Router::new()
        .merge(public_routes)
        .merge(join_routes)
        .merge(teacher_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors_layer(&config))
        .with_state(state))
}
