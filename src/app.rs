use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::auth::{AuthError, PasswordHasher, TokenService};
use crate::config::{AppConfig, SecurityConfig};
use crate::database::Store;
use crate::handlers::{self, records, Articles, Categories, Products, Users};
use crate::media::MediaStore;
use crate::middleware::{jwt_auth_middleware, require_admin_middleware, validate_user_middleware};
use crate::services::{AccountService, ResourceService};

/// Headroom over the upload limit for the rest of a multipart body
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared request state. Everything is built once from `AppConfig`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub resources: ResourceService,
    pub accounts: AccountService,
    pub tokens: TokenService,
    pub media: Arc<dyn MediaStore>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>, media: Arc<dyn MediaStore>) -> Result<Self, AuthError> {
        let tokens = TokenService::new(&config.security)?;
        let hasher = PasswordHasher::new(&config.security);
        let resources = ResourceService::new(store.clone(), hasher);
        let accounts = AccountService::new(resources.clone(), hasher, tokens.clone());

        Ok(Self {
            config: Arc::new(config),
            store,
            resources,
            accounts,
            tokens,
            media,
        })
    }
}

pub fn app(state: AppState) -> Router {
    let body_limit = state.config.media.max_upload_bytes + BODY_OVERHEAD_BYTES;
    let media_dir = state.config.media.dir.clone();
    let cors = cors_layer(&state.config.security);

    Router::new()
        // Public
        .route("/", get(handlers::public::system::root))
        .route("/health", get(handlers::public::system::health))
        .merge(auth_public_routes())
        .merge(catalog_routes())
        // Token required
        .merge(profile_routes(state.clone()))
        // Administrator only
        .merge(admin_routes(state.clone()))
        .nest_service("/media", ServeDir::new(media_dir))
        .fallback(handlers::public::system::fallback)
        .with_state(state)
        // Global middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
}

fn auth_public_routes() -> Router<AppState> {
    use handlers::public::auth;

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
}

fn catalog_routes() -> Router<AppState> {
    use handlers::public::catalog;

    Router::new()
        .route("/api/categories", get(records::list::<Categories>))
        .route("/api/categories/:id", get(records::show::<Categories>))
        .route("/api/products", get(records::list::<Products>))
        .route("/api/products/:id", get(records::show::<Products>))
        .route("/api/products/category/:tag", get(catalog::products_by_category))
        .route("/api/articles", get(records::list::<Articles>))
        .route("/api/articles/:id", get(records::show::<Articles>))
        .route("/api/articles/status/:status", get(catalog::articles_by_status))
}

fn profile_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::profile;

    Router::new()
        .route("/api/auth/profile", get(profile::show).put(profile::update))
        .route_layer(from_fn_with_state(state.clone(), validate_user_middleware))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    use records::{create, delete, list, show, update};

    Router::new()
        // Accounts
        .route("/api/users", get(list::<Users>).post(create::<Users>))
        .route("/api/users/:id", get(show::<Users>).put(update::<Users>).delete(delete::<Users>))
        // Catalogue
        .route("/api/categories", post(create::<Categories>))
        .route("/api/categories/:id", axum::routing::put(update::<Categories>).delete(delete::<Categories>))
        .route("/api/products", post(create::<Products>))
        .route("/api/products/:id", axum::routing::put(update::<Products>).delete(delete::<Products>))
        // News
        .route("/api/articles", post(create::<Articles>))
        .route("/api/articles/:id", axum::routing::put(update::<Articles>).delete(delete::<Articles>))
        // Layers run bottom-up: token, then account, then role
        .route_layer(from_fn(require_admin_middleware))
        .route_layer(from_fn_with_state(state.clone(), validate_user_middleware))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
}
