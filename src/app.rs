use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{enforce_acl, roles, tournament_policy, Authorizer, RoleAssignments, ANONYMOUS_USER};
use crate::db::results::SqliteFixtureStore;
use crate::errors::AppError;
use crate::events::{init_live_bus, LiveBus};
use crate::identity::hydrate_assignments;
use crate::jwt::JwtConfig;
use crate::routes::{auth, health, leaguetables, live, news, pages, results, tournaments};
use crate::stage_two::StageTwoResolver;
use crate::utils::env_opt;

/// Mount point of the protected tournament API.
pub const API_ROOT: &str = "/tournament";

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub authz: Arc<Authorizer>,
    pub stage_two: Arc<StageTwoResolver<SqliteFixtureStore>>,
    pub live: LiveBus,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, authz: Authorizer) -> Self {
        let (live, _) = init_live_bus();
        Self {
            stage_two: Arc::new(StageTwoResolver::new(SqliteFixtureStore::new(pool.clone()))),
            pool,
            jwt: Arc::new(jwt),
            authz: Arc::new(authz),
            live,
        }
    }

    /// Builds the access policy, loads stored role assignments and reads the
    /// token settings from the environment.
    pub async fn from_env(pool: SqlitePool) -> Result<Self, AppError> {
        let jwt = JwtConfig::from_env()?;
        let policy = tournament_policy(API_ROOT)?;

        let assignments = Arc::new(RoleAssignments::new());
        assignments.add_role(ANONYMOUS_USER, roles::GUEST).await;
        let loaded = hydrate_assignments(&pool, &assignments).await?;
        tracing::info!(users = loaded, "loaded role assignments");

        let authz = Authorizer::new(Arc::new(policy), assignments, roles::GUEST);
        Ok(Self::new(pool, jwt, authz))
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let state = AppState::from_env(pool).await?;
    Ok(create_router(state))
}

pub fn create_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/", get(auth::banner))
        .route("/me", get(auth::me))
        .route("/logout", get(auth::logout).post(auth::logout));

    // The ACL runs as a plain layer so it sees every request before method
    // routing, including methods a route does not implement.
    let tournament_routes = Router::new()
        .route(
            "/tournaments",
            get(tournaments::list_tournaments).post(tournaments::create_tournament),
        )
        .route(
            "/tournaments/:id",
            get(tournaments::get_tournament)
                .put(tournaments::update_tournament)
                .delete(tournaments::delete_tournament),
        )
        .route("/results", get(results::list_results).post(results::create_result))
        .route(
            "/results/:id",
            get(results::get_result)
                .put(results::update_result)
                .delete(results::delete_result),
        )
        .route("/news", get(news::list_news).post(news::create_news))
        .route(
            "/news/:id",
            get(news::get_news).put(news::update_news).delete(news::delete_news),
        )
        .route("/pages", get(pages::list_pages).post(pages::create_page))
        .route(
            "/pages/:id",
            get(pages::get_page).put(pages::update_page).delete(pages::delete_page),
        )
        .route(
            "/leaguetables/:competition/:section/:group",
            post(leaguetables::submit_league_table),
        )
        .layer(from_fn_with_state(state.clone(), enforce_acl));

    Router::new()
        .route("/", get(health::root))
        .route("/api/health", get(health::health))
        .route("/live", get(live::live))
        .nest("/auth", auth_routes)
        .nest(API_ROOT, tournament_routes)
        .with_state(state)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// `CORS_ORIGIN` restricts browser origins; unset allows any.
fn cors_layer() -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    match env_opt("CORS_ORIGIN").map(|origin| origin.parse::<HeaderValue>()) {
        Some(Ok(origin)) => cors.allow_origin(origin),
        Some(Err(err)) => {
            tracing::warn!(error = %err, "ignoring invalid CORS_ORIGIN, allowing any origin");
            cors.allow_origin(Any)
        }
        None => cors.allow_origin(Any),
    }
}
