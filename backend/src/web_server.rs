use axum::{
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::repository::{SongsRepository, UsersRepository};
use crate::{auth, songs, users};

#[derive(Clone)]
pub struct AppState {
    pub songs: SongsRepository,
    pub users: UsersRepository,
    pub app_config: AppConfig,
}

impl AppState {
    pub fn new(db_pool: DbPool, app_config: AppConfig) -> Self {
        Self {
            songs: SongsRepository::new(db_pool.clone()),
            users: UsersRepository::new(db_pool),
            app_config,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Setlist API", description = "Songs and users with JWT authentication"),
    paths(
        songs::get_all_songs,
        songs::get_song,
        songs::create_song,
        songs::update_song,
        songs::delete_song,
        songs::songs_report_by_author,
        users::create_user,
        users::login,
        users::get_all_users,
        users::get_user,
        users::update_user,
        users::update_user_status,
        users::delete_user,
        users::get_user_indicators,
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "songs", description = "Song catalogue"),
        (name = "users", description = "Accounts and sessions")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

pub async fn run_server(app_state: AppState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", app_state.app_config.web.addr, app_state.app_config.web.port);
    let app = create_router(app_state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Serving API at http://{}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

pub fn create_router(app_state: AppState) -> Router {
    let public_song_routes = Router::new()
        .route("/all", get(songs::get_all_songs))
        .route("/song/{id}", get(songs::get_song))
        .route("/report/songs-by-author", get(songs::songs_report_by_author));

    let protected_song_routes = Router::new()
        .route("/create", post(songs::create_song))
        .route("/update", patch(songs::update_song))
        .route("/delete/{id}", delete(songs::delete_song))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth::auth_middleware,
        ));

    let public_user_routes = Router::new()
        .route("/create", post(users::create_user))
        .route("/login", post(users::login))
        .route("/all", get(users::get_all_users))
        .route("/user/{id}", get(users::get_user));

    let protected_user_routes = Router::new()
        .route("/update", patch(users::update_user))
        .route("/status/{id}", patch(users::update_user_status))
        .route("/delete/{id}", delete(users::delete_user))
        .route("/indicators/users", get(users::get_user_indicators))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth::auth_middleware,
        ));

    let cors = cors_layer(&app_state.app_config.web.cors_origin);

    Router::new()
        .nest("/api/songs", public_song_routes.merge(protected_song_routes))
        .nest("/api/users", public_user_routes.merge(protected_user_routes))
        .route("/docs/swagger.json", get(openapi_json))
        .fallback(not_found)
        .with_state(app_state) // Provide state to all nested routes
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
    match origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            tracing::warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
            layer
        }
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn not_found(request: Request) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": format!("No está disponible este endpoint: {}", request.uri()) })),
    )
}
