use std::sync::Arc;

use anyhow::Result;
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use askline_ai::{ChatClient, ChatGateway};
use askline_common::Config;
use askline_core::{JobRegistry, LifecycleManager};
use askline_store::{
    AnnouncementStore, ChatLogStore, ClassStore, PgClusterStore, PgCourseStore, PgQuestionStore,
    QaStore,
};

mod auth;
mod envelope;
mod export;
mod line;
mod rest;
mod webhook;

use auth::JwtService;
use line::LineClient;

pub struct AppState {
    pub config: Config,
    pub courses: PgCourseStore,
    pub classes: ClassStore,
    pub question_store: PgQuestionStore,
    pub clusters: PgClusterStore,
    pub qas: QaStore,
    pub announcements: AnnouncementStore,
    pub chat_log: ChatLogStore,
    pub gateway: ChatGateway,
    pub line: LineClient,
    pub jwt: JwtService,
    pub jobs: Arc<JobRegistry>,
    pub lifecycle: LifecycleManager<PgCourseStore, PgQuestionStore>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("askline=info".parse()?))
        .init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    askline_store::migrate(&pool).await?;

    let courses = PgCourseStore::new(pool.clone());
    let question_store = PgQuestionStore::new(pool.clone());
    let gateway = ChatGateway::new(
        ChatClient::new(&config.ai_api_key, &config.ai_model).with_base_url(&config.ai_base_url),
    );

    let state = Arc::new(AppState {
        classes: ClassStore::new(pool.clone()),
        clusters: PgClusterStore::new(pool.clone()),
        qas: QaStore::new(pool.clone()),
        announcements: AnnouncementStore::new(pool.clone()),
        chat_log: ChatLogStore::new(pool.clone()),
        line: LineClient::new(&config.line_channel_access_token),
        jwt: JwtService::new(&config.jwt_secret),
        jobs: JobRegistry::new(),
        lifecycle: LifecycleManager::new(
            courses.clone(),
            question_store.clone(),
            &config.pseudonym_salt,
        ),
        gateway,
        courses,
        question_store,
        config,
    });

    let staff_routes = Router::new()
        // Courses / classes
        .route("/courses", get(rest::courses::list).post(rest::courses::create))
        .route(
            "/courses/{id}",
            get(rest::courses::get).put(rest::courses::update).delete(rest::courses::delete),
        )
        .route("/classes", get(rest::classes::list).post(rest::classes::create))
        .route(
            "/classes/{id}",
            get(rest::classes::get).put(rest::classes::update).delete(rest::classes::delete),
        )
        // Questions
        .route("/questions", get(rest::questions::list))
        .route("/questions/statistics", get(rest::questions::statistics))
        .route("/questions/merge", post(rest::questions::merge))
        .route(
            "/questions/{id}",
            get(rest::questions::get).delete(rest::questions::delete),
        )
        .route("/questions/{id}/status", patch(rest::questions::change_status))
        // Q&A / announcements
        .route("/qas", get(rest::qas::list).post(rest::qas::create))
        .route(
            "/qas/{id}",
            get(rest::qas::get).put(rest::qas::update).delete(rest::qas::delete),
        )
        .route(
            "/announcements",
            get(rest::announcements::list).post(rest::announcements::create),
        )
        .route(
            "/announcements/{id}",
            get(rest::announcements::get)
                .put(rest::announcements::update)
                .delete(rest::announcements::delete),
        )
        .route("/announcements/{id}/send", post(rest::announcements::send_to_line))
        // AI surface
        .route("/ai/questions/pending", get(rest::ai::pending))
        .route("/ai/analysis/single", post(rest::ai::analyze_single))
        .route("/ai/analysis/batch", post(rest::ai::analyze_batch))
        .route("/ai/clusters", get(rest::ai::list_clusters).post(rest::ai::create_cluster))
        .route("/ai/clusters/generate", post(rest::ai::generate_clusters))
        .route(
            "/ai/clusters/{id}",
            patch(rest::ai::patch_cluster).delete(rest::ai::delete_cluster),
        )
        // Reports and chat log
        .route("/reports/questions/export", get(rest::reports::questions_export))
        .route("/reports/clusters/export", get(rest::reports::clusters_export))
        .route("/line/messages", get(rest::chat::messages))
        .route("/line/stats", get(rest::chat::stats))
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_staff));

    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/auth/login", post(auth::login))
        .route("/line/webhook", post(webhook::receive))
        .merge(staff_routes)
        .with_state(state.clone())
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Logging layer: method + path only (no query params, no body)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", state.config.api_host, state.config.api_port);
    info!("Askline API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
