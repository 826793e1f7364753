//! Native actix-web transport backed by the in-memory store.

use actix_web::http::{header, StatusCode};
use actix_web::{web, App as ActixApp, HttpRequest, HttpResponse, HttpServer};

use crate::app::App;
use crate::config::Config;
use crate::core::db::MemoryStore;
use crate::core::errors::ApiError;
use crate::handlers::{self, Reply};

pub type SharedApp = web::Data<App<MemoryStore>>;

fn authorization(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

fn to_response(reply: Reply) -> HttpResponse {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(reply.body)
}

fn blocking_failure(err: impl std::fmt::Display) -> HttpResponse {
    let err = ApiError::Internal(anyhow::anyhow!("resolver task failed: {}", err));
    tracing::error!(error = %err, "operation failed");
    HttpResponse::InternalServerError().json(serde_json::json!({
        "data": null,
        "errors": [err.to_payload()],
    }))
}

async fn graphql_post(app: SharedApp, req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let auth = authorization(&req);
    let app = app.into_inner();

    match web::block(move || handlers::handle_post(&app, &body, auth.as_deref())).await {
        Ok(reply) => to_response(reply),
        Err(e) => blocking_failure(e),
    }
}

async fn graphql_get(app: SharedApp, req: HttpRequest) -> HttpResponse {
    let auth = authorization(&req);
    let query = req.query_string().to_string();
    let app = app.into_inner();

    match web::block(move || handlers::handle_get(&app, &query, auth.as_deref())).await {
        Ok(reply) => to_response(reply),
        Err(e) => blocking_failure(e),
    }
}

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({"error": "No route found"}))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/graphql", web::post().to(graphql_post))
        .route("/graphql", web::get().to(graphql_get));
}

pub fn shared_app(config: &Config) -> SharedApp {
    web::Data::new(App::from_config(MemoryStore::default(), config))
}

pub async fn run(config: Config) -> std::io::Result<()> {
    let app = shared_app(&config);
    tracing::info!(bind = %config.bind_addr, "server listening");

    HttpServer::new(move || {
        ActixApp::new()
            .app_data(app.clone())
            .configure(routes)
            .default_service(web::route().to(not_found))
    })
    .bind(config.bind_addr.as_str())?
    .run()
    .await
}
