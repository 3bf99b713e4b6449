use std::net::SocketAddr;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, PathRejection};
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::clock::RequestTime;
use crate::config::Config;
use crate::controllers::paste;
use crate::error::{ApiError, ApiResult};
use crate::pages;
use crate::types::api::{parse_draft, CreatedPaste, Health, PasteView};
use crate::App;

pub async fn run(app: App) -> anyhow::Result<()> {
    let addr = SocketAddr::from((app.config.host, app.config.port));

    if app.config.store.migrate_on_start {
        app.store
            .migrate()
            .await
            .context("failed to create paste table")?;
    }

    let store = app.store.clone();
    let server = axum::Server::try_bind(&addr)
        .with_context(|| format!("failed to bind to {addr}"))?
        .serve(router(app).into_make_service());

    info!("listening on {addr}");
    server.with_graceful_shutdown(shutdown_signal()).await?;

    store.close().await;
    Ok(())
}

/// Every route of the service.
pub fn router(app: App) -> Router {
    let max_upload_size = app.config.limits.max_upload_size;

    Router::new()
        .route("/", get(index))
        .route("/p/:id", get(get_paste_page))
        .route("/healthz", get(healthz))
        .route("/pastes", post(create_paste))
        .route("/pastes/:id", get(get_paste))
        // the JSON endpoints are also served under `/api`
        .route("/api/healthz", get(healthz))
        .route("/api/pastes", post(create_paste))
        .route("/api/pastes/:id", get(get_paste))
        .layer(DefaultBodyLimit::max(max_upload_size))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

async fn index() -> Html<&'static str> {
    Html(pages::INDEX_PAGE)
}

async fn healthz(State(app): State<App>) -> (StatusCode, Json<Health>) {
    if paste::is_healthy(&app).await {
        (StatusCode::OK, Json(Health { ok: true }))
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(Health { ok: false }))
    }
}

async fn create_paste(
    State(app): State<App>,
    RequestTime(now): RequestTime,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<impl IntoResponse> {
    let body = body.map_err(|rejection| match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge,
        _ => ApiError::MalformedRequest,
    })?;
    let body: Value = serde_json::from_slice(&body).map_err(|_| ApiError::MalformedRequest)?;
    if body.is_null() {
        return Err(ApiError::MalformedRequest);
    }

    let draft = parse_draft(&body)?;
    let paste = paste::create(&app, draft, now).await?;

    let path = format!("/p/{id}", id = paste.id);
    let url = format!("{base_url}{path}", base_url = base_url(&app.config, &headers));

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, path)],
        Json(CreatedPaste { id: paste.id, url }),
    ))
}

async fn get_paste(
    State(app): State<App>,
    RequestTime(now): RequestTime,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<PasteView>> {
    let Path(id) = id.map_err(|_| ApiError::MalformedRequest)?;
    Ok(Json(paste::view(&app, &id, now).await?))
}

async fn get_paste_page(
    State(app): State<App>,
    RequestTime(now): RequestTime,
    id: Result<Path<String>, PathRejection>,
) -> Response {
    let Ok(Path(id)) = id else {
        return (StatusCode::BAD_REQUEST, Html(pages::bad_request())).into_response();
    };

    match paste::view(&app, &id, now).await {
        Ok(view) => Html(pages::paste(&view)).into_response(),
        Err(ApiError::NotFound) => {
            (StatusCode::NOT_FOUND, Html(pages::not_found())).into_response()
        }
        Err(err) => {
            err.log();
            (StatusCode::INTERNAL_SERVER_ERROR, Html(pages::server_error())).into_response()
        }
    }
}

/// Origin for paste links: configured base URL, then proxy headers, then the
/// `Host` header.
fn base_url(config: &Config, headers: &HeaderMap) -> String {
    if let Some(base_url) = &config.base_url {
        return base_url.trim_end_matches('/').to_owned();
    }

    let get = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());

    match (get("x-forwarded-proto"), get("x-forwarded-host")) {
        (Some(proto), Some(host)) => format!("{proto}://{host}"),
        _ => match get(header::HOST.as_str()) {
            Some(host) => format!("http://{host}"),
            None => format!("http://{}:{}", config.host, config.port),
        },
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("unable to install Ctrl+C handler: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("unable to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutting down");
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;
    use crate::config::{Limits, Store, StoreKind, ViewCounting};

    fn config(base_url: Option<&str>) -> Config {
        Config {
            host: [127, 0, 0, 1].into(),
            port: 8080,
            base_url: base_url.map(str::to_owned),
            test_mode: false,
            view_counting: ViewCounting::Relaxed,
            store: Store {
                kind: StoreKind::Memory,
                url: String::new(),
                max_connections: 1,
                migrate_on_start: false,
            },
            limits: Limits {
                max_upload_size: 1024,
            },
        }
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(*value));
        }
        headers
    }

    #[test]
    fn configured_base_url_wins() {
        let headers = headers(&[("x-forwarded-proto", "https"), ("x-forwarded-host", "proxy")]);
        assert_eq!(
            base_url(&config(Some("https://paste.example/")), &headers),
            "https://paste.example"
        );
    }

    #[test]
    fn forwarded_headers_need_both_parts() {
        let forwarded = headers(&[
            ("x-forwarded-proto", "https"),
            ("x-forwarded-host", "paste.example"),
            ("host", "internal:8080"),
        ]);
        assert_eq!(base_url(&config(None), &forwarded), "https://paste.example");

        let partial = headers(&[("x-forwarded-proto", "https"), ("host", "internal:8080")]);
        assert_eq!(base_url(&config(None), &partial), "http://internal:8080");
    }

    #[test]
    fn falls_back_to_the_listen_address() {
        assert_eq!(
            base_url(&config(None), &HeaderMap::new()),
            "http://127.0.0.1:8080"
        );
    }
}
