//! HTTP surface: one `POST /predict` route per process.

mod error;

pub use error::ApiError;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::{Config, ServerConfig};
use crate::error::ServiceError;
use crate::services::{
    run_blocking, DigitsService, RegressionService, ServiceKind, SizeFitService, Upload,
};

/// A loaded service, ready to be mounted
pub enum Service {
    SizeFit(Arc<SizeFitService>),
    Regression(Arc<RegressionService>),
    Digits(Arc<DigitsService>),
}

impl Service {
    /// Load the artifacts of the selected service
    pub fn load(kind: ServiceKind, config: &Config) -> Self {
        match kind {
            ServiceKind::SizeFit => Service::SizeFit(Arc::new(SizeFitService::load(&config.size_fit))),
            ServiceKind::Regression => {
                Service::Regression(Arc::new(RegressionService::load(&config.regression)))
            }
            ServiceKind::Digits => Service::Digits(Arc::new(DigitsService::load(&config.digits))),
        }
    }

    pub fn is_ready(&self) -> bool {
        match self {
            Service::SizeFit(s) => s.is_ready(),
            Service::Regression(s) => s.is_ready(),
            Service::Digits(s) => s.is_ready(),
        }
    }
}

/// Build the router for a service with the configured middleware
pub fn router(service: Service, config: &ServerConfig) -> Router {
    let routes = match service {
        Service::SizeFit(s) => Router::new()
            .route("/predict", post(predict_size_fit))
            .with_state(s),
        Service::Regression(s) => Router::new()
            .route("/predict", post(predict_regression))
            .with_state(s),
        Service::Digits(s) => Router::new()
            .route("/predict", post(predict_digits))
            .with_state(s),
    };

    let routes = routes
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http());

    if config.cors {
        routes.layer(CorsLayer::permissive())
    } else {
        routes
    }
}

/// Bind and serve until Ctrl-C
pub async fn serve(router: Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}

async fn predict_size_fit(State(service): State<Arc<SizeFitService>>, body: Bytes) -> Response {
    match run_blocking(move || service.predict(&body)).await {
        Ok(prediction) => Json(prediction).into_response(),
        Err(e) => ApiError::from(e)
            .with_input_hint(SizeFitService::INPUT_HINT)
            .into_response(),
    }
}

async fn predict_regression(State(service): State<Arc<RegressionService>>, body: Bytes) -> Response {
    match run_blocking(move || service.predict(&body)).await {
        Ok(prediction) => Json(prediction).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn predict_digits(
    State(service): State<Arc<DigitsService>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    if !service.is_ready() {
        return ApiError::from(ServiceError::NotLoaded(DigitsService::NOT_LOADED)).into_response();
    }

    // A body that is not a multipart form carries no file part at all
    let upload = match multipart {
        Ok(multipart) => read_upload(multipart, "image").await,
        Err(rejection) => {
            tracing::debug!("multipart rejected: {}", rejection.body_text());
            Ok(None)
        }
    };
    let upload = match upload {
        Ok(upload) => upload,
        Err(e) => return ApiError::bad_request(e).into_response(),
    };

    match run_blocking(move || service.predict(upload)).await {
        Ok(reading) => Json(reading).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Pull the named file field out of a multipart form, if present.
/// Plain text fields never count as files, even under the right name.
async fn read_upload(mut multipart: Multipart, field_name: &str) -> anyhow::Result<Option<Upload>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(field_name) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await?;
        return Ok(Some(Upload {
            file_name,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}
