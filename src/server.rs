use crate::analysis::AnalysisRecord;
use crate::codec;
use crate::config::Config;
use crate::error::AdjustError;
use crate::stretch::{ContrastLimits, CutoffPair, Histogram, LookupTable, LuminanceMode};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::header,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Listener settings for the HTTP surface
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub server: Arc<ServerConfig>,
}

#[derive(Serialize)]
pub struct LimitsResponse {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub min: u8,
    pub max: u8,
}

/// Analysis response
#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub width: u32,
    pub height: u32,
    pub total_pixels: u64,
    pub histogram: Histogram,
    pub limits: Vec<LimitsResponse>,
    pub processing_time_ms: u64,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub luminance: LuminanceMode,
    pub cutoffs: Vec<CutoffPair>,
    pub max_file_size_bytes: usize,
}

pub fn router(state: AppState) -> Router {
    let max_file_size = state.server.max_file_size;

    Router::new()
        .route("/analyze", post(handle_analyze))
        .route("/adjust", post(handle_adjust))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(max_file_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: Config, server: ServerConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", server.host, server.port);
    let state = AppState {
        config: Arc::new(config),
        server: Arc::new(server),
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, router(state)).await?;

    Ok(())
}

/// Fields collected from a multipart upload
#[derive(Default)]
struct Upload {
    file: Option<Bytes>,
    fields: Vec<(String, String)>,
}

impl Upload {
    async fn read(mut multipart: Multipart, max_file_size: usize) -> Result<Self, AdjustError> {
        let mut upload = Upload::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AdjustError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == "file" {
                let data = field.bytes().await.map_err(|e| {
                    AdjustError::InvalidRequest(format!("Failed to read file data: {}", e))
                })?;
                if data.len() > max_file_size {
                    return Err(AdjustError::ImageTooLarge {
                        size: data.len(),
                        max: max_file_size,
                    });
                }
                upload.file = Some(data);
            } else {
                let value = field.text().await.map_err(|e| {
                    AdjustError::InvalidRequest(format!("Invalid field {}: {}", name, e))
                })?;
                upload.fields.push((name, value));
            }
        }

        Ok(upload)
    }

    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.trim())
    }

    fn limit(&self, name: &str) -> Result<u8, AdjustError> {
        let value = self
            .field(name)
            .ok_or_else(|| AdjustError::InvalidRequest(format!("Missing field '{}'", name)))?;
        value
            .parse()
            .map_err(|_| AdjustError::InvalidRequest(format!("'{}' must be 0-255, got '{}'", name, value)))
    }
}

/// Handle analysis requests
async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AdjustError> {
    let start = Instant::now();
    let upload = Upload::read(multipart, state.server.max_file_size).await?;
    let data = upload.file.as_ref().ok_or(AdjustError::MissingFile)?;

    let mut config = (*state.config).clone();
    if upload.field("lower").is_some() || upload.field("upper").is_some() {
        let lower = upload.field("lower").unwrap_or("off").parse()?;
        let upper = upload.field("upper").unwrap_or("off").parse()?;
        config.cutoffs = vec![CutoffPair::new(lower, upper)];
    }

    let image = codec::decode(data)?;
    let record = AnalysisRecord::from_image(Path::new("upload"), &image, &config)?;
    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        "Analyzed {}x{} upload in {}ms",
        record.width,
        record.height,
        processing_time_ms
    );

    let limits = record
        .limits
        .iter()
        .map(|entry| LimitsResponse {
            lower: entry.cutoff.lower.percentage(),
            upper: entry.cutoff.upper.percentage(),
            min: entry.limits.min,
            max: entry.limits.max,
        })
        .collect();

    Ok(Json(AnalyzeResponse {
        width: record.width,
        height: record.height,
        total_pixels: record.total_pixels(),
        histogram: record.histogram,
        limits,
        processing_time_ms,
    }))
}

/// Handle adjustment requests, answering with the stretched image as PNG
async fn handle_adjust(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AdjustError> {
    let start = Instant::now();
    let upload = Upload::read(multipart, state.server.max_file_size).await?;
    let data = upload.file.as_ref().ok_or(AdjustError::MissingFile)?;
    let limits = ContrastLimits::try_new(upload.limit("min")?, upload.limit("max")?)?;

    let mut image = codec::decode(data)?;
    codec::apply_lut(&mut image, &LookupTable::from_limits(limits))?;
    let png = codec::encode_png(&image)?;

    tracing::info!(
        "Adjusted upload with {} in {}ms",
        limits,
        start.elapsed().as_millis()
    );

    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        luminance: state.config.luminance,
        cutoffs: state.config.cutoffs.clone(),
        max_file_size_bytes: state.server.max_file_size,
    })
}
