use thiserror::Error;

/// Failures that can only come from loading inputs. Everything computed
/// from loaded data (joins, series, tiers) is total and never errors.
#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("geojson error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("weekly matrix has no `{0}` column")]
    MissingTimeColumn(String),

    #[error("log file setup failed: {0}")]
    Logging(#[from] tracing_appender::rolling::InitError),
}

pub type Result<T> = std::result::Result<T, AtlasError>;
