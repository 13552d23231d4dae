use thiserror::Error;

/// Main error type for kekgraph
#[derive(Error, Debug)]
pub enum KekError {
    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport errors while talking to the upstream API
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream API answered with a non-success status
    #[error("API error {status} for {url}")]
    Api { status: u16, url: String },

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dot graph parse errors
    #[error("{0}")]
    Dot(#[from] crate::graph::DotError),

    /// Entity, session or file not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed entity data
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using KekError
pub type Result<T> = std::result::Result<T, KekError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KekError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let kek_err: KekError = io_err.into();
        assert!(matches!(kek_err, KekError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let kek_err: KekError = json_err.into();
        assert!(matches!(kek_err, KekError::Json(_)));
    }

    #[test]
    fn test_api_error_display() {
        let err = KekError::Api { status: 404, url: "https://x/media/1".to_string() };
        assert_eq!(err.to_string(), "API error 404 for https://x/media/1");
    }
}
