//! Error types for the experimentation engine
//!
//! Errors are construction-time only. Runtime paths (allocation, storage
//! reads/writes, conversion tracking, significance math) never fail:
//! storage trouble degrades to "no assignment" and weight anomalies
//! degrade to uniform allocation.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid experiment definition: {0}")]
    InvalidDefinition(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Catalog error: {0}")]
    CatalogError(String),

    #[error("Event sink error: {0}")]
    SinkError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_definition() {
        let err = Error::InvalidDefinition("variants list is empty".to_string());
        assert!(err.to_string().contains("Invalid experiment definition"));
        assert!(err.to_string().contains("variants list is empty"));
    }

    #[test]
    fn test_error_display_storage_error() {
        let err = Error::StorageError("disk full".to_string());
        assert!(err.to_string().contains("Storage error"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_error_display_invalid_argument() {
        let err = Error::InvalidArgument("unknown variant".to_string());
        assert!(err.to_string().contains("Invalid argument"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::IoError(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::SerializationError(_)));
        assert!(err.to_string().contains("Serialization error"));
    }

    #[test]
    fn test_error_from_serde_yaml() {
        let yaml_err = serde_yaml::from_str::<Vec<i32>>("{bad").unwrap_err();
        let err: Error = yaml_err.into();
        assert!(matches!(err, Error::SerializationError(_)));
    }

    #[test]
    fn test_error_debug_impl() {
        let err = Error::CatalogError("bad file".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("CatalogError"));
    }

    #[test]
    fn test_result_type_err() {
        let result: Result<i32> = Err(Error::InvalidArgument("test".to_string()));
        assert!(result.is_err());
    }
}
