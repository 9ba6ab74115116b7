//! Sofa Client Library
//!
//! HTTP client for CouchDB-style document databases: database lifecycle,
//! document reads and revision-checked writes, and view range queries.
//!
//! ```rust,no_run
//! use serde::{Deserialize, Serialize};
//! use sofa_rs::Client;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Note {
//!     text: String,
//! }
//!
//! # async fn run() -> sofa_rs::Result<()> {
//! let client = Client::new("http://localhost:5984");
//! let db = client.get_or_create_database("notes").await?;
//!
//! let rev = db.put("first", &Note { text: "hello".into() }).await?;
//! let fetched = db.get::<Note>("first").await?;
//! assert_eq!(fetched.rev, rev);
//! # Ok(())
//! # }
//! ```

mod client;
mod database;
mod view;

pub use client::Client;
pub use database::Database;
pub use sofa_core::models::{Document, Fetched, ViewResponse, ViewRow};
pub use sofa_core::{new_id, random_hex, Config};
pub use view::View;

use sofa_core::models::EnvelopeError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("ID not found in database")]
    NotFound,

    #[error("Database '{0}' doesn't exist")]
    DatabaseNotFound(String),

    #[error("Failed to read response body: {0}")]
    Body(reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// True for both document/view and database absence
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound | ClientError::DatabaseNotFound(_))
    }

    /// HTTP status of an unexpected response, if that is what failed
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<EnvelopeError> for ClientError {
    fn from(e: EnvelopeError) -> Self {
        match e {
            EnvelopeError::Serialization(e) => ClientError::Serialization(e),
            e @ EnvelopeError::NotAnObject(_) => ClientError::InvalidDocument(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::Server {
            status: 409,
            message: "conflict".to_string(),
        };
        assert_eq!(err.to_string(), "Server error: 409 - conflict");
        assert_eq!(err.status(), Some(409));

        assert_eq!(ClientError::NotFound.to_string(), "ID not found in database");
        assert_eq!(
            ClientError::DatabaseNotFound("tests".to_string()).to_string(),
            "Database 'tests' doesn't exist"
        );
    }

    #[test]
    fn test_is_not_found() {
        assert!(ClientError::NotFound.is_not_found());
        assert!(ClientError::DatabaseNotFound("x".to_string()).is_not_found());
        assert!(!ClientError::InvalidRequest("x".to_string()).is_not_found());
        assert!(!ClientError::Server {
            status: 404,
            message: String::new()
        }
        .is_not_found());
    }

    #[test]
    fn test_envelope_error_conversion() {
        let err: ClientError = EnvelopeError::NotAnObject("array").into();
        match err {
            ClientError::InvalidDocument(msg) => assert!(msg.contains("array")),
            other => panic!("Expected InvalidDocument, got {:?}", other),
        }
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: ClientError = json_err.into();
        assert!(matches!(err, ClientError::Serialization(_)));
    }
}
