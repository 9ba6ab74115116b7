//! Sofa Core Library
//!
//! Types shared by the sofa client and its test server:
//! - Client configuration
//! - Document envelope and view row models
//! - Random document identifiers
//! - JSON key collation for view ranges

pub mod collate;
pub mod config;
pub mod models;
pub mod uuid;

// Re-export commonly used types
pub use config::Config;
pub use models::*;
pub use uuid::{new_id, random_hex};
