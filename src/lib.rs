//! HTTP relay that forwards JPEG uploads to the i2OCR web form and returns
//! the recognized text as JSON.

pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod relay;
pub mod upload;

pub use api::{app, router, AppState};
pub use config::Config;
pub use error::{Error, Result};
