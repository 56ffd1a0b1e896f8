//! API client module for the digital twin platform's REST backend.

mod client;

pub use client::{ApiClient, ApiError, DEFAULT_API_BASE};
