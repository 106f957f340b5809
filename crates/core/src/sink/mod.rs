//! Remote sink abstraction.
//!
//! This module provides a `RemoteSink` trait for resumable uploads to a media
//! hosting service, plus an HTTP implementation of the common resumable
//! upload protocol (session URL + `Content-Range` PUTs).

mod config;
mod http;
mod types;

pub use config::HttpSinkConfig;
pub use http::HttpResumableSink;
pub use types::*;
