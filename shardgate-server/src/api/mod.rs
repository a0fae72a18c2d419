//! HTTP API

mod http;

pub use http::HttpApi;
