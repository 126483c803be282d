//! HTTP gateway for a Redis-compatible key-value store.
//!
//! `GET /get?key=K` and `GET /set?key=K&value=B64` become single store
//! commands issued over a bounded pool of reused connections. Values travel
//! as base64 over HTTP and as raw bytes to the store.

pub mod command;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pool;
pub mod store;

pub use command::CommandExecutor;
pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pool::Pool;
