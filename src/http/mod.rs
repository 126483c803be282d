//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware: request ID, trace, CORS, timeout)
//!     → request.rs (request ID, query parameter lookup)
//!     → handlers.rs (validate parameters, call the command executor)
//!     → codec.rs (base64 in for SET values, base64 out for GET values)
//!     → response.rs (JSON envelope)
//!     → Send to client
//! ```

pub mod codec;
pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use response::Envelope;
pub use server::HttpServer;
