//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, CORS, tracing)
//!     → dispatch.rs (resolve operation, run the pipeline)
//!     → request.rs (headers, query, body buffering)
//!     → [events → security → functions]
//!     → response.rs (HandlerResult → HTTP response)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod request;
pub mod response;
pub mod server;

pub use dispatch::Dispatcher;
pub use request::X_REQUEST_ID;
pub use server::{Functions, HttpServer};
