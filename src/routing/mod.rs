//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     OpenAPI document
//!     → operations.rs (walk paths once, build OperationIndex)
//!     → router.rs (compile templates per method)
//!     → Freeze as immutable index + router
//!
//! Per request:
//!     (method, path)
//!     → router.rs (resolve operation name, or 404/405)
//!     → operations.rs (descriptor lookup by name)
//!     → matcher.rs (extract `id` path parameter)
//! ```
//!
//! # Design Decisions
//! - Index and router are built once and never mutated
//! - Deterministic: same input always resolves to the same operation
//! - No regex in hot path (segment comparison only)

pub mod matcher;
pub mod operations;
pub mod router;

pub use matcher::{extract_path_parameters, PathMatch, PathParameters, PathTemplate};
pub use operations::{extract_operations, OperationDescriptor, OperationIndex, SpecError};
pub use router::OperationRouter;
