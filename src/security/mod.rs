//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! InvocationEvent (operation requires auth)
//!     → authorizer.rs (AuthorizerEvent → authorizer function → PolicyResult)
//!     → Authorized: identity merged into requestContext.authorizer
//!     → Denied: 401, handler never invoked
//! ```
//!
//! # Design Decisions
//! - Entered only for operations with a non-empty security requirement
//! - No retry: an authorizer failure is a 500 like any handler failure
//! - Denials carry no detail to the client

pub mod authorizer;

pub use authorizer::{AuthorizationMediator, Decision};
