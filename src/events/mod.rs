//! Invocation event subsystem.
//!
//! # Data Flow
//! ```text
//! GatewayRequest + OperationDescriptor
//!     → request.rs (EventTranslator → InvocationEvent)
//!     → authorizer.rs (AuthorizerEvent, when the operation is secured)
//!     → [function invocation]
//!     → authorizer.rs (PolicyResult) / response.rs (HandlerResult)
//! ```
//!
//! # Design Decisions
//! - Events are request-scoped and owned by one dispatch
//! - Wire names follow the API Gateway proxy event (`queryStringParameters`, ...)

pub mod authorizer;
pub mod request;
pub mod response;

pub use authorizer::{AuthorizerEvent, CallerIdentity, PolicyDocument, PolicyResult, PolicyStatement};
pub use request::{
    AuthorizerContext, EventTranslator, GatewayRequest, InvocationEvent, RequestContext,
    RequestIdentity,
};
pub use response::HandlerResult;
