//! Authorization mediation.
//!
//! # States
//! ```text
//! Build → Invoke → Evaluate ─┬─ Effect == "Allow" → Grant → Authorized
//!                            └─ anything else            → Denied
//! ```
//!
//! Only the first statement of the policy document is evaluated. An
//! authorizer that fails is reported as an invocation error, not a denial.

use std::sync::Arc;

use crate::config::AuthConfig;
use crate::events::{AuthorizerContext, AuthorizerEvent, CallerIdentity, InvocationEvent};
use crate::functions::{Authorizer, FunctionError};
use crate::observability::metrics;

/// Terminal state of one authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Identity was merged into the event; the handler may run.
    Authorized,
    /// The handler must not run.
    Denied,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Authorized => "authorized",
            Decision::Denied => "denied",
        }
    }
}

/// Calls the authorizer for secured operations and applies its decision.
#[derive(Clone)]
pub struct AuthorizationMediator {
    authorizer: Authorizer,
    auth: Arc<AuthConfig>,
}

impl AuthorizationMediator {
    pub fn new(authorizer: Authorizer, auth: Arc<AuthConfig>) -> Self {
        Self { authorizer, auth }
    }

    /// Run the authorizer for `event`.
    ///
    /// On [`Decision::Authorized`] the policy's `principalId` and `context`
    /// are stored in `event.request_context.authorizer`. On
    /// [`Decision::Denied`] the event is left untouched.
    pub async fn authorize(
        &self,
        event: &mut InvocationEvent,
        caller: &CallerIdentity,
    ) -> Result<Decision, FunctionError> {
        let request = AuthorizerEvent::from_invocation(event, caller, &self.auth);

        tracing::debug!(
            authorizer = %self.authorizer.name(),
            operation = %event.operation_name(),
            method_arn = %caller.method_arn,
            "Invoking authorizer"
        );
        let policy = self.authorizer.invoke(&request).await?;

        let decision = if policy.is_allowed() {
            tracing::debug!(
                operation = %event.operation_name(),
                principal_id = %policy.principal_id,
                "Authorizer allowed request"
            );
            event.request_context.authorizer =
                Some(AuthorizerContext::new(policy.principal_id, policy.context));
            Decision::Authorized
        } else {
            tracing::warn!(
                operation = %event.operation_name(),
                effect = ?policy.effect(),
                "Authorizer denied request"
            );
            Decision::Denied
        };

        metrics::record_authorization(event.operation_name(), decision.as_str());
        Ok(decision)
    }
}
