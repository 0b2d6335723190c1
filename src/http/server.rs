//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, CORS, request ID)
//! - Serve the API document at `/openapi.json`
//! - Hand every other request to the dispatcher
//! - Bind server to listener with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::error::StartupError;
use crate::functions::{Authorizer, Handler, LambdaFunction};
use crate::http::dispatch::Dispatcher;
use crate::routing::OperationIndex;

/// Path the API document is served on.
pub const OPENAPI_PATH: &str = "/openapi.json";

/// The functions requests are dispatched to.
#[derive(Clone)]
pub struct Functions {
    pub handler: Arc<dyn LambdaFunction>,
    pub authorizer: Option<Arc<dyn LambdaFunction>>,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub document: Arc<Value>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    dispatcher: Arc<Dispatcher>,
}

impl HttpServer {
    /// Create a new HTTP server for `document` with the given configuration.
    pub fn new(config: GatewayConfig, document: Value, functions: Functions) -> Result<Self, StartupError> {
        let index = Arc::new(OperationIndex::from_spec(&document)?);
        let dispatcher = Arc::new(Dispatcher::new(
            &config,
            index,
            Handler::new(functions.handler),
            functions.authorizer.map(Authorizer::new),
        )?);

        let port = config
            .listener
            .bind_address
            .parse::<SocketAddr>()
            .map(|addr| addr.port())
            .unwrap_or_default();

        let state = AppState {
            dispatcher: dispatcher.clone(),
            document: Arc::new(with_local_server(document, port)),
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            dispatcher,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route(OPENAPI_PATH, get(openapi_document))
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(CorsLayer::permissive())
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            operations = self.dispatcher.index().len(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.dispatcher.handle(request).await
}

async fn openapi_document(State(state): State<AppState>) -> Json<Value> {
    Json(state.document.as_ref().clone())
}

/// Put the local gateway first in the document's `servers` list.
pub fn with_local_server(mut document: Value, port: u16) -> Value {
    let local = json!({ "url": format!("http://localhost:{port}") });
    if let Some(root) = document.as_object_mut() {
        match root.get_mut("servers").and_then(Value::as_array_mut) {
            Some(servers) => servers.insert(0, local),
            None => {
                root.insert("servers".to_string(), Value::Array(vec![local]));
            }
        }
    }
    document
}
