use crate::prelude::{eprintln, *};
use crate::remote::Transport;
use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use super::Server;

pub async fn run_sse<T: Transport>(options: super::cli::SseOptions, server: Server<T>) -> Result<()> {
    if server.verbose {
        eprintln!(
            "Starting MCP server with SSE transport on {}:{}...",
            options.host, options.port
        );
    }

    let addr = options.addr();
    let verbose = server.verbose;
    let shutdown = server.shutdown.clone();

    let app_router = router(Arc::new(server));

    if verbose {
        eprintln!("MCP server listening on http://{}", addr);
        eprintln!("SSE endpoint: http://{}/sse", addr);
        eprintln!("Message endpoint: http://{}/message", addr);
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| eyre!("Failed to bind to {}: {}", addr, e))?;

    axum::serve(listener, app_router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| eyre!("Server error: {e}"))?;

    Ok(())
}

fn router<T: Transport>(server: Arc<Server<T>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/sse", get(sse_handler))
        .route("/message", post(message_handler::<T>))
        .layer(cors)
        .with_state(server)
}

async fn sse_handler() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = stream::once(async { Ok(Event::default().data("MCP SSE endpoint ready")) });
    Sse::new(stream)
}

async fn message_handler<T: Transport>(
    State(server): State<Arc<Server<T>>>,
    Json(request): Json<serde_json::Value>,
) -> Response {
    let request_str = serde_json::to_string(&request).unwrap_or_default();
    if server.verbose {
        eprintln!("Received: {request_str}");
    }
    match super::handle_request(&request_str, &server).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
