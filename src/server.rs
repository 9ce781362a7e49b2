//! HTTP endpoint for the Slack Events API.
//!
//! Classification happens synchronously; actionable mentions are acknowledged
//! right away and answered on a spawned task, since Slack redelivers events
//! that are not acknowledged within a few seconds.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use tokio::net::TcpListener;
use tracing::{error, info, instrument};

use crate::{
    base::types::{ChallengeResponse, Void, WebhookError},
    interaction::{
        app_mention::handle_app_mention,
        classifier::{Classification, classify},
    },
    runtime::Runtime,
};

/// Tells Slack not to redeliver an event we rejected.
pub const NO_RETRY_HEADER: &str = "X-Slack-No-Retry";

/// Build the router for the events endpoint.
pub fn router(runtime: Runtime) -> Router {
    let path = runtime.config.events_path.clone();

    Router::new().route(&path, post(handle_events)).with_state(runtime)
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(runtime: Runtime) -> Void {
    let address = runtime.config.listen_address.clone();
    let listener = TcpListener::bind(&address).await?;

    info!("Listening for Slack events on `{}{}` ...", address, runtime.config.events_path);

    axum::serve(listener, router(runtime)).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", err);
    }

    info!("Shutting down ...");
}

/// Handles a single Events API request.
#[instrument(skip_all)]
pub async fn handle_events(State(runtime): State<Runtime>, body: Bytes) -> Response {
    match classify(&body) {
        Ok(Classification::Verification { challenge }) => {
            info!("Answering URL verification ...");

            Json(ChallengeResponse { challenge }).into_response()
        }
        Ok(Classification::Ignored) => StatusCode::OK.into_response(),
        Ok(Classification::Actionable(mention)) => {
            info!("Received app mention from <@{}> in `{}` ...", mention.requester_id, mention.channel_id);

            handle_app_mention(mention, runtime.config.clone(), runtime.llm.clone(), runtime.chat.clone());

            StatusCode::OK.into_response()
        }
        Err(err) => err.into_response(),
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        error!("Rejecting webhook: {}", self);

        (StatusCode::INTERNAL_SERVER_ERROR, [(NO_RETRY_HEADER, "1")], self.to_string()).into_response()
    }
}
