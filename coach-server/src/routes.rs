//! HTTP route handlers for the feedback API.

use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use coach::agents::{FeedbackGenerator, Verifier};
use coach::core::types::EvaluationInput;
use coach::io::alert::{error_alert, result_alert};
use coach::orchestrate::InvalidInputError;

use crate::state::AppState;

const FEEDBACK_PATH: &str = "/agent/feedback";

/// Build the application router.
pub fn router<G, V>(state: AppState<G, V>) -> Router
where
    G: FeedbackGenerator + 'static,
    V: Verifier + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route(FEEDBACK_PATH, post(feedback::<G, V>))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: &'static str,
    detail: String,
}

/// Deliver an operator alert in the background when a webhook is configured.
fn send_alert<G, V>(state: &AppState<G, V>, text: String) {
    let Some(notifier) = state.notifier.clone() else {
        return;
    };
    tokio::spawn(async move {
        if let Err(err) = notifier.notify(&text).await {
            warn!(error = %format!("{err:#}"), "alert delivery failed");
        }
    });
}

fn error_response(status: StatusCode, message: &'static str, detail: String) -> Response {
    (status, Json(ErrorBody { message, detail })).into_response()
}

/// POST /agent/feedback - run one orchestration and return its result.
///
/// The run is spawned so it keeps its own task; if the client goes away the
/// handler future is dropped and the guard cancels the run.
async fn feedback<G, V>(
    State(state): State<AppState<G, V>>,
    body: Result<Json<EvaluationInput>, JsonRejection>,
) -> Response
where
    G: FeedbackGenerator + 'static,
    V: Verifier + 'static,
{
    let Json(input) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "malformed feedback request");
            return error_response(
                StatusCode::BAD_REQUEST,
                "요청 형식이 올바르지 않습니다.",
                rejection.body_text(),
            );
        }
    };

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let orchestrator = state.orchestrator.clone();
    let run = tokio::spawn(async move { orchestrator.run(input, &cancel).await });

    match run.await {
        Ok(Ok(outcome)) => {
            if let Some(text) = result_alert(FEEDBACK_PATH, &outcome.result) {
                send_alert(&state, text);
            }
            Json(outcome.result).into_response()
        }
        Ok(Err(err)) => match err.downcast_ref::<InvalidInputError>() {
            Some(invalid) => error_response(
                StatusCode::BAD_REQUEST,
                "평가 결과 텍스트가 비어 있습니다.",
                invalid.to_string(),
            ),
            None => {
                let detail = format!("{err:#}");
                error!(error = %detail, "feedback run failed");
                send_alert(&state, error_alert(FEEDBACK_PATH, &detail));
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "피드백 생성 중 오류가 발생했습니다.",
                    detail,
                )
            }
        },
        Err(join_err) => {
            error!(error = %join_err, "feedback task aborted");
            send_alert(&state, error_alert(FEEDBACK_PATH, &join_err.to_string()));
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "피드백 생성 중 오류가 발생했습니다.",
                join_err.to_string(),
            )
        }
    }
}
