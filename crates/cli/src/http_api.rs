use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{Response as HttpResponse, StatusCode},
    response::Response,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use syllabus_protocol::{serialize_json, ErrorEnvelope, SearchRequest};
use syllabus_search::{RetrievalEngine, SearchError};

pub(crate) struct HttpState {
    pub(crate) engine: RetrievalEngine,
}

pub(crate) fn router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/search", post(search_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

pub(crate) fn error_envelope(code: &str, message: String) -> ErrorEnvelope {
    let hint = match code {
        "invalid_request" => Some(r#"Send a JSON body such as {"query": "民法の成績評価は?"}"#),
        "embedding_failed" => {
            Some("Check OPENAI_API_KEY, or start the server with --embed-mode stub for offline use.")
        }
        "no_data" => Some("No dataset could be loaded; run `syllabus doctor` to check the paths."),
        _ => None,
    };
    ErrorEnvelope {
        code: code.to_string(),
        message,
        hint: hint.map(str::to_string),
    }
}

pub(crate) fn status_for(err: &SearchError) -> StatusCode {
    if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

pub(crate) fn build_response<T: Serialize>(
    status: StatusCode,
    body: &T,
) -> Result<Response, StatusCode> {
    let bytes = serialize_json(body)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .into_bytes();

    HttpResponse::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(bytes))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

pub(crate) async fn search_handler(
    State(state): State<Arc<HttpState>>,
    body: Bytes,
) -> Result<Response, StatusCode> {
    let request: SearchRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            let envelope = error_envelope("invalid_request", format!("Invalid JSON request: {err}"));
            return build_response(StatusCode::BAD_REQUEST, &envelope);
        }
    };

    match state.engine.search(&request.query).await {
        Ok(response) => build_response(StatusCode::OK, &response),
        Err(err) => {
            let status = status_for(&err);
            if status.is_server_error() {
                log::error!("Search failed: {err}");
            }
            build_response(status, &error_envelope(err.code(), err.to_string()))
        }
    }
}

pub(crate) async fn health_handler(
    State(state): State<Arc<HttpState>>,
) -> Result<Response, StatusCode> {
    build_response(StatusCode::OK, &state.engine.health())
}
