//! 路由处理器

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use futures_util::stream;
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::core::{ExecuteRequest, RelayError};
use crate::store::AgentDescriptor;

const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson; charset=utf-8";

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(err: RelayError) -> ApiError {
    let status = match err {
        RelayError::Validation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = match err {
        RelayError::Validation(msg) => msg,
        other => other.to_string(),
    };
    (status, Json(json!({ "error": message })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    name: String,
    url: String,
    description: String,
}

/// POST /registry/register
pub async fn register_agent(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let agent = AgentDescriptor::new(req.name, req.url, req.description).map_err(api_error)?;
    tracing::info!("[Registry] Registered: {} at {}", agent.name, agent.base_url);
    state
        .orchestrator
        .agents()
        .register(agent)
        .await
        .map_err(api_error)?;
    Ok(Json(json!({ "success": true })))
}

/// GET /registry/agents
pub async fn list_agents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AgentDescriptor>>, ApiError> {
    let agents = state.orchestrator.agents().list().await.map_err(api_error)?;
    Ok(Json(agents))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecuteBody {
    user_intent: String,
    target_url: Option<String>,
    session_id: Option<String>,
}

impl From<ExecuteBody> for ExecuteRequest {
    fn from(body: ExecuteBody) -> Self {
        ExecuteRequest {
            intent: body.user_intent,
            target_url: body.target_url,
            session_id: body.session_id,
        }
    }
}

/// POST /proxy/execute：校验后在后台处理，事件逐行写回
pub async fn execute(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ExecuteBody>,
) -> Result<Response, ApiError> {
    let request = ExecuteRequest::from(body);
    request.validate().map_err(api_error)?;

    let rx = state.orchestrator.handle(request);
    let stream = stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        let line = Bytes::from(event.to_ndjson());
        Some((Ok::<_, std::convert::Infallible>(line), rx))
    });

    let mut res = Body::from_stream(stream).into_response();
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(NDJSON_CONTENT_TYPE),
    );
    Ok(res)
}
