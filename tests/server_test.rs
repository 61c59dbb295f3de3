//! 路由测试：注册校验、执行请求校验、NDJSON 流

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use common::{Harness, StubTranslator, StubTransport};
use relay::server::{router, AppState};
use relay::translator::Task;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(h: &Harness) -> axum::Router {
    router(AppState::new(h.orchestrator.clone()))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(res: axum::response::Response) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let h = Harness::new(StubTranslator::new(), StubTransport::new());
    let res = app(&h)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn test_register_then_list() {
    let h = Harness::new(StubTranslator::new(), StubTransport::new());

    let res = app(&h)
        .oneshot(post_json(
            "/registry/register",
            json!({ "name": "SalonBot", "url": "http://a", "description": "Books haircuts" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await, json!({ "success": true }));

    let res = app(&h)
        .oneshot(Request::builder().uri("/registry/agents").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let agents = body_json(res).await;
    assert_eq!(agents.as_array().unwrap().len(), 1);
    assert_eq!(agents[0]["name"], "SalonBot");
    assert_eq!(agents[0]["url"], "http://a");
}

#[tokio::test]
async fn test_register_missing_fields() {
    let h = Harness::new(StubTranslator::new(), StubTransport::new());

    for body in [
        json!({ "name": "SalonBot", "url": "http://a" }),
        json!({ "name": "  ", "url": "http://a", "description": "x" }),
    ] {
        let res = app(&h).oneshot(post_json("/registry/register", body)).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await, json!({ "error": "Missing fields" }));
    }
}

#[tokio::test]
async fn test_execute_requires_intent() {
    let h = Harness::new(StubTranslator::new(), StubTransport::new());

    let res = app(&h)
        .oneshot(post_json("/proxy/execute", json!({ "targetUrl": "http://a" })))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(h.translator.decompose_count(), 0);
}

#[tokio::test]
async fn test_execute_streams_ndjson() {
    let translator = StubTranslator::new()
        .with_plan(vec![Task::new("SalonBot", "book a haircut at 17:00", "salon")]);
    let transport = StubTransport::new()
        .page("http://a/docs", "salon docs")
        .route("http://a/bookings/create", Ok(json!({ "status": "confirmed" })));
    let h = Harness::new(translator, transport);
    h.register("SalonBot", "http://a").await;

    let res = app(&h)
        .oneshot(post_json(
            "/proxy/execute",
            json!({ "userIntent": "book a haircut at 17:00", "sessionId": "web-1" }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()[header::CONTENT_TYPE],
        "application/x-ndjson; charset=utf-8"
    );

    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let lines: Vec<Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let types: Vec<&str> = lines.iter().map(|v| v["type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["status", "plan", "status", "result", "done"]);
    assert_eq!(lines[0]["sessionId"], "web-1");
    assert_eq!(lines[1]["tasks"][0]["agentName"], "SalonBot");
    assert_eq!(lines[3]["source"], "TRANSLATED");
    assert_eq!(lines[3]["result"]["status"], "confirmed");
}
