use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use navtask_kernel::logs::{tail_lines, MAX_LOG_LINES};
use navtask_kernel::{DiagnosticRequest, TaskRequest};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use super::auth::{require_auth, AuthPolicy, CallerRole};
use super::state::ServeState;

pub fn build_router(state: ServeState, auth: Arc<AuthPolicy>) -> Router {
    let protected = Router::new()
        .route("/run_task", post(run_task_handler))
        .route("/diagnose_browser", post(diagnose_handler))
        .route("/view_logs/:lines", get(view_logs_handler))
        .route_layer(middleware::from_fn_with_state(auth, require_auth));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .merge(protected)
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "message": "navtask browser task API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /run_task": "run a natural-language task against a URL",
            "POST /diagnose_browser": "check that a sandboxed browser can reach a URL",
            "GET /view_logs/{lines}": "tail the diagnostic log",
            "GET /health": "liveness check",
        },
        "authentication": "Authorization: Bearer <API_KEY>",
    }))
}

async fn health_handler(State(state): State<ServeState>) -> impl IntoResponse {
    Json(json!({ "status": "ok", "environment": state.environment }))
}

/// Runs on its own task so a dropped connection cannot cut cleanup short.
async fn run_task_handler(
    State(state): State<ServeState>,
    Extension(CallerRole(role)): Extension<CallerRole>,
    Json(request): Json<TaskRequest>,
) -> Response {
    let orchestrator = state.orchestrator.clone();
    let joined =
        tokio::spawn(async move { orchestrator.run(request, Some(role.as_str())).await }).await;
    match joined {
        Ok(Ok(response)) => Json(response).into_response(),
        Ok(Err(err)) => {
            let status =
                StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                Json(json!({ "detail": err.to_string(), "code": err.code() })),
            )
                .into_response()
        }
        Err(err) => {
            error!(?err, "task execution aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": "task execution aborted" })),
            )
                .into_response()
        }
    }
}

async fn diagnose_handler(
    State(state): State<ServeState>,
    Json(request): Json<DiagnosticRequest>,
) -> Response {
    let diagnostics = Arc::clone(&state.diagnostics);
    match tokio::spawn(async move { diagnostics.diagnose(request).await }).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => {
            error!(?err, "diagnosis aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": "diagnosis aborted" })),
            )
                .into_response()
        }
    }
}

async fn view_logs_handler(
    State(state): State<ServeState>,
    Path(lines): Path<usize>,
) -> impl IntoResponse {
    match tail_lines(&state.diag_log, lines).await {
        Ok(logs) => Json(json!({
            "status": "success",
            "lines_count": logs.len(),
            "max_lines": MAX_LOG_LINES,
            "logs": logs,
        })),
        Err(err) => Json(json!({
            "status": "error",
            "message": format!("{err:#}"),
        })),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use browser_sandbox::SandboxConfig;
    use navtask_kernel::{
        BrowserDiagnostics, ChromeSandboxProvider, Credentials, Orchestrator, Settings,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    fn router(diag_log: std::path::PathBuf) -> Router {
        let settings = Arc::new(Settings::default());
        let sandbox = SandboxConfig {
            executable: Some("/no/such/chromium".into()),
            ..SandboxConfig::default()
        };
        let state = ServeState::new(
            Orchestrator::from_settings(settings, Credentials::default()),
            BrowserDiagnostics::new(ChromeSandboxProvider::new(sandbox), std::env::temp_dir()),
            "development",
            diag_log,
        );
        build_router(state, Arc::new(AuthPolicy::new("admin-key", true)))
    }

    async fn send(router: Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post_json(uri: &str, key: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(key) = key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let req = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(router("unused.log".into()), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok", "environment": "development"}));
    }

    #[tokio::test]
    async fn protected_routes_require_bearer_key() {
        let req = post_json("/run_task", None, json!({"url": "https://a", "task": "b"}));
        let response = router("unused.log".into()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );

        let req = post_json("/run_task", Some("wrong"), json!({"url": "https://a", "task": "b"}));
        let (status, _) = send(router("unused.log".into()), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_model_credential_is_a_server_error() {
        let req = post_json(
            "/run_task",
            Some("admin-key"),
            json!({"url": "https://example.com", "task": "read the title"}),
        );
        let (status, body) = send(router("unused.log".into()), req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().contains("OPENAI_API_KEY"));
        assert_eq!(body["code"], "config.missing_credential");
    }

    #[tokio::test]
    async fn malformed_requests_are_unprocessable() {
        let missing_task = post_json("/run_task", Some("123"), json!({"url": "https://a"}));
        let (status, _) = send(router("unused.log".into()), missing_task).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let blank_url = post_json("/run_task", Some("123"), json!({"url": "", "task": "x"}));
        let (status, body) = send(router("unused.log".into()), blank_url).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "request.invalid");
    }

    #[tokio::test]
    async fn diagnosis_reports_launch_failure_in_body() {
        let req = post_json(
            "/diagnose_browser",
            Some("admin-key"),
            json!({"url": "https://example.com", "capture_screenshot": false}),
        );
        let (status, body) = send(router("unused.log".into()), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");
        assert!(body["debug_info"]["diag_id"].as_str().unwrap().starts_with("diag_"));
    }

    #[tokio::test]
    async fn view_logs_tails_the_diagnostic_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("task_diag.log");
        std::fs::write(&log, "one\ntwo\nthree\n").unwrap();

        let req = Request::get("/view_logs/2")
            .header(header::AUTHORIZATION, "Bearer admin-key")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(router(log), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["lines_count"], 2);
        assert_eq!(body["logs"], json!(["two", "three"]));

        let req = Request::get("/view_logs/5")
            .header(header::AUTHORIZATION, "Bearer admin-key")
            .body(Body::empty())
            .unwrap();
        let (_, body) = send(router(dir.path().join("missing.log")), req).await;
        assert_eq!(body["status"], "error");
    }
}
