//! HTTP-level tests for [`AgentApi`] against a mock agent service.

use agentrun_client::{classify, AgentApi, ClientConfig, ErrorClass, FetchError, SubmitError};
use agentrun_core::{ChatRequest, ExecutionState, JobHandle, JobRequest, ScheduleInputs};
use assert_matches::assert_matches;
use mockito::Matcher;
use serde_json::json;

fn api(server: &mockito::Server) -> AgentApi {
    let config = ClientConfig::new(server.url(), "test-token", "acct-1", "agent-1");
    AgentApi::new(config).unwrap()
}

fn schedule(ms_token: &str) -> JobRequest {
    JobRequest::Schedule(ScheduleInputs {
        ms_token: Some(ms_token.to_string()),
        user_id: "ops@example.com".into(),
        input_folder: "/Demo/Schedules".into(),
        output_file: "/Demo/Combined Schedules.xlsx".into(),
    })
}

// ---------------------------------------------------------------------------
// Test: submission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_posts_inputs_with_bearer_auth() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/acct-1/agent/agent-1/execute")
        .match_header("authorization", "Bearer test-token")
        .match_body(Matcher::Json(json!({ "inputs": { "userPrompt": "hello" } })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"queued","executionId":"exec-42"}"#)
        .create_async()
        .await;

    let handle = api(&server)
        .start_execution(&JobRequest::Chat(ChatRequest::new("hello")))
        .await
        .unwrap();

    assert_eq!(handle, JobHandle::new("exec-42"));
    mock.assert_async().await;
}

#[tokio::test]
async fn whitespace_ms_token_is_omitted_from_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/acct-1/agent/agent-1/execute")
        .match_body(Matcher::Json(json!({
            "inputs": {
                "userId": "ops@example.com",
                "inputFolder": "/Demo/Schedules",
                "outputFile": "/Demo/Combined Schedules.xlsx"
            }
        })))
        .with_status(200)
        .with_body(r#"{"status":"queued","executionId":"exec-7"}"#)
        .create_async()
        .await;

    let result = api(&server).start_execution(&schedule("   ")).await;

    assert!(result.is_ok());
    mock.assert_async().await;
}

#[tokio::test]
async fn invalid_request_is_not_sent() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let mut request = schedule("");
    if let JobRequest::Schedule(inputs) = &mut request {
        inputs.user_id = String::new();
    }
    let err = api(&server).start_execution(&request).await.unwrap_err();

    assert_matches!(err, SubmitError::InvalidRequest(_));
    mock.assert_async().await;
}

#[tokio::test]
async fn submit_without_execution_id_fails() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/acct-1/agent/agent-1/execute")
        .with_status(200)
        .with_body(r#"{"status":"error"}"#)
        .create_async()
        .await;

    let err = api(&server)
        .start_execution(&JobRequest::Chat(ChatRequest::new("hi")))
        .await
        .unwrap_err();

    assert_matches!(err, SubmitError::MissingExecutionId);
}

#[tokio::test]
async fn submit_http_error_is_surfaced_once() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/acct-1/agent/agent-1/execute")
        .with_status(503)
        .with_body("unavailable")
        .expect(1)
        .create_async()
        .await;

    let err = api(&server)
        .start_execution(&JobRequest::Chat(ChatRequest::new("hi")))
        .await
        .unwrap_err();

    assert_matches!(err, SubmitError::Api { status: 503, body } if body == "unavailable");
    mock.assert_async().await;
}

// ---------------------------------------------------------------------------
// Test: status fetch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_fetch_parses_execution() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/acct-1/agent/exec-42/status")
        .match_header("authorization", "Bearer test-token")
        .with_status(200)
        .with_body(
            json!({
                "status": "success",
                "execution": {
                    "_id": "exec-42",
                    "status": "finished",
                    "outputs": { "aianswer": "Done." },
                    "updatedAt": "2026-10-18T09:01:00Z",
                    "queuedAt": "2026-10-18T09:00:00Z",
                    "startedAt": "2026-10-18T09:00:02Z",
                    "finishedAt": "2026-10-18T09:01:00Z"
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let snapshot = api(&server)
        .get_execution_status(&JobHandle::new("exec-42"))
        .await
        .unwrap();

    assert_eq!(snapshot.state, ExecutionState::Finished);
    assert_eq!(snapshot.outputs.unwrap()["aianswer"], "Done.");
    assert!(snapshot.finished_at.is_some());
    mock.assert_async().await;
}

#[tokio::test]
async fn status_server_error_is_transient() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/acct-1/agent/exec-1/status")
        .with_status(502)
        .create_async()
        .await;

    let err = api(&server)
        .get_execution_status(&JobHandle::new("exec-1"))
        .await
        .unwrap_err();

    assert_matches!(err, FetchError::Http { status: 502, .. });
    assert_eq!(classify(&err), ErrorClass::Transient);
}

#[tokio::test]
async fn status_not_found_is_fatal() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/acct-1/agent/exec-1/status")
        .with_status(404)
        .with_body(r#"{"error":"not found"}"#)
        .create_async()
        .await;

    let err = api(&server)
        .get_execution_status(&JobHandle::new("exec-1"))
        .await
        .unwrap_err();

    assert_eq!(classify(&err), ErrorClass::Fatal);
    assert_eq!(
        err.user_message(),
        "Sorry, the status of this request could not be retrieved."
    );
    assert!(!err.user_message().contains("not found"));
}

#[tokio::test]
async fn malformed_status_body_is_fatal() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/acct-1/agent/exec-1/status")
        .with_status(200)
        .with_body("<html>gateway</html>")
        .create_async()
        .await;

    let err = api(&server)
        .get_execution_status(&JobHandle::new("exec-1"))
        .await
        .unwrap_err();

    assert_matches!(err, FetchError::Decode(_));
    assert_eq!(classify(&err), ErrorClass::Fatal);
}

#[tokio::test]
async fn unreachable_service_is_transient() {
    let config = ClientConfig::new("http://127.0.0.1:1", "t", "acct-1", "agent-1");
    let err = AgentApi::new(config)
        .unwrap()
        .get_execution_status(&JobHandle::new("exec-1"))
        .await
        .unwrap_err();

    assert_matches!(err, FetchError::Transport(_));
    assert_eq!(classify(&err), ErrorClass::Transient);
    assert!(!err.user_message().contains("127.0.0.1"));
    assert_eq!(
        err.user_message(),
        "The service could not be reached. Please check your network and try again."
    );
}
