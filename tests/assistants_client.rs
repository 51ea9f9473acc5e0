//! HTTP client against a mock Assistants server

use mockito::Matcher;
use serde_json::json;

use virtuoso_convert::assistants::{
    ApiError, AssistantsApi, AssistantsClient, CreateAssistant, Role, RunStatus, Tool,
};

fn client_for(server: &mockito::ServerGuard) -> AssistantsClient {
    AssistantsClient::new("sk-test").unwrap().base_url(server.url())
}

#[tokio::test]
async fn test_create_assistant_sends_definition() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/assistants")
        .match_header("authorization", "Bearer sk-test")
        .match_header("openai-beta", "assistants=v2")
        .match_body(Matcher::Json(json!({
            "name": "Selenium to Virtuoso Converter",
            "instructions": "Convert Selenium tests",
            "model": "gpt-4o",
            "tools": [{"type": "code_interpreter"}]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "asst_123",
                "object": "assistant",
                "created_at": 1700000000,
                "name": "Selenium to Virtuoso Converter",
                "model": "gpt-4o",
                "instructions": "Convert Selenium tests",
                "tools": [{"type": "code_interpreter"}]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let request = CreateAssistant::new("Selenium to Virtuoso Converter", "Convert Selenium tests")
        .model("gpt-4o")
        .tools(vec![Tool::CodeInterpreter]);
    let assistant = client_for(&server).create_assistant(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(assistant.id, "asst_123");
    assert_eq!(assistant.tools, vec![Tool::CodeInterpreter]);
}

#[tokio::test]
async fn test_thread_message_and_run() {
    let mut server = mockito::Server::new_async().await;
    let thread_mock = server
        .mock("POST", "/threads")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "thread_abc", "object": "thread", "created_at": 1}"#)
        .create_async()
        .await;
    let message_mock = server
        .mock("POST", "/threads/thread_abc/messages")
        .match_body(Matcher::PartialJson(json!({"role": "user", "content": "convert me"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "msg_1",
                "object": "thread.message",
                "role": "user",
                "created_at": 2,
                "content": [{"type": "text", "text": {"value": "convert me", "annotations": []}}]
            })
            .to_string(),
        )
        .create_async()
        .await;
    let run_mock = server
        .mock("POST", "/threads/thread_abc/runs")
        .match_body(Matcher::Json(json!({"assistant_id": "asst_123"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "run_9", "object": "thread.run", "status": "queued", "thread_id": "thread_abc"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let thread = client.create_thread().await.unwrap();
    let message = client
        .add_message(&thread.id, Role::User, "convert me")
        .await
        .unwrap();
    let run = client.create_run(&thread.id, "asst_123", None).await.unwrap();

    thread_mock.assert_async().await;
    message_mock.assert_async().await;
    run_mock.assert_async().await;
    assert_eq!(message.text(), "convert me");
    assert_eq!(run.id, "run_9");
    assert_eq!(run.status, RunStatus::Queued);
}

#[tokio::test]
async fn test_run_with_instructions() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/threads/thread_abc/runs")
        .match_body(Matcher::Json(json!({
            "assistant_id": "asst_123",
            "instructions": "Only output JSON"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "run_9", "status": "queued"}"#)
        .create_async()
        .await;

    client_for(&server)
        .create_run("thread_abc", "asst_123", Some("Only output JSON"))
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_run_reports_failure_reason() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/threads/thread_abc/runs/run_9")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "run_9",
                "status": "failed",
                "last_error": {"code": "server_error", "message": "Something went wrong."}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let run = client_for(&server).get_run("thread_abc", "run_9").await.unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(
        run.last_error.unwrap().to_string(),
        "server_error: Something went wrong."
    );
}

#[tokio::test]
async fn test_list_messages_newest_first() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/threads/thread_abc/messages")
        .match_query(Matcher::UrlEncoded("order".into(), "desc".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "object": "list",
                "data": [
                    {"id": "msg_2", "role": "assistant", "created_at": 5,
                     "content": [{"type": "text", "text": {"value": "[]", "annotations": []}}]},
                    {"id": "msg_1", "role": "user", "created_at": 2,
                     "content": [{"type": "text", "text": {"value": "convert me", "annotations": []}}]}
                ],
                "first_id": "msg_2",
                "last_id": "msg_1",
                "has_more": false
            })
            .to_string(),
        )
        .create_async()
        .await;

    let list = client_for(&server).list_messages("thread_abc").await.unwrap();
    mock.assert_async().await;
    assert_eq!(list.data.len(), 2);
    assert_eq!(list.latest_assistant().unwrap().text(), "[]");
}

#[tokio::test]
async fn test_cancel_run() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/threads/thread_abc/runs/run_9/cancel")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "run_9", "status": "cancelling"}"#)
        .create_async()
        .await;

    let run = client_for(&server).cancel_run("thread_abc", "run_9").await.unwrap();
    mock.assert_async().await;
    assert_eq!(run.status, RunStatus::Cancelling);
}

#[tokio::test]
async fn test_error_status_propagates_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/threads/thread_missing/runs")
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": {"message": "No thread found with id 'thread_missing'.", "type": "invalid_request_error"}}"#)
        .create_async()
        .await;

    let err = client_for(&server)
        .create_run("thread_missing", "asst_123", None)
        .await
        .unwrap_err();

    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "No thread found with id 'thread_missing'.");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_undecodable_body_is_http_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/threads")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("not json")
        .create_async()
        .await;

    let err = client_for(&server).create_thread().await.unwrap_err();
    assert!(matches!(err, ApiError::Http(_)));
}
