//! Middleware pipeline and function dispatch scenarios.

mod common;

use std::sync::Arc;

use futures::StreamExt;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use colloquy::error::ColloquyError;
use colloquy::prelude::*;

use common::{CaptureBackend, FixedReplyAgent, ScriptedStreamAgent};

fn echo_contract() -> FunctionContract {
    FunctionContract::new("echo", "echo the message").with_parameter(ContractParameter::required(
        "message",
        "message to echo",
        "string",
    ))
}

fn echo_map() -> FunctionMap {
    FunctionMap::new().register("echo", |arguments: String| async move {
        let parsed: serde_json::Value = serde_json::from_str(&arguments)?;
        let message = parsed["message"].as_str().unwrap_or_default();
        Ok(format!("[ECHO] {message}"))
    })
}

fn echo_request() -> ChatMessage {
    ToolCallMessage::single(
        ToolCall::new("echo", r#"{"message":"Hello world"}"#).with_id("call_1"),
        "gpt",
    )
    .into()
}

#[tokio::test]
async fn covered_tool_call_reply_becomes_aggregate() {
    let agent = MiddlewareAgent::new(FixedReplyAgent::new("gpt", echo_request()))
        .register_middleware(FunctionCallMiddleware::new(
            vec![echo_contract()],
            Some(echo_map()),
        ));

    let history = vec![TextMessage::new(Role::User, "echo Hello world", "user").into()];
    let reply = agent.send(&history).await.unwrap();

    let ChatMessage::Aggregate(aggregate) = &reply else {
        panic!("expected aggregate reply");
    };
    assert_eq!(aggregate.first.calls[0].function_name, "echo");
    assert_eq!(
        aggregate.second.calls[0].result.as_deref(),
        Some("[ECHO] Hello world")
    );
    assert_eq!(reply.text(), "[ECHO] Hello world");
}

#[tokio::test]
async fn uncovered_tool_call_reply_passes_through() {
    let agent = MiddlewareAgent::new(FixedReplyAgent::new("gpt", echo_request()))
        .register_middleware(FunctionCallMiddleware::new(
            vec![echo_contract()],
            Some(FunctionMap::new().register("other", |_| async { Ok(String::new()) })),
        ));

    let history = vec![TextMessage::new(Role::User, "echo Hello world", "user").into()];
    let reply = agent.send(&history).await.unwrap();

    assert!(matches!(reply, ChatMessage::ToolCall(_)));
}

#[tokio::test]
async fn executor_failure_surfaces() {
    let failing = FunctionMap::new().register("echo", |_| async {
        Err(ColloquyError::Backend("boom".into()))
    });
    let agent = MiddlewareAgent::new(FixedReplyAgent::new("gpt", echo_request()))
        .register_middleware(FunctionCallMiddleware::new(vec![echo_contract()], Some(failing)));

    let history = vec![TextMessage::new(Role::User, "echo Hello world", "user").into()];
    let err = agent.send(&history).await.unwrap_err();

    assert!(
        matches!(err, ColloquyError::ToolExecution { ref function_name, .. } if function_name == "echo")
    );
}

#[tokio::test]
async fn streaming_tool_call_emits_fragments_then_aggregate() {
    let items = vec![
        StreamItem::Delta(MessageDelta::ToolCall(ToolCallDelta::new(
            vec![ToolCallChunk::new(0)
                .with_id("call_1")
                .with_function_name("ec")
                .with_arguments(r#"{"mess"#)],
            "gpt",
        ))),
        StreamItem::Delta(MessageDelta::ToolCall(ToolCallDelta::new(
            vec![ToolCallChunk::new(0)
                .with_function_name("ho")
                .with_arguments(r#"age":"Hello world"}"#)],
            "gpt",
        ))),
    ];
    let agent = MiddlewareAgent::new(ScriptedStreamAgent::new("gpt", items))
        .register_streaming_middleware(FunctionCallMiddleware::new(
            vec![echo_contract()],
            Some(echo_map()),
        ));

    let history = vec![TextMessage::new(Role::User, "echo Hello world", "user").into()];
    let mut stream = agent
        .generate_streaming_reply(&history, &GenerateOptions::default(), &CancellationToken::new())
        .await
        .unwrap();

    let mut fragments = 0usize;
    let mut terminal = None;
    while let Some(item) = stream.next().await {
        match item.unwrap() {
            StreamItem::Delta(MessageDelta::ToolCall(_)) => fragments += 1,
            StreamItem::Delta(other) => panic!("unexpected fragment kind: {other:?}"),
            StreamItem::Completed(message) => terminal = Some(message),
        }
    }

    assert_eq!(fragments, 2);
    let terminal = terminal.expect("terminal aggregate");
    let ChatMessage::Aggregate(aggregate) = &terminal else {
        panic!("expected aggregate terminal, got {terminal}");
    };
    assert_eq!(aggregate.first.calls[0].function_name, "echo");
    assert_eq!(
        aggregate.second.calls[0].result.as_deref(),
        Some("[ECHO] Hello world")
    );
}

#[tokio::test]
async fn streaming_text_passes_through_untouched() {
    let items = vec![
        StreamItem::Delta(MessageDelta::Text(TextDelta::new(Role::Assistant, "AB", "gpt"))),
        StreamItem::Delta(MessageDelta::Text(TextDelta::new(Role::Assistant, "CD", "gpt"))),
    ];
    let agent = MiddlewareAgent::new(ScriptedStreamAgent::new("gpt", items))
        .register_streaming_middleware(FunctionCallMiddleware::new(
            vec![echo_contract()],
            Some(echo_map()),
        ))
        .register_streaming_middleware(LoggingMiddleware::new());

    let stream = agent
        .generate_streaming_reply(&[], &GenerateOptions::default(), &CancellationToken::new())
        .await
        .unwrap();
    let reply = collect_reply(stream).await.unwrap();

    assert_eq!(reply.text(), "ABCD");
}

#[tokio::test]
async fn contracts_are_advertised_to_the_backend() {
    let backend = CaptureBackend::default();
    let captured = backend.last_request.clone();
    let agent = MiddlewareAgent::new(BackendAgent::new("gpt", Arc::new(backend)))
        .register_middleware(ChatContentConnector::new())
        .register_middleware(FunctionCallMiddleware::new(vec![echo_contract()], None));

    let history = vec![TextMessage::new(Role::User, "hi", "user").into()];
    let options = GenerateOptions::builder().temperature(0.25).build();
    agent
        .generate_reply(&history, &options, &CancellationToken::new())
        .await
        .unwrap();

    let request = captured.lock().unwrap().clone().expect("captured request");
    assert_eq!(request.temperature, Some(0.25));
    assert_eq!(request.functions.len(), 1);
    assert_eq!(request.functions[0].name, "echo");
    assert_eq!(request.functions[0].parameters["properties"]["message"]["type"], "string");
}

#[tokio::test]
async fn logging_middleware_does_not_alter_replies() {
    let agent = MiddlewareAgent::new(DefaultReplyAgent::new("gpt", "unchanged"))
        .register_middleware(LoggingMiddleware::new());

    let reply = agent.send(&[]).await.unwrap();
    assert_eq!(reply.text(), "unchanged");
    assert_eq!(reply.author(), "gpt");
}
