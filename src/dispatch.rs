//! Per-request dispatch
//!
//! Resolves a request locally or through the remote endpoint and writes the
//! response line, unless the request is a notification.

use std::sync::Arc;

use serde_json::Value;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};
use tracing::{debug, error};

use crate::errors::RelayError;
use crate::mcp::{local::handle_local, rpc::request_id};
use crate::remote::RemoteEndpoint;

/// Shared output stream; one response line is written per lock acquisition.
pub struct Output<W> {
    writer: Arc<Mutex<W>>,
}

impl<W> Clone for Output<W> {
    fn clone(&self) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
        }
    }
}

impl<W> Output<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    pub async fn write_message(&self, message: &Value) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await
    }

    pub fn into_inner(self) -> Option<W> {
        Arc::try_unwrap(self.writer).ok().map(Mutex::into_inner)
    }
}

pub struct Dispatcher<W> {
    remote: Arc<dyn RemoteEndpoint>,
    output: Output<W>,
}

impl<W> Clone for Dispatcher<W> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            output: self.output.clone(),
        }
    }
}

impl<W> Dispatcher<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(remote: Arc<dyn RemoteEndpoint>, output: Output<W>) -> Self {
        Self { remote, output }
    }

    pub fn output(&self) -> &Output<W> {
        &self.output
    }

    pub async fn dispatch(&self, request: Value) {
        let id = request_id(&request);

        let response = match self.resolve(&request).await {
            Ok(response) => response,
            Err(err) => {
                error!(error = %err, "dispatch failed");
                err.into_json_rpc(id.clone())
            }
        };

        if id.is_none() {
            let method = request.get("method").and_then(Value::as_str).unwrap_or("");
            debug!(method, "notification handled, no response sent");
            return;
        }

        if let Err(err) = self.output.write_message(&response).await {
            error!(error = %err, "failed to write response");
        }
    }

    async fn resolve(&self, request: &Value) -> Result<Value, RelayError> {
        if !request.is_object() {
            return Err(RelayError::internal("request must be a JSON object"));
        }

        if let Some(response) = handle_local(request) {
            return Ok(response);
        }

        let response = self.remote.forward(request).await;
        if !response.is_object() {
            return Err(RelayError::internal("remote response is not a JSON object"));
        }
        Ok(response)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    /// Echoes the request back as a result after an optional delay taken from
    /// `params.delay_ms`, counting every call.
    #[derive(Default)]
    pub(crate) struct EchoRemote {
        pub(crate) calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteEndpoint for EchoRemote {
        async fn forward(&self, request: &Value) -> Value {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay_ms = request["params"]["delay_ms"].as_u64().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            crate::mcp::rpc::normalize_response(
                json!({"method": request["method"]}),
                request_id(request).as_ref(),
            )
        }
    }

    pub(crate) fn lines(output: Output<Vec<u8>>) -> Vec<Value> {
        let bytes = output.into_inner().expect("sole output owner");
        String::from_utf8(bytes)
            .expect("utf-8 output")
            .lines()
            .map(|line| serde_json::from_str(line).expect("valid json line"))
            .collect()
    }

    fn dispatcher(remote: Arc<EchoRemote>) -> Dispatcher<Vec<u8>> {
        Dispatcher::new(remote, Output::new(Vec::new()))
    }

    #[tokio::test]
    async fn local_methods_skip_the_remote() {
        let remote = Arc::new(EchoRemote::default());
        let dispatcher = dispatcher(remote.clone());

        dispatcher
            .dispatch(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}))
            .await;

        assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
        let output = dispatcher.output().clone();
        drop(dispatcher);
        let responses = lines(output);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["result"]["protocolVersion"], json!("2025-03-26"));
    }

    #[tokio::test]
    async fn other_methods_are_forwarded() {
        let remote = Arc::new(EchoRemote::default());
        let dispatcher = dispatcher(remote.clone());

        dispatcher
            .dispatch(json!({"jsonrpc": "2.0", "id": "a", "method": "tools/list"}))
            .await;

        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
        let output = dispatcher.output().clone();
        drop(dispatcher);
        assert_eq!(
            lines(output),
            vec![json!({"jsonrpc": "2.0", "id": "a", "result": {"method": "tools/list"}})]
        );
    }

    #[tokio::test]
    async fn notifications_produce_no_output() {
        let remote = Arc::new(EchoRemote::default());
        let dispatcher = dispatcher(remote.clone());

        dispatcher
            .dispatch(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await;
        dispatcher
            .dispatch(json!({"jsonrpc": "2.0", "id": null, "method": "initialize"}))
            .await;

        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
        let output = dispatcher.output().clone();
        drop(dispatcher);
        assert!(lines(output).is_empty());
    }

    #[tokio::test]
    async fn zero_and_empty_ids_still_get_responses() {
        let dispatcher = dispatcher(Arc::new(EchoRemote::default()));

        dispatcher
            .dispatch(json!({"jsonrpc": "2.0", "id": 0, "method": "tools/list"}))
            .await;
        dispatcher
            .dispatch(json!({"jsonrpc": "2.0", "id": "", "method": "resources/list"}))
            .await;

        let output = dispatcher.output().clone();
        drop(dispatcher);
        let responses = lines(output);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], json!(0));
        assert_eq!(responses[1]["id"], json!(""));
    }

    #[tokio::test]
    async fn non_object_requests_are_not_answered() {
        let remote = Arc::new(EchoRemote::default());
        let dispatcher = dispatcher(remote.clone());

        dispatcher.dispatch(json!([1, 2, 3])).await;

        assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
        let output = dispatcher.output().clone();
        drop(dispatcher);
        assert!(lines(output).is_empty());
    }

    struct ScalarRemote;

    #[async_trait]
    impl RemoteEndpoint for ScalarRemote {
        async fn forward(&self, _request: &Value) -> Value {
            json!("not a response")
        }
    }

    #[tokio::test]
    async fn malformed_remote_result_becomes_internal_error() {
        let dispatcher = Dispatcher::new(Arc::new(ScalarRemote), Output::new(Vec::new()));

        dispatcher
            .dispatch(json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call"}))
            .await;

        let output = dispatcher.output().clone();
        drop(dispatcher);
        let responses = lines(output);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], json!(5));
        assert_eq!(responses[0]["error"]["code"], json!(-32603));
        assert_eq!(
            responses[0]["error"]["data"],
            json!("remote response is not a JSON object")
        );
    }
}
