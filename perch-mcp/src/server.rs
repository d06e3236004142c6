//! Stdio MCP server
//!
//! Reads one JSON-RPC message per line and writes one response per line.
//! Every `tools/call` runs as its own task with its own cancellation token,
//! so responses may be written in a different order than requests arrived.

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::protocol::{
    CallToolParams, CancelledParams, JsonRpcError, JsonRpcId, JsonRpcRequest, JsonRpcResponse,
    MCP_PROTOCOL_VERSION,
};
use crate::tools::{Dispatcher, catalog};

const SERVER_NAME: &str = "perch";

/// Cancellation tokens of the calls still running, by request id
///
/// Each registration gets its own generation so a call only ever removes its
/// own entry, even when a client reuses a request id.
#[derive(Default)]
struct InFlightCalls {
    next_generation: AtomicU64,
    calls: Mutex<HashMap<JsonRpcId, (u64, CancellationToken)>>,
}

impl InFlightCalls {
    fn calls(&self) -> MutexGuard<'_, HashMap<JsonRpcId, (u64, CancellationToken)>> {
        self.calls.lock().unwrap_or_else(|poisoned| {
            error!("In-flight call table was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Track a new call; returns its generation and cancellation token
    fn register(&self, id: &JsonRpcId) -> (u64, CancellationToken) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();

        if self
            .calls()
            .insert(id.clone(), (generation, cancel.clone()))
            .is_some()
        {
            warn!(id = ?id, "Request id reused while a call is still running");
        }
        (generation, cancel)
    }

    /// Forget a finished call unless its id now belongs to a newer one
    fn finish(&self, id: &JsonRpcId, generation: u64) {
        let mut calls = self.calls();
        if calls.get(id).is_some_and(|(current, _)| *current == generation) {
            calls.remove(id);
        }
    }

    fn token(&self, id: &JsonRpcId) -> Option<CancellationToken> {
        self.calls().get(id).map(|(_, token)| token.clone())
    }
}

pub struct Server {
    dispatcher: Arc<Dispatcher>,
    in_flight: Arc<InFlightCalls>,
}

impl Server {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            in_flight: Arc::new(InFlightCalls::default()),
        }
    }

    /// Serve until the reader reaches end of input
    ///
    /// Returns after every response, including those of calls still running
    /// at end of input, has been written.
    pub async fn serve<R, W>(self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<JsonRpcResponse>(64);
        let writer_task = tokio::spawn(write_responses(writer, rx));

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await.context("Failed to read request")? {
            if line.trim().is_empty() {
                continue;
            }
            self.handle_line(&line, &tx).await;
        }

        info!("Input closed, waiting for in-flight calls");
        drop(tx);
        writer_task.await.context("Response writer panicked")??;
        Ok(())
    }

    async fn handle_line(&self, line: &str, tx: &mpsc::Sender<JsonRpcResponse>) {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Malformed message");
                send(tx, JsonRpcResponse::error(None, JsonRpcError::parse_error(e.to_string()))).await;
                return;
            }
        };

        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                send(tx, JsonRpcResponse::error(None, JsonRpcError::invalid_request(e.to_string())))
                    .await;
                return;
            }
        };

        debug!(method = %request.method, id = ?request.id, "Received message");

        match request.method.as_str() {
            "notifications/initialized" => info!("Client initialized"),
            "notifications/cancelled" => self.cancel(request.params),
            "tools/call" => self.call_tool(request, tx).await,
            method => {
                let Some(id) = request.id else {
                    debug!(method, "Ignoring notification");
                    return;
                };
                let response = match method {
                    "initialize" => JsonRpcResponse::success(id, initialize_result()),
                    "ping" => JsonRpcResponse::success(id, json!({})),
                    "tools/list" => JsonRpcResponse::success(id, tools_list()),
                    _ => JsonRpcResponse::error(Some(id), JsonRpcError::method_not_found(method)),
                };
                send(tx, response).await;
            }
        }
    }

    /// Spawn a tool call; its response is sent when it finishes
    async fn call_tool(&self, request: JsonRpcRequest, tx: &mpsc::Sender<JsonRpcResponse>) {
        let Some(id) = request.id else {
            warn!("tools/call sent as a notification, ignoring");
            return;
        };

        let params: CallToolParams = match request
            .params
            .map(serde_json::from_value)
            .transpose()
        {
            Ok(Some(params)) => params,
            Ok(None) => {
                let error = JsonRpcError::invalid_params("missing params");
                send(tx, JsonRpcResponse::error(Some(id), error)).await;
                return;
            }
            Err(e) => {
                let error = JsonRpcError::invalid_params(e.to_string());
                send(tx, JsonRpcResponse::error(Some(id), error)).await;
                return;
            }
        };

        let (generation, cancel) = self.in_flight.register(&id);
        let dispatcher = self.dispatcher.clone();
        let in_flight = self.in_flight.clone();
        let tx = tx.clone();

        tokio::spawn(async move {
            let result = dispatcher
                .call(&params.name, params.arguments, &cancel)
                .await;

            in_flight.finish(&id, generation);

            let response = match serde_json::to_value(&result) {
                Ok(value) => JsonRpcResponse::success(id, value),
                Err(e) => JsonRpcResponse::error(Some(id), JsonRpcError::internal_error(e.to_string())),
            };
            send(&tx, response).await;
        });
    }

    fn cancel(&self, params: Option<Value>) {
        let Some(params) = params.and_then(|p| serde_json::from_value::<CancelledParams>(p).ok())
        else {
            warn!("Malformed cancellation notice");
            return;
        };

        match self.in_flight.token(&params.request_id) {
            Some(token) => {
                info!(id = ?params.request_id, reason = ?params.reason, "Cancelling tool call");
                token.cancel();
            }
            None => debug!(id = ?params.request_id, "Cancellation for unknown or finished call"),
        }
    }
}

async fn send(tx: &mpsc::Sender<JsonRpcResponse>, response: JsonRpcResponse) {
    if tx.send(response).await.is_err() {
        error!("Response writer is gone, dropping response");
    }
}

async fn write_responses<W>(mut writer: W, mut rx: mpsc::Receiver<JsonRpcResponse>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut frame = serde_json::to_vec(&response).context("Failed to serialize response")?;
        frame.push(b'\n');
        writer.write_all(&frame).await.context("Failed to write response")?;
        writer.flush().await.context("Failed to flush response")?;
    }
    Ok(())
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
    })
}

fn tools_list() -> Value {
    let tools: Vec<Value> = catalog().iter().map(|tool| tool.to_json()).collect();
    json!({ "tools": tools })
}
