//! MCP stdio server
//!
//! Reads JSON-RPC messages line by line and dispatches them. `tools/call` runs
//! on a worker thread so the reader keeps routing sampling responses back to
//! the workflow that is waiting on them.

use crate::config::ServerSettings;
use crate::mcp::peer::{HostLogSink, McpPeer};
use crate::mcp::tools::{self, ToolCallError};
use crate::mcp::types::{
    parse_mcp_log_level, IncomingMessage, JsonRpcError, JsonRpcResponse, ToolCallParams,
    INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND,
};
use crate::sampling::Sampler;
use crate::shared::logging::{FileLogSink, Logger, StderrLogSink};
use crate::verification::{SamplingStepRunner, StepRunner, WorkflowEngine};
use serde_json::{json, Value};
use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const SERVER_NAME: &str = "vf-reasoning-expert";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PROTOCOL_VERSION: &str = "2025-06-18";

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to read from host: {source}")]
    Read {
        #[source]
        source: io::Error,
    },
}

pub struct McpServer<R> {
    peer: Arc<McpPeer>,
    engine: Arc<WorkflowEngine<R>>,
    logger: Logger,
    workers: Vec<JoinHandle<()>>,
}

impl<R: StepRunner + 'static> McpServer<R> {
    pub fn new(peer: Arc<McpPeer>, engine: WorkflowEngine<R>, logger: Logger) -> Self {
        Self {
            peer,
            engine: Arc::new(engine),
            logger,
            workers: Vec::new(),
        }
    }

    /// Serves until the host closes the input stream. Outstanding sampling
    /// requests fail once input ends, so in-flight workflows finish with the
    /// history they have.
    pub fn run<I: BufRead>(mut self, input: I) -> Result<(), ServerError> {
        self.logger
            .info("vf.server.started", "vf workflow server is live", &[]);
        let mut outcome = Ok(());
        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(source) => {
                    outcome = Err(ServerError::Read { source });
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            self.handle_line(&line);
            self.workers.retain(|worker| !worker.is_finished());
        }

        self.peer.close();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        self.logger
            .info("vf.server.stopped", "host input closed; server stopped", &[]);
        outcome
    }

    fn handle_line(&mut self, line: &str) {
        let message = match IncomingMessage::parse(line) {
            Ok(message) => message,
            Err(error) => {
                self.logger.warn(
                    "vf.server.bad_message",
                    "discarding malformed message",
                    &[("error", json!(error.message))],
                );
                self.reply(JsonRpcResponse::error(Value::Null, error));
                return;
            }
        };

        match message {
            IncomingMessage::Request { id, method, params } => {
                self.handle_request(id, &method, params)
            }
            IncomingMessage::Notification { method, .. } => self.logger.debug(
                "vf.server.notification",
                "received host notification",
                &[("method", json!(method))],
            ),
            IncomingMessage::Response { id, outcome } => {
                if !self.peer.resolve(&id, outcome) {
                    self.logger.warn(
                        "vf.server.orphan_response",
                        "response does not match an outstanding request",
                        &[("id", id)],
                    );
                }
            }
        }
    }

    fn handle_request(&mut self, id: Value, method: &str, params: Value) {
        let response = match method {
            "initialize" => self.handle_initialize(id, &params),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(
                id,
                json!({ "tools": tools::list_tools(self.engine.settings()) }),
            ),
            "logging/setLevel" => self.handle_set_level(id, &params),
            "tools/call" => {
                self.spawn_tool_call(id, params);
                return;
            }
            _ => JsonRpcResponse::error(
                id,
                JsonRpcError::new(METHOD_NOT_FOUND, format!("Unknown method: {method}")),
            ),
        };
        self.reply(response);
    }

    fn handle_initialize(&self, id: Value, params: &Value) -> JsonRpcResponse {
        let supports_sampling = params
            .get("capabilities")
            .and_then(|capabilities| capabilities.get("sampling"))
            .is_some();
        if !supports_sampling {
            self.logger.warn(
                "vf.server.no_sampling",
                "host did not declare the sampling capability; workflow steps will fail",
                &[],
            );
        }
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {},
                    "logging": {}
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": SERVER_VERSION
                }
            }),
        )
    }

    fn handle_set_level(&self, id: Value, params: &Value) -> JsonRpcResponse {
        let level = params
            .get("level")
            .and_then(Value::as_str)
            .and_then(parse_mcp_log_level);
        match level {
            Some(level) => {
                self.peer.set_host_log_level(level);
                JsonRpcResponse::success(id, json!({}))
            }
            None => JsonRpcResponse::error(
                id,
                JsonRpcError::new(INVALID_PARAMS, "unsupported logging level"),
            ),
        }
    }

    fn spawn_tool_call(&mut self, id: Value, params: Value) {
        let engine = Arc::clone(&self.engine);
        let peer = Arc::clone(&self.peer);
        let logger = self.logger.clone();
        self.workers.push(thread::spawn(move || {
            let response = match serde_json::from_value::<ToolCallParams>(params) {
                Ok(call) => tool_call_response(id, tools::call_tool(&*engine, &call)),
                Err(err) => {
                    JsonRpcResponse::error(id, JsonRpcError::new(INVALID_PARAMS, err.to_string()))
                }
            };
            if let Err(err) = peer.send(&response) {
                logger.error(
                    "vf.server.write_failed",
                    "failed to write tool response",
                    &[("error", json!(err.to_string()))],
                );
            }
        }));
    }

    fn reply(&self, response: JsonRpcResponse) {
        if let Err(err) = self.peer.send(&response) {
            self.logger.error(
                "vf.server.write_failed",
                "failed to write response",
                &[("error", json!(err.to_string()))],
            );
        }
    }
}

fn tool_call_response(
    id: Value,
    outcome: Result<crate::mcp::types::ToolResult, ToolCallError>,
) -> JsonRpcResponse {
    match outcome {
        Ok(result) => match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(err) => JsonRpcResponse::error(
                id,
                JsonRpcError::new(INTERNAL_ERROR, format!("failed to encode tool result: {err}")),
            ),
        },
        Err(err @ (ToolCallError::UnknownTool(_) | ToolCallError::InvalidArguments(_))) => {
            JsonRpcResponse::error(id, JsonRpcError::new(INVALID_PARAMS, err.to_string()))
        }
        Err(err @ ToolCallError::Failed(_)) => {
            JsonRpcResponse::error(id, JsonRpcError::new(INTERNAL_ERROR, err.to_string()))
        }
    }
}

/// Logger for the server process: stderr, the optional log file, and the host
/// once it opts in to log notifications.
pub fn build_server_logger(settings: &ServerSettings, peer: &Arc<McpPeer>) -> Logger {
    let mut logger = Logger::new(settings.logging.level)
        .with_sink(Arc::new(StderrLogSink))
        .with_sink(Arc::new(HostLogSink::new(Arc::clone(peer), SERVER_NAME)));
    if let Some(path) = &settings.logging.file {
        logger = logger.with_sink(Arc::new(FileLogSink::new(path.clone())));
    }
    logger
}

pub fn build_workflow_engine<S: Sampler>(
    sampler: S,
    settings: &ServerSettings,
    logger: Logger,
) -> WorkflowEngine<SamplingStepRunner<S>> {
    WorkflowEngine::new(SamplingStepRunner::new(sampler, settings.sampling.clone()))
        .with_settings(settings.workflow.clone())
        .with_logger(logger)
}

/// Runs the server over the given streams with sampling routed back through
/// the same connection.
pub fn serve<I, W>(settings: &ServerSettings, input: I, output: W) -> Result<(), ServerError>
where
    I: BufRead,
    W: io::Write + Send + 'static,
{
    let peer = Arc::new(McpPeer::new(
        output,
        Duration::from_secs(settings.sampling.timeout_seconds),
    ));
    let logger = build_server_logger(settings, &peer);
    let engine = build_workflow_engine(Arc::clone(&peer), settings, logger.clone());
    McpServer::new(peer, engine, logger).run(input)
}

pub fn serve_stdio(settings: &ServerSettings) -> Result<(), ServerError> {
    serve(settings, io::stdin().lock(), io::stdout())
}
