//! Outbound half of the stdio connection: serializes writes from concurrent
//! tool workers and correlates server-initiated requests with host responses.

use crate::mcp::types::{
    mcp_log_level_name, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JSONRPC_VERSION,
};
use crate::sampling::{CreateMessageRequest, CreateMessageResult, Sampler};
use crate::shared::logging::{LogEvent, LogLevel, LogSink};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

pub const SAMPLING_METHOD: &str = "sampling/createMessage";
pub const LOG_NOTIFICATION_METHOD: &str = "notifications/message";

#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("failed to encode {method} message: {source}")]
    Encode {
        method: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write to host: {source}")]
    Write {
        #[source]
        source: std::io::Error,
    },
    #[error("host connection closed before `{method}` completed")]
    Disconnected { method: String },
    #[error("host did not answer `{method}` within {timeout_ms}ms")]
    TimedOut { method: String, timeout_ms: u64 },
    #[error("host rejected `{method}` with code {code}: {message}")]
    Rejected {
        method: String,
        code: i32,
        message: String,
    },
    #[error("host returned a malformed `{method}` result: {source}")]
    MalformedResult {
        method: String,
        #[source]
        source: serde_json::Error,
    },
}

type PendingReply = Sender<Result<Value, JsonRpcError>>;

pub struct McpPeer {
    writer: Mutex<Box<dyn Write + Send>>,
    pending: Mutex<HashMap<u64, PendingReply>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    request_timeout: Duration,
    host_log_level: Mutex<Option<LogLevel>>,
}

impl std::fmt::Debug for McpPeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpPeer")
            .field("next_id", &self.next_id)
            .field("closed", &self.closed)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl McpPeer {
    pub fn new(writer: impl Write + Send + 'static, request_timeout: Duration) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            request_timeout,
            host_log_level: Mutex::new(None),
        }
    }

    /// Writes one message as a single line. Concurrent callers never interleave.
    pub fn send<T: Serialize>(&self, message: &T) -> Result<(), PeerError> {
        let line = serde_json::to_string(message).map_err(|source| PeerError::Encode {
            method: "outbound".to_string(),
            source,
        })?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{line}").map_err(|source| PeerError::Write { source })?;
        writer.flush().map_err(|source| PeerError::Write { source })
    }

    pub fn notify(&self, method: &str, params: Value) -> Result<(), PeerError> {
        self.send(&JsonRpcNotification {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
        })
    }

    /// Sends a request to the host and blocks until the matching response,
    /// the configured timeout, or the connection closing.
    pub fn request(&self, method: &str, params: Value) -> Result<Value, PeerError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PeerError::Disconnected {
                method: method.to_string(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (reply_tx, reply_rx) = mpsc::channel();
        self.pending_map().insert(id, reply_tx);

        let sent = self.send(&JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: json!(id),
            method,
            params,
        });
        if let Err(err) = sent {
            self.pending_map().remove(&id);
            return Err(err);
        }

        match reply_rx.recv_timeout(self.request_timeout) {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(error)) => Err(PeerError::Rejected {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            }),
            Err(RecvTimeoutError::Timeout) => {
                self.pending_map().remove(&id);
                Err(PeerError::TimedOut {
                    method: method.to_string(),
                    timeout_ms: self.request_timeout.as_millis() as u64,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(PeerError::Disconnected {
                method: method.to_string(),
            }),
        }
    }

    /// Routes a host response to the waiting request. Returns `false` when no
    /// request with that id is outstanding.
    pub fn resolve(&self, id: &Value, outcome: Result<Value, JsonRpcError>) -> bool {
        let Some(key) = id.as_u64() else {
            return false;
        };
        let Some(reply_tx) = self.pending_map().remove(&key) else {
            return false;
        };
        reply_tx.send(outcome).is_ok()
    }

    /// Fails every outstanding request and rejects new ones.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.pending_map().clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn pending_requests(&self) -> usize {
        self.pending_map().len()
    }

    pub fn set_host_log_level(&self, level: LogLevel) {
        *self
            .host_log_level
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(level);
    }

    pub fn host_log_level(&self) -> Option<LogLevel> {
        *self
            .host_log_level
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn pending_map(&self) -> std::sync::MutexGuard<'_, HashMap<u64, PendingReply>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Sampler for McpPeer {
    type Error = PeerError;

    fn create_message(
        &self,
        request: &CreateMessageRequest,
    ) -> Result<CreateMessageResult, Self::Error> {
        let params = serde_json::to_value(request).map_err(|source| PeerError::Encode {
            method: SAMPLING_METHOD.to_string(),
            source,
        })?;
        let result = self.request(SAMPLING_METHOD, params)?;
        serde_json::from_value(result).map_err(|source| PeerError::MalformedResult {
            method: SAMPLING_METHOD.to_string(),
            source,
        })
    }
}

/// Forwards log events to the host as `notifications/message` once the host
/// has opted in through `logging/setLevel`.
#[derive(Debug, Clone)]
pub struct HostLogSink {
    peer: Arc<McpPeer>,
    logger_name: &'static str,
}

impl HostLogSink {
    pub fn new(peer: Arc<McpPeer>, logger_name: &'static str) -> Self {
        Self { peer, logger_name }
    }
}

impl LogSink for HostLogSink {
    fn emit(&self, event: &LogEvent) {
        let Some(threshold) = self.peer.host_log_level() else {
            return;
        };
        if event.level < threshold || self.peer.is_closed() {
            return;
        }
        let _ = self.peer.notify(
            LOG_NOTIFICATION_METHOD,
            json!({
                "level": mcp_log_level_name(event.level),
                "logger": self.logger_name,
                "data": event.to_json(),
            }),
        );
    }
}
