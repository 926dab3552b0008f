use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use vf_reasoning_expert::config::ServerSettings;
use vf_reasoning_expert::mcp::{serve, ServerError, ITER_VF_TOOL_NAME, PROTOCOL_VERSION};
use vf_reasoning_expert::shared::logging::LogLevel;

struct HostHarness {
    writer: UnixStream,
    reader: BufReader<UnixStream>,
    server: JoinHandle<Result<(), ServerError>>,
}

impl HostHarness {
    fn start(settings: ServerSettings) -> Self {
        let (server_side, host_side) = UnixStream::pair().expect("socket pair");
        host_side
            .set_read_timeout(Some(Duration::from_secs(10)))
            .expect("read timeout");
        let server_input = BufReader::new(server_side.try_clone().expect("clone server side"));
        let server = thread::spawn(move || serve(&settings, server_input, server_side));
        Self {
            writer: host_side.try_clone().expect("clone host side"),
            reader: BufReader::new(host_side),
            server,
        }
    }

    fn send(&mut self, message: Value) {
        self.send_raw(&message.to_string());
    }

    fn send_raw(&mut self, line: &str) {
        writeln!(self.writer, "{line}").expect("write to server");
        self.writer.flush().expect("flush");
    }

    fn read(&mut self) -> Value {
        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read from server");
        assert!(!line.is_empty(), "server closed the stream");
        serde_json::from_str(&line).expect("server emitted json")
    }

    fn finish(self) -> Result<(), ServerError> {
        self.writer.shutdown(Shutdown::Write).expect("close host input");
        self.server.join().expect("server thread")
    }
}

fn quiet_settings() -> ServerSettings {
    let mut settings = ServerSettings::default();
    settings.logging.level = LogLevel::Error;
    settings
}

fn initialize(host: &mut HostHarness) {
    host.send(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "sampling": {} },
            "clientInfo": { "name": "harness", "version": "0.0.0" }
        }
    }));
    let response = host.read();
    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
    assert_eq!(response["result"]["serverInfo"]["name"], "vf-reasoning-expert");
    assert!(response["result"]["capabilities"]["tools"].is_object());
    host.send(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }));
}

fn sampling_reply(id: &Value, answer: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "role": "assistant",
            "model": "host-model",
            "stopReason": "endTurn",
            "content": {
                "type": "text",
                "text": json!({
                    "is_a_prime_correct": false,
                    "verification_critique": "2+2 is 4",
                    "newly_generated_answer": answer
                }).to_string()
            }
        }
    })
}

#[test]
fn mcp_server_module_lists_the_workflow_tool() {
    let mut host = HostHarness::start(quiet_settings());
    initialize(&mut host);

    host.send(json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }));
    let response = host.read();
    let tools = response["result"]["tools"].as_array().expect("tools");
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], ITER_VF_TOOL_NAME);
    assert_eq!(tools[0]["inputSchema"]["required"], json!(["problem_q"]));
    assert!(tools[0]["outputSchema"]["properties"]["history"].is_object());

    host.send(json!({ "jsonrpc": "2.0", "id": 3, "method": "ping" }));
    assert_eq!(host.read()["result"], json!({}));

    host.finish().expect("clean shutdown");
}

#[test]
fn mcp_server_module_runs_the_workflow_through_host_sampling() {
    let mut host = HostHarness::start(quiet_settings());
    initialize(&mut host);

    host.send(json!({
        "jsonrpc": "2.0",
        "id": "call-1",
        "method": "tools/call",
        "params": {
            "name": ITER_VF_TOOL_NAME,
            "arguments": {
                "problem_q": "Compute 2+2",
                "max_iterations": 2,
                "initial_answer_a0": "5"
            }
        }
    }));

    let first = host.read();
    assert_eq!(first["method"], "sampling/createMessage");
    assert_eq!(first["params"]["maxTokens"], 900);
    assert_eq!(first["params"]["modelPreferences"]["hints"][0]["name"], "claude");
    let prompt = first["params"]["messages"][0]["content"]["text"]
        .as_str()
        .expect("prompt text");
    assert!(prompt.contains("Candidate Answer (A'): 5"));
    host.send(sampling_reply(&first["id"], "4"));

    let second = host.read();
    assert_eq!(second["method"], "sampling/createMessage");
    assert_ne!(second["id"], first["id"]);
    host.send(json!({
        "jsonrpc": "2.0",
        "id": second["id"],
        "error": { "code": -1, "message": "user declined sampling" }
    }));

    let response = host.read();
    assert_eq!(response["id"], "call-1");
    let structured = &response["result"]["structuredContent"];
    assert_eq!(structured["total_steps"], 1);
    assert_eq!(structured["final_answer"], "4");
    assert_eq!(structured["history"][0]["verified_candidate"], "5");
    assert_eq!(structured["history"][0]["step_index"], 1);
    let text = response["result"]["content"][0]["text"]
        .as_str()
        .expect("text content");
    let from_text: Value = serde_json::from_str(text).expect("text is json");
    assert_eq!(&from_text, structured);

    host.finish().expect("clean shutdown");
}

#[test]
fn mcp_server_module_reports_protocol_errors() {
    let mut host = HostHarness::start(quiet_settings());
    initialize(&mut host);

    host.send_raw("{this is not json");
    let parse_error = host.read();
    assert_eq!(parse_error["id"], Value::Null);
    assert_eq!(parse_error["error"]["code"], -32700);

    host.send(json!({ "jsonrpc": "2.0", "id": 5, "method": "resources/list" }));
    assert_eq!(host.read()["error"]["code"], -32601);

    host.send(json!({
        "jsonrpc": "2.0",
        "id": 6,
        "method": "tools/call",
        "params": { "name": ITER_VF_TOOL_NAME, "arguments": { "problem_q": "" } }
    }));
    let invalid = host.read();
    assert_eq!(invalid["id"], 6);
    assert_eq!(invalid["error"]["code"], -32602);

    host.send(json!({
        "jsonrpc": "2.0",
        "id": 7,
        "method": "tools/call",
        "params": { "name": "other_tool", "arguments": {} }
    }));
    assert_eq!(host.read()["error"]["code"], -32602);

    host.send(json!({
        "jsonrpc": "2.0",
        "id": 8,
        "method": "logging/setLevel",
        "params": { "level": "loud" }
    }));
    assert_eq!(host.read()["error"]["code"], -32602);

    host.finish().expect("clean shutdown");
}

#[test]
fn mcp_server_module_finishes_pending_workflows_when_input_closes() {
    let mut host = HostHarness::start(quiet_settings());
    initialize(&mut host);

    host.send(json!({
        "jsonrpc": "2.0",
        "id": 9,
        "method": "tools/call",
        "params": {
            "name": ITER_VF_TOOL_NAME,
            "arguments": { "problem_q": "Compute 2+2", "initial_answer_a0": "5" }
        }
    }));
    let request = host.read();
    assert_eq!(request["method"], "sampling/createMessage");

    host.writer
        .shutdown(Shutdown::Write)
        .expect("close host input");
    let response = host.read();
    assert_eq!(response["id"], 9);
    assert_eq!(response["result"]["structuredContent"]["total_steps"], 0);
    assert_eq!(response["result"]["structuredContent"]["final_answer"], "5");

    host.server
        .join()
        .expect("server thread")
        .expect("clean shutdown");
}

#[test]
fn mcp_server_module_forwards_logs_after_set_level() {
    let mut settings = quiet_settings();
    settings.logging.level = LogLevel::Warn;
    let mut host = HostHarness::start(settings);
    initialize(&mut host);

    host.send(json!({
        "jsonrpc": "2.0",
        "id": 10,
        "method": "logging/setLevel",
        "params": { "level": "warning" }
    }));
    assert_eq!(host.read()["result"], json!({}));

    host.send(json!({
        "jsonrpc": "2.0",
        "id": 11,
        "method": "tools/call",
        "params": {
            "name": ITER_VF_TOOL_NAME,
            "arguments": { "problem_q": "Q", "max_iterations": 1, "initial_answer_a0": "" }
        }
    }));

    let notice = host.read();
    assert_eq!(notice["method"], "notifications/message");
    assert_eq!(notice["params"]["level"], "warning");
    assert_eq!(notice["params"]["data"]["event"], "vf.workflow.fallback_seed");

    let request = host.read();
    assert_eq!(request["method"], "sampling/createMessage");
    host.send(sampling_reply(&request["id"], "4"));
    let response = host.read();
    assert_eq!(response["id"], 11);
    assert_eq!(
        response["result"]["structuredContent"]["history"][0]["verified_candidate"],
        "1"
    );

    host.finish().expect("clean shutdown");
}
