//! Output rendering
//!
//! - agent mode: JSON Lines with schema version (v: 1) on stdout
//! - human mode: pretty JSON result on stdout, logs and errors on stderr

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::Error;

const SCHEMA_VERSION: u8 = 1;

/// Event wrapper with schema version
#[derive(Serialize)]
struct Event<T: Serialize> {
    v: u8,
    #[serde(rename = "type")]
    event_type: String,
    payload: T,
}

fn emit<T: Serialize>(event_type: &str, payload: T) {
    let event = Event {
        v: SCHEMA_VERSION,
        event_type: event_type.to_string(),
        payload,
    };
    match serde_json::to_string(&event) {
        Ok(line) => println!("{}", line),
        Err(e) => eprintln!("[ERROR] failed to encode {} event: {}", event_type, e),
    }
}

fn pretty<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("<unencodable result: {}>", e))
}

/// Output handler
pub struct Output {
    agent_mode: bool,
}

impl Output {
    pub fn new(agent_mode: bool) -> Self {
        Self { agent_mode }
    }

    /// Log message (stderr for human, JSON Lines for agent)
    pub fn log(&self, level: &str, message: &str) {
        if self.agent_mode {
            emit("log", json!({"level": level, "message": message}));
        } else {
            eprintln!("[{}] {}", level.to_uppercase(), message);
        }
    }

    /// Final result (always JSON to stdout)
    pub fn result<T: Serialize>(&self, data: T) {
        if self.agent_mode {
            emit("result", data);
        } else {
            println!("{}", pretty(&data));
        }
    }

    /// Render an error report and exit with its category's code
    pub fn error(&self, err: ErrorReport) -> ! {
        if self.agent_mode {
            emit("error", &err);
        } else {
            eprintln!("Error [{}][{}]: {}", err.cat, err.code, err.message);
            if let Some(details) = &err.details {
                eprintln!("  Details: {}", details);
            }
            if err.retryable {
                eprintln!("  Retryable: the provider may accept the same request later");
            }
            eprintln!("  Fix: {:?}", err.fix);
        }
        std::process::exit(err.exit_code);
    }
}

/// Structured error report
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub code: String,
    pub cat: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    pub retryable: bool,
    pub fix: Vec<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip)]
    pub exit_code: i32,
}

impl ErrorReport {
    /// Build a report from a command error, keeping the provider's message verbatim
    pub fn from_error(err: &Error) -> Self {
        use crate::provider::ErrorCategory::*;

        let category = err.category();
        let fix = match category {
            Config => vec!["config", "param"],
            Input => vec!["param"],
            Auth => vec!["auth"],
            Validation => vec!["param"],
            Transient => vec!["wait", "retry"],
            Protocol | Provider => vec!["report"],
            System => vec!["report"],
        };

        let mut details = serde_json::Map::new();
        if let Some(status) = err.status() {
            details.insert("status".into(), json!(status));
        }
        if !err.field_errors().is_empty() {
            details.insert("field_errors".into(), json!(err.field_errors()));
        }

        Self {
            code: err.error_code().to_string(),
            cat: category.as_str().to_string(),
            op: None,
            retryable: matches!(category, Transient),
            fix: fix.into_iter().map(String::from).collect(),
            message: err.to_string(),
            details: (!details.is_empty()).then_some(Value::Object(details)),
            exit_code: category.exit_code(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: &str) -> Self {
        self.op = Some(op.into());
        self
    }
}

/// Print manifest (--manifest)
pub fn print_manifest() {
    let manifest = json!({
        "schema_version": "1.0",
        "tool": {
            "name": "lambda",
            "display_name": "Lambda Cloud CLI",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "GPU instance lifecycle on Lambda Cloud"
        },
        "capabilities": {
            "agent": true,
            "interactive": false,
            "streaming": false,
            "resume": false
        },
        "actions": [
            {
                "id": "list-instance-types",
                "summary": "List instance types",
                "options": [
                    {"name": "available-only", "type": "bool", "default": false},
                    {"name": "region", "type": "string"}
                ]
            },
            {"id": "list-instances", "summary": "List running instances", "options": []},
            {
                "id": "get-instance",
                "summary": "Show one instance",
                "args": [{"name": "instance_id", "type": "string", "required": true}]
            },
            {"id": "list-filesystems", "summary": "List persistent filesystems", "options": []},
            {"id": "list-ssh-keys", "summary": "List SSH keys", "options": []},
            {
                "id": "add-ssh-key",
                "summary": "Upload or generate an SSH key",
                "options": [
                    {"name": "name", "type": "string", "required": true},
                    {"name": "public-key", "type": "path"},
                    {"name": "generate", "type": "bool", "default": false}
                ]
            },
            {
                "id": "delete-ssh-key",
                "summary": "Delete an SSH key by id",
                "args": [{"name": "ssh_key_id", "type": "string", "required": true}]
            },
            {
                "id": "launch-instance",
                "summary": "Launch a GPU instance",
                "options": [
                    {"name": "config", "type": "string"},
                    {"name": "region", "type": "string"},
                    {"name": "instance-type", "type": "string"},
                    {"name": "ssh-key", "type": "string"},
                    {"name": "filesystem", "type": "string"},
                    {"name": "name", "type": "string"},
                    {"name": "hostname", "type": "string"},
                    {"name": "tag", "type": "string", "repeatable": true},
                    {"name": "filesystem-mount", "type": "string", "repeatable": true},
                    {"name": "user-data-file", "type": "path"}
                ]
            },
            {
                "id": "terminate-instances",
                "summary": "Terminate instances by id",
                "args": [{"name": "instance_ids", "type": "string", "required": true, "repeatable": true}]
            }
        ],
        "permissions": {
            "network": true,
            "network_domains": ["cloud.lambda.ai"],
            "filesystem": {
                "read": ["$LAMBDA_PROJECT_DIR/.env", "$LAMBDA_CONFIG_DIR"]
            },
            "env_vars": [
                "LAMBDA_API_KEY",
                "LAMBDA_API_BASE_URL",
                "LAMBDA_API_USER_AGENT",
                "LAMBDA_CONFIG_DIR",
                "LAMBDA_PROJECT_DIR"
            ]
        },
        "exit_codes": {
            "1": "configuration or input error",
            "2": "provider error",
            "3": "authentication error",
            "4": "transient network/server error",
            "5": "validation error",
            "6": "unexpected provider response"
        }
    });

    println!("{}", pretty(&manifest));
}
