//! IPC message types for the command endpoint
//!
//! Simple JSON-over-newline protocol. Each message is a single line of JSON followed by `\n`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pipeline::{Command, ResponseEnvelope};

/// Requests from a client to the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Run one command through the pipeline
    Command {
        prompt: String,
        #[serde(default)]
        scene: Option<Value>,
    },

    /// Ping to check if the server is alive
    Ping,

    /// Request the server to stop, aborting in-flight commands
    Shutdown,
}

impl Request {
    pub fn command(prompt: impl Into<String>, scene: Option<Value>) -> Self {
        Request::Command {
            prompt: prompt.into(),
            scene,
        }
    }
}

impl From<Command> for Request {
    fn from(command: Command) -> Self {
        Request::Command {
            prompt: command.text,
            scene: command.scene,
        }
    }
}

/// Responses from the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Pipeline result
    Envelope { envelope: ResponseEnvelope },

    /// Pong response to ping
    Pong { version: String },

    /// Acknowledgment
    Ok,

    /// Error response
    Error { message: String },
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_serialize() {
        let msg = Request::command("add a platform", None);
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"Command","prompt":"add a platform","scene":null}"#);
    }

    #[test]
    fn test_command_deserialize_without_scene() {
        let json = r#"{"type":"Command","prompt":"hello"}"#;
        let msg: Request = serde_json::from_str(json).unwrap();
        assert_eq!(msg, Request::command("hello", None));
    }

    #[test]
    fn test_command_from_pipeline_command() {
        let scene = json!({"entities": []});
        let msg = Request::from(Command::new("move it", Some(scene.clone())));
        assert_eq!(msg, Request::command("move it", Some(scene)));
    }

    #[test]
    fn test_ping_serialize() {
        let json = serde_json::to_string(&Request::Ping).unwrap();
        assert_eq!(json, r#"{"type":"Ping"}"#);
    }

    #[test]
    fn test_shutdown_deserialize() {
        let msg: Request = serde_json::from_str(r#"{"type":"Shutdown"}"#).unwrap();
        assert_eq!(msg, Request::Shutdown);
    }

    #[test]
    fn test_envelope_response_nests_kind() {
        let response = Response::Envelope {
            envelope: ResponseEnvelope::text("done"),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["type"], "Envelope");
        assert_eq!(value["envelope"]["kind"], "text");
        assert_eq!(value["envelope"]["message"], "done");
    }

    #[test]
    fn test_error_response_roundtrip() {
        let response = Response::error("prompt is empty");
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"type":"Error","message":"prompt is empty"}"#);
        let back: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(back, response);
    }

    #[test]
    fn test_unknown_type_fails() {
        let result: Result<Request, _> = serde_json::from_str(r#"{"type":"Reload"}"#);
        assert!(result.is_err());
    }
}
