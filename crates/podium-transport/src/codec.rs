//! JSON frames exchanged with the XML-RPC bridge.
//!
//! The bridge sits next to the dedicated server and relays its XML-RPC
//! interface as JSON text frames:
//!
//! | Direction | Frame |
//! |-----------|-------|
//! | request   | `{"id": 7, "method": "GetVersion", "params": []}` |
//! | response  | `{"id": 7, "result": ...}` or `{"id": 7, "error": {"code": -1000, "message": "..."}}` |
//! | callback  | `{"method": "ManiaPlanet.PlayerConnect", "params": ["alice", false]}` |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use podium_core::{Notification, RpcError, RpcResult};

#[derive(Serialize)]
struct Request<'a> {
    id: u64,
    method: &'a str,
    params: &'a [Value],
}

#[derive(Deserialize)]
struct Fault {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct Incoming {
    id: Option<u64>,
    method: Option<String>,
    #[serde(default)]
    params: Vec<Value>,
    #[serde(default)]
    result: Value,
    error: Option<Fault>,
}

/// A decoded incoming frame.
#[derive(Debug, PartialEq)]
pub enum Frame {
    /// Answer to the request with the same id.
    Response { id: u64, reply: RpcResultFrame },
    /// Server-pushed callback.
    Callback(Notification),
}

/// Outcome carried by a response frame.
#[derive(Debug, PartialEq)]
pub enum RpcResultFrame {
    Ok(Value),
    Fault { code: i64, message: String },
}

impl RpcResultFrame {
    pub fn into_result(self) -> RpcResult<Value> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Fault { code, message } => Err(RpcError::Fault { code, message }),
        }
    }
}

/// Encodes a request frame.
pub fn encode_request(id: u64, method: &str, params: &[Value]) -> serde_json::Result<String> {
    serde_json::to_string(&Request { id, method, params })
}

/// Decodes an incoming text frame.
///
/// Frames with an `id` are responses; frames with a `method` and no `id` are
/// callbacks. Anything else is rejected.
pub fn decode(text: &str) -> Result<Frame, String> {
    let incoming: Incoming = serde_json::from_str(text).map_err(|e| e.to_string())?;
    match (incoming.id, incoming.method) {
        (Some(id), _) => {
            let reply = match incoming.error {
                Some(fault) => RpcResultFrame::Fault {
                    code: fault.code,
                    message: fault.message,
                },
                None => RpcResultFrame::Ok(incoming.result),
            };
            Ok(Frame::Response { id, reply })
        }
        (None, Some(method)) => Ok(Frame::Callback(Notification::new(method, incoming.params))),
        (None, None) => Err("frame has neither id nor method".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_encode_request() {
        let text = encode_request(3, "ChooseNextMap", &[json!("a.Map.Gbx")]).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({ "id": 3, "method": "ChooseNextMap", "params": ["a.Map.Gbx"] })
        );
    }

    #[test]
    fn test_decode_response() {
        assert_eq!(
            decode(r#"{"id": 1, "result": {"Name": "ManiaPlanet"}}"#).unwrap(),
            Frame::Response {
                id: 1,
                reply: RpcResultFrame::Ok(json!({ "Name": "ManiaPlanet" })),
            }
        );
        // A void method answers without a result.
        assert_eq!(
            decode(r#"{"id": 2}"#).unwrap(),
            Frame::Response {
                id: 2,
                reply: RpcResultFrame::Ok(Value::Null),
            }
        );
    }

    #[test]
    fn test_decode_fault() {
        let frame = decode(r#"{"id": 4, "error": {"code": -1000, "message": "Login unknown."}}"#)
            .unwrap();
        let Frame::Response { id, reply } = frame else {
            panic!("expected a response");
        };
        assert_eq!(id, 4);
        assert!(matches!(
            reply.into_result(),
            Err(RpcError::Fault { code: -1000, message }) if message == "Login unknown."
        ));
    }

    #[test]
    fn test_decode_callback() {
        assert_eq!(
            decode(r#"{"method": "ManiaPlanet.PlayerConnect", "params": ["alice", false]}"#)
                .unwrap(),
            Frame::Callback(Notification::new(
                "ManiaPlanet.PlayerConnect",
                vec![json!("alice"), json!(false)],
            ))
        );
        assert_eq!(
            decode(r#"{"method": "ManiaPlanet.BeginMatch"}"#).unwrap(),
            Frame::Callback(Notification::new("ManiaPlanet.BeginMatch", vec![]))
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("not json").is_err());
        assert!(decode(r#"{"params": []}"#).is_err());
    }
}
