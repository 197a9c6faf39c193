//! JSON-lines request loop over stdio.
//!
//! One request per line:
//! `{"id": 1, "operation": "execute_command", "arguments": {"command": "ls"}}`
//! and one response per line:
//! `{"id": 1, "content": [{"type": "text", "text": "..."}], "is_error": false}`.
//! The pseudo-operation `list_operations` returns the operation catalog.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::dispatcher::{OperationDispatcher, OperationReply};
use crate::operations::Operation;

pub const LIST_OPERATIONS: &str = "list_operations";

#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Value,
    pub operation: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub id: Value,
    pub content: Vec<ContentBlock>,
    pub is_error: bool,
}

impl Response {
    pub fn text(id: Value, text: impl Into<String>, is_error: bool) -> Self {
        Self {
            id,
            content: vec![ContentBlock {
                kind: "text".to_string(),
                text: text.into(),
            }],
            is_error,
        }
    }

    fn from_reply(id: Value, reply: OperationReply) -> Self {
        Self::text(id, reply.text, reply.is_error)
    }
}

/// Handles one raw line. Malformed input yields an error response, never a failure.
pub async fn handle_line(dispatcher: &OperationDispatcher, line: &str) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!("Malformed request: {}", e);
            let id = serde_json::from_str::<Value>(line)
                .ok()
                .and_then(|value| value.get("id").cloned())
                .unwrap_or(Value::Null);
            return Response::text(id, format!("Error: Malformed request: {}", e), true);
        }
    };

    if request.operation.trim() == LIST_OPERATIONS {
        return match serde_json::to_string_pretty(&Operation::catalog()) {
            Ok(catalog) => Response::text(request.id, catalog, false),
            Err(e) => Response::text(request.id, format!("Error: {}", e), true),
        };
    }

    let reply = dispatcher
        .dispatch(&request.operation, request.arguments)
        .await;
    Response::from_reply(request.id, reply)
}

/// Serves requests until the reader reaches EOF.
///
/// Lines are decoded lossily: invalid UTF-8 bytes become U+FFFD instead of ending the loop.
pub async fn serve<R, W>(
    dispatcher: &OperationDispatcher,
    mut reader: R,
    mut writer: W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("Serving JSON-lines requests on stdio");
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let line = String::from_utf8_lossy(&buf);
        if line.trim().is_empty() {
            continue;
        }
        debug!("Request line: {} bytes", buf.len());

        let response = handle_line(dispatcher, &line).await;
        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        writer.write_all(&encoded).await?;
        writer.flush().await?;
    }

    info!("Input closed, shutting down");
    Ok(())
}
