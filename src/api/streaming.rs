use futures::stream::{self, Stream, StreamExt};
use tokio::time::{timeout, Duration};

use crate::api::models::{ChatChunk, ChatFragment};
use crate::error::{Result, VoxChatError};

/// Parse an NDJSON `/api/chat` response body into a stream of fragments.
///
/// Chunks arriving from the network may split a line anywhere, so bytes are
/// buffered until a complete line is available. A per-chunk inactivity
/// timeout bounds how long the stream may go silent.
pub fn parse_chat_stream(
    response: reqwest::Response,
    timeout_secs: u64,
) -> impl Stream<Item = Result<ChatFragment>> {
    let byte_stream = response.bytes_stream();
    let chunk_timeout = Duration::from_secs(timeout_secs);

    stream::unfold(
        (byte_stream, String::new(), false),
        move |(mut byte_stream, mut buffer, finished)| async move {
            if finished {
                return None;
            }

            loop {
                // Drain complete lines before pulling more bytes.
                if let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    if line.is_empty() {
                        continue;
                    }

                    match parse_chunk_line(&line) {
                        Ok(Some(fragment)) => {
                            let done = fragment.done;
                            return Some((Ok(fragment), (byte_stream, buffer, done)));
                        }
                        Ok(None) => continue,
                        Err(e) => return Some((Err(e), (byte_stream, buffer, true))),
                    }
                }

                match timeout(chunk_timeout, byte_stream.next()).await {
                    Ok(Some(Ok(chunk))) => {
                        buffer.push_str(&String::from_utf8_lossy(&chunk));
                    }
                    Ok(Some(Err(e))) => {
                        return Some((
                            Err(VoxChatError::NetworkError(e)),
                            (byte_stream, buffer, true),
                        ));
                    }
                    Ok(None) => {
                        // Stream ended; a final line may lack its newline.
                        let rest = buffer.trim().to_string();
                        buffer.clear();
                        if rest.is_empty() {
                            return None;
                        }
                        return match parse_chunk_line(&rest) {
                            Ok(Some(fragment)) => Some((Ok(fragment), (byte_stream, buffer, true))),
                            Ok(None) => None,
                            Err(e) => Some((Err(e), (byte_stream, buffer, true))),
                        };
                    }
                    Err(_) => {
                        return Some((Err(VoxChatError::Timeout), (byte_stream, buffer, true)));
                    }
                }
            }
        },
    )
}

/// Parse one NDJSON line. Returns `Ok(None)` for fragments carrying neither
/// text nor tool calls nor the terminal marker.
fn parse_chunk_line(line: &str) -> Result<Option<ChatFragment>> {
    let chunk: ChatChunk = serde_json::from_str(line)?;

    if let Some(error) = chunk.error {
        return Err(VoxChatError::Other(format!("inference error: {}", error)));
    }

    let mut fragment = ChatFragment {
        done: chunk.done,
        ..Default::default()
    };

    if let Some(message) = chunk.message {
        if let Some(content) = message.content {
            if !content.is_empty() {
                fragment.text = Some(content);
            }
        }
        if let Some(tool_calls) = message.tool_calls {
            fragment.tool_calls = tool_calls;
        }
    }

    if fragment.text.is_none() && fragment.tool_calls.is_empty() && !fragment.done {
        return Ok(None);
    }

    Ok(Some(fragment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_fragment() {
        let line = r#"{"model":"m","message":{"role":"assistant","content":"Hel"},"done":false}"#;
        let fragment = parse_chunk_line(line).unwrap().unwrap();
        assert_eq!(fragment.text.as_deref(), Some("Hel"));
        assert!(fragment.tool_calls.is_empty());
        assert!(!fragment.done);
    }

    #[test]
    fn parses_tool_call_fragment() {
        let line = r#"{"message":{"role":"assistant","content":"","tool_calls":[{"function":{"name":"add","arguments":{"a":2,"b":2}}}]},"done":false}"#;
        let fragment = parse_chunk_line(line).unwrap().unwrap();
        assert!(fragment.text.is_none());
        assert_eq!(fragment.tool_calls.len(), 1);
        assert_eq!(fragment.tool_calls[0].function.name, "add");
    }

    #[test]
    fn parses_terminal_fragment() {
        let line = r#"{"message":{"role":"assistant","content":""},"done":true}"#;
        let fragment = parse_chunk_line(line).unwrap().unwrap();
        assert!(fragment.done);
    }

    #[test]
    fn empty_delta_is_skipped() {
        let line = r#"{"message":{"role":"assistant","content":""},"done":false}"#;
        assert!(parse_chunk_line(line).unwrap().is_none());
    }

    #[test]
    fn error_line_becomes_error() {
        let line = r#"{"error":"model not found"}"#;
        let err = parse_chunk_line(line).unwrap_err();
        assert!(err.to_string().contains("model not found"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_chunk_line("{not json").is_err());
    }
}
