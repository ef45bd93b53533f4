use std::fmt::Display;

use futures::stream::{self, Stream, StreamExt};

use crate::error::{AppError, Result};

/// Splits a chunked response body into lines, tolerating lines split across chunks.
///
/// Trailing `\r` is removed. A transport error ends the stream after being yielded.
pub fn lines<S, B, E>(body: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    stream::unfold(
        (body, Vec::<u8>::new(), false),
        |(mut body, mut buf, mut done)| async move {
            loop {
                if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    let text = String::from_utf8_lossy(&line)
                        .trim_end_matches(['\r', '\n'])
                        .to_string();
                    return Some((Ok(text), (body, buf, done)));
                }

                if done {
                    if buf.is_empty() {
                        return None;
                    }
                    let text = String::from_utf8_lossy(&buf).trim_end().to_string();
                    buf.clear();
                    return Some((Ok(text), (body, buf, done)));
                }

                match body.next().await {
                    Some(Ok(chunk)) => buf.extend_from_slice(chunk.as_ref()),
                    Some(Err(e)) => {
                        buf.clear();
                        return Some((Err(AppError::Llm(e.to_string())), (body, buf, true)));
                    }
                    None => done = true,
                }
            }
        },
    )
}

/// Payload of a Server-Sent Events `data:` line.
pub fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}
