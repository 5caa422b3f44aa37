//! Size-bounded body reading.

use futures::StreamExt;
use log::debug;

use crate::error_handling::{categorize_reqwest_error, ClassifiedError, ErrorKind};

/// A body read under a byte ceiling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LimitedBody {
    pub bytes: Vec<u8>,
    /// The body was longer than the ceiling and was cut at exactly the ceiling
    pub truncated: bool,
}

/// Streams `response` into memory, never holding more than `max_bytes`.
///
/// With `allow_truncation` the body is cut at exactly `max_bytes` and the rest
/// of the stream is dropped. Without it a declared `Content-Length` above the
/// ceiling fails before any byte is read, and a stream that crosses the ceiling
/// fails with `size_exceeded` before the excess is buffered.
///
/// # Errors
///
/// `size_exceeded`, or the categorized transport error when the stream breaks.
pub async fn read_body_limited(
    response: reqwest::Response,
    max_bytes: usize,
    allow_truncation: bool,
) -> Result<LimitedBody, ClassifiedError> {
    if !allow_truncation {
        if let Some(declared) = response.content_length() {
            if declared > max_bytes as u64 {
                return Err(ClassifiedError::new(
                    ErrorKind::SizeExceeded,
                    format!("declared Content-Length {declared} exceeds {max_bytes} bytes"),
                ));
            }
        }
    }

    let url = response.url().clone();
    let mut stream = response.bytes_stream();
    let mut buf = Vec::with_capacity(max_bytes.min(16 * 1024));
    let mut truncated = false;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| categorize_reqwest_error(&e))?;
        let remaining = max_bytes - buf.len();

        if chunk.len() > remaining {
            if !allow_truncation {
                debug!(
                    "Body of {} exceeds {} bytes (aborting at {} bytes)",
                    url,
                    max_bytes,
                    buf.len() + chunk.len()
                );
                return Err(ClassifiedError::new(
                    ErrorKind::SizeExceeded,
                    format!("response body exceeds {max_bytes} bytes"),
                ));
            }
            buf.extend_from_slice(&chunk[..remaining]);
            truncated = true;
            debug!("Body of {} truncated at {} bytes", url, max_bytes);
            break;
        }

        buf.extend_from_slice(&chunk);
    }

    Ok(LimitedBody {
        bytes: buf,
        truncated,
    })
}
