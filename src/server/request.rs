use crate::dispatcher::RawRequest;
use may_minihttp::Request;
use std::io::{self, Read};
use tracing::debug;

/// Convert a wire request into a [`RawRequest`].
///
/// At most `max_body_bytes + 1` body bytes are read so the dispatcher can
/// still tell that a body was oversized without buffering all of it.
///
/// # Errors
///
/// I/O failure while reading the body.
pub fn read_request(req: Request, max_body_bytes: usize) -> io::Result<RawRequest> {
    let method = req.method().to_string();
    let target = req.path().to_string();
    let headers: Vec<(String, String)> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).into_owned(),
            )
        })
        .collect();

    let limit = u64::try_from(max_body_bytes)
        .unwrap_or(u64::MAX)
        .saturating_add(1);
    let mut body = Vec::new();
    req.body().take(limit).read_to_end(&mut body)?;

    debug!(
        method = %method,
        target = %target,
        header_count = headers.len(),
        body_size_bytes = body.len(),
        "Request received"
    );

    Ok(RawRequest {
        method,
        target,
        headers,
        body,
    })
}
