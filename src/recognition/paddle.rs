//! Client for a local PaddleOCR service listening on a Unix socket.
//!
//! Both directions use the same framing: an 8-byte big-endian length followed
//! by that many payload bytes. The request payload is the PNG, the reply is
//! JSON.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::UnixStream,
};

use super::{ProviderError, RecognitionProvider, RecognitionResult};

/// Upper bound for a reply; anything larger is treated as corrupt framing.
const MAX_REPLY_BYTES: u64 = 64 * 1024 * 1024;

pub struct PaddleProvider {
    socket_path: PathBuf,
}

impl PaddleProvider {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl RecognitionProvider for PaddleProvider {
    fn name(&self) -> &'static str {
        "PaddleOCR"
    }

    async fn recognize(&self, png: &[u8]) -> Result<Vec<RecognitionResult>, ProviderError> {
        let mut stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
            ProviderError::Unavailable(format!(
                "cannot connect to {} ({}); is the OCR server running?",
                self.socket_path.display(),
                e
            ))
        })?;

        write_frame(&mut stream, png).await?;
        let reply = read_frame(&mut stream).await?;
        if reply.is_empty() {
            log::debug!("PaddleOCR returned an empty reply");
            return Ok(Vec::new());
        }
        parse_reply(&reply)
    }
}

pub(crate) async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), ProviderError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&(payload.len() as u64).to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

pub(crate) async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, ProviderError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 8];
    reader.read_exact(&mut header).await?;
    let len = u64::from_be_bytes(header);
    if len > MAX_REPLY_BYTES {
        return Err(ProviderError::MalformedResponse(format!(
            "reply length {} exceeds limit",
            len
        )));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

#[derive(Deserialize)]
struct PaddleResult {
    #[serde(default)]
    rec_texts: Vec<String>,
    #[serde(default)]
    dt_polys: Option<Vec<Vec<[f64; 2]>>>,
    #[serde(default)]
    rec_polys: Option<Vec<Vec<[f64; 2]>>>,
}

/// Parses the service's JSON reply, unwrapping an optional `res` object.
pub(crate) fn parse_reply(bytes: &[u8]) -> Result<Vec<RecognitionResult>, ProviderError> {
    let mut root: Value = serde_json::from_slice(bytes)
        .map_err(|e| ProviderError::MalformedResponse(format!("invalid JSON: {}", e)))?;
    if let Some(inner) = root.get_mut("res").map(Value::take) {
        root = inner;
    }
    if let Some(message) = root.get("error").and_then(Value::as_str) {
        return Err(ProviderError::Engine(message.to_string()));
    }
    let parsed: PaddleResult = serde_json::from_value(root)
        .map_err(|e| ProviderError::MalformedResponse(format!("unexpected shape: {}", e)))?;

    let polys = parsed.dt_polys.or(parsed.rec_polys).unwrap_or_default();
    let results = parsed
        .rec_texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| match polys.get(i).and_then(|p| bounding_box(p)) {
            Some((x, y, w, h)) => RecognitionResult::new(text, x, y, w, h),
            None => RecognitionResult::text_only(text),
        })
        .collect();
    Ok(results)
}

fn bounding_box(points: &[[f64; 2]]) -> Option<(f64, f64, f64, f64)> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first[0], first[1], first[0], first[1]);
    for [x, y] in points.iter().skip(1) {
        min_x = min_x.min(*x);
        min_y = min_y.min(*y);
        max_x = max_x.max(*x);
        max_y = max_y.max(*y);
    }
    Some((min_x, min_y, max_x - min_x, max_y - min_y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_res_and_reduces_polygons() {
        let json = br#"{"res": {"rec_texts": ["Total", "42"],
            "dt_polys": [[[10, 5], [60, 6], [61, 25], [9, 24]], [[70, 5], [90, 5], [90, 25], [70, 25]]]}}"#;
        let results = parse_reply(json).unwrap();
        assert_eq!(
            results,
            vec![
                RecognitionResult::new("Total", 9.0, 5.0, 52.0, 20.0),
                RecognitionResult::new("42", 70.0, 5.0, 20.0, 20.0),
            ]
        );
    }

    #[test]
    fn falls_back_to_rec_polys_and_zero_boxes() {
        let json = br#"{"rec_texts": ["a", "b"], "rec_polys": [[[1, 2], [3, 2], [3, 4], [1, 4]]]}"#;
        let results = parse_reply(json).unwrap();
        assert_eq!(results[0], RecognitionResult::new("a", 1.0, 2.0, 2.0, 2.0));
        assert_eq!(results[1], RecognitionResult::text_only("b"));
        assert!(!results[1].has_box());
    }

    #[test]
    fn service_error_reply_is_a_failure() {
        let err = parse_reply(br#"{"error": "No se pudo decodificar la imagen"}"#).unwrap_err();
        assert!(
            matches!(&err, ProviderError::Engine(msg) if msg == "No se pudo decodificar la imagen")
        );

        let nested = parse_reply(br#"{"res": {"error": "model not loaded"}}"#).unwrap_err();
        assert!(matches!(nested, ProviderError::Engine(_)));
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(matches!(
            parse_reply(b"not json"),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn frames_are_length_prefixed_big_endian() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"abc").await.unwrap();
        assert_eq!(&wire[..8], &[0, 0, 0, 0, 0, 0, 0, 3]);
        assert_eq!(&wire[8..], b"abc");

        let mut reader = wire.as_slice();
        assert_eq!(read_frame(&mut reader).await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn unreachable_socket_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let provider = PaddleProvider::new(dir.path().join("missing.sock"));
        let err = provider.recognize(b"png").await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }
}
