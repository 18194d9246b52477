//! Payload input shapes and stream normalization.
//!
//! The facade accepts three payload shapes: an in-memory byte buffer, a text
//! value, or a lazy byte stream. All three normalize to a [`ByteStream`]
//! before reaching a provider, so the backend code only ever deals with one
//! input shape.

use depot_error::{DepotResult, StorageError, StorageErrorKind};
use futures::stream::{self, Stream};
use std::pin::Pin;

/// Lazy sequence of byte chunks flowing into or out of a storage backend.
pub type ByteStream = Pin<Box<dyn Stream<Item = DepotResult<Vec<u8>>> + Send>>;

/// Accepted payload shapes for a store operation.
pub enum Payload {
    /// Raw bytes already in memory.
    Buffer(Vec<u8>),
    /// Text content, stored as its UTF-8 bytes.
    Text(String),
    /// Lazy byte sequence of unknown total size.
    Stream(ByteStream),
}

impl Payload {
    /// Coerce a loosely typed JSON value into a payload.
    ///
    /// This is the boundary for hosts handing in untyped values: strings,
    /// numbers and booleans coerce to their text rendering, `null` fails with
    /// [`StorageErrorKind::EmptyPayload`], and arrays/objects fail with
    /// [`StorageErrorKind::UnsupportedPayloadType`].
    pub fn from_json(value: serde_json::Value) -> DepotResult<Self> {
        match value {
            serde_json::Value::String(s) => Ok(Payload::Text(s)),
            serde_json::Value::Number(n) => Ok(Payload::Text(n.to_string())),
            serde_json::Value::Bool(b) => Ok(Payload::Text(b.to_string())),
            serde_json::Value::Null => {
                Err(StorageError::new(StorageErrorKind::EmptyPayload).into())
            }
            serde_json::Value::Array(_) => Err(StorageError::new(
                StorageErrorKind::UnsupportedPayloadType("array".to_string()),
            )
            .into()),
            serde_json::Value::Object(_) => Err(StorageError::new(
                StorageErrorKind::UnsupportedPayloadType("object".to_string()),
            )
            .into()),
        }
    }

    /// Normalize to a byte stream.
    ///
    /// Buffers and text become a single-chunk stream; a stream passes through
    /// unchanged. Zero-length buffers are valid and yield one empty chunk.
    pub fn into_stream(self) -> ByteStream {
        match self {
            Payload::Buffer(bytes) => Box::pin(stream::once(async move { Ok(bytes) })),
            Payload::Text(text) => Box::pin(stream::once(async move { Ok(text.into_bytes()) })),
            Payload::Stream(stream) => stream,
        }
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Buffer(bytes) => f.debug_tuple("Buffer").field(&bytes.len()).finish(),
            Payload::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            Payload::Stream(_) => f.debug_tuple("Stream").finish(),
        }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Buffer(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Buffer(bytes.to_vec())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_error::DepotErrorKind;
    use futures::StreamExt;

    async fn drain(stream: ByteStream) -> Vec<u8> {
        let chunks: Vec<_> = stream.collect().await;
        chunks
            .into_iter()
            .flat_map(|chunk| chunk.unwrap())
            .collect()
    }

    #[tokio::test]
    async fn buffer_normalizes_to_single_chunk() {
        let payload = Payload::from(vec![1u8, 2, 3]);
        assert_eq!(drain(payload.into_stream()).await, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn text_normalizes_to_utf8_bytes() {
        let payload = Payload::from("hi");
        assert_eq!(drain(payload.into_stream()).await, b"hi".to_vec());
    }

    #[tokio::test]
    async fn stream_passes_through() {
        let chunks = vec![Ok(b"ab".to_vec()), Ok(b"cd".to_vec())];
        let payload = Payload::Stream(Box::pin(futures::stream::iter(chunks)));
        assert_eq!(drain(payload.into_stream()).await, b"abcd".to_vec());
    }

    #[test]
    fn json_number_coerces_to_text() {
        let payload = Payload::from_json(serde_json::json!(42)).unwrap();
        assert!(matches!(payload, Payload::Text(ref t) if t == "42"));
    }

    #[test]
    fn json_null_is_empty_payload() {
        let err = Payload::from_json(serde_json::Value::Null).unwrap_err();
        assert!(matches!(
            err.kind(),
            DepotErrorKind::Storage(e) if e.kind == depot_error::StorageErrorKind::EmptyPayload
        ));
    }

    #[test]
    fn json_object_is_unsupported() {
        let err = Payload::from_json(serde_json::json!({"a": 1})).unwrap_err();
        assert!(matches!(
            err.kind(),
            DepotErrorKind::Storage(e)
                if matches!(e.kind, depot_error::StorageErrorKind::UnsupportedPayloadType(_))
        ));
    }
}
