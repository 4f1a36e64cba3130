//! The response body type every handler returns.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use http_body_util::Full;

/// A cargohold HTTP response body: either a fully buffered byte payload or
/// nothing at all. Every output type is built in memory before a response
/// is returned, so no streaming body variant is needed.
#[derive(Debug, Default)]
pub enum S3ResponseBody {
    /// A non-empty buffered payload (an XML document or raw object bytes).
    Buffered(Full<Bytes>),
    /// No body (204 No Content, HEAD responses, empty error bodies).
    #[default]
    Empty,
}

impl S3ResponseBody {
    /// Build a body from already-encoded bytes.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(bytes.into()))
    }

    /// An empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }
}

impl Body for S3ResponseBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full).poll_frame(cx).map_err(|never| match never {}),
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Empty => SizeHint::with_exact(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    #[tokio::test]
    async fn test_should_report_empty_body_as_end_stream() {
        let body = S3ResponseBody::empty();
        assert!(body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(0));
    }

    #[tokio::test]
    async fn test_should_collect_buffered_bytes() {
        let body = S3ResponseBody::from_bytes(Bytes::from_static(b"hello"));
        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected.as_ref(), b"hello");
    }
}
