use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::Body as HttpBody;
use http_body::{Frame, SizeHint};
use http_body_util::BodyExt;
use http_body_util::combinators::BoxBody;

use crate::exchange::error::{BoxError, Error};

/// The message body carried by [`Request`](crate::Request) and [`Response`](crate::Response).
///
/// A body is either fully buffered in memory ([`Body::full`]) or a boxed
/// byte stream ([`Body::stream`]). Interceptors that only rewrite headers can
/// pass either kind through untouched; interceptors that need the payload
/// call [`Body::into_bytes`] and rebuild a buffered body from the result.
pub struct Body {
    inner: Kind,
}

enum Kind {
    Full(Option<Bytes>),
    Stream(BoxBody<Bytes, BoxError>),
}

impl Body {
    pub fn empty() -> Self {
        Self { inner: Kind::Full(None) }
    }

    pub fn full(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        if bytes.is_empty() { Self::empty() } else { Self { inner: Kind::Full(Some(bytes)) } }
    }

    pub fn stream<B>(body: B) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        Self { inner: Kind::Stream(BoxBody::new(body.map_err(Into::into))) }
    }

    /// Returns the buffered payload, or `None` for a streaming body.
    ///
    /// An empty buffered body yields an empty slice rather than `None`, so
    /// `None` always means "not buffered" and never "no bytes".
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.inner {
            Kind::Full(Some(bytes)) => Some(bytes.as_ref()),
            Kind::Full(None) => Some(&[]),
            Kind::Stream(_) => None,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(&self.inner, Kind::Full(_))
    }

    /// Drains the body into a single [`Bytes`].
    ///
    /// Buffered bodies return their payload without awaiting. Streaming
    /// bodies are collected chunk by chunk, and a failed read surfaces as a
    /// transport error.
    pub async fn into_bytes(self) -> Result<Bytes, Error> {
        match self.inner {
            Kind::Full(bytes) => Ok(bytes.unwrap_or_else(Bytes::new)),
            Kind::Stream(box_body) => {
                box_body.collect().await.map(|collected| collected.to_bytes()).map_err(Error::transport)
            }
        }
    }
}

impl From<()> for Body {
    fn from(_: ()) -> Self {
        Self::empty()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::full(bytes)
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Self::full(value)
    }
}

impl From<&'static str> for Body {
    fn from(value: &'static str) -> Self {
        Self::full(value)
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Self::full(value)
    }
}

impl HttpBody for Body {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let kind = &mut self.get_mut().inner;
        match kind {
            Kind::Full(option_bytes) if option_bytes.is_none() => Poll::Ready(None),
            Kind::Full(option_bytes) => Poll::Ready(Some(Ok(Frame::data(option_bytes.take().unwrap())))),
            Kind::Stream(box_body) => {
                let pin = Pin::new(box_body);
                pin.poll_frame(cx)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        let kind = &self.inner;
        match kind {
            Kind::Full(option_bytes) => option_bytes.is_none(),
            Kind::Stream(box_body) => box_body.is_end_stream(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        let kind = &self.inner;
        match kind {
            Kind::Full(None) => SizeHint::with_exact(0),
            Kind::Full(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            Kind::Stream(box_body) => box_body.size_hint(),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Kind::Full(None) => f.write_str("Body::empty"),
            Kind::Full(Some(bytes)) => write!(f, "Body::full({} bytes)", bytes.len()),
            Kind::Stream(_) => f.write_str("Body::stream"),
        }
    }
}
