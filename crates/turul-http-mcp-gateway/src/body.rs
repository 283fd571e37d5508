//! Response body types

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use http_body_util::{BodyExt, Empty, Full, combinators::UnsyncBoxBody};

use crate::lifecycle::ReleaseGuard;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body type of every gateway response
pub type GatewayBody = UnsyncBoxBody<Bytes, BoxError>;

pub(crate) fn full(bytes: impl Into<Bytes>) -> GatewayBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub(crate) fn empty() -> GatewayBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// A single-frame body that keeps its exchange's session and transport alive
///
/// The session and transport are released when the body is dropped, which
/// happens once the frame has been written or the client has gone away.
pub struct ExchangeBody {
    data: Option<Bytes>,
    _guard: ReleaseGuard,
}

impl ExchangeBody {
    pub(crate) fn new(data: impl Into<Bytes>, guard: ReleaseGuard) -> Self {
        Self {
            data: Some(data.into()),
            _guard: guard,
        }
    }
}

impl Body for ExchangeBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(self.data.take().map(|data| Ok(Frame::data(data))))
    }

    fn is_end_stream(&self) -> bool {
        self.data.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        let len = self.data.as_ref().map_or(0, |data| data.len() as u64);
        SizeHint::with_exact(len)
    }
}
