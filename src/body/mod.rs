// Copyright 2020 Adam Reichold
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// 	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
mod source;
mod stream_adapter;
mod tee;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::time::Duration;

use crate::error::FetchError;
use crate::multipart::FormData;

pub use source::BodySource;
pub use stream_adapter::{from_stream, BoxBodyStream};
use tee::tee;

/// A single-use, lazily-materialized request or response payload.
///
/// Each accessor consumes the body exactly once, after which every
/// further accessor call fails with `type-error`.
pub struct Body {
    source: Mutex<Option<BodySource>>,
    disturbed: AtomicBool,
    url: String,
    size_cap: Option<u64>,
    timeout_ms: u64,
}

impl Body {
    pub fn new(source: BodySource, url: impl Into<String>) -> Self {
        Self {
            source: Mutex::new(Some(source)),
            disturbed: AtomicBool::new(false),
            url: url.into(),
            size_cap: None,
            timeout_ms: 0,
        }
    }

    pub fn empty(url: impl Into<String>) -> Self {
        Self::new(BodySource::None, url)
    }

    pub fn with_size_cap(mut self, size_cap: Option<u64>) -> Self {
        self.size_cap = size_cap;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn is_disturbed(&self) -> bool {
        self.disturbed.load(Ordering::SeqCst)
    }

    /// Inspects the source's shape and, where §4.6 needs it, its encoded
    /// length, without disturbing the body. Used only by content
    /// negotiation before the request is dispatched.
    pub(crate) async fn peek_source(&self) -> Option<(BodySourceKind, Option<u64>)> {
        let guard = self.source.lock().await;
        let source = guard.as_ref()?;
        Some((BodySourceKind::of(source), source.known_length()))
    }

    /// Returns the boundary token of a `FormData` source, if that is
    /// what this body holds. Used by content negotiation to build the
    /// `multipart/form-data;boundary=...` header without consuming the
    /// body.
    pub(crate) async fn form_data_boundary(&self) -> Option<String> {
        let guard = self.source.lock().await;
        match guard.as_ref()? {
            BodySource::FormData(form) => Some(form.boundary().to_owned()),
            _ => None,
        }
    }

    /// Takes the source out for the transport driver to send over the
    /// wire, returning the byte stream to transmit plus a replay copy of
    /// the source. [`BodyReplay::Stream`] tags a body that was sent as a
    /// live stream, which `redirect::decide` must refuse to resend on a
    /// non-idempotent method rather than silently treating it as bodyless.
    ///
    /// This does not set the disturbed flag: only the public accessors
    /// (`text`, `json`, ...) do that, not the implicit wire transmission
    /// of a request body.
    pub(crate) async fn take_for_transport(&self, url: &str) -> (BoxBodyStream, BodyReplay) {
        let mut guard = self.source.lock().await;
        let source = guard.take().unwrap_or(BodySource::None);

        let replay = match &source {
            BodySource::Stream(_) => BodyReplay::Stream,
            BodySource::None => BodyReplay::Replayable(BodySource::None),
            BodySource::Text(text) => BodyReplay::Replayable(BodySource::Text(text.clone())),
            BodySource::UrlEncoded(params) => {
                BodyReplay::Replayable(BodySource::UrlEncoded(params.clone()))
            }
            BodySource::Bytes(bytes) => BodyReplay::Replayable(BodySource::Bytes(bytes.clone())),
            BodySource::FormData(form) => {
                BodyReplay::Replayable(BodySource::FormData(form.clone()))
            }
            BodySource::Other(text) => BodyReplay::Replayable(BodySource::Other(text.clone())),
        };

        let stream = source::into_stream(source, url);
        (stream, replay)
    }

    /// Splits this body into two independent bodies, neither of which is
    /// disturbed by consuming the other. Fails if already disturbed.
    ///
    /// Per §4.5, materialized sources are shared by reference (each
    /// accessor derives a fresh stream from the same source) while
    /// stream-shaped sources are split via [`tee::tee`]. `FormData`
    /// bodies are a documented exception: both clones alias the same
    /// `Arc<FormData>`.
    pub async fn try_clone(&self) -> Result<Body, FetchError> {
        if self.is_disturbed() {
            return Err(FetchError::type_error(
                "cannot clone body after it is used",
            ));
        }

        let mut guard = self.source.lock().await;
        let source = guard
            .take()
            .expect("source present while not disturbed");

        let (mine, theirs) = match source {
            BodySource::Stream(stream) => {
                let (a, b) = tee(stream);
                (BodySource::Stream(a), BodySource::Stream(b))
            }
            BodySource::None => (BodySource::None, BodySource::None),
            BodySource::Text(text) => (BodySource::Text(text.clone()), BodySource::Text(text)),
            BodySource::UrlEncoded(params) => (
                BodySource::UrlEncoded(params.clone()),
                BodySource::UrlEncoded(params),
            ),
            BodySource::Bytes(bytes) => {
                (BodySource::Bytes(bytes.clone()), BodySource::Bytes(bytes))
            }
            BodySource::FormData(form) => {
                (BodySource::FormData(form.clone()), BodySource::FormData(form))
            }
            BodySource::Other(text) => (BodySource::Other(text.clone()), BodySource::Other(text)),
        };

        *guard = Some(mine);

        Ok(Body {
            source: Mutex::new(Some(theirs)),
            disturbed: AtomicBool::new(false),
            url: self.url.clone(),
            size_cap: self.size_cap,
            timeout_ms: self.timeout_ms,
        })
    }

    async fn consume(&self) -> Result<Bytes, FetchError> {
        if self.disturbed.swap(true, Ordering::SeqCst) {
            return Err(FetchError::type_error("body used already"));
        }

        let source = self
            .source
            .lock()
            .await
            .take()
            .expect("source present on first consumption");

        let mut stream = source::into_stream(source, &self.url);

        let read = async {
            let mut buf = BytesMut::new();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                if let Some(cap) = self.size_cap {
                    if buf.len() as u64 + chunk.len() as u64 > cap {
                        return Err(FetchError::max_size());
                    }
                }
                buf.extend_from_slice(&chunk);
            }
            Ok(buf.freeze())
        };

        if self.timeout_ms > 0 {
            match tokio::time::timeout(Duration::from_millis(self.timeout_ms), read).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::body_timeout()),
            }
        } else {
            read.await
        }
    }

    pub async fn array_buffer(&self) -> Result<Bytes, FetchError> {
        self.consume().await
    }

    pub async fn buffer(&self) -> Result<Bytes, FetchError> {
        self.consume().await
    }

    pub async fn text(&self) -> Result<String, FetchError> {
        let bytes = self.consume().await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|err| FetchError::system_with_cause("body is not valid UTF-8", err))
    }

    #[cfg(feature = "json")]
    pub async fn json<T>(&self) -> Result<T, FetchError>
    where
        T: serde::de::DeserializeOwned,
    {
        let bytes = self.consume().await?;
        serde_json::from_slice(&bytes).map_err(FetchError::invalid_json)
    }

    pub async fn blob(&self, content_type: Option<&str>) -> Result<Blob, FetchError> {
        let bytes = self.consume().await?;
        Ok(Blob {
            data: bytes,
            content_type: content_type.map(|s| s.to_ascii_lowercase()).unwrap_or_default(),
        })
    }

    pub async fn form_data(&self, content_type: Option<&str>) -> Result<FormData, FetchError> {
        let content_type = content_type.ok_or_else(|| {
            FetchError::type_error(
                "content-type header must be multipart/form-data or application/x-www-form-urlencoded",
            )
        })?;

        if let Some(boundary) = crate::multipart::boundary_of(content_type) {
            let bytes = self.consume().await?;
            crate::multipart::decode_multipart(bytes, &boundary).await
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let bytes = self.consume().await?;
            crate::multipart::decode_urlencoded(&bytes)
        } else {
            Err(FetchError::type_error(
                "content-type header must be multipart/form-data or application/x-www-form-urlencoded",
            ))
        }
    }
}

/// Bytes plus a MIME type, the Rust-native stand-in for the Web `Blob`.
#[derive(Debug, Clone)]
pub struct Blob {
    data: Bytes,
    content_type: String,
}

impl Blob {
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Lightweight classification used by content negotiation (§4.6), which
/// must know the *shape* of a body without consuming it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodySourceKind {
    None,
    Text,
    UrlEncoded,
    Bytes,
    FormData,
    Stream,
    Other,
}

impl BodySourceKind {
    fn of(source: &BodySource) -> Self {
        match source {
            BodySource::None => Self::None,
            BodySource::Text(_) => Self::Text,
            BodySource::UrlEncoded(_) => Self::UrlEncoded,
            BodySource::Bytes(_) => Self::Bytes,
            BodySource::FormData(_) => Self::FormData,
            BodySource::Stream(_) => Self::Stream,
            BodySource::Other(_) => Self::Other,
        }
    }
}

pub(crate) type SharedFormData = Arc<FormData>;

/// The body a redirect re-dispatch would carry, as handed from
/// [`Body::take_for_transport`] to `redirect::decide`.
///
/// `Stream` is kept distinct from a replayable `BodySource::None`/etc. so
/// the redirect matrix can tell "no body" apart from "a body that was
/// already drained onto the wire and cannot be sent again".
pub(crate) enum BodyReplay {
    Replayable(BodySource),
    Stream,
}
