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
use bytes::Bytes;
use futures_util::stream;

use super::stream_adapter::BoxBodyStream;
use super::SharedFormData;

/// The closed set of request/response body representations, collapsing
/// Node-stream/Web-stream duck typing into a single `Stream` variant
/// (both normalize to the same `futures_core::Stream` on a server-side
/// Rust runtime).
pub enum BodySource {
    None,
    Text(String),
    UrlEncoded(Vec<(String, String)>),
    Bytes(Bytes),
    FormData(SharedFormData),
    Stream(BoxBodyStream),
    Other(String),
}

impl BodySource {
    /// The byte length this source would produce, when it is knowable
    /// without consuming it. Feeds `Content-Length` inference in §4.6.
    pub(crate) fn known_length(&self) -> Option<u64> {
        match self {
            Self::None => Some(0),
            Self::Text(text) => Some(text.len() as u64),
            Self::UrlEncoded(params) => Some(encode_urlencoded(params).len() as u64),
            Self::Bytes(bytes) => Some(bytes.len() as u64),
            Self::FormData(form) => form.known_length(),
            Self::Stream(_) => None,
            Self::Other(text) => Some(text.len() as u64),
        }
    }
}

pub(crate) fn encode_urlencoded(params: &[(String, String)]) -> String {
    let mut out = String::new();
    for (i, (key, value)) in params.iter().enumerate() {
        if i > 0 {
            out.push('&');
        }
        out.push_str(&url::form_urlencoded::byte_serialize(key.as_bytes()).collect::<String>());
        out.push('=');
        out.push_str(&url::form_urlencoded::byte_serialize(value.as_bytes()).collect::<String>());
    }
    out
}

/// Converts a [`BodySource`] into the single internal byte stream every
/// consumption path reads from. `url` is unused for every variant except
/// `Stream`, whose adapter (`stream_adapter::from_stream`) has already
/// attached the `"Invalid response body while trying to fetch {url}:
/// {err}"` wrapping at construction time, so it is accepted here only to
/// keep the call site uniform.
pub(crate) fn into_stream(source: BodySource, _url: &str) -> BoxBodyStream {
    match source {
        BodySource::None => Box::pin(stream::empty()),
        BodySource::Text(text) => Box::pin(stream::once(async move { Ok(Bytes::from(text)) })),
        BodySource::UrlEncoded(params) => {
            let encoded = encode_urlencoded(&params);
            Box::pin(stream::once(async move { Ok(Bytes::from(encoded)) }))
        }
        BodySource::Bytes(bytes) => Box::pin(stream::once(async move { Ok(bytes) })),
        BodySource::Other(text) => Box::pin(stream::once(async move { Ok(Bytes::from(text)) })),
        BodySource::FormData(form) => crate::multipart::encode(form),
        BodySource::Stream(stream) => stream,
    }
}
