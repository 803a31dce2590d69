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
use std::sync::Arc;

use url::Url;

use crate::body::{Body, BodySource};
use crate::error::FetchError;
use crate::headers::Headers;
use crate::multipart::FormData;
use crate::transport::Agent;

/// Redirect handling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    Follow,
    Manual,
    Error,
}

/// An immutable request descriptor: absolute URL, method, headers, and
/// body-source, plus the per-fetch knobs (`redirect`, `follow`,
/// `compress`, `timeout`, `size`, `agent`) and the hop counter the
/// redirect state machine increments as it re-dispatches.
///
/// The body is a closed `BodySource` tag set rather than a generic
/// writer type, since its shape must be introspectable for content
/// negotiation and redirect replay decisions without a trait object per
/// source kind.
pub struct Request {
    pub(crate) url: Url,
    pub(crate) method: http::Method,
    pub(crate) headers: Headers,
    pub(crate) body: Body,
    pub(crate) redirect: RedirectMode,
    pub(crate) follow: u32,
    pub(crate) hop_counter: u32,
    pub(crate) compress: bool,
    pub(crate) timeout_ms: u64,
    pub(crate) max_response_bytes: u64,
    pub(crate) agent: Option<Arc<dyn Agent>>,
}

impl Request {
    pub fn new(url: impl AsRef<str>, init: RequestInit) -> Result<Self, FetchError> {
        let url = crate::url::validate(url.as_ref())?;

        let method = init.method.unwrap_or(http::Method::GET);
        if (method == http::Method::GET || method == http::Method::HEAD)
            && !matches!(&init.body, BodySource::None)
        {
            return Err(FetchError::type_error(
                "Request with GET/HEAD method cannot have body",
            ));
        }

        let headers = init.headers.unwrap_or_default();
        let body = Body::new(init.body, url.as_str())
            .with_size_cap(if init.max_response_bytes == 0 {
                None
            } else {
                Some(init.max_response_bytes)
            })
            .with_timeout_ms(init.timeout_ms);

        // Content negotiation (§4.6) runs later, in `fetch`'s pipeline,
        // since it needs to run again on every redirect re-dispatch.

        Ok(Self {
            url,
            method,
            headers,
            body,
            redirect: init.redirect,
            follow: init.follow,
            hop_counter: 0,
            compress: init.compress,
            timeout_ms: init.timeout_ms,
            max_response_bytes: init.max_response_bytes,
            agent: init.agent,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> &http::Method {
        &self.method
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn redirect(&self) -> RedirectMode {
        self.redirect
    }

    pub fn follow(&self) -> u32 {
        self.follow
    }

    pub fn compress(&self) -> bool {
        self.compress
    }

    pub fn counter(&self) -> u32 {
        self.hop_counter
    }

    pub fn body_used(&self) -> bool {
        self.body.is_disturbed()
    }
}

/// Builder-style options for [`Request::new`] / [`crate::fetch`].
/// Defaults: `follow` 20, `compress` true, `timeout`/`size` disabled (0).
pub struct RequestInit {
    pub method: Option<http::Method>,
    pub headers: Option<Headers>,
    pub body: BodySource,
    pub redirect: RedirectMode,
    pub follow: u32,
    pub compress: bool,
    pub timeout_ms: u64,
    pub max_response_bytes: u64,
    pub agent: Option<Arc<dyn Agent>>,
}

impl Default for RedirectMode {
    fn default() -> Self {
        Self::Follow
    }
}

impl Default for BodySource {
    fn default() -> Self {
        Self::None
    }
}

impl Default for RequestInit {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestInit {
    pub fn new() -> Self {
        Self {
            method: None,
            headers: None,
            body: BodySource::None,
            redirect: RedirectMode::Follow,
            follow: 20,
            compress: true,
            timeout_ms: 0,
            max_response_bytes: 0,
            agent: None,
        }
    }

    pub fn method(mut self, method: http::Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn body(mut self, body: BodySource) -> Self {
        self.body = body;
        self
    }

    pub fn text_body(self, text: impl Into<String>) -> Self {
        self.body(BodySource::Text(text.into()))
    }

    #[cfg(feature = "json")]
    pub fn json_body<T: serde::Serialize>(self, value: &T) -> Result<Self, FetchError> {
        let bytes = serde_json::to_vec(value)
            .map_err(|err| FetchError::system_with_cause("failed to encode json body", err))?;
        Ok(self.body(BodySource::Bytes(bytes.into())))
    }

    pub fn form_data_body(self, form: FormData) -> Self {
        self.body(BodySource::FormData(Arc::new(form)))
    }

    pub fn redirect(mut self, redirect: RedirectMode) -> Self {
        self.redirect = redirect;
        self
    }

    pub fn follow(mut self, follow: u32) -> Self {
        self.follow = follow;
        self
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn size(mut self, max_response_bytes: u64) -> Self {
        self.max_response_bytes = max_response_bytes;
        self
    }

    pub fn agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.agent = Some(agent);
        self
    }
}
