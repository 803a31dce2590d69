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

use crate::body::{Body, BodySource};
use crate::headers::Headers;

/// An immutable response descriptor exposing a consumable [`Body`].
/// `ok` is derived from `status`, not stored.
pub struct Response {
    url: String,
    status: http::StatusCode,
    headers: Headers,
    body: Body,
}

impl Response {
    pub(crate) fn new(
        url: String,
        status: http::StatusCode,
        headers: Headers,
        body: Body,
    ) -> Self {
        Self {
            url,
            status,
            headers,
            body,
        }
    }

    /// Builds a standalone response from raw bytes, with no transport
    /// involved.
    pub fn from_bytes(bytes: impl Into<Bytes>, status: http::StatusCode) -> Self {
        Self {
            url: String::new(),
            status,
            headers: Headers::new(),
            body: Body::new(BodySource::Bytes(bytes.into()), ""),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> http::StatusCode {
        self.status
    }

    /// The canonical reason phrase for `status`, via `http::StatusCode`
    /// (already a teacher dependency) rather than a hand-rolled status
    /// text table.
    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    pub fn ok(&self) -> bool {
        self.status.as_u16() >= 200 && self.status.as_u16() < 300
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_used(&self) -> bool {
        self.body.is_disturbed()
    }

    /// Splits this response's body via [`Body::try_clone`], returning a
    /// new `Response` sharing status/headers/url and an independent body
    /// branch.
    pub async fn try_clone(&self) -> Result<Response, crate::error::FetchError> {
        Ok(Response {
            url: self.url.clone(),
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.try_clone().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn from_bytes_round_trips_text() {
        let response = Response::from_bytes(Bytes::from_static(b"hello"), http::StatusCode::OK);
        assert_eq!(response.body().text().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn empty_body_text_is_empty_string() {
        let response = Response::from_bytes(Bytes::new(), http::StatusCode::OK);
        assert_eq!(response.body().text().await.unwrap(), "");
    }

    #[cfg(feature = "json")]
    #[tokio::test]
    async fn empty_body_json_rejects() {
        let response = Response::from_bytes(Bytes::new(), http::StatusCode::OK);
        let result: Result<serde_json::Value, _> = response.body().json().await;
        assert!(result.is_err());
    }
}
