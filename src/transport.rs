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
use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::Client;

use crate::body::{from_stream, BoxBodyStream};
use crate::error::FetchError;
use crate::headers::Headers;

/// A fully framed outgoing request: status line, header set, and byte
/// stream, the transport's input.
pub struct TransportRequest {
    pub method: http::Method,
    pub url: url::Url,
    pub headers: Headers,
    pub body: BoxBodyStream,
}

/// The transport's response: status, headers, and the raw (not yet
/// decompressed) byte stream.
pub struct TransportResponse {
    pub status: http::StatusCode,
    pub headers: Headers,
    pub body: BoxBodyStream,
}

/// The collaborator that owns DNS, connection pooling, and the HTTP/1.1
/// or HTTP/2 wire protocol, decoupled from `fetch` so callers can supply
/// their own.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn dispatch(&self, req: TransportRequest) -> Result<TransportResponse, FetchError>;
}

/// The default [`Agent`], backed by `reqwest`.
///
/// `reqwest`'s own redirect-following and automatic decompression are
/// both disabled so this crate's redirect state machine and
/// `src/encoding.rs` remain the only places those concerns are handled.
pub struct ReqwestAgent {
    client: Client,
}

impl ReqwestAgent {
    pub fn new() -> Result<Self, FetchError> {
        Self::builder().build()
    }

    pub fn builder() -> ReqwestAgentBuilder {
        ReqwestAgentBuilder::default()
    }
}

#[derive(Default)]
pub struct ReqwestAgentBuilder {
    pool_idle_timeout: Option<Duration>,
    pool_max_idle_per_host: Option<usize>,
}

impl ReqwestAgentBuilder {
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = Some(max);
        self
    }

    pub fn build(self) -> Result<ReqwestAgent, FetchError> {
        // The crate's `gzip`/`deflate`/`brotli` cargo features are
        // deliberately left off the `reqwest` dependency, so this
        // client never auto-decompresses; `src/encoding.rs` is the only
        // decompressor.
        let mut builder =
            Client::builder().redirect(reqwest::redirect::Policy::none());

        if let Some(timeout) = self.pool_idle_timeout {
            builder = builder.pool_idle_timeout(timeout);
        }
        if let Some(max) = self.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(max);
        }

        let client = builder
            .build()
            .map_err(|err| FetchError::system_with_cause("failed to build HTTP client", err))?;

        Ok(ReqwestAgent { client })
    }
}

#[async_trait]
impl Agent for ReqwestAgent {
    async fn dispatch(&self, req: TransportRequest) -> Result<TransportResponse, FetchError> {
        let mut header_map = http::HeaderMap::new();
        for (name, value) in req.headers.iter() {
            if let (Ok(name), Ok(value)) = (
                name.parse::<http::HeaderName>(),
                http::HeaderValue::from_str(&value),
            ) {
                header_map.append(name, value);
            }
        }

        let body_stream = req.body.map_err(std::io::Error::other);
        let body = reqwest::Body::wrap_stream(body_stream);

        let response = self
            .client
            .request(req.method, req.url)
            .headers(header_map)
            .body(body)
            .send()
            .await
            .map_err(|err| FetchError::system_with_cause("request failed", err))?;

        let status = response.status();
        let headers = Headers::from_http_map(response.headers());

        let url = response.url().to_string();
        let byte_stream = response.bytes_stream();
        let body = from_stream(byte_stream, url);

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
