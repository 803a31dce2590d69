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
#![forbid(unsafe_code)]

//! An async, WHATWG-Fetch-shaped HTTP client for server-side Rust.
//!
//! ```no_run
//! # use std::error::Error;
//! use fetch_core::{fetch, RequestInit};
//!
//! # async fn run() -> Result<(), Box<dyn Error>> {
//! let resp = fetch("https://example.com/", RequestInit::new()).await?;
//! let body = resp.body().text().await?;
//! println!("{body}");
//! #
//! # Ok(())
//! # }
//! ```

mod body;
mod encoding;
mod error;
mod headers;
mod multipart;
mod negotiate;
mod redirect;
mod request;
mod response;
mod transport;
mod url;

pub use http;
#[cfg(feature = "json")]
pub use serde;
#[cfg(feature = "json")]
pub use serde_json;
pub use ::url::Url;

pub use body::{Blob, Body, BodySource, BoxBodyStream};
pub use error::{FetchError, FetchErrorKind};
pub use headers::Headers;
pub use multipart::FormData;
pub use request::{RedirectMode, Request, RequestInit};
pub use response::Response;
pub use transport::{Agent, ReqwestAgent, ReqwestAgentBuilder, TransportRequest, TransportResponse};

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument};

/// Fetches `input` (an absolute URL) with `init`'s options: build a
/// `Request`, validate the URL, negotiate content headers, dispatch via
/// the transport, inspect the response for a redirect, and either
/// re-loop with a rewritten method/body or construct the final
/// `Response`. Content negotiation re-runs on every hop, since a
/// redirect can change the body it needs to describe.
#[instrument(skip(input, init), fields(url = %input.as_ref()))]
pub async fn fetch(input: impl AsRef<str>, init: RequestInit) -> Result<Response, FetchError> {
    let agent = init.agent.clone();
    let mut request = Request::new(input, init)?;

    let agent: Arc<dyn Agent> = match agent {
        Some(agent) => agent,
        None => Arc::new(ReqwestAgent::new()?),
    };

    loop {
        negotiate::negotiate(&mut request.headers, &request.body, request.compress).await;

        let start = Instant::now();

        let method = request.method.clone();
        let url = request.url.clone();

        let (wire_body, replay_body) = request.body.take_for_transport(url.as_str()).await;

        let transport_req = TransportRequest {
            method: method.clone(),
            url: url.clone(),
            headers: request.headers.clone(),
            body: wire_body,
        };

        let dispatch = async { agent.dispatch(transport_req).await };

        let transport_resp = if request.timeout_ms > 0 {
            match tokio::time::timeout(
                std::time::Duration::from_millis(request.timeout_ms),
                dispatch,
            )
            .await
            {
                Ok(result) => result?,
                Err(_) => return Err(FetchError::request_timeout(url.as_str())),
            }
        } else {
            dispatch.await?
        };

        debug!(elapsed_ms = %start.elapsed().as_millis(), status = %transport_resp.status, "response head received");

        let location = transport_resp.headers.get("location");

        let remaining_timeout_ms = remaining_timeout(request.timeout_ms, start.elapsed());

        match redirect::decide(
            &url,
            &method,
            replay_body,
            transport_resp.status,
            location.as_deref(),
            request.redirect,
            request.hop_counter,
            request.follow,
        )? {
            redirect::Decision::Return => {
                let body = build_response_body(
                    &url,
                    &method,
                    transport_resp.status,
                    &transport_resp.headers,
                    transport_resp.body,
                    request.compress,
                    request.max_response_bytes,
                    remaining_timeout_ms,
                )
                .await?;

                return Ok(Response::new(
                    url.to_string(),
                    transport_resp.status,
                    transport_resp.headers,
                    body,
                ));
            }
            redirect::Decision::Follow {
                url: new_url,
                method: new_method,
                body: new_body,
            } => {
                request.url = new_url;
                request.method = new_method;
                request.body = Body::new(new_body, request.url.as_str())
                    .with_size_cap(if request.max_response_bytes == 0 {
                        None
                    } else {
                        Some(request.max_response_bytes)
                    })
                    .with_timeout_ms(remaining_timeout_ms);
                request.hop_counter += 1;
                request.timeout_ms = remaining_timeout_ms;
            }
        }
    }
}

fn remaining_timeout(timeout_ms: u64, elapsed: std::time::Duration) -> u64 {
    if timeout_ms == 0 {
        0
    } else {
        timeout_ms.saturating_sub(elapsed.as_millis() as u64)
    }
}

/// Installs a decompressor (§4.7) when `compress` is set, the method was
/// not `HEAD`, the status carries a body (not 204/304), and
/// `content-encoding` names a supported codec; wraps the result in a
/// fresh [`Body`] with the caller's size cap and remaining timeout.
#[allow(clippy::too_many_arguments)]
async fn build_response_body(
    url: &Url,
    method: &http::Method,
    status: http::StatusCode,
    headers: &Headers,
    body_stream: BoxBodyStream,
    compress: bool,
    size_cap: u64,
    timeout_ms: u64,
) -> Result<Body, FetchError> {
    let status_u16 = status.as_u16();
    let has_body = *method != http::Method::HEAD && status_u16 != 204 && status_u16 != 304;

    let body_stream = if !has_body {
        let empty: BoxBodyStream = Box::pin(futures_util::stream::empty());
        empty
    } else if compress {
        match headers.get("content-encoding") {
            Some(encoding) if !encoding.is_empty() && encoding != "identity" => {
                encoding::decompress(&encoding, body_stream).await?
            }
            _ => body_stream,
        }
    } else {
        body_stream
    };

    Ok(Body::new(BodySource::Stream(body_stream), url.as_str())
        .with_size_cap(if size_cap == 0 { None } else { Some(size_cap) })
        .with_timeout_ms(timeout_ms))
}
