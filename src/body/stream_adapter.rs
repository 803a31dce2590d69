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
use std::pin::Pin;

use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;

use crate::error::FetchError;

/// The single stream shape every body source converges to: a boxed,
/// `Send` stream of byte chunks or a terminal [`FetchError`]. Stands in
/// for both Node-style and Web-style readable streams, which are
/// indistinguishable on a server-side Rust runtime.
pub type BoxBodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, FetchError>> + Send>>;

/// Wraps an arbitrary caller-supplied byte stream (e.g. a file handle or
/// an upstream response body being proxied) into a [`BoxBodyStream`],
/// coercing read errors into kind `system` and dropping zero-length
/// chunks.
pub fn from_stream<S, E>(stream: S, url: impl Into<String>) -> BoxBodyStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let url = url.into();
    Box::pin(
        stream
            .map(move |item| {
                item.map_err(|err| {
                    FetchError::system(format!(
                        "Invalid response body while trying to fetch {url}: {err}"
                    ))
                })
            })
            .filter(|item| {
                let keep = !matches!(item, Ok(bytes) if bytes.is_empty());
                async move { keep }
            }),
    )
}
