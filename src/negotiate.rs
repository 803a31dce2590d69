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
use crate::body::{Body, BodySourceKind};
use crate::headers::Headers;

const DEFAULT_USER_AGENT: &str = concat!("fetch-core/", env!("CARGO_PKG_VERSION"));

/// Infers `Content-Type`, `Content-Length`, `Transfer-Encoding`, and the
/// default `User-Agent`/`Accept`/`Accept-Encoding` headers for an outgoing
/// request from the shape of its body.
pub(crate) async fn negotiate(headers: &mut Headers, body: &Body, compress: bool) {
    if let Some((kind, known_length)) = body.peek_source().await {
        // A redirect may have just rewritten the body to `None`; drop
        // whatever a prior hop's negotiation attached so a now-bodyless
        // request doesn't echo a stale Content-Type/Length.
        if kind == BodySourceKind::None {
            headers.delete("content-type");
            headers.delete("content-length");
            headers.delete("transfer-encoding");
        }

        if !headers.has("content-type") {
            if let Some(content_type) = default_content_type(kind) {
                let _ = headers.set("content-type", &content_type);
            } else if kind == BodySourceKind::FormData {
                if let Some(boundary) = body.form_data_boundary().await {
                    let _ = headers.set(
                        "content-type",
                        &format!("multipart/form-data;boundary={boundary}"),
                    );
                }
            }
        }

        match known_length {
            Some(len) => {
                let _ = headers.set("content-length", &len.to_string());
            }
            None if kind == BodySourceKind::Stream => {
                let _ = headers.set("transfer-encoding", "chunked");
            }
            None => {}
        }
    }

    if !headers.has("user-agent") {
        let _ = headers.set("user-agent", DEFAULT_USER_AGENT);
    }

    if !headers.has("accept") {
        let _ = headers.set("accept", "*/*");
    }

    if compress && !headers.has("accept-encoding") {
        let _ = headers.set("accept-encoding", "gzip,deflate");
    }
}

fn default_content_type(kind: BodySourceKind) -> Option<String> {
    match kind {
        BodySourceKind::None => None,
        BodySourceKind::Text | BodySourceKind::Other => {
            Some("text/plain;charset=UTF-8".to_owned())
        }
        BodySourceKind::UrlEncoded => {
            Some("application/x-www-form-urlencoded;charset=UTF-8".to_owned())
        }
        BodySourceKind::FormData | BodySourceKind::Bytes | BodySourceKind::Stream => None,
    }
}
