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
use std::fmt;

/// Coarse classification of a [`FetchError`], mirroring the `name`/`type`
/// split `node-fetch` exposes on its `FetchError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// URL validation, header validation, a `GET`/`HEAD` request carrying a
    /// body, a double body consumption, or `getAll` on a non-`set-cookie`
    /// header.
    TypeError,
    /// Transport or DNS failure, malformed response headers, or a
    /// decompression failure.
    System,
    /// `json()` could not parse the decoded body (including an empty body).
    InvalidJson,
    /// The hop counter would exceed the configured redirect limit.
    MaxRedirect,
    /// A 307/308 redirect carried a non-replayable body on a non-idempotent
    /// method.
    UnsupportedRedirect,
    /// `redirect: error` was configured and a redirect response arrived.
    NoRedirect,
    /// The response head did not arrive before the request deadline.
    RequestTimeout,
    /// A body read stalled past the body deadline.
    BodyTimeout,
    /// The accumulated body exceeded the configured size cap.
    MaxSize,
}

impl FetchErrorKind {
    /// The stable string node-fetch uses for `err.type`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TypeError => "type-error",
            Self::System => "system",
            Self::InvalidJson => "invalid-json",
            Self::MaxRedirect => "max-redirect",
            Self::UnsupportedRedirect => "unsupported-redirect",
            Self::NoRedirect => "no-redirect",
            Self::RequestTimeout => "request-timeout",
            Self::BodyTimeout => "body-timeout",
            Self::MaxSize => "max-size",
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

/// The single error type every fallible operation in this crate returns.
///
/// Carries a human-readable `message`, a [`FetchErrorKind`] tag callers can
/// match on without parsing the message, an optional upstream `cause`, and
/// an optional `code` (e.g. `ECONNREFUSED`, `Z_DATA_ERROR`) lifted from that
/// cause when the underlying error exposes one.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct FetchError {
    pub message: String,
    pub kind: FetchErrorKind,
    pub code: Option<String>,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            code: None,
            cause: None,
        }
    }

    pub fn with_cause(
        kind: FetchErrorKind,
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            kind,
            code: None,
            cause: Some(Box::new(cause)),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::TypeError, message)
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::System, message)
    }

    pub fn system_with_cause(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::with_cause(FetchErrorKind::System, message, cause)
    }

    pub fn invalid_json(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::with_cause(
            FetchErrorKind::InvalidJson,
            "invalid json response body",
            cause,
        )
    }

    pub fn max_redirect() -> Self {
        Self::new(FetchErrorKind::MaxRedirect, "maximum redirect reached at")
    }

    pub fn unsupported_redirect() -> Self {
        Self::new(
            FetchErrorKind::UnsupportedRedirect,
            "redirect in non-GET/HEAD request with a streaming body is not supported",
        )
    }

    pub fn no_redirect(url: &str) -> Self {
        Self::new(
            FetchErrorKind::NoRedirect,
            format!("redirect mode is set to error: {url}"),
        )
    }

    pub fn request_timeout(url: &str) -> Self {
        Self::new(
            FetchErrorKind::RequestTimeout,
            format!("network timeout at: {url}"),
        )
    }

    pub fn body_timeout() -> Self {
        Self::new(FetchErrorKind::BodyTimeout, "body timeout")
    }

    pub fn max_size() -> Self {
        Self::new(
            FetchErrorKind::MaxSize,
            "content size at maximum limit exceeded",
        )
    }

    pub fn kind(&self) -> FetchErrorKind {
        self.kind
    }
}
