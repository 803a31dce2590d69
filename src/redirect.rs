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
use url::Url;

use crate::body::{BodyReplay, BodySource};
use crate::error::FetchError;
use crate::request::RedirectMode;

/// Outcome of inspecting a transport response against the current
/// request state: either terminal, or a re-dispatch with a rewritten
/// method/body.
pub(crate) enum Decision {
    /// Terminal: hand the response back to the caller as-is.
    Return,
    /// Re-dispatch against `url` with `method`/`body` rewritten as the
    /// status code requires.
    Follow {
        url: Url,
        method: http::Method,
        body: BodySource,
    },
}

/// Inspects a response's status and `Location` header and decides
/// whether to terminate or re-dispatch.
///
/// Implements the method/body rewriting matrix across
/// 301/302/303/307/308: a `POST` redirected by 301/302 or any method
/// redirected by 303 drops the body and becomes `GET`; 307/308 preserve
/// method and body but reject a non-idempotent method with a
/// non-replayable (streaming) body, since that can't be resent.
pub(crate) fn decide(
    current_url: &Url,
    method: &http::Method,
    body_source: BodyReplay,
    status: http::StatusCode,
    location: Option<&str>,
    redirect_mode: RedirectMode,
    hop_counter: u32,
    follow_limit: u32,
) -> Result<Decision, FetchError> {
    if !is_redirect_status(status) {
        return Ok(Decision::Return);
    }

    let Some(location) = location else {
        return Ok(Decision::Return);
    };

    match redirect_mode {
        RedirectMode::Manual => return Ok(Decision::Return),
        RedirectMode::Error => {
            return Err(FetchError::no_redirect(current_url.as_str()));
        }
        RedirectMode::Follow => {}
    }

    if hop_counter + 1 > follow_limit {
        return Err(FetchError::max_redirect());
    }

    let new_url = current_url
        .join(location)
        .map_err(|err| FetchError::system_with_cause("invalid redirect location", err))?;

    let status = status.as_u16();

    let (new_method, new_body) = match status {
        301 | 302 => {
            if *method == http::Method::POST {
                (http::Method::GET, BodySource::None)
            } else {
                (method.clone(), resolve_preserved_body(body_source)?)
            }
        }
        303 => (http::Method::GET, BodySource::None),
        307 | 308 => (method.clone(), resolve_preserved_body(body_source)?),
        _ => (method.clone(), resolve_preserved_body(body_source)?),
    };

    Ok(Decision::Follow {
        url: new_url,
        method: new_method,
        body: new_body,
    })
}

fn is_redirect_status(status: http::StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

/// Resolves a carried-forward body for a redirect that preserves it.
/// A body already sent as a live stream can never be resent, so this
/// fails with `unsupported-redirect` rather than silently dropping it.
fn resolve_preserved_body(body: BodyReplay) -> Result<BodySource, FetchError> {
    match body {
        BodyReplay::Replayable(source) => Ok(source),
        BodyReplay::Stream => Err(FetchError::unsupported_redirect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn no_location_is_terminal() {
        let decision = decide(
            &url("http://example.com/a"),
            &http::Method::GET,
            BodyReplay::Replayable(BodySource::None),
            http::StatusCode::from_u16(301).unwrap(),
            None,
            RedirectMode::Follow,
            0,
            20,
        )
        .unwrap();
        assert!(matches!(decision, Decision::Return));
    }

    #[test]
    fn manual_mode_is_terminal() {
        let decision = decide(
            &url("http://example.com/a"),
            &http::Method::GET,
            BodyReplay::Replayable(BodySource::None),
            http::StatusCode::from_u16(301).unwrap(),
            Some("/b"),
            RedirectMode::Manual,
            0,
            20,
        )
        .unwrap();
        assert!(matches!(decision, Decision::Return));
    }

    #[test]
    fn error_mode_fails() {
        let err = decide(
            &url("http://example.com/a"),
            &http::Method::GET,
            BodyReplay::Replayable(BodySource::None),
            http::StatusCode::from_u16(301).unwrap(),
            Some("/b"),
            RedirectMode::Error,
            0,
            20,
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::FetchErrorKind::NoRedirect);
    }

    #[test]
    fn post_301_rewrites_to_get_and_drops_body() {
        let decision = decide(
            &url("http://example.com/a"),
            &http::Method::POST,
            BodyReplay::Replayable(BodySource::Text("a=1".to_owned())),
            http::StatusCode::from_u16(301).unwrap(),
            Some("/inspect"),
            RedirectMode::Follow,
            0,
            20,
        )
        .unwrap();
        match decision {
            Decision::Follow { method, body, .. } => {
                assert_eq!(method, http::Method::GET);
                assert!(matches!(body, BodySource::None));
            }
            Decision::Return => panic!("expected follow"),
        }
    }

    #[test]
    fn status_303_always_rewrites_to_get() {
        let decision = decide(
            &url("http://example.com/a"),
            &http::Method::PUT,
            BodyReplay::Replayable(BodySource::Text("a=1".to_owned())),
            http::StatusCode::from_u16(303).unwrap(),
            Some("/inspect"),
            RedirectMode::Follow,
            0,
            20,
        )
        .unwrap();
        match decision {
            Decision::Follow { method, body, .. } => {
                assert_eq!(method, http::Method::GET);
                assert!(matches!(body, BodySource::None));
            }
            Decision::Return => panic!("expected follow"),
        }
    }

    #[test]
    fn status_307_with_stream_body_on_non_idempotent_method_is_unsupported() {
        let err = decide(
            &url("http://example.com/a"),
            &http::Method::PATCH,
            BodyReplay::Stream,
            http::StatusCode::from_u16(307).unwrap(),
            Some("/inspect"),
            RedirectMode::Follow,
            0,
            20,
        )
        .unwrap_err();
        assert_eq!(
            err.kind(),
            crate::error::FetchErrorKind::UnsupportedRedirect
        );
    }

    #[test]
    fn hop_counter_exceeding_follow_limit_fails() {
        let err = decide(
            &url("http://example.com/a"),
            &http::Method::GET,
            BodyReplay::Replayable(BodySource::None),
            http::StatusCode::from_u16(302).unwrap(),
            Some("/b"),
            RedirectMode::Follow,
            2,
            2,
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::FetchErrorKind::MaxRedirect);
    }
}
