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

use crate::error::FetchError;

/// Validates that `input` parses as an absolute `http`/`https` URL.
///
/// Relative or protocol-relative input is rejected with `"Only absolute
/// URLs are supported"`, and any other scheme with `"Only HTTP(S)
/// protocols are supported"`.
pub fn validate(input: &str) -> Result<Url, FetchError> {
    let url = Url::parse(input)
        .map_err(|_| FetchError::type_error("Only absolute URLs are supported"))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(FetchError::type_error(
            "Only HTTP(S) protocols are supported",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(validate("http://example.com/a").is_ok());
        assert!(validate("https://example.com/a").is_ok());
    }

    #[test]
    fn rejects_relative() {
        let err = validate("/just/a/path").unwrap_err();
        assert_eq!(err.message, "Only absolute URLs are supported");
    }

    #[test]
    fn rejects_protocol_relative() {
        let err = validate("//example.com/a").unwrap_err();
        assert_eq!(err.message, "Only absolute URLs are supported");
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = validate("ftp://example.com/a").unwrap_err();
        assert_eq!(err.message, "Only HTTP(S) protocols are supported");
    }
}
