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

use http::{HeaderName, HeaderValue};
use indexmap::IndexMap;

use crate::error::FetchError;

/// A case-insensitive, multi-valued, insertion-ordered header store.
///
/// Validation is delegated to `http::HeaderName`/`http::HeaderValue`,
/// which already reject invalid token grammar, so no hand-rolled
/// validator is needed.
///
/// `get` always comma-joins multiple values, including `set-cookie`;
/// [`Headers::get_all`] and [`Headers::iter`] are the ones that keep
/// `set-cookie` split into one entry per cookie.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: IndexMap<HeaderName, Vec<String>>,
}

impl Headers {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Appends `value` to `name`, creating the entry if absent. Never
    /// replaces an existing value, matching `Headers.append`.
    pub fn append(&mut self, name: &str, value: &str) -> Result<(), FetchError> {
        let (name, value) = Self::validate(name, value)?;
        self.entries.entry(name).or_default().push(value);
        Ok(())
    }

    /// Replaces every existing value for `name` with the single `value`,
    /// matching `Headers.set`.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), FetchError> {
        let (name, value) = Self::validate(name, value)?;
        self.entries.insert(name, vec![value]);
        Ok(())
    }

    pub fn delete(&mut self, name: &str) {
        if let Ok(name) = name.parse::<HeaderName>() {
            self.entries.shift_remove(&name);
        }
    }

    pub fn has(&self, name: &str) -> bool {
        name.parse::<HeaderName>()
            .map(|name| self.entries.contains_key(&name))
            .unwrap_or(false)
    }

    /// Returns the comma-joined value for `name`, or `None` if absent.
    /// Callers that need each `set-cookie` value as a separate string
    /// must use [`Headers::get_all`] instead.
    pub fn get(&self, name: &str) -> Option<String> {
        let name = name.parse::<HeaderName>().ok()?;
        let values = self.entries.get(&name)?;
        Some(values.join(", "))
    }

    /// Returns every value stored for `name`, with no restriction on
    /// which header it may be called for. The public `getAll`-equivalent
    /// restricts this to `set-cookie`; this low-level accessor exists so
    /// [`crate::response::Response`] can build both surfaces from it.
    pub(crate) fn get_all_raw(&self, name: &str) -> Vec<String> {
        name.parse::<HeaderName>()
            .ok()
            .and_then(|name| self.entries.get(&name))
            .cloned()
            .unwrap_or_default()
    }

    /// Returns every value stored for `name`. Per §4.2, only permitted
    /// for `set-cookie`; any other name fails with `type-error`.
    pub fn get_all(&self, name: &str) -> Result<Vec<String>, FetchError> {
        let header = name
            .parse::<HeaderName>()
            .map_err(|_| FetchError::type_error(format!("Invalid header name: {name}")))?;
        if header != http::header::SET_COOKIE {
            return Err(FetchError::type_error(
                "getAll can only be used with the set-cookie header",
            ));
        }
        Ok(self.entries.get(&header).cloned().unwrap_or_default())
    }

    /// Iterates entries in sorted-by-name order, one `(name, joined_value)`
    /// pair per name, with `set-cookie` split into one pair per cookie.
    pub fn iter(&self) -> impl Iterator<Item = (String, String)> + '_ {
        let mut names: Vec<&HeaderName> = self.entries.keys().collect();
        names.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        names.into_iter().flat_map(move |name| {
            let values = &self.entries[name];
            if *name == http::header::SET_COOKIE {
                values
                    .iter()
                    .map(|v| (name.as_str().to_owned(), v.clone()))
                    .collect::<Vec<_>>()
            } else {
                vec![(name.as_str().to_owned(), values.join(", "))]
            }
        })
    }

    fn validate(name: &str, value: &str) -> Result<(HeaderName, String), FetchError> {
        let name = name
            .parse::<HeaderName>()
            .map_err(|_| FetchError::type_error(format!("Invalid header name: {name}")))?;
        HeaderValue::from_str(value)
            .map_err(|_| FetchError::type_error(format!("Invalid header value: {value}")))?;
        Ok((name, value.to_owned()))
    }

    pub(crate) fn from_http_map(map: &http::HeaderMap) -> Self {
        let mut headers = Self::new();
        for name in map.keys() {
            for value in map.get_all(name) {
                if let Ok(value) = value.to_str() {
                    headers
                        .entries
                        .entry(name.clone())
                        .or_default()
                        .push(value.to_owned());
                }
            }
        }
        headers
    }

    pub(crate) fn content_type(&self) -> Option<String> {
        self.get("content-type")
    }

    pub(crate) fn content_length(&self) -> Option<u64> {
        self.get("content-length").and_then(|v| v.parse().ok())
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            writeln!(fmt, "{name}: {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_accumulates_and_get_joins() {
        let mut headers = Headers::new();
        headers.append("X-Foo", "a").unwrap();
        headers.append("x-foo", "b").unwrap();
        assert_eq!(headers.get("X-FOO").unwrap(), "a, b");
    }

    #[test]
    fn set_replaces() {
        let mut headers = Headers::new();
        headers.append("X-Foo", "a").unwrap();
        headers.set("X-Foo", "b").unwrap();
        assert_eq!(headers.get("x-foo").unwrap(), "b");
    }

    #[test]
    fn set_cookie_get_joins_but_get_all_preserves_each_value() {
        let mut headers = Headers::new();
        headers.append("Set-Cookie", "a=1").unwrap();
        headers.append("Set-Cookie", "b=2").unwrap();
        assert_eq!(headers.get("set-cookie").unwrap(), "a=1, b=2");
        assert_eq!(headers.get_all("set-cookie").unwrap(), vec!["a=1", "b=2"]);
    }

    #[test]
    fn get_all_rejects_non_set_cookie() {
        let mut headers = Headers::new();
        headers.append("X-Foo", "a").unwrap();
        assert!(headers.get_all("x-foo").is_err());
    }

    #[test]
    fn iter_is_sorted_and_splits_set_cookie() {
        let mut headers = Headers::new();
        headers.append("Content-Type", "text/plain").unwrap();
        headers.append("Set-Cookie", "a=1").unwrap();
        headers.append("Set-Cookie", "b=2").unwrap();
        headers.append("Accept", "*/*").unwrap();

        let pairs: Vec<_> = headers.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("accept".to_owned(), "*/*".to_owned()),
                ("content-type".to_owned(), "text/plain".to_owned()),
                ("set-cookie".to_owned(), "a=1".to_owned()),
                ("set-cookie".to_owned(), "b=2".to_owned()),
            ]
        );
    }

    #[test]
    fn rejects_invalid_name_and_value() {
        let mut headers = Headers::new();
        assert!(headers.append("bad name", "v").is_err());
        assert!(headers.append("X-Foo", "bad\r\nvalue").is_err());
    }
}
