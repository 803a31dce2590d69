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
use futures_util::stream::{self, StreamExt, TryStreamExt};
use indexmap::IndexMap;
use rand::Rng;

use crate::body::{BodySource, BoxBodyStream, SharedFormData};
use crate::error::FetchError;

const BOUNDARY_PREFIX: &str = "----RustFormBoundary";

/// An assembled multipart/url-encoded form: field name to value, files'
/// bytes concatenated into a single string value keyed by filename.
///
/// Outgoing encoding is a thin boundary-delimited framing wrapper;
/// incoming decoding uses `multer`, a streaming multipart parser.
#[derive(Debug, Default)]
pub struct FormData {
    fields: IndexMap<String, String>,
    boundary: String,
}

impl FormData {
    pub fn new() -> Self {
        Self {
            fields: IndexMap::new(),
            boundary: generate_boundary(),
        }
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn delete(&mut self, name: &str) {
        self.fields.shift_remove(name);
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub(crate) fn known_length(&self) -> Option<u64> {
        Some(encoded_len(&self.fields, &self.boundary))
    }
}

fn generate_boundary() -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..32)
        .map(|_| HEX[rng.gen_range(0..HEX.len())] as char)
        .collect();
    format!("{BOUNDARY_PREFIX}{suffix}")
}

fn encoded_len(fields: &IndexMap<String, String>, boundary: &str) -> u64 {
    encode_parts(fields, boundary)
        .iter()
        .map(|part| part.len() as u64)
        .sum()
}

fn encode_parts(fields: &IndexMap<String, String>, boundary: &str) -> Vec<String> {
    let mut parts = Vec::with_capacity(fields.len() * 2 + 1);
    for (name, value) in fields {
        parts.push(format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    parts.push(format!("--{boundary}--\r\n"));
    parts
}

/// Encodes a `FormData` into its boundary-delimited multipart wire
/// stream.
pub(crate) fn encode(form: SharedFormData) -> BoxBodyStream {
    let parts = encode_parts(&form.fields, &form.boundary);
    Box::pin(stream::iter(
        parts.into_iter().map(|part| Ok(Bytes::from(part))),
    ))
}

/// Extracts the `boundary` parameter from a `multipart/form-data`
/// content-type, or `None` if the header names a different media type.
pub(crate) fn boundary_of(content_type: &str) -> Option<String> {
    let lower = content_type.to_ascii_lowercase();
    if !lower.starts_with("multipart/form-data") {
        return None;
    }
    content_type.split(';').skip(1).find_map(|param| {
        let param = param.trim();
        param
            .strip_prefix("boundary=")
            .map(|b| b.trim_matches('"').to_owned())
    })
}

pub(crate) async fn decode_multipart(bytes: Bytes, boundary: &str) -> Result<FormData, FetchError> {
    let stream = stream::once(async move { Ok::<_, std::io::Error>(bytes) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut form = FormData {
        fields: IndexMap::new(),
        boundary: boundary.to_owned(),
    };

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| FetchError::system_with_cause("invalid multipart/form-data body", err))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        let mut value = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|err| FetchError::system_with_cause("invalid multipart/form-data body", err))?
        {
            value.extend_from_slice(&chunk);
        }
        let value = String::from_utf8_lossy(&value).into_owned();
        form.fields.insert(name, value);
    }

    Ok(form)
}

pub(crate) fn decode_urlencoded(bytes: &[u8]) -> Result<FormData, FetchError> {
    let mut form = FormData::new();
    for (key, value) in url::form_urlencoded::parse(bytes) {
        form.fields.insert(key.into_owned(), value.into_owned());
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_of_extracts_quoted_and_unquoted() {
        assert_eq!(
            boundary_of("multipart/form-data; boundary=abc123"),
            Some("abc123".to_owned())
        );
        assert_eq!(
            boundary_of(r#"multipart/form-data; boundary="abc 123""#),
            Some("abc 123".to_owned())
        );
        assert_eq!(boundary_of("application/json"), None);
    }

    #[test]
    fn decode_urlencoded_parses_pairs() {
        let form = decode_urlencoded(b"a=1&b=2").unwrap();
        assert_eq!(form.get("a"), Some("1"));
        assert_eq!(form.get("b"), Some("2"));
    }

    #[tokio::test]
    async fn multipart_round_trip() {
        let mut form = FormData::new();
        form.append("name", "value");
        let boundary = form.boundary().to_owned();

        let encoded: Vec<Bytes> = encode(std::sync::Arc::new(form))
            .try_collect()
            .await
            .unwrap();
        let bytes: Bytes = encoded.concat().into();

        let decoded = decode_multipart(bytes, &boundary).await.unwrap();
        assert_eq!(decoded.get("name"), Some("value"));
    }
}
