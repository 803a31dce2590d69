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
use async_compression::tokio::bufread::{DeflateDecoder, GzipDecoder, ZlibDecoder};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::io::BufReader;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::body::BoxBodyStream;
use crate::error::FetchError;

/// Interposes the decompressor named by `content-encoding` over an async
/// `Bytes` stream using `async-compression`'s `tokio` adapters, bridging
/// between `futures::Stream<Bytes>` and `AsyncRead` via
/// `tokio_util::io::{StreamReader, ReaderStream}`.
///
/// `gzip` tolerates trailing garbage (the decoder's default multi-member
/// mode already does this); unrecognized `deflate` bytes are
/// disambiguated by sniffing the first byte of the stream: `0x78`
/// selects zlib framing, anything else selects raw deflate.
pub(crate) async fn decompress(
    content_encoding: &str,
    body: BoxBodyStream,
) -> Result<BoxBodyStream, FetchError> {
    match content_encoding.trim().to_ascii_lowercase().as_str() {
        "gzip" | "x-gzip" => {
            let reader = StreamReader::new(to_io_stream(body));
            let decoder = GzipDecoder::new(BufReader::new(reader));
            Ok(wrap(decoder))
        }
        "deflate" => decompress_deflate(body).await,
        "" | "identity" => Ok(body),
        other => Err(FetchError::system(format!(
            "unsupported content-encoding: {other}"
        ))),
    }
}

async fn decompress_deflate(body: BoxBodyStream) -> Result<BoxBodyStream, FetchError> {
    let mut reader = BufReader::new(StreamReader::new(to_io_stream(body)));

    let first_byte = reader
        .fill_buf_peek()
        .await
        .map_err(|err| FetchError::system_with_cause("failed to read compressed body", err))?;

    if first_byte == Some(0x78) {
        Ok(wrap(ZlibDecoder::new(reader)))
    } else {
        Ok(wrap(DeflateDecoder::new(reader)))
    }
}

fn to_io_stream(
    body: BoxBodyStream,
) -> impl Stream<Item = std::io::Result<Bytes>> + Send + 'static {
    body.map(|item| item.map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err)))
}

fn wrap<R>(decoder: R) -> BoxBodyStream
where
    R: tokio::io::AsyncRead + Send + 'static,
{
    Box::pin(ReaderStream::new(decoder).map(|item| {
        item.map_err(|err| {
            let code = io_error_code(&err);
            let mut fetch_err = FetchError::system_with_cause("decompression failed", err);
            if let Some(code) = code {
                fetch_err = fetch_err.with_code(code);
            }
            fetch_err
        })
    }))
}

/// Maps the `std::io::Error` kinds `async-compression` raises for a
/// corrupt or truncated stream to the zlib error codes they stand in
/// for, so callers see the same `code` a native zlib binding would
/// report (e.g. Node's `Z_DATA_ERROR`).
fn io_error_code(err: &std::io::Error) -> Option<&'static str> {
    match err.kind() {
        std::io::ErrorKind::InvalidData => Some("Z_DATA_ERROR"),
        std::io::ErrorKind::UnexpectedEof => Some("Z_BUF_ERROR"),
        _ => None,
    }
}

/// Peeks the next byte of a buffered async reader without consuming it.
trait PeekByte {
    async fn fill_buf_peek(&mut self) -> std::io::Result<Option<u8>>;
}

impl<R> PeekByte for BufReader<R>
where
    R: tokio::io::AsyncRead + Unpin,
{
    async fn fill_buf_peek(&mut self) -> std::io::Result<Option<u8>> {
        use tokio::io::AsyncBufReadExt;
        let buf = self.fill_buf().await?;
        Ok(buf.first().copied())
    }
}
