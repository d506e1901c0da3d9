//! Streams a `reqwest::Response` body into bytes, enforcing a hard size
//! cap and decompressing `gzip`/`deflate` as chunks arrive.
//!
//! Grounded on `cyclotron_fetch::first_n_bytes_of_response`'s chunked
//! accumulate-and-bail loop (other_examples/PostHog), generalized with
//! streaming decompression so compressed bytes never count against the
//! cap instead of their larger decompressed form.

use bytes::{Bytes, BytesMut};
use flate2::write::{DeflateDecoder, GzDecoder};
use futures::StreamExt;
use offload_core::{RequestContext, RequestError, RequestErrorKind, ResponseTooLargeError};
use std::io::Write;

/// The `Content-Encoding` values this reader understands. Anything else
/// is treated as identity — the bytes are handed back unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentEncoding {
    Identity,
    Gzip,
    Deflate,
}

impl ContentEncoding {
    fn from_headers(headers: &reqwest::header::HeaderMap) -> Self {
        match headers
            .get(reqwest::header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
        {
            Some("gzip") => ContentEncoding::Gzip,
            Some("deflate") => ContentEncoding::Deflate,
            _ => ContentEncoding::Identity,
        }
    }
}

/// The outcome of reading a body: either bytes too large, or a
/// transport-level read failure (premature EOF, underlying stream
/// error).
pub enum ReaderError {
    TooLarge(ResponseTooLargeError),
    Transport(RequestError),
}

/// Reads a response body up to `max_bytes`, decompressing as configured.
pub struct ResponseReader {
    max_bytes: u64,
}

impl ResponseReader {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub async fn read(
        &self,
        response: reqwest::Response,
        context: &RequestContext,
    ) -> Result<Bytes, ReaderError> {
        let encoding = ContentEncoding::from_headers(response.headers());
        let mut stream = response.bytes_stream();

        match encoding {
            ContentEncoding::Identity => self.read_identity(&mut stream, context).await,
            ContentEncoding::Gzip => {
                self.read_compressed(&mut stream, context, GzDecoder::new(Vec::new()))
                    .await
            }
            ContentEncoding::Deflate => {
                self.read_compressed(&mut stream, context, DeflateDecoder::new(Vec::new()))
                    .await
            }
        }
    }

    async fn read_identity(
        &self,
        stream: &mut (impl futures::Stream<Item = reqwest::Result<Bytes>> + Unpin),
        context: &RequestContext,
    ) -> Result<Bytes, ReaderError> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| transport_error(e, context))?;
            buffer.extend_from_slice(&chunk);
            if buffer.len() as u64 > self.max_bytes {
                return Err(ReaderError::TooLarge(ResponseTooLargeError {
                    limit: self.max_bytes,
                    context: context.clone(),
                }));
            }
        }
        Ok(buffer.freeze())
    }

    async fn read_compressed<D: DecoderSink>(
        &self,
        stream: &mut (impl futures::Stream<Item = reqwest::Result<Bytes>> + Unpin),
        context: &RequestContext,
        mut decoder: D,
    ) -> Result<Bytes, ReaderError> {
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| transport_error(e, context))?;
            decoder.write_all(&chunk).map_err(|e| {
                transport_error_from_io(e, context)
            })?;
            if decoder.decoded_len() as u64 > self.max_bytes {
                return Err(ReaderError::TooLarge(ResponseTooLargeError {
                    limit: self.max_bytes,
                    context: context.clone(),
                }));
            }
        }
        let bytes = decoder
            .finish()
            .map_err(|e| transport_error_from_io(e, context))?;
        Ok(Bytes::from(bytes))
    }
}

/// Bridges `flate2`'s two decoder types to a common "how many decoded
/// bytes so far, and hand me the final buffer" surface.
trait DecoderSink: Write {
    fn decoded_len(&self) -> usize;
    fn finish(self) -> std::io::Result<Vec<u8>>;
}

impl DecoderSink for GzDecoder<Vec<u8>> {
    fn decoded_len(&self) -> usize {
        self.get_ref().len()
    }

    fn finish(self) -> std::io::Result<Vec<u8>> {
        self.finish()
    }
}

impl DecoderSink for DeflateDecoder<Vec<u8>> {
    fn decoded_len(&self) -> usize {
        self.get_ref().len()
    }

    fn finish(self) -> std::io::Result<Vec<u8>> {
        self.finish()
    }
}

fn transport_error(err: reqwest::Error, context: &RequestContext) -> ReaderError {
    ReaderError::Transport(RequestError {
        kind: RequestErrorKind::Io,
        message: err.to_string(),
        context: context.clone(),
    })
}

fn transport_error_from_io(err: std::io::Error, context: &RequestContext) -> ReaderError {
    ReaderError::Transport(RequestError {
        kind: RequestErrorKind::Io,
        message: err.to_string(),
        context: context.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use offload_core::Method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ctx() -> RequestContext {
        RequestContext {
            method: Method::Get,
            url: "https://example.com".to_string(),
            callback_args: None,
        }
    }

    #[tokio::test]
    async fn reads_an_identity_body_within_the_limit() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello world".to_vec()))
            .mount(&server)
            .await;

        let response = reqwest::get(server.uri()).await.unwrap();
        let reader = ResponseReader::new(1024);
        let bytes = reader.read(response, &ctx()).await.ok().unwrap();
        assert_eq!(bytes, Bytes::from_static(b"hello world"));
    }

    #[tokio::test]
    async fn rejects_a_body_over_the_limit() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 2048]))
            .mount(&server)
            .await;

        let response = reqwest::get(server.uri()).await.unwrap();
        let reader = ResponseReader::new(16);
        let err = reader.read(response, &ctx()).await.err().unwrap();
        assert!(matches!(err, ReaderError::TooLarge(_)));
    }

    #[tokio::test]
    async fn decompresses_gzip_before_applying_the_limit() {
        use std::io::Write as _;
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&vec![b'a'; 5000]).unwrap();
        let compressed = encoder.finish().unwrap();
        assert!(compressed.len() < 5000);

        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-encoding", "gzip")
                    .set_body_bytes(compressed),
            )
            .mount(&server)
            .await;

        let response = reqwest::get(server.uri()).await.unwrap();
        let reader = ResponseReader::new(10_000);
        let bytes = reader.read(response, &ctx()).await.ok().unwrap();
        assert_eq!(bytes.len(), 5000);
    }
}
