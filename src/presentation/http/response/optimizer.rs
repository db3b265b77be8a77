use super::compression::{ContentEncoding, accepted_encodings, compress_best, compression_ratio};
use crate::domain::shared::pagination::{PaginatedResponse, calculate_pagination};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::header::{CACHE_CONTROL, CONTENT_ENCODING, CONTENT_TYPE, ETAG, VARY};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, warn};

pub const X_ORIGINAL_SIZE: HeaderName = HeaderName::from_static("x-original-size");
pub const X_COMPRESSED_SIZE: HeaderName = HeaderName::from_static("x-compressed-size");
pub const X_COMPRESSION_RATIO: HeaderName = HeaderName::from_static("x-compression-ratio");

#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    pub compression_enabled: bool,

    /// Payloads smaller than this many bytes are sent as-is
    pub threshold: usize,

    pub default_cache_control: String,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            compression_enabled: true,
            threshold: 1024,
            default_cache_control: "public, max-age=300".to_string(),
        }
    }
}

/// Per-response knobs.
#[derive(Debug, Clone)]
pub struct ResponseOptions {
    pub status: StatusCode,
    pub cache_control: Option<String>,

    /// Caller-supplied validator. When absent a weak size-derived tag is used.
    pub etag: Option<String>,

    /// Codings the client accepts, in preference order
    pub accepted: Vec<ContentEncoding>,
}

impl Default for ResponseOptions {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            cache_control: None,
            etag: None,
            accepted: Vec::new(),
        }
    }
}

impl ResponseOptions {
    /// Options negotiated from the request's `Accept-Encoding`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            accepted: accepted_encodings(headers),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    pub fn with_etag(mut self, value: impl Into<String>) -> Self {
        self.etag = Some(value.into());
        self
    }
}

/// A serialized payload plus the headers describing it.
#[derive(Debug, Clone)]
pub struct OptimizedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub encoding: Option<ContentEncoding>,
    pub original_size: usize,
    pub compressed_size: Option<usize>,
}

impl OptimizedResponse {
    pub fn is_compressed(&self) -> bool {
        self.encoding.is_some()
    }
}

impl IntoResponse for OptimizedResponse {
    fn into_response(self) -> Response {
        (self.status, self.headers, self.body).into_response()
    }
}

/// True iff the request accepts a coding the optimizer can produce.
pub fn supports_compression(headers: &HeaderMap) -> bool {
    !accepted_encodings(headers).is_empty()
}

/// Quoted SHA-256 of the literal content.
pub fn generate_etag(content: &[u8]) -> String {
    format!("\"{:x}\"", Sha256::digest(content))
}

/// Weak validator derived from the output size only.
///
/// Two different payloads of the same size share this tag; callers that need
/// a real validator pass one through [`ResponseOptions::etag`].
fn size_etag(size: usize) -> String {
    format!("W/\"{:x}\"", size)
}

/// Serializes, negotiates compression and attaches cache headers.
#[derive(Debug, Clone, Default)]
pub struct ResponseOptimizer {
    config: OptimizerConfig,
}

impl ResponseOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub async fn optimize_response<T: Serialize>(
        &self,
        data: &T,
        options: ResponseOptions,
    ) -> OptimizedResponse {
        let payload = match serde_json::to_vec(data) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "Failed to serialize response payload");
                return self.serialization_failure();
            }
        };
        let original_size = payload.len();

        let compressed = if self.config.compression_enabled
            && original_size >= self.config.threshold
            && !options.accepted.is_empty()
        {
            let accepted = options.accepted.clone();
            let input = payload.clone();
            match tokio::task::spawn_blocking(move || compress_best(&input, &accepted)).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "Compression task failed, sending uncompressed");
                    None
                }
            }
        } else {
            None
        };

        let (body, encoding) = match compressed {
            Some((encoding, bytes)) => (Bytes::from(bytes), Some(encoding)),
            None => (Bytes::from(payload), None),
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let cache_control = options
            .cache_control
            .as_deref()
            .unwrap_or(&self.config.default_cache_control);
        insert(&mut headers, CACHE_CONTROL, cache_control);

        let etag = options.etag.unwrap_or_else(|| size_etag(body.len()));
        insert(&mut headers, ETAG, &etag);

        headers.insert(VARY, HeaderValue::from_static("Accept-Encoding"));
        headers.insert(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        );
        headers.insert(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        );

        let compressed_size = encoding.map(|_| body.len());
        if let Some(encoding) = encoding {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static(encoding.as_str()));
            headers.insert(X_ORIGINAL_SIZE, HeaderValue::from(original_size));
            headers.insert(X_COMPRESSED_SIZE, HeaderValue::from(body.len()));
            insert(
                &mut headers,
                X_COMPRESSION_RATIO,
                &format!("{:.2}", compression_ratio(original_size, body.len())),
            );

            debug!(
                %encoding,
                original_size,
                compressed_size = body.len(),
                "Response compressed"
            );
        }

        OptimizedResponse {
            status: options.status,
            headers,
            body,
            encoding,
            original_size,
            compressed_size,
        }
    }

    /// Wraps one page of `data` in a `{data, pagination}` envelope.
    pub async fn create_paginated_response<T: Serialize>(
        &self,
        data: Vec<T>,
        page: i64,
        limit: i64,
        total: i64,
        options: ResponseOptions,
    ) -> OptimizedResponse {
        let envelope = PaginatedResponse {
            data,
            pagination: calculate_pagination(page, limit, total),
        };
        self.optimize_response(&envelope, options).await
    }

    fn serialization_failure(&self) -> OptimizedResponse {
        let body = Bytes::from_static(br#"{"error":"Failed to serialize response"}"#);
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

        OptimizedResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            headers,
            original_size: body.len(),
            body,
            encoding: None,
            compressed_size: None,
        }
    }
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => warn!(header = %name, "Dropping header with invalid value"),
    }
}
