use crate::error::OpsError;
use flate2::Compression;
use flate2::write::GzEncoder;
use http::HeaderMap;
use http::header::ACCEPT_ENCODING;
use std::io::Write;
use tracing::warn;

const BROTLI_BUFFER_SIZE: usize = 4096;
const BROTLI_QUALITY: u32 = 9;
const BROTLI_LG_WINDOW: u32 = 22;

/// Brotli must come in under this share of the input or gzip is tried too.
const BROTLI_MARGIN: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Brotli,
    Gzip,
}

impl ContentEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentEncoding::Brotli => "br",
            ContentEncoding::Gzip => "gzip",
        }
    }
}

impl std::fmt::Display for ContentEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Algorithms the client accepts, in server preference order.
///
/// A coding listed with `q=0` is refused; `*` admits any coding not named
/// explicitly.
pub fn accepted_encodings(headers: &HeaderMap) -> Vec<ContentEncoding> {
    let mut brotli = None;
    let mut gzip = None;
    let mut wildcard = None;

    for value in headers.get_all(ACCEPT_ENCODING) {
        let Ok(value) = value.to_str() else {
            continue;
        };

        for item in value.split(',') {
            let mut parts = item.split(';');
            let coding = parts.next().unwrap_or("").trim().to_ascii_lowercase();
            let acceptable = parts
                .filter_map(|p| p.trim().strip_prefix("q="))
                .filter_map(|q| q.trim().parse::<f32>().ok())
                .last()
                .is_none_or(|q| q > 0.0);

            match coding.as_str() {
                "br" => brotli = Some(acceptable),
                "gzip" | "x-gzip" => gzip = Some(acceptable),
                "*" => wildcard = Some(acceptable),
                _ => {}
            }
        }
    }

    let wildcard = wildcard.unwrap_or(false);
    let mut accepted = Vec::with_capacity(2);
    if brotli.unwrap_or(wildcard) {
        accepted.push(ContentEncoding::Brotli);
    }
    if gzip.unwrap_or(wildcard) {
        accepted.push(ContentEncoding::Gzip);
    }
    accepted
}

pub fn brotli_compress(data: &[u8]) -> Result<Vec<u8>, OpsError> {
    let mut writer = brotli::CompressorWriter::new(
        Vec::with_capacity(data.len() / 2),
        BROTLI_BUFFER_SIZE,
        BROTLI_QUALITY,
        BROTLI_LG_WINDOW,
    );
    writer
        .write_all(data)
        .map_err(|e| OpsError::Compression(format!("brotli: {}", e)))?;
    Ok(writer.into_inner())
}

pub fn gzip_compress(data: &[u8]) -> Result<Vec<u8>, OpsError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| OpsError::Compression(format!("gzip: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| OpsError::Compression(format!("gzip finalization: {}", e)))
}

/// Picks the encoded form to send, if any.
///
/// Brotli is tried first when accepted. If it fails or does not beat the input
/// by a clear margin, gzip is tried as well and the smaller of the two wins.
/// Nothing is returned unless the winner is strictly smaller than `data`.
pub fn compress_best(data: &[u8], accepted: &[ContentEncoding]) -> Option<(ContentEncoding, Vec<u8>)> {
    let mut best: Option<(ContentEncoding, Vec<u8>)> = None;

    if accepted.contains(&ContentEncoding::Brotli) {
        match brotli_compress(data) {
            Ok(out) if (out.len() as f64) < data.len() as f64 * BROTLI_MARGIN => {
                return Some((ContentEncoding::Brotli, out));
            }
            Ok(out) => best = Some((ContentEncoding::Brotli, out)),
            Err(e) => warn!(error = %e, "Brotli compression failed, trying gzip"),
        }
    }

    if accepted.contains(&ContentEncoding::Gzip) {
        match gzip_compress(data) {
            Ok(out) => {
                let smaller = best.as_ref().is_none_or(|(_, b)| out.len() < b.len());
                if smaller {
                    best = Some((ContentEncoding::Gzip, out));
                }
            }
            Err(e) => warn!(error = %e, "Gzip compression failed"),
        }
    }

    best.filter(|(_, out)| out.len() < data.len())
}

/// Percentage of bytes saved.
pub fn compression_ratio(original: usize, compressed: usize) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (1.0 - compressed as f64 / original as f64) * 100.0
}
