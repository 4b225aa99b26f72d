//! Reading image bytes from a local path or a URL, and decoding them.
//!
//! Both backends load through here; they differ only in what they build from
//! the decoded [`DynamicImage`].

use super::backend::{FetchSettings, LoadError};
use image::{DynamicImage, ImageFormat, ImageReader};
use log::{debug, info};
use std::io::{Cursor, Read};
use std::path::Path;

/// Raw bytes plus a human-readable origin for diagnostics.
#[derive(Debug, Clone)]
pub struct SourceBytes {
    pub origin: String,
    pub bytes: Vec<u8>,
}

/// A decoded image together with the container format it came from.
pub struct Decoded {
    pub image: DynamicImage,
    pub format: Option<ImageFormat>,
}

/// Read `source` from disk if it names an existing file, otherwise fetch it
/// with exactly one GET.
pub fn read_source(source: &str, fetch: &FetchSettings) -> Result<SourceBytes, LoadError> {
    let source = source.trim();
    let path = Path::new(source);
    if path.is_file() {
        debug!("Reading local file {}", path.display());
        return Ok(SourceBytes {
            origin: path.display().to_string(),
            bytes: std::fs::read(path)?,
        });
    }
    if !is_url(source) {
        return Err(LoadError::NotFound(source.to_string()));
    }
    fetch_url(source, fetch)
}

fn is_url(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn fetch_url(url: &str, fetch: &FetchSettings) -> Result<SourceBytes, LoadError> {
    info!("Fetching {url}");
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(fetch.connect_timeout)
        .timeout_read(fetch.read_timeout)
        .build();

    let response = match agent.get(url).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(status, _)) => {
            return Err(LoadError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }
        Err(ureq::Error::Transport(transport)) => {
            return Err(LoadError::Transport {
                url: url.to_string(),
                reason: transport.to_string(),
            });
        }
    };

    // ureq treats every 2xx/3xx as success; only 200 carries an image
    if response.status() != 200 {
        return Err(LoadError::HttpStatus {
            url: url.to_string(),
            status: response.status(),
        });
    }

    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|e| LoadError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    debug!("Fetched {} bytes from {url}", bytes.len());
    Ok(SourceBytes {
        origin: url.to_string(),
        bytes,
    })
}

/// Decode bytes, sniffing the format from the content rather than the name.
pub fn decode(source: &SourceBytes) -> Result<Decoded, LoadError> {
    let decode_error = |reason: String| LoadError::Decode {
        origin: source.origin.clone(),
        reason,
    };
    let reader = ImageReader::new(Cursor::new(&source.bytes))
        .with_guessed_format()
        .map_err(|e| decode_error(e.to_string()))?;
    let format = reader.format();
    let image = reader.decode().map_err(|e| decode_error(e.to_string()))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(decode_error("image has no pixels".to_string()));
    }
    info!(
        "Loaded {} ({}x{}, {:?})",
        source.origin,
        image.width(),
        image.height(),
        format
    );
    Ok(Decoded { image, format })
}

/// [`read_source`] followed by [`decode`].
pub fn load_decoded(source: &str, fetch: &FetchSettings) -> Result<Decoded, LoadError> {
    decode(&read_source(source, fetch)?)
}
