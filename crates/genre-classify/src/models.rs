//! Model artifact location and download
//!
//! The classifier is a single ONNX file. By default it lives in
//! `<cache_dir>/genre-classifier/models/`; a configured download URL is used
//! to fetch it when missing.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use genre_core::{ClassifyError, Result};

use crate::config::APP_NAME;

/// Cached artifact filename
pub const MODEL_FILENAME: &str = "genre-classifier.onnx";

/// Resolves (and optionally downloads) the model artifact
pub struct ModelStore {
    cache_dir: PathBuf,
}

impl ModelStore {
    /// Create with default cache directory: `<cache_dir>/genre-classifier/models/`
    pub fn new() -> Result<Self> {
        let base = dirs::cache_dir().ok_or_else(|| {
            ClassifyError::Initialization("Could not determine cache directory".to_string())
        })?;
        Ok(Self {
            cache_dir: base.join(APP_NAME).join("models"),
        })
    }

    /// Create with a custom cache directory (for testing)
    pub fn with_cache_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Default artifact path inside the cache
    pub fn default_model_path(&self) -> PathBuf {
        self.cache_dir.join(MODEL_FILENAME)
    }

    /// Return a usable model path, downloading it if necessary.
    ///
    /// `configured` overrides the cache location. A missing artifact with no
    /// `download_url` is an initialization error.
    pub fn ensure_model(
        &self,
        configured: Option<&Path>,
        download_url: Option<&str>,
    ) -> Result<PathBuf> {
        let model_path = configured
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.default_model_path());

        if model_path.exists() {
            log::info!("Genre model found at {:?}", model_path);
            return Ok(model_path);
        }

        match download_url {
            Some(url) => {
                log::info!("Downloading genre model from {}", url);
                download_file(url, &model_path)?;
                Ok(model_path)
            }
            None => Err(ClassifyError::Initialization(format!(
                "Model not found: {:?} (no download URL configured)",
                model_path
            ))),
        }
    }
}

/// Download `url` to `target_path` via a temp file and atomic rename.
///
/// The temp file is removed on every failure.
fn download_file(url: &str, target_path: &Path) -> Result<()> {
    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ClassifyError::Initialization(format!("Failed to create model dir: {}", e))
        })?;
    }

    let response = ureq::get(url)
        .call()
        .map_err(|e| {
            ClassifyError::Initialization(format!("Download failed for {}: {}", url, e))
        })?;

    let content_length: Option<u64> = response
        .header("Content-Length")
        .and_then(|s| s.parse().ok());

    let temp_path = target_path.with_extension("tmp");
    let written = match write_body(response.into_reader(), &temp_path, content_length) {
        Ok(written) => written,
        Err(e) => {
            fs::remove_file(&temp_path).ok();
            return Err(e);
        }
    };

    if let Err(e) = fs::rename(&temp_path, target_path) {
        fs::remove_file(&temp_path).ok();
        return Err(ClassifyError::Initialization(format!("Rename failed: {}", e)));
    }

    log::info!("Downloaded genre model to {:?} ({} bytes)", target_path, written);
    Ok(())
}

/// Stream a response body into `temp_path`, checking its length
fn write_body(mut reader: impl Read, temp_path: &Path, expected: Option<u64>) -> Result<u64> {
    let mut file = fs::File::create(temp_path).map_err(|e| {
        ClassifyError::Initialization(format!("Failed to create temp file: {}", e))
    })?;

    let mut buffer = [0u8; 8192];
    let mut written = 0u64;
    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| ClassifyError::Initialization(format!("Read error: {}", e)))?;
        if bytes_read == 0 {
            break;
        }
        file.write_all(&buffer[..bytes_read])
            .map_err(|e| ClassifyError::Initialization(format!("Write error: {}", e)))?;
        written += bytes_read as u64;
    }
    file.flush()
        .map_err(|e| ClassifyError::Initialization(format!("Flush error: {}", e)))?;

    if let Some(expected) = expected {
        if written != expected {
            return Err(ClassifyError::Initialization(format!(
                "Download incomplete: expected {} bytes, got {}",
                expected, written
            )));
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_path_in_cache_dir() {
        let store = ModelStore::with_cache_dir("/tmp/genre-models".into());
        assert_eq!(
            store.default_model_path(),
            PathBuf::from("/tmp/genre-models").join(MODEL_FILENAME)
        );
    }

    #[test]
    fn test_existing_configured_path_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("custom.onnx");
        std::fs::write(&model, b"onnx").unwrap();

        let store = ModelStore::with_cache_dir(dir.path().join("cache"));
        assert_eq!(store.ensure_model(Some(model.as_path()), None).unwrap(), model);
    }

    #[test]
    fn test_write_body_checks_length() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("model.tmp");

        let written = write_body(&b"0123456789"[..], &temp, Some(10)).unwrap();
        assert_eq!(written, 10);
        assert_eq!(std::fs::read(&temp).unwrap(), b"0123456789");

        let err = write_body(&b"01234"[..], &temp, Some(10)).unwrap_err();
        assert!(err.to_string().contains("expected 10 bytes, got 5"));
    }

    #[test]
    fn test_interrupted_download_leaves_no_temp_file() {
        // Serves a truncated body: headers promise more bytes than are sent
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request);
            let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\nonnx");
        });

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("models").join(MODEL_FILENAME);
        let err = download_file(&format!("http://{}/model.onnx", addr), &target).unwrap_err();
        server.join().unwrap();

        assert_eq!(err.kind(), genre_core::ErrorKind::Initialization);
        assert!(!target.exists());
        assert!(!target.with_extension("tmp").exists(), "temp file must be removed");
    }

    #[test]
    fn test_missing_model_without_url_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::with_cache_dir(dir.path().to_path_buf());
        let err = store.ensure_model(None, None).unwrap_err();
        assert_eq!(err.kind(), genre_core::ErrorKind::Initialization);
    }
}
