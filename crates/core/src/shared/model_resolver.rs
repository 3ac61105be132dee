use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable pointing at a directory of pre-downloaded models.
pub const MODEL_DIR_ENV: &str = "FACELOCK_MODEL_DIR";

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// A downloadable model file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelAsset {
    pub name: &'static str,
    pub url: &'static str,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Resolve a model file, checking local locations before downloading.
///
/// Resolution order:
/// 1. `$FACELOCK_MODEL_DIR`
/// 2. User cache directory (platform-specific)
/// 3. Bundled directory (development / pre-packaged installs)
/// 4. Download from the asset URL into the cache
pub fn resolve(
    asset: &ModelAsset,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(dir) = std::env::var_os(MODEL_DIR_ENV) {
        let candidate = PathBuf::from(dir).join(asset.name);
        if candidate.exists() {
            return Ok(candidate);
        }
        log::debug!("{} not found in ${MODEL_DIR_ENV}", asset.name);
    }
    resolve_in(asset, &model_cache_dir()?, bundled_dir, progress)
}

fn resolve_in(
    asset: &ModelAsset,
    cache_dir: &Path,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(asset.name);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    if let Some(dir) = bundled_dir {
        let bundled_path = dir.join(asset.name);
        if bundled_path.exists() {
            return Ok(bundled_path);
        }
    }

    log::info!("Downloading {} from {}", asset.name, asset.url);
    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    download(asset.url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/FaceLock/models/`
/// - Linux: `$XDG_CACHE_HOME/FaceLock/models/` or `~/.cache/FaceLock/models/`
/// - Windows: `%LOCALAPPDATA%/FaceLock/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("FaceLock").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("FaceLock").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_inner(url, dest, &temp_path, progress);

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn download_inner(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    let write_err = |source: std::io::Error| ModelResolveError::Write {
        path: temp_path.to_path_buf(),
        source,
    };

    let mut file = fs::File::create(temp_path).map_err(write_err)?;

    // Stream in 1MB chunks; embedding models are >100MB.
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_err)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err)?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEST_ASSET: ModelAsset = ModelAsset {
        name: "test_model.onnx",
        url: "http://invalid.nonexistent.example.com/model.onnx",
    };

    #[test]
    fn test_resolve_prefers_cached_file() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("cache");
        let bundled_dir = tmp.path().join("bundled");
        fs::create_dir_all(&cache_dir).unwrap();
        fs::create_dir_all(&bundled_dir).unwrap();
        fs::write(cache_dir.join(TEST_ASSET.name), b"cached").unwrap();
        fs::write(bundled_dir.join(TEST_ASSET.name), b"bundled").unwrap();

        let path = resolve_in(&TEST_ASSET, &cache_dir, Some(&bundled_dir), None).unwrap();

        assert_eq!(path, cache_dir.join(TEST_ASSET.name));
    }

    #[test]
    fn test_resolve_falls_back_to_bundled_file() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("cache");
        let bundled_dir = tmp.path().join("bundled");
        fs::create_dir_all(&bundled_dir).unwrap();
        fs::write(bundled_dir.join(TEST_ASSET.name), b"bundled").unwrap();

        let path = resolve_in(&TEST_ASSET, &cache_dir, Some(&bundled_dir), None).unwrap();

        assert_eq!(path, bundled_dir.join(TEST_ASSET.name));
        assert!(!cache_dir.exists());
    }

    #[test]
    fn test_resolve_download_failure_leaves_no_file() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("cache");

        let result = resolve_in(&TEST_ASSET, &cache_dir, None, None);

        assert!(matches!(result, Err(ModelResolveError::Download { .. })));
        assert!(!cache_dir.join(TEST_ASSET.name).exists());
        assert!(!cache_dir.join("test_model.part").exists());
    }

    #[test]
    fn test_model_cache_dir_returns_path() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains("FaceLock"));
        assert!(path.to_string_lossy().contains("models"));
    }
}
