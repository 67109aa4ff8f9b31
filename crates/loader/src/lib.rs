//! # Loader
//!
//! Uniform content retrieval for manifests, templates and copy sources.
//!
//! A location string is routed by scheme:
//! - `http://` / `https://` - fetched with ureq
//! - `s3://bucket/key` - fetched over the bucket's HTTPS endpoint, using
//!   `AWS_REGION` / `AWS_DEFAULT_REGION` to pick the region
//! - `file://` - explicit local path
//! - anything else - treated as a local filesystem path
//!
//! Callers get the whole document with [`read`], or a streaming handle
//! with [`reader`] when the content may be large (archive extraction).

mod error;

pub use error::{Error, Result};

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

/// Remote bodies larger than this are refused rather than buffered.
const MAX_BODY_SIZE: u64 = 512 * 1024 * 1024;

/// Read the full content behind a location string.
pub fn read(location: &str) -> Result<Vec<u8>> {
    if location.is_empty() {
        return Err(Error::InvalidLocation(String::new()));
    }
    if is_http(location) {
        return fetch_http(location);
    }
    if let Some(rest) = location.strip_prefix("s3://") {
        return fetch_http(&s3_url(rest)?);
    }
    let path = location.strip_prefix("file://").unwrap_or(location);
    std::fs::read(path).map_err(|e| Error::io(path, e))
}

/// Get a streaming reader for a location.
///
/// Local paths stream from disk; remote content is buffered first, which
/// keeps the HTTP connection handling out of callers' extraction loops.
pub fn reader(location: &str) -> Result<Box<dyn Read + Send>> {
    if is_http(location) || location.starts_with("s3://") {
        return Ok(Box::new(Cursor::new(read(location)?)));
    }
    let path = location.strip_prefix("file://").unwrap_or(location);
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    Ok(Box::new(file))
}

/// The final path component of a location, for log lines and temp names.
pub fn base_name(location: &str) -> String {
    let trimmed = location.trim_end_matches('/');
    Path::new(trimmed)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| trimmed.to_string())
}

fn is_http(location: &str) -> bool {
    let lower = location.get(..4).map(str::to_ascii_lowercase);
    lower.as_deref() == Some("http")
}

fn fetch_http(url: &str) -> Result<Vec<u8>> {
    log::debug!("fetching: {url}");
    let mut response = ureq::get(url)
        .call()
        .map_err(|e| Error::http(url, &e))?;
    response
        .body_mut()
        .with_config()
        .limit(MAX_BODY_SIZE)
        .read_to_vec()
        .map_err(|e| Error::http(url, &e))
}

/// Translate `s3://bucket/key` into the bucket's virtual-hosted URL.
fn s3_url(bucket_and_key: &str) -> Result<String> {
    let (bucket, key) = bucket_and_key
        .split_once('/')
        .filter(|(bucket, key)| !bucket.is_empty() && !key.is_empty())
        .ok_or_else(|| Error::InvalidLocation(format!("s3://{bucket_and_key}")))?;
    let region = std::env::var("AWS_REGION")
        .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
        .unwrap_or_else(|_| "us-east-1".to_string());
    Ok(format!("https://{bucket}.s3.{region}.amazonaws.com/{key}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_local_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"steps: []\n").unwrap();
        let data = read(file.path().to_str().unwrap()).unwrap();
        assert_eq!(data, b"steps: []\n");
    }

    #[test]
    fn test_read_file_scheme() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"explicit").unwrap();
        let location = format!("file://{}", file.path().display());
        assert_eq!(read(&location).unwrap(), b"explicit");
    }

    #[test]
    fn test_read_missing_local_file() {
        assert!(matches!(
            read("/no/such/file/here.yml"),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn test_read_empty_location() {
        assert!(matches!(read(""), Err(Error::InvalidLocation(_))));
    }

    #[test]
    fn test_reader_streams_local_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();
        let mut r = reader(file.path().to_str().unwrap()).unwrap();
        let mut buf = String::new();
        r.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "hello");
    }

    #[test]
    fn test_s3_url_translation() {
        // SAFETY: test-local env mutation
        unsafe { std::env::set_var("AWS_REGION", "eu-west-2") };
        let url = s3_url("my-bucket/path/to/object.yml").unwrap();
        assert_eq!(
            url,
            "https://my-bucket.s3.eu-west-2.amazonaws.com/path/to/object.yml"
        );
    }

    #[test]
    fn test_s3_url_requires_bucket_and_key() {
        assert!(s3_url("bucketonly").is_err());
        assert!(s3_url("/keyonly").is_err());
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("https://host/dir/app.yml"), "app.yml");
        assert_eq!(base_name("/etc/gaffer/config.yml"), "config.yml");
    }
}
