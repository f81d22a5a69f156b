//! HTTP downloads with bounded redirect following
//!
//! Redirects are followed by hand so that the hop count can be capped and a
//! failed transfer never leaves a partial file behind.

use crate::{Error, ProgressCallback, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header::LOCATION;
use reqwest::StatusCode;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;
use url::Url;

pub struct Downloader {
    client: Client,
    max_redirects: usize,
}

impl Downloader {
    pub fn new(max_redirects: usize) -> Result<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("tokenuse-shim/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            max_redirects,
        })
    }

    /// Stream `url` into `dest`
    ///
    /// On any failure `dest` is removed before the error is returned.
    pub fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<&ProgressCallback>,
    ) -> Result<()> {
        let result = self.download_inner(url, dest, progress);
        if result.is_err() && dest.exists() {
            let _ = fs::remove_file(dest);
        }
        result
    }

    fn download_inner(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<&ProgressCallback>,
    ) -> Result<()> {
        let mut response = self.get(url)?;
        let total = response.content_length().unwrap_or(0);

        let mut writer = BufWriter::new(File::create(dest)?);
        let mut buffer = vec![0; 8192];
        let mut bytes_written: u64 = 0;

        loop {
            let bytes_read = response
                .read(&mut buffer)
                .map_err(|e| Error::Network(e.to_string()))?;
            if bytes_read == 0 {
                break;
            }
            writer.write_all(&buffer[..bytes_read])?;
            bytes_written += bytes_read as u64;

            if let Some(cb) = progress {
                cb("Downloading", bytes_written, total);
            }
        }

        writer.flush()?;
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;

        debug!(url, bytes = bytes_written, "Download complete");
        Ok(())
    }

    /// Fetch `url` as UTF-8 text
    pub fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.get(url)?;
        response.text().map_err(|e| Error::Network(e.to_string()))
    }

    /// Issue a GET, following 301/302 up to `max_redirects` hops
    ///
    /// Returns the first 2xx response.
    fn get(&self, url: &str) -> Result<Response> {
        let mut current = Url::parse(url).map_err(|e| Error::Network(format!("invalid URL {}: {}", url, e)))?;
        let mut hops = 0;

        loop {
            let response = self
                .client
                .get(current.clone())
                .send()
                .map_err(|e| Error::Network(describe_request_error(&e)))?;

            let status = response.status();
            if status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND {
                if hops >= self.max_redirects {
                    return Err(Error::TooManyRedirects {
                        limit: self.max_redirects,
                    });
                }
                hops += 1;

                let next = redirect_target(&current, &response)?;
                debug!(from = %current, to = %next, status = status.as_u16(), "Following redirect");
                current = next;
                continue;
            }

            if !status.is_success() {
                return Err(Error::DownloadFailed {
                    status: status.as_u16(),
                });
            }

            return Ok(response);
        }
    }
}

/// Resolve the `Location` header against the URL that produced it
fn redirect_target(current: &Url, response: &Response) -> Result<Url> {
    let location = response
        .headers()
        .get(LOCATION)
        .ok_or_else(|| Error::Network(format!("redirect from {} without Location header", current)))?
        .to_str()
        .map_err(|e| Error::Network(format!("invalid Location header: {}", e)))?;

    current
        .join(location)
        .map_err(|e| Error::Network(format!("invalid redirect target {}: {}", location, e)))
}

fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_connect() {
        format!("could not connect: {}", e)
    } else if e.is_timeout() {
        format!("request timed out: {}", e)
    } else {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_download_follows_redirect_chain() {
        let mut server = mockito::Server::new();
        let base = server.url();

        let _hop1 = server
            .mock("GET", "/start")
            .with_status(302)
            .with_header("location", &format!("{}/hop2", base))
            .create();
        let _hop2 = server
            .mock("GET", "/hop2")
            .with_status(301)
            .with_header("location", "/hop3")
            .create();
        let _hop3 = server
            .mock("GET", "/hop3")
            .with_status(302)
            .with_header("location", "final")
            .create();
        let _final = server
            .mock("GET", "/final")
            .with_status(200)
            .with_body("payload bytes")
            .create();

        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("archive.tar.gz");

        let downloader = Downloader::new(10).unwrap();
        downloader
            .download(&format!("{}/start", base), &dest, None)
            .unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "payload bytes");
    }

    #[test]
    fn test_download_404_removes_destination() {
        let mut server = mockito::Server::new();
        let _missing = server.mock("GET", "/missing").with_status(404).create();

        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("archive.tar.gz");
        fs::write(&dest, "stale partial data").unwrap();

        let downloader = Downloader::new(10).unwrap();
        let err = downloader
            .download(&format!("{}/missing", server.url()), &dest, None)
            .unwrap_err();

        assert!(matches!(err, Error::DownloadFailed { status: 404 }));
        assert!(!dest.exists(), "Destination should be removed on failure");
    }

    #[test]
    fn test_download_redirect_loop_is_capped() {
        let mut server = mockito::Server::new();
        let _loop = server
            .mock("GET", "/loop")
            .with_status(302)
            .with_header("location", "/loop")
            .expect(4)
            .create();

        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("archive.tar.gz");

        let downloader = Downloader::new(3).unwrap();
        let err = downloader
            .download(&format!("{}/loop", server.url()), &dest, None)
            .unwrap_err();

        assert!(matches!(err, Error::TooManyRedirects { limit: 3 }));
        assert!(!dest.exists());
    }

    #[test]
    fn test_redirect_without_location() {
        let mut server = mockito::Server::new();
        let _bad = server.mock("GET", "/bad").with_status(301).create();

        let downloader = Downloader::new(10).unwrap();
        let err = downloader
            .fetch_text(&format!("{}/bad", server.url()))
            .unwrap_err();

        assert!(matches!(err, Error::Network(_)));
    }

    #[test]
    fn test_connection_refused_is_network_error() {
        // Bind then drop to get a port nothing listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("archive.tar.gz");

        let downloader = Downloader::new(10).unwrap();
        let err = downloader
            .download(&format!("http://127.0.0.1:{}/file", port), &dest, None)
            .unwrap_err();

        assert!(matches!(err, Error::Network(_)));
        assert!(!dest.exists());
    }

    #[test]
    fn test_fetch_text_follows_redirect() {
        let mut server = mockito::Server::new();
        let _redirect = server
            .mock("GET", "/v1.2.3/checksums.txt")
            .with_status(302)
            .with_header("location", "/assets/checksums.txt")
            .create();
        let _body = server
            .mock("GET", "/assets/checksums.txt")
            .with_status(200)
            .with_body("abc123  tokenuse_1.2.3_linux_amd64.tar.gz\n")
            .create();

        let downloader = Downloader::new(10).unwrap();
        let text = downloader
            .fetch_text(&format!("{}/v1.2.3/checksums.txt", server.url()))
            .unwrap();

        assert!(text.contains("tokenuse_1.2.3_linux_amd64.tar.gz"));
    }

    #[test]
    fn test_fetch_text_server_error() {
        let mut server = mockito::Server::new();
        let _err = server.mock("GET", "/checksums.txt").with_status(503).create();

        let downloader = Downloader::new(10).unwrap();
        let err = downloader
            .fetch_text(&format!("{}/checksums.txt", server.url()))
            .unwrap_err();

        assert!(matches!(err, Error::DownloadFailed { status: 503 }));
    }

    #[test]
    fn test_download_reports_progress() {
        let mut server = mockito::Server::new();
        let body = vec![7u8; 32768];
        let _file = server
            .mock("GET", "/big")
            .with_status(200)
            .with_body(&body)
            .create();

        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("big.bin");

        let last_seen = Arc::new(AtomicU64::new(0));
        let last_seen_clone = last_seen.clone();
        let progress: ProgressCallback = Arc::new(move |_msg, current, _total| {
            last_seen_clone.store(current, Ordering::SeqCst);
        });

        let downloader = Downloader::new(10).unwrap();
        downloader
            .download(&format!("{}/big", server.url()), &dest, Some(&progress))
            .unwrap();

        assert_eq!(last_seen.load(Ordering::SeqCst), 32768);
        assert_eq!(fs::read(&dest).unwrap(), body);
    }
}
