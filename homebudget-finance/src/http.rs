//! Shared HTTP client with a bounded timeout and retries for transient failures.

use homebudget_core::{HomebudgetError, Result};
use reqwest::{Client, StatusCode};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout: Duration,
    /// Total attempts per request, including the first one
    pub max_attempts: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    max_attempts: u32,
}

impl HttpClient {
    pub fn new(settings: HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| HomebudgetError::fetch(format!("failed to create HTTP client: {e}"), false))?;

        Ok(Self {
            client,
            max_attempts: settings.max_attempts.max(1),
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// GET `url` and return the body, retrying timeouts, connection failures
    /// and 5xx/429 responses.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let mut attempt = 1;
        loop {
            match self.get_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    log::warn!("GET {url} failed (attempt {attempt}/{}): {e}", self.max_attempts);
                    tokio::time::sleep(backoff(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_once(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(url).send().await.map_err(request_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HomebudgetError::fetch(
                format!("GET {url} returned {status}"),
                is_retryable_status(status),
            ));
        }

        let body = resp.bytes().await.map_err(request_error)?;
        Ok(body.to_vec())
    }
}

fn request_error(e: reqwest::Error) -> HomebudgetError {
    let retryable = e.is_timeout() || e.is_connect();
    HomebudgetError::fetch(format!("HTTP request failed: {e}"), retryable)
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(500 * u64::from(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `statuses` in order (repeating the last one), one connection per
    /// request. Returns the base URL and the number of requests seen.
    async fn serve(statuses: &'static [u16]) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let n = seen.fetch_add(1, Ordering::SeqCst);
                let status = statuses[n.min(statuses.len() - 1)];

                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(read) => buf.extend_from_slice(&chunk[..read]),
                    }
                }

                let body = format!("status {status}");
                let resp = format!(
                    "HTTP/1.1 {status} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (format!("http://{addr}/daily"), hits)
    }

    fn client(max_attempts: u32) -> HttpClient {
        HttpClient::new(HttpSettings {
            timeout: Duration::from_secs(5),
            max_attempts,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let (url, hits) = serve(&[503, 200]).await;

        let body = client(3).get_bytes(&url).await.unwrap();

        assert_eq!(body, b"status 200");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let (url, hits) = serve(&[404]).await;

        let err = client(3).get_bytes(&url).await.unwrap_err();

        assert!(matches!(err, HomebudgetError::Fetch { retryable: false, .. }));
        assert!(!err.is_retryable());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let (url, hits) = serve(&[502]).await;

        let err = client(2).get_bytes(&url).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_attempts_never_zero() {
        let client = HttpClient::new(HttpSettings {
            timeout: Duration::from_secs(1),
            max_attempts: 0,
        })
        .unwrap();
        assert_eq!(client.max_attempts(), 1);
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::FORBIDDEN));
    }

    #[test]
    fn test_backoff_grows() {
        assert!(backoff(2) > backoff(1));
    }
}
