// src/utils/http.rs

//! HTTP fetch layer.
//!
//! Every request against the catalog goes through [`HttpFetcher`], which
//! spaces requests by the configured delay, retries non-200 responses and
//! decodes bodies as UTF-8 whatever charset the server declares.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{AppError, CrawlContext, Result};
use crate::models::CrawlerConfig;

/// Source of catalog pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return its body. `context` names the crawl target
    /// for error attribution.
    async fn fetch(&self, url: &str, context: &CrawlContext) -> Result<String>;
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Enforces a minimum spacing between request starts.
#[derive(Debug)]
pub struct RequestPacer {
    delay: Duration,
    last: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last: Mutex::new(None),
        }
    }

    /// Wait until `delay` has passed since the previous request started.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.delay).await;
        }
        *last = Some(Instant::now());
    }
}

/// Paced, retrying GET fetcher.
pub struct HttpFetcher {
    client: reqwest::Client,
    pacer: RequestPacer,
    max_attempts: u32,
}

impl HttpFetcher {
    /// Build a fetcher with its own client from crawler settings.
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self::with_client(create_async_client(config)?, config))
    }

    pub fn with_client(client: reqwest::Client, config: &CrawlerConfig) -> Self {
        Self {
            client,
            pacer: RequestPacer::new(Duration::from_millis(config.request_delay_ms)),
            max_attempts: config.max_attempts.max(1),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, context: &CrawlContext) -> Result<String> {
        let mut last_status = None;

        for attempt in 1..=self.max_attempts {
            self.pacer.wait().await;

            // Transport errors are terminal for this URL; only bad statuses retry.
            let transport = |e: reqwest::Error| {
                AppError::crawl(
                    "Request failed",
                    context.clone().attempts(attempt).cause(e),
                )
            };

            let response = self.client.get(url).send().await.map_err(transport)?;
            let status = response.status();

            if status == StatusCode::OK {
                let bytes = response.bytes().await.map_err(transport)?;
                return Ok(String::from_utf8_lossy(&bytes).into_owned());
            }

            log::warn!(
                "{} returned {} (attempt {}/{})",
                url,
                status,
                attempt,
                self.max_attempts
            );
            last_status = Some(status);
        }

        let mut context = context.clone().attempts(self.max_attempts);
        if let Some(status) = last_status {
            context = context.cause(format!("last status {status}"));
        }
        Err(AppError::crawl("Failed to get page", context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_config(max_attempts: u32) -> CrawlerConfig {
        CrawlerConfig {
            request_delay_ms: 1,
            max_attempts,
            ..CrawlerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/main.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&fast_config(3)).unwrap();
        let body = fetcher
            .fetch(&format!("{}/main.php", server.uri()), &CrawlContext::new())
            .await
            .unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_retries_non_200_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&fast_config(5)).unwrap();
        let body = fetcher
            .fetch(&format!("{}/flaky", server.uri()), &CrawlContext::new())
            .await
            .unwrap();
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_exhausted_attempts_carry_target() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&fast_config(3)).unwrap();
        let err = fetcher
            .fetch(
                &format!("{}/down", server.uri()),
                &CrawlContext::new().dept("571"),
            )
            .await
            .unwrap_err();

        assert!(err.is_recoverable());
        let ctx = err.context().unwrap();
        assert_eq!(ctx.dept_code.as_deref(), Some("571"));
        assert_eq!(ctx.attempts, Some(3));
    }

    #[tokio::test]
    async fn test_transport_error_is_not_retried() {
        // Nothing listens on the discard port
        let fetcher = HttpFetcher::new(&fast_config(10)).unwrap();
        let err = fetcher
            .fetch("http://127.0.0.1:9/", &CrawlContext::new().course("5710111"))
            .await
            .unwrap_err();

        let ctx = err.context().unwrap();
        assert_eq!(ctx.attempts, Some(1));
        assert_eq!(ctx.course_code.as_deref(), Some("5710111"));
    }

    #[tokio::test]
    async fn test_body_decoded_as_utf8_despite_declared_charset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tr"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=iso-8859-9")
                    .set_body_bytes("Bilgisayar Mühendisliği".as_bytes()),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&fast_config(1)).unwrap();
        let body = fetcher
            .fetch(&format!("{}/tr", server.uri()), &CrawlContext::new())
            .await
            .unwrap();
        assert_eq!(body, "Bilgisayar Mühendisliği");
    }

    #[tokio::test]
    async fn test_pacer_spaces_requests() {
        let pacer = RequestPacer::new(Duration::from_millis(30));
        let start = Instant::now();
        pacer.wait().await;
        pacer.wait().await;
        pacer.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(60));
    }
}
