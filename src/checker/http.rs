// src/checker/http.rs
// =============================================================================
// This module checks if URLs are alive by making HTTP requests.
//
// Key functionality:
// - Makes HTTP HEAD requests (lightweight, no body download), following
//   redirects
// - Classifies the outcome as OK / WARNING / BROKEN / ERROR
// - Checks each unique URL exactly once, with bounded parallelism
//
// Classification is split into two pure functions, one for status codes and
// one for failure kinds, so the rules can be tested without a network.
// =============================================================================

use crate::crawl::DiscoveredLink;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinError;
use tracing::{debug, info};

const MAX_REDIRECTS: usize = 10;

// Outcome category of a liveness check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LinkStatus {
    /// 200 OK
    Ok,
    /// Redirect left unresolved, odd status code, or redirect loop
    Warning,
    /// 4xx, 5xx, or the host could not be reached
    Broken,
    /// Timeout or an unexpected failure
    Error,
    /// No check was performed for this URL
    Unknown,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Ok => "OK",
            LinkStatus::Warning => "WARNING",
            LinkStatus::Broken => "BROKEN",
            LinkStatus::Error => "ERROR",
            LinkStatus::Unknown => "UNKNOWN",
        }
    }
}

// The result of checking a single URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub status: LinkStatus,
    /// HTTP status code, when a response was received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    pub message: String,
}

impl Verification {
    fn new(status: LinkStatus, code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// Placeholder for a URL that was never checked
    pub fn unknown() -> Self {
        Self::new(LinkStatus::Unknown, None, "Not verified")
    }
}

// Why a request failed without producing a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    /// DNS failure, connection refused, host unreachable
    Connect,
    TooManyRedirects,
    Other(String),
}

impl From<&reqwest::Error> for FailureKind {
    fn from(error: &reqwest::Error) -> Self {
        // A connect timeout is both is_timeout() and is_connect(); report it
        // as a timeout
        if error.is_timeout() {
            FailureKind::Timeout
        } else if error.is_connect() {
            FailureKind::Connect
        } else if error.is_redirect() {
            FailureKind::TooManyRedirects
        } else {
            FailureKind::Other(error.to_string())
        }
    }
}

// Settings for the verification stage
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// How many checks may be in flight at once
    pub max_workers: usize,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            max_workers: 10,
            timeout: Duration::from_secs(10),
        }
    }
}

// Output of the verification stage
#[derive(Debug, Default)]
pub struct VerificationReport {
    /// One entry per unique URL
    pub results: HashMap<String, Verification>,
    /// The discovered links grouped by their target URL
    pub by_url: BTreeMap<String, Vec<DiscoveredLink>>,
}

impl VerificationReport {
    /// Result for a URL, or UNKNOWN if it was never checked
    pub fn get(&self, url: &str) -> Verification {
        self.results
            .get(url)
            .cloned()
            .unwrap_or_else(Verification::unknown)
    }
}

/// Maps a final HTTP status code to a verification result
pub fn classify_status(code: u16, final_url: &str) -> Verification {
    match code {
        200 => Verification::new(LinkStatus::Ok, Some(code), "URL is accessible"),
        300..=399 => Verification::new(
            LinkStatus::Warning,
            Some(code),
            format!("Redirects to {}", final_url),
        ),
        400..=499 => Verification::new(
            LinkStatus::Broken,
            Some(code),
            "Client error (page not found or forbidden)",
        ),
        500..=599 => Verification::new(LinkStatus::Broken, Some(code), "Server error"),
        _ => Verification::new(
            LinkStatus::Warning,
            Some(code),
            format!("Unexpected status code: {}", code),
        ),
    }
}

/// Maps a request failure to a verification result
pub fn classify_failure(kind: FailureKind) -> Verification {
    match kind {
        FailureKind::Timeout => Verification::new(LinkStatus::Error, None, "Request timed out"),
        FailureKind::Connect => Verification::new(LinkStatus::Broken, None, "Connection failed"),
        FailureKind::TooManyRedirects => {
            Verification::new(LinkStatus::Warning, None, "Too many redirects")
        }
        FailureKind::Other(description) => {
            Verification::new(LinkStatus::Error, None, format!("Error: {}", description))
        }
    }
}

// Builds the HTTP client shared by every check
//
// Client is cheap to clone (it's an Arc internally), so every task gets its
// own handle to the same connection pool.
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
}

/// Checks a single URL with a HEAD request
pub async fn verify_url(client: &Client, url: &str) -> Verification {
    match client.head(url).send().await {
        Ok(response) => classify_status(response.status().as_u16(), response.url().as_str()),
        Err(e) => {
            debug!(url, error = %e, "liveness check failed");
            classify_failure(FailureKind::from(&e))
        }
    }
}

// Groups links by target URL, keeping every original entry
pub fn group_by_url(links: &[DiscoveredLink]) -> BTreeMap<String, Vec<DiscoveredLink>> {
    let mut groups: BTreeMap<String, Vec<DiscoveredLink>> = BTreeMap::new();
    for link in links {
        groups.entry(link.url.clone()).or_default().push(link.clone());
    }
    groups
}

// Verifies every unique URL among the discovered links
pub async fn verify_links(
    links: &[DiscoveredLink],
    options: &VerifyOptions,
) -> reqwest::Result<VerificationReport> {
    let client = build_client(options.timeout)?;
    let by_url = group_by_url(links);

    info!("Verifying {} unique URLs...", by_url.len());

    let urls: Vec<String> = by_url.keys().cloned().collect();
    let results = run_checks(urls, options.max_workers, move |url| {
        let client = client.clone();
        async move { verify_url(&client, &url).await }
    })
    .await;

    Ok(VerificationReport { results, by_url })
}

// Runs `check` once per URL on a bounded pool
//
// Each check runs in its own task so a panic inside one check surfaces as a
// JoinError, which becomes an ERROR result instead of tearing down the batch.
// Up to `max_workers` checks run at once; results arrive in completion order.
async fn run_checks<F, Fut>(
    urls: Vec<String>,
    max_workers: usize,
    check: F,
) -> HashMap<String, Verification>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Verification> + Send + 'static,
{
    let total = urls.len();
    let checks = urls.into_iter().map(|url| {
        let handle = tokio::spawn(check(url.clone()));
        async move { settle(url, handle.await) }
    });

    let mut results = HashMap::with_capacity(total);
    let mut completed = stream::iter(checks).buffer_unordered(max_workers.max(1));

    while let Some((url, verification)) = completed.next().await {
        info!(
            "[{}/{}] Checking {}...",
            results.len() + 1,
            total,
            truncate(&url, 80)
        );
        results.insert(url, verification);
    }

    results
}

// Turns a finished check task into its result; a panicked task is an ERROR
fn settle(url: String, outcome: Result<Verification, JoinError>) -> (String, Verification) {
    let verification = match outcome {
        Ok(verification) => verification,
        Err(e) => Verification::new(LinkStatus::Error, None, format!("Error: {}", e)),
    };
    (url, verification)
}

// Shortens a string to at most `max` characters
fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((index, _)) => &s[..index],
        None => s,
    }
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why HEAD and not GET?
//    - We only need the status line, not the page body
//    - Some servers answer HEAD with 405; those show up as BROKEN, which is
//      how the report has always treated them
//
// 2. Why can a followed redirect still give a 3xx?
//    - reqwest stops following when there is no Location header, and then
//      hands us the 3xx response itself
//
// 3. What is buffer_unordered?
//    - Runs up to N futures at once and yields results as they complete
//    - It's like a worker pool where each worker takes the next URL
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_options() -> VerifyOptions {
        VerifyOptions {
            max_workers: 4,
            timeout: Duration::from_millis(500),
        }
    }

    #[test]
    fn test_classify_status_codes() {
        let ok = classify_status(200, "https://example.com/");
        assert_eq!(ok.status, LinkStatus::Ok);
        assert_eq!(ok.code, Some(200));
        assert_eq!(ok.message, "URL is accessible");

        let redirect = classify_status(301, "https://example.com/new");
        assert_eq!(redirect.status, LinkStatus::Warning);
        assert_eq!(redirect.message, "Redirects to https://example.com/new");

        let not_found = classify_status(404, "https://example.com/");
        assert_eq!(not_found.status, LinkStatus::Broken);
        assert_eq!(not_found.message, "Client error (page not found or forbidden)");

        let server = classify_status(500, "https://example.com/");
        assert_eq!(server.status, LinkStatus::Broken);
        assert_eq!(server.message, "Server error");

        let odd = classify_status(204, "https://example.com/");
        assert_eq!(odd.status, LinkStatus::Warning);
        assert_eq!(odd.message, "Unexpected status code: 204");
    }

    #[test]
    fn test_classify_failures() {
        let timeout = classify_failure(FailureKind::Timeout);
        assert_eq!(timeout.status, LinkStatus::Error);
        assert_eq!(timeout.code, None);
        assert_eq!(timeout.message, "Request timed out");

        let refused = classify_failure(FailureKind::Connect);
        assert_eq!(refused.status, LinkStatus::Broken);
        assert_eq!(refused.message, "Connection failed");

        let looped = classify_failure(FailureKind::TooManyRedirects);
        assert_eq!(looped.status, LinkStatus::Warning);
        assert_eq!(looped.message, "Too many redirects");

        let other = classify_failure(FailureKind::Other("builder error".into()));
        assert_eq!(other.status, LinkStatus::Error);
        assert_eq!(other.message, "Error: builder error");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("abc", 80), "abc");
    }

    #[tokio::test]
    async fn test_verify_ok_and_broken() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/crash"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = build_client(Duration::from_secs(5)).unwrap();

        let ok = verify_url(&client, &format!("{}/ok", server.uri())).await;
        assert_eq!(ok.status, LinkStatus::Ok);

        let missing = verify_url(&client, &format!("{}/missing", server.uri())).await;
        assert_eq!(missing.status, LinkStatus::Broken);
        assert_eq!(missing.code, Some(404));

        let crash = verify_url(&client, &format!("{}/crash", server.uri())).await;
        assert_eq!(crash.status, LinkStatus::Broken);
        assert_eq!(crash.message, "Server error");
    }

    #[tokio::test]
    async fn test_redirect_is_followed() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301)
                    .insert_header("Location", format!("{}/new", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let result = verify_url(&client, &format!("{}/old", server.uri())).await;

        assert_eq!(result.status, LinkStatus::Ok);
    }

    #[tokio::test]
    async fn test_redirect_without_location_is_a_warning() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/moved"))
            .respond_with(ResponseTemplate::new(302))
            .mount(&server)
            .await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let url = format!("{}/moved", server.uri());
        let result = verify_url(&client, &url).await;

        assert_eq!(result.status, LinkStatus::Warning);
        assert_eq!(result.code, Some(302));
        assert_eq!(result.message, format!("Redirects to {}", url));
    }

    #[tokio::test]
    async fn test_redirect_loop() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/loop"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", format!("{}/loop", server.uri())),
            )
            .mount(&server)
            .await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let result = verify_url(&client, &format!("{}/loop", server.uri())).await;

        assert_eq!(result.status, LinkStatus::Warning);
        assert_eq!(result.message, "Too many redirects");
        assert_eq!(result.code, None);
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let client = build_client(Duration::from_millis(200)).unwrap();
        let result = verify_url(&client, &format!("{}/slow", server.uri())).await;

        assert_eq!(result.status, LinkStatus::Error);
        assert_eq!(result.message, "Request timed out");
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Grab a free port, then release it so nothing is listening there
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = build_client(Duration::from_secs(5)).unwrap();
        let result = verify_url(&client, &format!("http://127.0.0.1:{}/", port)).await;

        assert_eq!(result.status, LinkStatus::Broken);
        assert_eq!(result.message, "Connection failed");
        assert_eq!(result.code, None);
    }

    #[tokio::test]
    async fn test_shared_url_is_checked_once() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(410))
            .expect(1)
            .mount(&server)
            .await;

        let ok = format!("{}/ok", server.uri());
        let gone = format!("{}/gone", server.uri());
        let links = vec![
            DiscoveredLink::new(&ok, "", "Lesson A"),
            DiscoveredLink::new(&ok, "", "Lesson B"),
            DiscoveredLink::new(&gone, "Gone", "Lesson B"),
        ];

        let report = verify_links(&links, &fast_options()).await.unwrap();

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.get(&ok).status, LinkStatus::Ok);
        assert_eq!(report.get(&gone).status, LinkStatus::Broken);
        assert_eq!(report.by_url[&ok].len(), 2);
        assert_eq!(report.by_url[&gone].len(), 1);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let report = verify_links(&[], &fast_options()).await.unwrap();
        assert!(report.results.is_empty());
        assert!(report.by_url.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_check_becomes_error() {
        let urls = vec![
            "https://example.com/a".to_string(),
            "https://example.com/boom".to_string(),
            "https://example.com/b".to_string(),
        ];

        let results = run_checks(urls, 2, |url| async move {
            if url.ends_with("/boom") {
                panic!("check blew up");
            }
            classify_status(200, &url)
        })
        .await;

        assert_eq!(results.len(), 3);
        let boom = &results["https://example.com/boom"];
        assert_eq!(boom.status, LinkStatus::Error);
        assert_eq!(boom.code, None);
        assert!(boom.message.contains("panicked"));
        assert_eq!(results["https://example.com/a"].status, LinkStatus::Ok);
        assert_eq!(results["https://example.com/b"].status, LinkStatus::Ok);
    }

    #[test]
    fn test_missing_result_is_unknown() {
        let report = VerificationReport::default();
        let result = report.get("https://example.com/");
        assert_eq!(result.status, LinkStatus::Unknown);
        assert_eq!(result.message, "Not verified");
    }
}
