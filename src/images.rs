// ABOUTME: Image batch orchestrator — wave-based retries over a one-image upstream primitive
// ABOUTME: 2n attempt budget, bounded concurrency, cyclic duplication fallback, b64 re-encode
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 chatbridge contributors

//! # Image Batch Orchestration
//!
//! The upstream renders exactly one image per call and fails often enough
//! that a batch API needs retries. The orchestrator spends a budget of
//! `2n` attempts in waves: each wave launches as many attempts as results
//! are still missing, failed attempts are discarded (never retried in
//! place), and the next wave backfills. A partial harvest is padded by
//! duplicating collected entries; an empty harvest is an error.

use std::future::Future;
use std::sync::{Arc, OnceLock};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::Regex;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::openai::ImageDatum;
use crate::translate::aggregate_stream;
use crate::types::GatewayError;
use crate::upstream::{ImageEnvelope, UpstreamClient};

/// Requested shape of the batch results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Final download URLs
    Url,
    /// Downloaded bytes, base64-encoded
    B64Json,
}

impl ResponseFormat {
    /// Parse the client's `response_format` field
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("b64_json") => Self::B64Json,
            _ => Self::Url,
        }
    }
}

/// Generate a batch of `n` images for one prompt
///
/// Returns exactly `n` entries in `url` mode. In `b64_json` mode a failed
/// download is skipped rather than fatal, so the result can fall short of
/// `n` — a deliberate asymmetry kept from the protocol this gateway
/// wraps. Zero collected images across the whole budget is
/// [`ErrorKind::Exhausted`](crate::types::ErrorKind::Exhausted).
pub async fn generate_batch(
    client: &UpstreamClient,
    prompt: &str,
    n: usize,
    format: ResponseFormat,
    concurrency: usize,
) -> Result<Vec<ImageDatum>, GatewayError> {
    let max_attempts = 2 * n;
    info!(n, max_attempts, "Starting image batch");

    let collected = run_waves(n, max_attempts, concurrency, |attempt_no| {
        run_attempt(client, prompt, attempt_no)
    })
    .await;

    if collected.is_empty() {
        return Err(GatewayError::exhausted(
            "unable to generate any images within the attempt budget",
        ));
    }

    if collected.len() < n {
        info!(
            collected = collected.len(),
            n, "Padding shortfall by duplicating collected images"
        );
    }
    let urls = pad_cyclic(collected, n);

    match format {
        ResponseFormat::Url => Ok(urls.into_iter().map(ImageDatum::url).collect()),
        ResponseFormat::B64Json => {
            let mut data = Vec::with_capacity(urls.len());
            for url in &urls {
                match client.download(url).await {
                    Ok(bytes) => data.push(ImageDatum::b64(BASE64.encode(bytes))),
                    // Skipped, not fatal: b64 batches may come up short
                    Err(e) => warn!(url = %url, error = %e, "Dropping undownloadable image"),
                }
            }
            Ok(data)
        }
    }
}

/// Drive attempts in waves until `n` results or the budget runs out
///
/// Each wave launches `needed` attempts bounded by a semaphore of width
/// `concurrency`. The limiter is scoped to this call — concurrent
/// requests each get their own budget, so the global upstream pressure
/// grows with request fan-in. Attempt futures rely on transport defaults
/// for timeouts; a hung call stalls its wave. Results are appended in
/// observation order by this task alone, so no lock is needed.
async fn run_waves<F, Fut>(n: usize, max_attempts: usize, concurrency: usize, attempt: F) -> Vec<String>
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = Option<String>>,
{
    let limiter = Arc::new(Semaphore::new(concurrency));
    let mut collected: Vec<String> = Vec::with_capacity(n);
    let mut attempts_used = 0;

    while collected.len() < n && attempts_used < max_attempts {
        let needed = (n - collected.len()).min(max_attempts - attempts_used);
        debug!(wave_size = needed, attempts_used, "Launching attempt wave");

        let base = attempts_used;
        let wave = (0..needed).map(|i| {
            let limiter = Arc::clone(&limiter);
            let fut = attempt(base + i + 1);
            async move {
                let _permit = limiter.acquire().await.ok()?;
                fut.await
            }
        });
        attempts_used += needed;

        for result in futures::future::join_all(wave).await {
            if let Some(url) = result {
                collected.push(url);
            }
        }
    }

    collected
}

/// One disposable generation attempt
///
/// Builds the fixed single-image envelope, streams the upstream
/// response, extracts the storage path from the returned markdown and
/// resolves it into a final URL. Every failure mode returns `None`;
/// the wave loop decides whether to spend another attempt.
async fn run_attempt(client: &UpstreamClient, prompt: &str, attempt_no: usize) -> Option<String> {
    let envelope = ImageEnvelope::new(prompt);

    let lines = match client.stream_envelope(&envelope).await {
        Ok(lines) => lines,
        Err(e) => {
            warn!(attempt_no, error = %e, "Attempt failed to reach upstream");
            return None;
        }
    };

    let markdown = match aggregate_stream(lines).await {
        Ok(markdown) => markdown,
        Err(e) => {
            warn!(attempt_no, error = %e, "Attempt stream failed");
            return None;
        }
    };

    if markdown.is_empty() {
        warn!(attempt_no, "Attempt produced no image markdown");
        return None;
    }

    let Some(path) = extract_markdown_path(&markdown) else {
        warn!(attempt_no, "Attempt markdown carried no image path");
        return None;
    };
    debug!(attempt_no, path = %path, "Extracted storage path");

    match client.resolve_storage_path(&path).await {
        Ok(url) => {
            info!(attempt_no, "Attempt succeeded");
            Some(url)
        }
        Err(e) => {
            warn!(attempt_no, error = %e, "Attempt storage lookup failed");
            None
        }
    }
}

/// Extract the storage path from a markdown image link
///
/// Matches only links under the upstream's fixed `https://spc.unk/`
/// placeholder host; the captured remainder is the storage path.
fn extract_markdown_path(markdown: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        Regex::new(r"!\[[^\]]*\]\(https://spc\.unk/([^)]+)\)").expect("static pattern compiles")
    });
    re.captures(markdown).map(|caps| caps[1].to_owned())
}

/// Pad a non-empty result set to length `n` by cycling through it
///
/// Duplicates are indistinguishable from originals by design.
fn pad_cyclic(mut urls: Vec<String>, n: usize) -> Vec<String> {
    let len = urls.len();
    let mut i = 0;
    while urls.len() < n {
        urls.push(urls[i % len].clone());
        i += 1;
    }
    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn all_attempts_succeeding_collects_n_in_order() {
        let calls = AtomicUsize::new(0);
        let collected = run_waves(3, 6, 10, |attempt_no| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Some(format!("url-{attempt_no}")) }
        })
        .await;

        assert_eq!(collected, vec!["url-1", "url-2", "url-3"]);
        assert_eq!(calls.load(Ordering::SeqCst), 3, "no extra attempts spent");
    }

    #[tokio::test]
    async fn all_attempts_failing_exhausts_the_budget() {
        let calls = AtomicUsize::new(0);
        let collected = run_waves(2, 4, 10, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { None }
        })
        .await;

        assert!(collected.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 4, "budget is 2n attempts");
    }

    #[tokio::test]
    async fn later_waves_backfill_early_failures() {
        let calls = AtomicUsize::new(0);
        let collected = run_waves(3, 6, 10, |attempt_no| {
            calls.fetch_add(1, Ordering::SeqCst);
            // First wave fails entirely; second wave succeeds
            async move {
                if attempt_no <= 3 {
                    None
                } else {
                    Some(format!("url-{attempt_no}"))
                }
            }
        })
        .await;

        assert_eq!(collected, vec!["url-4", "url-5", "url-6"]);
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn single_success_pads_to_n_by_duplication() {
        let collected = run_waves(3, 6, 10, |attempt_no| async move {
            (attempt_no == 2).then(|| "only".to_owned())
        })
        .await;
        assert_eq!(collected.len(), 1);

        let padded = pad_cyclic(collected, 3);
        assert_eq!(padded, vec!["only", "only", "only"]);
    }

    #[tokio::test]
    async fn limiter_bounds_in_flight_attempts() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let _ = run_waves(8, 16, 2, |_| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                None
            }
        })
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 2, "limiter width exceeded");
    }

    #[test]
    fn pad_cycles_through_collected_entries() {
        let padded = pad_cyclic(vec!["a".to_owned(), "b".to_owned()], 5);
        assert_eq!(padded, vec!["a", "b", "a", "b", "a"]);
    }

    #[test]
    fn markdown_path_extraction_requires_fixed_host() {
        assert_eq!(
            extract_markdown_path("prefix ![Image](https://spc.unk/abc/def.png) suffix"),
            Some("abc/def.png".to_owned())
        );
        assert_eq!(
            extract_markdown_path("![alt text](https://spc.unk/x.png)"),
            Some("x.png".to_owned())
        );
        assert_eq!(
            extract_markdown_path("![Image](https://evil.example/abc.png)"),
            None
        );
        assert_eq!(extract_markdown_path("no markdown at all"), None);
    }

    #[test]
    fn response_format_parsing() {
        assert_eq!(ResponseFormat::parse(Some("b64_json")), ResponseFormat::B64Json);
        assert_eq!(ResponseFormat::parse(Some("B64_JSON")), ResponseFormat::B64Json);
        assert_eq!(ResponseFormat::parse(Some("url")), ResponseFormat::Url);
        assert_eq!(ResponseFormat::parse(None), ResponseFormat::Url);
    }
}
