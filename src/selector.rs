//! Startup endpoint selection: race GET probes against every candidate base
//! URL and take the first that answers successfully.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::logger;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub url: String,
    pub success: bool,
    pub duration: Duration,
}

/// Probe every candidate URL with at most `max_concurrency` requests in
/// flight and return the first one that responds successfully, together with
/// one [`ProbeResult`] per submitted URL.
///
/// The winner is the first *completed* success, not the first submitted URL.
/// Once a winner is known the remaining probes are aborted; each of them is
/// still recorded, as a failure with the elapsed time at abandonment. With no
/// winner, all probes run to completion and `None` is returned alongside the
/// full map. A probe's own network error never disturbs its siblings.
pub async fn select_endpoint(
    client: &Client,
    urls: &[String],
    max_concurrency: usize,
) -> (Option<String>, HashMap<String, ProbeResult>) {
    let mut results = HashMap::with_capacity(urls.len());
    if urls.is_empty() {
        return (None, results);
    }

    let started = Instant::now();
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut probes = JoinSet::new();
    for url in urls {
        let client = client.clone();
        let url = url.clone();
        let semaphore = Arc::clone(&semaphore);
        probes.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            probe(&client, &url).await
        });
    }

    let mut winner = None;
    while let Some(joined) = probes.join_next().await {
        let Ok(result) = joined else { continue };
        let success = result.success;
        let url = result.url.clone();
        results.insert(result.url.clone(), result);
        if success {
            winner = Some(url);
            break;
        }
    }

    if winner.is_some() {
        probes.abort_all();
        while let Some(joined) = probes.join_next().await {
            if let Ok(result) = joined {
                results.entry(result.url.clone()).or_insert(result);
            }
        }
    }

    // Every submitted URL keeps an entry, whether its probe was cut short by
    // the abort or never produced a result at all.
    for url in urls {
        results.entry(url.clone()).or_insert_with(|| ProbeResult {
            url: url.clone(),
            success: false,
            duration: started.elapsed(),
        });
    }

    (winner, results)
}

async fn probe(client: &Client, url: &str) -> ProbeResult {
    let started = Instant::now();
    let success = match client.get(url).timeout(PROBE_TIMEOUT).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(err) => {
            logger::log(&format!("probe {url}: {err}"));
            false
        }
    };
    ProbeResult {
        url: url.to_string(),
        success,
        duration: started.elapsed(),
    }
}
