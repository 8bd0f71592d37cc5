#![cfg_attr(target_os = "windows", windows_subsystem = "windows")]

use std::thread;
use std::time::Duration;

mod app;
mod clipboard;
mod commands;
mod config;
mod logger;
mod selector;
mod sink;
mod stream;
#[cfg(test)]
mod testsupport;

use crossbeam_channel::{unbounded, Receiver, Sender};
use sink::{ChannelSink, StreamJob, TextSink, UiEvent};
use stream::{CompletionClient, StreamOutcome};

fn main() {
    // Init logger first
    logger::init();
    logger::log("App starting");

    // Config: load from config.json (next to exe). Env vars still override if present.
    let mut cfg = config::Config::load();
    logger::log("Config loaded from config.json");
    if let Ok(v) = std::env::var("HELPHAND_API_TOKEN") {
        if !v.is_empty() {
            cfg.api_token = v;
        }
    }
    if let Ok(v) = std::env::var("HELPHAND_ENDPOINTS") {
        let urls: Vec<String> = v
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !urls.is_empty() {
            cfg.endpoints = urls;
        }
    }
    if let Ok(v) = std::env::var("HELPHAND_REPLY_LANG") {
        if !v.is_empty() {
            cfg.reply_lang = v;
        }
    }

    let rt = tokio::runtime::Runtime::new().expect("tokio rt");
    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .read_timeout(Duration::from_secs(30))
        .build()
        .expect("failed to build client");

    // Race the candidate endpoints once at startup; first success wins.
    let (winner, results) = rt.block_on(selector::select_endpoint(
        &http,
        &cfg.endpoints,
        cfg.max_probe_workers,
    ));
    for (url, result) in &results {
        logger::log(&format!(
            "probe {}: {} in {:.2}s",
            url,
            if result.success { "ok" } else { "failed" },
            result.duration.as_secs_f64()
        ));
    }
    match &winner {
        Some(url) => logger::log(&format!("selected endpoint {url}")),
        None => logger::log("no endpoint reachable"),
    }

    let (job_tx, job_rx) = unbounded::<StreamJob>();
    let (ui_tx, ui_rx) = unbounded::<UiEvent>();

    // Background: streaming worker. Without a winner there is nothing to
    // stream to; the UI keeps its actions disabled.
    if let Some(base) = winner.clone() {
        let client = CompletionClient::new(
            rt.handle().clone(),
            http.clone(),
            base,
            cfg.api_token.clone(),
            cfg.max_retries,
        );
        thread::spawn(move || run_worker(client, job_rx, ui_tx));
    }

    // Run UI on main thread (blocks)
    app::run_ui_main_thread(cfg, winner, job_tx, ui_rx);
}

/// Drains stream jobs one at a time, feeding each fragment to the pane sink
/// as it arrives.
fn run_worker(client: CompletionClient, job_rx: Receiver<StreamJob>, ui_tx: Sender<UiEvent>) {
    while let Ok(job) = job_rx.recv() {
        let mut sink = ChannelSink::new(job.pane, ui_tx.clone());
        sink.clear();
        let mut fragments = client.stream_chat(job.request);
        for fragment in fragments.by_ref() {
            sink.append(&fragment);
            sink.scroll_to_end();
        }
        let outcome = fragments.outcome().unwrap_or(StreamOutcome::Exhausted);
        if ui_tx.send(UiEvent::StreamEnded(job.pane, outcome)).is_err() {
            break;
        }
    }
    logger::log("worker: job channel closed, exiting");
}
