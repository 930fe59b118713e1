use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::db::{self, FetchLogRow};
use crate::error::FetchError;
use crate::settings::Settings;
use crate::store::PageStore;

/// Fetch stats returned after completion.
pub struct FetchStats {
    pub total: usize,
    pub ok: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Download pages one at a time, pausing `delay_ms` between requests.
/// A failed page, whether the request or the write to disk failed, is logged
/// and counted; it never stops the run.
pub async fn fetch_pages(
    settings: &Settings,
    store: &PageStore,
    conn: &Connection,
    pages: RangeInclusive<u32>,
    force: bool,
) -> Result<FetchStats> {
    let client = reqwest::Client::builder()
        .user_agent(&settings.user_agent)
        .build()?;
    let delay = Duration::from_millis(settings.delay_ms);

    settings.page_url(*pages.start())?;

    let requested = pages.clone().count();
    let todo: Vec<u32> = pages.filter(|&i| force || !store.contains(i)).collect();
    let mut stats = FetchStats {
        total: todo.len(),
        ok: 0,
        skipped: requested - todo.len(),
        errors: 0,
    };

    let pb = ProgressBar::new(todo.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    for (n, &index) in todo.iter().enumerate() {
        if n > 0 {
            tokio::time::sleep(delay).await;
        }

        let url = settings.page_url(index)?;
        let start = Instant::now();
        let fetched = fetch_one(&client, index, &url).await;
        let latency_ms = Some(start.elapsed().as_millis() as i64);

        let result = store_page(store, index, fetched);
        match &result {
            Ok(_) => stats.ok += 1,
            Err(e) => {
                warn!("{}", e);
                stats.errors += 1;
            }
        }
        db::log_fetch(conn, &log_row(index, url, &result, latency_ms))?;
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!(
        "Fetched {} pages ({} ok, {} errors, {} already on disk)",
        stats.total, stats.ok, stats.errors, stats.skipped
    );
    Ok(stats)
}

/// Write a fetched page to the store, keeping the HTTP status on success.
fn store_page(
    store: &PageStore,
    page: u32,
    fetched: Result<(u16, String), FetchError>,
) -> Result<u16, FetchError> {
    let (status, markup) = fetched?;
    store
        .save(page, &markup)
        .map_err(|source| FetchError::Io { page, source })?;
    Ok(status)
}

fn log_row(
    page: u32,
    url: String,
    result: &Result<u16, FetchError>,
    latency_ms: Option<i64>,
) -> FetchLogRow {
    match result {
        Ok(status) => FetchLogRow {
            page,
            url,
            status: Some(*status),
            error: None,
            latency_ms,
        },
        Err(e) => FetchLogRow {
            page,
            url,
            status: match e {
                FetchError::Status { status, .. } => Some(*status),
                _ => None,
            },
            error: Some(e.to_string()),
            latency_ms,
        },
    }
}

async fn fetch_one(
    client: &reqwest::Client,
    page: u32,
    url: &str,
) -> Result<(u16, String), FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Http { page, source })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            page,
            status: status.as_u16(),
        });
    }

    let markup = response
        .text()
        .await
        .map_err(|source| FetchError::Http { page, source })?;
    Ok((status.as_u16(), markup))
}
