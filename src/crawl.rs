use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use url::Url;

use crate::extract;
use crate::index::SectionLink;
use crate::output::{self, Record};

const USER_AGENT: &str = "sillok_scraper/0.1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;

/// Scrape settings shared by every section task.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub out_dir: PathBuf,
    pub concurrency: usize,
    /// Take only the first entry at every level, the way a quick structural
    /// check against the live site is run.
    pub sample: bool,
    pub sequential: bool,
}

pub struct ScrapeStats {
    pub sections: usize,
    pub records: usize,
    pub skipped: usize,
    pub errors: usize,
}

pub enum SectionOutcome {
    Skipped,
    Written(usize),
}

pub fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

/// Scrape sections concurrently, one task per section, each owning its own
/// traversal and writing its own file. Only the record count flows back.
pub async fn scrape_sections(
    client: &Client,
    sections: Vec<SectionLink>,
    opts: &CrawlOptions,
) -> Result<ScrapeStats> {
    let total = sections.len();
    let concurrency = if opts.sequential {
        1
    } else {
        opts.concurrency.max(1)
    };
    let semaphore = Arc::new(Semaphore::new(concurrency));

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} sections {msg}")?
            .progress_chars("=> "),
    );

    let mut handles = Vec::with_capacity(total);
    for section in sections {
        let client = client.clone();
        let opts = opts.clone();
        let sem = Arc::clone(&semaphore);
        let pb = pb.clone();

        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire().await.unwrap();
            let outcome = scrape_section(&client, &section, &opts).await;
            pb.set_message(section.slug.clone());
            pb.inc(1);
            (section, outcome)
        }));
    }

    let mut stats = ScrapeStats {
        sections: total,
        records: 0,
        skipped: 0,
        errors: 0,
    };
    for handle in handles {
        let (section, outcome) = handle.await?;
        match outcome {
            Ok(SectionOutcome::Skipped) => stats.skipped += 1,
            Ok(SectionOutcome::Written(count)) => stats.records += count,
            Err(e) => {
                warn!("Section {} failed: {:#}", section.slug, e);
                stats.errors += 1;
            }
        }
    }

    pb.finish_and_clear();
    info!(
        "Scraped {} sections ({} records, {} skipped, {} errors)",
        total, stats.records, stats.skipped, stats.errors
    );
    Ok(stats)
}

/// Walk one section depth-first: section page → volume groups → volumes →
/// articles. Records accumulate in memory and are written once at the end.
pub async fn scrape_section(
    client: &Client,
    section: &SectionLink,
    opts: &CrawlOptions,
) -> Result<SectionOutcome> {
    let path = output::output_path(&opts.out_dir, &section.slug);
    if output::already_scraped(&path) {
        info!("{} already exists, skipping {}", path.display(), section.title);
        return Ok(SectionOutcome::Skipped);
    }

    let html = fetch_page(client, &section.url).await?;
    let page_url = Url::parse(&section.url)?;
    let groups = extract::volume_groups(&html, &page_url)?;
    jitter_sleep().await;

    let mut records = Vec::new();
    for group in &groups {
        scrape_volumes(client, group, opts, &mut records).await?;
        if opts.sample {
            break;
        }
    }

    info!("Writing {} records to {}", records.len(), path.display());
    output::write_records(&path, &records)?;
    Ok(SectionOutcome::Written(records.len()))
}

/// Visit each volume page in a group and scrape its articles. A failed
/// article extraction is logged and skipped; a failed navigation aborts the
/// section.
async fn scrape_volumes(
    client: &Client,
    volume_urls: &[String],
    opts: &CrawlOptions,
    records: &mut Vec<Record>,
) -> Result<()> {
    for volume_url in volume_urls {
        let html = fetch_page(client, volume_url).await?;
        let page_url = Url::parse(volume_url)?;
        let articles = extract::article_links(&html, &page_url)?;

        for article_url in &articles {
            let html = fetch_page(client, article_url).await?;
            match extract::extract_record(&html) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping article {}: {:#}", article_url, e),
            }
            jitter_sleep().await;
            if opts.sample {
                break;
            }
        }

        jitter_sleep().await;
        if opts.sample {
            break;
        }
    }
    Ok(())
}

/// GET a page, retrying transient failures with exponential backoff.
async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let mut attempt = 0;
    loop {
        match fetch_once(client, url).await {
            Ok(html) => return Ok(html),
            Err(e) if attempt < MAX_RETRIES && is_transient(&e) => {
                let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
                warn!(
                    "Transient failure on {} (attempt {}/{}), backing off {:.1}s",
                    url,
                    attempt + 1,
                    MAX_RETRIES,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to fetch {}", url)),
        }
    }
}

async fn fetch_once(client: &Client, url: &str) -> Result<String, reqwest::Error> {
    let response = client.get(url).send().await?.error_for_status()?;
    response.text().await
}

fn is_transient(err: &reqwest::Error) -> bool {
    if err.is_timeout() || err.is_connect() {
        return true;
    }
    err.status()
        .map(|status| retryable_status(status.as_u16()))
        .unwrap_or(false)
}

fn retryable_status(code: u16) -> bool {
    code == 429 || (500..600).contains(&code)
}

/// Politeness delay between page visits: `min(r0*6 + 0.5, r1 + 3)` seconds,
/// the jitter the site tolerated during collection.
async fn jitter_sleep() {
    tokio::time::sleep(jitter_duration()).await;
}

fn jitter_duration() -> Duration {
    let (r0, r1): (f64, f64) = (rand::random(), rand::random());
    Duration::from_secs_f64((r0 * 6.0 + 0.5).min(r1 + 3.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_in_range() {
        for _ in 0..1000 {
            let d = jitter_duration();
            assert!(d >= Duration::from_secs_f64(0.5), "too short: {:?}", d);
            assert!(d < Duration::from_secs_f64(4.0), "too long: {:?}", d);
        }
    }

    #[test]
    fn retries_rate_limits_and_server_errors_only() {
        assert!(retryable_status(429));
        assert!(retryable_status(500));
        assert!(retryable_status(503));
        assert!(!retryable_status(404));
        assert!(!retryable_status(403));
        assert!(!retryable_status(200));
    }
}
