mod crawl;
mod extract;
mod index;
mod output;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sillok_scraper",
    about = "Joseon dynasty annals scraper (sillok.history.go.kr)"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List top-level sections discovered on the index page
    Sections,
    /// Crawl sections and write one JSONL file per section
    Scrape {
        /// Max sections to scrape (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Take only the first entry at every level (quick structural check)
        #[arg(long)]
        sample: bool,
        /// Scrape sections one at a time instead of in parallel
        #[arg(long)]
        sequential: bool,
        /// Max sections in flight at once
        #[arg(short, long, default_value = "4")]
        concurrency: usize,
        /// Output directory for section files
        #[arg(short, long, default_value = "data")]
        out_dir: PathBuf,
    },
    /// Record counts for section files already on disk
    Status {
        /// Output directory to scan
        #[arg(short, long, default_value = "data")]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sections => {
            let client = crawl::http_client()?;
            let sections = index::fetch_sections(&client).await?;
            if sections.is_empty() {
                println!("No sections found on the index page.");
                return Ok(());
            }

            println!("{:<16} | {:<24} | URL", "Slug", "Section");
            println!("{}", "-".repeat(90));
            for s in &sections {
                println!("{:<16} | {:<24} | {}", s.slug, truncate(&s.title, 24), s.url);
            }
            println!("\n{} sections", sections.len());
            Ok(())
        }
        Commands::Scrape {
            limit,
            sample,
            sequential,
            concurrency,
            out_dir,
        } => {
            let client = crawl::http_client()?;
            let mut sections = index::fetch_sections(&client).await?;
            if let Some(limit) = limit {
                sections.truncate(limit);
            }
            if sections.is_empty() {
                println!("No sections found on the index page.");
                return Ok(());
            }

            println!(
                "Scraping {} sections into {}...",
                sections.len(),
                out_dir.display()
            );
            let opts = crawl::CrawlOptions {
                out_dir,
                concurrency,
                sample,
                sequential,
            };
            let stats = crawl::scrape_sections(&client, sections, &opts).await?;
            println!(
                "Done: {} sections ({} records, {} skipped, {} errors).",
                stats.sections, stats.records, stats.skipped, stats.errors
            );
            Ok(())
        }
        Commands::Status { out_dir } => {
            let statuses = output::read_status(&out_dir)?;
            if statuses.is_empty() {
                println!("No section files in {}.", out_dir.display());
                return Ok(());
            }

            println!("{:<16} | {:>8}", "Slug", "Records");
            println!("{}", "-".repeat(27));
            let mut total = 0;
            for s in &statuses {
                println!("{:<16} | {:>8}", s.slug, s.records);
                total += s.records;
            }
            println!("\n{} sections, {} records", statuses.len(), total);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
