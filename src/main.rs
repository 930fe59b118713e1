mod db;
mod error;
mod fetch;
mod page;
mod parser;
mod settings;
mod store;

use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use parser::assemble;
use parser::table::NestedTable;
use settings::Settings;
use store::PageStore;

#[derive(Parser)]
#[command(name = "codebook_scraper", about = "Survey codebook pages to a table of variables")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download codebook pages into the page directory
    Fetch {
        /// First page index
        #[arg(long, default_value = "1")]
        from: u32,
        /// Last page index (inclusive)
        #[arg(long)]
        to: u32,
        /// Re-download pages already on disk
        #[arg(long)]
        force: bool,
    },
    /// Parse every stored page and save the variable table
    Parse,
    /// Look up one variable in the saved table
    Show {
        /// Variable id (case-insensitive)
        id: String,
        /// Print the rows of one nested table
        #[arg(short, long)]
        unnest: Option<Nested>,
    },
    /// Show page, fetch and table counts
    Stats,
}

#[derive(Clone, Copy, ValueEnum)]
enum Nested {
    Marginals,
    Properties,
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
    let settings = Settings::load()?;
    let store = PageStore::new(&settings.pages_dir);

    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;

    let result = match cli.command {
        Commands::Fetch { from, to, force } => {
            if from > to {
                anyhow::bail!("--from ({}) is after --to ({})", from, to);
            }
            println!("Fetching pages {}..={} into {}", from, to, store.dir().display());
            let stats = fetch::fetch_pages(&settings, &store, &conn, from..=to, force).await?;
            println!(
                "Done: {} fetched ({} ok, {} errors), {} already on disk.",
                stats.total, stats.ok, stats.errors, stats.skipped
            );
            Ok(())
        }
        Commands::Parse => parse_pages(&settings, &store, &conn),
        Commands::Show { id, unnest } => {
            let rows = db::find_variables(&conn, &id)?;
            if rows.is_empty() {
                println!("No variable named '{}'. Run 'parse' first?", id);
                return Ok(());
            }
            for row in &rows {
                match unnest {
                    None => {
                        println!("id:          {}", row.id);
                        println!("description: {}", row.description);
                        println!("text:        {}", row.text.as_deref().unwrap_or("NA"));
                        println!("marginals:   {} rows", row.marginals.len());
                        println!("properties:  {} rows", row.properties.len());
                    }
                    Some(Nested::Marginals) => print_nested(&row.marginals),
                    Some(Nested::Properties) => print_nested(&row.properties),
                }
            }
            Ok(())
        }
        Commands::Stats => {
            let s = db::get_stats(&conn)?;
            let pages = store.indices()?.len();
            println!("Pages:        {}", pages);
            println!("Fetches:      {}", s.fetch_attempts);
            println!("Fetch errors: {}", s.fetch_errors);
            println!("Variables:    {}", s.variables);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn parse_pages(
    settings: &Settings,
    store: &PageStore,
    conn: &rusqlite::Connection,
) -> anyhow::Result<()> {
    let selectors = settings.selectors()?;
    let indices = store
        .indices()
        .with_context(|| format!("Failed to list {}", store.dir().display()))?;
    if indices.is_empty() {
        println!("No pages in {}. Run 'fetch' first.", store.dir().display());
        return Ok(());
    }
    println!("Parsing {} pages...", indices.len());

    let pb = ProgressBar::new(indices.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );
    let assembly = assemble::assemble(store, &indices, &selectors, &pb);
    pb.finish_and_clear();

    if settings.strict {
        if let Some(e) = assembly.skipped.first() {
            return Err(anyhow::Error::new(e.clone())
                .context("Strict mode: refusing to save a partial table"));
        }
    }

    if !assembly.omitted.is_empty() {
        let pages: Vec<String> = assembly
            .omitted
            .iter()
            .map(|e| e.page().to_string())
            .collect();
        println!("Omitted pages: {}", pages.join(", "));
    }

    let saved = db::save_variables(conn, &assembly.rows)?;
    info!(rows = saved, pages = assembly.pages, "Saved variable table");
    println!(
        "Saved {} variables from {} pages ({} pages omitted, {} blocks skipped).",
        saved,
        assembly.pages,
        assembly.omitted.len(),
        assembly.skipped.len()
    );
    Ok(())
}

fn print_nested(table: &NestedTable) {
    if table.is_empty() {
        println!("(no rows)");
        return;
    }
    let cells: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|r| r.iter().map(|d| truncate(&d.to_string(), 40)).collect())
        .collect();
    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .fold(name.chars().count(), usize::max)
        })
        .collect();

    let line = |values: Vec<&str>| {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<w$}", v, w = *w))
            .collect::<Vec<_>>()
            .join(" | ")
    };
    println!("{}", line(table.columns.iter().map(String::as_str).collect()));
    println!("{}", "-".repeat(widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1)));
    for row in &cells {
        println!("{}", line(row.iter().map(String::as_str).collect()));
    }
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
