// src/main.rs
// =============================================================================
// Entry point of the readable-index CLI.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (stderr, so JSON on stdout stays clean)
// 3. Build explicit configs and dispatch to the subcommand handler
// 4. Exit with a proper code (0 = success, 1 = the page could not be read,
//    2 = error)
// =============================================================================

mod cli;

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use readable_index::fulltext::{self, FulltextIndex};
use readable_index::ingest::{self, IngestJob, IngestOutcome, Source};
use readable_index::{ReadResult, Reader, SearchGateway, SearchRequest, SearchScope, TagString};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

fn init_tracing(verbose: u8) {
    let filter = if let Ok(env) = std::env::var("READABLE_LOG") {
        EnvFilter::new(env)
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    let reader_config = cli.reader_config();

    match &cli.command {
        Commands::Read { url, json } => {
            let reader = Reader::new(&reader_config)?;
            let read = reader.read_url(url).await;
            print_read(&read, *json)?;
            Ok(exit_code_for(&read))
        }
        Commands::Parse { file, json } => {
            let html = std::fs::read_to_string(file)
                .with_context(|| format!("reading {}", file.display()))?;
            let read = readable_index::read_content(&html);
            print_read(&read, *json)?;
            Ok(exit_code_for(&read))
        }
        Commands::Install => {
            let index = open_index(&cli).await?;
            index.install().await?;
            println!("Installed {} fulltext structures", index.backend());
            Ok(0)
        }
        Commands::Uninstall => {
            let index = open_index(&cli).await?;
            index.uninstall().await?;
            println!("Removed {} fulltext structures", index.backend());
            Ok(0)
        }
        Commands::Ingest { bid, url, file, json } => {
            let source = match (url, file) {
                (_, Some(path)) => Source::Html(
                    std::fs::read_to_string(path)
                        .with_context(|| format!("reading {}", path.display()))?,
                ),
                (Some(url), None) => Source::Url(url.clone()),
                (None, None) => bail!("either a url or --file is required"),
            };

            let index = open_index(&cli).await?;
            let reader = Reader::new(&reader_config)?;
            let read = ingest::ingest_one(&reader, index.as_ref(), *bid, &source)
                .await
                .with_context(|| format!("storing readable content for bookmark {}", bid))?;
            print_read(&read, *json)?;
            Ok(exit_code_for(&read))
        }
        Commands::IngestBatch { list, concurrency, json } => {
            let text = std::fs::read_to_string(list)
                .with_context(|| format!("reading {}", list.display()))?;
            let jobs = parse_job_list(&text)?;

            let index = open_index(&cli).await?;
            let reader = Reader::new(&reader_config)?;
            let outcomes = ingest::ingest_batch(&reader, index, jobs, *concurrency).await;
            print_outcomes(&outcomes, *json)?;

            let failed = outcomes
                .iter()
                .any(|o| !o.is_ok() || o.read.as_ref().is_some_and(|r| !r.is_success()));
            Ok(if failed { 1 } else { 0 })
        }
        Commands::Tag { bid, tags } => {
            let index = open_index(&cli).await?;
            let tag_string = TagString::from_tags(tags);
            index.update_tags(*bid, &tag_string).await?;
            println!("{}: {}", bid, tag_string);
            Ok(0)
        }
        Commands::Search {
            query,
            content,
            tags_only,
            limit,
            offset,
            json,
        } => {
            let scope = if *tags_only {
                SearchScope::Tags
            } else {
                SearchScope::from_search_content(*content)
            };
            let mut request = SearchRequest::new(query.clone(), scope);
            request.limit = *limit;
            request.offset = *offset;

            // No database configured means search is unavailable, which the
            // gateway reports as a configuration error.
            let gateway = match cli.database_config() {
                Some(config) => SearchGateway::new(fulltext::connect(&config).await?),
                None => SearchGateway::disabled(),
            };
            let ids = gateway.search_page(&request).await?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&ids)?);
            } else {
                for id in &ids {
                    println!("{}", id);
                }
            }
            Ok(0)
        }
    }
}

async fn open_index(cli: &Cli) -> Result<Arc<dyn FulltextIndex>> {
    let config = cli
        .database_config()
        .ok_or_else(|| anyhow!("--database-url (or DATABASE_URL) is required"))?;
    let index = fulltext::connect(&config)
        .await
        .with_context(|| format!("connecting to {}", config.url))?;
    Ok(index)
}

// "<bid> <url>" per line; blank lines and # comments are skipped
fn parse_job_list(text: &str) -> Result<Vec<IngestJob>> {
    let mut jobs = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (bid, url) = line
            .split_once(char::is_whitespace)
            .ok_or_else(|| anyhow!("line {}: expected '<bid> <url>'", number + 1))?;
        let bid = bid
            .parse()
            .with_context(|| format!("line {}: bad bookmark id '{}'", number + 1, bid))?;
        jobs.push(IngestJob {
            bid,
            source: Source::Url(url.trim().to_string()),
        });
    }
    Ok(jobs)
}

fn exit_code_for(read: &ReadResult) -> i32 {
    if read.is_success() {
        0
    } else {
        1
    }
}

fn print_read(read: &ReadResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(read)?);
        return Ok(());
    }

    println!("Status:  {}", read.status());
    if let Some(content_type) = read.content_type() {
        println!("Type:    {}", content_type);
    }
    if read.is_image() {
        println!("Image:   yes (content not extracted)");
    }
    match read.content() {
        Some(content) => println!("\n{}", content),
        None => println!("\n(no readable content)"),
    }
    Ok(())
}

fn print_outcomes(outcomes: &[IngestOutcome], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcomes)?);
        return Ok(());
    }

    println!("{:<10} {:<8} {:<40}", "BOOKMARK", "STATUS", "MESSAGE");
    println!("{}", "=".repeat(60));
    for outcome in outcomes {
        let (status, message) = match (&outcome.read, &outcome.error) {
            (_, Some(error)) => ("ERROR".to_string(), error.clone()),
            (Some(read), None) => (
                read.status_code().to_string(),
                read.status_message().unwrap_or_default().to_string(),
            ),
            (None, None) => ("-".to_string(), String::new()),
        };
        println!("{:<10} {:<8} {:<40}", outcome.bid, status, message);
    }

    let ok = outcomes.iter().filter(|o| o.is_ok()).count();
    println!();
    println!("Stored: {}  Failed: {}  Total: {}", ok, outcomes.len() - ok, outcomes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_job_list() {
        let jobs = parse_job_list("# saved\n1 http://a.example\n\n 2\thttp://b.example \n").unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].bid, 2);
        assert_eq!(jobs[1].source, Source::Url("http://b.example".to_string()));
    }

    #[test]
    fn test_parse_job_list_rejects_garbage() {
        assert!(parse_job_list("abc http://a.example").is_err());
        assert!(parse_job_list("12").is_err());
    }
}
