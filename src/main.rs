// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments and set up logging
// 2. Validate the course URL before doing any work
// 3. Start a browser, crawl the course (and linked courses), close the browser
// 4. Verify every unique URL found, unless --no-verify
// 5. Print the report
// 6. Exit with proper code (0 = success, 1 = error, 130 = cancelled)
//
// Progress narration goes through `tracing` to stderr; the final report is
// printed to stdout so it can be piped or captured on its own.
// =============================================================================

mod checker;
mod cli;
mod crawl;

use anyhow::{Context, Result};
use checker::{LinkStatus, Verification, VerificationReport};
use clap::Parser;
use cli::{validate_course_url, Cli};
use crawl::{
    DiscoveredLink, FailedPage, PageRenderer, ScanOptions, ScanReport, Scanner, WebDriverRenderer,
};
use serde::Serialize;
use std::future::Future;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const EXIT_CANCELLED: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    std::process::exit(exit_code(run(cli).await));
}

// Unexpected errors print their context chain and exit with 1
fn exit_code(result: Result<i32>) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("\nError: {:#}", e);
            1
        }
    }
}

// --quiet drops progress (info) but keeps warnings; RUST_LOG wins if set
fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}

// The main application logic
// Returns:
//   Ok(0)   = finished
//   Ok(130) = cancelled with Ctrl-C
//   Err     = invalid input or a failure we can't recover from
async fn run(cli: Cli) -> Result<i32> {
    validate_course_url(&cli.url)?;

    info!("Scanning: {}", cli.url);
    info!("Max depth: {}", cli.max_depth);
    info!(
        "Verification: {}",
        if cli.no_verify { "Disabled" } else { "Enabled" }
    );

    // One Ctrl-C listener for the whole run. A signal that arrives while no
    // stage is racing it stays pending and is seen by the next one.
    let mut interrupted = Box::pin(tokio::signal::ctrl_c());

    let renderer = tokio::select! {
        result = WebDriverRenderer::connect(&cli.webdriver_url, !cli.no_headless) => {
            result.context("Could not start the browser (is chromedriver running?)")?
        }
        _ = &mut interrupted => return Ok(cancelled()),
    };

    // The browser is closed on every path out of the crawl, cancellation
    // included, so no Chrome process is left behind
    let scan = tokio::select! {
        report = crawl_course(&renderer, &cli.url, cli.scan_options()) => Some(report),
        _ = &mut interrupted => None,
    };
    renderer.close().await;

    let Some(scan) = scan else {
        return Ok(cancelled());
    };

    info!("URL extraction complete");
    info!("Total unique URLs found: {}", scan.links.len());
    info!("Total courses visited: {}", scan.visited.len());

    if cli.no_verify {
        exit_on_interrupt(interrupted);
        print_unverified(&scan, cli.json)?;
        return Ok(0);
    }

    let verify_options = cli.verify_options();
    let verification = tokio::select! {
        result = checker::verify_links(&scan.links, &verify_options) => {
            result.context("Could not build the HTTP client")?
        }
        _ = &mut interrupted => return Ok(cancelled()),
    };

    exit_on_interrupt(interrupted);
    print_results(&scan, &verification, cli.json)?;
    Ok(0)
}

async fn crawl_course<R: PageRenderer>(
    renderer: &R,
    url: &str,
    options: ScanOptions,
) -> ScanReport {
    let mut scanner = Scanner::new(renderer, options);
    scanner.scan(url, 0).await;
    scanner.into_report()
}

// Nothing is left to tear down while the report prints, so a Ctrl-C there
// can end the process directly
fn exit_on_interrupt<F>(interrupted: F)
where
    F: Future<Output = std::io::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if interrupted.await.is_ok() {
            std::process::exit(cancelled());
        }
    });
}

fn cancelled() -> i32 {
    eprintln!("\n\nOperation cancelled by user.");
    EXIT_CANCELLED
}

// Counts per status across every discovered link (not per unique URL)
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
struct Summary {
    total: usize,
    unique: usize,
    working: usize,
    warnings: usize,
    broken: usize,
    errors: usize,
}

impl Summary {
    fn tally(links: &[DiscoveredLink], verification: &VerificationReport) -> Self {
        let mut summary = Summary {
            total: links.len(),
            unique: verification.by_url.len(),
            ..Summary::default()
        };
        for link in links {
            match verification.get(&link.url).status {
                LinkStatus::Ok => summary.working += 1,
                LinkStatus::Warning => summary.warnings += 1,
                LinkStatus::Broken => summary.broken += 1,
                LinkStatus::Error | LinkStatus::Unknown => summary.errors += 1,
            }
        }
        summary
    }
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    #[serde(flatten)]
    link: &'a DiscoveredLink,
    #[serde(skip_serializing_if = "Option::is_none")]
    verification: Option<Verification>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    links: Vec<JsonEntry<'a>>,
    courses_visited: usize,
    failed_pages: &'a [FailedPage],
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
}

// Prints discovered links without verification
fn print_unverified(scan: &ScanReport, json: bool) -> Result<()> {
    if json {
        let report = JsonReport {
            links: scan
                .links
                .iter()
                .map(|link| JsonEntry {
                    link,
                    verification: None,
                })
                .collect(),
            courses_visited: scan.visited.len(),
            failed_pages: &scan.failed,
            summary: None,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_heading("RESULTS (No Verification)");
    for (i, link) in scan.links.iter().enumerate() {
        println!("{}. {}", i + 1, link.display);
        if !link.link_text.is_empty() {
            println!("   Link text: {}", link.link_text);
        }
        println!();
    }
    print_failed_pages(&scan.failed);
    Ok(())
}

// Prints every discovered link with its verification result
fn print_results(scan: &ScanReport, verification: &VerificationReport, json: bool) -> Result<()> {
    let summary = Summary::tally(&scan.links, verification);

    if json {
        let report = JsonReport {
            links: scan
                .links
                .iter()
                .map(|link| JsonEntry {
                    link,
                    verification: Some(verification.get(&link.url)),
                })
                .collect(),
            courses_visited: scan.visited.len(),
            failed_pages: &scan.failed,
            summary: Some(summary),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_heading("FINAL RESULTS WITH VERIFICATION");
    for (i, link) in scan.links.iter().enumerate() {
        let result = verification.get(&link.url);
        println!(
            "{}. [{} {}] {}",
            i + 1,
            status_icon(result.status),
            result.status.as_str(),
            link.display
        );
        if !link.link_text.is_empty() {
            println!("   Link text: {}", link.link_text);
        }
        println!("   Verification: {}", result.message);
        if let Some(code) = result.code {
            println!("   HTTP Status: {}", code);
        }
        println!();
    }

    print_heading("VERIFICATION SUMMARY");
    println!("Total URLs: {}", summary.total);
    println!("Unique URLs: {}", summary.unique);
    println!("✓ Working: {}", summary.working);
    println!("⚠ Warnings: {}", summary.warnings);
    println!("✗ Broken: {}", summary.broken);
    println!("? Errors: {}", summary.errors);
    println!("{}", "=".repeat(80));

    print_failed_pages(&scan.failed);
    Ok(())
}

fn print_failed_pages(failed: &[FailedPage]) {
    if failed.is_empty() {
        return;
    }
    println!("\n⚠ {} page(s) could not be scanned:", failed.len());
    for page in failed {
        println!("   {} ({})", page.url, page.reason);
    }
}

fn print_heading(title: &str) {
    println!("\n{}", "=".repeat(80));
    println!("{}", title);
    println!("{}\n", "=".repeat(80));
}

fn status_icon(status: LinkStatus) -> &'static str {
    match status {
        LinkStatus::Ok => "✓",
        LinkStatus::Warning => "⚠",
        LinkStatus::Broken => "✗",
        LinkStatus::Error | LinkStatus::Unknown => "?",
    }
}
