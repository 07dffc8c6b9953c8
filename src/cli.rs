// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// There is a single command: scan one course URL. Flags control how deep we
// follow links into other courses, how the browser runs, and how the
// verification stage behaves.
// =============================================================================

use crate::checker::VerifyOptions;
use crate::crawl::ScanOptions;
use anyhow::{bail, Result};
use clap::Parser;
use std::time::Duration;
use url::Url;

#[derive(Parser, Debug)]
#[command(
    name = "rise-scanner",
    version,
    about = "Scan Articulate Rise courses for URLs and verify their status",
    after_help = "Examples:\n  \
        rise-scanner https://rise.articulate.com/share/your-course-id\n  \
        rise-scanner https://rise.articulate.com/share/your-course-id --no-verify\n  \
        rise-scanner https://rise.articulate.com/share/your-course-id --max-depth 1\n  \
        rise-scanner https://rise.articulate.com/share/your-course-id --no-headless"
)]
pub struct Cli {
    /// Articulate Rise course URL to scan
    pub url: String,

    /// Maximum recursion depth for linked courses
    ///
    /// The starting course is depth 0. Depth 2 means: the course, the
    /// courses it links to, and the courses those link to.
    #[arg(long, default_value_t = 2)]
    pub max_depth: usize,

    /// Skip URL verification and just list what was found
    #[arg(long)]
    pub no_verify: bool,

    /// Run the browser in visible mode (not headless)
    #[arg(long)]
    pub no_headless: bool,

    /// Maximum parallel workers for URL verification
    #[arg(long, default_value_t = 10)]
    pub max_workers: usize,

    /// Per-URL verification timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// Suppress progress messages (results are still printed)
    #[arg(long)]
    pub quiet: bool,

    /// Output results in JSON format instead of a listing
    #[arg(long)]
    pub json: bool,

    /// WebDriver endpoint used to render course pages (e.g. chromedriver)
    #[arg(long, env = "WEBDRIVER_URL", default_value = "http://localhost:9515")]
    pub webdriver_url: String,

    /// Seconds to wait for a course landing page to finish rendering
    #[arg(long, default_value_t = 5)]
    pub course_settle: u64,

    /// Seconds to wait for a lesson page to finish rendering
    #[arg(long, default_value_t = 3)]
    pub lesson_settle: u64,
}

impl Cli {
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            max_depth: self.max_depth,
            course_settle: Duration::from_secs(self.course_settle),
            lesson_settle: Duration::from_secs(self.lesson_settle),
        }
    }

    pub fn verify_options(&self) -> VerifyOptions {
        VerifyOptions {
            max_workers: self.max_workers.max(1),
            timeout: Duration::from_secs(self.timeout),
        }
    }
}

// Rejects anything that isn't an absolute http(s) URL
//
// This runs before the browser starts, so a typo never costs a browser
// launch or a network request.
pub fn validate_course_url(url: &str) -> Result<()> {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => bail!("Invalid URL format. URL must start with http:// or https://"),
    }
}
