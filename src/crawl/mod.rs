// src/crawl/mod.rs
// =============================================================================
// This module handles course crawling.
//
// Submodules:
// - extract: Reads lessons, titles and outbound links out of rendered markup
// - renderer: Renders pages in a real browser (Rise courses need JavaScript)
// - scanner: Recursive, depth-limited traversal across linked courses
// =============================================================================

mod extract;
mod renderer;
mod scanner;

pub use extract::DiscoveredLink;
pub use renderer::{PageRenderer, WebDriverRenderer};
pub use scanner::{FailedPage, ScanOptions, ScanReport, Scanner};
