// src/crawl/scanner.rs
// =============================================================================
// This module implements the recursive course traversal.
//
// How it works:
// 1. Strip the fragment from the course URL to get its base URL
// 2. Skip the course if that base URL was already visited
// 3. Render the course landing page and read its lesson navigation
// 4. Render each lesson, read its title and outbound links
// 5. Accumulate links (deduplicated by display string)
// 6. Links pointing at other Rise courses become recursion candidates,
//    scanned depth-first once the current course is finished
//
// Termination:
// - The visited set stops cycles between courses that link to each other
// - max_depth stops unbounded fan-out
//
// Failures are contained: a course that fails to render is skipped, a lesson
// that fails to render is skipped, and the rest of the crawl continues.
// =============================================================================

use super::extract::{
    extract_lesson_navigation, extract_outbound_links, extract_page_title, DiscoveredLink,
};
use super::renderer::PageRenderer;
use futures::future::{FutureExt, LocalBoxFuture};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const RISE_HOST: &str = "rise.articulate.com";
const SHARE_PATH: &str = "/share/";

// Knobs for one traversal run
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// The starting course is depth 0; courses at max_depth do not recurse
    pub max_depth: usize,
    /// Wait after loading a course landing page
    pub course_settle: Duration,
    /// Wait after loading a lesson page
    pub lesson_settle: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_depth: 2,
            course_settle: Duration::from_secs(5),
            lesson_settle: Duration::from_secs(3),
        }
    }
}

// A course or lesson page that could not be rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedPage {
    pub url: String,
    pub reason: String,
}

// Everything a traversal run produced
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Discovered links in insertion order, unique by display string
    pub links: Vec<DiscoveredLink>,
    /// Base URLs of every course visited
    pub visited: HashSet<String>,
    /// Pages that failed to render
    pub failed: Vec<FailedPage>,
}

// The traversal engine
//
// Owns the visited set and the accumulated links for one run. The
// renderer is borrowed so the caller keeps control of the browser session
// and can always shut it down, whatever happens here.
pub struct Scanner<'r, R: PageRenderer> {
    renderer: &'r R,
    options: ScanOptions,
    visited: HashSet<String>,
    links: Vec<DiscoveredLink>,
    seen_displays: HashSet<String>,
    failed: Vec<FailedPage>,
}

impl<'r, R: PageRenderer> Scanner<'r, R> {
    pub fn new(renderer: &'r R, options: ScanOptions) -> Self {
        Self {
            renderer,
            options,
            visited: HashSet::new(),
            links: Vec::new(),
            seen_displays: HashSet::new(),
            failed: Vec::new(),
        }
    }

    pub fn into_report(self) -> ScanReport {
        ScanReport {
            links: self.links,
            visited: self.visited,
            failed: self.failed,
        }
    }

    // Scans a course and, recursively, every linked course
    //
    // Returns a boxed future because an async fn cannot call itself
    // directly: its future type would be infinitely sized.
    pub fn scan<'s>(&'s mut self, course_url: &'s str, depth: usize) -> LocalBoxFuture<'s, ()> {
        async move {
            let base_url = base_url(course_url);
            if !self.visited.insert(base_url.to_string()) {
                return;
            }

            let indent = "  ".repeat(depth);
            info!("{}Scanning course: {}", indent, base_url);

            let candidates = match self.scan_lessons(course_url, base_url, depth).await {
                Ok(candidates) => candidates,
                Err(reason) => {
                    warn!("{}Error scanning {}: {}", indent, course_url, reason);
                    self.failed.push(FailedPage {
                        url: course_url.to_string(),
                        reason,
                    });
                    return;
                }
            };

            if candidates.is_empty() || depth >= self.options.max_depth {
                return;
            }

            info!("{}Found {} linked courses to scan...", indent, candidates.len());
            for candidate in candidates {
                self.scan(&candidate, depth + 1).await;
            }
        }
        .boxed_local()
    }

    // Visits every lesson of one course and returns the recursion candidates
    //
    // Only a failure to render the landing page is an error here; lesson
    // failures are recorded and skipped.
    async fn scan_lessons(
        &mut self,
        course_url: &str,
        base_url: &str,
        depth: usize,
    ) -> Result<Vec<String>, String> {
        let indent = "  ".repeat(depth);

        let html = self
            .renderer
            .render(course_url, self.options.course_settle)
            .await
            .map_err(|e| e.to_string())?;
        let lessons = extract_lesson_navigation(&html, base_url);
        info!("{}Found {} lessons", indent, lessons.len());

        let mut candidates = Vec::new();
        let mut seen_candidates = HashSet::new();

        for (i, lesson) in lessons.iter().enumerate() {
            info!("{}  [{}/{}] {}", indent, i + 1, lessons.len(), lesson.title);
            debug!(lesson_id = %lesson.id, url = %lesson.url, "rendering lesson");

            let html = match self
                .renderer
                .render(&lesson.url, self.options.lesson_settle)
                .await
            {
                Ok(html) => html,
                Err(e) => {
                    warn!("{}  Skipping lesson '{}': {}", indent, lesson.title, e);
                    self.failed.push(FailedPage {
                        url: lesson.url.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let lesson_title = extract_page_title(&html);
            for link in extract_outbound_links(&html, &lesson_title) {
                if depth < self.options.max_depth
                    && is_similar_course(&link.url)
                    && seen_candidates.insert(link.url.clone())
                {
                    candidates.push(link.url.clone());
                }
                self.push_link(link);
            }
        }

        Ok(candidates)
    }

    // Appends a link unless an entry with the same display string exists
    fn push_link(&mut self, link: DiscoveredLink) {
        if self.seen_displays.insert(link.display.clone()) {
            self.links.push(link);
        }
    }
}

/// Course URL with everything from the first '#' removed
pub fn base_url(url: &str) -> &str {
    match url.find('#') {
        Some(index) => &url[..index],
        None => url,
    }
}

/// True if the URL points at another shared Rise course
pub fn is_similar_course(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            parsed
                .host_str()
                .is_some_and(|host| host.contains(RISE_HOST))
                && parsed.path().contains(SHARE_PATH)
        }
        Err(_) => false,
    }
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why depth-first recursion instead of a queue?
//    - Courses are finished one at a time, in document order, which keeps
//      the progress output readable and the result order deterministic
//    - One browser session means there is no parallelism to gain anyway
//
// 2. Why dedupe links by display string and not URL?
//    - The report is "where is this URL used", so the same URL in two
//      lessons is two findings. Verification dedupes by URL later.
//
// 3. Why LocalBoxFuture?
//    - The future borrows the scanner mutably and does not need to move
//      between threads, so it does not have to be Send
// -----------------------------------------------------------------------------
