// src/crawl/extract.rs
// =============================================================================
// This module pulls structured data out of rendered course markup.
//
// A rendered Rise course page gives us three things we care about:
// - The lesson navigation sidebar (anchors marked with data-link)
// - The lesson heading (h1.lesson-header__title)
// - Every outbound http(s) link inside the lesson body
//
// We use the `scraper` crate to parse the markup into a DOM and query it
// with CSS selectors, exactly like a browser's querySelectorAll().
// =============================================================================

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

/// Fragment prefix used by Rise for lesson navigation targets
pub const LESSON_FRAGMENT_PREFIX: &str = "#/lessons/";

/// Title used when a lesson page has no heading
pub const UNKNOWN_LESSON: &str = "Unknown Lesson";

// Navigation entries carry data-link="lesson-link-item"
const LESSON_NAV_SELECTOR: &str = r#"a[data-link="lesson-link-item"]"#;
const LESSON_TITLE_SELECTOR: &str = "h1.lesson-header__title";
const LINK_SELECTOR: &str = "a[href]";

// A lesson found in a course's navigation sidebar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    /// Opaque lesson id taken from the URL fragment
    pub id: String,
    /// Full lesson URL: course base URL + "#/lessons/" + id
    pub url: String,
    /// Title shown in the navigation entry (first line only)
    pub title: String,
}

// An outbound link found on a lesson page
//
// Two links are the same entry when their `display` strings match, so the
// same URL referenced from two different lessons produces two entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredLink {
    pub url: String,
    pub link_text: String,
    pub lesson: String,
    pub display: String,
}

impl DiscoveredLink {
    pub fn new(
        url: impl Into<String>,
        link_text: impl Into<String>,
        lesson: impl Into<String>,
    ) -> Self {
        let url = url.into();
        let lesson = lesson.into();
        let display = format!("{} is in '{}'", url, lesson);
        Self {
            url,
            link_text: link_text.into(),
            lesson,
            display,
        }
    }
}

// Extracts the ordered lesson list from a course landing page
//
// Parameters:
//   html: rendered markup of the course page
//   course_base_url: course URL without any fragment
//
// Anchors without the navigation marker, or whose href does not start with
// "#/lessons/", are skipped silently.
pub fn extract_lesson_navigation(html: &str, course_base_url: &str) -> Vec<Lesson> {
    let document = Html::parse_document(html);
    let selector = selector(LESSON_NAV_SELECTOR);

    document
        .select(&selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let id = href.strip_prefix(LESSON_FRAGMENT_PREFIX)?;

            // Nav entries often append a progress indicator on a second line
            let text = element.text().collect::<String>();
            let title = text
                .trim()
                .split('\n')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();

            Some(Lesson {
                id: id.to_string(),
                url: format!("{}{}{}", course_base_url, LESSON_FRAGMENT_PREFIX, id),
                title,
            })
        })
        .collect()
}

/// Returns the trimmed lesson heading, or "Unknown Lesson" if there is none.
pub fn extract_page_title(html: &str) -> String {
    let document = Html::parse_document(html);
    let selector = selector(LESSON_TITLE_SELECTOR);

    document
        .select(&selector)
        .next()
        .map(element_text)
        .unwrap_or_else(|| UNKNOWN_LESSON.to_string())
}

// Extracts every outbound http(s) link from a lesson page
//
// Relative links, mailto:, tel:, javascript: and in-page anchors are
// dropped. Unlike a general crawler we do NOT resolve relative links:
// course navigation is handled separately through the sidebar.
//
// Example:
//   html = "<a href='https://rust-lang.org'> Rust </a><a href='/docs'>Docs</a>"
//   lesson_title = "Intro"
//   result = [DiscoveredLink { url: "https://rust-lang.org", link_text: "Rust", .. }]
pub fn extract_outbound_links(html: &str, lesson_title: &str) -> Vec<DiscoveredLink> {
    let document = Html::parse_document(html);
    let selector = selector(LINK_SELECTOR);

    document
        .select(&selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            if !is_checkable_link(href) {
                return None;
            }
            Some(DiscoveredLink::new(href, element_text(element), lesson_title))
        })
        .collect()
}

// Only absolute http/https targets are kept
fn is_checkable_link(href: &str) -> bool {
    href.starts_with("http")
}

// Concatenated text of an element, trimmed at both ends. Inner spacing is
// kept: titles end up in the display string, which is the dedup key.
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

// Our selectors are constants, so a parse failure is a programmer error
fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static CSS selector is valid")
}
