//! Text excerpt extraction.
//!
//! Fetches the infringing page, reduces it to visible text and keeps short
//! windows of context around each occurrence of a product term.

use std::collections::HashSet;

use anyhow::{bail, Error, Result};
use scraper::{Html, Node};

use crate::config::{EXCERPT_CONTEXT_CHARS, HTML_FETCH_TIMEOUT, MAX_EXCERPTS, MAX_RESPONSE_BODY_SIZE};
use crate::evidence::request::apply_browser_headers;
use crate::models::MatchedExcerpt;

/// Words that describe a product category rather than a specific product.
/// A keyword made only of these would match half the internet.
const GENERIC_TERMS: &[&str] = &[
    "template", "templates", "notion", "course", "courses", "ebook", "ebooks", "guide",
    "guides", "bundle", "bundles", "planner", "planners", "preset", "presets", "lightroom",
    "canva", "printable", "printables", "worksheet", "workbook", "tutorial", "tutorials",
    "masterclass", "download", "free", "pdf", "digital", "product", "products", "pack",
    "kit", "toolkit", "system", "dashboard", "tracker", "checklist", "spreadsheet", "excel",
    "google", "sheets", "video", "videos", "online", "premium", "best", "ultimate", "complete",
    "the", "and", "for", "with", "of", "a", "an", "to", "in", "my", "your",
];

/// Minimum length of a keyword worth searching for.
const MIN_TERM_CHARS: usize = 4;

/// Whether a keyword is too generic to serve as evidence on its own.
pub fn is_generic_term(term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.chars().count() < MIN_TERM_CHARS {
        return true;
    }
    term.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .all(|w| GENERIC_TERMS.contains(&w))
}

/// Terms to search for: the product name, then non-generic keywords and identifiers.
pub fn build_search_terms(
    product_name: &str,
    keywords: &[String],
    unique_identifiers: &[String],
) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    let mut push = |t: &str| {
        let t = t.trim();
        if !t.is_empty() && !terms.iter().any(|e| e.eq_ignore_ascii_case(t)) {
            terms.push(t.to_string());
        }
    };
    push(product_name);
    for id in unique_identifiers {
        push(id);
    }
    for kw in keywords.iter().filter(|k| !is_generic_term(k)) {
        push(kw);
    }
    terms
}

/// Visible text of an HTML document, whitespace collapsed, without script,
/// style and noscript content.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| matches!(e.name(), "script" | "style" | "noscript" | "template"))
        });
        if hidden {
            continue;
        }
        for word in text.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Finds up to `MAX_EXCERPTS` unique excerpts with `EXCERPT_CONTEXT_CHARS` of
/// context on each side of a term occurrence.
pub fn find_excerpts(text: &str, terms: &[String]) -> Vec<MatchedExcerpt> {
    // Char-indexed so context windows never split a UTF-8 sequence
    let chars: Vec<char> = text.chars().collect();
    let folded: Vec<char> = chars.iter().copied().map(fold).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut excerpts = Vec::new();

    for term in terms {
        let needle: Vec<char> = term.chars().map(fold).collect();
        if needle.is_empty() || needle.len() > folded.len() {
            continue;
        }
        let mut i = 0;
        while i + needle.len() <= folded.len() {
            if folded[i..i + needle.len()] != needle[..] {
                i += 1;
                continue;
            }
            let start = i.saturating_sub(EXCERPT_CONTEXT_CHARS);
            let end = (i + needle.len() + EXCERPT_CONTEXT_CHARS).min(chars.len());
            let excerpt: String = chars[start..end].iter().collect::<String>().trim().to_string();
            if seen.insert(excerpt.clone()) {
                excerpts.push(MatchedExcerpt {
                    term: term.clone(),
                    excerpt,
                });
                if excerpts.len() >= MAX_EXCERPTS {
                    return excerpts;
                }
            }
            i += needle.len();
        }
    }
    excerpts
}

/// Fetches `url` and extracts excerpts for `terms`.
pub async fn extract_excerpts(
    client: &reqwest::Client,
    url: &str,
    terms: &[String],
) -> Result<Vec<MatchedExcerpt>, Error> {
    let resp = apply_browser_headers(client.get(url))
        .timeout(HTML_FETCH_TIMEOUT)
        .send()
        .await?;
    if !resp.status().is_success() {
        bail!("page returned status {}", resp.status());
    }
    let body = resp.bytes().await?;
    let body = &body[..body.len().min(MAX_RESPONSE_BODY_SIZE)];
    let html = String::from_utf8_lossy(body);
    Ok(find_excerpts(&visible_text(&html), terms))
}
