// src/readable/extract.rs
// =============================================================================
// Readability extraction: find the main article in an HTML document and
// render it as plain text.
//
// How it works:
// 1. Parse the document with scraper (html5ever never rejects input, broken
//    markup just produces a best-effort tree)
// 2. Every paragraph-like node with enough text hands a score to its parent
//    and half of it to its grandparent
// 3. Each container also gets a score from its tag and from its class/id
//    names, then the total is scaled down by how much of its text is links
// 4. The best container plus any strong siblings next to it is rendered to
//    text, skipping scripts, styles, comments, navigation and forms
//
// The function is pure and deterministic: ties go to whichever container
// showed up first in the document.
// =============================================================================

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};

/// Minimum characters before a paragraph counts toward a container's score.
const MIN_PARAGRAPH_LEN: usize = 25;

/// Elements whose whole subtree is dropped from the rendered text.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "svg", "nav", "aside", "footer",
    "form", "button", "select", "head",
];

const PARAGRAPH_TAGS: &[&str] = &["p", "pre", "td", "blockquote"];

// Tags that end a line when rendered
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "body", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "ol", "p",
    "pre", "section", "table", "td", "th", "tr", "ul",
];

static POSITIVE_NAMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)article|body|content|entry|hentry|main|page|post|text|blog|story")
        .expect("positive class pattern is valid")
});

static NEGATIVE_NAMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)hidden|banner|combx|comment|com-|contact|foot|masthead|meta|nav|outbrain|promo|related|scroll|share|shoutbox|sidebar|skyscraper|sponsor|shopping|tags|tool|widget|ad-|advert|menu",
    )
    .expect("negative class pattern is valid")
});

// A container being considered as the article root
struct Candidate<'a> {
    element: ElementRef<'a>,
    score: f64,
}

/// Extracts the readable text of `html`.
///
/// Returns `None` when the document has no visible text at all; that is an
/// empty extraction, not an error.
pub fn extract(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let text = match best_candidate(&document) {
        Some((candidates, best)) => render_region(&candidates, best),
        None => String::new(),
    };

    if !text.is_empty() {
        return Some(text);
    }

    // Nothing scoreable, fall back to whatever the body says
    let body = document
        .root_element()
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "body")?;
    let text = render_text(body);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn best_candidate(document: &Html) -> Option<(Vec<Candidate<'_>>, usize)> {
    let mut candidates: Vec<Candidate<'_>> = Vec::new();
    let mut positions = HashMap::new();

    for node in document.root_element().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        if !PARAGRAPH_TAGS.contains(&element.value().name()) || inside_skipped(element) {
            continue;
        }

        let text = render_text(element);
        let length = text.chars().count();
        if length < MIN_PARAGRAPH_LEN {
            continue;
        }

        let commas = text.matches(',').count() as f64;
        let score = 1.0 + commas + (length as f64 / 100.0).floor().min(3.0);

        let parent = element.parent().and_then(ElementRef::wrap);
        let grandparent = parent.and_then(|p| p.parent()).and_then(ElementRef::wrap);

        for (ancestor, share) in [(parent, 1.0), (grandparent, 0.5)] {
            let Some(ancestor) = ancestor else {
                continue;
            };
            let slot = *positions.entry(ancestor.id()).or_insert_with(|| {
                candidates.push(Candidate {
                    element: ancestor,
                    score: initial_score(ancestor),
                });
                candidates.len() - 1
            });
            candidates[slot].score += score * share;
        }
    }

    for candidate in candidates.iter_mut() {
        candidate.score *= 1.0 - link_density(candidate.element);
    }

    let mut best: Option<usize> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        match best {
            Some(b) if candidates[b].score >= candidate.score => {}
            _ => best = Some(i),
        }
    }

    best.map(|b| (candidates, b))
}

// The winner plus the siblings that look like they belong to the same
// article, in document order.
fn render_region(candidates: &[Candidate<'_>], best: usize) -> String {
    let top = &candidates[best];
    let threshold = (top.score * 0.2).max(10.0);

    let Some(parent) = top.element.parent() else {
        return render_text(top.element);
    };

    let mut parts = Vec::new();
    for sibling in parent.children().filter_map(ElementRef::wrap) {
        let include = if sibling.id() == top.element.id() {
            true
        } else if let Some(c) = candidates.iter().find(|c| c.element.id() == sibling.id()) {
            c.score >= threshold
        } else if sibling.value().name() == "p" {
            let text = render_text(sibling);
            text.chars().count() > 80 && link_density(sibling) < 0.25
        } else {
            false
        };

        if include {
            let text = render_text(sibling);
            if !text.is_empty() {
                parts.push(text);
            }
        }
    }

    parts.join("\n")
}

fn initial_score(element: ElementRef<'_>) -> f64 {
    let tag_score = match element.value().name() {
        "article" | "main" => 10.0,
        "div" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    };
    tag_score + class_weight(element)
}

fn class_weight(element: ElementRef<'_>) -> f64 {
    let mut weight = 0.0;
    for name in [element.value().attr("class"), element.value().attr("id")]
        .into_iter()
        .flatten()
    {
        if NEGATIVE_NAMES.is_match(name) {
            weight -= 25.0;
        }
        if POSITIVE_NAMES.is_match(name) {
            weight += 25.0;
        }
    }
    weight
}

fn inside_skipped(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| SKIPPED_TAGS.contains(&a.value().name()))
}

/// Share of an element's text that sits inside links, 0.0..=1.0.
fn link_density(element: ElementRef<'_>) -> f64 {
    let total = render_text(element).chars().count();
    if total == 0 {
        return 0.0;
    }
    let linked: usize = element
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "a")
        .map(|a| render_text(a).chars().count())
        .sum();
    (linked as f64 / total as f64).min(1.0)
}

/// Renders an element's visible text with one line per block.
fn render_text(root: ElementRef<'_>) -> String {
    let mut raw = String::new();

    // Explicit stack instead of recursion: malformed pages can nest deeply.
    // The bool marks the closing visit of an element.
    let mut stack = vec![(*root, false)];
    while let Some((node, closing)) = stack.pop() {
        match node.value() {
            Node::Text(text) if !closing => raw.push_str(text),
            Node::Element(element) => {
                let name = element.name();
                let is_block = BLOCK_TAGS.contains(&name);
                if closing {
                    if is_block {
                        raw.push('\n');
                    }
                    continue;
                }
                if SKIPPED_TAGS.contains(&name) {
                    continue;
                }
                if is_block {
                    raw.push('\n');
                }
                stack.push((node, true));
                let children: Vec<_> = node.children().collect();
                for child in children.into_iter().rev() {
                    stack.push((child, false));
                }
            }
            // comments, doctypes, processing instructions
            _ => {}
        }
    }

    normalize_whitespace(&raw)
}

/// Collapses runs of whitespace inside each line and drops blank lines.
pub fn normalize_whitespace(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
