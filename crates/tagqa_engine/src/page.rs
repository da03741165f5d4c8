use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::InteractiveElement;

/// A resource the page would request while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subresource {
    pub url: String,
    pub resource_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageScan {
    pub subresources: Vec<Subresource>,
    pub elements: Vec<InteractiveElement>,
}

const SUBRESOURCE_SOURCES: &[(&str, &str, &str)] = &[
    ("img[src]", "src", "image"),
    ("script[src]", "src", "script"),
    ("link[rel~=\"stylesheet\"][href]", "href", "stylesheet"),
    ("link[rel~=\"icon\"][href]", "href", "image"),
    ("link[rel=\"preload\"][as=\"font\"][href]", "href", "font"),
    ("iframe[src]", "src", "document"),
    ("video[src]", "src", "media"),
    ("audio[src]", "src", "media"),
    ("source[src]", "src", "media"),
    ("input[type=\"image\"][src]", "src", "image"),
];

/// Reads subresources and interactive elements out of `html`.
///
/// Relative references resolve against `base_url`; `data:` and `javascript:`
/// references are skipped, as are repeats of a URL already listed.
pub fn scan_page(html: &str, base_url: &str, max_subresources: usize) -> PageScan {
    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok();

    let mut seen = HashSet::new();
    let mut subresources = Vec::new();
    'sources: for (selector, attr, resource_type) in SUBRESOURCE_SOURCES {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        for node in document.select(&selector) {
            if subresources.len() >= max_subresources {
                break 'sources;
            }
            let Some(raw) = node.value().attr(attr) else {
                continue;
            };
            let Some(resolved) = resolve(base.as_ref(), raw) else {
                continue;
            };
            if seen.insert(resolved.clone()) {
                subresources.push(Subresource {
                    url: resolved,
                    resource_type,
                });
            }
        }
    }

    PageScan {
        subresources,
        elements: interactive_elements(&document),
    }
}

/// Resolves `href` the way a click on it would.
pub fn resolve_href(base_url: &str, href: &str) -> Option<String> {
    resolve(Url::parse(base_url).ok().as_ref(), href)
}

fn resolve(base: Option<&Url>, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("data:") || raw.starts_with("javascript:") {
        return None;
    }
    let resolved = match base {
        Some(base) => base.join(raw).ok()?,
        None => Url::parse(raw).ok()?,
    };
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

fn interactive_elements(document: &Html) -> Vec<InteractiveElement> {
    let Ok(selector) = Selector::parse("button, a[href]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .enumerate()
        .map(|(index, node)| {
            let attrs = node.value();
            InteractiveElement {
                index,
                tag: attrs.name().to_ascii_lowercase(),
                element_id: attrs.attr("id").map(str::to_string).filter(|id| !id.is_empty()),
                text: node.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" "),
                href: attrs.attr("href").map(|h| h.trim().to_string()),
                target: attrs.attr("target").map(str::to_string),
                visible: is_visible(node),
                enabled: attrs.attr("disabled").is_none(),
            }
        })
        .collect()
}

// Static approximation: hidden via attribute or inline style on the element or an ancestor.
fn is_visible(node: ElementRef) -> bool {
    std::iter::once(node)
        .chain(node.ancestors().filter_map(ElementRef::wrap))
        .all(|el| {
            let attrs = el.value();
            let hidden_style = attrs.attr("style").is_some_and(|style| {
                let compact: String = style.chars().filter(|c| !c.is_whitespace()).collect();
                let compact = compact.to_ascii_lowercase();
                compact.contains("display:none") || compact.contains("visibility:hidden")
            });
            attrs.attr("hidden").is_none() && !hidden_style
        })
}
