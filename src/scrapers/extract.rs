use scraper::{ElementRef, Html, Selector};
use tracing::warn;
use url::Url;

use crate::config::SiteProfile;
use crate::models::Listing;

/// What one result page parsed down to
#[derive(Debug, Default)]
pub struct ParsedPage {
    pub listings: Vec<Listing>,
    /// Block marker found by a raw-body scan, set only when no listings
    /// were found
    pub blocked: Option<String>,
    /// True when a pagination control suggests more pages exist
    pub has_more: bool,
}

/// Parse one result page into listings plus paging and block signals.
///
/// `scraper::Html` is not `Send`, so parsing stays inside this synchronous
/// helper and never crosses an await point.
pub fn parse_listing_page(html: &str, site: &SiteProfile) -> ParsedPage {
    let document = Html::parse_document(html);
    let table = &site.selectors;

    let mut listings = Vec::new();
    for raw in &table.listing {
        let Ok(selector) = Selector::parse(raw) else {
            warn!(selector = %raw, "skipping unparsable listing selector");
            continue;
        };
        let cards: Vec<ElementRef<'_>> = document.select(&selector).collect();
        if cards.is_empty() {
            continue;
        }
        for card in cards {
            listings.push(parse_card(card, site));
        }
        // first container selector that matches anything wins
        break;
    }

    let blocked = if listings.is_empty() {
        detect_block(html, &site.block_markers)
    } else {
        None
    };

    ParsedPage {
        has_more: has_load_more(&document, &table.load_more),
        listings,
        blocked,
    }
}

fn parse_card(card: ElementRef<'_>, site: &SiteProfile) -> Listing {
    let table = &site.selectors;
    let mut listing = Listing::default();

    if let Some(title) = extract_text(card, &table.title) {
        listing.title = title;
    }
    if let Some(price) = extract_text(card, &table.price) {
        listing.price = price;
    }
    if let Some(location) = extract_text(card, &table.location) {
        listing.location = location;
    }
    if let Some(date) = extract_text(card, &table.date) {
        listing.date = date;
    }
    if let Some(seller) = extract_text(card, &table.seller) {
        listing.seller = seller;
    }
    if let Some(href) = extract_attr(card, &table.link, "href") {
        listing.url = resolve_url(&site.base_url, &href);
    }
    if let Some(src) = extract_attr(card, &table.image, "src") {
        listing.image = src;
    }
    listing
}

/// First non-empty text match across an ordered selector list.
///
/// Unparsable selectors are skipped, as are elements whose text collapses
/// to nothing after trimming.
fn extract_text(element: ElementRef<'_>, selectors: &[String]) -> Option<String> {
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(found) = element.select(&selector).next() {
            let text = found.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Attribute variant of [`extract_text`], for hrefs and image sources.
fn extract_attr(element: ElementRef<'_>, selectors: &[String], attr: &str) -> Option<String> {
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(found) = element.select(&selector).next() {
            if let Some(value) = found.value().attr(attr) {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

fn resolve_url(base: &str, href: &str) -> String {
    match Url::parse(base).and_then(|parsed| parsed.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Scan the text a visitor would actually see for a block marker.
///
/// Only rendered text counts: markup, attribute values and script bodies
/// are skipped, so a page that merely loads a recaptcha asset does not
/// register as blocked.
pub fn detect_visible_block(html: &str, site: &SiteProfile) -> Option<String> {
    let document = Html::parse_document(html);
    let mut text = String::new();
    collect_visible_text(document.root_element(), &mut text);
    find_marker(&text.to_lowercase(), &site.block_markers)
}

fn collect_visible_text(element: ElementRef<'_>, buf: &mut String) {
    use scraper::Node;

    for child in element.children() {
        match child.value() {
            Node::Text(text) => buf.push_str(text),
            Node::Element(el) => {
                if el.name() == "script" || el.name() == "style" {
                    continue;
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_visible_text(child_ref, buf);
                }
            }
            _ => {}
        }
    }
}

fn detect_block(html: &str, markers: &[String]) -> Option<String> {
    find_marker(&html.to_lowercase(), markers)
}

fn find_marker(lowered: &str, markers: &[String]) -> Option<String> {
    markers
        .iter()
        .find(|marker| lowered.contains(marker.as_str()))
        .cloned()
}

fn has_load_more(document: &Html, selectors: &[String]) -> bool {
    selectors.iter().any(|raw| {
        Selector::parse(raw)
            .map(|selector| document.select(&selector).next().is_some())
            .unwrap_or(false)
    })
}
