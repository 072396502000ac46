//! Parser for quote-style sites (quotes.toscrape.com layout)
//!
//! Listing pages carry `div.quote` text blocks with an author and tags and
//! there are no per-item detail pages. The source domain has no prices or
//! ratings, so records are emitted with fixed sentinel values
//! (`price = "0.0"`, `rating = "5.0"`) and `category = "Quotes"`; the
//! quote's tags are kept for category filtering.

use crate::record::RawRecord;
use crate::sites::{resolve_href, Listing, ParseError, SiteParser};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Every quote record carries this category.
const QUOTE_CATEGORY: &str = "Quotes";

/// Parser for the quote page template
pub struct QuoteParser;

impl SiteParser for QuoteParser {
    fn id(&self) -> &'static str {
        "quotes"
    }

    fn parse_listing(&self, html: &str, page_url: &Url) -> Result<Listing, ParseError> {
        let document = Html::parse_document(html);

        // Quote listings live inside a col-md-8 column; a page without it is
        // not a quotes listing.
        let wrapper = Selector::parse("div.col-md-8")
            .ok()
            .filter(|sel| document.select(sel).next().is_some());
        if wrapper.is_none() {
            return Err(ParseError::MissingStructure {
                url: page_url.to_string(),
                what: "div.col-md-8 quote column",
            });
        }

        let mut items = Vec::new();
        if let Ok(quote_sel) = Selector::parse("div.quote") {
            for quote in document.select(&quote_sel) {
                items.push(extract_quote(&quote, page_url));
            }
        }

        let next_page = next_page_link(&document, page_url);

        Ok(Listing { items, next_page })
    }

    fn parse_detail(&self, _html: &str, _url: &Url) -> Result<RawRecord, ParseError> {
        Err(ParseError::DetailUnsupported { site: "quotes" })
    }
}

/// Builds a record from a single quote block.
///
/// A missing author defaults to "Unknown"; a missing text span leaves the
/// description empty. Neither aborts the listing.
fn extract_quote(quote: &ElementRef, page_url: &Url) -> RawRecord {
    let author = child_text(quote, "small.author").unwrap_or_else(|| "Unknown".to_string());
    let text = child_text(quote, "span.text");

    let mut tags = Vec::new();
    if let Ok(tag_sel) = Selector::parse("a.tag") {
        for tag in quote.select(&tag_sel) {
            let tag_text = tag.text().collect::<String>().trim().to_string();
            if !tag_text.is_empty() {
                tags.push(tag_text);
            }
        }
    }

    RawRecord {
        name: format!("Quote by {}", author),
        price: Some("0.0".to_string()),
        rating: Some("5.0".to_string()),
        availability: None,
        description: text,
        category: QUOTE_CATEGORY.to_string(),
        tags,
        identifier: None,
        url: page_url.to_string(),
    }
}

fn child_text(element: &ElementRef, selector: &'static str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    element
        .select(&sel)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn next_page_link(document: &Html, page_url: &Url) -> Option<Url> {
    let sel = Selector::parse("li.next a").ok()?;
    document
        .select(&sel)
        .next()
        .and_then(|e| e.value().attr("href"))
        .and_then(|href| resolve_href(href, page_url))
}
