//! Parser for catalog-style sites (books.toscrape.com layout)
//!
//! Listing pages carry one `article.product_pod` per item with the name,
//! price, star rating and item link embedded, so no secondary fetch is
//! needed to build a usable record. Detail pages, when enabled for the
//! site, enrich a record with description, stock count, breadcrumb category
//! and UPC identifier.

use crate::record::RawRecord;
use crate::sites::{resolve_href, Listing, ParseError, SiteParser};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Star ratings are encoded as a class name on the rating element,
/// e.g. `<p class="star-rating Three">`.
const RATING_WORDS: [&str; 5] = ["One", "Two", "Three", "Four", "Five"];

/// Parser for the catalog page template
pub struct CatalogParser;

impl SiteParser for CatalogParser {
    fn id(&self) -> &'static str {
        "catalog"
    }

    fn parse_listing(&self, html: &str, page_url: &Url) -> Result<Listing, ParseError> {
        let document = Html::parse_document(html);

        // The item list container is part of the template; its absence means
        // the page is not a catalog listing at all.
        if !has_element(&document, "ol.row") {
            return Err(ParseError::MissingStructure {
                url: page_url.to_string(),
                what: "ol.row item list",
            });
        }

        // Category pages title themselves in the page header; items on the
        // listing inherit it.
        let category = select_text(&document, ".page-header h1").unwrap_or_default();

        let mut items = Vec::new();
        if let Ok(pod) = Selector::parse("article.product_pod") {
            for article in document.select(&pod) {
                match extract_summary(&article, page_url, &category) {
                    Some(record) => items.push(record),
                    None => {
                        tracing::debug!("Skipping product_pod without an item link");
                    }
                }
            }
        }

        let next_page = select_href(&document, "li.next a", page_url);

        Ok(Listing { items, next_page })
    }

    fn parse_detail(&self, html: &str, url: &Url) -> Result<RawRecord, ParseError> {
        let document = Html::parse_document(html);

        if !has_element(&document, "div.product_main") {
            return Err(ParseError::MissingStructure {
                url: url.to_string(),
                what: "div.product_main",
            });
        }

        let name = select_text(&document, "div.product_main h1")
            .unwrap_or_else(|| "Unknown Title".to_string());
        let price = select_text(&document, "div.product_main p.price_color");
        let rating = rating_word(&document, "div.product_main p.star-rating");
        let availability =
            select_text(&document, "div.product_main .availability").map(availability_count);
        let description = select_text(&document, "#product_description + p");
        let category = breadcrumb_category(&document).unwrap_or_default();
        let identifier = table_value(&document, "UPC");

        Ok(RawRecord {
            name,
            price,
            rating,
            availability,
            description,
            category,
            tags: Vec::new(),
            identifier,
            url: url.to_string(),
        })
    }

    fn supports_details(&self) -> bool {
        true
    }
}

/// Extracts one record from a listing-page item summary.
///
/// Returns `None` only when the item has no link at all; every other missing
/// field falls back to a default.
fn extract_summary(article: &ElementRef, page_url: &Url, category: &str) -> Option<RawRecord> {
    let link_sel = Selector::parse("h3 a").ok()?;
    let link = article.select(&link_sel).next()?;
    let url = resolve_href(link.value().attr("href")?, page_url)?;

    // The title attribute holds the full name; the anchor text is truncated.
    let name = link
        .value()
        .attr("title")
        .map(str::to_string)
        .unwrap_or_else(|| element_text(&link));

    let price_sel = Selector::parse("p.price_color").ok()?;
    let price = article
        .select(&price_sel)
        .next()
        .map(|e| element_text(&e))
        .filter(|s| !s.is_empty());

    let rating_sel = Selector::parse("p.star-rating").ok()?;
    let rating = article
        .select(&rating_sel)
        .next()
        .and_then(|e| rating_class(&e));

    let instock_sel = Selector::parse(".instock.availability").ok()?;
    let availability = article.select(&instock_sel).next().map(|_| 1);

    Some(RawRecord {
        name,
        price,
        rating,
        availability,
        description: None,
        category: category.to_string(),
        tags: Vec::new(),
        identifier: None,
        url: url.to_string(),
    })
}

/// Reads the rating word out of a rating element's class list.
fn rating_class(element: &ElementRef) -> Option<String> {
    element
        .value()
        .classes()
        .find(|class| RATING_WORDS.contains(class))
        .map(str::to_string)
}

fn rating_word(document: &Html, selector: &'static str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    document.select(&sel).next().and_then(|e| rating_class(&e))
}

/// Parses the stock count from availability text like
/// "In stock (22 available)". Text without a count but mentioning stock
/// counts as a single unit; anything else as zero.
fn availability_count(text: String) -> u32 {
    if let Some(open) = text.find('(') {
        let rest = &text[open + 1..];
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() && rest[digits.len()..].trim_start().starts_with("available") {
            if let Ok(count) = digits.parse() {
                return count;
            }
        }
    }

    if text.to_lowercase().contains("in stock") {
        1
    } else {
        0
    }
}

/// Category is the last breadcrumb link: Home / Books / <Category> / Title.
fn breadcrumb_category(document: &Html) -> Option<String> {
    let sel = Selector::parse("ul.breadcrumb li a").ok()?;
    document
        .select(&sel)
        .last()
        .map(|e| element_text(&e))
        .filter(|s| !s.is_empty())
}

/// Looks up a value in the product information table by its header cell.
fn table_value(document: &Html, header: &str) -> Option<String> {
    let row_sel = Selector::parse("table.table-striped tr").ok()?;
    let th_sel = Selector::parse("th").ok()?;
    let td_sel = Selector::parse("td").ok()?;

    for row in document.select(&row_sel) {
        let matches = row
            .select(&th_sel)
            .next()
            .map(|th| element_text(&th) == header)
            .unwrap_or(false);
        if matches {
            return row
                .select(&td_sel)
                .next()
                .map(|td| element_text(&td))
                .filter(|s| !s.is_empty());
        }
    }
    None
}

fn has_element(document: &Html, selector: &'static str) -> bool {
    Selector::parse(selector)
        .map(|sel| document.select(&sel).next().is_some())
        .unwrap_or(false)
}

fn select_text(document: &Html, selector: &'static str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .next()
        .map(|e| element_text(&e))
        .filter(|s| !s.is_empty())
}

fn select_href(document: &Html, selector: &'static str, page_url: &Url) -> Option<Url> {
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .next()
        .and_then(|e| e.value().attr("href"))
        .and_then(|href| resolve_href(href, page_url))
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}
