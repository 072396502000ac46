//! Site parsers for the supported page templates
//!
//! Each target site implements [`SiteParser`], a closed capability set over
//! two fixed HTML layouts:
//!
//! - [`CatalogParser`] - catalog-style listing pages where each item carries
//!   its own name, price, rating and URL; pagination via a "next" link.
//! - [`QuoteParser`] - quote-style listing pages with text blocks, authors
//!   and tags; price and rating are fixed sentinels.
//!
//! Parsers tolerate missing optional fields (they default rather than fail)
//! and distinguish a structurally valid page with zero items (empty
//! [`Listing`]) from a malformed page ([`ParseError`]).

mod catalog;
mod quotes;

pub use catalog::CatalogParser;
pub use quotes::QuoteParser;

use crate::config::ParserKind;
use crate::record::RawRecord;
use thiserror::Error;
use url::Url;

/// Errors raised when a page does not match the expected template
#[derive(Debug, Error)]
pub enum ParseError {
    /// The page lacks the structural container the template guarantees
    #[error("Page at {url} is missing expected structure: {what}")]
    MissingStructure { url: String, what: &'static str },

    /// The parser variant has no detail pages
    #[error("The {site} parser does not support detail pages")]
    DetailUnsupported { site: &'static str },
}

/// Items extracted from one listing page
#[derive(Debug)]
pub struct Listing {
    /// Records found on the page, in page order
    pub items: Vec<RawRecord>,

    /// Absolute URL of the next listing page; `None` signals end of results
    pub next_page: Option<Url>,
}

impl Listing {
    /// Whether the site reports more pages after this one.
    pub fn has_next_page(&self) -> bool {
        self.next_page.is_some()
    }
}

/// Shared contract implemented by every site parser variant
pub trait SiteParser: Send + Sync {
    /// Short identifier of the parser variant, used in logs
    fn id(&self) -> &'static str;

    /// Parses a listing page into items plus the next-page link.
    ///
    /// Relative links are resolved against `page_url`. A structurally valid
    /// page with no matching items yields an empty `Listing`, not an error.
    fn parse_listing(&self, html: &str, page_url: &Url) -> Result<Listing, ParseError>;

    /// Parses an item detail page into a full record.
    fn parse_detail(&self, html: &str, url: &Url) -> Result<RawRecord, ParseError>;

    /// Whether this variant has per-item detail pages at all.
    fn supports_details(&self) -> bool {
        false
    }
}

/// Selects the parser variant for a site at construction time
///
/// The set of variants is closed; adding a site means adding a
/// [`ParserKind`] and an implementation here.
pub fn parser_for(kind: ParserKind) -> Box<dyn SiteParser> {
    match kind {
        ParserKind::Catalog => Box::new(CatalogParser),
        ParserKind::Quotes => Box::new(QuoteParser),
    }
}

/// Resolves a possibly-relative href against the page URL.
///
/// Returns `None` for empty hrefs, fragments, and anything that does not
/// resolve to an http(s) URL.
pub(crate) fn resolve_href(href: &str, page_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    match page_url.join(href) {
        Ok(absolute) => {
            if absolute.scheme() == "http" || absolute.scheme() == "https" {
                Some(absolute)
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
