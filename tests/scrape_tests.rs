//! End-to-end scrape tests against a local mock server

use pricewren::config::{
    AppConfig, HttpConfig, PaginationKind, ParserKind, ProcessingConfig, ScrapeConfig,
    ScrapingConfig, SiteConfig,
};
use pricewren::scrape::{Engine, RunState, ScrapeEvent};
use pricewren::PricewrenError;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app_config(base_url: &str, parser: ParserKind) -> AppConfig {
    AppConfig {
        http: HttpConfig {
            user_agent: "pricewren-test/0.1".to_string(),
            accept_language: "en-US,en;q=0.5".to_string(),
            timeout_secs: 5,
            max_attempts: 2,
            backoff_factor: 1.5,
            initial_backoff_ms: 10,
        },
        scraping: ScrapingConfig {
            default_delay_secs: 0.5,
            max_products: 100,
            requests_per_minute: 600,
            skip_errors: true,
            max_consecutive_errors: 3,
        },
        processing: ProcessingConfig::default(),
        site: vec![SiteConfig {
            id: "test".to_string(),
            name: "Test Site".to_string(),
            base_url: base_url.to_string(),
            parser,
            pagination: PaginationKind::NextLink,
            rate_limit_secs: 0.0,
            max_pages: 10,
            detail_pages: false,
            categories: vec![],
        }],
    }
}

fn run_config(app: &AppConfig) -> ScrapeConfig {
    ScrapeConfig::from_defaults(app, "test")
}

fn catalog_page(items: &str, next_href: Option<&str>) -> String {
    let pager = match next_href {
        Some(href) => format!(
            r#"<ul class="pager"><li class="next"><a href="{href}">next</a></li></ul>"#
        ),
        None => String::new(),
    };
    format!(
        r#"<html><body>
        <div class="page-header"><h1>Fiction</h1></div>
        <ol class="row">{items}</ol>
        {pager}
        </body></html>"#
    )
}

fn catalog_item(title: &str, href: &str, price: &str, rating: &str) -> String {
    format!(
        r#"<li><article class="product_pod">
        <p class="star-rating {rating}"></p>
        <h3><a href="{href}" title="{title}">{title}</a></h3>
        <p class="price_color">{price}</p>
        <p class="instock availability">In stock</p>
        </article></li>"#
    )
}

fn quote_page(quotes: &str, next_href: Option<&str>) -> String {
    let pager = match next_href {
        Some(href) => format!(
            r#"<nav><ul class="pager"><li class="next"><a href="{href}">Next</a></li></ul></nav>"#
        ),
        None => String::new(),
    };
    format!(
        r#"<html><body><div class="row"><div class="col-md-8">
        {quotes}{pager}
        </div></div></body></html>"#
    )
}

fn quote_block(text: &str, author: &str, tags: &[&str]) -> String {
    let tag_links: String = tags
        .iter()
        .map(|t| format!(r#"<a class="tag" href="/tag/{t}/">{t}</a>"#))
        .collect();
    format!(
        r#"<div class="quote">
        <span class="text">{text}</span>
        <span>by <small class="author">{author}</small></span>
        <div class="tags">{tag_links}</div>
        </div>"#
    )
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn scrape_walks_pages_until_the_record_cap() {
    let server = MockServer::start().await;

    let page1 = catalog_page(
        &format!(
            "{}{}{}",
            catalog_item("Book One", "book-1.html", "£10.00", "One"),
            catalog_item("Book Two", "book-2.html", "£20.00", "Two"),
            catalog_item("Book Three", "book-3.html", "£30.00", "Three"),
        ),
        Some("page-2.html"),
    );
    let page2 = catalog_page(
        &format!(
            "{}{}{}",
            catalog_item("Book Four", "book-4.html", "£40.00", "Four"),
            catalog_item("Book Five", "book-5.html", "£50.00", "Five"),
            catalog_item("Book Six", "book-6.html", "£60.00", "One"),
        ),
        None,
    );
    mount_html(&server, "/page-1.html", page1).await;
    mount_html(&server, "/page-2.html", page2).await;

    let app = app_config(&format!("{}/page-1.html", server.uri()), ParserKind::Catalog);
    let mut run = run_config(&app);
    run.max_products = 5;

    let engine = Engine::new(app);
    let outcome = engine.start(run).unwrap().join().await.unwrap();

    assert_eq!(outcome.state, RunState::Completed);
    assert_eq!(outcome.dataset.len(), 5);
    assert_eq!(outcome.pages_fetched, 2);
    assert_eq!(outcome.duplicates_removed, 0);

    let first = &outcome.dataset.records()[0];
    assert_eq!(first.name, "Book One");
    assert_eq!(first.price, 10.0);
    assert_eq!(first.rating, 1.0);
    assert_eq!(first.category, "Fiction");
    assert!(first.flags.is_empty());
}

#[tokio::test]
async fn repeated_failures_hit_the_consecutive_error_ceiling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut app = app_config(&format!("{}/page-1.html", server.uri()), ParserKind::Catalog);
    app.scraping.max_consecutive_errors = 1;
    let run = run_config(&app);

    let engine = Engine::new(app);
    let outcome = engine.start(run).unwrap().join().await.unwrap();

    assert_eq!(outcome.state, RunState::Failed);
    assert!(outcome.dataset.is_empty());
    assert!(matches!(
        outcome.error,
        Some(PricewrenError::ConsecutiveErrors { count: 1, ceiling: 1 })
    ));
}

#[tokio::test]
async fn lost_listing_page_keeps_partial_results_under_skip_errors() {
    let server = MockServer::start().await;

    let page1 = catalog_page(
        &format!(
            "{}{}{}",
            catalog_item("Book One", "book-1.html", "£10.00", "One"),
            catalog_item("Book Two", "book-2.html", "£20.00", "Two"),
            catalog_item("Book Three", "book-3.html", "£30.00", "Three"),
        ),
        Some("page-2.html"),
    );
    mount_html(&server, "/page-1.html", page1).await;
    Mock::given(method("GET"))
        .and(path("/page-2.html"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let app = app_config(&format!("{}/page-1.html", server.uri()), ParserKind::Catalog);
    let run = run_config(&app);

    let engine = Engine::new(app);
    let outcome = engine.start(run).unwrap().join().await.unwrap();

    assert_eq!(outcome.state, RunState::Completed);
    assert_eq!(outcome.dataset.len(), 3);
    assert_eq!(outcome.pages_fetched, 1);
}

#[tokio::test]
async fn lost_listing_page_fails_the_run_without_skip_errors() {
    let server = MockServer::start().await;

    let page1 = catalog_page(
        &catalog_item("Book One", "book-1.html", "£10.00", "One"),
        Some("page-2.html"),
    );
    mount_html(&server, "/page-1.html", page1).await;
    Mock::given(method("GET"))
        .and(path("/page-2.html"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut app = app_config(&format!("{}/page-1.html", server.uri()), ParserKind::Catalog);
    app.scraping.skip_errors = false;
    let run = run_config(&app);

    let engine = Engine::new(app);
    let outcome = engine.start(run).unwrap().join().await.unwrap();

    assert_eq!(outcome.state, RunState::Failed);
    assert!(matches!(outcome.error, Some(PricewrenError::Fetch(_))));
    // Records collected before the failure survive
    assert_eq!(outcome.dataset.len(), 1);
}

#[tokio::test]
async fn cancellation_stops_at_a_page_boundary_and_keeps_records() {
    let server = MockServer::start().await;

    let page1 = catalog_page(
        &format!(
            "{}{}{}",
            catalog_item("Book One", "book-1.html", "£10.00", "One"),
            catalog_item("Book Two", "book-2.html", "£20.00", "Two"),
            catalog_item("Book Three", "book-3.html", "£30.00", "Three"),
        ),
        Some("page-2.html"),
    );
    let page2 = catalog_page(
        &catalog_item("Book Four", "book-4.html", "£40.00", "Four"),
        Some("page-3.html"),
    );
    let page3 = catalog_page(
        &catalog_item("Book Five", "book-5.html", "£50.00", "Five"),
        None,
    );
    // Page 1 responds slowly, leaving a wide window for the cancellation to
    // land before the next page-boundary check.
    Mock::given(method("GET"))
        .and(path("/page-1.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page1)
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    mount_html(&server, "/page-2.html", page2).await;
    mount_html(&server, "/page-3.html", page3).await;

    let app = app_config(&format!("{}/page-1.html", server.uri()), ParserKind::Catalog);
    let run = run_config(&app);

    let engine = Engine::new(app);
    let mut handle = engine.start(run).unwrap();

    // The first progress event fires before the slow page-1 fetch resolves
    let first = handle.next_event().await;
    assert!(matches!(first, Some(ScrapeEvent::Progress(_))));
    handle.cancel();

    let outcome = handle.join().await.unwrap();
    assert_eq!(outcome.state, RunState::Stopped);
    // Page 1 was already in flight when the cancel landed, so its records
    // are kept; later pages are never fetched.
    assert_eq!(outcome.dataset.len(), 3);
    assert_eq!(outcome.pages_fetched, 1);
}

#[tokio::test]
async fn second_start_is_rejected_while_a_run_is_active() {
    let server = MockServer::start().await;
    let page = catalog_page(
        &catalog_item("Book One", "book-1.html", "£10.00", "One"),
        None,
    );
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page)
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let app = app_config(&format!("{}/page-1.html", server.uri()), ParserKind::Catalog);
    let run = run_config(&app);

    let engine = Engine::new(app);
    let handle = engine.start(run.clone()).unwrap();

    assert!(engine.is_running());
    assert!(matches!(
        engine.start(run.clone()),
        Err(PricewrenError::AlreadyRunning)
    ));

    let outcome = handle.join().await.unwrap();
    assert_eq!(outcome.state, RunState::Completed);
    assert!(!engine.is_running());

    // Once the first run finished, a new one may start
    let handle = engine.start(run).unwrap();
    let outcome = handle.join().await.unwrap();
    assert_eq!(outcome.state, RunState::Completed);
}

#[tokio::test]
async fn quote_sites_yield_sentinel_records_and_honor_tag_filters() {
    let server = MockServer::start().await;

    let page = quote_page(
        &format!(
            "{}{}",
            quote_block("Love looks not with the eyes", "Shakespeare", &["love", "sight"]),
            quote_block("Brevity is the soul of wit", "Polonius", &["humor"]),
        ),
        None,
    );
    mount_html(&server, "/page/1/", page).await;

    let app = app_config(&format!("{}/page/1/", server.uri()), ParserKind::Quotes);
    let mut run = run_config(&app);
    run.category_filter = Some("LOVE".to_string());

    let engine = Engine::new(app);
    let outcome = engine.start(run).unwrap().join().await.unwrap();

    assert_eq!(outcome.state, RunState::Completed);
    assert_eq!(outcome.dataset.len(), 1);

    let record = &outcome.dataset.records()[0];
    assert_eq!(record.name, "Quote by Shakespeare");
    assert_eq!(record.category, "Quotes");
    assert_eq!(record.price, 0.0);
    assert_eq!(record.rating, 5.0);
    assert_eq!(record.tags, vec!["love".to_string(), "sight".to_string()]);
    assert!(record.flags.is_empty());
}

#[tokio::test]
async fn detail_pages_enrich_catalog_records_when_enabled() {
    let server = MockServer::start().await;

    let listing = catalog_page(
        &catalog_item("A Light in the Attic", "a-light.html", "£51.77", "Three"),
        None,
    );
    let detail = r#"<html><body>
    <ul class="breadcrumb">
        <li><a href="/">Home</a></li>
        <li><a href="/books.html">Books</a></li>
        <li><a href="/poetry.html">Poetry</a></li>
    </ul>
    <div class="product_main">
        <h1>A Light in the Attic</h1>
        <p class="price_color">£51.77</p>
        <p class="instock availability">In stock (22 available)</p>
        <p class="star-rating Three"></p>
    </div>
    <div id="product_description"><h2>Product Description</h2></div>
    <p>A classic collection of poems.</p>
    <table class="table table-striped">
        <tr><th>UPC</th><td>a897fe39b1053632</td></tr>
    </table>
    </body></html>"#;

    mount_html(&server, "/page-1.html", listing).await;
    mount_html(&server, "/a-light.html", detail.to_string()).await;

    let mut app = app_config(&format!("{}/page-1.html", server.uri()), ParserKind::Catalog);
    app.site[0].detail_pages = true;
    let run = run_config(&app);

    let engine = Engine::new(app);
    let outcome = engine.start(run).unwrap().join().await.unwrap();

    assert_eq!(outcome.state, RunState::Completed);
    assert_eq!(outcome.dataset.len(), 1);

    let record = &outcome.dataset.records()[0];
    assert_eq!(record.name, "A Light in the Attic");
    assert_eq!(record.availability, Some(22));
    assert_eq!(record.category, "Poetry");
    assert_eq!(record.identifier.as_deref(), Some("a897fe39b1053632"));
    assert_eq!(
        record.description.as_deref(),
        Some("A classic collection of poems.")
    );
}

#[tokio::test]
async fn duplicate_items_across_pages_are_removed() {
    let server = MockServer::start().await;

    let item = catalog_item("Same Book", "same.html", "£10.00", "Two");
    let page1 = catalog_page(&item, Some("page-2.html"));
    let page2 = catalog_page(&item, None);
    mount_html(&server, "/page-1.html", page1).await;
    mount_html(&server, "/page-2.html", page2).await;

    let app = app_config(&format!("{}/page-1.html", server.uri()), ParserKind::Catalog);
    let run = run_config(&app);

    let engine = Engine::new(app);
    let outcome = engine.start(run).unwrap().join().await.unwrap();

    assert_eq!(outcome.state, RunState::Completed);
    assert_eq!(outcome.dataset.len(), 1);
    assert_eq!(outcome.duplicates_removed, 1);
}
