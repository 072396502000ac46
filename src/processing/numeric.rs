//! Price and rating normalization
//!
//! Prices arrive as page text with currency symbols and thousands
//! separators ("£51.77", "1,299.00 €"); ratings arrive as word-scale class
//! names ("Three"), star text ("4.5 out of 5", "4 stars") or plain numbers.
//! Both are reduced to the first numeric token in the text, which covers
//! every format the supported templates produce.

/// Parses a numeric price out of raw page text.
///
/// Returns `None` when no numeric value can be found, including for "free"
/// wording; the pipeline maps that to the 0.0 sentinel plus a quality flag.
pub fn parse_price(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("free") {
        return None;
    }

    let token = first_numeric_token(trimmed)?;
    token.replace(',', "").parse::<f64>().ok()
}

/// Parses a rating out of raw text and maps it onto the 0-5 scale.
///
/// Word-scale ratings ("One" through "Five") map directly. Numeric ratings
/// above 10 are treated as a 100-point scale (divided by 20), above 5 as a
/// 10-point scale (divided by 2). The result may still fall outside [0, 5];
/// the pipeline clamps and flags those.
pub fn parse_rating(text: &str) -> Option<f64> {
    let trimmed = text.trim();

    if let Some(value) = word_rating(trimmed) {
        return Some(value);
    }

    let value: f64 = first_numeric_token(trimmed)?.replace(',', "").parse().ok()?;

    let scaled = if value > 10.0 {
        value / 20.0
    } else if value > 5.0 {
        value / 2.0
    } else {
        value
    };

    Some(scaled)
}

/// Maps the currency symbol in raw price text to its ISO code.
///
/// Price text without a recognized symbol defaults to USD, matching the
/// source sites' plain-number prices.
pub fn currency_code(text: &str) -> &'static str {
    const SYMBOLS: [(char, &str); 5] = [
        ('$', "USD"),
        ('£', "GBP"),
        ('€', "EUR"),
        ('¥', "JPY"),
        ('₹', "INR"),
    ];

    SYMBOLS
        .iter()
        .find(|(symbol, _)| text.contains(*symbol))
        .map(|(_, code)| *code)
        .unwrap_or("USD")
}

/// Rounds a value to the given number of decimal places.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

fn word_rating(text: &str) -> Option<f64> {
    let words = [
        ("one", 1.0),
        ("two", 2.0),
        ("three", 3.0),
        ("four", 4.0),
        ("five", 5.0),
    ];
    words
        .iter()
        .find(|(word, _)| text.eq_ignore_ascii_case(word))
        .map(|(_, value)| *value)
}

/// Extracts the first maximal run of digits, commas and dots that contains
/// at least one digit.
fn first_numeric_token(text: &str) -> Option<&str> {
    let is_token_char = |c: char| c.is_ascii_digit() || c == ',' || c == '.';

    let start = text.char_indices().find_map(|(i, c)| {
        if c.is_ascii_digit() {
            Some(i)
        } else {
            None
        }
    })?;

    let end = text[start..]
        .char_indices()
        .take_while(|(_, c)| is_token_char(*c))
        .last()
        .map(|(i, c)| start + i + c.len_utf8())?;

    Some(&text[start..end])
}
