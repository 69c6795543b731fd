//! Turns free-form price text (`"THB 1,250.00 / person"`, `"¥500"`) into a
//! [`PriceInfo`].

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

const NUMBER: &str = r"\d[\d,]*(?:\.\d+)?";

/// Currency families, tried in this order. The first family that matches
/// anywhere in the text decides the formatted price.
static FAMILIES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(&format!(r"[$€£¥₹฿]\s*{NUMBER}")).expect("leading symbol pattern"),
        Regex::new(&format!(r"{NUMBER}\s*[$€£¥₹฿]")).expect("trailing symbol pattern"),
        Regex::new(&format!(r"(?i)\b(?:USD|EUR|JPY|TWD|THB|GBP|INR)\s*{NUMBER}"))
            .expect("currency code pattern"),
    ]
});

static NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NUMBER).expect("numeric pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "JPY")]
    Jpy,
    #[serde(rename = "TWD")]
    Twd,
    #[serde(rename = "THB")]
    Thb,
    #[serde(rename = "GBP")]
    Gbp,
    #[serde(rename = "INR")]
    Inr,
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Jpy => "JPY",
            Self::Twd => "TWD",
            Self::Thb => "THB",
            Self::Gbp => "GBP",
            Self::Inr => "INR",
        }
    }

    fn from_symbol(c: char) -> Option<Self> {
        match c {
            '$' => Some(Self::Usd),
            '€' => Some(Self::Eur),
            '£' => Some(Self::Gbp),
            '¥' => Some(Self::Jpy),
            '₹' => Some(Self::Inr),
            '฿' => Some(Self::Thb),
            _ => None,
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "USD" => Some(Self::Usd),
            "EUR" => Some(Self::Eur),
            "JPY" => Some(Self::Jpy),
            "TWD" => Some(Self::Twd),
            "THB" => Some(Self::Thb),
            "GBP" => Some(Self::Gbp),
            "INR" => Some(Self::Inr),
            _ => None,
        }
    }

    /// Currency named by a span matched by one of the families.
    fn detect(span: &str) -> Option<Self> {
        if let Some(c) = span.chars().find_map(Self::from_symbol) {
            return Some(c);
        }
        let letters: String = span.chars().take_while(char::is_ascii_alphabetic).collect();
        Self::from_code(&letters)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceInfo {
    pub raw_text: String,
    pub formatted_price: Option<String>,
    pub currency: Option<Currency>,
    pub numeric_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PriceInfo {
    pub fn has_price(&self) -> bool {
        self.formatted_price.is_some() || self.numeric_price.is_some()
    }
}

/// Parses `text` into a [`PriceInfo`]. Never fails: anything unparsable
/// leaves the matching field empty and, for numbers, records a diagnostic.
pub fn parse_price(text: &str) -> PriceInfo {
    let raw_text = text.trim();
    let mut info = PriceInfo {
        raw_text: raw_text.to_string(),
        ..PriceInfo::default()
    };
    if raw_text.is_empty() {
        return info;
    }

    let currency_span = FAMILIES
        .iter()
        .find_map(|family| family.find(raw_text))
        .map(|m| m.as_str());

    // Keep the number inside the currency span when there is one, so the
    // numeric value and the formatted price describe the same amount.
    let numeric_source = currency_span.unwrap_or(raw_text);
    let numeric_text = NUMERIC.find(numeric_source).map(|m| m.as_str());

    match currency_span {
        Some(span) => {
            info.formatted_price = Some(span.to_string());
            info.currency = Currency::detect(span);
        }
        None => info.formatted_price = numeric_text.map(str::to_string),
    }

    if let Some(digits) = numeric_text {
        match parse_number(digits) {
            Ok(value) => info.numeric_price = Some(value),
            Err(reason) => info.error = Some(reason),
        }
    }

    info
}

/// Earliest price-looking span in `text` across every currency family.
/// Used when scanning a whole page, where document order matters more than
/// family priority.
pub fn first_price_in_document_order(text: &str) -> Option<&str> {
    FAMILIES
        .iter()
        .filter_map(|family| family.find(text))
        .min_by_key(|m| m.start())
        .map(|m| m.as_str())
}

fn parse_number(digits: &str) -> Result<f64, String> {
    let cleaned = digits.replace(',', "");
    cleaned
        .parse::<f64>()
        .map_err(|e| format!("could not parse \"{digits}\" as a number: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar_amount_with_grouping() {
        let info = parse_price("$1,234.50");
        assert_eq!(info.currency, Some(Currency::Usd));
        assert_eq!(info.numeric_price, Some(1234.50));
        assert_eq!(info.formatted_price.as_deref(), Some("$1,234.50"));
        assert!(info.error.is_none());
    }

    #[test]
    fn currency_code_prefix() {
        let info = parse_price("THB 999");
        assert_eq!(info.currency, Some(Currency::Thb));
        assert_eq!(info.numeric_price, Some(999.0));
        assert_eq!(info.formatted_price.as_deref(), Some("THB 999"));
    }

    #[test]
    fn currency_code_is_case_insensitive() {
        let info = parse_price("from twd 1,200 per adult");
        assert_eq!(info.currency, Some(Currency::Twd));
        assert_eq!(info.numeric_price, Some(1200.0));
    }

    #[test]
    fn empty_text_yields_nothing() {
        let info = parse_price("");
        assert_eq!(info, PriceInfo::default());
        assert!(!info.has_price());
    }

    #[test]
    fn text_without_numbers_yields_nothing() {
        let info = parse_price("no price here");
        assert_eq!(info.raw_text, "no price here");
        assert!(info.formatted_price.is_none());
        assert!(info.currency.is_none());
        assert!(info.numeric_price.is_none());
        assert!(info.error.is_none());
    }

    #[test]
    fn trailing_symbol() {
        let info = parse_price("Total 49.90 €");
        assert_eq!(info.currency, Some(Currency::Eur));
        assert_eq!(info.formatted_price.as_deref(), Some("49.90 €"));
        assert_eq!(info.numeric_price, Some(49.9));
    }

    #[test]
    fn symbol_family_beats_code_family() {
        // Family order decides, not position in the text.
        let info = parse_price("USD 10 or £8");
        assert_eq!(info.currency, Some(Currency::Gbp));
        assert_eq!(info.formatted_price.as_deref(), Some("£8"));
        assert_eq!(info.numeric_price, Some(8.0));
    }

    #[test]
    fn first_match_wins_within_a_family() {
        let info = parse_price("¥500 was ¥700");
        assert_eq!(info.currency, Some(Currency::Jpy));
        assert_eq!(info.formatted_price.as_deref(), Some("¥500"));
    }

    #[test]
    fn numeric_value_comes_from_the_currency_span() {
        let info = parse_price("Save 15% today: ₹2,499");
        assert_eq!(info.currency, Some(Currency::Inr));
        assert_eq!(info.numeric_price, Some(2499.0));
    }

    #[test]
    fn bare_number_becomes_formatted_price() {
        let info = parse_price("Price: 1,500 per person");
        assert_eq!(info.formatted_price.as_deref(), Some("1,500"));
        assert!(info.currency.is_none());
        assert_eq!(info.numeric_price, Some(1500.0));
    }

    #[test]
    fn baht_symbol_maps_to_thb() {
        let info = parse_price("฿ 3,200");
        assert_eq!(info.currency, Some(Currency::Thb));
        assert_eq!(info.numeric_price, Some(3200.0));
    }

    #[test]
    fn parsing_is_idempotent() {
        let text = "Starting from THB 1,234.56 / person";
        assert_eq!(parse_price(text), parse_price(text));
    }

    #[test]
    fn document_scan_prefers_earliest_match() {
        let text = "Tokyo pass. THB 3,000 adults, children $20";
        assert_eq!(first_price_in_document_order(text), Some("THB 3,000"));
        assert_eq!(first_price_in_document_order("nothing"), None);
    }

    #[test]
    fn currency_serializes_as_code() {
        let json = serde_json::to_string(&parse_price("€5")).unwrap();
        assert!(json.contains(r#""currency":"EUR""#), "{json}");
        assert!(!json.contains("error"), "{json}");
    }
}
