//! Field-level extraction for pages where no locator path resolved.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use url::Url;

use crate::price::{PriceInfo, first_price_in_document_order, parse_price};

/// Most specific hint first.
const TITLE_SELECTORS: &[&str] = &[
    r#"[data-testid="product-title"]"#,
    ".product-title",
    "h1",
    ".title",
    "h2",
    "title",
];

const PRICE_SELECTORS: &[&str] = &[
    r#"[data-testid="price"]"#,
    ".product-price",
    ".price",
    ".amount",
    r#"[class*="price"]"#,
];

const DESCRIPTION_SELECTORS: &[&str] = &[
    ".product-description",
    ".description",
    ".content",
    "p",
];

const IMAGE_SOURCE_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src"];

const NON_RENDERED: &[&str] = &["script", "style", "noscript", "template"];

static TITLE: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(TITLE_SELECTORS));
static PRICE: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(PRICE_SELECTORS));
static DESCRIPTION: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(DESCRIPTION_SELECTORS));
static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("img selector"));
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").expect("body selector"));

fn compile(patterns: &[&str]) -> Vec<Selector> {
    patterns
        .iter()
        .map(|p| Selector::parse(p).expect("static selector"))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_info: Option<PriceInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub images: Vec<String>,
}

impl ProductInfo {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.images.is_empty()
    }

    /// Names of the fields that were found, in display order.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.title.is_some() {
            names.push("title");
        }
        if self.price.is_some() {
            names.push("price");
        }
        if self.description.is_some() {
            names.push("description");
        }
        if !self.images.is_empty() {
            names.push("images");
        }
        names
    }
}

/// Text-node walk that leaves out anything under a non-rendered element.
fn visible_text<'a>(el: ElementRef<'a>) -> impl Iterator<Item = &'a str> {
    el.descendants().filter_map(|node| {
        let text = node.value().as_text()?;
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| NON_RENDERED.contains(&e.name()))
        });
        (!hidden).then_some(&**text)
    })
}

/// Visible text of an element, whitespace collapsed.
pub fn element_text(el: ElementRef<'_>) -> String {
    visible_text(el)
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Best-effort product fields from `doc`. Image URLs are resolved against
/// `page_url`.
pub fn extract_product_info(doc: &Html, page_url: &Url) -> ProductInfo {
    let title = first_text(doc, &TITLE, |_| true);
    let price = first_text(doc, &PRICE, |t| t.chars().any(|c| c.is_ascii_digit()))
        .or_else(|| scan_for_price(doc));
    let price_info = price.as_deref().map(parse_price);
    let description = first_text(doc, &DESCRIPTION, |_| true);
    let images = image_urls(doc, page_url);

    ProductInfo {
        title,
        price,
        price_info,
        description,
        images,
    }
}

fn first_text(doc: &Html, selectors: &[Selector], accept: impl Fn(&str) -> bool) -> Option<String> {
    selectors.iter().find_map(|sel| {
        doc.select(sel)
            .map(element_text)
            .find(|t| !t.is_empty() && accept(t.as_str()))
    })
}

fn scan_for_price(doc: &Html) -> Option<String> {
    let text = doc.select(&BODY).next().map(element_text)?;
    first_price_in_document_order(&text).map(str::to_string)
}

fn image_urls(doc: &Html, page_url: &Url) -> Vec<String> {
    doc.select(&IMG)
        .filter_map(|img| {
            IMAGE_SOURCE_ATTRS
                .iter()
                .filter_map(|attr| img.value().attr(attr))
                .map(str::trim)
                .find(|src| !src.is_empty())
        })
        .filter_map(|src| page_url.join(src).ok())
        .map(String::from)
        .collect()
}

/// True when the document has nothing worth extracting: no body text and
/// no images.
pub fn is_blank(doc: &Html) -> bool {
    let has_text = doc
        .select(&BODY)
        .next()
        .is_some_and(|body| visible_text(body).any(|t| !t.trim().is_empty()));
    !has_text && doc.select(&IMG).next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://www.example.test/th/product/158964").unwrap()
    }

    #[test]
    fn price_class_with_digit_is_accepted() {
        let doc = Html::parse_document(
            r#"<html><body><h1>JR Pass</h1><div class="price">¥500</div></body></html>"#,
        );
        let info = extract_product_info(&doc, &page_url());
        assert_eq!(info.price.as_deref(), Some("¥500"));
        let price = info.price_info.unwrap();
        assert_eq!(price.currency, Some(crate::price::Currency::Jpy));
        assert_eq!(price.numeric_price, Some(500.0));
    }

    #[test]
    fn price_without_digits_is_skipped() {
        let doc = Html::parse_document(
            r#"<html><body>
                <span class="price">Check availability</span>
                <span class="amount">THB 2,100</span>
            </body></html>"#,
        );
        let info = extract_product_info(&doc, &page_url());
        assert_eq!(info.price.as_deref(), Some("THB 2,100"));
    }

    #[test]
    fn price_falls_back_to_whole_page_scan() {
        let doc = Html::parse_document(
            r#"<html><body><p>Tokyo wide pass</p><div><b>Only</b> THB 3,000 today, was $120</div></body></html>"#,
        );
        let info = extract_product_info(&doc, &page_url());
        assert_eq!(info.price.as_deref(), Some("THB 3,000"));
    }

    #[test]
    fn page_scan_ignores_inline_scripts_and_styles() {
        let doc = Html::parse_document(
            r#"<html><body>
                <script>s.replace(re, "$1")</script>
                <style>.promo::after { content: "$5 off"; }</style>
                <noscript>Enable JavaScript to see the $0 deal</noscript>
                <h1>Pass</h1>
                <p>Only THB 9,990</p>
            </body></html>"#,
        );
        let info = extract_product_info(&doc, &page_url());
        assert_eq!(info.price.as_deref(), Some("THB 9,990"));
        assert_eq!(info.price_info.unwrap().numeric_price, Some(9990.0));
    }

    #[test]
    fn script_only_body_is_blank() {
        let doc = Html::parse_document(
            r#"<html><body><script>window.__STATE__ = {"price": "$12"};</script></body></html>"#,
        );
        assert!(is_blank(&doc));
    }

    #[test]
    fn selectors_are_tried_most_specific_first() {
        let doc = Html::parse_document(
            r#"<html><head><title>Site</title></head><body>
                <h1>Generic heading</h1>
                <div data-testid="product-title">  JR TOKYO   Wide Pass </div>
                <p>first paragraph</p>
                <div class="description">The real description</div>
            </body></html>"#,
        );
        let info = extract_product_info(&doc, &page_url());
        assert_eq!(info.title.as_deref(), Some("JR TOKYO Wide Pass"));
        assert_eq!(info.description.as_deref(), Some("The real description"));
    }

    #[test]
    fn empty_matches_are_skipped() {
        let doc = Html::parse_document(
            r#"<html><body><h1>   </h1><h1>Second heading</h1></body></html>"#,
        );
        let info = extract_product_info(&doc, &page_url());
        assert_eq!(info.title.as_deref(), Some("Second heading"));
    }

    #[test]
    fn images_keep_document_order_and_duplicates() {
        let doc = Html::parse_document(
            r#"<html><body>
                <img src="/img/a.jpg">
                <img data-src="https://cdn.example.test/b.png">
                <img src="/img/a.jpg">
                <img alt="no source">
                <img src="" data-lazy-src="c.webp">
            </body></html>"#,
        );
        let info = extract_product_info(&doc, &page_url());
        assert_eq!(info.images, vec![
            "https://www.example.test/img/a.jpg",
            "https://cdn.example.test/b.png",
            "https://www.example.test/img/a.jpg",
            "https://www.example.test/th/product/c.webp",
        ]);
    }

    #[test]
    fn blank_documents_are_detected() {
        assert!(is_blank(&Html::parse_document("<html><body>  \n </body></html>")));
        assert!(!is_blank(&Html::parse_document("<html><body>hi</body></html>")));
        assert!(!is_blank(&Html::parse_document(r#"<html><body><img src="x.png"></body></html>"#)));
    }

    #[test]
    fn field_names_reflect_found_fields() {
        let info = ProductInfo {
            title: Some("t".into()),
            images: vec!["i".into()],
            ..ProductInfo::default()
        };
        assert_eq!(info.field_names(), vec!["title", "images"]);
        assert!(!info.is_empty());
        assert!(ProductInfo::default().is_empty());
    }
}
