//! Positional element lookup.
//!
//! The target page carries no stable ids or class names around the price,
//! so the element is found by descending a recorded chain of `tag[n]` steps.
//! Several paths can be configured; they are tried in order and the first
//! one that resolves wins.

use std::fmt;
use std::str::FromStr;

use scraper::{ElementRef, Html};
use tracing::debug;

use crate::error::ConfigError;

/// Full structural path recorded from the product page.
pub const DEFAULT_PRIMARY_PATH: &str = "/html/body/div[2]/div[2]/div/div/div[2]/div[1]/div/div/div[2]/div[1]/div[1]/div[1]/div[1]/div/div/div/div/div[2]";

/// Shorter path anchored on the booking bar, which survives more redesigns.
pub const DEFAULT_ANCHORED_PATH: &str = "//*[@id='booking-bar']/div[1]/div[1]/div[1]/div/div/div/div/div[2]";

/// Where a path starts descending from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// The document's root element; the first step must name it.
    Root,
    /// The first element in document order carrying this `id`.
    Id(String),
}

/// One descent: the `index`-th (0-based) direct child named `tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub tag: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorPath {
    pub anchor: Anchor,
    pub steps: Vec<Step>,
    source: String,
}

impl LocatorPath {
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Follows the path through `doc`. Returns `None` as soon as a level
    /// does not have the child the step asks for.
    pub fn resolve<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>> {
        let root = doc.root_element();
        let (mut current, steps) = match &self.anchor {
            Anchor::Root => {
                let (first, rest) = self.steps.split_first()?;
                if first.index != 0 || !root.value().name().eq_ignore_ascii_case(&first.tag) {
                    return None;
                }
                (root, rest)
            }
            Anchor::Id(id) => {
                let anchor = root
                    .descendants()
                    .filter_map(ElementRef::wrap)
                    .find(|el| el.value().id() == Some(id.as_str()))?;
                (anchor, self.steps.as_slice())
            }
        };

        for (depth, step) in steps.iter().enumerate() {
            match nth_child(current, step) {
                Some(next) => current = next,
                None => {
                    debug!(path = %self, depth, tag = %step.tag, index = step.index + 1, "locator step did not resolve");
                    return None;
                }
            }
        }
        Some(current)
    }
}

fn nth_child<'a>(parent: ElementRef<'a>, step: &Step) -> Option<ElementRef<'a>> {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name().eq_ignore_ascii_case(&step.tag))
        .nth(step.index)
}

impl fmt::Display for LocatorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for LocatorPath {
    type Err = ConfigError;

    /// Accepts the XPath subset the recorded paths use: `/a/b[2]/c` from the
    /// root, or `//*[@id='x']/b[1]/c` from an id anchor.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let source = raw.trim();
        let invalid = |reason: &str| ConfigError::InvalidLocator {
            path: source.to_string(),
            reason: reason.to_string(),
        };

        let (anchor, rest) = if let Some(rest) = source.strip_prefix("//*[@id=") {
            let quote = rest
                .chars()
                .next()
                .filter(|c| *c == '\'' || *c == '"')
                .ok_or_else(|| invalid("id must be quoted"))?;
            let rest = &rest[1..];
            let end = rest
                .find(quote)
                .ok_or_else(|| invalid("unterminated id"))?;
            let id = &rest[..end];
            let rest = rest[end + 1..]
                .strip_prefix(']')
                .ok_or_else(|| invalid("expected ']' after id"))?;
            if id.is_empty() {
                return Err(invalid("empty id"));
            }
            (Anchor::Id(id.to_string()), rest)
        } else if source.starts_with("//") {
            return Err(invalid("only //*[@id='...'] anchors are supported"));
        } else if source.starts_with('/') {
            (Anchor::Root, source)
        } else {
            return Err(invalid("path must start with '/'"));
        };

        let steps = rest
            .split('/')
            .skip_while(|s| s.is_empty())
            .map(|segment| parse_step(segment).ok_or_else(|| invalid(&format!("bad step \"{segment}\""))))
            .collect::<Result<Vec<_>, _>>()?;

        if steps.is_empty() && anchor == Anchor::Root {
            return Err(invalid("no steps"));
        }

        Ok(Self {
            anchor,
            steps,
            source: source.to_string(),
        })
    }
}

fn parse_step(segment: &str) -> Option<Step> {
    let (tag, index) = match segment.split_once('[') {
        Some((tag, rest)) => {
            let n: usize = rest.strip_suffix(']')?.parse().ok()?;
            (tag, n.checked_sub(1)?)
        }
        None => (segment, 0),
    };
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return None;
    }
    Some(Step {
        tag: tag.to_ascii_lowercase(),
        index,
    })
}

/// Which configured path matched, and the element it led to.
#[derive(Debug, Clone, Copy)]
pub struct Located<'a> {
    pub path_index: usize,
    pub element: ElementRef<'a>,
}

/// Tries each path in order. `None` is an ordinary outcome: the caller moves
/// on to field-level extraction.
pub fn locate<'a>(doc: &'a Html, paths: &[LocatorPath]) -> Option<Located<'a>> {
    paths.iter().enumerate().find_map(|(path_index, path)| {
        debug!(attempt = path_index + 1, of = paths.len(), path = %path, "trying locator path");
        path.resolve(doc).map(|element| Located {
            path_index,
            element,
        })
    })
}

pub fn default_paths() -> Vec<LocatorPath> {
    [DEFAULT_PRIMARY_PATH, DEFAULT_ANCHORED_PATH]
        .iter()
        .filter_map(|p| p.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `depth` nested first-divs under body's second div, ending in a pair of
    /// spans so the final `span[2]` step has something to pick.
    fn nested_doc(depth: usize, with_anchor: bool) -> Html {
        let mut inner = String::from("<span>label</span><span class=\"target\">THB 1,250</span>");
        for _ in 0..depth {
            inner = format!("<div>{inner}</div>");
        }
        let anchor = if with_anchor {
            "<section id=\"booking-bar\"><div><p>x</p><p class=\"target\">THB 990</p></div></section>"
        } else {
            ""
        };
        Html::parse_document(&format!(
            "<html><body><div>header</div><div>{inner}</div>{anchor}</body></html>"
        ))
    }

    fn primary() -> LocatorPath {
        "/html/body/div[2]/div/div/div/span[2]".parse().unwrap()
    }

    fn anchored() -> LocatorPath {
        "//*[@id='booking-bar']/div/p[2]".parse().unwrap()
    }

    #[test]
    fn parses_root_path() {
        let path = primary();
        assert_eq!(path.anchor, Anchor::Root);
        assert_eq!(path.steps.len(), 7);
        assert_eq!(path.steps[0], Step { tag: "html".into(), index: 0 });
        assert_eq!(path.steps[2], Step { tag: "div".into(), index: 1 });
        assert_eq!(path.steps[6], Step { tag: "span".into(), index: 1 });
    }

    #[test]
    fn parses_anchored_path() {
        let path: LocatorPath = r#"//*[@id="booking-bar"]/div[1]/div"#.parse().unwrap();
        assert_eq!(path.anchor, Anchor::Id("booking-bar".into()));
        assert_eq!(path.steps, vec![
            Step { tag: "div".into(), index: 0 },
            Step { tag: "div".into(), index: 0 },
        ]);
    }

    #[test]
    fn rejects_unsupported_syntax() {
        for bad in ["html/body", "//div[@class='x']", "/html/div[0]", "/html/div[x]", "/", "//*[@id=x]/div"] {
            assert!(bad.parse::<LocatorPath>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn default_paths_parse() {
        let paths = default_paths();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].steps.len(), 20);
        assert_eq!(paths[1].anchor, Anchor::Id("booking-bar".into()));
    }

    #[test]
    fn primary_path_finds_leaf_when_nesting_matches() {
        let doc = nested_doc(3, false);
        let found = locate(&doc, &[primary(), anchored()]).expect("primary should resolve");
        assert_eq!(found.path_index, 0);
        assert_eq!(found.element.value().attr("class"), Some("target"));
        assert_eq!(found.element.text().collect::<String>(), "THB 1,250");
    }

    #[test]
    fn missing_level_falls_through_to_anchored_path() {
        let doc = nested_doc(2, true);
        assert!(primary().resolve(&doc).is_none());
        let found = locate(&doc, &[primary(), anchored()]).expect("anchor should resolve");
        assert_eq!(found.path_index, 1);
        assert_eq!(found.element.text().collect::<String>(), "THB 990");
    }

    #[test]
    fn not_found_when_no_path_resolves() {
        let doc = nested_doc(2, false);
        assert!(locate(&doc, &[primary(), anchored()]).is_none());
    }

    #[test]
    fn root_step_must_name_the_root_element() {
        let doc = nested_doc(3, false);
        let wrong: LocatorPath = "/body/div[2]".parse().unwrap();
        assert!(wrong.resolve(&doc).is_none());
    }
}
