//! Minimal selector syntax for locating containers and targets
//!
//! Supported forms, optionally joined with commas:
//!
//! - `window` / `viewport` - the top-level viewport
//! - `#id` - element by id
//! - `.class` - elements carrying a class
//! - `tag` - elements by tag name

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::error::DomError;

/// One selector term
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SimpleSelector {
    Viewport,
    Id(String),
    Class(String),
    Tag(String),
}

impl fmt::Display for SimpleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimpleSelector::Viewport => f.write_str("window"),
            SimpleSelector::Id(id) => write!(f, "#{}", id),
            SimpleSelector::Class(class) => write!(f, ".{}", class),
            SimpleSelector::Tag(tag) => f.write_str(tag),
        }
    }
}

/// A comma-separated group of selector terms
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Selector {
    terms: SmallVec<[SimpleSelector; 1]>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, DomError> {
        let invalid = || DomError::InvalidSelector(input.to_string());

        let mut terms = SmallVec::new();
        for part in input.split(',') {
            let part = part.trim();
            let term = if part.eq_ignore_ascii_case("window") || part.eq_ignore_ascii_case("viewport")
            {
                SimpleSelector::Viewport
            } else if let Some(id) = part.strip_prefix('#') {
                SimpleSelector::Id(ident(id).ok_or_else(invalid)?.to_string())
            } else if let Some(class) = part.strip_prefix('.') {
                SimpleSelector::Class(ident(class).ok_or_else(invalid)?.to_string())
            } else {
                SimpleSelector::Tag(ident(part).ok_or_else(invalid)?.to_ascii_lowercase())
            };
            terms.push(term);
        }

        Ok(Self { terms })
    }

    pub fn terms(&self) -> &[SimpleSelector] {
        &self.terms
    }
}

impl FromStr for Selector {
    type Err = DomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", term)?;
        }
        Ok(())
    }
}

/// Identifier characters: letters, digits, `-` and `_`
fn ident(s: &str) -> Option<&str> {
    let valid = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_terms() {
        let selector = Selector::parse("#feed, .card ,window, DIV").unwrap();
        assert_eq!(
            selector.terms(),
            &[
                SimpleSelector::Id("feed".into()),
                SimpleSelector::Class("card".into()),
                SimpleSelector::Viewport,
                SimpleSelector::Tag("div".into()),
            ]
        );
        assert_eq!(selector.to_string(), "#feed, .card, window, div");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in ["", "#", ".", "#a b", "a,,b", "[data-x]"] {
            assert_eq!(
                Selector::parse(input),
                Err(DomError::InvalidSelector(input.to_string())),
                "{input}"
            );
        }
    }

    #[test]
    fn test_from_str() {
        let selector: Selector = "viewport".parse().unwrap();
        assert_eq!(selector.terms(), &[SimpleSelector::Viewport]);
    }
}
