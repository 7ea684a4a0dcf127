use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// One step of a [`FormElementLocator`]: a named key or a positional index.
///
/// Named segments address group children (and `$key`-tagged collection rows),
/// index segments address collection rows by position.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Segment::Key(key.to_string())
    }
}

impl From<String> for Segment {
    fn from(key: String) -> Self {
        Segment::Key(key)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, ".{key}"),
            Segment::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Immutable path addressing one node inside a form or form-data tree.
///
/// Locators are values: every derived locator (`rest`, `parent`, `join`) is a
/// new instance and the original is never modified. Equality and hashing are
/// structural over the segment sequence.
///
/// The text notation uses a dot per named segment and brackets per index,
/// e.g. `.person.computers[1].brand`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FormElementLocator {
    segments: Vec<Segment>,
}

impl FormElementLocator {
    /// The empty locator, addressing the tree root.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Builds a locator from named segments only.
    pub fn from_keys(keys: &[&str]) -> Self {
        Self {
            segments: keys.iter().map(|k| Segment::from(*k)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Head segment, or `None` for the empty locator.
    pub fn first(&self) -> Option<&Segment> {
        self.segments.first()
    }

    /// Final segment, or `None` for the empty locator.
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Locator without its head segment. Total: the empty locator yields
    /// another empty locator, so recursive descent always terminates.
    pub fn rest(&self) -> Self {
        Self {
            segments: self.segments.iter().skip(1).cloned().collect(),
        }
    }

    /// Locator without its final segment. Total, like [`rest`](Self::rest).
    pub fn parent(&self) -> Self {
        let len = self.segments.len().saturating_sub(1);
        Self {
            segments: self.segments[..len].to_vec(),
        }
    }

    /// New locator with `segment` appended.
    pub fn join(&self, segment: impl Into<Segment>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }
}

impl fmt::Display for FormElementLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, ".");
        }
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
#[error("invalid locator '{text}': {reason}")]
pub struct ParseLocatorError {
    text: String,
    reason: &'static str,
}

impl ParseLocatorError {
    fn new(text: &str, reason: &'static str) -> Self {
        Self {
            text: text.to_string(),
            reason,
        }
    }
}

impl FromStr for FormElementLocator {
    type Err = ParseLocatorError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut segments = Vec::new();
        let mut rest = text;
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('[') {
                let end = after
                    .find(']')
                    .ok_or_else(|| ParseLocatorError::new(text, "unterminated index"))?;
                let index: usize = after[..end]
                    .parse()
                    .map_err(|_| ParseLocatorError::new(text, "index is not a number"))?;
                segments.push(Segment::Index(index));
                rest = &after[end + 1..];
            } else {
                let body = rest.strip_prefix('.').unwrap_or(rest);
                let end = body
                    .find(['.', '['])
                    .unwrap_or(body.len());
                if end == 0 {
                    return Err(ParseLocatorError::new(text, "empty segment"));
                }
                segments.push(Segment::Key(body[..end].to_string()));
                rest = &body[end..];
            }
        }
        Ok(Self { segments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dot_and_bracket_notation() {
        let locator: FormElementLocator = ".person.computers[1].brand".parse().unwrap();
        assert_eq!(
            locator.segments(),
            &[
                Segment::from("person"),
                Segment::from("computers"),
                Segment::from(1),
                Segment::from("brand"),
            ]
        );
        assert_eq!(locator.to_string(), ".person.computers[1].brand");
    }

    #[test]
    fn rejects_malformed_notation() {
        assert!(".person.computers[x]".parse::<FormElementLocator>().is_err());
        assert!(".person.computers[1".parse::<FormElementLocator>().is_err());
        assert!("..person".parse::<FormElementLocator>().is_err());
    }

    #[test]
    fn rest_and_parent_are_total() {
        let root = FormElementLocator::root();
        assert!(root.rest().is_empty());
        assert!(root.parent().is_empty());
        assert!(root.first().is_none());
        assert!(root.last().is_none());

        let locator = root.join("person").join("computers").join(0);
        assert_eq!(locator.rest().to_string(), ".computers[0]");
        assert_eq!(locator.parent().to_string(), ".person.computers");
        assert_eq!(locator.last(), Some(&Segment::Index(0)));
    }

    #[test]
    fn join_leaves_the_original_untouched() {
        let base = FormElementLocator::from_keys(&["person"]);
        let derived = base.join("name");
        assert_eq!(base.to_string(), ".person");
        assert_eq!(derived.to_string(), ".person.name");
    }

    #[test]
    fn equality_is_structural() {
        let parsed: FormElementLocator = ".packages[2]".parse().unwrap();
        let built = FormElementLocator::root().join("packages").join(2);
        assert_eq!(parsed, built);
    }
}
