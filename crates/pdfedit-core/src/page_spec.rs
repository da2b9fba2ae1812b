//! Page selection grammar shared by split and rotate
//!
//! ```text
//! all
//! every 3          -> 3, 6, 9, ...
//! 1-3, 5, 8-       -> 1, 2, 3, 5, 8 .. last
//! ```

use crate::error::EditError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageRange {
    Single(u32),
    /// Inclusive range
    Closed(u32, u32),
    /// From a page to the last page
    From(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSpec {
    All,
    EveryNth(u32),
    Ranges(Vec<PageRange>),
}

impl PageSpec {
    pub fn parse(input: &str) -> Result<Self, EditError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EditError::InvalidPageSpec("empty page specification".into()));
        }

        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(PageSpec::All);
        }

        let lower = trimmed.to_ascii_lowercase();
        if let Some(rest) = lower.strip_prefix("every") {
            let n: u32 = rest
                .trim()
                .parse()
                .map_err(|_| EditError::InvalidPageSpec(format!("Invalid step: {}", rest.trim())))?;
            if n == 0 {
                return Err(EditError::InvalidPageSpec("step must be at least 1".into()));
            }
            return Ok(PageSpec::EveryNth(n));
        }

        let mut ranges = Vec::new();
        for part in trimmed.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            ranges.push(parse_range(part)?);
        }

        if ranges.is_empty() {
            return Err(EditError::InvalidPageSpec(format!(
                "no pages in '{}'",
                trimmed
            )));
        }
        Ok(PageSpec::Ranges(ranges))
    }

    /// Resolve against a document with `page_count` pages.
    ///
    /// Returns 1-indexed pages, ascending and unique. Ranges are clipped to
    /// the document; single pages outside it are dropped. Selecting nothing
    /// is an error.
    pub fn resolve(&self, page_count: u32) -> Result<Vec<u32>, EditError> {
        let pages: BTreeSet<u32> = match self {
            PageSpec::All => (1..=page_count).collect(),
            PageSpec::EveryNth(0) => {
                return Err(EditError::InvalidPageSpec("'every 0' selects nothing".into()));
            }
            PageSpec::EveryNth(n) => (1..=page_count).filter(|p| p % n == 0).collect(),
            PageSpec::Ranges(ranges) => {
                let mut pages = BTreeSet::new();
                for range in ranges {
                    let (start, end) = match *range {
                        PageRange::Single(p) => (p, p),
                        PageRange::Closed(a, b) => (a.max(1), b.min(page_count)),
                        PageRange::From(a) => (a.max(1), page_count),
                    };
                    if start >= 1 && start <= end && end <= page_count {
                        pages.extend(start..=end);
                    }
                }
                pages
            }
        };

        if pages.is_empty() {
            return Err(EditError::InvalidPageSpec(format!(
                "'{}' selects no pages of a {}-page document",
                self, page_count
            )));
        }
        Ok(pages.into_iter().collect())
    }
}

fn parse_page(token: &str) -> Result<u32, EditError> {
    token
        .trim()
        .parse()
        .map_err(|_| EditError::InvalidPageSpec(format!("Invalid page: {}", token.trim())))
}

fn parse_range(part: &str) -> Result<PageRange, EditError> {
    let Some((start, end)) = part.split_once('-') else {
        return Ok(PageRange::Single(parse_page(part)?));
    };

    let start = parse_page(start)?;
    if end.trim().is_empty() {
        return Ok(PageRange::From(start));
    }
    let end = parse_page(end)?;
    if start > end {
        return Err(EditError::InvalidPageSpec(format!(
            "Start {} > end {}",
            start, end
        )));
    }
    Ok(PageRange::Closed(start, end))
}

impl FromStr for PageSpec {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PageSpec::parse(s)
    }
}

impl fmt::Display for PageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSpec::All => write!(f, "all"),
            PageSpec::EveryNth(n) => write!(f, "every {}", n),
            PageSpec::Ranges(ranges) => {
                for (i, range) in ranges.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    match range {
                        PageRange::Single(p) => write!(f, "{}", p)?,
                        PageRange::Closed(a, b) => write!(f, "{}-{}", a, b)?,
                        PageRange::From(a) => write!(f, "{}-", a)?,
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_single() {
        assert_eq!(PageSpec::parse("5").unwrap().resolve(10).unwrap(), vec![5]);
    }

    #[test]
    fn test_parse_complex() {
        let spec: PageSpec = "2-4, 7".parse().unwrap();
        assert_eq!(spec.resolve(10).unwrap(), vec![2, 3, 4, 7]);
    }

    #[test]
    fn test_deduplicates_and_sorts() {
        let spec = PageSpec::parse("8, 1-3, 2-4").unwrap();
        assert_eq!(spec.resolve(10).unwrap(), vec![1, 2, 3, 4, 8]);
    }

    #[test]
    fn test_every_zero_is_rejected() {
        assert!(matches!(
            PageSpec::EveryNth(0).resolve(5),
            Err(EditError::InvalidPageSpec(_))
        ));
        let spec: PageSpec = serde_json::from_str(r#"{"EveryNth":0}"#).unwrap();
        assert!(spec.resolve(5).is_err());
    }

    #[test]
    fn test_all_and_every() {
        assert_eq!(PageSpec::parse("ALL").unwrap().resolve(3).unwrap(), vec![1, 2, 3]);
        assert_eq!(
            PageSpec::parse("every 3").unwrap().resolve(10).unwrap(),
            vec![3, 6, 9]
        );
    }

    #[test]
    fn test_open_range_runs_to_last_page() {
        assert_eq!(PageSpec::parse("4-").unwrap().resolve(6).unwrap(), vec![4, 5, 6]);
    }

    #[test]
    fn test_ranges_are_clipped() {
        let spec = PageSpec::parse("0-2, 5-99, 40").unwrap();
        assert_eq!(spec.resolve(6).unwrap(), vec![1, 2, 5, 6]);
    }

    #[test]
    fn test_empty_selection_is_error() {
        let result = PageSpec::parse("every 7").unwrap().resolve(5);
        assert!(matches!(result, Err(EditError::InvalidPageSpec(_))));
        let result = PageSpec::parse("12").unwrap().resolve(5);
        assert!(matches!(result, Err(EditError::InvalidPageSpec(_))));
    }

    #[test]
    fn test_malformed_tokens() {
        for input in ["", " , ", "abc", "1-x", "5-2", "every", "every 0", "every -1", "1--3"] {
            assert!(
                matches!(PageSpec::parse(input), Err(EditError::InvalidPageSpec(_))),
                "expected error for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_display_round_trips() {
        for input in ["all", "every 2", "1-3,5,8-"] {
            let spec = PageSpec::parse(input).unwrap();
            assert_eq!(spec.to_string(), input);
            assert_eq!(PageSpec::parse(&spec.to_string()).unwrap(), spec);
        }
    }
}
