use std::ops::Range;

use thiserror::Error;
use tracing::debug;

/// How to treat user input that cannot contribute pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangePolicy {
    /// Skip malformed terms and drop out-of-range pages, counting both
    #[default]
    Lenient,
    /// Reject the whole expression at the first malformed term or out-of-range page
    Strict,
}

impl RangePolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            RangePolicy::Strict
        } else {
            RangePolicy::Lenient
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("Invalid page range term: '{0}'")]
    MalformedTerm(String),

    #[error("Page range '{term}' is outside the document (1-{total})")]
    OutOfRange { term: String, total: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRef {
    Number(u64),
    End,
}

/// One comma-separated term of a range expression, in 1-based page numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRange {
    pub start: u64,
    pub end: Option<PageRef>,
}

/// Indices a term contributes once clamped to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub pages: Range<usize>,
    pub dropped: usize,
}

impl PageRange {
    /// Parse a whitespace-free term like "8", "1-5" or "10-end"
    pub fn parse(term: &str) -> Result<Self, RangeError> {
        let malformed = || RangeError::MalformedTerm(term.to_string());

        match term.split_once('-') {
            Some((start, end)) => {
                let start = start.parse::<u64>().map_err(|_| malformed())?;
                let end = parse_page_ref(end).ok_or_else(malformed)?;
                Ok(PageRange {
                    start,
                    end: Some(end),
                })
            }
            None => {
                let start = term.parse::<u64>().map_err(|_| malformed())?;
                Ok(PageRange { start, end: None })
            }
        }
    }

    /// Half-open 0-based bounds before clamping. Page 0 maps to -1.
    fn bounds(&self, page_count: usize) -> (i128, i128) {
        let lo = self.start as i128 - 1;
        let hi = match &self.end {
            None => self.start as i128,
            Some(PageRef::Number(n)) => *n as i128,
            Some(PageRef::End) => page_count as i128,
        };
        (lo, hi)
    }

    /// Clamp this term to `0..page_count`, counting what falls outside.
    ///
    /// Descending spans ("5-1") contribute nothing and drop nothing.
    pub fn expand(&self, page_count: usize) -> Expansion {
        let (lo, hi) = self.bounds(page_count);
        if hi <= lo {
            return Expansion {
                pages: 0..0,
                dropped: 0,
            };
        }

        let total = page_count as i128;
        let kept_lo = lo.clamp(0, total);
        let kept_hi = hi.clamp(0, total);
        let pages = if kept_hi > kept_lo {
            kept_lo as usize..kept_hi as usize
        } else {
            0..0
        };

        let dropped = (hi - lo) - pages.len() as i128;
        Expansion {
            pages,
            dropped: usize::try_from(dropped).unwrap_or(usize::MAX),
        }
    }
}

fn parse_page_ref(s: &str) -> Option<PageRef> {
    if s.eq_ignore_ascii_case("end") {
        Some(PageRef::End)
    } else {
        s.parse::<u64>().ok().map(PageRef::Number)
    }
}

/// Ordered 0-based page indices plus what was thrown away getting there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSelection {
    pub pages: Vec<usize>,
    pub skipped_terms: usize,
    pub out_of_range: usize,
}

impl PageSelection {
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// 1-based page numbers, for display
    pub fn to_page_numbers(&self) -> Vec<usize> {
        self.pages.iter().map(|&p| p + 1).collect()
    }
}

/// Parse a range expression like "1-5, 8, 10-end" against a document of
/// `page_count` pages.
///
/// Whitespace anywhere is ignored and empty terms are skipped. Indices keep
/// the order they were written in, duplicates included.
pub fn parse_page_ranges(
    expression: &str,
    page_count: usize,
    policy: RangePolicy,
) -> Result<PageSelection, RangeError> {
    let compact: String = expression.chars().filter(|c| !c.is_whitespace()).collect();
    let mut selection = PageSelection::default();

    for term in compact.split(',').filter(|t| !t.is_empty()) {
        let range = match PageRange::parse(term) {
            Ok(range) => range,
            Err(e) => match policy {
                RangePolicy::Strict => return Err(e),
                RangePolicy::Lenient => {
                    debug!(term = %term, "skipping malformed page range term");
                    selection.skipped_terms += 1;
                    continue;
                }
            },
        };

        let expansion = range.expand(page_count);
        if expansion.dropped > 0 {
            if policy == RangePolicy::Strict {
                return Err(RangeError::OutOfRange {
                    term: term.to_string(),
                    total: page_count,
                });
            }
            debug!(
                term = %term,
                dropped = expansion.dropped,
                "dropping pages outside the document"
            );
            selection.out_of_range = selection.out_of_range.saturating_add(expansion.dropped);
        }

        selection.pages.extend(expansion.pages);
    }

    Ok(selection)
}
