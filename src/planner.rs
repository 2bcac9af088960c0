//! Batch planning: split a document into the ordered page ranges to process.
//!
//! Two modes:
//!
//! * **Whole document** — fixed-width ranges starting at page 1 until the
//!   page count is covered; the last range may be narrower. The output
//!   partitions `[1, total_pages]` exactly: strictly increasing, contiguous,
//!   no gaps, no overlaps.
//! * **Explicit range** — the external scheduler already partitioned the
//!   document and hands this invocation exactly one range; the plan is that
//!   range alone, regardless of the document's page count.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An inclusive, 1-indexed range of document pages.
///
/// Invariant: `1 ≤ first ≤ last`. The wire form (both in the invocation
/// event and the invocation result) is `{ "start": first, "end": last }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    #[serde(rename = "start")]
    first: u32,
    #[serde(rename = "end")]
    last: u32,
}

impl PageRange {
    /// Create a range, enforcing `1 ≤ first ≤ last`.
    pub fn new(first: u32, last: u32) -> Option<Self> {
        if first >= 1 && first <= last {
            Some(Self { first, last })
        } else {
            None
        }
    }

    /// First page of the range (1-indexed, inclusive).
    pub fn first(&self) -> u32 {
        self.first
    }

    /// Last page of the range (1-indexed, inclusive).
    pub fn last(&self) -> u32 {
        self.last
    }

    /// Number of pages covered.
    pub fn width(&self) -> u32 {
        self.last - self.first + 1
    }

    /// Iterate the page numbers in ascending order.
    pub fn pages(&self) -> impl Iterator<Item = u32> {
        self.first..=self.last
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.last)
    }
}

/// Compute the ordered batch plan for a document.
///
/// With an `explicit` range the plan is exactly `[explicit]`. Otherwise
/// ranges of `batch_width` pages are emitted from page 1 until `total_pages`
/// is covered. A zero-page document yields an empty plan.
pub fn plan_batches(total_pages: u32, explicit: Option<PageRange>, batch_width: u32) -> Vec<PageRange> {
    if let Some(range) = explicit {
        return vec![range];
    }

    let width = batch_width.max(1);
    let mut plan = Vec::new();
    let mut first = 1u32;
    while first <= total_pages {
        // Saturating: a huge configured width must clamp to the page count,
        // not overflow.
        let last = first.saturating_add(width - 1).min(total_pages);
        // new() cannot fail here: first ≥ 1 and first ≤ last by construction
        plan.push(PageRange { first, last });
        first = last + 1;
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The plan must partition [1, total] exactly: contiguous, increasing,
    /// all widths equal to `w` except possibly the last.
    fn assert_partitions(total: u32, w: u32) {
        let plan = plan_batches(total, None, w);
        assert!(!plan.is_empty());
        assert_eq!(plan[0].first(), 1);
        assert_eq!(plan.last().unwrap().last(), total);
        for pair in plan.windows(2) {
            assert_eq!(pair[0].last() + 1, pair[1].first(), "gap or overlap in {plan:?}");
            assert_eq!(pair[0].width(), w, "only the final range may be narrow");
        }
        assert!(plan.last().unwrap().width() <= w);
    }

    #[test]
    fn partitions_without_gaps_or_overlaps() {
        for total in 1..=25 {
            for w in 1..=7 {
                assert_partitions(total, w);
            }
        }
    }

    #[test]
    fn width_one_yields_one_range_per_page() {
        let plan = plan_batches(3, None, 1);
        assert_eq!(
            plan,
            vec![
                PageRange::new(1, 1).unwrap(),
                PageRange::new(2, 2).unwrap(),
                PageRange::new(3, 3).unwrap(),
            ]
        );
    }

    #[test]
    fn final_range_may_be_narrower() {
        let plan = plan_batches(10, None, 3);
        assert_eq!(plan.len(), 4);
        assert_eq!(plan[3], PageRange::new(10, 10).unwrap());
    }

    #[test]
    fn explicit_range_short_circuits() {
        let range = PageRange::new(5, 5).unwrap();
        // total_pages is irrelevant when a range is handed in
        assert_eq!(plan_batches(1, Some(range), 3), vec![range]);
        assert_eq!(plan_batches(500, Some(range), 3), vec![range]);
    }

    #[test]
    fn zero_pages_yields_empty_plan() {
        assert!(plan_batches(0, None, 1).is_empty());
    }

    #[test]
    fn huge_width_covers_document_in_one_range() {
        let plan = plan_batches(5, None, u32::MAX);
        assert_eq!(plan, vec![PageRange::new(1, 5).unwrap()]);
    }

    #[test]
    fn range_invariants() {
        assert!(PageRange::new(0, 3).is_none());
        assert!(PageRange::new(4, 3).is_none());
        assert_eq!(PageRange::new(2, 4).unwrap().width(), 3);
        assert_eq!(PageRange::new(7, 7).unwrap().to_string(), "7-7");
    }

    #[test]
    fn serde_wire_form_uses_start_end() {
        let range = PageRange::new(2, 6).unwrap();
        let json = serde_json::to_value(range).unwrap();
        assert_eq!(json, serde_json::json!({ "start": 2, "end": 6 }));
        let back: PageRange = serde_json::from_value(json).unwrap();
        assert_eq!(back, range);
    }

    #[test]
    fn pages_iterates_ascending() {
        let pages: Vec<u32> = PageRange::new(3, 5).unwrap().pages().collect();
        assert_eq!(pages, vec![3, 4, 5]);
    }
}
