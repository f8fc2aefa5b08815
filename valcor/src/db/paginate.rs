//! Occurrence-window pagination.
//!
//! A page is not a count of sentences but a fixed-size window of matched
//! verb occurrences: page *p* covers the half-open occurrence range
//! `[(p-1)·W, p·W)` of the cumulative stream of per-sentence hit counts,
//! ordered by sentence identifier. A sentence whose span overlaps the
//! window is part of the page even when only some of its occurrences fall
//! inside; the page total counts only the overlap, so the windows are
//! contiguous, non-overlapping, and sum to the total occurrence count.

use crate::db::compose::QueryContext;
use crate::db::CorpusStore;
use crate::errors::Result;

/// Per-sentence hit counts plus their aggregates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccurrenceTotals {
    pub sentences: u64,
    pub occurrences: u64,
}

/// The sentences of one occurrence window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowSelection {
    /// Sentences overlapping the window, in sentence order.
    pub sentence_ids: Vec<String>,
    /// Occurrences of this window actually covered; less than the window
    /// size on the last page, zero past the end of the stream.
    pub covered: u64,
    /// 0-based offset of the window's first occurrence.
    pub start_offset: u64,
}

/// Slice one page out of an ordered per-sentence hit stream.
pub fn select_window(hits: &[(String, u64)], page: u32, window: u32) -> (OccurrenceTotals, WindowSelection) {
    let window = u64::from(window.max(1));
    let start = u64::from(page.max(1) - 1) * window;
    let end = start + window;

    let mut totals = OccurrenceTotals::default();
    let mut selection = WindowSelection {
        start_offset: start,
        ..WindowSelection::default()
    };

    let mut cumulative = 0u64;
    for (sent_id, count) in hits {
        if *count == 0 {
            continue;
        }
        totals.sentences += 1;
        totals.occurrences += count;

        let span_start = cumulative;
        let span_end = cumulative + count;
        cumulative = span_end;

        let overlap = span_end.min(end).saturating_sub(span_start.max(start));
        if overlap > 0 {
            selection.sentence_ids.push(sent_id.clone());
            selection.covered += overlap;
        }
    }

    (totals, selection)
}

/// Fetch the per-sentence histogram for the current filter state and slice
/// the requested page out of it.
pub fn paginate(
    ctx: &QueryContext,
    store: &dyn CorpusStore,
) -> Result<(OccurrenceTotals, WindowSelection)> {
    let statement = ctx.occurrence_histogram()?;
    let rows = store.rows(&statement)?;
    let mut hits = Vec::with_capacity(rows.len());
    for row in &rows {
        let sent_id = row.require_text(0)?.to_string();
        let count = row.require_integer(1)?.max(0) as u64;
        hits.push((sent_id, count));
    }
    Ok(select_window(
        &hits,
        ctx.filter.page,
        ctx.config.window_size,
    ))
}
