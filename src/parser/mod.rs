pub mod lines;
pub mod records;

use tracing::info;

use crate::source::PageTextSource;
pub use records::{Record, ScanState, ScanStats};

/// Leading pages (cover, table of contents) that never hold test items.
pub const DEFAULT_SKIP_PAGES: u32 = 3;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub skip_pages: u32,
    pub heading_marker: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            skip_pages: DEFAULT_SKIP_PAGES,
            heading_marker: lines::DEFAULT_HEADING_MARKER.to_string(),
        }
    }
}

pub struct Extraction {
    pub records: Vec<Record>,
    pub stats: ScanStats,
}

/// Scan every page of `source` in order and build the record table.
/// `on_page` is called once per page index, skipped pages included.
pub fn extract_records<S, F>(source: &S, opts: &ScanOptions, mut on_page: F) -> Extraction
where
    S: PageTextSource + ?Sized,
    F: FnMut(u32),
{
    let mut state = ScanState::new(opts.heading_marker.as_str());
    for page in 1..=source.page_count() {
        if page <= opts.skip_pages {
            state.skip_page(page);
        } else {
            state.feed_page(page, source.page_text(page).as_deref());
        }
        on_page(page);
    }

    let (records, stats) = state.finish();
    info!(
        pages = stats.pages_seen,
        skipped = stats.pages_skipped,
        records = records.len(),
        orphans = stats.orphans,
        "scan complete"
    );
    Extraction { records, stats }
}

// ── Tests ──
