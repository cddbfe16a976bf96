use serde::{Deserialize, Serialize};
use tracing::debug;

use super::lines::{classify_line, LineKind};

/// One row of the extracted test-item table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub item_number: u32,
    pub major_item: String,
    /// No line type fills this yet; the column is kept for the table layout.
    pub minor_item: String,
    pub test_content: String,
    pub test_condition: String,
    pub judgment_criteria: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanStats {
    pub pages_seen: u32,
    pub pages_skipped: u32,
    pub pages_empty: u32,
    pub lines: usize,
    pub blank: usize,
    pub headings: usize,
    pub table_noise: usize,
    pub sub_items: usize,
    pub conditions: usize,
    pub criteria: usize,
    pub generic: usize,
    pub orphans: usize,
}

impl ScanStats {
    pub fn appended(&self) -> usize {
        self.headings + self.sub_items + self.generic
    }

    pub fn print(&self) {
        println!(
            "Pages: {} seen, {} skipped, {} without text.",
            self.pages_seen, self.pages_skipped, self.pages_empty
        );
        println!(
            "Lines: {} ({} headings, {} sub-items, {} generic, {} conditions, {} criteria, {} table titles, {} blank).",
            self.lines,
            self.headings,
            self.sub_items,
            self.generic,
            self.conditions,
            self.criteria,
            self.table_noise,
            self.blank,
        );
        if self.orphans > 0 {
            println!("Dropped {} annotations with no preceding item.", self.orphans);
        }
    }
}

enum Annotation {
    Condition,
    Criteria,
}

/// Carry-over state of a single document scan.
///
/// Lines are fed in document order. Headings, sub-items and generic lines
/// append a record; condition and criteria lines rewrite the last record.
#[derive(Debug)]
pub struct ScanState {
    heading_marker: String,
    current_major: String,
    next_item_number: u32,
    records: Vec<Record>,
    stats: ScanStats,
}

impl ScanState {
    pub fn new(heading_marker: impl Into<String>) -> Self {
        ScanState {
            heading_marker: heading_marker.into(),
            current_major: String::new(),
            next_item_number: 1,
            records: Vec::new(),
            stats: ScanStats::default(),
        }
    }

    pub fn skip_page(&mut self, page: u32) {
        debug!(page, "skipping leading page");
        self.stats.pages_seen += 1;
        self.stats.pages_skipped += 1;
    }

    /// Feed one page's text. `None` means the page had no extractable text.
    pub fn feed_page(&mut self, page: u32, text: Option<&str>) {
        self.stats.pages_seen += 1;
        let Some(text) = text else {
            debug!(page, "page has no text");
            self.stats.pages_empty += 1;
            return;
        };
        for line in text.lines() {
            self.feed_line(line);
        }
    }

    pub fn feed_line(&mut self, raw: &str) -> LineKind {
        let kind = classify_line(raw, &self.heading_marker);
        debug!(kind = kind.tag(), line = raw.trim(), "classified");
        self.stats.lines += 1;

        match &kind {
            LineKind::Blank => self.stats.blank += 1,
            LineKind::TableNoise => self.stats.table_noise += 1,
            LineKind::Heading(text) => {
                self.stats.headings += 1;
                self.current_major = text.clone();
                self.append(text);
            }
            LineKind::SubItem(text) => {
                self.stats.sub_items += 1;
                self.append(text);
            }
            LineKind::Generic(text) => {
                self.stats.generic += 1;
                self.append(text);
            }
            LineKind::Condition(text) => {
                self.stats.conditions += 1;
                self.annotate_last(Annotation::Condition, text);
            }
            LineKind::Criteria(text) => {
                self.stats.criteria += 1;
                self.annotate_last(Annotation::Criteria, text);
            }
        }
        kind
    }

    fn append(&mut self, content: &str) {
        self.records.push(Record {
            item_number: self.next_item_number,
            major_item: self.current_major.clone(),
            test_content: content.to_string(),
            ..Record::default()
        });
        self.next_item_number += 1;
    }

    fn annotate_last(&mut self, field: Annotation, text: &str) {
        let Some(last) = self.records.last_mut() else {
            debug!(text, "annotation before any item, dropped");
            self.stats.orphans += 1;
            return;
        };
        match field {
            Annotation::Condition => last.test_condition = text.to_string(),
            Annotation::Criteria => last.judgment_criteria = text.to_string(),
        }
    }

    #[cfg(test)]
    pub fn current_major(&self) -> &str {
        &self.current_major
    }

    #[cfg(test)]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[cfg(test)]
    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    pub fn finish(self) -> (Vec<Record>, ScanStats) {
        (self.records, self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lines::DEFAULT_HEADING_MARKER;

    fn scan(lines: &[&str]) -> ScanState {
        let mut state = ScanState::new(DEFAULT_HEADING_MARKER);
        for line in lines {
            state.feed_line(line);
        }
        state
    }

    #[test]
    fn heading_is_both_context_and_row() {
        let state = scan(&["■ブレーキ試験"]);
        assert_eq!(state.current_major(), "■ブレーキ試験");
        let r = &state.records()[0];
        assert_eq!(r.item_number, 1);
        assert_eq!(r.major_item, "■ブレーキ試験");
        assert_eq!(r.test_content, "■ブレーキ試験");
        assert!(r.minor_item.is_empty());
    }

    #[test]
    fn major_item_carries_over() {
        let state = scan(&[
            "■ブレーキ試験",
            "1-1 制動距離を測定する",
            "ペダル踏力を記録する",
            "■操舵試験",
            "2-1 旋回半径を測定する",
        ]);
        let majors: Vec<&str> = state.records().iter().map(|r| r.major_item.as_str()).collect();
        assert_eq!(
            majors,
            ["■ブレーキ試験", "■ブレーキ試験", "■ブレーキ試験", "■操舵試験", "■操舵試験"]
        );
    }

    #[test]
    fn items_before_any_heading_have_empty_major() {
        let state = scan(&["1-1 外観を確認する", "寸法を測定する"]);
        assert!(state.records().iter().all(|r| r.major_item.is_empty()));
    }

    #[test]
    fn annotations_target_last_record() {
        let state = scan(&[
            "■ブレーキ試験",
            "1-1 制動距離を測定する",
            "試験条件速度60km/hで実施する。",
            "判定基準停止距離が10m以内であること。",
        ]);
        let records = state.records();
        assert_eq!(records.len(), 2);
        assert!(records[0].test_condition.is_empty());
        assert!(records[0].judgment_criteria.is_empty());
        assert_eq!(records[1].test_condition, "速度60km/hで実施する。");
        assert_eq!(records[1].judgment_criteria, "停止距離が10m以内であること。");
    }

    #[test]
    fn later_annotation_overwrites() {
        let state = scan(&["1-1 制動", "試験条件 乾燥路面。", "試験方法 湿潤路面。"]);
        assert_eq!(state.records()[0].test_condition, "湿潤路面。");
    }

    #[test]
    fn annotation_does_not_reach_back() {
        let state = scan(&["1-1 制動", "1-2 旋回", "判定基準 異常なし"]);
        assert!(state.records()[0].judgment_criteria.is_empty());
        assert_eq!(state.records()[1].judgment_criteria, "異常なし");
    }

    #[test]
    fn orphan_annotations_are_dropped() {
        let state = scan(&["試験条件 速度60km/h。", "判定基準 10m以内。"]);
        assert!(state.records().is_empty());
        assert_eq!(state.stats().orphans, 2);
        assert_eq!(state.stats().conditions, 1);
        assert_eq!(state.stats().criteria, 1);
    }

    #[test]
    fn table_titles_leave_state_untouched() {
        let state = scan(&["■ブレーキ試験", "■表1 測定結果", "表2 補足", "1-1 制動"]);
        assert_eq!(state.current_major(), "■ブレーキ試験");
        assert_eq!(state.records().len(), 2);
        assert_eq!(state.records()[1].major_item, "■ブレーキ試験");
        assert_eq!(state.stats().table_noise, 2);
    }

    #[test]
    fn item_numbers_are_contiguous() {
        let state = scan(&[
            "",
            "試験条件 孤立",
            "■A",
            "表1 x",
            "1-1 a",
            "試験条件 c。",
            "b",
            "   ",
            "判定基準 d",
            "■B",
            "2-1 e",
        ]);
        let numbers: Vec<u32> = state.records().iter().map(|r| r.item_number).collect();
        assert_eq!(numbers, (1..=5).collect::<Vec<u32>>());
        assert_eq!(state.stats().appended(), 5);
    }

    #[test]
    fn feed_line_reports_kind() {
        let mut state = ScanState::new(DEFAULT_HEADING_MARKER);
        assert_eq!(state.feed_line(" "), LineKind::Blank);
        assert!(matches!(state.feed_line("■A"), LineKind::Heading(_)));
    }

    #[test]
    fn empty_page_is_counted() {
        let mut state = ScanState::new(DEFAULT_HEADING_MARKER);
        state.feed_page(4, None);
        state.feed_page(5, Some("■A\n1-1 b"));
        let (records, stats) = state.finish();
        assert_eq!(records.len(), 2);
        assert_eq!(stats.pages_seen, 2);
        assert_eq!(stats.pages_empty, 1);
    }
}
