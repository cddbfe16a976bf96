use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::ValueEnum;
use csv::WriterBuilder;

use crate::parser::Record;

/// Spreadsheet column titles, in output order.
pub const COLUMNS: [&str; 6] = ["項目番号", "大項目", "小項目", "試験内容", "試験条件", "判定基準"];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Csv,
    Json,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Json => "json",
        }
    }
}

/// `<dir>/<stem>_<timestamp>.<ext>`
pub fn default_output_path(dir: &Path, source: &Path, format: Format) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("spec");
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("{}_{}.{}", stem, stamp, format.extension()))
}

/// CSV with a BOM so spreadsheet tools pick up UTF-8.
pub fn write_csv<W: Write>(mut out: W, records: &[Record]) -> Result<()> {
    out.write_all(UTF8_BOM)?;
    let mut wtr = WriterBuilder::new().from_writer(out);
    wtr.write_record(COLUMNS)?;
    for r in records {
        let number = r.item_number.to_string();
        wtr.write_record([
            number.as_str(),
            r.major_item.as_str(),
            r.minor_item.as_str(),
            r.test_content.as_str(),
            r.test_condition.as_str(),
            r.judgment_criteria.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(mut out: W, records: &[Record]) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, records)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

/// Write `records` to `path`, creating parent directories as needed.
pub fn export_to(path: &Path, records: &[Record], format: Format) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {:?}", dir))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    let out = std::io::BufWriter::new(file);
    match format {
        Format::Csv => write_csv(out, records),
        Format::Json => write_json(out, records),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Record> {
        vec![
            Record {
                item_number: 1,
                major_item: "■ブレーキ試験".into(),
                test_content: "■ブレーキ試験".into(),
                ..Record::default()
            },
            Record {
                item_number: 2,
                major_item: "■ブレーキ試験".into(),
                test_content: "1-1 制動距離, 停止姿勢".into(),
                test_condition: "速度60km/hで実施する。".into(),
                judgment_criteria: "停止距離が10m以内であること。".into(),
                ..Record::default()
            },
        ]
    }

    #[test]
    fn csv_layout() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &sample()).unwrap();
        assert!(buf.starts_with(UTF8_BOM));

        let text = String::from_utf8(buf[UTF8_BOM.len()..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "項目番号,大項目,小項目,試験内容,試験条件,判定基準");
        assert_eq!(lines[1], "1,■ブレーキ試験,,■ブレーキ試験,,");
        assert_eq!(
            lines[2],
            "2,■ブレーキ試験,,\"1-1 制動距離, 停止姿勢\",速度60km/hで実施する。,停止距離が10m以内であること。"
        );
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn csv_reads_back() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &sample()).unwrap();
        let mut rdr = csv::Reader::from_reader(&buf[UTF8_BOM.len()..]);
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][3], "1-1 制動距離, 停止姿勢");
    }

    #[test]
    fn empty_table_still_has_header() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &[]).unwrap();
        let text = String::from_utf8(buf[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn json_export() {
        let mut buf = Vec::new();
        write_json(&mut buf, &sample()).unwrap();
        let back: Vec<Record> = serde_json::from_slice(&buf).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn export_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output/nested/items.csv");
        export_to(&path, &sample(), Format::Csv).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn default_path_uses_stem() {
        let path = default_output_path(Path::new("output"), Path::new("docs/brake.pdf"), Format::Csv);
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(path.starts_with("output"));
        assert!(name.starts_with("brake_"));
        assert!(name.ends_with(".csv"));
    }
}
