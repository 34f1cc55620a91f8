//! Reading scattering curves and writing analysis reports.

use crate::engine::AnalysisReport;
use crate::errors::{
    Result,
    SaxsError,
};
use crate::models::{
    Curve,
    MIN_CURVE_LEN,
};
use std::fs::File;
use std::io::{
    BufReader,
    BufWriter,
    Read,
    Write,
};
use std::path::Path;
use tracing::{
    debug,
    info,
    warn,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Comma,
    Semicolon,
    Whitespace,
}

impl Layout {
    /// Guesses the column separator from the first data line.
    fn sniff(text: &str) -> Self {
        let first = text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with('#'));
        match first {
            Some(line) if line.contains(',') => Layout::Comma,
            Some(line) if line.contains(';') => Layout::Semicolon,
            _ => Layout::Whitespace,
        }
    }

    fn delimiter(&self) -> u8 {
        match self {
            Layout::Comma => b',',
            Layout::Semicolon => b';',
            Layout::Whitespace => b' ',
        }
    }
}

fn parse_field(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok()
}

/// Parses a two-column (q, I) table.
///
/// Comma, semicolon, tab or space separated; `#` lines are comments.
/// Extra columns are ignored. Rows that do not start with two numbers (a
/// header, stray text), rows with non-finite values and rows with `q <= 0`
/// are dropped. Negative intensities are clipped to zero.
pub fn read_curve_from_reader<R: Read>(mut reader: R) -> Result<Curve> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let layout = Layout::sniff(&text);
    if layout == Layout::Whitespace {
        text = text.replace('\t', " ");
    }

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .delimiter(layout.delimiter())
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut q = Vec::new();
    let mut intensity = Vec::new();
    let mut non_numeric = 0usize;
    let mut rejected = 0usize;
    let mut clipped = 0usize;
    for record in rdr.records() {
        let record = record?;
        let mut fields = record.iter().filter(|f| !f.is_empty());
        let (Some(qv), Some(iv)) = (
            fields.next().and_then(parse_field),
            fields.next().and_then(parse_field),
        ) else {
            non_numeric += 1;
            continue;
        };
        if !qv.is_finite() || !iv.is_finite() || qv <= 0.0 {
            rejected += 1;
            continue;
        }
        if iv < 0.0 {
            clipped += 1;
        }
        q.push(qv);
        intensity.push(iv.max(0.0));
    }

    if non_numeric > 0 {
        debug!("Skipped {} non-numeric rows", non_numeric);
    }
    if rejected > 0 {
        warn!("Dropped {} rows with non-finite values or q <= 0", rejected);
    }
    if clipped > 0 {
        warn!("Clipped {} negative intensities to zero", clipped);
    }
    if q.len() < MIN_CURVE_LEN {
        return Err(SaxsError::input_invalid(format!(
            "found {} valid rows, at least {} are required",
            q.len(),
            MIN_CURVE_LEN
        )));
    }
    Curve::try_new(q, intensity)
}

pub fn read_curve(path: impl AsRef<Path>) -> Result<Curve> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| SaxsError::Io {
        source,
        path: Some(path.to_path_buf()),
    })?;
    let curve = read_curve_from_reader(BufReader::new(file))
        .map_err(|e| e.append_to_context(&format!(" (in {})", path.display())))?;
    info!("Read {} samples from {}", curve.len(), path.display());
    Ok(curve)
}

pub fn write_report_to<W: Write>(writer: W, report: &AnalysisReport) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

pub fn write_report(path: impl AsRef<Path>, report: &AnalysisReport) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| SaxsError::Io {
        source,
        path: Some(path.to_path_buf()),
    })?;
    write_report_to(file, report)?;
    info!("Wrote report to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    fn rows(sep: &str) -> String {
        (1..=10)
            .map(|i| format!("{}{}{}", i as f64 * 0.01, sep, 100.0 / i as f64))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_separators() {
        for sep in [",", "\t", "   ", " \t ", ";"] {
            let text = format!("q{}I\n# comment\n{}\n", sep, rows(sep));
            let curve = read_curve_from_reader(text.as_bytes()).unwrap();
            assert_eq!(curve.len(), 10, "separator {:?}", sep);
            assert_eq!(curve.intensity()[0], 100.0);
        }
    }

    #[test]
    fn test_extra_columns_and_bad_rows() {
        let mut text = String::from("# q I err\n");
        text.push_str("0.0 5.0 0.1\n");
        text.push_str("-0.1 5.0 0.1\n");
        text.push_str("0.005 nan 0.1\n");
        for i in 1..=8 {
            text.push_str(&format!("{} {} 0.5\n", i as f64 * 0.01, i));
        }
        text.push_str("0.5 -2.0 0.1\n");
        let curve = read_curve_from_reader(text.as_bytes()).unwrap();
        assert_eq!(curve.len(), 9);
        assert_eq!(curve.q_min(), 0.01);
        assert_eq!(curve.intensity()[8], 0.0);
    }

    #[test]
    fn test_too_few_rows() {
        let text = "0.1 1\n0.2 2\n0.3 3\n";
        let err = read_curve_from_reader(text.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputInvalid);
    }

    #[test]
    fn test_missing_file() {
        let err = read_curve("/definitely/not/here.dat").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
