//! Report emission
//!
//! Reports go to stdout as one JSON object each. Everything human-oriented
//! is logged through `tracing`, which writes to stderr.

use layoutcheck_engine::LayoutReport;
use std::io::Write;
use tracing::{info, warn};

use crate::error::RunnerResult;

/// Writes reports as JSON, pretty or one per line
pub struct ReportWriter<W: Write> {
    out: W,
    pretty: bool,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W, pretty: bool) -> Self {
        Self { out, pretty }
    }

    pub fn write(&mut self, report: &LayoutReport) -> RunnerResult<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.out, report)?;
        } else {
            serde_json::to_writer(&mut self.out, report)?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    /// Write every report in order; returns whether any had violations
    pub fn write_all<'r>(&mut self, reports: impl IntoIterator<Item = &'r LayoutReport>) -> RunnerResult<bool> {
        let mut dirty = false;
        for report in reports {
            if report.is_clean() {
                info!("✓ {}", report.summary());
            } else {
                dirty = true;
                warn!("✗ {}", report.summary());
            }
            self.write(report)?;
        }
        self.out.flush()?;
        Ok(dirty)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layoutcheck_engine::{ViewSize, ViewportClass, Violation};

    fn report(snapshot: &str, violations: Vec<Violation>) -> LayoutReport {
        LayoutReport {
            scenario_name: "home".into(),
            snapshot_name: snapshot.into(),
            view_tag: None,
            view_size: ViewSize { width: 1280.0, height: 800.0 },
            viewport_class: ViewportClass::Desktop,
            violations,
        }
    }

    #[test]
    fn test_one_line_per_report() {
        let reports = [report("a", vec![]), report("b", vec![])];
        let mut writer = ReportWriter::new(Vec::new(), false);
        assert!(!writer.write_all(&reports).unwrap());

        let text = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed["snapshotName"], "b");
        assert!(parsed.get("viewTag").is_none());
    }

    #[test]
    fn test_pretty_and_dirty() {
        let reports = [report("a", vec![Violation::new("visible", "hidden")])];
        let mut writer = ReportWriter::new(Vec::new(), true);
        assert!(writer.write_all(&reports).unwrap());

        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert!(text.lines().count() > 1);
        let parsed: LayoutReport = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.violations[0].constraint, "visible");
    }
}
