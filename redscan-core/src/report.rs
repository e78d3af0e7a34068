// Scan snapshots: lifecycle, atomic persistence and rendering

use crate::error::{CoreError, Result};
use crate::finding::{Evidence, Finding, Severity};
use crate::scan::ScanOutcome;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Running,
    Finished,
    Error,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Pending => "pending",
            ScanStatus::Running => "running",
            ScanStatus::Finished => "finished",
            ScanStatus::Error => "error",
        }
    }

    /// pending -> running -> finished | error. A scan may also fail before it starts.
    pub fn can_transition_to(&self, next: ScanStatus) -> bool {
        matches!(
            (self, next),
            (ScanStatus::Pending, ScanStatus::Running)
                | (ScanStatus::Pending, ScanStatus::Error)
                | (ScanStatus::Running, ScanStatus::Finished)
                | (ScanStatus::Running, ScanStatus::Error)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Finished | ScanStatus::Error)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub scan_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Url>,
    pub status: ScanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pages_crawled: Vec<Url>,
    #[serde(default)]
    pub forms_discovered: usize,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanReport {
    pub fn pending(scan_id: impl Into<String>, target: Option<Url>) -> Self {
        Self {
            scan_id: scan_id.into(),
            target,
            status: ScanStatus::Pending,
            started_at: None,
            finished_at: None,
            pages_crawled: Vec::new(),
            forms_discovered: 0,
            findings: Vec::new(),
            error: None,
        }
    }

    fn transition(&mut self, next: ScanStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        debug!("Scan {}: {} -> {}", self.scan_id, self.status, next);
        self.status = next;
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        self.transition(ScanStatus::Running)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn finish(&mut self, outcome: ScanOutcome) -> Result<()> {
        self.transition(ScanStatus::Finished)?;
        self.pages_crawled = outcome.pages;
        self.forms_discovered = outcome.forms.len();
        self.findings = outcome.findings;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    pub fn fail(&mut self, error: impl fmt::Display) -> Result<()> {
        self.transition(ScanStatus::Error)?;
        self.error = Some(error.to_string());
        self.finished_at = Some(Utc::now());
        Ok(())
    }
}

/// Directory of `<scan_id>.json` snapshots.
///
/// Writes go to a temp file in the same directory and are renamed into place,
/// so readers see either the previous snapshot or the new one, never a partial file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshot path for `scan_id`. Ids are plain file stems; anything that
    /// could leave the store directory is rejected.
    pub fn path_for(&self, scan_id: &str) -> Result<PathBuf> {
        let valid = !scan_id.is_empty()
            && !scan_id.contains("..")
            && !scan_id.contains(['/', '\\'])
            && Path::new(scan_id).components().count() == 1;
        if !valid {
            return Err(CoreError::InvalidScanId(scan_id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", scan_id)))
    }

    pub fn save(&self, report: &ScanReport) -> Result<PathBuf> {
        let path = self.path_for(&report.scan_id)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, report)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path)?;
        debug!("Wrote {} snapshot to {}", report.status, path.display());
        Ok(path)
    }

    /// Unknown ids read back as a pending stub rather than an error
    pub fn load(&self, scan_id: &str) -> Result<ScanReport> {
        let path = self.path_for(scan_id)?;
        if !path.exists() {
            return Ok(ScanReport::pending(scan_id, None));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

pub fn render_report(report: &ScanReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ReportFormat::Text => Ok(generate_text_report(report)),
    }
}

fn severity_label(severity: Severity) -> String {
    let label = format!("[{}]", severity.as_str().to_uppercase());
    match severity {
        Severity::High => label.red().bold().to_string(),
        Severity::Medium => label.yellow().bold().to_string(),
    }
}

fn status_label(status: ScanStatus) -> String {
    match status {
        ScanStatus::Pending => status.as_str().bright_black().to_string(),
        ScanStatus::Running => status.as_str().cyan().to_string(),
        ScanStatus::Finished => status.as_str().green().to_string(),
        ScanStatus::Error => status.as_str().red().to_string(),
    }
}

pub fn generate_text_report(report: &ScanReport) -> String {
    let rule = "━".repeat(60);
    let mut out = String::new();

    out.push_str(&format!("{}\n\n", rule));
    out.push_str(&format!("Scan {}\n", report.scan_id.bold()));
    if let Some(ref target) = report.target {
        out.push_str(&format!("  Target: {}\n", target));
    }
    out.push_str(&format!("  Status: {}\n", status_label(report.status)));
    if let Some(started) = report.started_at {
        out.push_str(&format!("  Started: {}\n", started.format("%Y-%m-%d %H:%M:%S UTC")));
    }
    if let Some(finished) = report.finished_at {
        out.push_str(&format!("  Finished: {}\n", finished.format("%Y-%m-%d %H:%M:%S UTC")));
    }
    if let Some(ref error) = report.error {
        out.push_str(&format!("  Error: {}\n", error.red()));
    }

    if !report.status.is_terminal() {
        out.push_str(&format!("\n{}\n", rule));
        return out;
    }

    out.push_str("\n# Summary:\n");
    out.push_str(&format!("  Pages crawled: {}\n", report.pages_crawled.len()));
    out.push_str(&format!("  Forms discovered: {}\n", report.forms_discovered));
    out.push_str(&format!("  Findings: {}\n", report.findings.len()));

    if !report.pages_crawled.is_empty() {
        out.push_str("\n# Pages:\n");
        for page in &report.pages_crawled {
            out.push_str(&format!("  {}\n", page));
        }
    }

    if !report.findings.is_empty() {
        out.push_str("\n# Findings:\n");
        for finding in &report.findings {
            out.push_str(&format!(
                "  {} {}",
                severity_label(finding.severity),
                finding.finding_type.as_str()
            ));
            if let Some(ref target) = finding.target {
                out.push_str(&format!(" {}", target));
            }
            out.push('\n');

            match &finding.evidence {
                Evidence::Issues(issues) => {
                    for issue in issues {
                        out.push_str(&format!("      - {}\n", issue));
                    }
                }
                Evidence::Reflection(probe) => {
                    out.push_str(&format!("      marker: {}\n", probe.marker));
                    out.push_str(&format!("      url: {} ({})\n", probe.url, probe.status_code));
                    let snippet = probe.snippet.replace(['\n', '\r'], " ");
                    out.push_str(&format!("      snippet: {}\n", snippet.bright_black()));
                }
            }
        }
    }

    out.push_str(&format!("\n{}\n", rule));
    out
}
