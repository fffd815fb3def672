use colored::Colorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use crate::analyzer::{AnalysisReport, Indicator, IndicatorCategory, RiskLevel};
use crate::compare::ChangeSet;
use crate::validator::{Finding, ValidationReport};

const RULE: &str = "────────────────────────────────────────────────────────────";
/// Items listed per category before the remainder is summarized.
const LIST_LIMIT: usize = 10;

#[derive(Debug, Clone, Tabled)]
pub struct FindingRow {
    #[tabled(rename = "Code")]
    pub code: String,
    #[tabled(rename = "Severity")]
    pub severity: String,
    #[tabled(rename = "Location")]
    pub location: String,
    #[tabled(rename = "Message")]
    pub message: String,
}

impl From<&Finding> for FindingRow {
    fn from(finding: &Finding) -> Self {
        Self {
            code: finding.code.to_string(),
            severity: finding.severity.to_string(),
            location: finding.location(),
            message: finding.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Tabled)]
pub struct IndicatorRow {
    #[tabled(rename = "Category")]
    pub category: String,
    #[tabled(rename = "Evidence")]
    pub evidence: String,
    #[tabled(rename = "Reason")]
    pub reason: String,
}

impl From<&Indicator> for IndicatorRow {
    fn from(indicator: &Indicator) -> Self {
        Self {
            category: indicator.category.to_string(),
            evidence: indicator.evidence.to_string(),
            reason: indicator.reason.clone(),
        }
    }
}

pub fn findings_table(report: &ValidationReport) -> String {
    let rows: Vec<FindingRow> = report.findings.iter().map(FindingRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::markdown());
    table.to_string()
}

pub fn indicators_table(report: &AnalysisReport) -> String {
    let rows: Vec<IndicatorRow> = report.indicators.iter().map(IndicatorRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::markdown());
    table.to_string()
}

fn status_symbol(report: &ValidationReport) -> String {
    if !report.is_valid() {
        "✗".red().to_string()
    } else if report.has_warnings() {
        "⚠".yellow().to_string()
    } else {
        "✓".green().to_string()
    }
}

/// Per-file validation block: a status line followed by each finding.
pub fn format_validation(name: &str, report: &ValidationReport) -> String {
    let mut out = format!("{} {}\n", status_symbol(report), name);
    for finding in &report.findings {
        let marker = if finding.is_error() {
            "✗".red()
        } else {
            "⚠".yellow()
        };
        out.push_str(&format!("    {} {}\n", marker, finding));
    }
    out
}

fn risk_label(level: RiskLevel) -> String {
    match level {
        RiskLevel::Low => level.as_str().green().to_string(),
        RiskLevel::Medium => level.as_str().yellow().to_string(),
        RiskLevel::High => level.as_str().red().bold().to_string(),
    }
}

pub fn format_analysis(report: &AnalysisReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", RULE.dimmed()));
    out.push_str(&format!("{}\n", "Triage Analysis Report".bold()));
    out.push_str(&format!("{}\n", RULE.dimmed()));
    out.push_str(&format!("Scan ID:  {}\n", report.scan_id));
    out.push_str(&format!("Hostname: {}\n\n", report.hostname));

    out.push_str("Collection Statistics:\n");
    out.push_str(&format!("  Processes: {}\n", report.stats.total_processes));
    out.push_str(&format!("  Network Connections: {}\n", report.stats.total_connections));
    out.push_str(&format!("  Persistence Mechanisms: {}\n", report.stats.total_persistence));
    out.push_str(&format!("  Event Log Entries: {}\n", report.stats.total_events));
    out.push_str(&format!("  Scan Duration: {}ms\n\n", report.stats.scan_duration_ms));

    out.push_str(&format!("Security Indicators Found: {}\n\n", report.total()));

    for category in IndicatorCategory::ALL {
        let items = report.by_category(category);
        if items.is_empty() {
            continue;
        }
        out.push_str(&format!("{}:\n", category.title().bold()));
        let listed = if category == IndicatorCategory::SuspiciousProcess {
            let processes = report.process_reasons();
            for process in processes.iter().take(LIST_LIMIT) {
                out.push_str(&format!(
                    "  PID {}: {} - {}\n",
                    process.pid,
                    process.name,
                    process.reasons.join(", ")
                ));
                if !process.path.is_empty() {
                    out.push_str(&format!("    Path: {}\n", process.path));
                }
            }
            processes.len()
        } else {
            for indicator in items.iter().take(LIST_LIMIT) {
                out.push_str(&format!("  {}\n", indicator));
            }
            items.len()
        };
        if listed > LIST_LIMIT {
            out.push_str(&format!("  ... and {} more\n", listed - LIST_LIMIT));
        }
        out.push('\n');
    }

    out.push_str(&format!("Risk Level: {}\n", risk_label(report.risk_level)));
    out.push_str(&format!("  {}\n\n", report.assessment()));

    out.push_str("Recommendations:\n");
    for recommendation in report.recommendations() {
        out.push_str(&format!("  - {}\n", recommendation));
    }
    out
}

pub fn format_changes(changes: &ChangeSet) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", RULE.dimmed()));
    out.push_str(&format!("{}\n", "Scan Comparison".bold()));
    out.push_str(&format!("{}\n", RULE.dimmed()));
    out.push_str(&format!("Baseline: {}\n", changes.baseline_scan_id));
    out.push_str(&format!("Current:  {}\n\n", changes.current_scan_id));

    if !changes.has_changes() {
        out.push_str(&format!("{} No changes detected\n", "✓".green()));
        return out;
    }

    let system = &changes.system_changes;
    if !system.is_empty() {
        out.push_str(&format!("{}\n", "System Changes:".bold()));
        if let Some(uptime) = &system.uptime_change {
            let note = if uptime.indicates_reboot() { " (reboot)" } else { "" };
            out.push_str(&format!(
                "  Uptime: {}s -> {}s{}\n",
                uptime.baseline, uptime.current, note
            ));
        }
        if let Some(hostname) = &system.hostname_change {
            out.push_str(&format!("  Hostname: {} -> {}\n", hostname.baseline, hostname.current));
        }
        if let Some(os) = &system.os_version_change {
            out.push_str(&format!("  OS Version: {} -> {}\n", os.baseline, os.current));
        }
        for user in &system.new_users {
            out.push_str(&format!("  {} user {}\\{}\n", "+".green(), user.domain, user.username));
        }
        for user in &system.removed_users {
            out.push_str(&format!("  {} user {}\\{}\n", "-".red(), user.domain, user.username));
        }
        out.push('\n');
    }

    section(
        &mut out,
        "Processes",
        changes.new_processes.iter().map(|p| format!("{} (PID {}) {}", p.name, p.pid, p.executable_path)),
        changes.removed_processes.iter().map(|p| format!("{} (PID {}) {}", p.name, p.pid, p.executable_path)),
    );
    section(
        &mut out,
        "Network Connections",
        changes.new_connections.iter().map(|c| format!("{} {} -> {} (PID {})", c.protocol, c.local_address, c.remote_address, c.owning_pid)),
        changes.removed_connections.iter().map(|c| format!("{} {} -> {} (PID {})", c.protocol, c.local_address, c.remote_address, c.owning_pid)),
    );
    section(
        &mut out,
        "Persistence Mechanisms",
        changes.new_persistence.iter().map(|m| format!("{}: {} [{}]", m.mechanism_type, m.name, m.command)),
        changes.removed_persistence.iter().map(|m| format!("{}: {} [{}]", m.mechanism_type, m.name, m.command)),
    );
    section(
        &mut out,
        "Execution Evidence",
        changes
            .new_execution
            .prefetch_files
            .iter()
            .map(|f| format!("prefetch {} ({} runs)", f.filename, f.run_count))
            .chain(changes.new_execution.shimcache_entries.iter().map(|e| format!("shimcache {}", e.path))),
        std::iter::empty(),
    );

    out.push_str(&format!("Total changes: {}\n", changes.summary.total_changes));
    out
}

fn section(
    out: &mut String,
    title: &str,
    added: impl Iterator<Item = String>,
    removed: impl Iterator<Item = String>,
) {
    let lines: Vec<String> = added
        .map(|line| format!("  {} {}", "+".green(), line))
        .chain(removed.map(|line| format!("  {} {}", "-".red(), line)))
        .collect();
    if lines.is_empty() {
        return;
    }
    out.push_str(&format!("{}:\n", title.bold()));
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out.push('\n');
}
