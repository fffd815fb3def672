use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingSeverity {
    Error,
    Warning,
}

impl fmt::Display for FindingSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingSeverity::Error => write!(f, "error"),
            FindingSeverity::Warning => write!(f, "warning"),
        }
    }
}

/// A single data-quality problem located by section and, for list
/// elements, by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub code: &'static str,
    pub severity: FindingSeverity,
    pub section: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub message: String,
}

impl Finding {
    pub fn error(code: &'static str, section: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: FindingSeverity::Error,
            section: section.into(),
            index: None,
            message: message.into(),
        }
    }

    pub fn warning(code: &'static str, section: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: FindingSeverity::Warning,
            section: section.into(),
            index: None,
            message: message.into(),
        }
    }

    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == FindingSeverity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == FindingSeverity::Warning
    }

    /// `section[index]`, or just the section for whole-section findings.
    pub fn location(&self) -> String {
        match self.index {
            Some(i) => format!("{}[{}]", self.section, i),
            None => self.section.clone(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.location(), self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
    pub warnings_as_errors: bool,
}

impl ValidationReport {
    pub fn new(findings: Vec<Finding>, warnings_as_errors: bool) -> Self {
        Self { findings, warnings_as_errors }
    }

    pub fn is_valid(&self) -> bool {
        self.error_count() == 0 && (!self.warnings_as_errors || self.warning_count() == 0)
    }

    /// Whether the document could not be examined at all.
    pub fn is_fatal(&self) -> bool {
        self.findings.iter().any(|f| f.code == super::codes::UNREADABLE_DOCUMENT)
    }

    pub fn has_warnings(&self) -> bool {
        self.findings.iter().any(Finding::is_warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.is_warning())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn for_section<'a>(&'a self, section: &'a str) -> impl Iterator<Item = &'a Finding> {
        self.findings.iter().filter(move |f| f.section == section)
    }
}
