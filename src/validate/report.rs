//! sparse validation report

use serde::{Deserialize, Serialize};

/// errors for one group, mirroring its shape
///
/// `rules` holds only the failing children, in tree order: a message for a
/// rule, a nested report for a group. `empty` is set when the group itself
/// has no children and empty groups are disallowed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    #[serde(default)]
    pub rules: Vec<ReportEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportEntry {
    Message(String),
    Group(ValidationReport),
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.empty.is_none()
    }

    /// every message in the report, depth first
    pub fn messages(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    pub fn error_count(&self) -> usize {
        self.messages().len()
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(empty) = &self.empty {
            out.push(empty);
        }
        for entry in &self.rules {
            match entry {
                ReportEntry::Message(m) => out.push(m),
                ReportEntry::Group(g) => g.collect(out),
            }
        }
    }
}
