use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Name used for commands whose declaration carries no identifier.
pub const UNNAMED_COMMAND: &str = "unknown";

/// One exported command discovered in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRecord {
    /// File the command was declared in
    pub file: PathBuf,
    pub name: String,
    /// Attached JSDoc blocks, each followed by a newline; empty when undocumented
    pub docs: String,
    pub return_type: String,
    /// Parameters in declaration order
    pub parameters: Vec<Parameter>,
    /// Generic parameters of the command, e.g. `T extends Node`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_parameters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub rest: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self { name: name.into(), ty: ty.into(), optional: false, rest: false }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rest = if self.rest { "..." } else { "" };
        let optional = if self.optional && !self.rest { "?" } else { "" };
        write!(f, "{rest}{}{optional}: {}", self.name, self.ty)
    }
}

impl SignatureRecord {
    /// The method name this record renders to.
    pub fn method_name(&self) -> &str {
        if self.name.is_empty() {
            UNNAMED_COMMAND
        } else {
            &self.name
        }
    }
}

/// Joins JSDoc blocks into the `docs` form: every block followed by a newline.
pub fn join_docs(blocks: &[String]) -> String {
    blocks.iter().map(|b| format!("{b}\n")).collect()
}

/// Distinct source files of `records`, in first-seen order.
pub fn distinct_files(records: &[SignatureRecord]) -> Vec<&Path> {
    let mut files: Vec<&Path> = Vec::new();
    for record in records {
        if !files.contains(&record.file.as_path()) {
            files.push(&record.file);
        }
    }
    files
}
