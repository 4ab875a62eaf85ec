//! Builds the ambient `declare namespace` skeleton and fills its interface
//! with one method per extracted command.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyzer::extract::extract_command_types;
use crate::analyzer::metadata::{Parameter, SignatureRecord};
use crate::error::Result;

/// Names used for the generated declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SkeletonOptions {
    pub module_name: String,
    pub interface_name: String,
    pub type_parameter: String,
}

impl Default for SkeletonOptions {
    fn default() -> Self {
        Self {
            module_name: "Cypress".to_string(),
            interface_name: "Chainable".to_string(),
            type_parameter: "Subject".to_string(),
        }
    }
}

/// One interface member, ready to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: String,
    /// Text emitted verbatim before the member
    pub leading_docs: String,
    pub type_parameters: Vec<String>,
    pub parameters: Vec<Parameter>,
    pub return_type: String,
}

impl From<&SignatureRecord> for MethodSignature {
    fn from(record: &SignatureRecord) -> Self {
        Self {
            name: record.method_name().to_string(),
            leading_docs: record.docs.clone(),
            type_parameters: record.type_parameters.clone(),
            parameters: record.parameters.clone(),
            return_type: record.return_type.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDecl {
    pub name: String,
    pub type_parameter: String,
    methods: Vec<MethodSignature>,
}

impl InterfaceDecl {
    pub fn methods(&self) -> &[MethodSignature] {
        &self.methods
    }

    /// Appends a member. Same-named members are kept side by side as overloads.
    pub fn add_method(&mut self, method: MethodSignature) {
        self.methods.push(method);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbientModule {
    pub name: String,
    pub has_declare_keyword: bool,
    pub interface: InterfaceDecl,
}

/// In-memory, not yet persisted declaration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSkeleton {
    output: PathBuf,
    pub module: AmbientModule,
}

impl ModuleSkeleton {
    /// Where the skeleton is meant to be written.
    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn interface(&self) -> &InterfaceDecl {
        &self.module.interface
    }

    pub fn interface_mut(&mut self) -> &mut InterfaceDecl {
        &mut self.module.interface
    }
}

/// Creates a fresh skeleton for `output`: one ambient module holding one
/// empty generic interface. Nothing is written to disk.
pub fn create_skeleton(output: impl Into<PathBuf>, options: &SkeletonOptions) -> ModuleSkeleton {
    ModuleSkeleton {
        output: output.into(),
        module: AmbientModule {
            name: options.module_name.clone(),
            has_declare_keyword: true,
            interface: InterfaceDecl {
                name: options.interface_name.clone(),
                type_parameter: options.type_parameter.clone(),
                methods: Vec::new(),
            },
        },
    }
}

/// Extracts `files` strictly in order, stopping at the first failure.
pub fn extract_all<P: AsRef<Path>>(files: &[P]) -> Result<Vec<SignatureRecord>> {
    let mut records = Vec::new();
    for file in files {
        records.extend(extract_command_types(file.as_ref())?);
    }
    Ok(records)
}

/// Folds records into a fresh skeleton, preserving their order.
pub fn synthesize(output: impl Into<PathBuf>, options: &SkeletonOptions, records: &[SignatureRecord]) -> ModuleSkeleton {
    records
        .iter()
        .fold(create_skeleton(output, options), |mut skeleton, record| {
            skeleton.interface_mut().add_method(record.into());
            skeleton
        })
}

/// Adds one method per command found in `files` to `interface` and returns
/// the flattened records (file order, then declaration order).
///
/// Population is all-or-nothing: every file is extracted before the first
/// method is appended, so a failing file leaves `interface` untouched.
pub fn populate<P: AsRef<Path>>(interface: &mut InterfaceDecl, files: &[P]) -> Result<Vec<SignatureRecord>> {
    let records = extract_all(files)?;
    for record in &records {
        debug!(command = record.method_name(), file = %record.file.display(), "adding method");
        interface.add_method(record.into());
    }
    info!(files = files.len(), commands = records.len(), "populated {}", interface.name);
    Ok(records)
}
