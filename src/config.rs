//! Locating the command sources and resolving generator settings.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;
use walkdir::WalkDir;

use crate::emit::EmitOptions;
use crate::error::{Error, Result};
use crate::synth::SkeletonOptions;

/// Environment variable naming the commands directory.
pub const COMMANDS_FOLDER_VAR: &str = "COMMANDS_FOLDER";
/// Project file that may also carry a `COMMANDS_FOLDER` key.
pub const CYPRESS_CONFIG_FILE: &str = "cypress.json";
pub const DEFAULT_DIRECTORY: &str = "cypress/support";
pub const DECLARATION_FILE: &str = "cypress.d.ts";

/// Commands directory from the environment or `cypress.json` in `root`.
pub fn detect_directory(root: &Path) -> Result<Option<String>> {
    detect_directory_with(root, std::env::var(COMMANDS_FOLDER_VAR).ok())
}

/// [`detect_directory`] with the environment value passed in.
pub fn detect_directory_with(root: &Path, env_value: Option<String>) -> Result<Option<String>> {
    if let Some(dir) = env_value.filter(|d| !d.is_empty()) {
        debug!(directory = %dir, "commands folder from {}", COMMANDS_FOLDER_VAR);
        return Ok(Some(dir));
    }
    let config_path = root.join(CYPRESS_CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(&config_path).map_err(|source| Error::Read {
        path: config_path.clone(),
        source,
    })?;
    let cfg: Value = serde_json::from_str(&raw).map_err(|source| Error::Config {
        path: config_path.clone(),
        source,
    })?;
    let dir = cfg
        .get(COMMANDS_FOLDER_VAR)
        .and_then(Value::as_str)
        .map(str::to_string);
    if let Some(dir) = &dir {
        debug!(directory = %dir, config = %config_path.display(), "commands folder from config");
    }
    Ok(dir)
}

/// Settings for one generator instance.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Directory scanned for command sources
    pub directory: PathBuf,
    /// Declaration file written by each pass
    pub output: PathBuf,
    pub skeleton: SkeletonOptions,
    pub emit: EmitOptions,
}

impl GeneratorConfig {
    /// Config for `directory`, writing `cypress.d.ts` inside it.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        Self {
            output: directory.join(DECLARATION_FILE),
            directory,
            skeleton: SkeletonOptions::default(),
            emit: EmitOptions::default(),
        }
    }

    /// Resolves the directory for a project rooted at `root`, falling back to
    /// `cypress/support`.
    pub fn discover(root: &Path) -> Result<Self> {
        let dir = detect_directory(root)?.unwrap_or_else(|| DEFAULT_DIRECTORY.to_string());
        Ok(Self::new(root.join(dir)))
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }
}

fn is_declaration_candidate(path: &Path) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    name.ends_with(".ts") && !name.ends_with(".d.ts")
}

/// Whether a changed file should trigger regeneration.
pub fn is_command_source(path: &Path, directory: &Path) -> bool {
    path.starts_with(directory)
        && !path.components().any(|c| c.as_os_str() == "node_modules")
        && is_declaration_candidate(path)
}

/// All `*.ts` files below `directory` except declaration files, sorted.
pub fn collect_command_files(directory: &Path) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(Error::discovery(format!(
            "commands directory {} does not exist",
            directory.display()
        )));
    }
    let mut out = Vec::new();
    for entry in WalkDir::new(directory)
        .into_iter()
        .filter_entry(|e| e.file_name() != "node_modules")
        .filter_map(|e| e.ok())
    {
        let p = entry.path();
        if p.is_file() && is_declaration_candidate(p) {
            out.push(p.to_path_buf());
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn environment_wins_over_config_file() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join(CYPRESS_CONFIG_FILE), r#"{"COMMANDS_FOLDER": "from/config"}"#).unwrap();
        let dir = detect_directory_with(root.path(), Some("from/env".into())).unwrap();
        assert_eq!(dir.as_deref(), Some("from/env"));
    }

    #[test]
    fn reads_commands_folder_from_cypress_json() {
        let root = TempDir::new().unwrap();
        fs::write(
            root.path().join(CYPRESS_CONFIG_FILE),
            r#"{"baseUrl": "http://localhost", "COMMANDS_FOLDER": "test/support"}"#,
        )
        .unwrap();
        let dir = detect_directory_with(root.path(), None).unwrap();
        assert_eq!(dir.as_deref(), Some("test/support"));
    }

    #[test]
    fn no_configuration_means_no_directory() {
        let root = TempDir::new().unwrap();
        assert_eq!(detect_directory_with(root.path(), None).unwrap(), None);
        fs::write(root.path().join(CYPRESS_CONFIG_FILE), "{}").unwrap();
        assert_eq!(detect_directory_with(root.path(), None).unwrap(), None);
    }

    #[test]
    fn malformed_cypress_json_is_reported() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join(CYPRESS_CONFIG_FILE), "{ not json").unwrap();
        let err = detect_directory_with(root.path(), None).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn output_defaults_to_declaration_in_directory() {
        let config = GeneratorConfig::new("/project/cypress/support");
        assert_eq!(config.output, Path::new("/project/cypress/support/cypress.d.ts"));
        let config = config.with_output("/tmp/out.d.ts");
        assert_eq!(config.output, Path::new("/tmp/out.d.ts"));
    }

    #[test]
    fn collects_sorted_sources_without_declarations() {
        let root = TempDir::new().unwrap();
        let dir = root.path();
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::create_dir_all(dir.join("node_modules/pkg")).unwrap();
        for f in ["b.ts", "a.ts", "nested/c.ts", "cypress.d.ts", "readme.md", "node_modules/pkg/x.ts"] {
            fs::write(dir.join(f), "").unwrap();
        }
        let files = collect_command_files(dir).unwrap();
        let rel: Vec<PathBuf> = files.iter().map(|f| f.strip_prefix(dir).unwrap().to_path_buf()).collect();
        assert_eq!(
            rel,
            vec![PathBuf::from("a.ts"), PathBuf::from("b.ts"), PathBuf::from("nested/c.ts")]
        );
    }

    #[test]
    fn missing_directory_is_a_discovery_error() {
        let err = collect_command_files(Path::new("/no/such/commands")).unwrap_err();
        assert!(matches!(err, Error::Discovery(_)));
    }

    #[test]
    fn recognises_command_sources() {
        let dir = Path::new("/p/cypress/support");
        assert!(is_command_source(Path::new("/p/cypress/support/commands.ts"), dir));
        assert!(!is_command_source(Path::new("/p/cypress/support/cypress.d.ts"), dir));
        assert!(!is_command_source(Path::new("/p/cypress/support/cypress.d.ts.tmp"), dir));
        assert!(!is_command_source(Path::new("/p/src/commands.ts"), dir));
    }
}
