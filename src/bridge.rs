use crate::analyzer::extract;
use crate::config;
use crate::emit::{render, EmitOptions};
use crate::pipeline;
use crate::synth::SkeletonOptions;
use napi::bindgen_prelude::*;
use napi_derive::napi;
use std::path::Path;

#[napi]
pub fn extract_command_types(file: String) -> Result<String> {
    let records = extract::extract_command_types(Path::new(&file))
        .map_err(|e| Error::from_reason(e.to_string()))?;
    serde_json::to_string(&records)
        .map_err(|e| Error::from_reason(format!("serialize records failed: {}", e)))
}

#[napi(object)]
pub struct GenerateOptions {
    pub module_name: Option<String>,
    pub interface_name: Option<String>,
    pub type_parameter: Option<String>,
    pub indent: Option<u32>,
}

/// Config writing to `output`, with unset options left at their defaults.
fn generator_config(output: &str, options: Option<GenerateOptions>) -> config::GeneratorConfig {
    let directory = Path::new(output).parent().unwrap_or(Path::new("."));
    let mut cfg = config::GeneratorConfig::new(directory).with_output(output);
    if let Some(o) = options {
        let defaults = SkeletonOptions::default();
        cfg.skeleton = SkeletonOptions {
            module_name: o.module_name.unwrap_or(defaults.module_name),
            interface_name: o.interface_name.unwrap_or(defaults.interface_name),
            type_parameter: o.type_parameter.unwrap_or(defaults.type_parameter),
        };
        if let Some(indent) = o.indent {
            cfg.emit = EmitOptions { indent: indent as usize };
        }
    }
    cfg
}

/// Returns the declaration text for `files` without writing it.
#[napi]
pub fn generate_declarations(output: String, files: Vec<String>, options: Option<GenerateOptions>) -> Result<String> {
    let cfg = generator_config(&output, options);
    let (skeleton, _) = pipeline::generate(&cfg, &files).map_err(|e| Error::from_reason(e.to_string()))?;
    Ok(render(&skeleton, &cfg.emit))
}

/// Generates and writes the declaration file, returning the command names.
#[napi]
pub fn write_declarations(output: String, files: Vec<String>, options: Option<GenerateOptions>) -> Result<Vec<String>> {
    let cfg = generator_config(&output, options);
    let (skeleton, records) = pipeline::generate(&cfg, &files).map_err(|e| Error::from_reason(e.to_string()))?;
    pipeline::persist(&skeleton, &cfg.emit).map_err(|e| Error::from_reason(e.to_string()))?;
    Ok(records.iter().map(|r| r.method_name().to_string()).collect())
}

#[napi]
pub fn detect_directory(root: String) -> Result<Option<String>> {
    config::detect_directory(Path::new(&root)).map_err(|e| Error::from_reason(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_options_keep_defaults() {
        let cfg = generator_config("/project/types/cypress.d.ts", None);
        assert_eq!(cfg.output, Path::new("/project/types/cypress.d.ts"));
        assert_eq!(cfg.directory, Path::new("/project/types"));
        assert_eq!(cfg.skeleton, SkeletonOptions::default());
        assert_eq!(cfg.emit, EmitOptions::default());
    }

    #[test]
    fn partial_options_override_only_what_is_set() {
        let options = GenerateOptions {
            module_name: None,
            interface_name: Some("Api".to_string()),
            type_parameter: None,
            indent: Some(2),
        };
        let cfg = generator_config("cypress.d.ts", Some(options));
        assert_eq!(cfg.skeleton.module_name, "Cypress");
        assert_eq!(cfg.skeleton.interface_name, "Api");
        assert_eq!(cfg.skeleton.type_parameter, "Subject");
        assert_eq!(cfg.emit.indent, 2);
        assert_eq!(cfg.directory, Path::new(""));
    }

    #[test]
    fn options_without_indent_keep_default_indent() {
        let options = GenerateOptions {
            module_name: Some("Commands".to_string()),
            interface_name: None,
            type_parameter: Some("T".to_string()),
            indent: None,
        };
        let cfg = generator_config("out/cypress.d.ts", Some(options));
        assert_eq!(cfg.skeleton.module_name, "Commands");
        assert_eq!(cfg.skeleton.type_parameter, "T");
        assert_eq!(cfg.emit.indent, 4);
    }
}
