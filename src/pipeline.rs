//! Generation passes: discover, synthesize, register, persist. Also the
//! watch loop that re-runs a pass whenever a command source changes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use notify::{Event, EventKind, RecursiveMode, Watcher};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analyzer::metadata::{distinct_files, SignatureRecord};
use crate::config::{collect_command_files, is_command_source, GeneratorConfig};
use crate::emit::{render, EmitOptions};
use crate::error::{Error, Result};
use crate::synth::{create_skeleton, populate, ModuleSkeleton};

/// Receives the commands of every successful pass, e.g. to register them
/// with a running test environment.
pub trait CommandRuntime {
    fn register(&mut self, records: &[SignatureRecord], files: &[&Path]) -> Result<()>;
}

/// Runtime that logs the commands and registers nothing.
#[derive(Debug, Default)]
pub struct NoopRuntime;

impl CommandRuntime for NoopRuntime {
    fn register(&mut self, records: &[SignatureRecord], files: &[&Path]) -> Result<()> {
        debug!(commands = records.len(), files = files.len(), "runtime registration skipped");
        Ok(())
    }
}

/// Outcome of one generation pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub output: PathBuf,
    pub files: Vec<PathBuf>,
    pub commands: Vec<String>,
}

/// Builds a populated skeleton for an explicit list of files.
pub fn generate<P: AsRef<Path>>(
    config: &GeneratorConfig,
    files: &[P],
) -> Result<(ModuleSkeleton, Vec<SignatureRecord>)> {
    let mut skeleton = create_skeleton(&config.output, &config.skeleton);
    let records = populate(skeleton.interface_mut(), files)?;
    Ok((skeleton, records))
}

/// Writes the rendered skeleton to its output path. The file is replaced in
/// one rename so readers never observe a partial declaration.
pub fn persist(skeleton: &ModuleSkeleton, options: &EmitOptions) -> Result<()> {
    let output = skeleton.output();
    let persist_err = |source: std::io::Error| Error::Persist {
        path: output.to_path_buf(),
        source,
    };
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(persist_err)?;
    }
    let mut tmp_name = output.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = output.with_file_name(tmp_name);
    fs::write(&tmp, render(skeleton, options)).map_err(persist_err)?;
    fs::rename(&tmp, output).map_err(|source| {
        fs::remove_file(&tmp).ok();
        persist_err(source)
    })?;
    Ok(())
}

/// One full pass over the configured directory.
pub fn run_pass(config: &GeneratorConfig, runtime: &mut dyn CommandRuntime) -> Result<PassReport> {
    let files = collect_command_files(&config.directory)?;
    let (skeleton, records) = generate(config, &files)?;
    runtime.register(&records, &distinct_files(&records))?;
    persist(&skeleton, &config.emit)?;

    info!(
        output = %config.output.display(),
        files = files.len(),
        commands = records.len(),
        "wrote command declarations"
    );
    Ok(PassReport {
        output: config.output.clone(),
        files,
        commands: records.iter().map(|r| r.method_name().to_string()).collect(),
    })
}

fn run_pass_logged(config: &GeneratorConfig, runtime: &mut dyn CommandRuntime) {
    if let Err(err) = run_pass(config, runtime) {
        warn!(error = %err, "problems encountered while updating the command declarations");
    }
}

/// Whether a watcher event should trigger a new pass.
pub fn event_touches_commands(event: &Event, directory: &Path) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|p| is_command_source(p, directory))
}

/// Runs a pass now and another one after every change to a command source.
/// Blocks until the watcher shuts down.
pub fn watch(config: &GeneratorConfig, runtime: &mut dyn CommandRuntime) -> Result<()> {
    let directory = config
        .directory
        .canonicalize()
        .unwrap_or_else(|_| config.directory.clone());
    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(tx)?;
    watcher.watch(&directory, RecursiveMode::Recursive)?;
    info!(directory = %directory.display(), "watching command sources");

    run_pass_logged(config, runtime);
    for event in rx {
        match event {
            Ok(event) if event_touches_commands(&event, &directory) => {
                debug!(paths = ?event.paths, "command source changed");
                run_pass_logged(config, runtime);
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "watcher error"),
        }
    }
    Ok(())
}
