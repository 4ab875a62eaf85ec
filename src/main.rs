use clap::{Args, Parser, Subcommand};
use command_types_core::analyzer::extract::extract_command_types;
use command_types_core::config::GeneratorConfig;
use command_types_core::emit::render;
use command_types_core::error::{Error, Result};
use command_types_core::pipeline::{self, NoopRuntime};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Generate Chainable declarations for custom commands", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one generation pass and write the declaration file
    Generate(GenerateArgs),
    /// Print the command signatures of the given files as JSON
    Extract(ExtractArgs),
    /// Regenerate the declaration file whenever a command source changes
    Watch(GenerateArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Project root used for discovery (defaults to the working directory)
    #[arg(long)]
    root: Option<PathBuf>,
    /// Commands directory, relative to the root; overrides cypress.json
    #[arg(long, env = "COMMANDS_FOLDER")]
    dir: Option<PathBuf>,
    /// Declaration file to write (defaults to <dir>/cypress.d.ts)
    #[arg(long, short)]
    output: Option<PathBuf>,
    #[arg(long, default_value = "Cypress")]
    module_name: String,
    #[arg(long, default_value = "Chainable")]
    interface_name: String,
    #[arg(long, default_value = "Subject")]
    type_parameter: String,
    /// Print the declaration instead of writing it
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    #[arg(required = true)]
    files: Vec<PathBuf>,
    #[arg(long)]
    pretty: bool,
}

impl GenerateArgs {
    fn config(&self) -> Result<GeneratorConfig> {
        let root = match &self.root {
            Some(root) => root.clone(),
            None => std::env::current_dir().map_err(|source| Error::Read {
                path: PathBuf::from("."),
                source,
            })?,
        };
        let mut config = match &self.dir {
            Some(dir) => GeneratorConfig::new(root.join(dir)),
            None => GeneratorConfig::discover(&root)?,
        };
        if let Some(output) = &self.output {
            config = config.with_output(root.join(output));
        }
        config.skeleton.module_name = self.module_name.clone();
        config.skeleton.interface_name = self.interface_name.clone();
        config.skeleton.type_parameter = self.type_parameter.clone();
        Ok(config)
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Generate(args) => {
            let config = args.config()?;
            if args.dry_run {
                let files = command_types_core::config::collect_command_files(&config.directory)?;
                let (skeleton, _) = pipeline::generate(&config, &files)?;
                print!("{}", render(&skeleton, &config.emit));
            } else {
                let report = pipeline::run_pass(&config, &mut NoopRuntime)?;
                println!(
                    "wrote {} commands from {} files to {}",
                    report.commands.len(),
                    report.files.len(),
                    report.output.display()
                );
            }
        }
        Commands::Extract(args) => {
            let mut records = Vec::new();
            for file in &args.files {
                records.extend(extract_command_types(file)?);
            }
            let json = if args.pretty {
                serde_json::to_string_pretty(&records)
            } else {
                serde_json::to_string(&records)
            }
            .map_err(Error::Serialize)?;
            println!("{json}");
        }
        Commands::Watch(args) => {
            let config = args.config()?;
            pipeline::watch(&config, &mut NoopRuntime)?;
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("command-types: {err}");
        std::process::exit(1);
    }
}
