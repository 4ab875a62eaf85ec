pub mod error;
pub mod parser;
pub mod bridge;
pub mod config;
pub mod emit;
pub mod pipeline;
pub mod synth;
pub mod analyzer {
    pub mod extract;
    pub mod metadata;
    pub mod types;
}

// Re-export selected API for consumers
pub use analyzer::extract::{extract_command_types, extract_from_source};
pub use analyzer::metadata::{Parameter, SignatureRecord};
pub use config::{collect_command_files, GeneratorConfig};
pub use emit::{render, EmitOptions};
pub use error::{Error, Result};
pub use pipeline::{run_pass, watch, CommandRuntime, NoopRuntime, PassReport};
pub use synth::{create_skeleton, populate, synthesize, ModuleSkeleton, SkeletonOptions};
