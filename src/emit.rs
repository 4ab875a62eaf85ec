use serde::{Deserialize, Serialize};

use crate::analyzer::types::join_params;
use crate::synth::{MethodSignature, ModuleSkeleton};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitOptions {
    /// Spaces per indentation level
    pub indent: usize,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self { indent: 4 }
    }
}

/// Serializes a skeleton into declaration file text.
pub fn render(skeleton: &ModuleSkeleton, options: &EmitOptions) -> String {
    let module = &skeleton.module;
    let interface = &module.interface;
    let outer = " ".repeat(options.indent);
    let inner = " ".repeat(options.indent * 2);

    let mut out = String::new();
    if module.has_declare_keyword {
        out.push_str("declare ");
    }
    out.push_str(&format!("namespace {} {{\n", module.name));
    out.push_str(&format!(
        "{outer}interface {}<{}> {{\n",
        interface.name, interface.type_parameter
    ));
    for method in interface.methods() {
        push_docs(&mut out, &method.leading_docs, &inner);
        out.push_str(&inner);
        out.push_str(&signature(method));
        out.push('\n');
    }
    out.push_str(&format!("{outer}}}\n}}\n"));
    out
}

/// `name<T>(a: A, b: B): R;`
pub fn signature(method: &MethodSignature) -> String {
    let generics = if method.type_parameters.is_empty() {
        String::new()
    } else {
        format!("<{}>", method.type_parameters.join(", "))
    };
    format!(
        "{}{generics}({}): {};",
        method.name,
        join_params(&method.parameters),
        method.return_type
    )
}

/// Writes doc comment lines at the member's indentation.
fn push_docs(out: &mut String, docs: &str, indent: &str) {
    for line in docs.lines() {
        let line = line.trim();
        if line.is_empty() {
            out.push('\n');
            continue;
        }
        out.push_str(indent);
        if line.starts_with('*') {
            out.push(' ');
        }
        out.push_str(line);
        out.push('\n');
    }
}
