use std::collections::{HashMap, HashSet};
use std::path::Path;

use swc_common::BytePos;
use swc_ecma_ast::*;
use swc_ecma_visit::{Visit, VisitWith};
use tracing::debug;

use super::metadata::{join_docs, SignatureRecord, UNNAMED_COMMAND};
use super::types::TypeResolver;
use crate::error::Result;
use crate::parser::{parse_file, parse_source, ParsedModule};

/// Declaration shapes that surface as commands.
enum CommandDecl<'a> {
    /// `export function name()`, `export default function ()`
    NamedFunction {
        name: Option<&'a Ident>,
        function: &'a Function,
        doc_pos: BytePos,
    },
    /// `export const name = () => ...`, or a local arrow exported later
    ArrowBoundVar {
        /// Name the command is exported under
        name: String,
        arrow: &'a ArrowExpr,
        doc_pos: BytePos,
    },
}

impl<'a> CommandDecl<'a> {
    /// Functions come before variables in a file's records.
    fn rank(&self) -> u8 {
        match self {
            CommandDecl::NamedFunction { .. } => 0,
            CommandDecl::ArrowBoundVar { .. } => 1,
        }
    }

    fn to_record(self, file: &Path, parsed: &ParsedModule, types: &mut TypeResolver<'a>) -> SignatureRecord {
        match self {
            CommandDecl::NamedFunction { name, function, doc_pos } => SignatureRecord {
                file: file.to_path_buf(),
                name: name
                    .map(|i| i.sym.to_string())
                    .unwrap_or_else(|| UNNAMED_COMMAND.to_string()),
                docs: join_docs(&parsed.jsdoc_at(doc_pos)),
                parameters: function.params.iter().map(|p| types.parameter(&p.pat)).collect(),
                return_type: types.function_return(function),
                type_parameters: types.type_params(function.type_params.as_deref()),
            },
            CommandDecl::ArrowBoundVar { name, arrow, doc_pos } => SignatureRecord {
                file: file.to_path_buf(),
                name,
                docs: join_docs(&parsed.jsdoc_at(doc_pos)),
                parameters: arrow.params.iter().map(|p| types.parameter(p)).collect(),
                return_type: types.arrow_return(arrow),
                type_parameters: types.type_params(arrow.type_params.as_deref()),
            },
        }
    }
}

/// Local bindings exported through `export { local as name }` or
/// `export default local`, mapped to the names they are exported under.
#[derive(Default)]
struct LocalExports {
    names: HashMap<String, Vec<String>>,
}

impl LocalExports {
    fn add(&mut self, local: String, exported: String) {
        let names = self.names.entry(local).or_default();
        if !names.contains(&exported) {
            names.push(exported);
        }
    }

    fn exported_as(&self, local: &str) -> &[String] {
        self.names.get(local).map(Vec::as_slice).unwrap_or_default()
    }
}

fn export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::Ident(ident) => ident.sym.to_string(),
        ModuleExportName::Str(s) => s.value.to_string(),
    }
}

impl Visit for LocalExports {
    fn visit_named_export(&mut self, export: &NamedExport) {
        // re-exports from other modules are resolved elsewhere, if at all
        if export.src.is_some() || export.type_only {
            return;
        }
        for spec in &export.specifiers {
            if let ExportSpecifier::Named(named) = spec {
                if let (false, ModuleExportName::Ident(orig)) = (named.is_type_only, &named.orig) {
                    let exported = named.exported.as_ref().map(export_name);
                    let local = orig.sym.to_string();
                    self.add(local.clone(), exported.unwrap_or(local));
                }
            }
        }
    }

    fn visit_export_default_expr(&mut self, export: &ExportDefaultExpr) {
        if let Expr::Ident(ident) = &*export.expr {
            self.add(ident.sym.to_string(), ident.sym.to_string());
        }
    }
}

/// Single classification step from a top-level item to its command
/// declarations. A local arrow exported under several names yields one
/// declaration per name.
fn classify<'a>(item: &'a ModuleItem, local_exports: &LocalExports) -> Vec<CommandDecl<'a>> {
    match item {
        ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => match &export.decl {
            Decl::Fn(f) => vec![CommandDecl::NamedFunction {
                name: Some(&f.ident),
                function: &f.function,
                doc_pos: export.span.lo,
            }],
            Decl::Var(var) => first_arrow(var)
                .map(|(bi, arrow)| CommandDecl::ArrowBoundVar {
                    name: bi.id.sym.to_string(),
                    arrow,
                    doc_pos: export.span.lo,
                })
                .into_iter()
                .collect(),
            _ => Vec::new(),
        },
        ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(export)) => match &export.decl {
            DefaultDecl::Fn(f) => vec![CommandDecl::NamedFunction {
                name: f.ident.as_ref(),
                function: &f.function,
                doc_pos: export.span.lo,
            }],
            _ => Vec::new(),
        },
        ModuleItem::Stmt(Stmt::Decl(Decl::Var(var))) => match first_arrow(var) {
            Some((bi, arrow)) => local_exports
                .exported_as(&bi.id.sym)
                .iter()
                .map(|name| CommandDecl::ArrowBoundVar {
                    name: name.clone(),
                    arrow,
                    doc_pos: var.span.lo,
                })
                .collect(),
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Only the statement's first declarator is inspected.
fn first_arrow(var: &VarDecl) -> Option<(&BindingIdent, &ArrowExpr)> {
    let first = var.decls.first()?;
    let Pat::Ident(bi) = &first.name else {
        return None;
    };
    match first.init.as_deref()? {
        Expr::Arrow(arrow) => Some((bi, arrow)),
        _ => None,
    }
}

/// Drops body-less overload signatures of functions implemented in the same file.
fn drop_overload_signatures(decls: &mut Vec<CommandDecl<'_>>) {
    let implemented: HashSet<String> = decls
        .iter()
        .filter_map(|d| match d {
            CommandDecl::NamedFunction { name: Some(n), function, .. } if function.body.is_some() => {
                Some(n.sym.to_string())
            }
            _ => None,
        })
        .collect();
    decls.retain(|d| match d {
        CommandDecl::NamedFunction { name: Some(n), function, .. } if function.body.is_none() => {
            !implemented.contains(&*n.sym)
        }
        _ => true,
    });
}

fn records_from(path: &Path, parsed: &ParsedModule) -> Vec<SignatureRecord> {
    let mut locals = LocalExports::default();
    parsed.module.visit_with(&mut locals);

    let mut decls: Vec<CommandDecl> = parsed
        .module
        .body
        .iter()
        .flat_map(|item| classify(item, &locals))
        .collect();
    drop_overload_signatures(&mut decls);
    decls.sort_by_key(CommandDecl::rank);

    let mut types = TypeResolver::new(parsed.source_map(), &parsed.module);
    decls
        .into_iter()
        .map(|d| d.to_record(path, parsed, &mut types))
        .collect()
}

/// Extracts every exported command of the file at `path`.
///
/// Function declarations come first, then arrow-bound variables, each in
/// source order. A file without commands yields an empty list; a file that
/// cannot be read or parsed is an error.
pub fn extract_command_types(path: &Path) -> Result<Vec<SignatureRecord>> {
    let parsed = parse_file(path)?;
    let records = records_from(path, &parsed);
    debug!(file = %path.display(), commands = records.len(), "extracted command signatures");
    Ok(records)
}

/// Same as [`extract_command_types`] for source already in memory.
pub fn extract_from_source(path: &Path, source: &str) -> Result<Vec<SignatureRecord>> {
    let parsed = parse_source(path, source)?;
    Ok(records_from(path, &parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    fn extract(src: &str) -> Vec<SignatureRecord> {
        extract_from_source(Path::new("/support/commands.ts"), src).unwrap()
    }

    fn names(records: &[SignatureRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn extracts_named_function() {
        let records = extract("/** a standard foobar function */\nexport function foobar(foo: string) {\n  return `foo may be ${foo}`;\n}\n");
        assert_eq!(records.len(), 1);
        let foobar = &records[0];
        assert_eq!(foobar.name, "foobar");
        assert_eq!(foobar.file, Path::new("/support/commands.ts"));
        assert_eq!(foobar.docs, "/** a standard foobar function */\n");
        assert_eq!(foobar.parameters.len(), 1);
        assert_eq!(foobar.parameters[0].name, "foo");
        assert_eq!(foobar.parameters[0].ty, "string");
        assert_eq!(foobar.return_type, "string");
    }

    #[test]
    fn extracts_arrow_bound_variable_with_statement_docs() {
        let records = extract("/**\n * Anonymous functions work too\n */\nexport const anonMultiplication = (a: number, b: number) => a*b\n");
        assert_eq!(records.len(), 1);
        let anon = &records[0];
        assert_eq!(anon.name, "anonMultiplication");
        assert!(anon.docs.starts_with("/**"));
        assert!(anon.docs.ends_with("*/\n"));
        let types: Vec<&str> = anon.parameters.iter().map(|p| p.ty.as_str()).collect();
        assert_eq!(types, vec!["number", "number"]);
        assert_eq!(anon.return_type, "number");
    }

    #[test]
    fn functions_precede_variables() {
        let records = extract(
            "export const first = () => 1;\nexport function second() {}\nexport const third = (x: string) => x;\nexport function fourth() {}\n",
        );
        assert_eq!(names(&records), vec!["second", "fourth", "first", "third"]);
    }

    #[test]
    fn ignores_non_commands() {
        let records = extract(
            "function hidden() {}\nconst local = () => 1;\nexport const value = 42;\nexport const wrapped = memo(() => 1);\nexport class Page {}\nexport interface Opts { a: string }\n",
        );
        assert!(records.is_empty());
    }

    #[test]
    fn empty_file_has_no_commands() {
        assert!(extract("").is_empty());
    }

    #[test]
    fn only_first_declarator_is_inspected() {
        let records = extract("export const a = () => 1, b = () => 'x';\n");
        assert_eq!(names(&records), vec!["a"]);
        let records = extract("export const n = 1, f = () => 'x';\n");
        assert!(records.is_empty());
    }

    #[test]
    fn undocumented_commands_have_empty_docs() {
        let records = extract("// not jsdoc\nexport function quiet() {}\n");
        assert_eq!(records[0].docs, "");
    }

    #[test]
    fn multiple_doc_blocks_are_concatenated() {
        let records = extract("/** one */\n/** two */\nexport function f() {}\n");
        assert_eq!(records[0].docs, "/** one */\n/** two */\n");
    }

    #[test]
    fn anonymous_default_function_is_unknown() {
        let records = extract("export default function (sel: string) { return 1; }\n");
        assert_eq!(names(&records), vec!["unknown"]);
        assert_eq!(records[0].return_type, "number");
    }

    #[test]
    fn locally_exported_arrows_count() {
        let records = extract(
            "/** later */\nconst visit = (url: string) => url;\nconst hidden = () => 1;\nexport { visit };\n",
        );
        assert_eq!(names(&records), vec!["visit"]);
        assert_eq!(records[0].docs, "/** later */\n");
    }

    #[test]
    fn aliased_exports_use_the_exported_name() {
        let records = extract(
            "/** go somewhere */\nconst visit = (url: string) => url;\nexport { visit as goTo };\n",
        );
        assert_eq!(names(&records), vec!["goTo"]);
        assert_eq!(records[0].docs, "/** go somewhere */\n");
        assert_eq!(records[0].parameters[0].name, "url");

        let records = extract("const visit = (url: string) => url;\nexport { visit, visit as goTo };\n");
        assert_eq!(names(&records), vec!["visit", "goTo"]);
    }

    #[test]
    fn overload_signatures_collapse_into_implementation() {
        let records = extract(
            "export function pick(a: string): string;\nexport function pick(a: number): number;\nexport function pick(a: any): any { return a; }\nexport declare function ambient(x: number): void;\n",
        );
        assert_eq!(names(&records), vec!["pick", "ambient"]);
        assert_eq!(records[0].return_type, "any");
    }

    #[test]
    fn generic_commands_keep_type_parameters() {
        let records = extract("export function first<T extends object>(items: T[]): T { return items[0]; }\n");
        assert_eq!(records[0].type_parameters, vec!["T extends object".to_string()]);
        assert_eq!(records[0].parameters[0].ty, "T[]");
        assert_eq!(records[0].return_type, "T");
    }

    #[test]
    fn async_commands_return_promises() {
        let records = extract("export async function load(id: number) { return { id }; }\n");
        assert_eq!(records[0].return_type, "Promise<{ id: number; }>");
    }

    #[test]
    fn missing_file_fails() {
        let err = extract_command_types(Path::new("/nope/commands.ts")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
        assert_eq!(err.path(), Some(Path::new("/nope/commands.ts")));
    }

    #[test]
    fn invalid_syntax_fails() {
        let err = extract_from_source(Path::new("bad.ts"), "export function (((").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
