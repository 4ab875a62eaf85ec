use std::path::Path;

use swc_common::{
    comments::{CommentKind, Comments, SingleThreadedComments},
    sync::Lrc,
    BytePos, FileName, SourceMap, SourceMapper, Span, Spanned,
};
use swc_ecma_ast::Module;
use swc_ecma_parser::{error::Error as SyntaxFailure, EsConfig, Parser, StringInput, Syntax, TsConfig};

use crate::error::{Error, Result};

/// A parsed source file together with everything needed to read text back out of it.
pub struct ParsedModule {
    pub module: Module,
    comments: SingleThreadedComments,
    cm: Lrc<SourceMap>,
}

impl ParsedModule {
    pub fn source_map(&self) -> &SourceMap {
        &self.cm
    }

    /// JSDoc blocks (`/** ... */`) leading the token at `pos`, as written in the source.
    pub fn jsdoc_at(&self, pos: BytePos) -> Vec<String> {
        self.comments
            .get_leading(pos)
            .unwrap_or_default()
            .into_iter()
            .filter(|c| c.kind == CommentKind::Block && c.text.starts_with('*'))
            .map(|c| format!("/*{}*/", c.text))
            .collect()
    }

    /// Raw source text covered by `span`.
    pub fn snippet(&self, span: Span) -> Option<String> {
        self.cm.span_to_snippet(span).ok()
    }
}

/// Picks the parser mode from the file extension.
pub fn syntax_for(filename: &str) -> Syntax {
    let is_dts = filename.ends_with(".d.ts");
    let is_ts = [".ts", ".tsx", ".mts", ".cts"]
        .iter()
        .any(|ext| filename.ends_with(ext));
    if is_ts {
        Syntax::Typescript(TsConfig {
            tsx: filename.ends_with(".tsx"),
            decorators: true,
            dts: is_dts,
            no_early_errors: true,
            ..Default::default()
        })
    } else {
        Syntax::Es(EsConfig {
            jsx: true,
            decorators: true,
            ..Default::default()
        })
    }
}

/// Parses one file's source as an ES module. Recoverable syntax errors are
/// treated as failures just like fatal ones.
pub fn parse_source(path: &Path, source: &str) -> Result<ParsedModule> {
    let cm: Lrc<SourceMap> = Default::default();
    let comments = SingleThreadedComments::default();
    let filename = path.to_string_lossy().to_string();
    let fm = cm.new_source_file(FileName::Real(path.to_path_buf()).into(), source.to_string().into());
    let input = StringInput::from(&*fm);

    let mut parser = Parser::new(syntax_for(&filename), input, Some(&comments));
    let module = parser
        .parse_module()
        .map_err(|e| syntax_error(&cm, path, e))?;
    if let Some(first) = parser.take_errors().into_iter().next() {
        return Err(syntax_error(&cm, path, first));
    }

    Ok(ParsedModule { module, comments, cm })
}

/// Reads and parses a file from disk.
pub fn parse_file(path: &Path) -> Result<ParsedModule> {
    let source = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_source(path, &source)
}

fn syntax_error(cm: &SourceMap, path: &Path, err: SyntaxFailure) -> Error {
    let loc = cm.lookup_char_pos(err.span().lo);
    Error::Parse {
        path: path.to_path_buf(),
        line: loc.line,
        column: loc.col.0 + 1,
        message: err.kind().msg().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_ecma_ast::ModuleItem;

    #[test]
    fn parses_typescript_module() {
        let parsed = parse_source(
            Path::new("commands.ts"),
            "export function login(user: string): void {}\n",
        )
        .unwrap();
        assert_eq!(parsed.module.body.len(), 1);
        assert!(matches!(parsed.module.body[0], ModuleItem::ModuleDecl(_)));
    }

    #[test]
    fn collects_only_jsdoc_blocks() {
        let src = "// plain\n/* block */\n/** documented */\nexport const x = () => 1;\n";
        let parsed = parse_source(Path::new("commands.ts"), src).unwrap();
        let lo = match &parsed.module.body[0] {
            ModuleItem::ModuleDecl(decl) => swc_common::Spanned::span(decl).lo,
            _ => unreachable!(),
        };
        assert_eq!(parsed.jsdoc_at(lo), vec!["/** documented */".to_string()]);
    }

    #[test]
    fn reports_location_of_syntax_errors() {
        let err = parse_source(Path::new("broken.ts"), "export const x = ;\n").err().unwrap();
        match err {
            Error::Parse { path, line, .. } => {
                assert_eq!(path, Path::new("broken.ts"));
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = parse_file(Path::new("/definitely/not/here.ts")).err().unwrap();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn picks_syntax_from_extension() {
        assert!(matches!(syntax_for("a.tsx"), Syntax::Typescript(TsConfig { tsx: true, .. })));
        assert!(matches!(syntax_for("a.d.ts"), Syntax::Typescript(TsConfig { dts: true, .. })));
        assert!(matches!(syntax_for("a.js"), Syntax::Es(_)));
    }
}
