//! Best-effort static typing for command signatures.
//!
//! Annotations are rendered back into canonical TypeScript text. Where an
//! annotation is missing, the type is inferred from the syntax of a single
//! file: literals, operators, local and module-level bindings, and the
//! `return` statements of a body. Anything that cannot be narrowed this way
//! degrades to `any`; inference never fails.

use std::collections::{HashMap, HashSet};

use swc_common::{SourceMap, SourceMapper, Span, Spanned};
use swc_ecma_ast::*;

use super::metadata::Parameter;

const ANY: &str = "any";
const MAX_DEPTH: usize = 32;

#[derive(Clone)]
enum Binding<'a> {
    Known(String),
    Annotated(&'a TsType),
    Init(&'a Expr),
    Function(&'a Function),
}

/// Identity of a function-like node, used to memoize its return type.
type FnKey = *const ();

/// Resolves parameter and return types within one parsed module.
pub struct TypeResolver<'a> {
    cm: &'a SourceMap,
    scopes: Vec<HashMap<String, Binding<'a>>>,
    depth: usize,
    /// Functions whose return type is currently being inferred
    resolving: HashSet<FnKey>,
    returns: HashMap<FnKey, String>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(cm: &'a SourceMap, module: &'a Module) -> Self {
        let mut globals = HashMap::new();
        for item in &module.body {
            match item {
                ModuleItem::Stmt(Stmt::Decl(decl)) => bind_decl(&mut globals, decl),
                ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => {
                    bind_decl(&mut globals, &export.decl)
                }
                ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultDecl(export)) => {
                    if let DefaultDecl::Fn(FnExpr { ident: Some(ident), function }) = &export.decl {
                        globals.insert(ident.sym.to_string(), Binding::Function(function));
                    }
                }
                _ => {}
            }
        }
        Self {
            cm,
            scopes: vec![globals],
            depth: 0,
            resolving: HashSet::new(),
            returns: HashMap::new(),
        }
    }

    /// Renders an explicit type annotation.
    pub fn render(&self, ty: &TsType) -> String {
        match ty {
            TsType::TsKeywordType(k) => keyword(k.kind).to_string(),
            TsType::TsThisType(_) => "this".to_string(),
            TsType::TsTypeRef(r) => {
                format!("{}{}", entity_name(&r.type_name), self.type_args(r.type_params.as_deref()))
            }
            TsType::TsArrayType(a) => array_of(&self.render(&a.elem_type)),
            TsType::TsTupleType(t) => {
                let elems: Vec<String> = t
                    .elem_types
                    .iter()
                    .map(|e| match &e.label {
                        Some(label) => format!("{}: {}", pattern_text(self.cm, label), self.render(&e.ty)),
                        None => self.render(&e.ty),
                    })
                    .collect();
                format!("[{}]", elems.join(", "))
            }
            TsType::TsOptionalType(o) => format!("{}?", self.render(&o.type_ann)),
            TsType::TsRestType(r) => format!("...{}", self.render(&r.type_ann)),
            TsType::TsUnionOrIntersectionType(TsUnionOrIntersectionType::TsUnionType(u)) => u
                .types
                .iter()
                .map(|t| self.render_operand(t))
                .collect::<Vec<_>>()
                .join(" | "),
            TsType::TsUnionOrIntersectionType(TsUnionOrIntersectionType::TsIntersectionType(i)) => i
                .types
                .iter()
                .map(|t| self.render_operand(t))
                .collect::<Vec<_>>()
                .join(" & "),
            TsType::TsParenthesizedType(p) => format!("({})", self.render(&p.type_ann)),
            TsType::TsTypeOperator(o) => {
                let op = match o.op {
                    TsTypeOperatorOp::KeyOf => "keyof",
                    TsTypeOperatorOp::Unique => "unique",
                    TsTypeOperatorOp::ReadOnly => "readonly",
                };
                format!("{op} {}", self.render(&o.type_ann))
            }
            TsType::TsIndexedAccessType(i) => {
                format!("{}[{}]", self.render(&i.obj_type), self.render(&i.index_type))
            }
            TsType::TsLitType(l) => match &l.lit {
                TsLit::Str(s) => quote(&s.value),
                TsLit::Number(n) => number_text(n.value),
                TsLit::Bool(b) => b.value.to_string(),
                _ => self.snippet_or_any(l.span),
            },
            TsType::TsFnOrConstructorType(TsFnOrConstructorType::TsFnType(f)) => format!(
                "{}({}) => {}",
                self.type_params_text(f.type_params.as_deref()),
                self.fn_params(&f.params),
                self.render(&f.type_ann.type_ann)
            ),
            TsType::TsFnOrConstructorType(TsFnOrConstructorType::TsConstructorType(c)) => format!(
                "{}new {}({}) => {}",
                if c.is_abstract { "abstract " } else { "" },
                self.type_params_text(c.type_params.as_deref()),
                self.fn_params(&c.params),
                self.render(&c.type_ann.type_ann)
            ),
            TsType::TsTypeQuery(q) => {
                let target = match &q.expr_name {
                    TsTypeQueryExpr::TsEntityName(name) => entity_name(name),
                    TsTypeQueryExpr::Import(import) => self.snippet_or_any(import.span),
                };
                format!("typeof {target}{}", self.type_args(q.type_args.as_deref()))
            }
            other => self.snippet_or_any(other.span()),
        }
    }

    /// Type parameters of a declaration, rendered one per entry.
    pub fn type_params(&self, decl: Option<&TsTypeParamDecl>) -> Vec<String> {
        decl.map(|d| {
            d.params
                .iter()
                .map(|p| {
                    let mut text = p.name.sym.to_string();
                    if let Some(c) = &p.constraint {
                        text.push_str(&format!(" extends {}", self.render(c)));
                    }
                    if let Some(d) = &p.default {
                        text.push_str(&format!(" = {}", self.render(d)));
                    }
                    text
                })
                .collect()
        })
        .unwrap_or_default()
    }

    /// Name and caller-visible type of one declared parameter.
    pub fn parameter(&mut self, pat: &'a Pat) -> Parameter {
        match pat {
            Pat::Ident(bi) => {
                let ty = bi
                    .type_ann
                    .as_ref()
                    .map(|t| self.render(&t.type_ann))
                    .unwrap_or_else(|| ANY.to_string());
                Parameter { optional: bi.id.optional, ..Parameter::new(bi.id.sym.to_string(), ty) }
            }
            Pat::Assign(assign) => {
                let mut param = self.parameter(&assign.left);
                if pat_annotation(&assign.left).is_none() {
                    param.ty = self.infer(&assign.right);
                }
                param.optional = true;
                param
            }
            Pat::Rest(rest) => {
                let ty = rest
                    .type_ann
                    .as_ref()
                    .or_else(|| pat_annotation(&rest.arg))
                    .map(|t| self.render(&t.type_ann))
                    .unwrap_or_else(|| "any[]".to_string());
                Parameter { rest: true, ..Parameter::new(pattern_text(self.cm, &rest.arg), ty) }
            }
            Pat::Object(obj) => {
                let ty = obj
                    .type_ann
                    .as_ref()
                    .map(|t| self.render(&t.type_ann))
                    .unwrap_or_else(|| ANY.to_string());
                Parameter { optional: obj.optional, ..Parameter::new(pattern_text(self.cm, pat), ty) }
            }
            Pat::Array(arr) => {
                let ty = arr
                    .type_ann
                    .as_ref()
                    .map(|t| self.render(&t.type_ann))
                    .unwrap_or_else(|| "any[]".to_string());
                Parameter { optional: arr.optional, ..Parameter::new(pattern_text(self.cm, pat), ty) }
            }
            _ => Parameter::new("arg", ANY),
        }
    }

    /// Return type of a function declaration or expression.
    pub fn function_return(&mut self, function: &'a Function) -> String {
        if let Some(ann) = &function.return_type {
            return self.render(&ann.type_ann);
        }
        let Some(body) = &function.body else {
            return ANY.to_string();
        };
        self.memoized(function as *const Function as FnKey, |this| {
            let params: Vec<&'a Pat> = function.params.iter().map(|p| &p.pat).collect();
            this.push_scope(&params, &body.stmts);
            let inner = this.block_return(body);
            this.scopes.pop();
            wrap_return(inner, function.is_async, function.is_generator)
        })
    }

    /// Return type of an arrow function.
    pub fn arrow_return(&mut self, arrow: &'a ArrowExpr) -> String {
        if let Some(ann) = &arrow.return_type {
            return self.render(&ann.type_ann);
        }
        self.memoized(arrow as *const ArrowExpr as FnKey, |this| {
            let params: Vec<&'a Pat> = arrow.params.iter().collect();
            let inner = match &*arrow.body {
                BlockStmtOrExpr::BlockStmt(body) => {
                    this.push_scope(&params, &body.stmts);
                    let t = this.block_return(body);
                    this.scopes.pop();
                    t
                }
                BlockStmtOrExpr::Expr(expr) => {
                    this.push_scope(&params, &[]);
                    let t = this.infer(expr);
                    this.scopes.pop();
                    t
                }
            };
            wrap_return(inner, arrow.is_async, arrow.is_generator)
        })
    }

    /// Infers a return type once per function. Re-entering a function that is
    /// still being resolved yields `any`, as circular inference does in tsc.
    fn memoized(&mut self, key: FnKey, resolve: impl FnOnce(&mut Self) -> String) -> String {
        if let Some(ty) = self.returns.get(&key) {
            return ty.clone();
        }
        if !self.resolving.insert(key) {
            return ANY.to_string();
        }
        let ty = resolve(self);
        self.resolving.remove(&key);
        self.returns.insert(key, ty.clone());
        ty
    }

    /// Widened type of an expression.
    pub fn infer(&mut self, expr: &'a Expr) -> String {
        if self.depth >= MAX_DEPTH {
            return ANY.to_string();
        }
        self.depth += 1;
        let ty = self.infer_inner(expr);
        self.depth -= 1;
        ty
    }

    fn infer_inner(&mut self, expr: &'a Expr) -> String {
        match expr {
            Expr::Lit(lit) => match lit {
                Lit::Str(_) => "string",
                Lit::Num(_) => "number",
                Lit::Bool(_) => "boolean",
                Lit::BigInt(_) => "bigint",
                Lit::Null(_) => "null",
                Lit::Regex(_) => "RegExp",
                _ => "string",
            }
            .to_string(),
            Expr::Tpl(_) => "string".to_string(),
            Expr::Paren(p) => self.infer(&p.expr),
            Expr::Unary(u) => match u.op {
                UnaryOp::Bang | UnaryOp::Delete => "boolean".to_string(),
                UnaryOp::TypeOf => "string".to_string(),
                UnaryOp::Void => "undefined".to_string(),
                UnaryOp::Minus | UnaryOp::Tilde if self.infer(&u.arg) == "bigint" => "bigint".to_string(),
                _ => "number".to_string(),
            },
            Expr::Update(_) => "number".to_string(),
            Expr::Bin(b) => self.binary(b),
            Expr::Cond(c) => {
                let types = vec![self.infer(&c.cons), self.infer(&c.alt)];
                union(types)
            }
            Expr::Seq(s) => match s.exprs.last() {
                Some(last) => self.infer(last),
                None => ANY.to_string(),
            },
            Expr::Assign(a) => self.infer(&a.right),
            Expr::Await(a) => {
                let inner = self.infer(&a.arg);
                awaited(&inner)
            }
            Expr::TsAs(e) => self.render(&e.type_ann),
            Expr::TsTypeAssertion(e) => self.render(&e.type_ann),
            Expr::TsSatisfies(e) => self.infer(&e.expr),
            Expr::TsConstAssertion(e) => self.infer(&e.expr),
            Expr::TsNonNull(e) => {
                let inner = self.infer(&e.expr);
                strip_nullish(&inner)
            }
            Expr::Array(a) => self.array_literal(a),
            Expr::Object(o) => self.object_literal(o),
            Expr::Arrow(arrow) => {
                let params: Vec<Parameter> = arrow.params.iter().map(|p| self.parameter(p)).collect();
                let ret = self.arrow_return(arrow);
                fn_type(&self.type_params(arrow.type_params.as_deref()), &params, &ret)
            }
            Expr::Fn(f) => self.function_type(&f.function),
            Expr::New(n) => match &*n.callee {
                Expr::Ident(i) => format!("{}{}", i.sym, self.type_args(n.type_args.as_deref())),
                _ => ANY.to_string(),
            },
            Expr::Call(call) => self.call(call),
            Expr::Ident(i) => self.ident(&i.sym),
            Expr::JSXElement(_) | Expr::JSXFragment(_) => "JSX.Element".to_string(),
            _ => ANY.to_string(),
        }
    }

    fn binary(&mut self, b: &'a BinExpr) -> String {
        use BinaryOp::*;
        match b.op {
            EqEq | NotEq | EqEqEq | NotEqEq | Lt | LtEq | Gt | GtEq | In | InstanceOf => {
                "boolean".to_string()
            }
            Add => {
                let (l, r) = (self.infer(&b.left), self.infer(&b.right));
                if l == "string" || r == "string" {
                    "string".to_string()
                } else if l == ANY || r == ANY {
                    ANY.to_string()
                } else if l == "bigint" && r == "bigint" {
                    "bigint".to_string()
                } else if l == "number" && r == "number" {
                    "number".to_string()
                } else {
                    ANY.to_string()
                }
            }
            LogicalAnd => self.infer(&b.right),
            LogicalOr => {
                let types = vec![self.infer(&b.left), self.infer(&b.right)];
                union(types)
            }
            NullishCoalescing => {
                let left = self.infer(&b.left);
                let types = vec![strip_nullish(&left), self.infer(&b.right)];
                union(types)
            }
            _ => {
                let (l, r) = (self.infer(&b.left), self.infer(&b.right));
                if l == "bigint" && r == "bigint" {
                    "bigint".to_string()
                } else {
                    "number".to_string()
                }
            }
        }
    }

    fn array_literal(&mut self, a: &'a ArrayLit) -> String {
        let mut elems = Vec::new();
        for elem in &a.elems {
            match elem {
                Some(ExprOrSpread { spread: Some(_), expr }) => {
                    let spread = self.infer(expr);
                    elems.push(spread.strip_suffix("[]").unwrap_or(ANY).to_string());
                }
                Some(ExprOrSpread { expr, .. }) => elems.push(self.infer(expr)),
                None => elems.push("undefined".to_string()),
            }
        }
        if elems.is_empty() {
            return "any[]".to_string();
        }
        array_of(&union(elems))
    }

    fn object_literal(&mut self, o: &'a ObjectLit) -> String {
        let mut members = Vec::new();
        for prop in &o.props {
            let PropOrSpread::Prop(prop) = prop else { continue };
            match &**prop {
                Prop::KeyValue(kv) => {
                    let ty = self.infer(&kv.value);
                    members.push(format!("{}: {};", prop_name(self.cm, &kv.key), ty));
                }
                Prop::Shorthand(ident) => {
                    let ty = self.ident(&ident.sym);
                    members.push(format!("{}: {};", ident.sym, ty));
                }
                Prop::Method(m) => {
                    let params: Vec<Parameter> =
                        m.function.params.iter().map(|p| self.parameter(&p.pat)).collect();
                    let ret = self.function_return(&m.function);
                    members.push(format!("{}({}): {};", prop_name(self.cm, &m.key), join_params(&params), ret));
                }
                Prop::Getter(g) => {
                    let ty = match &g.type_ann {
                        Some(ann) => self.render(&ann.type_ann),
                        None => ANY.to_string(),
                    };
                    members.push(format!("{}: {};", prop_name(self.cm, &g.key), ty));
                }
                _ => {}
            }
        }
        if members.is_empty() {
            "{}".to_string()
        } else {
            format!("{{ {} }}", members.join(" "))
        }
    }

    fn call(&mut self, call: &'a CallExpr) -> String {
        let Callee::Expr(callee) = &call.callee else {
            return ANY.to_string();
        };
        match &**callee {
            Expr::Ident(i) => match &*i.sym {
                "String" => "string".to_string(),
                "Number" | "parseInt" | "parseFloat" => "number".to_string(),
                "Boolean" | "isNaN" | "isFinite" => "boolean".to_string(),
                name => match self.lookup(name) {
                    Some(Binding::Function(f)) => self.function_return(f),
                    Some(Binding::Init(Expr::Arrow(arrow))) => self.arrow_return(arrow),
                    Some(Binding::Init(Expr::Fn(f))) => self.function_return(&f.function),
                    Some(Binding::Annotated(TsType::TsFnOrConstructorType(
                        TsFnOrConstructorType::TsFnType(f),
                    ))) => self.render(&f.type_ann.type_ann),
                    _ => ANY.to_string(),
                },
            },
            Expr::Member(m) => match (&*m.obj, &m.prop) {
                (Expr::Ident(obj), MemberProp::Ident(prop))
                    if &*obj.sym == "JSON" && &*prop.sym == "stringify" =>
                {
                    "string".to_string()
                }
                (_, MemberProp::Ident(prop)) if &*prop.sym == "toString" => "string".to_string(),
                _ => ANY.to_string(),
            },
            _ => ANY.to_string(),
        }
    }

    fn ident(&mut self, name: &str) -> String {
        match self.lookup(name) {
            Some(Binding::Known(ty)) => ty,
            Some(Binding::Annotated(ty)) => self.render(ty),
            Some(Binding::Init(init)) => self.infer(init),
            Some(Binding::Function(f)) => self.function_type(f),
            None => match name {
                "undefined" => "undefined".to_string(),
                "NaN" | "Infinity" => "number".to_string(),
                _ => ANY.to_string(),
            },
        }
    }

    fn function_type(&mut self, function: &'a Function) -> String {
        let params: Vec<Parameter> = function.params.iter().map(|p| self.parameter(&p.pat)).collect();
        let ret = self.function_return(function);
        fn_type(&self.type_params(function.type_params.as_deref()), &params, &ret)
    }

    fn lookup(&self, name: &str) -> Option<Binding<'a>> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name).cloned())
    }

    /// Opens a scope holding the parameters and the body's top-level declarations.
    fn push_scope(&mut self, params: &[&'a Pat], stmts: &'a [Stmt]) {
        let mut scope = HashMap::new();
        for stmt in stmts {
            if let Stmt::Decl(decl) = stmt {
                bind_decl(&mut scope, decl);
            }
        }
        for pat in params {
            let param = self.parameter(*pat);
            let ty = if param.rest || !param.optional {
                param.ty
            } else {
                union(vec![param.ty, "undefined".to_string()])
            };
            if let Some(name) = binding_name(pat) {
                scope.insert(name, Binding::Known(ty));
            }
        }
        self.scopes.push(scope);
    }

    fn block_return(&mut self, body: &'a BlockStmt) -> String {
        let mut returns = Vec::new();
        collect_returns(&body.stmts, &mut returns);
        let types: Vec<String> = returns
            .into_iter()
            .filter_map(|r| r.arg.as_deref())
            .map(|arg| self.infer(arg))
            .collect();
        if types.is_empty() {
            "void".to_string()
        } else {
            union(types)
        }
    }

    fn render_operand(&self, ty: &TsType) -> String {
        let text = self.render(ty);
        match ty {
            TsType::TsFnOrConstructorType(_) | TsType::TsConditionalType(_) => format!("({text})"),
            _ => text,
        }
    }

    fn type_args(&self, args: Option<&TsTypeParamInstantiation>) -> String {
        match args {
            Some(args) if !args.params.is_empty() => format!(
                "<{}>",
                args.params.iter().map(|p| self.render(p)).collect::<Vec<_>>().join(", ")
            ),
            _ => String::new(),
        }
    }

    fn type_params_text(&self, decl: Option<&TsTypeParamDecl>) -> String {
        let params = self.type_params(decl);
        if params.is_empty() {
            String::new()
        } else {
            format!("<{}>", params.join(", "))
        }
    }

    fn fn_params(&self, params: &[TsFnParam]) -> String {
        params
            .iter()
            .map(|p| {
                let (prefix, name, ann) = match p {
                    TsFnParam::Ident(bi) => (
                        "",
                        format!("{}{}", bi.id.sym, if bi.id.optional { "?" } else { "" }),
                        bi.type_ann.as_ref(),
                    ),
                    TsFnParam::Rest(r) => ("...", pattern_text(self.cm, &r.arg), r.type_ann.as_ref()),
                    TsFnParam::Array(a) => ("", pattern_text(self.cm, &Pat::Array(a.clone())), a.type_ann.as_ref()),
                    TsFnParam::Object(o) => ("", pattern_text(self.cm, &Pat::Object(o.clone())), o.type_ann.as_ref()),
                };
                let ty = ann.map(|t| self.render(&t.type_ann)).unwrap_or_else(|| ANY.to_string());
                format!("{prefix}{name}: {ty}")
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn snippet_or_any(&self, span: Span) -> String {
        self.cm
            .span_to_snippet(span)
            .ok()
            .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| ANY.to_string())
    }
}

fn bind_decl<'a>(scope: &mut HashMap<String, Binding<'a>>, decl: &'a Decl) {
    match decl {
        Decl::Fn(f) => {
            scope.insert(f.ident.sym.to_string(), Binding::Function(&f.function));
        }
        Decl::Var(var) => {
            for d in &var.decls {
                let Pat::Ident(bi) = &d.name else { continue };
                let binding = match (&bi.type_ann, &d.init) {
                    (Some(ann), _) => Binding::Annotated(&ann.type_ann),
                    (None, Some(init)) => Binding::Init(init),
                    (None, None) => continue,
                };
                scope.insert(bi.id.sym.to_string(), binding);
            }
        }
        _ => {}
    }
}

fn pat_annotation(pat: &Pat) -> Option<&Box<TsTypeAnn>> {
    match pat {
        Pat::Ident(bi) => bi.type_ann.as_ref(),
        Pat::Object(o) => o.type_ann.as_ref(),
        Pat::Array(a) => a.type_ann.as_ref(),
        Pat::Rest(r) => r.type_ann.as_ref(),
        _ => None,
    }
}

fn binding_name(pat: &Pat) -> Option<String> {
    match pat {
        Pat::Ident(bi) => Some(bi.id.sym.to_string()),
        Pat::Assign(a) => binding_name(&a.left),
        Pat::Rest(r) => binding_name(&r.arg),
        _ => None,
    }
}

/// Source-like text of a binding pattern, without its type annotation.
pub fn pattern_text(cm: &SourceMap, pat: &Pat) -> String {
    match pat {
        Pat::Ident(bi) => bi.id.sym.to_string(),
        Pat::Assign(a) => pattern_text(cm, &a.left),
        Pat::Rest(r) => format!("...{}", pattern_text(cm, &r.arg)),
        Pat::Array(arr) => {
            let elems: Vec<String> = arr
                .elems
                .iter()
                .map(|e| e.as_ref().map(|p| pattern_text(cm, p)).unwrap_or_default())
                .collect();
            format!("[{}]", elems.join(", "))
        }
        Pat::Object(obj) => {
            if obj.props.is_empty() {
                return "{}".to_string();
            }
            let props: Vec<String> = obj
                .props
                .iter()
                .map(|p| match p {
                    ObjectPatProp::KeyValue(kv) => {
                        format!("{}: {}", prop_name(cm, &kv.key), pattern_text(cm, &kv.value))
                    }
                    ObjectPatProp::Assign(a) => a.key.sym.to_string(),
                    ObjectPatProp::Rest(r) => format!("...{}", pattern_text(cm, &r.arg)),
                })
                .collect();
            format!("{{ {} }}", props.join(", "))
        }
        _ => "arg".to_string(),
    }
}

fn prop_name(cm: &SourceMap, key: &PropName) -> String {
    match key {
        PropName::Ident(i) => i.sym.to_string(),
        PropName::Str(s) => quote(&s.value),
        PropName::Num(n) => number_text(n.value),
        other => cm
            .span_to_snippet(other.span())
            .unwrap_or_else(|_| "[computed]".to_string()),
    }
}

fn collect_returns<'a>(stmts: &'a [Stmt], out: &mut Vec<&'a ReturnStmt>) {
    for stmt in stmts {
        collect_returns_in(stmt, out);
    }
}

fn collect_returns_in<'a>(stmt: &'a Stmt, out: &mut Vec<&'a ReturnStmt>) {
    match stmt {
        Stmt::Return(r) => out.push(r),
        Stmt::Block(b) => collect_returns(&b.stmts, out),
        Stmt::If(i) => {
            collect_returns_in(&i.cons, out);
            if let Some(alt) = &i.alt {
                collect_returns_in(alt, out);
            }
        }
        Stmt::For(s) => collect_returns_in(&s.body, out),
        Stmt::ForIn(s) => collect_returns_in(&s.body, out),
        Stmt::ForOf(s) => collect_returns_in(&s.body, out),
        Stmt::While(s) => collect_returns_in(&s.body, out),
        Stmt::DoWhile(s) => collect_returns_in(&s.body, out),
        Stmt::Labeled(s) => collect_returns_in(&s.body, out),
        Stmt::With(s) => collect_returns_in(&s.body, out),
        Stmt::Try(t) => {
            collect_returns(&t.block.stmts, out);
            if let Some(handler) = &t.handler {
                collect_returns(&handler.body.stmts, out);
            }
            if let Some(finalizer) = &t.finalizer {
                collect_returns(&finalizer.stmts, out);
            }
        }
        Stmt::Switch(s) => {
            for case in &s.cases {
                collect_returns(&case.cons, out);
            }
        }
        _ => {}
    }
}

fn keyword(kind: TsKeywordTypeKind) -> &'static str {
    match kind {
        TsKeywordTypeKind::TsAnyKeyword => "any",
        TsKeywordTypeKind::TsUnknownKeyword => "unknown",
        TsKeywordTypeKind::TsNumberKeyword => "number",
        TsKeywordTypeKind::TsObjectKeyword => "object",
        TsKeywordTypeKind::TsBooleanKeyword => "boolean",
        TsKeywordTypeKind::TsBigIntKeyword => "bigint",
        TsKeywordTypeKind::TsStringKeyword => "string",
        TsKeywordTypeKind::TsSymbolKeyword => "symbol",
        TsKeywordTypeKind::TsVoidKeyword => "void",
        TsKeywordTypeKind::TsUndefinedKeyword => "undefined",
        TsKeywordTypeKind::TsNullKeyword => "null",
        TsKeywordTypeKind::TsNeverKeyword => "never",
        TsKeywordTypeKind::TsIntrinsicKeyword => "intrinsic",
    }
}

fn entity_name(name: &TsEntityName) -> String {
    match name {
        TsEntityName::Ident(i) => i.sym.to_string(),
        TsEntityName::TsQualifiedName(q) => format!("{}.{}", entity_name(&q.left), q.right.sym),
    }
}

fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

fn number_text(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Renders parameters the way they appear inside a signature's parentheses.
pub fn join_params(params: &[Parameter]) -> String {
    params.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ")
}

fn fn_type(type_params: &[String], params: &[Parameter], ret: &str) -> String {
    let generics = if type_params.is_empty() {
        String::new()
    } else {
        format!("<{}>", type_params.join(", "))
    };
    format!("{generics}({}) => {ret}", join_params(params))
}

fn wrap_return(inner: String, is_async: bool, is_generator: bool) -> String {
    match (is_async, is_generator) {
        (true, true) => format!("AsyncGenerator<any, {inner}, any>"),
        (false, true) => format!("Generator<any, {inner}, any>"),
        (true, false) => format!("Promise<{}>", awaited(&inner)),
        (false, false) => inner,
    }
}

fn array_of(elem: &str) -> String {
    if split_union(elem).len() > 1 || elem.contains("=>") {
        format!("({elem})[]")
    } else {
        format!("{elem}[]")
    }
}

/// `T` for `Promise<T>`; other types are returned unchanged.
fn unwrap_promise(ty: &str) -> &str {
    ty.strip_prefix("Promise<")
        .and_then(|rest| rest.strip_suffix('>'))
        .filter(|inner| balanced(inner))
        .unwrap_or(ty)
}

/// Type produced by awaiting `ty`, unwrapping each union member.
fn awaited(ty: &str) -> String {
    union(split_union(ty).iter().map(|t| unwrap_promise(t).to_string()).collect())
}

/// Whether every bracket opened in `ty` is closed in order.
fn balanced(ty: &str) -> bool {
    let mut depth = 0i32;
    let mut prev = ' ';
    for ch in ty.chars() {
        match ch {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' if prev != '=' => depth -= 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return false;
        }
        prev = ch;
    }
    depth == 0
}

fn strip_nullish(ty: &str) -> String {
    let kept: Vec<String> = split_union(ty)
        .into_iter()
        .filter(|t| t != "null" && t != "undefined")
        .collect();
    if kept.is_empty() {
        "never".to_string()
    } else {
        kept.join(" | ")
    }
}

/// Splits a rendered type on its top-level `|` separators.
fn split_union(ty: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    let mut prev = ' ';
    for ch in ty.chars() {
        match ch {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' if prev != '=' => depth -= 1,
            ')' | ']' | '}' => depth -= 1,
            '|' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                prev = ch;
                continue;
            }
            _ => {}
        }
        current.push(ch);
        prev = ch;
    }
    parts.push(current.trim().to_string());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Union of `types`, flattened, deduplicated in first-seen order.
fn union(types: Vec<String>) -> String {
    let mut members: Vec<String> = Vec::new();
    for ty in types {
        for part in split_union(&ty) {
            if !members.contains(&part) {
                members.push(part);
            }
        }
    }
    if members.iter().any(|m| m == ANY) {
        return ANY.to_string();
    }
    if members.len() > 1 {
        members.retain(|m| m != "never");
    }
    match members.len() {
        0 => "never".to_string(),
        1 => members.remove(0),
        _ => members
            .into_iter()
            .map(|m| if m.contains("=>") { format!("({m})") } else { m })
            .collect::<Vec<_>>()
            .join(" | "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use std::path::Path;

    /// Return type of the first function-like declaration in `src`.
    fn return_of(src: &str) -> String {
        let parsed = parse_source(Path::new("t.ts"), src).unwrap();
        let mut resolver = TypeResolver::new(parsed.source_map(), &parsed.module);
        for item in &parsed.module.body {
            let decl = match item {
                ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(e)) => &e.decl,
                _ => continue,
            };
            match decl {
                Decl::Fn(f) => return resolver.function_return(&f.function),
                Decl::Var(v) => {
                    if let Some(Expr::Arrow(a)) = v.decls[0].init.as_deref() {
                        return resolver.arrow_return(a);
                    }
                }
                _ => {}
            }
        }
        panic!("no exported function in {src}");
    }

    fn params_of(src: &str) -> Vec<Parameter> {
        let parsed = parse_source(Path::new("t.ts"), src).unwrap();
        let mut resolver = TypeResolver::new(parsed.source_map(), &parsed.module);
        match &parsed.module.body[0] {
            ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ExportDecl { decl: Decl::Fn(f), .. })) => {
                f.function.params.iter().map(|p| resolver.parameter(&p.pat)).collect()
            }
            _ => panic!("expected an exported function"),
        }
    }

    #[test]
    fn infers_template_literal_as_string() {
        assert_eq!(return_of("export function f(foo: string) { return `x ${foo}`; }"), "string");
    }

    #[test]
    fn infers_arithmetic_as_number() {
        assert_eq!(return_of("export const m = (a: number, b: number) => a * b"), "number");
    }

    #[test]
    fn annotation_wins_over_inference() {
        assert_eq!(return_of("export function f(): Array<string> { return 1 as any; }"), "Array<string>");
    }

    #[test]
    fn missing_return_is_void() {
        assert_eq!(return_of("export function f() { console.log(1); }"), "void");
    }

    #[test]
    fn async_wraps_in_promise() {
        assert_eq!(return_of("export async function f() { return 1; }"), "Promise<number>");
        assert_eq!(return_of("export const f = async () => {}"), "Promise<void>");
    }

    #[test]
    fn unions_distinct_return_types() {
        let src = "export function f(x: boolean) { if (x) { return 'a'; } else { return 1; } }";
        assert_eq!(return_of(src), "string | number");
    }

    #[test]
    fn nested_function_returns_are_ignored() {
        let src = "export function f() { const g = () => { return 'x'; }; return 2; }";
        assert_eq!(return_of(src), "number");
    }

    #[test]
    fn resolves_locals_params_and_module_bindings() {
        let src = "const base = 10;\nexport function f(name: string) { const n = base + 1; return n; }";
        assert_eq!(return_of(src), "number");
        assert_eq!(return_of("export function f(name: string) { return name; }"), "string");
        let src = "function helper() { return true; }\nexport function f() { return helper(); }";
        assert_eq!(return_of(src), "boolean");
    }

    #[test]
    fn unresolvable_types_degrade_to_any() {
        assert_eq!(return_of("export function f() { return window.location; }"), "any");
    }

    #[test]
    fn self_recursion_terminates() {
        assert_eq!(return_of("export function f(): number { return f(); }"), "number");
        let src = "export function f() { return g(); }\nfunction g() { return f(); }";
        assert_eq!(return_of(src), "any");
    }

    #[test]
    fn repeated_recursive_returns_resolve_quickly() {
        let src = "export function walk(n: number) { if (n < 0) return walk(n + 1); if (n > 10) return walk(n - 1); return n; }";
        assert_eq!(return_of(src), "any");
        let src = "export const walk = (n: number) => { if (n < 0) { return walk(n + 1); } if (n > 1) { return walk(n - 1); } if (n > 2) { return walk(n - 2); } return n; }";
        assert_eq!(return_of(src), "any");
    }

    #[test]
    fn shared_helpers_are_inferred_once() {
        let src = "function leaf() { return 1; }\nexport function f(x: boolean) { if (x) return leaf(); return leaf(); }";
        assert_eq!(return_of(src), "number");
    }

    #[test]
    fn async_returns_flatten_awaited_members() {
        let src = "async function g() { return 1; }\nexport async function f(x: boolean) { if (x) return g(); return 'a'; }";
        assert_eq!(return_of(src), "Promise<number | string>");
        let src = "async function g() { return 1; }\nexport async function f() { return g(); }";
        assert_eq!(return_of(src), "Promise<number>");
    }

    #[test]
    fn awaiting_a_union_unwraps_each_promise() {
        assert_eq!(awaited("Promise<A> | Promise<B>"), "A | B");
        assert_eq!(awaited("Promise<A> | B"), "A | B");
        assert_eq!(unwrap_promise("Promise<A> | Promise<B>"), "Promise<A> | Promise<B>");
        assert_eq!(unwrap_promise("Promise<Map<K, V>>"), "Map<K, V>");
    }

    #[test]
    fn renders_compound_annotations() {
        let src = "export function f(a: string | number[], b: Record<string, () => void>, c: [number, string?], d: typeof window, e: keyof T, g: Cypress.Chainable<any>) {}";
        let params = params_of(src);
        let types: Vec<&str> = params.iter().map(|p| p.ty.as_str()).collect();
        assert_eq!(
            types,
            vec![
                "string | number[]",
                "Record<string, () => void>",
                "[number, string?]",
                "typeof window",
                "keyof T",
                "Cypress.Chainable<any>",
            ]
        );
    }

    #[test]
    fn describes_optional_default_rest_and_destructured_params() {
        let params = params_of("export function f(a?: string, b = 5, ...rest: string[]) {}");
        assert_eq!(params[0].name, "a");
        assert!(params[0].optional);
        assert_eq!(params[1].ty, "number");
        assert!(params[1].optional);
        assert!(params[2].rest);
        assert_eq!(params[2].ty, "string[]");

        let params = params_of("export function f({ a, b }: Opts, [x, y], z) {}");
        assert_eq!(params[0].name, "{ a, b }");
        assert_eq!(params[0].ty, "Opts");
        assert_eq!(params[1].name, "[x, y]");
        assert_eq!(params[2].ty, "any");
    }

    #[test]
    fn infers_literal_collections() {
        assert_eq!(return_of("export const f = () => [1, 2]"), "number[]");
        assert_eq!(return_of("export const f = () => [1, 'a']"), "(number | string)[]");
        assert_eq!(return_of("export const f = () => ({ a: 1, b: 'x' })"), "{ a: number; b: string; }");
    }

    #[test]
    fn split_union_respects_nesting() {
        assert_eq!(split_union("Promise<a | b> | c"), vec!["Promise<a | b>", "c"]);
        assert_eq!(split_union("(x: a | b) => void"), vec!["(x: a | b) => void"]);
    }
}
