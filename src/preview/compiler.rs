//! Compilation boundary for preview modules.
//!
//! `UnitCompiler` turns one rewritten source file into an invocable unit. The
//! built-in `ComponentCompiler` does not execute script: it parses the module
//! with tree-sitter's TSX (or TypeScript) grammar, rejects sources with syntax
//! errors, and records what the module imports, declares and exports so
//! invoking it can wire components together through the loader.

use crate::preview::errors::LoaderError;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

/// A component value ready to be mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub module: String,
    /// Imported components this one renders.
    pub children: Vec<Component>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportValue {
    Component(Component),
    Function(String),
    Value(String),
    /// The whole exports object, used when a module has no default export.
    Namespace(Box<Exports>),
}

impl ExportValue {
    pub fn is_function(&self) -> bool {
        matches!(self, ExportValue::Component(_) | ExportValue::Function(_))
    }

    pub fn as_component(&self) -> Option<&Component> {
        match self {
            ExportValue::Component(component) => Some(component),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ExportValue::Component(c) => format!("component {}", c.name),
            ExportValue::Function(name) => format!("function {}", name),
            ExportValue::Value(text) => format!("value `{}`", text),
            ExportValue::Namespace(exports) => {
                let names: Vec<&str> = exports.named.keys().map(String::as_str).collect();
                format!("exports {{ {} }}", names.join(", "))
            }
        }
    }
}

/// Exports receptacle handed to a unit on invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exports {
    pub default: Option<ExportValue>,
    pub named: BTreeMap<String, ExportValue>,
}

impl Exports {
    /// The default export, or the whole object when there is none.
    pub fn into_value(mut self) -> ExportValue {
        match self.default.take() {
            Some(value) => value,
            None => ExportValue::Namespace(Box::new(self)),
        }
    }
}

/// Resolver passed to units: loads another module by its resolved path.
pub type Require<'a> = dyn FnMut(&str) -> Result<ExportValue, LoaderError> + 'a;

pub trait CompiledUnit {
    fn invoke(&self, require: &mut Require<'_>, exports: &mut Exports) -> Result<(), LoaderError>;
}

pub trait UnitCompiler {
    fn compile(&self, filename: &str, source: &str) -> Result<Box<dyn CompiledUnit>, LoaderError>;
}

/// A tree-sitter language with the queries the compiler runs against it.
struct Grammar {
    language: Language,
    require_query: Query,
    /// Absent for plain TypeScript, which has no JSX.
    jsx_query: Option<Query>,
}

impl Grammar {
    fn new(language: Language, jsx: bool) -> Result<Self, String> {
        // Bindings produced by `rewrite_imports`.
        let require_query = Query::new(
            &language,
            r#"
            (lexical_declaration
                (variable_declarator
                    name: (identifier) @local
                    value: (call_expression
                        function: (identifier) @callee
                        arguments: (arguments (string (string_fragment) @path)))))
            "#,
        )
        .map_err(|e| format!("Failed to create require query: {}", e))?;

        let jsx_query = if jsx {
            let query = Query::new(
                &language,
                r#"
                (jsx_opening_element name: (identifier) @tag)
                (jsx_self_closing_element name: (identifier) @tag)
                "#,
            )
            .map_err(|e| format!("Failed to create JSX query: {}", e))?;
            Some(query)
        } else {
            None
        };

        Ok(Self {
            language,
            require_query,
            jsx_query,
        })
    }
}

static TSX: Lazy<Result<Grammar, String>> =
    Lazy::new(|| Grammar::new(tree_sitter_typescript::LANGUAGE_TSX.into(), true));

static TYPESCRIPT: Lazy<Result<Grammar, String>> =
    Lazy::new(|| Grammar::new(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(), false));

/// `.ts` modules may use `<T>expr` casts, which the TSX grammar reads as JSX.
fn grammar_for(filename: &str) -> &'static Result<Grammar, String> {
    if [".ts", ".mts", ".cts"].iter().any(|ext| filename.ends_with(ext)) {
        &*TYPESCRIPT
    } else {
        &*TSX
    }
}

/// Built-in compiler for React-style component modules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentCompiler;

impl UnitCompiler for ComponentCompiler {
    fn compile(&self, filename: &str, source: &str) -> Result<Box<dyn CompiledUnit>, LoaderError> {
        let compile_error = |line: usize, message: String| LoaderError::Compile {
            filename: filename.to_string(),
            line,
            message,
        };

        let grammar = grammar_for(filename)
            .as_ref()
            .map_err(|e| compile_error(1, e.clone()))?;
        let mut parser = Parser::new();
        parser
            .set_language(&grammar.language)
            .map_err(|e| compile_error(1, format!("Failed to set language: {}", e)))?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| compile_error(1, "Failed to parse source".to_string()))?;

        let root = tree.root_node();
        let bytes = source.as_bytes();
        if let Some(node) = first_syntax_error(root) {
            return Err(compile_error(
                node.start_position().row + 1,
                describe_syntax_error(node, bytes),
            ));
        }

        let unit = ComponentUnit::analyze(filename, grammar, root, bytes);
        log::debug!(
            "compiled {} ({} import(s), {} named export(s))",
            filename,
            unit.imports.len(),
            unit.named_exports.len()
        );
        Ok(Box::new(unit))
    }
}

/// First `ERROR` or `MISSING` node in document order.
fn first_syntax_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_syntax_error)
}

fn describe_syntax_error(node: Node<'_>, source: &[u8]) -> String {
    if node.is_missing() {
        return format!("missing `{}`", node.kind());
    }
    let text = node_text(node, source);
    let snippet: String = text.lines().next().unwrap_or("").trim().chars().take(24).collect();
    if snippet.is_empty() {
        "syntax error".to_string()
    } else {
        format!("unexpected `{}`", snippet)
    }
}

fn node_text(node: Node<'_>, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or("").to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Declared {
    Callable,
    Value(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DefaultExport {
    Callable(String),
    Identifier(String),
    Expression(String),
}

#[derive(Debug, Clone)]
struct ComponentUnit {
    filename: String,
    imports: Vec<(String, String)>,
    declarations: HashMap<String, Declared>,
    default_export: Option<DefaultExport>,
    /// `(exported name, local name)`
    named_exports: Vec<(String, String)>,
    jsx_tags: Vec<String>,
    top_level_throw: Option<String>,
}

impl ComponentUnit {
    fn analyze(filename: &str, grammar: &Grammar, root: Node<'_>, source: &[u8]) -> Self {
        let mut unit = Self {
            filename: filename.to_string(),
            imports: Vec::new(),
            declarations: HashMap::new(),
            default_export: None,
            named_exports: Vec::new(),
            jsx_tags: Vec::new(),
            top_level_throw: None,
        };

        unit.extract_imports(grammar, root, source);
        unit.extract_jsx_tags(grammar, root, source);

        let mut cursor = root.walk();
        for statement in root.named_children(&mut cursor) {
            match statement.kind() {
                "export_statement" => unit.record_export(statement, source),
                "throw_statement" => {
                    if unit.top_level_throw.is_none() {
                        unit.top_level_throw = Some(thrown_message(statement, source));
                    }
                }
                _ => {
                    unit.declare(statement, source);
                }
            }
        }

        unit
    }

    fn extract_imports(&mut self, grammar: &Grammar, root: Node<'_>, source: &[u8]) {
        let mut cursor = QueryCursor::new();
        let matches = cursor.matches(&grammar.require_query, root, source);

        for m in matches {
            let mut local = None;
            let mut callee = None;
            let mut path = None;

            for capture in m.captures {
                let text = node_text(capture.node, source);
                match grammar.require_query.capture_names()[capture.index as usize] {
                    "local" => local = Some(text),
                    "callee" => callee = Some(text),
                    "path" => path = Some(text),
                    _ => {}
                }
            }

            if let (Some(local), Some("__require"), Some(path)) = (local, callee.as_deref(), path) {
                self.imports.push((local, path));
            }
        }
    }

    /// Capitalized JSX element names, first use first.
    fn extract_jsx_tags(&mut self, grammar: &Grammar, root: Node<'_>, source: &[u8]) {
        let Some(query) = &grammar.jsx_query else {
            return;
        };
        let mut cursor = QueryCursor::new();
        let mut found: Vec<(usize, String)> = Vec::new();
        for m in cursor.matches(query, root, source) {
            for capture in m.captures {
                found.push((capture.node.start_byte(), node_text(capture.node, source)));
            }
        }
        found.sort_by_key(|(at, _)| *at);

        for (_, tag) in found {
            if tag.starts_with(|c: char| c.is_ascii_uppercase()) && !self.jsx_tags.contains(&tag) {
                self.jsx_tags.push(tag);
            }
        }
    }

    /// Records a top-level declaration and returns the names it binds.
    fn declare(&mut self, node: Node<'_>, source: &[u8]) -> Vec<String> {
        match node.kind() {
            "function_declaration"
            | "generator_function_declaration"
            | "class_declaration"
            | "abstract_class_declaration" => match node.child_by_field_name("name") {
                Some(name) => {
                    let name = node_text(name, source);
                    self.declarations.insert(name.clone(), Declared::Callable);
                    vec![name]
                }
                None => Vec::new(),
            },
            "lexical_declaration" | "variable_declaration" => {
                let mut names = Vec::new();
                let mut cursor = node.walk();
                for declarator in node.named_children(&mut cursor) {
                    if declarator.kind() != "variable_declarator" {
                        continue;
                    }
                    let Some(name) = declarator
                        .child_by_field_name("name")
                        .filter(|n| n.kind() == "identifier")
                    else {
                        continue;
                    };
                    let name = node_text(name, source);
                    let declared = match declarator.child_by_field_name("value") {
                        Some(value) if is_callable(value) => Declared::Callable,
                        Some(value) => Declared::Value(node_text(value, source)),
                        None => Declared::Value(String::new()),
                    };
                    self.declarations.insert(name.clone(), declared);
                    names.push(name);
                }
                names
            }
            _ => Vec::new(),
        }
    }

    fn record_export(&mut self, node: Node<'_>, source: &[u8]) {
        let mut cursor = node.walk();
        let is_default = node.children(&mut cursor).any(|c| c.kind() == "default");

        if let Some(declaration) = node.child_by_field_name("declaration") {
            let names = self.declare(declaration, source);
            if is_default {
                if let Some(name) = names.into_iter().next() {
                    self.default_export = Some(DefaultExport::Callable(name));
                }
            } else {
                self.named_exports
                    .extend(names.into_iter().map(|name| (name.clone(), name)));
            }
            return;
        }

        if let Some(value) = node.child_by_field_name("value") {
            let export = if is_callable(value) {
                let name = value
                    .child_by_field_name("name")
                    .map(|n| node_text(n, source))
                    .unwrap_or_else(|| component_name_for(&self.filename));
                DefaultExport::Callable(name)
            } else if value.kind() == "identifier" {
                DefaultExport::Identifier(node_text(value, source))
            } else {
                DefaultExport::Expression(node_text(value, source))
            };
            self.default_export = Some(export);
            return;
        }

        if node.child_by_field_name("source").is_some() {
            log::debug!("{}: re-exports are not followed", self.filename);
            return;
        }

        let clauses: Vec<Node<'_>> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "export_clause")
            .collect();
        for clause in clauses {
            let mut specifiers = clause.walk();
            for specifier in clause.named_children(&mut specifiers) {
                let Some(name) = specifier.child_by_field_name("name") else {
                    continue;
                };
                let local = node_text(name, source);
                let exported = specifier
                    .child_by_field_name("alias")
                    .map(|alias| node_text(alias, source))
                    .unwrap_or_else(|| local.clone());
                self.named_exports.push((exported, local));
            }
        }
    }

    fn callable(&self, name: &str, bindings: &HashMap<String, ExportValue>) -> ExportValue {
        if name.starts_with(|c: char| c.is_ascii_uppercase()) {
            let children = self
                .jsx_tags
                .iter()
                .filter_map(|tag| bindings.get(tag).and_then(ExportValue::as_component))
                .cloned()
                .collect();
            ExportValue::Component(Component {
                name: name.to_string(),
                module: self.filename.clone(),
                children,
            })
        } else {
            ExportValue::Function(name.to_string())
        }
    }

    fn evaluate(
        &self,
        name: &str,
        bindings: &HashMap<String, ExportValue>,
    ) -> Result<ExportValue, LoaderError> {
        if let Some(value) = bindings.get(name) {
            return Ok(value.clone());
        }
        match self.declarations.get(name) {
            Some(Declared::Callable) => Ok(self.callable(name, bindings)),
            Some(Declared::Value(text)) => Ok(ExportValue::Value(text.clone())),
            None => Err(LoaderError::Runtime {
                filename: self.filename.clone(),
                message: format!("ReferenceError: {} is not defined", name),
            }),
        }
    }
}

impl CompiledUnit for ComponentUnit {
    fn invoke(&self, require: &mut Require<'_>, exports: &mut Exports) -> Result<(), LoaderError> {
        let mut bindings = HashMap::new();
        for (local, path) in &self.imports {
            let value = require(path)?;
            bindings.insert(local.clone(), value);
        }

        if let Some(message) = &self.top_level_throw {
            return Err(LoaderError::Runtime {
                filename: self.filename.clone(),
                message: message.clone(),
            });
        }

        for (exported, local) in &self.named_exports {
            let value = self.evaluate(local, &bindings)?;
            exports.named.insert(exported.clone(), value);
        }

        exports.default = match &self.default_export {
            Some(DefaultExport::Callable(name)) => Some(self.callable(name, &bindings)),
            Some(DefaultExport::Identifier(name)) => Some(self.evaluate(name, &bindings)?),
            Some(DefaultExport::Expression(text)) => Some(ExportValue::Value(text.clone())),
            None => None,
        };

        Ok(())
    }
}

/// Function and class expressions produce something callable.
fn is_callable(node: Node<'_>) -> bool {
    matches!(
        node.kind(),
        "arrow_function" | "function_expression" | "function" | "generator_function" | "class"
    )
}

/// The thrown string literal, or the thrown expression's source.
fn thrown_message(node: Node<'_>, source: &[u8]) -> String {
    if let Some(fragment) = first_descendant(node, "string_fragment") {
        return node_text(fragment, source);
    }
    node_text(node, source)
        .trim()
        .trim_start_matches("throw")
        .trim()
        .trim_end_matches(';')
        .to_string()
}

fn first_descendant<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
    children.into_iter().find_map(|child| {
        if child.kind() == kind {
            Some(child)
        } else {
            first_descendant(child, kind)
        }
    })
}

/// Anonymous default exports take the file's stem, capitalized.
fn component_name_for(filename: &str) -> String {
    let base = filename.rsplit('/').next().unwrap_or(filename);
    let stem = base.split('.').next().unwrap_or(base);
    let mut chars = stem.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Anonymous".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoke(unit: &dyn CompiledUnit, deps: HashMap<&str, ExportValue>) -> Result<Exports, LoaderError> {
        let mut exports = Exports::default();
        let mut require = |path: &str| {
            deps.get(path)
                .cloned()
                .ok_or_else(|| LoaderError::ModuleNotFound(path.to_string()))
        };
        unit.invoke(&mut require, &mut exports)?;
        Ok(exports)
    }

    #[test]
    fn default_function_export_is_a_component() {
        let unit = ComponentCompiler
            .compile("App.tsx", "export default function App() {\n  return <div />;\n}")
            .unwrap();
        let exports = invoke(unit.as_ref(), HashMap::new()).unwrap();

        let value = exports.into_value();
        assert!(value.is_function());
        assert_eq!(value.as_component().unwrap().name, "App");
    }

    #[test]
    fn imported_components_become_children() {
        let source = "const Header = __require(\"Header\");\nexport default function App() {\n  return <main><Header title='x' /></main>;\n}";
        let unit = ComponentCompiler.compile("App.tsx", source).unwrap();
        let header = ExportValue::Component(Component {
            name: "Header".to_string(),
            module: "Header.tsx".to_string(),
            children: vec![],
        });

        let exports = invoke(unit.as_ref(), HashMap::from([("Header", header)])).unwrap();
        let app = exports.into_value();
        assert_eq!(app.as_component().unwrap().children[0].name, "Header");
    }

    #[test]
    fn arrow_and_identifier_defaults() {
        let source = "interface Props {\n  label: string;\n}\nconst Button = ({ label }: Props) => <button>{label}</button>;\nexport default Button;";
        let unit = ComponentCompiler.compile("ui/Button.tsx", source).unwrap();
        let value = invoke(unit.as_ref(), HashMap::new()).unwrap().into_value();
        assert_eq!(value.as_component().unwrap().name, "Button");

        let unit = ComponentCompiler
            .compile("ui/card.jsx", "export default () => <div>Don't panic</div>;")
            .unwrap();
        let value = invoke(unit.as_ref(), HashMap::new()).unwrap().into_value();
        assert_eq!(value.as_component().unwrap().name, "Card");
    }

    #[test]
    fn module_without_default_exposes_namespace() {
        let source = "export const VERSION = '1.0';\nexport function format(x: number) { return x; }";
        let unit = ComponentCompiler.compile("util.ts", source).unwrap();
        let value = invoke(unit.as_ref(), HashMap::new()).unwrap().into_value();

        let ExportValue::Namespace(exports) = value else {
            panic!("expected namespace");
        };
        assert_eq!(exports.named["VERSION"], ExportValue::Value("'1.0'".to_string()));
        assert_eq!(exports.named["format"], ExportValue::Function("format".to_string()));
    }

    #[test]
    fn reports_syntax_errors_with_line() {
        let err = ComponentCompiler
            .compile("Broken.tsx", "export default function Broken() {\n  return (<div>;\n}")
            .err()
            .unwrap();

        match err {
            LoaderError::Compile { filename, line, .. } => {
                assert_eq!(filename, "Broken.tsx");
                assert!((1..=3).contains(&line));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn valid_jsx_text_and_regex_literals_compile() {
        let source = "export default function Smile() {\n  const re = /\\(/;\n  return <p>Nice :) Rock 'n roll {re.source}</p>;\n}";
        let unit = ComponentCompiler.compile("Smile.tsx", source).unwrap();

        let value = invoke(unit.as_ref(), HashMap::new()).unwrap().into_value();
        assert_eq!(value.as_component().unwrap().name, "Smile");
    }

    #[test]
    fn missing_brace_is_reported() {
        let err = ComponentCompiler
            .compile("util.ts", "export function open(x: number) {\n  return x;\n")
            .err()
            .unwrap();
        assert!(matches!(err, LoaderError::Compile { .. }));
    }

    #[test]
    fn top_level_throw_is_a_runtime_error() {
        let source = "throw new Error(\"boom\");\nexport default function App() {\n  throw new Error('inner');\n}";
        let unit = ComponentCompiler.compile("App.tsx", source).unwrap();

        let err = invoke(unit.as_ref(), HashMap::new()).unwrap_err();
        assert_eq!(
            err,
            LoaderError::Runtime {
                filename: "App.tsx".to_string(),
                message: "boom".to_string()
            }
        );
    }

    #[test]
    fn undefined_default_identifier_fails_at_runtime() {
        let unit = ComponentCompiler.compile("App.tsx", "export default Missing;").unwrap();

        let err = invoke(unit.as_ref(), HashMap::new()).unwrap_err();
        assert!(matches!(err, LoaderError::Runtime { .. }));
    }

    #[test]
    fn type_declarations_and_casts_are_ignored() {
        let source = "type Id = string;\ninterface A {\n  b: { c: number };\n}\nconst raw: unknown = 1;\nexport const x = <number>raw;\nexport { x as y };";
        let unit = ComponentCompiler.compile("ids.ts", source).unwrap();

        let value = invoke(unit.as_ref(), HashMap::new()).unwrap().into_value();
        assert_eq!(value.describe(), "exports { x, y }");
        let ExportValue::Namespace(exports) = value else {
            panic!("expected namespace");
        };
        assert_eq!(exports.named["y"], ExportValue::Value("<number>raw".to_string()));
    }
}
