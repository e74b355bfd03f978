use crate::artifacts::all_files;
use crate::models::CodeStructBlock;
use crate::preview::compiler::{Component, ComponentCompiler, ExportValue, UnitCompiler};
use crate::preview::errors::LoaderError;
use crate::preview::loader::{ModuleLoader, VirtualModule};
use std::panic::{self, AssertUnwindSafe};

const SOURCE_LANGUAGES: [&str; 4] = ["tsx", "jsx", "typescript", "javascript"];
const COMPONENT_LANGUAGES: [&str; 2] = ["tsx", "jsx"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderState {
    Empty,
    Mounted { entry: String, markup: String },
    Error { message: String, stack: Vec<String> },
}

/// Mount point for the live preview. Each render replaces the previous one.
pub struct PreviewHost<C: UnitCompiler = ComponentCompiler> {
    loader: ModuleLoader<C>,
    state: RenderState,
}

impl Default for PreviewHost<ComponentCompiler> {
    fn default() -> Self {
        Self::new(ComponentCompiler)
    }
}

impl<C: UnitCompiler> PreviewHost<C> {
    pub fn new(compiler: C) -> Self {
        Self {
            loader: ModuleLoader::new(compiler),
            state: RenderState::Empty,
        }
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn clear(&mut self) {
        self.loader.reset();
        self.state = RenderState::Empty;
    }

    /// Compiles the source leaves of `tree` and mounts the entry component.
    /// Failures end up in the returned state; nothing escapes.
    pub fn render(&mut self, tree: &[CodeStructBlock], active: Option<&str>) -> &RenderState {
        self.clear();

        let modules = select_modules(tree);
        let Some(entry) = resolve_entry(&modules, active) else {
            self.state = RenderState::Error {
                message: "no component file to preview".to_string(),
                stack: Vec::new(),
            };
            return &self.state;
        };

        let loader = &mut self.loader;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            loader.register_modules(&modules);
            loader.require(&entry)
        }));

        self.state = match outcome {
            Ok(Ok(value)) => mount(&entry, &value),
            Ok(Err(err)) => {
                log::debug!("preview of {} failed: {}", entry, err);
                RenderState::Error {
                    message: err.to_string(),
                    stack: self.loader.import_chain().to_vec(),
                }
            }
            Err(_) => RenderState::Error {
                message: format!("preview of {} aborted", entry),
                stack: self.loader.import_chain().to_vec(),
            },
        };
        &self.state
    }
}

/// Leaves written in a language the loader can compile.
pub fn select_modules(tree: &[CodeStructBlock]) -> Vec<VirtualModule> {
    all_files(tree)
        .into_iter()
        .filter(|file| SOURCE_LANGUAGES.contains(&file.language))
        .map(|file| VirtualModule::new(file.path, file.content).with_language(file.language))
        .collect()
}

/// The active file when it holds components, else the first file that does.
/// Component-bearing means written in `tsx` or `jsx`, whatever the name.
pub fn resolve_entry(modules: &[VirtualModule], active: Option<&str>) -> Option<String> {
    let is_component = |module: &VirtualModule| COMPONENT_LANGUAGES.contains(&module.language.as_str());

    if let Some(active) = active {
        let active = active.trim_start_matches("./");
        if modules.iter().any(|m| m.filename == active && is_component(m)) {
            return Some(active.to_string());
        }
    }

    modules
        .iter()
        .find(|m| is_component(m))
        .map(|m| m.filename.clone())
}

fn mount(entry: &str, value: &ExportValue) -> RenderState {
    match value.as_component() {
        Some(component) => {
            let mut markup = String::new();
            outline(component, 0, &mut markup);
            RenderState::Mounted {
                entry: entry.to_string(),
                markup,
            }
        }
        None => RenderState::Error {
            message: LoaderError::Mount(format!(
                "default export of {} is not a component ({})",
                entry,
                value.describe()
            ))
            .to_string(),
            stack: vec![entry.to_string()],
        },
    }
}

fn outline(component: &Component, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    if component.children.is_empty() {
        out.push_str(&format!(
            "{}<{} data-module=\"{}\" />\n",
            indent, component.name, component.module
        ));
        return;
    }

    out.push_str(&format!(
        "{}<{} data-module=\"{}\">\n",
        indent, component.name, component.module
    ));
    for child in &component.children {
        outline(child, depth + 1, out);
    }
    out.push_str(&format!("{}</{}>\n", indent, component.name));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(files: &[(&str, &str, &str)]) -> Vec<CodeStructBlock> {
        files
            .iter()
            .map(|(name, language, content)| CodeStructBlock::file(*name, *language, *content))
            .collect()
    }

    #[test]
    fn mounts_entry_with_imported_children() {
        let files = tree(&[
            ("notes.md", "markdown", "# notes"),
            ("App.tsx", "tsx", "import Header from './Header';\nexport default function App() {\n  return <div><Header /></div>;\n}"),
            ("Header.tsx", "tsx", "export default function Header() { return <h1>Hi</h1>; }"),
        ]);
        let mut host = PreviewHost::default();

        let state = host.render(&files, None).clone();

        assert_eq!(
            state,
            RenderState::Mounted {
                entry: "App.tsx".to_string(),
                markup: "<App data-module=\"App.tsx\">\n  <Header data-module=\"Header.tsx\" />\n</App>\n"
                    .to_string(),
            }
        );
    }

    #[test]
    fn active_component_file_is_the_entry() {
        let files = tree(&[
            ("App.tsx", "tsx", "export default function App() { return <div />; }"),
            ("Other.jsx", "jsx", "export default function Other() { return <p />; }"),
        ]);
        let modules = select_modules(&files);

        assert_eq!(resolve_entry(&modules, Some("Other.jsx")).as_deref(), Some("Other.jsx"));
        assert_eq!(resolve_entry(&modules, Some("util.ts")).as_deref(), Some("App.tsx"));
    }

    #[test]
    fn entry_follows_block_language_not_extension() {
        let files = tree(&[
            ("helpers.ts", "typescript", "export const two = 2;"),
            ("Widget", "tsx", "export default function Widget() { return <section />; }"),
        ]);
        let modules = select_modules(&files);
        assert_eq!(modules[1].language, "tsx");
        assert_eq!(resolve_entry(&modules, None).as_deref(), Some("Widget"));

        let mut host = PreviewHost::default();
        assert_eq!(
            host.render(&files, Some("Widget")),
            &RenderState::Mounted {
                entry: "Widget".to_string(),
                markup: "<Widget data-module=\"Widget\" />\n".to_string(),
            }
        );
    }

    #[test]
    fn compile_error_becomes_error_state() {
        let files = tree(&[("App.tsx", "tsx", "export default function App() {\n  return <div>;\n")]);
        let mut host = PreviewHost::default();

        match host.render(&files, None) {
            RenderState::Error { message, stack } => {
                assert!(message.starts_with("App.tsx:"));
                assert_eq!(stack, &vec!["App.tsx".to_string()]);
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn rerender_clears_previous_output() {
        let good = tree(&[("App.tsx", "tsx", "export default function App() { return <div />; }")]);
        let mut host = PreviewHost::default();
        assert!(matches!(host.render(&good, None), RenderState::Mounted { .. }));

        let none: Vec<CodeStructBlock> = Vec::new();
        assert!(matches!(host.render(&none, None), RenderState::Error { .. }));

        host.clear();
        assert_eq!(host.state(), &RenderState::Empty);
    }

    #[test]
    fn non_component_default_export_fails_to_mount() {
        let files = tree(&[("App.tsx", "tsx", "export default 42;")]);
        let mut host = PreviewHost::default();

        let RenderState::Error { message, .. } = host.render(&files, None) else {
            panic!("expected error");
        };
        assert!(message.starts_with("mount failed"));
    }
}
