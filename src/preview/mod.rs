//! Live preview: a small module loader over the source leaves of a version
//! tree, mounted as a component outline.

pub mod compiler;
pub mod errors;
pub mod host;
pub mod loader;
pub mod rewrite;

pub use compiler::{CompiledUnit, Component, ComponentCompiler, ExportValue, Exports, UnitCompiler};
pub use errors::LoaderError;
pub use host::{resolve_entry, select_modules, PreviewHost, RenderState};
pub use loader::{ModuleLoader, VirtualModule};
pub use rewrite::{resolve_relative, rewrite_imports};
