use crate::artifacts::{language_for_filename, normalize_path};
use crate::preview::compiler::{CompiledUnit, ComponentCompiler, ExportValue, Exports, UnitCompiler};
use crate::preview::errors::LoaderError;
use crate::preview::rewrite::rewrite_imports;
use std::collections::HashMap;

/// A source leaf handed to the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualModule {
    pub filename: String,
    pub language: String,
    pub content: String,
}

impl VirtualModule {
    /// Takes the language from the filename's extension.
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        let filename = filename.into();
        let language = language_for_filename(&filename).unwrap_or("text").to_string();
        Self {
            filename,
            language,
            content: content.into(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

const EXTENSIONS: [&str; 4] = [".tsx", ".ts", ".jsx", ".js"];

enum Slot {
    Ready(Box<dyn CompiledUnit>),
    Broken(LoaderError),
    /// Being instantiated; cyclic requires see these partial exports.
    Instantiating(Exports),
    Done(ExportValue),
}

/// Registry of compiled modules for one preview pass.
pub struct ModuleLoader<C: UnitCompiler = ComponentCompiler> {
    compiler: C,
    slots: HashMap<String, Slot>,
    /// Modules currently being instantiated, outermost first.
    stack: Vec<String>,
    failure_chain: Vec<String>,
}

impl Default for ModuleLoader<ComponentCompiler> {
    fn default() -> Self {
        Self::new(ComponentCompiler)
    }
}

impl<C: UnitCompiler> ModuleLoader<C> {
    pub fn new(compiler: C) -> Self {
        Self {
            compiler,
            slots: HashMap::new(),
            stack: Vec::new(),
            failure_chain: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.slots.clear();
        self.stack.clear();
        self.failure_chain.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Clears the registry and compiles every module. Compile failures are
    /// kept and reported when the module is required.
    pub fn register_modules(&mut self, modules: &[VirtualModule]) {
        self.reset();
        for module in modules {
            let key = normalize_path(&module.filename).join("/");
            let source = rewrite_imports(&key, &module.content);
            let slot = match self.compiler.compile(&key, &source) {
                Ok(unit) => Slot::Ready(unit),
                Err(err) => {
                    log::debug!("compile failed for {}: {}", key, err);
                    Slot::Broken(err)
                }
            };
            self.slots.insert(key, slot);
        }
        log::debug!("registered {} module(s)", self.slots.len());
    }

    /// Import chain of the first failure since the last reset.
    pub fn import_chain(&self) -> &[String] {
        &self.failure_chain
    }

    /// Instantiates `filename` on first use and returns its default export,
    /// or the whole exports object when it has none.
    pub fn require(&mut self, filename: &str) -> Result<ExportValue, LoaderError> {
        let Some(key) = self.resolve(filename) else {
            let err = LoaderError::ModuleNotFound(filename.to_string());
            self.record_failure(None);
            return Err(err);
        };

        let previous = self
            .slots
            .insert(key.clone(), Slot::Instantiating(Exports::default()));

        let unit = match previous {
            Some(Slot::Ready(unit)) => unit,
            Some(Slot::Done(value)) => {
                let result = value.clone();
                self.slots.insert(key, Slot::Done(value));
                return Ok(result);
            }
            Some(Slot::Instantiating(partial)) => {
                log::debug!("cyclic require of {}", key);
                let result = ExportValue::Namespace(Box::new(partial.clone()));
                self.slots.insert(key, Slot::Instantiating(partial));
                return Ok(result);
            }
            Some(Slot::Broken(err)) => {
                self.record_failure(Some(&key));
                self.slots.insert(key, Slot::Broken(err.clone()));
                return Err(err);
            }
            None => return Err(LoaderError::ModuleNotFound(key)),
        };

        self.stack.push(key.clone());
        let mut exports = Exports::default();
        let result = {
            let mut require = |path: &str| self.require(path);
            unit.invoke(&mut require, &mut exports)
        };

        let outcome = match result {
            Ok(()) => {
                let value = exports.into_value();
                self.slots.insert(key, Slot::Done(value.clone()));
                Ok(value)
            }
            Err(err) => {
                self.record_failure(None);
                self.slots.insert(key, Slot::Broken(err.clone()));
                Err(err)
            }
        };
        self.stack.pop();
        outcome
    }

    fn resolve(&self, filename: &str) -> Option<String> {
        let key = normalize_path(filename).join("/");
        if self.slots.contains_key(&key) {
            return Some(key);
        }
        EXTENSIONS
            .iter()
            .map(|ext| format!("{}{}", key, ext))
            .chain(EXTENSIONS.iter().map(|ext| format!("{}/index{}", key, ext)))
            .find(|candidate| self.slots.contains_key(candidate))
    }

    fn record_failure(&mut self, failing: Option<&str>) {
        if !self.failure_chain.is_empty() {
            return;
        }
        self.failure_chain = self.stack.clone();
        if let Some(key) = failing {
            self.failure_chain.push(key.to_string());
        }
    }
}
