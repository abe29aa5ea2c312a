use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::ast::Stmt;
use crate::interpreter::builtins::{self, BuiltinNamespace};
use crate::interpreter::error::{ErrorKind, ExceptionValue};
use crate::types::TypeExpr;
use crate::value::Value;

/// A declared name clashing with one from another source.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationConflict {
    pub name: String,
    pub existing_source: String,
    pub incoming_source: String,
}

impl DeclarationConflict {
    pub fn to_exception(&self, line: u32) -> ExceptionValue {
        ExceptionValue::standard(
            ErrorKind::Validation,
            format!(
                "'{}' already declared in {} and cannot be overwritten by import from {}",
                self.name, self.existing_source, self.incoming_source
            ),
            line,
        )
    }
}

struct SessionInner {
    imports: Mutex<HashSet<PathBuf>>,
    declared: Mutex<HashMap<String, String>>,
    aliases: Mutex<HashMap<String, TypeExpr>>,
    screens: Mutex<HashMap<String, Rc<Vec<Stmt>>>>,
    builtins: Mutex<HashMap<String, Rc<dyn BuiltinNamespace>>>,
    verbose: Mutex<bool>,
}

/// Shared interpreter state: import cache, declared-name registry, type
/// aliases, screens and the builtin registry. Cloning hands out another
/// handle to the same state; the handle stays on the thread that created it
/// (the stored AST and values are Rc-based). Each registry has its own lock
/// so insert-if-absent stays atomic across the interpreters sharing it.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub fn new() -> Self {
        let session = Self {
            inner: Arc::new(SessionInner {
                imports: Mutex::new(HashSet::new()),
                declared: Mutex::new(HashMap::new()),
                aliases: Mutex::new(HashMap::new()),
                screens: Mutex::new(HashMap::new()),
                builtins: Mutex::new(HashMap::new()),
                verbose: Mutex::new(false),
            }),
        };
        for namespace in builtins::default_namespaces() {
            session.register_namespace(namespace);
        }
        session
    }

    pub fn set_verbose(&self, verbose: bool) {
        *self.inner.verbose.lock() = verbose;
    }

    pub fn trace(&self, message: impl AsRef<str>) {
        if *self.inner.verbose.lock() {
            eprintln!("[ebs] {}", message.as_ref());
        }
    }

    /// Marks a canonical path as imported. Returns false when it was
    /// already present, in which case the caller must not execute the file
    /// again (first-import-wins).
    pub fn begin_import(&self, path: &Path) -> bool {
        self.inner.imports.lock().insert(path.to_path_buf())
    }

    pub fn import_count(&self) -> usize {
        self.inner.imports.lock().len()
    }

    /// Registers a top-level name with its declaring source. Redeclaring
    /// from the same source overwrites silently; a different source is a
    /// conflict naming both.
    pub fn declare(&self, name: &str, source: &str) -> Result<(), DeclarationConflict> {
        let name = name.to_ascii_lowercase();
        let mut declared = self.inner.declared.lock();
        match declared.get(&name) {
            Some(existing) if existing != source => Err(DeclarationConflict {
                name,
                existing_source: existing.clone(),
                incoming_source: source.to_string(),
            }),
            _ => {
                declared.insert(name, source.to_string());
                Ok(())
            }
        }
    }

    pub fn declared_source(&self, name: &str) -> Option<String> {
        self.inner
            .declared
            .lock()
            .get(&name.to_ascii_lowercase())
            .cloned()
    }

    pub fn define_alias(&self, name: &str, ty: TypeExpr) {
        self.inner
            .aliases
            .lock()
            .insert(name.to_ascii_lowercase(), ty);
    }

    pub fn lookup_alias(&self, name: &str) -> Option<TypeExpr> {
        self.inner
            .aliases
            .lock()
            .get(&name.to_ascii_lowercase())
            .cloned()
    }

    pub fn register_screen(&self, name: &str, body: Rc<Vec<Stmt>>) {
        self.inner
            .screens
            .lock()
            .insert(name.to_ascii_lowercase(), body);
    }

    pub fn screen(&self, name: &str) -> Option<Rc<Vec<Stmt>>> {
        self.inner
            .screens
            .lock()
            .get(&name.to_ascii_lowercase())
            .cloned()
    }

    pub fn register_namespace(&self, namespace: Rc<dyn BuiltinNamespace>) {
        self.inner
            .builtins
            .lock()
            .insert(namespace.name().to_ascii_lowercase(), namespace);
    }

    /// Single dispatch point for every `ns.name(args)` call.
    pub fn builtin(
        &self,
        namespace: &str,
        name: &str,
        args: &[Value],
        line: u32,
    ) -> Result<Value, ExceptionValue> {
        let handler = self
            .inner
            .builtins
            .lock()
            .get(&namespace.to_ascii_lowercase())
            .cloned();
        match handler {
            Some(handler) => handler.call(name, args, line),
            None => Err(ExceptionValue::not_found_at(
                format!("unknown namespace '{}'", namespace),
                line,
            )),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
