//! Pluggable task execution. A `Task.target` is a `module_path:symbol`
//! string — opaque to the engine, never reflectively imported. The host
//! registers named handlers at startup and the Firing Engine looks the
//! string up through this trait (spec §9 design note).

use std::collections::HashMap as StdHashMap;
use std::sync::Arc;

/// A unit of work a `Task.target` string resolves to. Receives the
/// pre-validated input content and the task's `config` map; returns the
/// content of the evolved token, or an opaque execution failure message.
pub trait Handler: Send + Sync {
    fn call(
        &self,
        input: &StdHashMap<String, serde_json::Value>,
        config: &StdHashMap<String, serde_json::Value>,
    ) -> Result<StdHashMap<String, serde_json::Value>, String>;
}

/// Blanket impl so a plain closure can be registered directly.
impl<F> Handler for F
where
    F: Fn(
            &StdHashMap<String, serde_json::Value>,
            &StdHashMap<String, serde_json::Value>,
        ) -> Result<StdHashMap<String, serde_json::Value>, String>
        + Send
        + Sync,
{
    fn call(
        &self,
        input: &StdHashMap<String, serde_json::Value>,
        config: &StdHashMap<String, serde_json::Value>,
    ) -> Result<StdHashMap<String, serde_json::Value>, String> {
        self(input, config)
    }
}

/// Resolves a `Task.target` string to a registered [`Handler`]. A lookup
/// table, not a reflective importer — unknown targets are a runtime
/// execution error, not a panic.
#[derive(Clone, Default)]
pub struct Resolver {
    handlers: StdHashMap<String, Arc<dyn Handler>>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, target: impl Into<String>, handler: impl Handler + 'static) {
        self.handlers.insert(target.into(), Arc::new(handler));
    }

    pub fn resolve(&self, target: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(target).cloned()
    }
}
