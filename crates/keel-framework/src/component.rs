//! Linked component code and the table that resolves it.
//!
//! Components are compiled into the host.  Each one contributes a
//! [`ComponentFactory`], a static, `Copy` handle naming the module (the
//! entry file stem used in manifests) and the export (the component name),
//! plus a function that builds the live [`Component`].
//!
//! Factories reach the host either through the
//! [`COMPONENT_FACTORIES`] distributed slice or by explicit registration on a
//! [`ComponentTable`].  The table implements [`CodeLoader`], so the loader
//! resolves `Main = "greeter.rs"` to every factory whose module is
//! `"greeter"`.
//!
//! # Example
//!
//! ```rust,ignore
//! use keel_framework::{Component, ComponentFactory, COMPONENT_FACTORIES};
//! use keel_framework::linkme::distributed_slice;
//!
//! fn greeter() -> Component {
//!     Component::builder("greeter")
//!         .entry_point("startGreeter", |ctx| async move {
//!             tracing::info!(host = %ctx.info().name, "hello");
//!             Ok(())
//!         })
//!         .build()
//! }
//!
//! #[distributed_slice(COMPONENT_FACTORIES)]
//! #[linkme(crate = keel_framework::linkme)]
//! static GREETER: ComponentFactory = ComponentFactory::new("greeter", "greeter", greeter);
//! ```

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use linkme::distributed_slice;
use tracing::{debug, warn};

use keel_core::BoxError;

use crate::context::HostContext;
use crate::error::CodeLoadError;

/// Type-erased capability object.
///
/// The inner `dyn Any` is an `Arc<T>` (usually `Arc<dyn SomeTrait>`);
/// consumers downcast it back with [`Component::capability`].
pub type CapabilityArc = Arc<dyn Any + Send + Sync>;

/// An async entry point taking the host context.
pub type EntryPointFn =
    Arc<dyn Fn(Arc<HostContext>) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

// ─── Component ───────────────────────────────────────────────────────────────

/// A live component: named entry points plus the capabilities it exposes.
pub struct Component {
    name: Cow<'static, str>,
    entry_points: HashMap<String, EntryPointFn>,
    capabilities: HashMap<TypeId, CapabilityArc>,
}

impl Component {
    /// Starts building a component exported as `name`.
    pub fn builder(name: impl Into<Cow<'static, str>>) -> ComponentBuilder {
        ComponentBuilder {
            name: name.into(),
            entry_points: HashMap::new(),
            capabilities: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if an entry point named `name` exists.
    pub fn has_entry_point(&self, name: &str) -> bool {
        self.entry_points.contains_key(name)
    }

    /// Names of all entry points, sorted.
    pub fn entry_point_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entry_points.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Runs the entry point `name`.  Returns `None` if it does not exist.
    pub async fn invoke(
        &self,
        name: &str,
        ctx: Arc<HostContext>,
    ) -> Option<Result<(), BoxError>> {
        let entry = self.entry_points.get(name)?;
        debug!(component = %self.name, entry_point = %name, "Invoking entry point");
        Some(entry(ctx).await)
    }

    /// Returns the capability registered as `Arc<T>`.
    pub fn capability<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.capabilities
            .get(&TypeId::of::<Arc<T>>())
            .and_then(|arc| arc.downcast_ref::<Arc<T>>())
            .cloned()
    }

    /// Returns `true` if a capability of type `Arc<T>` is exposed.
    pub fn provides<T>(&self) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.capabilities.contains_key(&TypeId::of::<Arc<T>>())
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("entry_points", &self.entry_point_names())
            .field("capabilities", &self.capabilities.len())
            .finish()
    }
}

/// Builder for [`Component`].
pub struct ComponentBuilder {
    name: Cow<'static, str>,
    entry_points: HashMap<String, EntryPointFn>,
    capabilities: HashMap<TypeId, CapabilityArc>,
}

impl ComponentBuilder {
    /// Adds an entry point.
    pub fn entry_point<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<HostContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let entry: EntryPointFn = Arc::new(move |ctx| Box::pin(f(ctx)));
        self.entry_points.insert(name.into(), entry);
        self
    }

    /// Exposes `value` to other components, keyed by `Arc<T>`.
    ///
    /// Pass an `Arc<dyn Trait>` to expose a trait object.
    pub fn provide<T>(mut self, value: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.capabilities
            .insert(TypeId::of::<Arc<T>>(), Arc::new(value) as CapabilityArc);
        self
    }

    pub fn build(self) -> Component {
        Component {
            name: self.name,
            entry_points: self.entry_points,
            capabilities: self.capabilities,
        }
    }
}

// ─── ComponentFactory ────────────────────────────────────────────────────────

/// A static, `Copy` handle that builds a [`Component`].
#[derive(Debug, Clone, Copy)]
pub struct ComponentFactory {
    /// Entry file stem this component lives in.
    pub module: &'static str,
    /// Export name; matched against the manifest's component name.
    pub name: &'static str,
    /// Builds the live component.
    pub create: fn() -> Component,
}

impl ComponentFactory {
    pub const fn new(module: &'static str, name: &'static str, create: fn() -> Component) -> Self {
        Self {
            module,
            name,
            create,
        }
    }

    #[inline]
    pub fn instantiate(&self) -> Component {
        (self.create)()
    }
}

/// Factories linked into the binary.
///
/// Each crate that ships components contributes entries with
/// `#[distributed_slice(COMPONENT_FACTORIES)]`.
#[distributed_slice]
pub static COMPONENT_FACTORIES: [ComponentFactory];

// ─── CodeLoader ──────────────────────────────────────────────────────────────

/// The exports of one loaded module.
#[derive(Debug, Default)]
pub struct ModuleNamespace {
    module: String,
    exports: HashMap<String, Arc<Component>>,
}

impl ModuleNamespace {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            exports: HashMap::new(),
        }
    }

    /// Adds an export.  A later export with the same name replaces the earlier one.
    pub fn insert(&mut self, component: Component) {
        self.exports
            .insert(component.name().to_string(), Arc::new(component));
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Returns the export named `name`.
    pub fn get(&self, name: &str) -> Option<Arc<Component>> {
        self.exports.get(name).cloned()
    }

    /// Export names, sorted.
    pub fn export_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.exports.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Resolves an entry file to the code it names.
#[async_trait]
pub trait CodeLoader: Send + Sync {
    async fn load(&self, entry_file: &Path) -> Result<ModuleNamespace, CodeLoadError>;
}

// ─── ComponentTable ──────────────────────────────────────────────────────────

/// Registration-time table of component factories.
#[derive(Debug, Clone, Default)]
pub struct ComponentTable {
    factories: Vec<ComponentFactory>,
}

impl ComponentTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table holding every factory in [`COMPONENT_FACTORIES`].
    pub fn linked() -> Self {
        Self {
            factories: COMPONENT_FACTORIES.iter().copied().collect(),
        }
    }

    /// Adds a factory.
    pub fn register(&mut self, factory: ComponentFactory) -> &mut Self {
        if self
            .factories
            .iter()
            .any(|f| f.module == factory.module && f.name == factory.name)
        {
            warn!(
                module = factory.module,
                component = factory.name,
                "Component factory registered twice, the later one shadows it"
            );
        }
        self.factories.push(factory);
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, factory: ComponentFactory) -> Self {
        self.register(factory);
        self
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Returns `true` if a factory lives in `module`.
    pub fn has_module(&self, module: &str) -> bool {
        self.factories.iter().any(|f| f.module == module)
    }
}

#[async_trait]
impl CodeLoader for ComponentTable {
    async fn load(&self, entry_file: &Path) -> Result<ModuleNamespace, CodeLoadError> {
        let module = entry_file
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| CodeLoadError::InvalidEntryFile(entry_file.to_path_buf()))?;

        if !self.has_module(module) {
            return Err(CodeLoadError::ModuleNotFound(entry_file.to_path_buf()));
        }

        let mut namespace = ModuleNamespace::new(module);
        for factory in self.factories.iter().filter(|f| f.module == module) {
            namespace.insert(factory.instantiate());
        }
        debug!(module, exports = ?namespace.export_names(), "Module loaded");
        Ok(namespace)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    fn greeter() -> Component {
        Component::builder("greeter")
            .entry_point("start", |_ctx| async { Ok(()) })
            .provide::<dyn Greeter>(Arc::new(English))
            .build()
    }

    fn helper() -> Component {
        Component::builder("helper").build()
    }

    #[test]
    fn test_capability_downcast() {
        let component = greeter();
        assert!(component.provides::<dyn Greeter>());
        assert_eq!(component.capability::<dyn Greeter>().unwrap().greet(), "hello");
        assert!(component.capability::<String>().is_none());
        assert_eq!(component.entry_point_names(), ["start"]);
    }

    #[tokio::test]
    async fn test_table_resolves_by_file_stem() {
        let table = ComponentTable::new()
            .with(ComponentFactory::new("greeter", "greeter", greeter))
            .with(ComponentFactory::new("greeter", "helper", helper));

        let ns = table.load(Path::new("some/dir/greeter.rs")).await.unwrap();
        assert_eq!(ns.module(), "greeter");
        assert_eq!(ns.export_names(), ["greeter", "helper"]);
        assert!(ns.get("greeter").unwrap().has_entry_point("start"));
    }

    #[tokio::test]
    async fn test_table_reports_missing_module() {
        let table = ComponentTable::new().with(ComponentFactory::new("greeter", "greeter", greeter));
        assert!(table.has_module("greeter"));
        assert!(!table.has_module("other"));
        let err = table.load(Path::new("other.rs")).await.unwrap_err();
        assert!(matches!(err, CodeLoadError::ModuleNotFound(p) if p == PathBuf::from("other.rs")));
    }
}
