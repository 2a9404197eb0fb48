//! Component resolution and instance caching.
//!
//! [`ComponentRegistry`] maps component names to constructors. Resolution is
//! a validated lookup: the short registry name is tried first, then the
//! fully-qualified class path recorded in persisted metadata. Anything else
//! is a fatal configuration error — there is no arbitrary runtime symbol
//! resolution.
//!
//! [`ComponentBuilder`] wraps a registry with a shared instance cache keyed
//! by a component-supplied cache key. The cache is explicit shared state
//! passed by reference to every load, so its lifetime and concurrency policy
//! are visible at call sites. Population is check-then-act: two concurrent
//! loads of the same key may both construct, and one result silently
//! prevails — safe because construction is deterministic and idempotent for
//! identical configuration and artifacts.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{error, info};

use crate::errors::{Error, Result};
use crate::pipeline::component::{Component, Context};
use crate::pipeline::metadata::Metadata;

/// Constructor entry for one component class.
#[derive(Debug)]
pub struct ComponentClass {
    /// Short registry name.
    pub name: &'static str,
    /// Fully-qualified constructor path persisted in metadata.
    pub class_path: &'static str,
    /// Training-time constructor: fresh instance from declared configuration,
    /// no persisted artifact expected.
    pub create: fn(&Metadata) -> Result<Box<dyn Component>>,
    /// Load-time constructor: may read a persisted artifact from the model
    /// directory.
    pub load: fn(Option<&Path>, &Metadata, &Context) -> Result<Box<dyn Component>>,
    /// Stable cache key for instance reuse across loads, or `None` to opt
    /// out of caching.
    pub cache_key: fn(&Metadata) -> Option<String>,
}

/// Validated lookup table of component constructors.
pub struct ComponentRegistry {
    classes: Vec<ComponentClass>,
}

impl ComponentRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            classes: Vec::new(),
        }
    }

    /// Registry pre-populated with the built-in extractor components.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(crate::extractors::regex_rule::component_class());
        registry.register(crate::extractors::regex_entity::component_class());
        registry
    }

    /// Register a component class.
    pub fn register(&mut self, class: ComponentClass) {
        self.classes.push(class);
    }

    /// Resolve a component name, falling back to the fully-qualified class
    /// path. An unresolved name is a fatal configuration error.
    pub fn resolve(&self, name: &str) -> Result<&ComponentClass> {
        self.classes
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.classes.iter().find(|c| c.class_path == name))
            .ok_or_else(|| {
                Error::configuration(format!("Unknown component {name:?}: not registered"))
            })
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Resolves component names to instances, with a shared cache for loaded
/// components.
pub struct ComponentBuilder {
    registry: ComponentRegistry,
    use_cache: bool,
    cache: RwLock<FxHashMap<String, Arc<dyn Component>>>,
}

impl ComponentBuilder {
    /// Builder over the given registry with caching enabled.
    pub fn new(registry: ComponentRegistry) -> Self {
        Self {
            registry,
            use_cache: true,
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    /// Builder over the default registry.
    pub fn with_defaults() -> Self {
        Self::new(ComponentRegistry::with_defaults())
    }

    /// Disable the instance cache; every load constructs fresh.
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    /// Access the underlying registry.
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Load a component for inference, reusing a cached instance when the
    /// class supplies a cache key and a prior instance exists under it.
    pub fn load_component(
        &self,
        name: &str,
        model_dir: Option<&Path>,
        metadata: &Metadata,
        context: &Context,
    ) -> Result<Arc<dyn Component>> {
        let class = self.registry.resolve(name)?;
        let cache_key = (class.cache_key)(metadata);

        if self.use_cache {
            if let Some(key) = &cache_key {
                if let Some(cached) = self.cache.read().get(key) {
                    return Ok(Arc::clone(cached));
                }
            }
        }

        let component = (class.load)(model_dir, metadata, context).map_err(|e| {
            error!(component = name, "failed to load component: {e}");
            e
        })?;
        let component: Arc<dyn Component> = Arc::from(component);

        if self.use_cache {
            if let Some(key) = cache_key {
                info!(component = name, key = %key, "added component to cache");
                self.cache.write().insert(key, Arc::clone(&component));
            }
        }
        Ok(component)
    }

    /// Construct a fresh component for training from declared configuration.
    ///
    /// Training mutates component state, so trained instances are exclusive
    /// to their trainer and never shared through the cache.
    pub fn create_component(&self, name: &str, config: &Metadata) -> Result<Box<dyn Component>> {
        let class = self.registry.resolve(name)?;
        (class.create)(config).map_err(|e| {
            error!(component = name, "failed to create component: {e}");
            e
        })
    }
}
