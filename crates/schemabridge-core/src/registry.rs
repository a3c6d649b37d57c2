//! Identity-keyed registry of derived schemas
//!
//! Every source model maps to at most one derived schema. The registry
//! builds schemas on first request and returns the cached schema afterwards.
//!
//! Builds run inside a [`BuildSession`]: each model's schema is reserved
//! before its fields are converted, so self- and mutually-referential models
//! link back to the reserved schema instead of recursing forever. A session
//! commits every schema it built only when the top-level build succeeds; a
//! failure anywhere discards the session and leaves the registry untouched.
//!
//! Evicting a schema also evicts every cached schema that links to it,
//! directly or transitively, so no cached schema keeps a link to a schema
//! the registry no longer serves.
//!
//! Copyright (c) 2025 Schemabridge Team
//! Licensed under the Apache-2.0 license

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};
use tracing::{debug, info};

use crate::config::resolve_config;
use crate::convert::{convert_field, ConversionContext, WarningTracker};
use crate::error::{Error, FieldConversionError, ModelConversionError, Result};
use crate::fields::{DerivedField, SchemaLink};
use crate::schema::DerivedSchema;
use crate::settings::Settings;
use crate::source::{ModelId, SourceModel};

static GLOBAL_REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();

/// Registry statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Schemas currently cached
    pub cached: usize,
    /// Requests answered from the cache
    pub hits: u64,
    /// Top-level builds that completed successfully
    pub builds: u64,
}

#[derive(Debug)]
struct CacheEntry {
    schema: Arc<DerivedSchema>,
    /// Models the schema's fields link to
    links: HashSet<ModelId>,
}

impl CacheEntry {
    fn new(schema: Arc<DerivedSchema>) -> Self {
        let links = schema.linked_models();
        Self { schema, links }
    }
}

type Cache = HashMap<ModelId, CacheEntry>;

/// Cache of derived schemas keyed by source model identity
#[derive(Debug)]
pub struct SchemaRegistry {
    settings: Arc<Settings>,
    schemas: RwLock<Cache>,
    build_lock: Mutex<()>,
    hits: AtomicU64,
    builds: AtomicU64,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaRegistry {
    /// Create a registry with default settings
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
            schemas: RwLock::new(HashMap::new()),
            build_lock: Mutex::new(()),
            hits: AtomicU64::new(0),
            builds: AtomicU64::new(0),
        }
    }

    /// The process-wide registry, created with default settings on first use
    pub fn global() -> &'static SchemaRegistry {
        GLOBAL_REGISTRY.get_or_init(SchemaRegistry::new)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The cached schema for `model`, without building
    pub fn get(&self, model: &SourceModel) -> Option<Arc<DerivedSchema>> {
        self.lookup(model.id())
    }

    pub fn contains(&self, model: &SourceModel) -> bool {
        self.lookup(model.id()).is_some()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            cached: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
        }
    }

    /// Return the schema for `model`, building and caching it on first use.
    ///
    /// Concurrent callers for the same model observe the same schema.
    pub fn get_or_build(&self, model: &Arc<SourceModel>) -> Result<Arc<DerivedSchema>> {
        if let Some(schema) = self.lookup(model.id()) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(schema);
        }

        let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(schema) = self.lookup(model.id()) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(schema);
        }
        self.build_locked(model)
    }

    /// Drop the cached schema of `model` and of every schema linking to it.
    ///
    /// Returns whether `model` itself had a cached schema.
    pub fn invalidate(&self, model: &SourceModel) -> bool {
        let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let evicted = evict(&mut self.write(), model.id());
        if evicted > 0 {
            debug!(model = model.name(), evicted, "invalidated derived schema");
        }
        evicted > 0
    }

    /// Discard the cached schema of `model` and build it again.
    ///
    /// Use after redefining a model in place.
    pub fn rebuild(&self, model: &Arc<SourceModel>) -> Result<Arc<DerivedSchema>> {
        let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        evict(&mut self.write(), model.id());
        self.build_locked(model)
    }

    /// Drop every cached schema
    pub fn reset(&self) {
        let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write().clear();
        info!("schema registry reset");
    }

    /// Install a hand-written schema for `model`, replacing any cached one.
    ///
    /// Field keys follow the model's field aliases where the model declares a
    /// field of the same name.
    pub fn install_manual(
        &self,
        model: &Arc<SourceModel>,
        fields: impl IntoIterator<Item = (String, DerivedField)>,
    ) -> Arc<DerivedSchema> {
        let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let config = resolve_config(model, self.settings.default_config);
        let schema = DerivedSchema::reserve(Arc::clone(model), config, Arc::clone(&self.settings), true);
        evict(&mut self.write(), model.id());

        let fields = fields
            .into_iter()
            .map(|(name, field)| match model.field(&name) {
                Some(descriptor) => {
                    let (validation_key, serialization_key) = (
                        descriptor.validation_key().to_string(),
                        descriptor.serialization_key().to_string(),
                    );
                    field.bind(name, validation_key, serialization_key)
                }
                None => field.bind(name.clone(), name.clone(), name),
            })
            .collect();
        schema.populate(fields, Vec::new());

        self.write().insert(model.id(), CacheEntry::new(Arc::clone(&schema)));
        debug!(model = model.name(), "installed manual schema");
        schema
    }

    fn build_locked(&self, model: &Arc<SourceModel>) -> Result<Arc<DerivedSchema>> {
        if !model.derives_schema() {
            return Err(Error::NotDerivable {
                model: model.name().to_string(),
            });
        }

        let mut session = BuildSession::new(self);
        let schema = session.build(model)?;
        let committed = session.commit();
        self.builds.fetch_add(1, Ordering::Relaxed);
        info!(model = model.name(), schemas = committed, "built derived schema");
        Ok(schema)
    }

    fn lookup(&self, id: ModelId) -> Option<Arc<DerivedSchema>> {
        self.read().get(&id).map(|entry| Arc::clone(&entry.schema))
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Cache> {
        self.schemas.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Cache> {
        self.schemas.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Remove `id` and every entry that links to a removed entry; returns how many were removed
fn evict(cache: &mut Cache, id: ModelId) -> usize {
    let mut pending = vec![id];
    let mut evicted = 0;
    while let Some(id) = pending.pop() {
        if cache.remove(&id).is_none() {
            continue;
        }
        evicted += 1;
        pending.extend(
            cache
                .iter()
                .filter(|(_, entry)| entry.links.contains(&id))
                .map(|(dependent, _)| *dependent),
        );
    }
    evicted
}

/// One top-level build and the nested schemas it creates
pub(crate) struct BuildSession<'r> {
    registry: &'r SchemaRegistry,
    pending: HashMap<ModelId, Arc<DerivedSchema>>,
    in_progress: HashSet<ModelId>,
    failed: HashMap<ModelId, ModelConversionError>,
}

impl<'r> BuildSession<'r> {
    fn new(registry: &'r SchemaRegistry) -> Self {
        Self {
            registry,
            pending: HashMap::new(),
            in_progress: HashSet::new(),
            failed: HashMap::new(),
        }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.registry.settings
    }

    /// Link a nested field to the schema of `model`, building it if needed.
    ///
    /// A model whose build is still in progress is linked by a weak
    /// back-edge.
    pub(crate) fn link(&mut self, model: &Arc<SourceModel>) -> std::result::Result<SchemaLink, ModelConversionError> {
        let id = model.id();
        if let Some(err) = self.failed.get(&id) {
            return Err(err.clone());
        }
        if let Some(schema) = self.pending.get(&id) {
            if self.in_progress.contains(&id) {
                return Ok(SchemaLink::back_edge(schema));
            }
            return Ok(SchemaLink::strong(schema));
        }
        if let Some(schema) = self.registry.lookup(id) {
            return Ok(SchemaLink::strong(&schema));
        }
        self.build(model).map(|schema| SchemaLink::strong(&schema))
    }

    /// Reserve, convert and populate the schema of `model`.
    ///
    /// The stored bundle is resolved against the settings default; the
    /// enclosing bundle of a nested use applies at validation time.
    pub(crate) fn build(
        &mut self,
        model: &Arc<SourceModel>,
    ) -> std::result::Result<Arc<DerivedSchema>, ModelConversionError> {
        let id = model.id();
        let config = resolve_config(model, self.registry.settings.default_config);
        let schema = DerivedSchema::reserve(
            Arc::clone(model),
            config,
            Arc::clone(&self.registry.settings),
            false,
        );
        self.pending.insert(id, Arc::clone(&schema));
        self.in_progress.insert(id);
        debug!(model = model.name(), "reserved derived schema");

        let mut warnings = WarningTracker::new(model.name());
        let mut fields = Vec::with_capacity(model.fields().len());
        let mut failures: Vec<FieldConversionError> = Vec::new();
        for descriptor in model.fields() {
            let mut ctx = ConversionContext {
                session: &mut *self,
                warnings: &mut warnings,
                field: descriptor.name().to_string(),
            };
            match convert_field(descriptor, &mut ctx) {
                Ok(field) => fields.push(field),
                Err(failure) => failures.push(failure),
            }
        }
        self.in_progress.remove(&id);

        if !failures.is_empty() {
            let err = ModelConversionError::new(model.name(), failures);
            debug!(model = model.name(), failures = err.failures.len(), "derived schema build failed");
            self.pending.remove(&id);
            self.failed.insert(id, err.clone());
            return Err(err);
        }

        schema.populate(fields, warnings.into_items());
        Ok(schema)
    }

    /// Publish every schema built in this session; returns how many
    fn commit(self) -> usize {
        let mut schemas = self.registry.write();
        let count = self.pending.len();
        for (id, schema) in self.pending {
            schemas.entry(id).or_insert_with(|| CacheEntry::new(schema));
        }
        count
    }
}
