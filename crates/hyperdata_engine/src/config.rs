//! Configuration for the cache and synchronizer.

use crate::diff::{default_comparators, Comparator};
use crate::resolver::{PassthroughResolver, UriResolver};
use hyperdata_protocol::rel;
use std::fmt;
use std::sync::Arc;

/// Configuration for [`Cache`](crate::Cache).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Re-fetch hydrated resources on every get.
    pub force_load: bool,
    /// Relation naming a collection's create form.
    pub create_form_rel: String,
    /// Relation naming a resource's edit form.
    pub edit_form_rel: String,
}

impl CacheConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            force_load: false,
            create_form_rel: rel::CREATE_FORM.to_owned(),
            edit_form_rel: rel::EDIT_FORM.to_owned(),
        }
    }

    /// Sets whether gets always re-fetch.
    pub fn with_force_load(mut self, force_load: bool) -> Self {
        self.force_load = force_load;
        self
    }

    /// Sets the create-form relation name.
    pub fn with_create_form_rel(mut self, rel: impl Into<String>) -> Self {
        self.create_form_rel = rel.into();
        self
    }

    /// Sets the edit-form relation name.
    pub fn with_edit_form_rel(mut self, rel: impl Into<String>) -> Self {
        self.edit_form_rel = rel.into();
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-call options threaded through a synchronization pass.
///
/// Cloning is cheap; the resolver and comparators are shared.
#[derive(Clone)]
pub struct SyncOptions {
    /// Differencer phase concurrency: `None` or `Some(0)` runs each phase
    /// concurrently, any other value runs items one at a time.
    pub batch_size: Option<usize>,
    /// Resolver scoped to this pass.
    pub resolver: Arc<dyn UriResolver>,
    /// Comparators in priority order, most specific first.
    pub comparators: Vec<Arc<dyn Comparator>>,
    /// Treat the collection being synced as a membership list: create links
    /// an existing resource, delete unlinks it. Reset for nested steps.
    pub contribute_only: bool,
    depth: usize,
}

impl SyncOptions {
    /// Creates options with a passthrough resolver and default comparators.
    pub fn new() -> Self {
        Self {
            batch_size: None,
            resolver: Arc::new(PassthroughResolver),
            comparators: default_comparators(),
            contribute_only: false,
            depth: 0,
        }
    }

    /// Sets the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Sets the resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn UriResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replaces the comparator list.
    pub fn with_comparators(mut self, comparators: Vec<Arc<dyn Comparator>>) -> Self {
        self.comparators = comparators;
        self
    }

    /// Sets contribute-only handling.
    pub fn with_contribute_only(mut self, contribute_only: bool) -> Self {
        self.contribute_only = contribute_only;
        self
    }

    /// Returns true when phases run one item at a time.
    pub fn is_sequential(&self) -> bool {
        matches!(self.batch_size, Some(n) if n > 0)
    }

    /// Returns true inside a sync step, false for a top-level call.
    pub fn is_nested(&self) -> bool {
        self.depth > 0
    }

    /// Options for a step one level below this call.
    ///
    /// Contribute-only handling belongs to the collection that asked for it
    /// and is not inherited by its items' steps.
    pub(crate) fn nested(&self) -> Self {
        Self {
            depth: self.depth + 1,
            contribute_only: false,
            ..self.clone()
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SyncOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOptions")
            .field("batch_size", &self.batch_size)
            .field(
                "comparators",
                &self.comparators.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .field("contribute_only", &self.contribute_only)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_config_builder() {
        let config = CacheConfig::new()
            .with_force_load(true)
            .with_create_form_rel("create")
            .with_edit_form_rel("edit");

        assert!(config.force_load);
        assert_eq!(config.create_form_rel, "create");
        assert_eq!(config.edit_form_rel, "edit");

        let default = CacheConfig::default();
        assert!(!default.force_load);
        assert_eq!(default.create_form_rel, "create-form");
        assert_eq!(default.edit_form_rel, "edit-form");
    }

    #[test]
    fn sync_options_batching() {
        assert!(!SyncOptions::new().is_sequential());
        assert!(!SyncOptions::new().with_batch_size(0).is_sequential());
        assert!(SyncOptions::new().with_batch_size(1).is_sequential());
    }

    #[test]
    fn nested_options_reset_contribute_only() {
        let options = SyncOptions::new().with_batch_size(2).with_contribute_only(true);
        assert!(!options.is_nested());

        let nested = options.nested();
        assert!(nested.is_nested());
        assert_eq!(nested.batch_size, Some(2));
        assert!(!nested.contribute_only);
        assert!(Arc::ptr_eq(&nested.resolver, &options.resolver));
    }

    #[test]
    fn sync_options_defaults() {
        let options = SyncOptions::default();
        assert_eq!(options.comparators.len(), 3);
        assert!(!options.contribute_only);
        assert_eq!(options.resolver.resolve("http://x/1"), "http://x/1");

        let debug = format!("{options:?}");
        assert!(debug.contains("link-relation"));
        assert!(debug.contains("name"));
    }
}
