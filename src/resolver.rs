//! Lazy resolution of schemas referenced by qualified name.
//!
//! Finalized schemas are registered in a catalogue. A compound field
//! declared against a name looks its target up on first use; successful
//! lookups are cached for the life of the resolver, failures are not.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::{debug, trace, warn};

use crate::error::{DefinitionError, ResolutionError};
use crate::schema::Schema;
use crate::types::Category;

/// Registry of declared schemas plus a cache of resolved references.
#[derive(Debug, Default)]
pub struct ForwardRefResolver {
    catalogue: RwLock<HashMap<String, Arc<Schema>>>,
    cache: RwLock<HashMap<String, Arc<Schema>>>,
    imports: AtomicUsize,
}

static GLOBAL: OnceLock<ForwardRefResolver> = OnceLock::new();

impl ForwardRefResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide resolver that every finalized schema is registered with.
    pub fn global() -> &'static ForwardRefResolver {
        GLOBAL.get_or_init(ForwardRefResolver::new)
    }

    /// Make `schema` resolvable under its qualified name.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateSchema` if the name is already taken.
    pub fn register(&self, schema: Arc<Schema>) -> Result<(), DefinitionError> {
        let mut catalogue = self.catalogue.write().unwrap_or_else(PoisonError::into_inner);
        let name = schema.qualified_name().to_string();
        if catalogue.contains_key(&name) {
            return Err(DefinitionError::DuplicateSchema { name });
        }
        trace!(schema = %name, category = %schema.category(), "registered schema");
        catalogue.insert(name, schema);
        Ok(())
    }

    /// Resolve `name`, checking it belongs to the `expected` category.
    ///
    /// Concurrent first resolutions of one name import it once; every
    /// caller observes the same handle.
    ///
    /// # Errors
    ///
    /// Returns `ResolutionError` if no schema has that name or it is of a
    /// different category. Failures are not cached.
    pub fn resolve(&self, name: &str, expected: Category) -> Result<Arc<Schema>, ResolutionError> {
        let cached = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();
        if let Some(schema) = cached {
            return check_category(name, schema, expected);
        }

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have imported it while we waited for the lock.
        if let Some(schema) = cache.get(name) {
            return check_category(name, Arc::clone(schema), expected);
        }

        self.imports.fetch_add(1, Ordering::SeqCst);
        debug!(schema = %name, "importing schema");
        let found = self
            .catalogue
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();
        let Some(schema) = found else {
            warn!(schema = %name, "unknown schema");
            return Err(ResolutionError::Unknown {
                name: name.to_string(),
            });
        };

        let schema = check_category(name, schema, expected)?;
        cache.insert(name.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Number of cache misses that went to the catalogue.
    pub fn import_count(&self) -> usize {
        self.imports.load(Ordering::SeqCst)
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

fn check_category(
    name: &str,
    schema: Arc<Schema>,
    expected: Category,
) -> Result<Arc<Schema>, ResolutionError> {
    if schema.category() == expected {
        Ok(schema)
    } else {
        warn!(schema = %name, expected = %expected, actual = %schema.category(), "schema of wrong category");
        Err(ResolutionError::WrongCategory {
            name: name.to_string(),
            expected,
            actual: schema.category(),
        })
    }
}
