//! Process-wide gamut table store.
//!
//! Each (model, color space) key resolves once per store: memory, then the
//! disk cache, then generation (persisted best effort). Tables are never
//! evicted. The map lock is held only to find or insert a key's slot, so a
//! slow build blocks callers of that key and nobody else.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::appearance::PerceptualModel;
use crate::color_management::ColorRegistry;
use crate::config::GamutConfig;
use crate::gamut::{GamutTable, LocusDataset, cache, generate_table, table_key};

type Slot = Arc<OnceLock<Arc<GamutTable>>>;

/// Lazily built, shared gamut tables.
pub struct GamutStore {
    registry: Arc<ColorRegistry>,
    config: GamutConfig,
    locus: LocusDataset,
    tables: Mutex<HashMap<String, Slot>>,
}

impl GamutStore {
    pub fn new(registry: Arc<ColorRegistry>, config: GamutConfig) -> Self {
        Self::with_locus(registry, config, LocusDataset::empty())
    }

    pub fn with_locus(
        registry: Arc<ColorRegistry>,
        config: GamutConfig,
        locus: LocusDataset,
    ) -> Self {
        Self {
            registry,
            config: config.sanitized(),
            locus,
            tables: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ColorRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &GamutConfig {
        &self.config
    }

    /// The table for (`model`, `space`), built on first request.
    ///
    /// Never fails: an unknown space or a failed build yields an empty table,
    /// whose queries report "no compression".
    pub fn table(&self, model: PerceptualModel, space: &str) -> Arc<GamutTable> {
        let key = table_key(model, space);
        let slot = {
            let mut tables = self.tables.lock();
            tables.entry(key.clone()).or_default().clone()
        };
        slot.get_or_init(|| Arc::new(self.resolve(model, space, &key)))
            .clone()
    }

    /// Whether the key has already resolved in memory.
    pub fn is_loaded(&self, model: PerceptualModel, space: &str) -> bool {
        self.tables
            .lock()
            .get(&table_key(model, space))
            .is_some_and(|slot| slot.get().is_some())
    }

    fn resolve(&self, model: PerceptualModel, space: &str, key: &str) -> GamutTable {
        if let Err(e) = self.registry.color_space(space) {
            warn!(key, error = %e, "no such color space, gamut compression disabled");
            return GamutTable::empty(model, space);
        }

        let resolution = (
            self.config.resolution_j,
            self.config.resolution_s,
            self.config.resolution_h,
        );
        let cache_dir = self.config.cache_location();

        if let Some(dir) = &cache_dir {
            match cache::load_table(dir, model, space, resolution) {
                Ok(table) => {
                    debug!(key, path = %dir.display(), "gamut table loaded from cache");
                    return table;
                }
                Err(e) => debug!(key, error = %e, "gamut cache miss"),
            }
        }

        let start = Instant::now();
        let table = match generate_table(&self.registry, model, space, &self.config, &self.locus) {
            Ok(table) => table,
            Err(e) => {
                warn!(key, error = %e, "gamut table generation failed");
                return GamutTable::empty(model, space);
            }
        };
        info!(
            key,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "generated gamut table"
        );

        if let Some(dir) = &cache_dir {
            match cache::save_table(&table, dir) {
                Ok(path) => debug!(key, path = %path.display(), "gamut table saved"),
                Err(e) => debug!(key, error = %e, "gamut table not saved"),
            }
        }
        table
    }
}
