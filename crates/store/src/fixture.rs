//! JSON catalog fixtures.
//!
//! ```json
//! {
//!   "ads": [{"id": 1, "title": "Banner", "type": "plain", "content": "<b>Hi</b>"}],
//!   "groups": [{"id": 2, "name": "Rotation", "ad_weights": {"1": 5}}],
//!   "placements": [{"id": 3, "slug": "sidebar", "type": "default", "item": "group_2"}]
//! }
//! ```
//!
//! Every record is the entity's stored prop map plus an optional `id`.
//! Records without an id get the next free one.

use std::fs;
use std::path::Path;

use adrotate_core::props::coerce_u64;
use adrotate_core::{AdResult, EntityId};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::memory::MemoryStore;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogFixture {
    pub ads: Vec<Map<String, Value>>,
    pub groups: Vec<Map<String, Value>>,
    pub placements: Vec<Map<String, Value>>,
}

impl CatalogFixture {
    pub fn from_json(json: &str) -> AdResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> AdResult<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Load into a fresh store. Records with explicit ids go in first so
    /// generated ids never collide with them.
    pub fn into_store(self) -> MemoryStore {
        let store = MemoryStore::new();
        let ads = split_ids(self.ads);
        let groups = split_ids(self.groups);
        let placements = split_ids(self.placements);

        let explicit = ads
            .iter()
            .chain(&groups)
            .chain(&placements)
            .filter_map(|(id, _)| *id)
            .max();
        if let Some(max) = explicit {
            store.reserve_id(max);
        }

        let id_for = |id: Option<EntityId>| id.unwrap_or_else(|| store.allocate_id());
        let (ad_count, group_count, placement_count) = (ads.len(), groups.len(), placements.len());
        for (id, data) in ads {
            let id = id_for(id);
            store.restore_ad(id, data);
        }
        for (id, data) in groups {
            let id = id_for(id);
            store.restore_group(id, data);
        }
        for (id, data) in placements {
            let id = id_for(id);
            store.restore_placement(id, data);
        }

        info!(
            ads = ad_count,
            groups = group_count,
            placements = placement_count,
            "catalog loaded"
        );
        store
    }
}

fn split_ids(records: Vec<Map<String, Value>>) -> Vec<(Option<EntityId>, Map<String, Value>)> {
    records
        .into_iter()
        .map(|mut record| {
            let id = record.remove("id").as_ref().and_then(coerce_u64);
            (id, record)
        })
        .collect()
}

impl MemoryStore {
    pub fn from_json(json: &str) -> AdResult<Self> {
        Ok(CatalogFixture::from_json(json)?.into_store())
    }

    pub fn from_path(path: impl AsRef<Path>) -> AdResult<Self> {
        Ok(CatalogFixture::from_path(path)?.into_store())
    }
}
