//! Thread-safe in-memory catalog backed by DashMap.
//!
//! Entities are kept as committed prop maps and rebuilt on every read, so
//! each caller gets its own instance.

use std::sync::atomic::{AtomicU64, Ordering};

use adrotate_core::storage::{AdRepository, DeleteOptions, GroupRepository, PlacementRepository};
use adrotate_core::{Ad, AdError, AdResult, EntityId, Group, ItemRef, Placement};
use dashmap::DashMap;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

type Record = Map<String, Value>;

pub struct MemoryStore {
    ads: DashMap<EntityId, Record>,
    groups: DashMap<EntityId, Record>,
    placements: DashMap<EntityId, Record>,
    next_id: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            ads: DashMap::new(),
            groups: DashMap::new(),
            placements: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Ids are shared across entity kinds.
    pub(crate) fn allocate_id(&self) -> EntityId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub(crate) fn reserve_id(&self, id: EntityId) {
        self.next_id.fetch_max(id.saturating_add(1), Ordering::SeqCst);
    }

    /// Insert a stored record under a fixed id, as loaded from a fixture.
    pub fn restore_ad(&self, id: EntityId, data: Record) {
        self.reserve_id(id);
        self.ads.insert(id, data);
    }

    pub fn restore_group(&self, id: EntityId, data: Record) {
        self.reserve_id(id);
        self.groups.insert(id, data);
    }

    pub fn restore_placement(&self, id: EntityId, data: Record) {
        self.reserve_id(id);
        self.placements.insert(id, data);
    }

    pub fn len(&self) -> usize {
        self.ads.len() + self.groups.len() + self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the ad from every group's weight map.
    fn remove_from_groups(&self, ad_id: EntityId) {
        for mut entry in self.groups.iter_mut() {
            let mut group = Group::from_storage(*entry.key(), entry.value().clone());
            if group.remove_ad(ad_id) {
                group.props_mut().apply_changes();
                *entry.value_mut() = group.props().data().clone();
                debug!(ad_id, group_id = *entry.key(), "ad removed from group");
            }
        }
    }
}

fn sorted<T>(mut items: Vec<(EntityId, T)>) -> Vec<T> {
    items.sort_by_key(|(id, _)| *id);
    items.into_iter().map(|(_, item)| item).collect()
}

impl AdRepository for MemoryStore {
    fn read_ad(&self, id: EntityId) -> Option<Ad> {
        self.ads
            .get(&id)
            .map(|r| Ad::from_storage(id, r.value().clone()))
    }

    fn create_ad(&self, ad: &mut Ad) -> AdResult<EntityId> {
        let id = self.allocate_id();
        let props = ad.props_mut();
        props.set_id(id);
        props.apply_changes();
        props.mark_read();
        self.ads.insert(id, props.data().clone());
        info!(ad_id = id, "ad created");
        Ok(id)
    }

    fn update_ad(&self, ad: &mut Ad) -> AdResult<()> {
        let id = ad.id().ok_or_else(|| AdError::not_found("ad", "unsaved"))?;
        if !self.ads.contains_key(&id) {
            return Err(AdError::not_found("ad", id));
        }
        ad.props_mut().apply_changes();
        self.ads.insert(id, ad.props().data().clone());
        debug!(ad_id = id, "ad updated");
        Ok(())
    }

    /// Without `force` the ad is moved to the trash. A forced delete removes
    /// it and its group memberships.
    fn delete_ad(&self, id: EntityId, options: DeleteOptions) -> AdResult<()> {
        if !options.force {
            let mut record = self.ads.get_mut(&id).ok_or_else(|| AdError::not_found("ad", id))?;
            record.insert("status".to_string(), json!("trash"));
            info!(ad_id = id, "ad trashed");
            return Ok(());
        }
        self.ads
            .remove(&id)
            .ok_or_else(|| AdError::not_found("ad", id))?;
        self.remove_from_groups(id);
        info!(ad_id = id, "ad deleted");
        Ok(())
    }

    fn all_ads(&self) -> Vec<Ad> {
        sorted(
            self.ads
                .iter()
                .map(|r| (*r.key(), Ad::from_storage(*r.key(), r.value().clone())))
                .collect(),
        )
    }

    fn ads_by_type(&self, type_tag: &str) -> Vec<Ad> {
        self.all_ads()
            .into_iter()
            .filter(|ad| ad.type_tag() == type_tag)
            .collect()
    }

    /// Members in weight-map order; stale entries are left out.
    fn ads_by_group_id(&self, group_id: EntityId) -> Vec<Ad> {
        self.read_group(group_id)
            .map(|group| {
                group
                    .ad_weights()
                    .ids()
                    .filter_map(|id| self.read_ad(id))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl GroupRepository for MemoryStore {
    fn read_group(&self, id: EntityId) -> Option<Group> {
        self.groups
            .get(&id)
            .map(|r| Group::from_storage(id, r.value().clone()))
    }

    fn create_group(&self, group: &mut Group) -> AdResult<EntityId> {
        let id = self.allocate_id();
        let props = group.props_mut();
        props.set_id(id);
        props.apply_changes();
        props.mark_read();
        self.groups.insert(id, props.data().clone());
        info!(group_id = id, "group created");
        Ok(id)
    }

    fn update_group(&self, group: &mut Group) -> AdResult<()> {
        let id = group.id().ok_or_else(|| AdError::not_found("group", "unsaved"))?;
        if !self.groups.contains_key(&id) {
            return Err(AdError::not_found("group", id));
        }
        group.props_mut().apply_changes();
        self.groups.insert(id, group.props().data().clone());
        debug!(group_id = id, "group updated");
        Ok(())
    }

    /// Member ads are kept; placements bound to the group resolve to nothing.
    fn delete_group(&self, id: EntityId, _options: DeleteOptions) -> AdResult<()> {
        self.groups
            .remove(&id)
            .ok_or_else(|| AdError::not_found("group", id))?;
        info!(group_id = id, "group deleted");
        Ok(())
    }

    fn all_groups(&self) -> Vec<Group> {
        sorted(
            self.groups
                .iter()
                .map(|r| (*r.key(), Group::from_storage(*r.key(), r.value().clone())))
                .collect(),
        )
    }

    fn groups_by_type(&self, type_tag: &str) -> Vec<Group> {
        self.all_groups()
            .into_iter()
            .filter(|group| group.group_type().as_str() == type_tag)
            .collect()
    }
}

impl PlacementRepository for MemoryStore {
    fn read_placement(&self, id: EntityId) -> Option<Placement> {
        self.placements
            .get(&id)
            .map(|r| Placement::from_storage(id, r.value().clone()))
    }

    fn read_placement_by_slug(&self, slug: &str) -> Option<Placement> {
        self.all_placements()
            .into_iter()
            .find(|placement| placement.props().get_str("slug") == slug)
    }

    fn create_placement(&self, placement: &mut Placement) -> AdResult<EntityId> {
        let id = self.allocate_id();
        let props = placement.props_mut();
        props.set_id(id);
        props.apply_changes();
        props.mark_read();
        self.placements.insert(id, props.data().clone());
        info!(placement_id = id, slug = %placement.slug(), "placement created");
        Ok(id)
    }

    fn update_placement(&self, placement: &mut Placement) -> AdResult<()> {
        let id = placement
            .id()
            .ok_or_else(|| AdError::not_found("placement", "unsaved"))?;
        if !self.placements.contains_key(&id) {
            return Err(AdError::not_found("placement", id));
        }
        placement.props_mut().apply_changes();
        self.placements.insert(id, placement.props().data().clone());
        debug!(placement_id = id, "placement updated");
        Ok(())
    }

    fn delete_placement(&self, id: EntityId, _options: DeleteOptions) -> AdResult<()> {
        self.placements
            .remove(&id)
            .ok_or_else(|| AdError::not_found("placement", id))?;
        info!(placement_id = id, "placement deleted");
        Ok(())
    }

    fn all_placements(&self) -> Vec<Placement> {
        sorted(
            self.placements
                .iter()
                .map(|r| (*r.key(), Placement::from_storage(*r.key(), r.value().clone())))
                .collect(),
        )
    }

    fn placements_by_type(&self, type_tag: &str) -> Vec<Placement> {
        self.all_placements()
            .into_iter()
            .filter(|placement| placement.type_tag() == type_tag)
            .collect()
    }

    fn placements_by_item(&self, item: ItemRef) -> Vec<Placement> {
        self.all_placements()
            .into_iter()
            .filter(|placement| placement.item() == Some(item))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adrotate_core::config::SelectionConfig;
    use adrotate_core::types::EntityStatus;
    use adrotate_core::Catalog;

    fn ad(title: &str) -> Ad {
        let mut ad = Ad::new();
        ad.set_title(title);
        ad.set_content(&format!("<b>{title}</b>"));
        ad
    }

    #[test]
    fn test_create_read_update() {
        let store = MemoryStore::new();
        let mut banner = ad("Banner");
        let id = store.create_ad(&mut banner).unwrap();
        assert_eq!(banner.id(), Some(id));

        let mut stored = store.read_ad(id).unwrap();
        assert_eq!(stored.title(), "Banner");
        stored.set_title("Banner v2");
        assert!(stored.props().has_changes());
        store.update_ad(&mut stored).unwrap();
        assert!(!stored.props().has_changes());
        assert_eq!(store.read_ad(id).unwrap().title(), "Banner v2");
    }

    #[test]
    fn test_update_unknown_fails() {
        let store = MemoryStore::new();
        let mut unsaved = ad("Nope");
        assert!(matches!(
            store.update_ad(&mut unsaved),
            Err(AdError::NotFound { kind: "ad", .. })
        ));
    }

    #[test]
    fn test_trash_then_force_delete_cascades() {
        let store = MemoryStore::new();
        let a = store.create_ad(&mut ad("A")).unwrap();
        let b = store.create_ad(&mut ad("B")).unwrap();

        let selection = SelectionConfig::default();
        let mut group = Group::new();
        group.add_ad(a, Some(3), &selection);
        group.add_ad(b, Some(7), &selection);
        let group_id = store.create_group(&mut group).unwrap();

        store.delete_ad(a, DeleteOptions::default()).unwrap();
        assert_eq!(store.read_ad(a).unwrap().status(), EntityStatus::Trash);
        assert!(store.read_group(group_id).unwrap().has_ad(a));

        store.delete_ad(a, DeleteOptions { force: true }).unwrap();
        assert!(store.read_ad(a).is_none());
        let weights = store.read_group(group_id).unwrap().ad_weights();
        assert_eq!(weights.ids().collect::<Vec<_>>(), vec![b]);
        assert!(store.delete_ad(a, DeleteOptions { force: true }).is_err());
    }

    #[test]
    fn test_finders() {
        let store = MemoryStore::new();
        let a = store.create_ad(&mut ad("A")).unwrap();
        let mut image = ad("Img");
        image.set_type("image");
        store.create_ad(&mut image).unwrap();

        let mut group = Group::new();
        group.add_ad(a, None, &SelectionConfig::default());
        group.add_ad(999, None, &SelectionConfig::default());
        let group_id = store.create_group(&mut group).unwrap();

        let mut sidebar = Placement::new("sidebar_widget", "sidebar").with_item(ItemRef::group(group_id));
        store.create_placement(&mut sidebar).unwrap();
        let mut header = Placement::new("header", "head").with_item(ItemRef::ad(a));
        let header_id = store.create_placement(&mut header).unwrap();

        assert_eq!(store.ads_by_type("image").len(), 1);
        assert_eq!(store.ads_by_group_id(group_id).len(), 1, "stale member skipped");
        assert_eq!(store.placements_by_type("header").len(), 1);
        assert_eq!(store.placements_by_item(ItemRef::ad(a)).len(), 1);
        assert_eq!(store.read_placement_by_slug("sidebar").map(|p| p.slug()), Some("sidebar".into()));
        assert!(store.read_placement_by_slug("missing").is_none());
        assert_eq!(store.read_placement(header_id).map(|p| p.type_tag()), Some("header".into()));

        assert_eq!(store.item_type(ItemRef::ad(a)).as_deref(), Some("plain"));
        assert_eq!(store.item_type(ItemRef::group(group_id)).as_deref(), Some("default"));
    }

    #[test]
    fn test_restore_reserves_ids() {
        let store = MemoryStore::new();
        store.restore_ad(40, Map::new());
        let next = store.create_ad(&mut ad("Next")).unwrap();
        assert_eq!(next, 41);
        assert_eq!(store.len(), 2);
    }
}
