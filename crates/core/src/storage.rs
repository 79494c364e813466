//! Storage contracts. The render core only ever talks to these traits and
//! never issues queries of its own.

use crate::entity::{Ad, Group, Placement};
use crate::error::AdResult;
use crate::types::{EntityId, ItemRef};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Skip the trash and remove permanently.
    pub force: bool,
}

pub trait AdRepository: Send + Sync {
    fn read_ad(&self, id: EntityId) -> Option<Ad>;
    /// Persist a new ad and return its id.
    fn create_ad(&self, ad: &mut Ad) -> AdResult<EntityId>;
    /// Persist pending changes, then commit them on the entity.
    fn update_ad(&self, ad: &mut Ad) -> AdResult<()>;
    /// Also removes the ad from every group's weight map.
    fn delete_ad(&self, id: EntityId, options: DeleteOptions) -> AdResult<()>;
    fn all_ads(&self) -> Vec<Ad>;
    fn ads_by_type(&self, type_tag: &str) -> Vec<Ad>;
    fn ads_by_group_id(&self, group_id: EntityId) -> Vec<Ad>;
}

pub trait GroupRepository: Send + Sync {
    fn read_group(&self, id: EntityId) -> Option<Group>;
    fn create_group(&self, group: &mut Group) -> AdResult<EntityId>;
    fn update_group(&self, group: &mut Group) -> AdResult<()>;
    fn delete_group(&self, id: EntityId, options: DeleteOptions) -> AdResult<()>;
    fn all_groups(&self) -> Vec<Group>;
    fn groups_by_type(&self, type_tag: &str) -> Vec<Group>;
}

pub trait PlacementRepository: Send + Sync {
    fn read_placement(&self, id: EntityId) -> Option<Placement>;
    fn read_placement_by_slug(&self, slug: &str) -> Option<Placement>;
    fn create_placement(&self, placement: &mut Placement) -> AdResult<EntityId>;
    fn update_placement(&self, placement: &mut Placement) -> AdResult<()>;
    fn delete_placement(&self, id: EntityId, options: DeleteOptions) -> AdResult<()>;
    fn all_placements(&self) -> Vec<Placement>;
    fn placements_by_type(&self, type_tag: &str) -> Vec<Placement>;
    fn placements_by_item(&self, item: ItemRef) -> Vec<Placement>;
}

/// Everything the render core needs from storage.
pub trait Catalog: AdRepository + GroupRepository + PlacementRepository {
    /// Type tag of the entity behind `item`, if it exists.
    fn item_type(&self, item: ItemRef) -> Option<String> {
        match item.kind {
            crate::types::ItemKind::Ad => self.read_ad(item.id).map(|ad| ad.type_tag()),
            crate::types::ItemKind::Group => self
                .read_group(item.id)
                .map(|group| group.group_type().as_str().to_string()),
        }
    }
}

impl<T: AdRepository + GroupRepository + PlacementRepository> Catalog for T {}
