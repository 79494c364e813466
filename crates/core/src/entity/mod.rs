pub mod ad;
pub mod group;
pub mod placement;

pub use ad::Ad;
pub use group::{Group, GroupType};
pub use placement::{
    InjectAt, InjectionOptions, Placement, PlacementOptions, PlacementType, PlacementTypeRegistry,
};
