//! Core domain for ad selection and rendering: identifiers, configuration,
//! the entity attribute container, hooks, and storage contracts.

pub mod args;
pub mod condition;
pub mod config;
pub mod context;
pub mod entity;
pub mod error;
pub mod hooks;
pub mod props;
pub mod storage;
pub mod types;

pub use args::{LabelMode, RenderArgs, RenderMethod};
pub use condition::{Condition, Connector, MobileRule};
pub use config::AppConfig;
pub use context::RequestContext;
pub use entity::{Ad, Group, GroupType, Placement, PlacementTypeRegistry};
pub use error::{AdError, AdResult};
pub use hooks::{HookRegistry, Override};
pub use props::{PropContext, Props};
pub use storage::Catalog;
pub use types::{AdCount, AdWeights, EntityId, EntityKind, EntitySummary, ItemKind, ItemRef, Position};
