//! Selection and rendering of ads, groups and placements.
//!
//! An [`Engine`] is built once with the catalog, registries, hooks and
//! configuration. Each page request opens a [`RenderSession`], which is the
//! invocation surface (`render_ad`, `render_group`, `render_placement`,
//! `inject_content`) and owns the request's stats.

mod ad;
mod debug;
pub mod engine;
mod group;
pub mod injection;
mod placement;
pub mod session;
pub mod shortcode;
pub mod stats;
pub mod types;
pub mod wrapper;

pub use engine::Engine;
pub use session::RenderSession;
pub use stats::{StatsCollector, StatsEntry};
pub use types::{AdType, AdTypeRegistry};
