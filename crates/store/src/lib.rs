//! In-memory storage collaborator for ads, groups and placements, loadable
//! from a JSON catalog fixture.

pub mod fixture;
pub mod memory;

pub use fixture::CatalogFixture;
pub use memory::MemoryStore;
