//! Group rotation: weighted random and weight-ordered member selection with
//! an injectable random source.

pub mod selector;

pub use selector::WeightedSelector;
