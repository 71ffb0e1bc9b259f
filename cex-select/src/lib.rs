//! Selection-state helpers for cascading dataset filters and map layers.
//!
//! The UI narrows datasets through a chain of selectors (model, then
//! emissions scenario, then variable, and so on). Until every selector
//! in a chain has settled on a value, no dataset list derived from the
//! chain is trustworthy; [`selection::SelectorState::filter_meta`]
//! returns nothing rather than a plausible-looking wrong answer.

pub mod layers;
pub mod selection;
