//! Chart-spec pipeline: raw backend payloads in, renderer-agnostic chart
//! descriptions out.
//!
//! [`generators`] turn query results plus dataset metadata into a
//! [`spec::ChartSpec`]; [`formatters`] are pure per-spec transformations
//! (coloring, fading, sorting, axis adjustments); [`transformers`] build
//! derived graphs (variable-response scatter, anomaly-from-baseline).
//! Every stage consumes a spec and returns a new one; nothing in this
//! crate mutates shared state.

pub mod formatters;
pub mod generators;
pub mod spec;
pub mod transformers;

pub use spec::{Axis, AxisId, ChartError, ChartSpec, Series, SeriesStyle, TickFormat, XAxis};
