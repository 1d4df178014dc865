//! Data core for the paperscope dashboard: record types, the archive
//! loader, geographic identity resolution, topology decoding and the
//! metric/scale machinery the views are built on.

pub mod geo;
pub mod metrics;
pub mod project;
pub mod scale;
pub mod stowage;
pub mod structs;
pub mod topo;

pub const START_YEAR: u16 = 2010;
pub const END_YEAR: u16 = 2025;

pub use metrics::ViewMode;
pub use stowage::{Archive, LoadError};
