//! View layer of the paperscope dashboard: shared selection state,
//! SVG scene construction for the three coordinated views, the force
//! layout, and the coordinator that keeps them in sync.

pub mod dashboard;
pub mod force;
pub mod map;
pub mod nodelink;
pub mod player;
pub mod state;
pub mod svg;
pub mod timeseries;

pub use dashboard::Dashboard;
pub use state::SelectionState;
