mod hash;
mod iter;
mod region;

pub use hash::SimIndex;
pub use iter::EntityIter;
pub use region::{begin_sim, end_sim, SimRegion, SimRegionReport, DEFAULT_MAX_SIM_ENTITIES};
