//! Colony gameplay layered over the chunked world: generation, orders, the
//! per-frame update and draw-list assembly.

mod generation;
mod logic;
mod orders;
mod render;
mod specs;
mod state;

pub(crate) use render::draw_list_scratch_bytes;
pub(crate) use specs::WorldObjectSpec;
#[cfg(test)]
pub(crate) use specs::{ResourceKind, WorldObjectType};
pub(crate) use state::{DebugStats, FrameOutput, GameState};
