//! # SIGNET
//!
//! Host-facing crate: re-exports the ECS and drives it frame by frame.
//!
//! ```text
//! GameLoop::run_frame
//!   ├─ measure and clamp delta time
//!   ├─ World::input(dt)
//!   ├─ World::update(dt)      (frame counter advances here)
//!   ├─ World::draw()
//!   └─ record FrameStats, warn when over budget
//! ```
//!
//! ## Modules
//!
//! - `game_loop`: Frame orchestration and timing

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod game_loop;

pub use signet_core as core;

pub use game_loop::{FrameStats, FrameStatsAccumulator, GameLoop, GameLoopConfig};
