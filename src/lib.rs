//! **Haptick** — force/torque transform engine for a Stewart-platform
//! force sensor.
//!
//! This crate implements:
//!
//! 1. **Geometry** (`geometry`): joint layout, strut pairing, Plücker matrix and its inverse.
//! 2. **Statics** (`statics`): applied wrench ↔ six strut forces, single and batched.
//! 3. **Objectives** (`objectives`): force-sensing evenness score over a sphere of test loads.
//! 4. **Optimiser** (`optimizer`): particle-swarm geometry search via `argmin`.
//! 5. **Acquisition** (`acquisition`): low-pass filtering and bias correction of raw samples.
//! 6. **FFI** (`ffi`): C-compatible API for the monitor GUI.

pub mod types;
pub mod geometry;
pub mod statics;
pub mod objectives;
pub mod optimizer;
pub mod acquisition;
pub mod ffi;
