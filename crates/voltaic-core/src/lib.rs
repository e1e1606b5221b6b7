//! Voltaic Core -- shared primitives for the voltaic power simulation.
//!
//! Every other voltaic crate builds on the types defined here:
//!
//! - [`id`] -- Generational slotmap keys for devices, providers, networks
//!   and nodes. A stale key never aliases a freshly inserted entity.
//! - [`fixed`] -- Q32.32 fixed-point [`fixed::Fixed64`] used for loads,
//!   charge, ranges and coordinates so results are identical on every
//!   platform.
//! - [`position`] -- 2D world positions and squared-distance queries used
//!   for nearest-provider arbitration.

pub mod fixed;
pub mod id;
pub mod position;
