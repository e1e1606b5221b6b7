//! Power distribution for voltaic devices.
//!
//! Every consuming entity carries a [`PowerDevice`] that draws from exactly
//! one source at a time: a wired network reached through its node, a
//! wireless provider in range, or nothing. An internal battery covers the
//! device when neither is supplying it.
//!
//! # Design
//!
//! - The device is the only writer of its own connection state; every
//!   source is the only writer of its own aggregate load. They talk through
//!   the [`LoadLedger`] contract, reporting load changes as old/new pairs.
//! - Devices reach their collaborators through a [`PowerPeers`] view, so the
//!   state machine in [`device`] has no ownership ties to them.
//! - [`PowerModule`] owns everything in slotmaps, turns topology changes
//!   into node events and range updates, and runs the per-tick supply and
//!   battery passes.
//! - Events fire only on *transitions* of a device's combined powered state.

pub mod device;
pub mod draw;
pub mod error;
pub mod event;
pub mod ledger;
pub mod module;
pub mod network;
pub mod node;
pub mod peers;
pub mod provider;
pub mod storage;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use device::{NOT_POWERED_TEXT, PowerDevice};
pub use draw::{BatteryConfig, Connection, DeviceConfig, DeviceKind, DrawType, PowerPriority};
pub use error::PowerError;
pub use event::{ListenerHandle, PowerEvent, PowerEventBus, PowerListener};
pub use ledger::{DeviceLoads, LoadLedger, NetworkLedger};
pub use module::PowerModule;
pub use network::Powernet;
pub use node::{NodeEvent, NodeSubscription, PowerNode};
pub use peers::PowerPeers;
pub use provider::PowerProvider;
pub use storage::{Battery, PowerStorage};
