//! Load-accounting contracts between devices and the sources supplying them.
//!
//! A source (wired network or wireless provider) is the sole writer of its
//! own aggregate. Devices only ever talk to it through [`LoadLedger`]:
//! register, deregister, and report a load change as an old/new pair so the
//! source can adjust its total by delta instead of re-summing.

use slotmap::SecondaryMap;
use voltaic_core::fixed::Fixed64;
use voltaic_core::id::DeviceId;

/// The add/remove/update contract every power source implements.
pub trait LoadLedger {
    /// Register `device` drawing `load`.
    fn add_device(&mut self, device: DeviceId, load: Fixed64);

    /// Deregister `device`. Unknown devices are ignored.
    fn remove_device(&mut self, device: DeviceId);

    /// `device` changed its draw from `old_load` to `new_load`.
    fn update_device(&mut self, device: DeviceId, old_load: Fixed64, new_load: Fixed64);
}

/// A wired network additionally answers membership queries.
pub trait NetworkLedger: LoadLedger {
    fn has_device(&self, device: DeviceId) -> bool;
}

/// Per-device loads plus a running total, shared by the reference sources.
#[derive(Debug, Clone, Default)]
pub struct DeviceLoads {
    loads: SecondaryMap<DeviceId, Fixed64>,
    total: Fixed64,
}

impl DeviceLoads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of all registered loads.
    pub fn total(&self) -> Fixed64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.loads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loads.is_empty()
    }

    pub fn contains(&self, device: DeviceId) -> bool {
        self.loads.contains_key(device)
    }

    /// The load `device` was last registered with.
    pub fn load_of(&self, device: DeviceId) -> Option<Fixed64> {
        self.loads.get(device).copied()
    }

    pub fn devices(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.loads.keys()
    }
}

impl LoadLedger for DeviceLoads {
    fn add_device(&mut self, device: DeviceId, load: Fixed64) {
        // Re-registration replaces the previous entry rather than double counting.
        if let Some(previous) = self.loads.insert(device, load) {
            self.sub_from_total(previous);
        }
        self.add_to_total(load);
    }

    fn remove_device(&mut self, device: DeviceId) {
        if let Some(load) = self.loads.remove(device) {
            self.sub_from_total(load);
        }
    }

    /// The delta is taken from the stored entry; `old_load` is only checked.
    fn update_device(&mut self, device: DeviceId, old_load: Fixed64, new_load: Fixed64) {
        let Some(entry) = self.loads.get_mut(device) else {
            tracing::warn!(?device, "load update for unregistered device ignored");
            return;
        };
        let stored = std::mem::replace(entry, new_load);
        if stored != old_load {
            tracing::warn!(?device, %stored, %old_load, "load update disagrees with ledger");
        }
        self.sub_from_total(stored);
        self.add_to_total(new_load);
    }
}

impl DeviceLoads {
    /// The total is clamped to `[0, Fixed64::MAX]`; once clamped it no
    /// longer equals the sum of entries.
    fn add_to_total(&mut self, load: Fixed64) {
        match self.total.checked_add(load) {
            Some(total) => self.total = total,
            None => {
                tracing::warn!(total = %self.total, %load, "aggregate load saturated");
                self.total = Fixed64::MAX;
            }
        }
    }

    fn sub_from_total(&mut self, load: Fixed64) {
        self.total = self.total.saturating_sub(load).max(Fixed64::ZERO);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn fixed(v: f64) -> Fixed64 {
        Fixed64::from_num(v)
    }

    fn make_device_ids(count: usize) -> Vec<DeviceId> {
        let mut sm = SlotMap::<DeviceId, ()>::with_key();
        (0..count).map(|_| sm.insert(())).collect()
    }

    #[test]
    fn total_tracks_adds_and_removes() {
        let ids = make_device_ids(2);
        let mut loads = DeviceLoads::new();
        loads.add_device(ids[0], fixed(100.0));
        loads.add_device(ids[1], fixed(50.0));
        assert_eq!(loads.total(), fixed(150.0));
        loads.remove_device(ids[0]);
        assert_eq!(loads.total(), fixed(50.0));
        assert_eq!(loads.len(), 1);
    }

    #[test]
    fn update_applies_delta() {
        let ids = make_device_ids(2);
        let mut loads = DeviceLoads::new();
        loads.add_device(ids[0], fixed(100.0));
        loads.add_device(ids[1], fixed(20.0));
        loads.update_device(ids[0], fixed(100.0), fixed(150.0));
        assert_eq!(loads.total(), fixed(170.0));
        assert_eq!(loads.load_of(ids[0]), Some(fixed(150.0)));
    }

    #[test]
    fn re_adding_does_not_double_count() {
        let ids = make_device_ids(1);
        let mut loads = DeviceLoads::new();
        loads.add_device(ids[0], fixed(10.0));
        loads.add_device(ids[0], fixed(30.0));
        assert_eq!(loads.total(), fixed(30.0));
        assert_eq!(loads.len(), 1);
    }

    #[test]
    fn removing_unknown_device_is_noop() {
        let ids = make_device_ids(2);
        let mut loads = DeviceLoads::new();
        loads.add_device(ids[0], fixed(10.0));
        loads.remove_device(ids[1]);
        assert_eq!(loads.total(), fixed(10.0));
    }

    #[test]
    fn total_saturates_instead_of_overflowing() {
        let ids = make_device_ids(2);
        let mut loads = DeviceLoads::new();
        let big = fixed(1.5e9);
        loads.add_device(ids[0], big);
        loads.add_device(ids[1], big);
        assert_eq!(loads.total(), Fixed64::MAX);

        loads.update_device(ids[1], big, Fixed64::MAX);
        assert_eq!(loads.total(), Fixed64::MAX);
        assert_eq!(loads.load_of(ids[1]), Some(Fixed64::MAX));

        loads.remove_device(ids[1]);
        loads.remove_device(ids[0]);
        assert_eq!(loads.total(), Fixed64::ZERO);
        assert!(loads.is_empty());
    }

    #[test]
    fn update_uses_stored_load_for_delta() {
        let ids = make_device_ids(1);
        let mut loads = DeviceLoads::new();
        loads.add_device(ids[0], fixed(100.0));
        loads.update_device(ids[0], fixed(70.0), fixed(40.0));
        assert_eq!(loads.total(), fixed(40.0));
    }

    #[test]
    fn update_for_unregistered_device_is_ignored() {
        let ids = make_device_ids(1);
        let mut loads = DeviceLoads::new();
        loads.update_device(ids[0], fixed(0.0), fixed(40.0));
        assert!(loads.is_empty());
        assert_eq!(loads.total(), Fixed64::ZERO);
    }
}
