//! Wireless power providers.

use voltaic_core::fixed::Fixed64;
use voltaic_core::id::DeviceId;
use voltaic_core::position::WorldPosition;

use crate::ledger::{DeviceLoads, LoadLedger};

/// A proximity-based supplier.
///
/// Tracks two device sets: the devices in range (for which it is a
/// candidate) and the devices whose load it actually carries. A device can
/// be in range of many providers but registered with at most one.
#[derive(Debug, Clone)]
pub struct PowerProvider {
    pub position: WorldPosition,
    /// Supply radius.
    pub range: Fixed64,
    /// Whether the provider has power to hand out.
    pub energized: bool,
    in_range: Vec<DeviceId>,
    loads: DeviceLoads,
}

impl PowerProvider {
    pub fn new(position: WorldPosition, range: Fixed64) -> Self {
        Self {
            position,
            range,
            energized: true,
            in_range: Vec::new(),
            loads: DeviceLoads::new(),
        }
    }

    /// Whether a device at `position` is within supply radius.
    pub fn reaches(&self, position: &WorldPosition) -> bool {
        self.position.within(position, self.range)
    }

    /// Devices that currently list this provider as a candidate.
    pub fn in_range(&self) -> &[DeviceId] {
        &self.in_range
    }

    pub(crate) fn mark_in_range(&mut self, device: DeviceId) -> bool {
        if self.in_range.contains(&device) {
            return false;
        }
        self.in_range.push(device);
        true
    }

    pub(crate) fn mark_out_of_range(&mut self, device: DeviceId) -> bool {
        let before = self.in_range.len();
        self.in_range.retain(|d| *d != device);
        self.in_range.len() != before
    }

    pub(crate) fn take_in_range(&mut self) -> Vec<DeviceId> {
        std::mem::take(&mut self.in_range)
    }

    /// Aggregate load of every registered device.
    pub fn total_load(&self) -> Fixed64 {
        self.loads.total()
    }

    pub fn device_count(&self) -> usize {
        self.loads.len()
    }

    pub fn has_device(&self, device: DeviceId) -> bool {
        self.loads.contains(device)
    }

    pub fn devices(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.loads.devices()
    }

    pub fn load_of(&self, device: DeviceId) -> Option<Fixed64> {
        self.loads.load_of(device)
    }
}

impl LoadLedger for PowerProvider {
    fn add_device(&mut self, device: DeviceId, load: Fixed64) {
        tracing::trace!(?device, %load, "provider registered device");
        self.loads.add_device(device, load);
    }

    fn remove_device(&mut self, device: DeviceId) {
        tracing::trace!(?device, "provider deregistered device");
        self.loads.remove_device(device);
    }

    fn update_device(&mut self, device: DeviceId, old_load: Fixed64, new_load: Fixed64) {
        self.loads.update_device(device, old_load, new_load);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn reaches_uses_inclusive_radius() {
        let provider = PowerProvider::new(WorldPosition::from_ints(0, 0), Fixed64::from_num(5));
        assert!(provider.reaches(&WorldPosition::from_ints(3, 4)));
        assert!(!provider.reaches(&WorldPosition::from_ints(4, 4)));
    }

    #[test]
    fn in_range_is_a_set() {
        let mut sm = SlotMap::<DeviceId, ()>::with_key();
        let device = sm.insert(());
        let mut provider = PowerProvider::new(WorldPosition::default(), Fixed64::from_num(1));
        assert!(provider.mark_in_range(device));
        assert!(!provider.mark_in_range(device));
        assert_eq!(provider.in_range(), &[device]);
        assert!(provider.mark_out_of_range(device));
        assert!(!provider.mark_out_of_range(device));
    }

    #[test]
    fn candidacy_and_registration_are_independent() {
        let mut sm = SlotMap::<DeviceId, ()>::with_key();
        let device = sm.insert(());
        let mut provider = PowerProvider::new(WorldPosition::default(), Fixed64::from_num(1));
        provider.mark_in_range(device);
        assert!(!provider.has_device(device));
        provider.add_device(device, Fixed64::from_num(40));
        assert!(provider.has_device(device));
        assert_eq!(provider.total_load(), Fixed64::from_num(40));
    }
}
