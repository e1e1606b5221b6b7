//! Internal battery reservoirs.

use voltaic_core::fixed::Fixed64;

use crate::draw::BatteryConfig;

/// Charge operations a device's internal battery exposes.
pub trait PowerStorage {
    /// Whether `amount` of charge is available right now.
    fn can_deduct_charge(&self, amount: Fixed64) -> bool;

    /// Remove `amount` of charge.
    fn deduct_charge(&mut self, amount: Fixed64);
}

/// A simple battery. Charge is clamped to `[0, capacity]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Battery {
    capacity: Fixed64,
    charge: Fixed64,
}

impl Battery {
    pub fn new(capacity: Fixed64, charge: Fixed64) -> Self {
        let capacity = capacity.max(Fixed64::ZERO);
        Self {
            capacity,
            charge: charge.clamp(Fixed64::ZERO, capacity),
        }
    }

    pub fn capacity(&self) -> Fixed64 {
        self.capacity
    }

    pub fn charge(&self) -> Fixed64 {
        self.charge
    }

    /// Add charge, returning the amount actually stored.
    pub fn add_charge(&mut self, amount: Fixed64) -> Fixed64 {
        let stored = amount.max(Fixed64::ZERO).min(self.capacity - self.charge);
        self.charge += stored;
        stored
    }
}

impl From<BatteryConfig> for Battery {
    fn from(config: BatteryConfig) -> Self {
        Battery::new(config.capacity, config.charge)
    }
}

impl PowerStorage for Battery {
    fn can_deduct_charge(&self, amount: Fixed64) -> bool {
        self.charge >= amount
    }

    fn deduct_charge(&mut self, amount: Fixed64) {
        self.charge = (self.charge - amount.max(Fixed64::ZERO)).max(Fixed64::ZERO);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(v: f64) -> Fixed64 {
        Fixed64::from_num(v)
    }

    #[test]
    fn new_clamps_charge_to_capacity() {
        let battery = Battery::new(fixed(100.0), fixed(250.0));
        assert_eq!(battery.charge(), fixed(100.0));
    }

    #[test]
    fn can_deduct_exact_charge() {
        let battery = Battery::new(fixed(200.0), fixed(50.0));
        assert!(battery.can_deduct_charge(fixed(50.0)));
        assert!(!battery.can_deduct_charge(fixed(50.5)));
    }

    #[test]
    fn deduct_never_goes_negative() {
        let mut battery = Battery::new(fixed(200.0), fixed(30.0));
        battery.deduct_charge(fixed(50.0));
        assert_eq!(battery.charge(), Fixed64::ZERO);
    }

    #[test]
    fn add_charge_clamps_at_capacity() {
        let mut battery = Battery::new(fixed(100.0), fixed(90.0));
        assert_eq!(battery.add_charge(fixed(25.0)), fixed(10.0));
        assert_eq!(battery.charge(), fixed(100.0));
    }

    #[test]
    fn from_config() {
        let battery: Battery = BatteryConfig {
            capacity: fixed(500.0),
            charge: fixed(200.0),
        }
        .into();
        assert_eq!(battery.capacity(), fixed(500.0));
        assert_eq!(battery.charge(), fixed(200.0));
    }
}
