//! Integration test: a small station grid.
//!
//! Devices are defined in a RON prototype file, spawned into a
//! `PowerModule`, and pushed through the topology changes a running station
//! sees: wiring and unwiring, generator loss, provider failover, network
//! merges and teardown. Every step checks that each device's load sits on
//! exactly one source.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use voltaic_core::fixed::{Fixed64, f64_to_fixed64};
use voltaic_core::id::{DeviceId, NodeId};
use voltaic_core::position::WorldPosition;
use voltaic_data::{DevicePrototypes, Format, parse_device_prototypes};
use voltaic_power::{Connection, NOT_POWERED_TEXT, PowerEvent, PowerModule};

const PROTOTYPES: &str = r#"
[
    (name: "fridge", kind: appliance, load: 100.0),
    (name: "lamp", kind: fixture, load: 10.0),
    (name: "radio", kind: portable, load: 5.0),
    (
        name: "scanner",
        kind: essential,
        load: 120.0,
        battery: Some((capacity: 600.0)),
    ),
]
"#;

fn prototypes() -> DevicePrototypes {
    parse_device_prototypes(PROTOTYPES, Format::Ron, Path::new("station.ron")).unwrap()
}

fn fixed(v: f64) -> Fixed64 {
    f64_to_fixed64(v)
}

fn at(x: i32, y: i32) -> WorldPosition {
    WorldPosition::from_ints(x, y)
}

fn spawn(module: &mut PowerModule, protos: &DevicePrototypes, name: &str, pos: WorldPosition) -> DeviceId {
    module.spawn_device(protos.get(name).unwrap(), pos)
}

fn node_of(module: &PowerModule, device: DeviceId) -> NodeId {
    module.device(device).unwrap().node().unwrap()
}

fn powered_events(events: &[PowerEvent]) -> Vec<(DeviceId, bool)> {
    events
        .iter()
        .map(|event| match *event {
            PowerEvent::PoweredChanged { device, powered, .. } => (device, powered),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Wired precedence and fallback
// ---------------------------------------------------------------------------

#[test]
fn wired_network_takes_over_from_provider_and_hands_back() {
    let protos = prototypes();
    let mut module = PowerModule::new();
    let provider = module.create_provider(at(0, 0), fixed(20.0));
    let fridge = spawn(&mut module, &protos, "fridge", at(5, 0));

    assert_eq!(module.device(fridge).unwrap().connected(), Connection::Provider);
    assert_eq!(module.provider(provider).unwrap().total_load(), fixed(100.0));

    let net = module.create_network();
    module.set_network_energized(net, true).unwrap();
    module.attach_node(node_of(&module, fridge), net).unwrap();

    let device = module.device(fridge).unwrap();
    assert_eq!(device.connected(), Connection::Node);
    assert_eq!(device.provider(), None);
    assert_eq!(module.provider(provider).unwrap().total_load(), Fixed64::ZERO);
    assert_eq!(module.network(net).unwrap().total_load(), fixed(100.0));

    module.detach_node(node_of(&module, fridge)).unwrap();

    assert_eq!(module.device(fridge).unwrap().connected(), Connection::Provider);
    assert_eq!(module.network(net).unwrap().total_load(), Fixed64::ZERO);
    assert_eq!(module.provider(provider).unwrap().total_load(), fixed(100.0));
}

#[test]
fn generator_loss_unpowers_wired_device() {
    let protos = prototypes();
    let mut module = PowerModule::new();
    let lamp = spawn(&mut module, &protos, "lamp", at(0, 0));
    let net = module.create_network();
    module.set_network_energized(net, true).unwrap();
    module.attach_node(node_of(&module, lamp), net).unwrap();

    let events = module.tick(1);
    assert_eq!(powered_events(&events), vec![(lamp, true)]);
    assert_eq!(module.examine(lamp).unwrap(), None);

    module.set_network_energized(net, false).unwrap();
    let events = module.tick(1);
    assert_eq!(powered_events(&events), vec![(lamp, false)]);
    assert_eq!(module.examine(lamp).unwrap(), Some(NOT_POWERED_TEXT));

    // Still registered: losing generation is not losing the connection.
    assert_eq!(module.device(lamp).unwrap().connected(), Connection::Node);
    assert_eq!(module.network(net).unwrap().total_load(), fixed(10.0));
}

// ---------------------------------------------------------------------------
// Provider failover
// ---------------------------------------------------------------------------

#[test]
fn portable_device_fails_over_between_providers() {
    let protos = prototypes();
    let mut module = PowerModule::new();
    let near = module.create_provider(at(3, 0), fixed(10.0));
    let far = module.create_provider(at(8, 0), fixed(10.0));
    let radio = spawn(&mut module, &protos, "radio", at(0, 0));

    let device = module.device(radio).unwrap();
    assert!(device.node().is_none());
    assert_eq!(device.available_providers(), &[near, far]);
    assert_eq!(device.provider(), Some(near));

    module.despawn_provider(near).unwrap();
    assert_eq!(module.device(radio).unwrap().provider(), Some(far));
    assert_eq!(module.provider(far).unwrap().total_load(), fixed(5.0));

    module.move_provider(far, at(50, 0)).unwrap();
    let device = module.device(radio).unwrap();
    assert_eq!(device.connected(), Connection::None);
    assert!(device.available_providers().is_empty());
    assert_eq!(module.provider(far).unwrap().total_load(), Fixed64::ZERO);
}

#[test]
fn moving_device_switches_to_nearest_provider() {
    let protos = prototypes();
    let mut module = PowerModule::new();
    let west = module.create_provider(at(-10, 0), fixed(30.0));
    let east = module.create_provider(at(10, 0), fixed(30.0));
    let radio = spawn(&mut module, &protos, "radio", at(-5, 0));
    assert_eq!(module.device(radio).unwrap().provider(), Some(west));

    module.move_device(radio, at(6, 0)).unwrap();

    assert_eq!(module.device(radio).unwrap().provider(), Some(east));
    assert_eq!(module.provider(west).unwrap().device_count(), 0);
    assert_eq!(module.provider(east).unwrap().device_count(), 1);
}

// ---------------------------------------------------------------------------
// Battery fallback
// ---------------------------------------------------------------------------

#[test]
fn essential_device_runs_on_battery_until_wired() {
    let protos = prototypes();
    let mut module = PowerModule::new();
    let scanner = spawn(&mut module, &protos, "scanner", at(0, 0));
    assert_eq!(module.battery(scanner).unwrap().charge(), fixed(600.0));

    let events = module.tick(1);
    assert_eq!(powered_events(&events), vec![(scanner, true)]);
    assert_eq!(module.battery(scanner).unwrap().charge(), fixed(480.0));

    // Exactly enough for four more ticks.
    assert!(module.tick(4).is_empty());
    assert_eq!(module.battery(scanner).unwrap().charge(), Fixed64::ZERO);

    let events = module.tick(1);
    assert_eq!(powered_events(&events), vec![(scanner, false)]);
    assert_eq!(module.current_tick(), 6);

    let net = module.create_network();
    module.set_network_energized(net, true).unwrap();
    module.attach_node(node_of(&module, scanner), net).unwrap();
    module.battery_mut(scanner).unwrap().add_charge(fixed(300.0));

    let events = module.tick(1);
    assert_eq!(powered_events(&events), vec![(scanner, true)]);
    let device = module.device(scanner).unwrap();
    assert!(device.external_powered());
    assert!(device.internal_powered());
    // Wired supply spares the battery.
    assert_eq!(module.battery(scanner).unwrap().charge(), fixed(300.0));
}

// ---------------------------------------------------------------------------
// Network topology
// ---------------------------------------------------------------------------

#[test]
fn merge_moves_registrations_and_remove_releases_them() {
    let protos = prototypes();
    let mut module = PowerModule::new();
    let a = spawn(&mut module, &protos, "scanner", at(0, 0));
    let b = spawn(&mut module, &protos, "fridge", at(100, 100));
    let west = module.create_network();
    let east = module.create_network();
    module.set_network_energized(east, true).unwrap();
    module.attach_node(node_of(&module, a), west).unwrap();
    module.attach_node(node_of(&module, b), east).unwrap();

    module.merge_networks(west, east).unwrap();

    assert!(module.network(east).is_none());
    let merged = module.network(west).unwrap();
    assert!(merged.energized);
    assert_eq!(merged.nodes().len(), 2);
    assert_eq!(merged.device_count(), 2);
    assert_eq!(merged.total_load(), fixed(220.0));
    assert_eq!(module.node(node_of(&module, b)).unwrap().parent(), Some(west));

    module.remove_network(west).unwrap();

    assert!(module.network(west).is_none());
    for device in [a, b] {
        assert_eq!(module.device(device).unwrap().connected(), Connection::None);
        assert_eq!(module.node(node_of(&module, device)).unwrap().parent(), None);
    }
}

#[test]
fn regenerate_keeps_single_registration() {
    let protos = prototypes();
    let mut module = PowerModule::new();
    let fridge = spawn(&mut module, &protos, "fridge", at(0, 0));
    let net = module.create_network();
    module.attach_node(node_of(&module, fridge), net).unwrap();

    module.regenerate_network(net).unwrap();
    module.regenerate_network(net).unwrap();

    let network = module.network(net).unwrap();
    assert_eq!(network.device_count(), 1);
    assert_eq!(network.total_load(), fixed(100.0));
}

// ---------------------------------------------------------------------------
// Listeners and teardown
// ---------------------------------------------------------------------------

#[test]
fn listeners_hear_transitions_until_released() {
    let protos = prototypes();
    let mut module = PowerModule::new();
    module.create_provider(at(0, 0), fixed(10.0));
    let fridge = spawn(&mut module, &protos, "fridge", at(1, 1));

    let heard = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&heard);
    let handle = module.subscribe(Box::new(move |event| sink.borrow_mut().push(*event)));

    module.tick(1);
    module.set_external_powered(fridge, false).unwrap();
    assert_eq!(powered_events(&heard.borrow()), vec![(fridge, true), (fridge, false)]);

    assert!(module.unsubscribe(handle));
    module.tick(1);
    assert_eq!(heard.borrow().len(), 2);

    // The history still saw everything.
    assert_eq!(module.drain_events().len(), 3);
    assert!(module.drain_events().is_empty());
}

#[test]
fn despawn_releases_all_registrations() {
    let protos = prototypes();
    let mut module = PowerModule::new();
    let provider = module.create_provider(at(0, 0), fixed(10.0));
    let fridge = spawn(&mut module, &protos, "fridge", at(0, 0));
    let lamp = spawn(&mut module, &protos, "lamp", at(2, 0));
    let net = module.create_network();
    module.attach_node(node_of(&module, lamp), net).unwrap();
    let lamp_node = node_of(&module, lamp);

    module.despawn_device(fridge).unwrap();
    module.despawn_device(lamp).unwrap();

    assert_eq!(module.device_count(), 0);
    assert_eq!(module.provider(provider).unwrap().total_load(), Fixed64::ZERO);
    assert!(module.provider(provider).unwrap().in_range().is_empty());
    assert_eq!(module.network(net).unwrap().device_count(), 0);
    assert!(module.network(net).unwrap().nodes().is_empty());
    assert!(module.node(lamp_node).is_none());
    assert!(module.despawn_device(fridge).is_err());
}
