use pf_circuit::CircuitBuilder;
use pf_core::{NodeId, Thermal};
use pf_solver::{CircuitCalculator, SolverConfig};
use pf_transport::{ThermalCompartmentManager, TransportError};

#[test]
fn body_heat_balance_from_thermal_circuit() {
    let mut b = CircuitBuilder::<Thermal>::new("thermo");
    let ambient = b.add_reference_node("ambient", 300.0);
    let core = b.add_node("core");
    let skin = b.add_node("skin");
    b.set_quantity(core, 1000.0).unwrap();
    b.set_quantity(skin, 200.0).unwrap();
    let metabolism = b.add_flux_source("metabolism", ambient, core, 100.0);
    let conduction = b.add_resistor("conduction", core, skin, 0.1);
    let loss = b.add_resistor("loss", skin, ambient, 0.05);
    let mut circuit = b.build().unwrap();

    let mut m = ThermalCompartmentManager::new();
    let body = m.add_compartment("body").unwrap();
    let c_core = m.add_compartment("core").unwrap();
    let c_skin = m.add_compartment("skin").unwrap();
    let env = m.add_compartment("environment").unwrap();
    m.add_child(body, c_core).unwrap();
    m.add_child(body, c_skin).unwrap();
    m.map_node(c_core, core).unwrap();
    m.map_node(c_skin, skin).unwrap();
    m.map_node(env, ambient).unwrap();
    m.add_link("metabolism", env, c_core, Some(metabolism)).unwrap();
    m.add_link("conduction", c_core, c_skin, Some(conduction)).unwrap();
    m.add_link("loss", c_skin, env, Some(loss)).unwrap();

    let mut calc = CircuitCalculator::new(1.0, SolverConfig::default()).unwrap();
    calc.process(&mut circuit).unwrap();
    m.sync_from_circuit(&circuit).unwrap();

    let core_c = m.compartment(c_core).unwrap();
    assert!((core_c.temperature_k().unwrap() - 315.0).abs() < 1e-9);
    assert_eq!(core_c.heat_j(), Some(1000.0));
    let skin_c = m.compartment(c_skin).unwrap();
    assert!((skin_c.temperature_k().unwrap() - 305.0).abs() < 1e-9);
    assert_eq!(m.compartment(env).unwrap().heat_j(), None);

    let body_c = m.compartment(body).unwrap();
    assert_eq!(body_c.heat_j(), Some(1200.0));
    assert!((body_c.temperature_k().unwrap() - 310.0).abs() < 1e-9);

    let link = m.link(m.link_id("conduction").unwrap()).unwrap();
    assert!((link.heat_flow_w() - 100.0).abs() < 1e-9);

    // conduction stays inside the body, so only metabolism and loss cross it
    assert!((m.in_flow_w(body).unwrap() - 100.0).abs() < 1e-9);
    assert!((m.out_flow_w(body).unwrap() - 100.0).abs() < 1e-9);
    assert!((m.in_flow_w(c_skin).unwrap() - 100.0).abs() < 1e-9);
    assert!((m.out_flow_w(env).unwrap() - 100.0).abs() < 1e-9);
}

#[test]
fn reversed_link_flow_counts_as_outflow() {
    let mut b = CircuitBuilder::<Thermal>::new("cooling");
    let ambient = b.add_reference_node("ambient", 300.0);
    let limb = b.add_node("limb");
    // heat drawn out of the limb into the environment
    let draw = b.add_flux_source("draw", limb, ambient, 20.0);
    b.add_resistor("contact", limb, ambient, 0.5);
    let mut circuit = b.build().unwrap();

    let mut m = ThermalCompartmentManager::new();
    let env = m.add_compartment("environment").unwrap();
    let c_limb = m.add_compartment("limb").unwrap();
    m.map_node(env, ambient).unwrap();
    m.map_node(c_limb, limb).unwrap();
    // declared into the limb, flows the other way
    m.add_link("draw", env, c_limb, Some(draw)).unwrap();

    let mut calc = CircuitCalculator::new(1.0, SolverConfig::default()).unwrap();
    calc.process(&mut circuit).unwrap();
    m.sync_from_circuit(&circuit).unwrap();

    let link = m.link(m.link_id("draw").unwrap()).unwrap();
    assert!((link.heat_flow_w() + 20.0).abs() < 1e-9);
    assert_eq!(m.in_flow_w(c_limb).unwrap(), 0.0);
    assert!((m.out_flow_w(c_limb).unwrap() - 20.0).abs() < 1e-9);
    assert!((m.compartment(c_limb).unwrap().temperature_k().unwrap() - 290.0).abs() < 1e-9);
}

#[test]
fn parent_with_nodes_cannot_take_children() {
    let mut m = ThermalCompartmentManager::new();
    let a = m.add_compartment("a").unwrap();
    let c = m.add_compartment("c").unwrap();
    m.map_node(a, NodeId::from_usize(0)).unwrap();
    assert!(matches!(
        m.add_child(a, c),
        Err(TransportError::ParentMapsNodes { .. })
    ));
    assert!(matches!(
        m.add_compartment("a"),
        Err(TransportError::DuplicateCompartment { .. })
    ));
}
