use pf_circuit::{Circuit, CircuitBuilder, CircuitDocument, CircuitError, Element, GateState};
use pf_core::Fluid;

fn heart() -> Circuit<Fluid> {
    let mut b = CircuitBuilder::<Fluid>::new("heart");
    let g = b.add_reference_node("ground", 0.0);
    let lv = b.add_node("left_ventricle");
    let ao = b.add_node("aorta");
    b.set_quantity(lv, 120.0).unwrap();
    b.add_capacitor("lv_compliance", lv, g, 1.0);
    b.add_valve("aortic_valve", lv, ao);
    b.build().unwrap()
}

fn systemic() -> Circuit<Fluid> {
    let mut b = CircuitBuilder::<Fluid>::new("systemic");
    let g = b.add_reference_node("ground", 0.0);
    let ao = b.add_node("aorta");
    let vc = b.add_node("vena_cava");
    b.add_resistor("systemic_resistance", ao, vc, 1.0);
    b.add_resistor("venous_return", vc, g, 0.1);
    b.build().unwrap()
}

#[test]
fn shared_node_names_become_one_junction() {
    let mut combined = CircuitBuilder::<Fluid>::new("cardiovascular");
    let h = combined.add_circuit(&heart()).unwrap();
    let s = combined.add_circuit(&systemic()).unwrap();
    let c = combined.build().unwrap();

    assert_eq!(c.nodes().len(), 4);
    assert_eq!(c.paths().len(), 4);

    let aorta = c.node_id("aorta").unwrap();
    assert_eq!(h.nodes[2], aorta);
    assert_eq!(s.nodes[1], aorta);
    assert_eq!(c.node_paths(aorta).len(), 2);

    let valve = c.path(c.path_id("aortic_valve").unwrap()).unwrap();
    assert_eq!(valve.element, Element::Valve);
    assert_eq!(valve.next.gate, Some(GateState::Open));
    assert_eq!(c.find_floating_nodes(), Vec::new());
}

#[test]
fn duplicate_path_names_conflict() {
    let mut combined = CircuitBuilder::<Fluid>::new("twice");
    combined.add_circuit(&systemic()).unwrap();
    let err = combined.add_circuit(&systemic()).unwrap_err();
    assert!(matches!(err, CircuitError::DuplicatePath { .. }));
}

#[test]
fn flux_source_does_not_anchor_a_node() {
    let mut b = CircuitBuilder::<Fluid>::new("pumped");
    let g = b.add_reference_node("ground", 0.0);
    let a = b.add_node("a");
    let z = b.add_node("z");
    b.add_flux_source("pump", g, a, 5.0);
    b.add_resistor("r", a, z, 1.0);
    let c = b.build().unwrap();
    let floating = c.find_floating_nodes();
    assert_eq!(floating.len(), 2);
}

#[test]
fn yaml_document_loads_and_revalidates() {
    let yaml = r#"
name: tiny
domain: fluid
nodes:
  - name: ground
    reference: true
  - name: a
paths:
  - name: r
    source: a
    target: ground
    element: resistor
    baseline: 10.0
"#;
    let doc: CircuitDocument = serde_yaml::from_str(yaml).unwrap();
    let c = Circuit::<Fluid>::from_document(&doc).unwrap();
    let r = c.path(c.path_id("r").unwrap()).unwrap();
    assert_eq!(r.baseline, 10.0);
    assert_eq!(r.next.value, 10.0);

    let bad = yaml.replace("baseline: 10.0", "baseline: -1.0");
    let doc: CircuitDocument = serde_yaml::from_str(&bad).unwrap();
    assert!(matches!(
        Circuit::<Fluid>::from_document(&doc),
        Err(CircuitError::InvalidValue { .. })
    ));
}

#[test]
fn json_round_trip_preserves_states() {
    let c = heart();
    let text = serde_json::to_string(&c.to_document()).unwrap();
    let doc: CircuitDocument = serde_json::from_str(&text).unwrap();
    let back = Circuit::<Fluid>::from_document(&doc).unwrap();
    assert_eq!(back.nodes(), c.nodes());
    assert_eq!(back.paths(), c.paths());
}

fn pressurized_aorta(line: &str, pressure: f64) -> Circuit<Fluid> {
    let mut b = CircuitBuilder::<Fluid>::new("arterial_line");
    let ao = b.add_reference_node("aorta", pressure);
    let g = b.add_reference_node("ground", 0.0);
    b.add_resistor(line, ao, g, 2.0);
    b.build().unwrap()
}

#[test]
fn shared_junction_takes_incoming_reference_potential() {
    let mut combined = CircuitBuilder::<Fluid>::new("driven");
    combined.add_circuit(&systemic()).unwrap();
    combined.add_circuit(&pressurized_aorta("line", 100.0)).unwrap();
    let c = combined.build().unwrap();

    let aorta = c.node(c.node_id("aorta").unwrap()).unwrap();
    assert!(aorta.reference);
    assert_eq!(aorta.current.potential, 100.0);
    assert_eq!(aorta.next.potential, 100.0);
}

#[test]
fn shared_references_at_different_potentials_conflict() {
    let mut combined = CircuitBuilder::<Fluid>::new("clash");
    combined.add_circuit(&pressurized_aorta("line", 100.0)).unwrap();
    let err = combined.add_circuit(&pressurized_aorta("second_line", 90.0)).unwrap_err();
    assert!(matches!(err, CircuitError::ConflictingReference { ref name, .. } if name == "aorta"));

    // Same potential on both sides is one consistent reference.
    let mut combined = CircuitBuilder::<Fluid>::new("agree");
    combined.add_circuit(&pressurized_aorta("line", 100.0)).unwrap();
    combined.add_circuit(&pressurized_aorta("bypass", 100.0)).unwrap();
    assert!(combined.build().is_ok());
}
