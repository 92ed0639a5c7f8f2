use pf_circuit::{Circuit, CircuitBuilder};
use pf_core::{Fluid, PathId, Real, SubstanceId};
use pf_sim::{
    Network, NetworkSample, SimModel, SimOptions, SimResult, TransportLayer, run_batch, run_sim,
};
use pf_transport::{CompartmentGraph, CompartmentManager, Phase, SubstanceCatalog, TransportReport};

/// Three compliant chambers in a loop: a pulsing pump fills the ventricle,
/// a valve lets it empty into the artery, and a resistor returns to the vein.
struct Circulation {
    network: Network<Fluid>,
    pump: PathId,
    valve: PathId,
    tracer: SubstanceId,
}

impl Circulation {
    fn new() -> Self {
        let mut b = CircuitBuilder::<Fluid>::new("circulation");
        let g = b.add_reference_node("ground", 0.0);
        let chambers = [("vein", 100.0, 10.0), ("ventricle", 20.0, 2.0), ("artery", 150.0, 1.5)];
        let mut nodes = Vec::new();
        for (name, volume, compliance) in chambers {
            let n = b.add_node(name);
            b.set_quantity(n, volume).unwrap();
            b.set_potential(n, volume / compliance).unwrap();
            b.add_capacitor(format!("{name}_compliance"), n, g, compliance);
            nodes.push(n);
        }
        let pump = b.add_flux_source("pump", nodes[0], nodes[1], 0.0);
        let valve = b.add_valve("valve", nodes[1], nodes[2]);
        let ret = b.add_resistor("return", nodes[2], nodes[0], 1.0);
        let circuit = b.build().unwrap();

        let catalog = SubstanceCatalog::physiology();
        let tracer = catalog.id("Glucose").unwrap();
        let mut manager = CompartmentManager::new();
        let mut graph = CompartmentGraph::new("blood");
        let mut ids = Vec::new();
        for (i, &node) in nodes.iter().enumerate() {
            let name = circuit.node(node).unwrap().name.clone();
            let id = manager.add_compartment(name, Phase::Liquid).unwrap();
            manager.map_node(id, node).unwrap();
            let c = manager.compartment_mut(id).unwrap();
            c.add_substance(tracer, catalog.get(tracer).unwrap());
            c.set_volume(circuit.node(node).unwrap().current.quantity.unwrap()).unwrap();
            c.set_concentration(tracer, if i == 0 { 5.0 } else { 1.0 }).unwrap();
            graph.add_compartment(&manager, id).unwrap();
            ids.push(id);
        }
        for (name, path, from, to) in [
            ("pump", pump, 0, 1),
            ("valve", valve, 1, 2),
            ("return", ret, 2, 0),
        ] {
            let l = manager.add_link(name, ids[from], ids[to], Some(path)).unwrap();
            graph.add_link(&manager, l).unwrap();
        }

        let mut network = Network::new(circuit);
        network.transport = Some(TransportLayer { manager, graph });
        Self {
            network,
            pump,
            valve,
            tracer,
        }
    }

    fn total_tracer(&self) -> Real {
        self.network
            .transport
            .as_ref()
            .unwrap()
            .manager
            .compartments()
            .iter()
            .filter_map(|c| c.quantity(self.tracer).and_then(|q| q.mass_ug()))
            .sum()
    }
}

impl SimModel for Circulation {
    type Domain = Fluid;
    type Sample = NetworkSample;

    fn circuit(&self) -> &Circuit<Fluid> {
        &self.network.circuit
    }

    fn circuit_mut(&mut self) -> &mut Circuit<Fluid> {
        &mut self.network.circuit
    }

    fn pre_process(&mut self, t: Real) -> SimResult<()> {
        let beat = (2.0 * std::f64::consts::PI * t).sin().max(0.0);
        self.network.circuit.set_next_value(self.pump, 80.0 * beat)?;
        Ok(())
    }

    fn transport(&mut self, dt: Real) -> SimResult<Option<TransportReport>> {
        self.network.transport(dt)
    }

    fn sample(&self, t: Real) -> NetworkSample {
        self.network.sample(t)
    }
}

fn opts() -> SimOptions {
    SimOptions {
        dt: 0.01,
        t_end: 3.0,
        record_every: 5,
        ..SimOptions::default()
    }
}

#[test]
fn closed_loop_conserves_volume_and_tracer() {
    let mut model = Circulation::new();
    let volume = |m: &Circulation| -> Real {
        m.circuit()
            .nodes()
            .iter()
            .filter_map(|n| n.current.quantity)
            .sum()
    };
    let v0 = volume(&model);
    let m0 = model.total_tracer();

    let record = run_sim(&mut model, &opts()).unwrap();
    assert_eq!(record.t.len(), record.samples.len());
    assert!(record.steps >= 300);

    assert!((volume(&model) - v0).abs() < 1e-6 * v0);
    assert!((model.total_tracer() - m0).abs() < 1e-9 * m0);

    let valve = model.valve.slot();
    for s in &record.samples {
        assert!(s.fluxes[valve] >= -1e-10);
    }
}

#[test]
fn batch_runs_match_serial_runs() {
    let mut serial = Circulation::new();
    let expected = run_sim(&mut serial, &opts()).unwrap();

    let mut models: Vec<Circulation> = (0..3).map(|_| Circulation::new()).collect();
    let results = run_batch(&mut models, &opts());
    assert_eq!(results.len(), 3);
    for r in results {
        assert_eq!(r.unwrap(), expected);
    }
}

#[test]
fn invalid_options_rejected() {
    let mut model = Circulation::new();
    let bad = SimOptions {
        dt: -1.0,
        ..SimOptions::default()
    };
    assert!(run_sim(&mut model, &bad).is_err());
}
