use pf_transport::{
    CompartmentGraph, CompartmentManager, Phase, SubstanceCatalog, deposit_aerosol,
    partial_pressure_diffusion, simple_diffusion,
};

#[test]
fn oxygen_moves_down_its_partial_pressure_gradient() {
    let catalog = SubstanceCatalog::physiology();
    let o2 = catalog.id("Oxygen").unwrap();
    let n2 = catalog.id("Nitrogen").unwrap();
    let oxygen = catalog.get(o2).unwrap();

    let mut m = CompartmentManager::new();
    let alveoli = m.add_compartment("alveoli", Phase::Gas).unwrap();
    let capillary = m.add_compartment("pulmonary_capillary", Phase::Liquid).unwrap();
    {
        let a = m.compartment_mut(alveoli).unwrap();
        a.add_substance(o2, oxygen);
        a.add_substance(n2, catalog.get(n2).unwrap());
        a.set_pressure(760.0).unwrap();
        a.set_volume(2000.0).unwrap();
        a.set_volume_fractions(&[(o2, 0.14), (n2, 0.86)]).unwrap();
    }
    {
        let c = m.compartment_mut(capillary).unwrap();
        c.add_substance(o2, oxygen);
        c.set_volume(100.0).unwrap();
        c.set_concentration(o2, 40.0 * oxygen.solubility_ug_per_ml_mmhg).unwrap();
    }

    let before_gas = m.compartment(alveoli).unwrap().quantity(o2).unwrap().volume_ml().unwrap();
    let before_mass = m.compartment(capillary).unwrap().quantity(o2).unwrap().mass_ug().unwrap();

    let moved = partial_pressure_diffusion(&mut m, alveoli, capillary, o2, oxygen, 0.2, 0.02).unwrap();
    // Gradient is 0.14 * 760 - 40 mmHg.
    let expected = (0.14 * 760.0 - 40.0) * 0.2 * 1.0 * 0.02;
    assert!((moved - expected).abs() < 1e-9);

    let after_gas = m.compartment(alveoli).unwrap().quantity(o2).unwrap().volume_ml().unwrap();
    let after_mass = m.compartment(capillary).unwrap().quantity(o2).unwrap().mass_ug().unwrap();
    assert!((before_gas - after_gas - moved).abs() < 1e-9);
    assert!((after_mass - before_mass - moved * oxygen.density_ug_per_ml).abs() < 1e-6);
}

#[test]
fn simple_diffusion_stops_at_equal_concentrations() {
    let catalog = SubstanceCatalog::physiology();
    let s = catalog.id("Glucose").unwrap();
    let mut m = CompartmentManager::new();
    let a = m.add_compartment("a", Phase::Liquid).unwrap();
    let b = m.add_compartment("b", Phase::Liquid).unwrap();
    for (id, volume, mass) in [(a, 10.0, 100.0), (b, 30.0, 0.0)] {
        let c = m.compartment_mut(id).unwrap();
        c.add_substance(s, catalog.get(s).unwrap());
        c.set_volume(volume).unwrap();
        c.set_mass(s, mass).unwrap();
    }

    // Large permeability would overshoot; the move is capped at equilibrium.
    let moved = simple_diffusion(&mut m, a, b, s, 1e6, 1.0).unwrap();
    assert!((moved - 75.0).abs() < 1e-9);
    let ca = m.compartment(a).unwrap().quantity(s).unwrap().concentration_ug_per_ml().unwrap();
    let cb = m.compartment(b).unwrap().quantity(s).unwrap().concentration_ug_per_ml().unwrap();
    assert!((ca - cb).abs() < 1e-9);

    // Small permeability moves permeability * gradient * dt.
    m.compartment_mut(a).unwrap().set_mass(s, 100.0).unwrap();
    m.compartment_mut(b).unwrap().set_mass(s, 0.0).unwrap();
    let moved = simple_diffusion(&mut m, a, b, s, 0.5, 0.1).unwrap();
    assert!((moved - 0.5 * 10.0 * 0.1).abs() < 1e-12);
}

#[test]
fn aerosol_deposits_on_inflow_and_accumulates() {
    let catalog = SubstanceCatalog::physiology();
    let s = catalog.id("salbutamol").unwrap();
    let albuterol = catalog.get(s).unwrap();
    let mut m = CompartmentManager::new();
    let mouth = m.add_compartment("mouth", Phase::Gas).unwrap();
    let trachea = m.add_compartment("trachea", Phase::Gas).unwrap();
    for id in [mouth, trachea] {
        let c = m.compartment_mut(id).unwrap();
        c.add_substance(s, albuterol);
        c.set_volume(50.0).unwrap();
    }
    m.compartment_mut(trachea).unwrap().set_concentration(s, 2.0).unwrap();
    let l = m.add_link("airway", mouth, trachea, None).unwrap();
    m.link_mut(l).unwrap().set_flux_ml_per_s(500.0);
    let mut g = CompartmentGraph::new("respiratory");
    g.add_compartment(&m, mouth).unwrap();
    g.add_compartment(&m, trachea).unwrap();
    g.add_link(&m, l).unwrap();

    let first = deposit_aerosol(&g, &mut m, trachea, s, albuterol, 0.02).unwrap();
    // 2 ug/mL * 500 mL/s * 0.02 s * 0.1
    assert!((first - 2.0).abs() < 1e-12);
    let second = deposit_aerosol(&g, &mut m, trachea, s, albuterol, 0.02).unwrap();
    let q = m.compartment(trachea).unwrap().quantity(s).unwrap();
    assert!((q.deposited_ug() - first - second).abs() < 1e-12);
    assert!((q.mass_ug().unwrap() - (100.0 - first - second)).abs() < 1e-9);

    // Huge inflow cannot deposit more than is suspended.
    m.link_mut(l).unwrap().set_flux_ml_per_s(1e9);
    let all = deposit_aerosol(&g, &mut m, trachea, s, albuterol, 1.0).unwrap();
    let q = m.compartment(trachea).unwrap().quantity(s).unwrap();
    assert!((all - (100.0 - first - second)).abs() < 1e-9);
    assert_eq!(q.mass_ug(), Some(0.0));
}
