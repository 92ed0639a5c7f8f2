// pf-core/src/units.rs

use core::fmt;

use uom::si::f64::{
    Energy as UomEnergy, Mass as UomMass, Power as UomPower, Pressure as UomPressure,
    ThermodynamicTemperature as UomThermodynamicTemperature, Time as UomTime,
    Volume as UomVolume, VolumeRate as UomVolumeRate,
};

use crate::numeric::Real;

// Public canonical unit types (SI, f64)
pub type Energy = UomEnergy;
pub type Mass = UomMass;
pub type Power = UomPower;
pub type Pressure = UomPressure;
pub type Temperature = UomThermodynamicTemperature;
pub type Time = UomTime;
pub type Volume = UomVolume;
pub type VolumeRate = UomVolumeRate;

/// Pascals per millimeter of mercury.
pub const PA_PER_MMHG: Real = 133.322_387_415;
/// Cubic meters per milliliter.
pub const M3_PER_ML: Real = 1e-6;

#[inline]
pub fn mmhg(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v * PA_PER_MMHG)
}

#[inline]
pub fn ml(v: f64) -> Volume {
    use uom::si::volume::cubic_meter;
    Volume::new::<cubic_meter>(v * M3_PER_ML)
}

#[inline]
pub fn ml_per_s(v: f64) -> VolumeRate {
    use uom::si::volume_rate::cubic_meter_per_second;
    VolumeRate::new::<cubic_meter_per_second>(v * M3_PER_ML)
}

#[inline]
pub fn kelvin(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn watts(v: f64) -> Power {
    use uom::si::power::watt;
    Power::new::<watt>(v)
}

#[inline]
pub fn joules(v: f64) -> Energy {
    use uom::si::energy::joule;
    Energy::new::<joule>(v)
}

#[inline]
pub fn ug(v: f64) -> Mass {
    use uom::si::mass::microgram;
    Mass::new::<microgram>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

/// A physical analog a lumped circuit can represent.
///
/// The solver works on plain [`Real`] values expressed in the domain's native
/// units; the domain supplies the typed view of those values at the API edge.
/// Element values follow from the native units: resistance is
/// potential/flux, compliance is quantity/potential and inertance is
/// potential·time/flux.
pub trait CircuitDomain: Copy + Clone + Default + fmt::Debug + Send + Sync + 'static {
    /// Across variable (pressure, temperature).
    type Potential: Copy + fmt::Debug;
    /// Through variable (volume flow, heat flow).
    type Flux: Copy + fmt::Debug;
    /// Stored quantity (volume, heat).
    type Quantity: Copy + fmt::Debug;

    const NAME: &'static str;
    const POTENTIAL_UNIT: &'static str;
    const FLUX_UNIT: &'static str;
    const QUANTITY_UNIT: &'static str;

    fn to_potential(native: Real) -> Self::Potential;
    fn from_potential(value: Self::Potential) -> Real;
    fn to_flux(native: Real) -> Self::Flux;
    fn from_flux(value: Self::Flux) -> Real;
    fn to_quantity(native: Real) -> Self::Quantity;
    fn from_quantity(value: Self::Quantity) -> Real;
}

/// Hydraulic/pneumatic analog: mmHg, mL/s, mL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Fluid;

impl CircuitDomain for Fluid {
    type Potential = Pressure;
    type Flux = VolumeRate;
    type Quantity = Volume;

    const NAME: &'static str = "fluid";
    const POTENTIAL_UNIT: &'static str = "mmHg";
    const FLUX_UNIT: &'static str = "mL/s";
    const QUANTITY_UNIT: &'static str = "mL";

    fn to_potential(native: Real) -> Pressure {
        mmhg(native)
    }

    fn from_potential(value: Pressure) -> Real {
        value.value / PA_PER_MMHG
    }

    fn to_flux(native: Real) -> VolumeRate {
        ml_per_s(native)
    }

    fn from_flux(value: VolumeRate) -> Real {
        value.value / M3_PER_ML
    }

    fn to_quantity(native: Real) -> Volume {
        ml(native)
    }

    fn from_quantity(value: Volume) -> Real {
        value.value / M3_PER_ML
    }
}

/// Heat-transfer analog: K, W, J.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Thermal;

impl CircuitDomain for Thermal {
    type Potential = Temperature;
    type Flux = Power;
    type Quantity = Energy;

    const NAME: &'static str = "thermal";
    const POTENTIAL_UNIT: &'static str = "K";
    const FLUX_UNIT: &'static str = "W";
    const QUANTITY_UNIT: &'static str = "J";

    fn to_potential(native: Real) -> Temperature {
        kelvin(native)
    }

    fn from_potential(value: Temperature) -> Real {
        value.value
    }

    fn to_flux(native: Real) -> Power {
        watts(native)
    }

    fn from_flux(value: Power) -> Real {
        value.value
    }

    fn to_quantity(native: Real) -> Energy {
        joules(native)
    }

    fn from_quantity(value: Energy) -> Real {
        value.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_smoke() {
        let _p = mmhg(100.0);
        let _v = ml(5.0);
        let _q = ml_per_s(10.0);
        let _t = kelvin(310.0);
        let _w = watts(80.0);
        let _e = joules(1.0);
        let _m = ug(3.0);
        let _dt = s(0.02);
    }

    #[test]
    fn fluid_native_round_trip() {
        let p = Fluid::to_potential(120.0);
        assert!((Fluid::from_potential(p) - 120.0).abs() < 1e-9);
        let q = Fluid::to_flux(10.0);
        assert!((Fluid::from_flux(q) - 10.0).abs() < 1e-9);
        let v = Fluid::to_quantity(250.0);
        assert!((Fluid::from_quantity(v) - 250.0).abs() < 1e-9);
        // 1 mmHg ~ 133.3 Pa
        assert!((mmhg(1.0).value - 133.322_387_415).abs() < 1e-9);
    }

    #[test]
    fn thermal_is_si() {
        assert_eq!(Thermal::from_potential(Thermal::to_potential(310.0)), 310.0);
        assert_eq!(Thermal::from_flux(Thermal::to_flux(-4.0)), -4.0);
        assert_eq!(Thermal::from_quantity(Thermal::to_quantity(9.0)), 9.0);
    }
}
