//! 1976 US Standard Atmosphere up to 86 km geometric altitude.
//!
//! The sizing tools never query the raw model directly. They go through [`density`] and
//! [`clamped`], which hold the profile at sea level below the ground and freeze it at
//! [`CEILING_M`] above, so every caller sees the same total function of altitude.

use sizing_core::constants::{G0, RHO_SEA_LEVEL};

/// Altitude above which the clamped profile stops changing (m).
pub const CEILING_M: f64 = 80_000.0;

const R_AIR: f64 = 287.052_87; // specific gas constant for dry air, J/(kg·K)
const GAMMA: f64 = 1.4;
const EARTH_RADIUS_GEOPOTENTIAL: f64 = 6_356_766.0; // m

/// Base of one standard-atmosphere layer in geopotential altitude.
struct Layer {
    base_m: f64,
    base_temperature_k: f64,
    lapse_k_m: f64,
    base_pressure_pa: f64,
}

static LAYERS: [Layer; 7] = [
    Layer {
        base_m: 0.0,
        base_temperature_k: 288.15,
        lapse_k_m: -0.0065,
        base_pressure_pa: 101_325.0,
    },
    Layer {
        base_m: 11_000.0,
        base_temperature_k: 216.65,
        lapse_k_m: 0.0,
        base_pressure_pa: 22_632.064,
    },
    Layer {
        base_m: 20_000.0,
        base_temperature_k: 216.65,
        lapse_k_m: 0.001,
        base_pressure_pa: 5_474.888_67,
    },
    Layer {
        base_m: 32_000.0,
        base_temperature_k: 228.65,
        lapse_k_m: 0.0028,
        base_pressure_pa: 868.018_685,
    },
    Layer {
        base_m: 47_000.0,
        base_temperature_k: 270.65,
        lapse_k_m: 0.0,
        base_pressure_pa: 110.906_306,
    },
    Layer {
        base_m: 51_000.0,
        base_temperature_k: 270.65,
        lapse_k_m: -0.0028,
        base_pressure_pa: 66.938_873_1,
    },
    Layer {
        base_m: 71_000.0,
        base_temperature_k: 214.65,
        lapse_k_m: -0.002,
        base_pressure_pa: 3.956_420_43,
    },
];

/// Atmospheric properties at a given geometric altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphereState {
    pub density_kg_m3: f64,
    pub pressure_pa: f64,
    pub temperature_k: f64,
    pub speed_of_sound_m_s: f64,
}

/// Unclamped standard atmosphere at `altitude_m` (geometric).
///
/// Negative altitudes are evaluated at sea level. Altitudes above 86 km extrapolate the
/// last layer and are only meaningful through [`clamped`].
pub fn standard(altitude_m: f64) -> AtmosphereState {
    let h = altitude_m.max(0.0);
    let geopotential = EARTH_RADIUS_GEOPOTENTIAL * h / (EARTH_RADIUS_GEOPOTENTIAL + h);

    let layer = LAYERS
        .iter()
        .rev()
        .find(|layer| geopotential >= layer.base_m)
        .unwrap_or(&LAYERS[0]);
    let dh = geopotential - layer.base_m;

    let (temperature, pressure) = if layer.lapse_k_m == 0.0 {
        let t = layer.base_temperature_k;
        (t, layer.base_pressure_pa * (-G0 * dh / (R_AIR * t)).exp())
    } else {
        let t = layer.base_temperature_k + layer.lapse_k_m * dh;
        let exponent = -G0 / (layer.lapse_k_m * R_AIR);
        (t, layer.base_pressure_pa * (t / layer.base_temperature_k).powf(exponent))
    };

    AtmosphereState {
        density_kg_m3: pressure / (R_AIR * temperature),
        pressure_pa: pressure,
        temperature_k: temperature,
        speed_of_sound_m_s: (GAMMA * R_AIR * temperature).sqrt(),
    }
}

/// Standard atmosphere held at sea level for `altitude_m <= 0` and at [`CEILING_M`] above it.
pub fn clamped(altitude_m: f64) -> AtmosphereState {
    if altitude_m <= 0.0 {
        AtmosphereState {
            density_kg_m3: RHO_SEA_LEVEL,
            ..standard(0.0)
        }
    } else if altitude_m >= CEILING_M {
        standard(CEILING_M)
    } else {
        standard(altitude_m)
    }
}

/// Air density (kg/m³) seen by the ascent dynamics and the structural check.
#[inline]
pub fn density(altitude_m: f64) -> f64 {
    clamped(altitude_m).density_kg_m3
}
