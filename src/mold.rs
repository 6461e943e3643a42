//! VTT mold-growth model.
//!
//! Integrates a mold index M ∈ [0, 6] from temperature / humidity history,
//! one explicit Euler step per call to [`MoldModel::update`].
//!
//! ```text
//!                 RH > rh_crit(T)
//!   ┌─────────┐ ────────────────▶ ┌─────────┐
//!   │ DECLINE │                   │ GROWTH  │
//!   └─────────┘ ◀──────────────── └─────────┘
//!                 RH ≤ rh_crit(T)
//! ```
//!
//! Growth is saturating (dM → 0 as M approaches the humidity-dependent
//! ceiling).  Decline depends on how long the surface has been dry:
//! fast for the first 6 h, flat up to 24 h (spore latency), slow after.

use log::debug;
use serde::{Deserialize, Serialize};

pub const INDEX_MIN: f32 = 0.0;
pub const INDEX_MAX: f32 = 6.0;

const TEMP_CLAMP: (f32, f32) = (0.1, 60.0);
const RH_CLAMP: (f32, f32) = (1.0, 100.0);

/// rh_crit above 20 °C, before the material offset.
const RH_CRIT_WARM: f32 = 80.0;

// Decline rates (index per hour) by dry-spell length.
const DECLINE_SHORT: f32 = -0.032; // ≤ 6 h
const DECLINE_LATENT: f32 = 0.0; // 6 h – 24 h
const DECLINE_LONG: f32 = -0.016; // > 24 h

/// Surface material class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    Sensitive,
    MediumResistant,
    Resistant,
}

/// Static coefficients for one material class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialCoefficients {
    /// Growth intensity factor k1 ∈ (0, 1].
    pub k1: f32,
    pub surface_quality: f32,
    pub wood_species: f32,
    /// Offset added to the critical humidity.
    pub rh_offset: f32,
}

impl Material {
    pub fn coefficients(self) -> MaterialCoefficients {
        let (k1, surface_quality, wood_species, rh_offset) = match self {
            Self::Sensitive => (1.0, 0.0, 0.0, 0.0),
            Self::MediumResistant => (0.3, 1.0, 1.0, 3.0),
            Self::Resistant => (0.1, 1.0, 1.0, 6.0),
        };
        MaterialCoefficients {
            k1,
            surface_quality,
            wood_species,
            rh_offset,
        }
    }
}

/// Risk band derived from the mold index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    Clean,
    Warning,
    Alert,
    Critical,
}

impl RiskLevel {
    pub fn from_index(index: f32) -> Self {
        if index < 1.0 {
            Self::Clean
        } else if index < 3.0 {
            Self::Warning
        } else if index < 4.0 {
            Self::Alert
        } else {
            Self::Critical
        }
    }

    /// Numeric code used on the wire.
    pub fn code(self) -> u8 {
        match self {
            Self::Clean => 0,
            Self::Warning => 1,
            Self::Alert => 2,
            Self::Critical => 3,
        }
    }
}

/// Per-location model state.  Lives for the whole node lifetime.
#[derive(Debug, Clone)]
pub struct MoldModel {
    material: Material,
    coeffs: MaterialCoefficients,

    rh_critical: f32,
    mold_index: f32,
    time_wet_hours: f32,
    time_dry_hours: f32,
    last_growth_rate: f32,
    max_possible_index: f32,
    growing: bool,
}

impl MoldModel {
    pub fn new(material: Material) -> Self {
        Self {
            material,
            coeffs: material.coefficients(),
            rh_critical: 0.0,
            mold_index: INDEX_MIN,
            time_wet_hours: 0.0,
            time_dry_hours: 0.0,
            last_growth_rate: 0.0,
            max_possible_index: 0.0,
            growing: false,
        }
    }

    /// Advance the model by `time_step_hours`.
    ///
    /// Inputs are clamped silently.  A non-positive or non-finite step is
    /// ignored; the state is left untouched.
    pub fn update(&mut self, temp_c: f32, rh_percent: f32, time_step_hours: f32) {
        if !(time_step_hours.is_finite() && time_step_hours > 0.0) {
            debug!("MOLD | ignoring step of {} h", time_step_hours);
            return;
        }
        let t = clamp(temp_c, TEMP_CLAMP);
        let rh = clamp(rh_percent, RH_CLAMP);

        self.rh_critical = rh_critical(t, self.coeffs.rh_offset);

        let delta = if rh > self.rh_critical {
            self.time_wet_hours += time_step_hours;
            self.time_dry_hours = 0.0;
            self.growing = true;
            self.growth_step(t, rh, time_step_hours)
        } else {
            self.time_dry_hours += time_step_hours;
            self.time_wet_hours = 0.0;
            self.growing = false;
            decline_rate(self.time_dry_hours) * time_step_hours
        };

        self.mold_index = (self.mold_index + delta).clamp(INDEX_MIN, INDEX_MAX);
        self.last_growth_rate = delta / time_step_hours;
    }

    fn growth_step(&mut self, t: f32, rh: f32, dt: f32) -> f32 {
        let c = &self.coeffs;
        self.max_possible_index = (INDEX_MAX * (rh - self.rh_critical) / (100.0 - self.rh_critical))
            .clamp(INDEX_MIN, INDEX_MAX);

        let exponent = -0.68 * t.ln() - 13.9 * rh.ln() + 0.14 * c.wood_species
            - 0.33 * c.surface_quality
            + 66.02;
        let base_rate = 1.0 / (7.0 * exponent.exp());

        let saturation = (1.0 - (2.3 * (self.mold_index - self.max_possible_index)).exp()).max(0.0);
        c.k1 * saturation * base_rate * dt
    }

    /// Always recomputed from the current index.
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_index(self.mold_index)
    }

    pub fn mold_index(&self) -> f32 {
        self.mold_index
    }

    pub fn is_growing(&self) -> bool {
        self.growing
    }

    pub fn material(&self) -> Material {
        self.material
    }

    pub fn rh_critical(&self) -> f32 {
        self.rh_critical
    }

    pub fn time_wet_hours(&self) -> f32 {
        self.time_wet_hours
    }

    pub fn time_dry_hours(&self) -> f32 {
        self.time_dry_hours
    }

    /// Index change per hour over the last step.
    pub fn last_growth_rate(&self) -> f32 {
        self.last_growth_rate
    }

    /// Growth ceiling at the last wet step's humidity.
    pub fn max_possible_index(&self) -> f32 {
        self.max_possible_index
    }
}

/// Critical relative humidity at temperature `t` (already clamped).
pub fn rh_critical(t: f32, offset: f32) -> f32 {
    if t > 20.0 {
        RH_CRIT_WARM + offset
    } else {
        -0.00267 * t * t * t + 0.160 * t * t - 3.13 * t + 100.0 + offset
    }
}

fn decline_rate(time_dry_hours: f32) -> f32 {
    if time_dry_hours <= 6.0 {
        DECLINE_SHORT
    } else if time_dry_hours <= 24.0 {
        DECLINE_LATENT
    } else {
        DECLINE_LONG
    }
}

fn clamp(v: f32, (lo, hi): (f32, f32)) -> f32 {
    // NaN collapses to the lower bound.
    if v.is_nan() { lo } else { v.clamp(lo, hi) }
}
