use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

// ─────────────────────────────────────────────────────────────
//  Error type
// ─────────────────────────────────────────────────────────────

/// Unified error type for all fallible operations in the crate.
///
/// Every function in the public Rust API returns `Result<T, HaptickError>`
/// instead of panicking.  The FFI layer translates these into integer
/// return codes + a thread-local error message.
#[derive(Debug, thiserror::Error)]
pub enum HaptickError {
    /// The Plücker matrix has no inverse: the six strut axes do not span
    /// all six degrees of freedom.
    #[error("singular geometry: pivot {pivot:.3e} in column {column} of the Plücker matrix")]
    SingularGeometry { column: usize, pivot: f64 },
    /// Batch arrays with unequal lengths or the wrong row width.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
    /// A length, angle, frequency or option outside its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Argmin solver returned an error.
    #[error("solver error: {0}")]
    Solver(String),
    /// A settings document could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<argmin::core::Error> for HaptickError {
    fn from(e: argmin::core::Error) -> Self {
        Self::Solver(e.to_string())
    }
}

// ─────────────────────────────────────────────────────────────
//  Constants
// ─────────────────────────────────────────────────────────────

pub const NUM_STRUTS: usize = 6;

/// Base angles of the three joint pairs on each plate.
pub const TRIANGLE: [f64; 3] = [0.0, 2.0 * PI / 3.0, 4.0 * PI / 3.0];

/// Rotation of the bottom joint triangle relative to the top one.
pub const BOTTOM_ROTATION: f64 = -PI / 3.0;

/// Relative pivot size below which the Plücker matrix is treated as singular.
pub const SINGULARITY_TOLERANCE: f64 = 1e-10;

/// Batches with at least this many rows are solved on the rayon pool.
pub const PARALLEL_BATCH_THRESHOLD: usize = 4096;

pub const STANDARD_GRAVITY: f64 = 9.81;

// ─────────────────────────────────────────────────────────────
//  Geometry parameters
// ─────────────────────────────────────────────────────────────

/// Scalar description of the hexapod.  Lengths in metres; the separations
/// are arc lengths between the two joints of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryParameters {
    pub top_radius: f64,
    pub top_separation: f64,
    pub bottom_radius: f64,
    pub bottom_separation: f64,
    pub height: f64,
}

impl GeometryParameters {
    /// Build from joint-pair angular spans (radians) instead of arc lengths.
    pub fn from_angular(
        top_radius: f64,
        top_angle: f64,
        bottom_radius: f64,
        bottom_angle: f64,
        height: f64,
    ) -> Self {
        Self {
            top_radius,
            top_separation: top_angle * top_radius,
            bottom_radius,
            bottom_separation: bottom_angle * bottom_radius,
            height,
        }
    }

    /// Half the angular span of a top joint pair.
    pub fn half_top_angle(&self) -> f64 {
        0.5 * self.top_separation / self.top_radius
    }

    /// Half the angular span of a bottom joint pair.
    pub fn half_bottom_angle(&self) -> f64 {
        0.5 * self.bottom_separation / self.bottom_radius
    }

    pub fn validate(&self) -> Result<(), HaptickError> {
        let positive = [
            ("top_radius", self.top_radius),
            ("bottom_radius", self.bottom_radius),
            ("height", self.height),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(HaptickError::InvalidParameter(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }
        let non_negative = [
            ("top_separation", self.top_separation),
            ("bottom_separation", self.bottom_separation),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(HaptickError::InvalidParameter(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────
//  Loads
// ─────────────────────────────────────────────────────────────

/// Axial force magnitude of each strut, in strut-pairing order.
pub type StrutForces = [f64; NUM_STRUTS];

/// Force (N) and torque (N·m) acting on the top plate, about the origin of
/// the bottom plate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Wrench {
    pub force: [f64; 3],
    pub torque: [f64; 3],
}

impl Wrench {
    pub fn new(force: [f64; 3], torque: [f64; 3]) -> Self {
        Self { force, torque }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Stack as `[force; torque]`.
    pub fn to_vector(&self) -> [f64; 6] {
        let [fx, fy, fz] = self.force;
        let [tx, ty, tz] = self.torque;
        [fx, fy, fz, tx, ty, tz]
    }

    pub fn from_vector(v: &[f64; 6]) -> Self {
        Self {
            force: [v[0], v[1], v[2]],
            torque: [v[3], v[4], v[5]],
        }
    }
}

// ─────────────────────────────────────────────────────────────
//  Evenness / search options
// ─────────────────────────────────────────────────────────────

/// Test-load sweep used to score a candidate geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvennessSettings {
    /// Magnitude of every test force (N).
    pub nominal_force: f64,
    /// Magnitude of every test torque (N·m).
    pub nominal_torque: f64,
    /// Platform height held fixed during the search (m).
    pub height: f64,
    /// Number of directions on the Fibonacci sphere.
    pub samples: usize,
}

impl Default for EvennessSettings {
    fn default() -> Self {
        // 20 g on a 30 mm lever
        let weight = 20e-3 * STANDARD_GRAVITY;
        Self {
            nominal_force: weight,
            nominal_torque: weight * 30e-3,
            height: 20e-3,
            samples: 100,
        }
    }
}

/// Box bounds on `[top_radius, top_angle, bottom_radius, bottom_angle]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchBounds {
    pub lower: [f64; 4],
    pub upper: [f64; 4],
}

impl Default for SearchBounds {
    fn default() -> Self {
        Self {
            lower: [10e-3, 0.0, 10e-3, 0.0],
            upper: [25e-3, PI / 3.0, 25e-3, PI / 3.0],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmOptions {
    pub num_particles: usize,
    pub max_iterations: u64,
    /// Velocity inertia `w`.
    pub inertia: f64,
    /// Pull towards each particle's own best `c1`.
    pub cognitive: f64,
    /// Pull towards the swarm best `c2`.
    pub social: f64,
}

impl Default for SwarmOptions {
    fn default() -> Self {
        Self {
            num_particles: 100,
            max_iterations: 1000,
            inertia: 0.9,
            cognitive: 0.5,
            social: 0.3,
        }
    }
}

/// Everything a geometry search needs, loadable from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub evenness: EvennessSettings,
    pub bounds: SearchBounds,
    pub swarm: SwarmOptions,
}

impl SearchConfig {
    pub fn from_json(text: &str) -> Result<Self, HaptickError> {
        serde_json::from_str(text).map_err(|e| HaptickError::Config(e.to_string()))
    }
}

/// Best geometry found by [`crate::optimizer::optimize`].
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub parameters: GeometryParameters,
    pub cost: f64,
    pub iterations: u64,
}

// ─────────────────────────────────────────────────────────────
//  Acquisition settings
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiasCorrectionSettings {
    pub enabled: bool,
    /// Per-channel standard deviation (V) under which the signal is
    /// considered at rest.
    pub threshold: f64,
    /// Length of the rest window (s).
    pub time: f64,
}

impl Default for BiasCorrectionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.5e-6,
            time: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Low-pass cutoff (Hz); `None` disables filtering.
    pub filter_cutoff: Option<f64>,
    pub bias_correction: BiasCorrectionSettings,
}

impl MonitorSettings {
    pub fn from_json(text: &str) -> Result<Self, HaptickError> {
        serde_json::from_str(text).map_err(|e| HaptickError::Config(e.to_string()))
    }
}
