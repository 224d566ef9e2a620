//! Force-sensing evenness score for a candidate geometry.
//!
//! A geometry senses evenly when every strut sees a similar amount of
//! vertical reaction whichever way the platform is pushed or twisted.  The
//! score sweeps force and torque directions over a Fibonacci sphere, takes
//! the norm of each strut's vertical reaction over the sweep, and returns the
//! spread (standard deviation) of those twelve norms.  Lower is better.

use crate::geometry::GeometryModel;
use crate::statics::WrenchSolver;
use crate::types::{EvennessSettings, GeometryParameters, HaptickError, NUM_STRUTS};
use ndarray::{Array2, Axis};

// ─────────────────────────────────────────────────────────────
//  Sample directions
// ─────────────────────────────────────────────────────────────

/// Near-uniform unit vectors on the sphere (samples × 3).
///
/// `y` runs linearly from 1 to −1; successive points advance by the golden
/// angle around the y axis.
pub fn fibonacci_sphere(samples: usize) -> Array2<f64> {
    let phi = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
    let mut out = Array2::zeros((samples, 3));
    for j in 0..samples {
        let y = if samples > 1 {
            1.0 - 2.0 * j as f64 / (samples - 1) as f64
        } else {
            1.0
        };
        let r = (1.0 - y * y).max(0.0).sqrt();
        let t = j as f64 * phi;
        out[[j, 0]] = t.cos() * r;
        out[[j, 1]] = y;
        out[[j, 2]] = t.sin() * r;
    }
    out
}

// ─────────────────────────────────────────────────────────────
//  Evenness error
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EvennessError {
    settings: EvennessSettings,
    forces: Array2<f64>,
    torques: Array2<f64>,
    null: Array2<f64>,
}

impl EvennessError {
    pub fn new(settings: EvennessSettings) -> Result<Self, HaptickError> {
        if settings.samples == 0 {
            return Err(HaptickError::InvalidParameter("evenness needs at least one sample".into()));
        }
        if !(settings.height.is_finite() && settings.height > 0.0) {
            return Err(HaptickError::InvalidParameter(format!(
                "height must be finite and positive, got {}",
                settings.height
            )));
        }
        let sphere = fibonacci_sphere(settings.samples);
        Ok(Self {
            forces: &sphere * settings.nominal_force,
            torques: &sphere * settings.nominal_torque,
            null: Array2::zeros((settings.samples, 3)),
            settings,
        })
    }

    pub fn settings(&self) -> &EvennessSettings {
        &self.settings
    }

    /// Spread of per-strut vertical reaction norms for an already-built model.
    pub fn score(&self, model: &GeometryModel) -> Result<f64, HaptickError> {
        let solver = WrenchSolver::new(model);
        let z_for_forces = solver.vertical_components_batch(self.forces.view(), self.null.view())?;
        let z_for_torques = solver.vertical_components_batch(self.null.view(), self.torques.view())?;

        let mut norms = Vec::with_capacity(2 * NUM_STRUTS);
        for z in [&z_for_forces, &z_for_torques] {
            for column in z.axis_iter(Axis(1)) {
                norms.push(column.dot(&column).sqrt());
            }
        }
        Ok(population_std(&norms))
    }

    /// Score a parameter set.  Infeasible geometries score `f64::INFINITY`.
    pub fn evaluate(&self, params: &GeometryParameters) -> f64 {
        GeometryModel::new(*params)
            .and_then(|model| self.score(&model))
            .unwrap_or(f64::INFINITY)
    }
}

/// Standard deviation with divisor N.
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    var.sqrt()
}
