//! Particle-swarm geometry search via the `argmin` crate.
//!
//! Wraps [`EvennessError`] into argmin's `CostFunction` trait and runs
//! `ParticleSwarm` over `[top_radius, top_angle, bottom_radius, bottom_angle]`
//! with the platform height held fixed.
//!
//! Uses `Vec<f64>` as the argmin parameter type so `argmin-math`'s `vec`
//! backend supplies the arithmetic.

use crate::objectives::EvennessError;
use crate::types::{GeometryParameters, HaptickError, SearchBounds, SearchResult, SwarmOptions};
use argmin::core::{CostFunction, Executor, State};
use argmin::solver::particleswarm::ParticleSwarm;
use log::info;

// ─────────────────────────────────────────────────────────────
//  argmin problem wrapper
// ─────────────────────────────────────────────────────────────

struct GeometryProblem<'a> {
    objective: &'a EvennessError,
    height: f64,
}

impl<'a> CostFunction for GeometryProblem<'a> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let params = unpack_parameters(theta, self.height)?;
        Ok(self.objective.evaluate(&params))
    }
}

// ─────────────────────────────────────────────────────────────
//  Parameter packing / unpacking
// ─────────────────────────────────────────────────────────────

/// Pack into `[top_radius, top_angle, bottom_radius, bottom_angle]`.
pub fn pack_parameters(params: &GeometryParameters) -> Vec<f64> {
    vec![
        params.top_radius,
        params.top_separation / params.top_radius,
        params.bottom_radius,
        params.bottom_separation / params.bottom_radius,
    ]
}

/// Unpack a search vector; separations are angle × radius.
pub fn unpack_parameters(theta: &[f64], height: f64) -> Result<GeometryParameters, HaptickError> {
    let &[top_radius, top_angle, bottom_radius, bottom_angle] = theta else {
        return Err(HaptickError::DimensionMismatch(format!(
            "search vector must have 4 entries, got {}",
            theta.len()
        )));
    };
    Ok(GeometryParameters::from_angular(
        top_radius,
        top_angle,
        bottom_radius,
        bottom_angle,
        height,
    ))
}

fn check_inputs(bounds: &SearchBounds, options: &SwarmOptions) -> Result<(), HaptickError> {
    for (k, (&lb, &ub)) in bounds.lower.iter().zip(bounds.upper.iter()).enumerate() {
        if !(lb.is_finite() && ub.is_finite() && lb < ub) {
            return Err(HaptickError::InvalidParameter(format!(
                "bound {k} must satisfy finite lower < upper, got [{lb}, {ub}]"
            )));
        }
    }
    if options.num_particles == 0 {
        return Err(HaptickError::InvalidParameter("swarm needs at least one particle".into()));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────
//  Top-level optimisation entry point
// ─────────────────────────────────────────────────────────────

/// Search for the geometry with the most even force sensing.
pub fn optimize(
    objective: &EvennessError,
    bounds: &SearchBounds,
    options: &SwarmOptions,
) -> Result<SearchResult, HaptickError> {
    check_inputs(bounds, options)?;
    let height = objective.settings().height;

    info!(
        "particle swarm: {} particles, {} iterations, w={}, c1={}, c2={}",
        options.num_particles, options.max_iterations, options.inertia, options.cognitive, options.social,
    );

    let problem = GeometryProblem { objective, height };

    let solver = ParticleSwarm::new((bounds.lower.to_vec(), bounds.upper.to_vec()), options.num_particles)
        .with_inertia_factor(options.inertia)?
        .with_cognitive_factor(options.cognitive)?
        .with_social_factor(options.social)?;

    let result = Executor::new(problem, solver)
        .configure(|config| config.max_iters(options.max_iterations))
        .run()?;

    let state = result.state();
    let best = state
        .get_best_param()
        .ok_or_else(|| HaptickError::Solver("particle swarm returned no best particle".into()))?;
    // The swarm-best particle's position is its best position.
    let parameters = unpack_parameters(&best.position, height)?;
    let cost = state.get_best_cost();
    let iterations = state.get_iter();

    info!(
        "best geometry after {iterations} iterations: cost={cost:.4e}, top r={:.2} mm sep={:.2} mm, bottom r={:.2} mm sep={:.2} mm",
        parameters.top_radius * 1e3,
        parameters.top_separation * 1e3,
        parameters.bottom_radius * 1e3,
        parameters.bottom_separation * 1e3,
    );

    Ok(SearchResult {
        parameters,
        cost,
        iterations,
    })
}
