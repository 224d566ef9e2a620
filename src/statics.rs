//! Static equilibrium between the platform wrench and the six strut forces.
//!
//! Sign convention: a positive applied wrench is balanced by the struts
//! pushing back, so
//!
//!   x = P⁻¹ · (−w)        (strut forces from applied wrench)
//!   w = −P · x            (applied wrench from strut forces)
//!
//! Both directions are a single 6 × 6 matrix-vector product against the
//! matrices fixed in [`GeometryModel`].

use crate::geometry::GeometryModel;
use crate::types::{HaptickError, StrutForces, Wrench, NUM_STRUTS, PARALLEL_BATCH_THRESHOLD};
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

/// Stateless solver borrowing an immutable [`GeometryModel`].
#[derive(Debug, Clone, Copy)]
pub struct WrenchSolver<'a> {
    model: &'a GeometryModel,
}

impl<'a> WrenchSolver<'a> {
    pub fn new(model: &'a GeometryModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &'a GeometryModel {
        self.model
    }

    /// Axial force magnitudes that hold the platform against `wrench`.
    pub fn strut_forces(&self, wrench: &Wrench) -> StrutForces {
        let w = wrench.to_vector();
        let inv = self.model.inverse_plucker_matrix();
        let mut x = [0.0; NUM_STRUTS];
        for (i, xi) in x.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (j, &wj) in w.iter().enumerate() {
                acc -= inv[[i, j]] * wj;
            }
            *xi = acc;
        }
        x
    }

    /// Row-wise [`strut_forces`](Self::strut_forces) over N wrenches.
    ///
    /// `forces` and `torques` are N × 3; the result is N × 6 in the same row
    /// order.
    pub fn strut_forces_batch(
        &self,
        forces: ArrayView2<f64>,
        torques: ArrayView2<f64>,
    ) -> Result<Array2<f64>, HaptickError> {
        check_width("forces", &forces, 3)?;
        check_width("torques", &torques, 3)?;
        if forces.nrows() != torques.nrows() {
            return Err(HaptickError::DimensionMismatch(format!(
                "{} forces but {} torques",
                forces.nrows(),
                torques.nrows()
            )));
        }

        let n = forces.nrows();
        let solve_row = |i: usize| {
            let wrench = Wrench::new(
                [forces[[i, 0]], forces[[i, 1]], forces[[i, 2]]],
                [torques[[i, 0]], torques[[i, 1]], torques[[i, 2]]],
            );
            self.strut_forces(&wrench)
        };

        let rows: Vec<StrutForces> = if n >= PARALLEL_BATCH_THRESHOLD {
            (0..n).into_par_iter().map(solve_row).collect()
        } else {
            (0..n).map(solve_row).collect()
        };

        Ok(rows_to_array(&rows))
    }

    /// Wrench applied to the platform that produces `strut_forces`.
    ///
    /// No plausibility check: noisy sensor-derived inputs map straight
    /// through.
    pub fn applied_wrench(&self, strut_forces: &StrutForces) -> Wrench {
        let p = self.model.plucker_matrix();
        let mut w = [0.0; 6];
        for (r, wr) in w.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (i, &xi) in strut_forces.iter().enumerate() {
                acc -= p[[r, i]] * xi;
            }
            *wr = acc;
        }
        Wrench::from_vector(&w)
    }

    /// Row-wise [`applied_wrench`](Self::applied_wrench): N × 6 in,
    /// `(forces N × 3, torques N × 3)` out.
    pub fn applied_wrench_batch(
        &self,
        strut_forces: ArrayView2<f64>,
    ) -> Result<(Array2<f64>, Array2<f64>), HaptickError> {
        check_width("strut forces", &strut_forces, NUM_STRUTS)?;

        let n = strut_forces.nrows();
        let mut forces = Array2::zeros((n, 3));
        let mut torques = Array2::zeros((n, 3));
        for (i, row) in strut_forces.rows().into_iter().enumerate() {
            let mut x = [0.0; NUM_STRUTS];
            for (xi, &v) in x.iter_mut().zip(row.iter()) {
                *xi = v;
            }
            let w = self.applied_wrench(&x);
            for d in 0..3 {
                forces[[i, d]] = w.force[d];
                torques[[i, d]] = w.torque[d];
            }
        }
        Ok((forces, torques))
    }

    /// Force vector carried by each strut (6 × 3): its unit axis scaled by
    /// its magnitude.
    pub fn strut_force_components(&self, wrench: &Wrench) -> Array2<f64> {
        let x = self.strut_forces(wrench);
        let units = self.model.unit_vectors();
        Array2::from_shape_fn((NUM_STRUTS, 3), |(i, d)| units[[i, d]] * x[i])
    }

    /// Vertical component of every strut force for each of N wrenches (N × 6).
    pub fn vertical_components_batch(
        &self,
        forces: ArrayView2<f64>,
        torques: ArrayView2<f64>,
    ) -> Result<Array2<f64>, HaptickError> {
        let mut out = self.strut_forces_batch(forces, torques)?;
        let units = self.model.unit_vectors();
        for mut row in out.rows_mut() {
            for (i, v) in row.iter_mut().enumerate() {
                *v *= units[[i, 2]];
            }
        }
        Ok(out)
    }
}

// ─────────────────────────────────────────────────────────────
//  Helpers
// ─────────────────────────────────────────────────────────────

fn check_width(name: &str, a: &ArrayView2<f64>, width: usize) -> Result<(), HaptickError> {
    if a.ncols() != width {
        return Err(HaptickError::DimensionMismatch(format!(
            "{name} must be {width} wide, got {}",
            a.ncols()
        )));
    }
    Ok(())
}

fn rows_to_array(rows: &[StrutForces]) -> Array2<f64> {
    Array2::from_shape_fn((rows.len(), NUM_STRUTS), |(i, j)| rows[i][j])
}
