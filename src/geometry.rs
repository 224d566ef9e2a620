//! Hexapod geometry: joint layout, strut pairing, Plücker matrix and inverse.
//!
//! Built once from [`GeometryParameters`]; every derived quantity is fixed
//! at construction and only read afterwards.

use crate::types::{
    GeometryParameters, HaptickError, BOTTOM_ROTATION, NUM_STRUTS, SINGULARITY_TOLERANCE, TRIANGLE,
};
use ndarray::{Array2, ArrayView2};
use sprs::{CsMat, TriMat};

// ─────────────────────────────────────────────────────────────
//  Strut pairing
// ─────────────────────────────────────────────────────────────

/// `(top joint, bottom joint)` of each strut.  The one-slot shift of the
/// bottom joints produces the zig-zag between the two triangles.
pub const STRUT_PAIRS: [(usize, usize); NUM_STRUTS] = [(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0)];

/// Signed strut/joint incidence (6 × 12).
///
/// Joint columns are the six top joints followed by the six bottom joints.
/// Convention:  C[s, top] = +1,  C[s, bottom] = −1,  so C · N gives the
/// top-minus-bottom vector of every strut.
pub fn strut_incidence() -> CsMat<f64> {
    let mut tri = TriMat::new((NUM_STRUTS, 2 * NUM_STRUTS));
    for (s, &(top, bottom)) in STRUT_PAIRS.iter().enumerate() {
        tri.add_triplet(s, top, 1.0);
        tri.add_triplet(s, NUM_STRUTS + bottom, -1.0);
    }
    tri.to_csc()
}

// ─────────────────────────────────────────────────────────────
//  Joint layout
// ─────────────────────────────────────────────────────────────

/// Split each base angle into a ± pair: even slots at `base − half`,
/// odd slots at `base + half`.
fn paired_angles(rotation: f64, half: f64) -> [f64; NUM_STRUTS] {
    let mut angles = [0.0; NUM_STRUTS];
    for (k, &base) in TRIANGLE.iter().enumerate() {
        angles[2 * k] = base + rotation - half;
        angles[2 * k + 1] = base + rotation + half;
    }
    angles
}

pub fn top_joint_angles(params: &GeometryParameters) -> [f64; NUM_STRUTS] {
    paired_angles(0.0, params.half_top_angle())
}

pub fn bottom_joint_angles(params: &GeometryParameters) -> [f64; NUM_STRUTS] {
    paired_angles(BOTTOM_ROTATION, params.half_bottom_angle())
}

/// Points on a circle of `radius` in the plane at height `z` (6 × 3).
pub fn joint_positions(angles: &[f64; NUM_STRUTS], radius: f64, z: f64) -> Array2<f64> {
    let mut out = Array2::zeros((NUM_STRUTS, 3));
    for (i, &theta) in angles.iter().enumerate() {
        out[[i, 0]] = radius * theta.cos();
        out[[i, 1]] = radius * theta.sin();
        out[[i, 2]] = z;
    }
    out
}

/// Joint coordinates of each strut, row `i` belonging to strut `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct StrutEndpoints {
    /// Top joints (6 × 3), z = height.
    pub top: Array2<f64>,
    /// Bottom joints already permuted into strut order (6 × 3), z = 0.
    pub bottom: Array2<f64>,
}

// ─────────────────────────────────────────────────────────────
//  Model
// ─────────────────────────────────────────────────────────────

/// Immutable free-body model of the platform.
#[derive(Debug, Clone)]
pub struct GeometryModel {
    params: GeometryParameters,
    endpoints: StrutEndpoints,
    strut_lengths: [f64; NUM_STRUTS],
    /// Unit strut axes, top joint minus bottom joint (6 × 3).
    unit_vectors: Array2<f64>,
    /// Rows 0..3 unit axes, rows 3..6 moments about the origin; one column per strut.
    plucker: Array2<f64>,
    inverse_plucker: Array2<f64>,
}

impl GeometryModel {
    /// Validate the parameters, lay out the joints and invert the Plücker
    /// matrix.
    ///
    /// Returns `Err(SingularGeometry)` when the strut axes do not span all
    /// six degrees of freedom.
    pub fn new(params: GeometryParameters) -> Result<Self, HaptickError> {
        params.validate()?;

        let top_joints = joint_positions(&top_joint_angles(&params), params.top_radius, params.height);
        let bottom_joints = joint_positions(&bottom_joint_angles(&params), params.bottom_radius, 0.0);

        // ── 1. Stack joints and apply the incidence ────────
        let mut joints = Array2::zeros((2 * NUM_STRUTS, 3));
        joints.slice_mut(ndarray::s![..NUM_STRUTS, ..]).assign(&top_joints);
        joints.slice_mut(ndarray::s![NUM_STRUTS.., ..]).assign(&bottom_joints);

        let incidence = strut_incidence();
        let mut strut_vectors = Array2::zeros((NUM_STRUTS, 3));
        spmm_into(&incidence, &joints.view(), &mut strut_vectors);

        // ── 2. Normalise ──────────────────────────────────
        let mut strut_lengths = [0.0; NUM_STRUTS];
        let mut unit_vectors = strut_vectors;
        for (i, mut row) in unit_vectors.rows_mut().into_iter().enumerate() {
            let len = row.dot(&row).sqrt();
            strut_lengths[i] = len;
            row /= len;
        }

        // ── 3. Plücker coordinates ────────────────────────
        let mut plucker = Array2::zeros((6, NUM_STRUTS));
        for i in 0..NUM_STRUTS {
            let p = [top_joints[[i, 0]], top_joints[[i, 1]], top_joints[[i, 2]]];
            let u = [unit_vectors[[i, 0]], unit_vectors[[i, 1]], unit_vectors[[i, 2]]];
            let m = cross(&p, &u);
            for d in 0..3 {
                plucker[[d, i]] = u[d];
                plucker[[d + 3, i]] = m[d];
            }
        }

        let inverse_plucker = invert(&plucker)?;

        let bottom = Array2::from_shape_fn((NUM_STRUTS, 3), |(i, d)| bottom_joints[[STRUT_PAIRS[i].1, d]]);

        Ok(Self {
            params,
            endpoints: StrutEndpoints { top: top_joints, bottom },
            strut_lengths,
            unit_vectors,
            plucker,
            inverse_plucker,
        })
    }

    pub fn parameters(&self) -> &GeometryParameters {
        &self.params
    }

    pub fn endpoints(&self) -> &StrutEndpoints {
        &self.endpoints
    }

    pub fn strut_lengths(&self) -> &[f64; NUM_STRUTS] {
        &self.strut_lengths
    }

    pub fn unit_vectors(&self) -> &Array2<f64> {
        &self.unit_vectors
    }

    pub fn plucker_matrix(&self) -> &Array2<f64> {
        &self.plucker
    }

    pub fn inverse_plucker_matrix(&self) -> &Array2<f64> {
        &self.inverse_plucker
    }
}

// ─────────────────────────────────────────────────────────────
//  Dense helpers
// ─────────────────────────────────────────────────────────────

#[inline]
fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Invert a square matrix by Gauss–Jordan elimination with partial pivoting.
///
/// A pivot no larger than `SINGULARITY_TOLERANCE` times the largest entry
/// of `a` is reported as `SingularGeometry`.
pub fn invert(a: &Array2<f64>) -> Result<Array2<f64>, HaptickError> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(HaptickError::DimensionMismatch(format!(
            "cannot invert a {}×{} matrix",
            n,
            a.ncols()
        )));
    }

    let scale = a.iter().fold(0.0_f64, |m, &v| m.max(v.abs()));
    let tol = SINGULARITY_TOLERANCE * scale;

    let mut m = a.clone();
    let mut inv = Array2::<f64>::eye(n);

    for col in 0..n {
        // Find pivot
        let mut max_row = col;
        let mut max_val = m[[col, col]].abs();
        for row in (col + 1)..n {
            let v = m[[row, col]].abs();
            if v > max_val {
                max_val = v;
                max_row = row;
            }
        }

        if !(max_val > tol) {
            return Err(HaptickError::SingularGeometry { column: col, pivot: max_val });
        }

        // Swap rows
        if max_row != col {
            for j in 0..n {
                m.swap([col, j], [max_row, j]);
                inv.swap([col, j], [max_row, j]);
            }
        }

        // Normalise pivot row
        let pivot = m[[col, col]];
        for j in 0..n {
            m[[col, j]] /= pivot;
            inv[[col, j]] /= pivot;
        }

        // Eliminate above and below
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = m[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                m[[row, j]] -= factor * m[[col, j]];
                inv[[row, j]] -= factor * inv[[col, j]];
            }
        }
    }

    Ok(inv)
}

/// out = A * B   where A is CSC (m × k), B is dense (k × w), out is dense (m × w).
fn spmm_into(a: &CsMat<f64>, b: &ArrayView2<f64>, out: &mut Array2<f64>) {
    out.fill(0.0);
    let width = b.ncols();
    for col in 0..a.cols() {
        let start = a.indptr().raw_storage()[col];
        let end_ = a.indptr().raw_storage()[col + 1];
        for nz in start..end_ {
            let row = a.indices()[nz];
            let val = a.data()[nz];
            for d in 0..width {
                out[[row, d]] += val * b[[col, d]];
            }
        }
    }
}
