//! Smallest enclosing ball of a point set.
//!
//! The problem is posed as a second-order cone program
//!
//! ```text
//! minimize    r
//! subject to  ||p_i - x||_2 <= r   for every point p_i
//! ```
//!
//! and handed to the Clarabel interior point solver. [`ball_compute`] wraps
//! it as a transport compute capability: it reads an `input` array of shape
//! `(n, d)` and answers with `radius`, `midpoint` and the echoed `points`.

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use cvxball_core::{NamedArray, Payload, TransportError};
use ndarray::{ArrayView2, Ix2};
use thiserror::Error;
use tracing::{debug, info};

/// Name of the input array.
pub const INPUT_KEY: &str = "input";
/// Name of the radius in the result.
pub const RADIUS_KEY: &str = "radius";
/// Name of the center in the result.
pub const MIDPOINT_KEY: &str = "midpoint";
/// Name of the echoed input in the result.
pub const POINTS_KEY: &str = "points";

/// Duality gap and feasibility tolerance handed to Clarabel.
///
/// The radius converges with the gap, the center only with its square root,
/// so the defaults (1e-8) leave the midpoint off by up to ~1e-4.
pub const SOLVER_TOLERANCE: f64 = 1e-10;

/// Errors from building or solving the cone program.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Matrix has no values")]
    EmptyInput,

    #[error("Points have zero coordinates")]
    ZeroDimension,

    #[error("Point {row} has a non-finite coordinate")]
    NonFinite { row: usize },

    #[error("Invalid solver settings: {0}")]
    Settings(String),

    #[error("Solver stopped with status {status}")]
    NotSolved { status: String },
}

impl From<SolverError> for TransportError {
    fn from(err: SolverError) -> Self {
        match err {
            SolverError::EmptyInput
            | SolverError::ZeroDimension
            | SolverError::NonFinite { .. } => TransportError::InvalidInput {
                message: err.to_string(),
            },
            SolverError::Settings(_) | SolverError::NotSolved { .. } => {
                TransportError::ComputeFailed {
                    message: err.to_string(),
                }
            }
        }
    }
}

/// A ball given by its center and radius.
#[derive(Debug, Clone, PartialEq)]
pub struct Ball {
    pub radius: f64,
    pub center: Vec<f64>,
}

/// Compute the smallest ball containing every row of `points`.
pub fn min_enclosing_ball(points: ArrayView2<'_, f64>) -> Result<Ball, SolverError> {
    let (n, d) = points.dim();
    if n == 0 {
        return Err(SolverError::EmptyInput);
    }
    if d == 0 {
        return Err(SolverError::ZeroDimension);
    }
    if let Some(row) = points
        .rows()
        .into_iter()
        .position(|p| p.iter().any(|v| !v.is_finite()))
    {
        return Err(SolverError::NonFinite { row });
    }

    // Variables z = [r, x_0 .. x_{d-1}]. Each point contributes one cone
    // block s = b - A z = (r, p_i - x) in SOC(d + 1).
    let vars = d + 1;
    let block = d + 1;
    let rows = n * block;

    let p = CscMatrix::<f64>::zeros((vars, vars));
    let mut q = vec![0.0; vars];
    q[0] = 1.0;

    let mut colptr = Vec::with_capacity(vars + 1);
    let mut rowval = Vec::with_capacity(n * vars);
    let mut nzval = Vec::with_capacity(n * vars);
    colptr.push(0);
    // Column 0 (r): -1 on the first row of every block
    for i in 0..n {
        rowval.push(i * block);
        nzval.push(-1.0);
    }
    colptr.push(rowval.len());
    // Column 1 + j (x_j): +1 on row j + 1 of every block
    for j in 0..d {
        for i in 0..n {
            rowval.push(i * block + 1 + j);
            nzval.push(1.0);
        }
        colptr.push(rowval.len());
    }
    let a = CscMatrix::new(rows, vars, colptr, rowval, nzval);

    let mut b = vec![0.0; rows];
    for (i, point) in points.rows().into_iter().enumerate() {
        for (j, &coord) in point.iter().enumerate() {
            b[i * block + 1 + j] = coord;
        }
    }

    let cones = vec![SupportedConeT::SecondOrderConeT(block); n];

    let settings = DefaultSettingsBuilder::default()
        .verbose(false)
        .tol_gap_abs(SOLVER_TOLERANCE)
        .tol_gap_rel(SOLVER_TOLERANCE)
        .tol_feas(SOLVER_TOLERANCE)
        .build()
        .map_err(|e| SolverError::Settings(e.to_string()))?;

    debug!("Solving enclosing ball SOCP: {} points in {} dimensions", n, d);
    let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
    solver.solve();

    match &solver.solution.status {
        SolverStatus::Solved | SolverStatus::AlmostSolved => {}
        other => {
            return Err(SolverError::NotSolved {
                status: format!("{:?}", other),
            })
        }
    }

    let x = &solver.solution.x;
    Ok(Ball {
        radius: x[0],
        center: x[1..].to_vec(),
    })
}

/// Compute capability for the transport server.
///
/// Expects `input` with shape `(n, d)`; returns `radius` (0-d), `midpoint`
/// (length `d`) and `points` (the input, unchanged). The radius is accurate
/// to about 1e-8, each midpoint coordinate to about 1e-5.
pub fn ball_compute(payload: &Payload) -> cvxball_core::Result<Payload> {
    info!("Matrices: {:?}", payload.names().collect::<Vec<_>>());
    let input = payload.require(INPUT_KEY)?;

    let points = input
        .as_array()
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| {
            TransportError::invalid_input(format!(
                "Array '{}' must be two-dimensional (points x coordinates), got shape {:?}",
                INPUT_KEY,
                input.shape()
            ))
        })?;

    info!("Computing smallest enclosing ball...");
    let ball = min_enclosing_ball(points)?;
    debug!("Radius {} at {:?}", ball.radius, ball.center);

    Ok(Payload::new()
        .with(NamedArray::scalar(RADIUS_KEY, ball.radius))
        .with(NamedArray::vector(MIDPOINT_KEY, ball.center))
        .with(NamedArray::from_array(POINTS_KEY, points.to_owned())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    const CENTER_TOL: f64 = 1e-4;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {} got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_unit_square() {
        let points = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        let ball = min_enclosing_ball(points.view()).unwrap();

        assert_close(ball.radius, std::f64::consts::FRAC_1_SQRT_2, 1e-6);
        assert_close(ball.center[0], 0.5, CENTER_TOL);
        assert_close(ball.center[1], 0.5, CENTER_TOL);
    }

    #[test]
    fn test_three_points() {
        let points = array![[2.0, 4.0], [0.0, 0.0], [2.5, 2.0]];
        let ball = min_enclosing_ball(points.view()).unwrap();

        assert_close(ball.radius, 5.0_f64.sqrt(), 1e-6);
        assert_close(ball.center[0], 1.0, CENTER_TOL);
        assert_close(ball.center[1], 2.0, CENTER_TOL);
    }

    #[test]
    fn test_two_points_is_midpoint() {
        let points = array![[1.0, 2.0], [3.0, 4.0]];
        let ball = min_enclosing_ball(points.view()).unwrap();

        assert_close(ball.radius, 2.0_f64.sqrt(), 1e-6);
        assert_close(ball.center[0], 2.0, CENTER_TOL);
        assert_close(ball.center[1], 3.0, CENTER_TOL);
    }

    #[test]
    fn test_three_dimensions() {
        let points = array![
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, -1.0],
            [0.2, 0.2, 0.2]
        ];
        let ball = min_enclosing_ball(points.view()).unwrap();

        assert_close(ball.radius, 1.0, 1e-6);
        for c in &ball.center {
            assert_close(*c, 0.0, CENTER_TOL);
        }
    }

    #[test]
    fn test_symmetric_center_precision() {
        // Octahedron vertices plus an interior point: the center is the origin
        let points = array![
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0],
            [0.2, 0.2, 0.2]
        ];
        let ball = min_enclosing_ball(points.view()).unwrap();

        assert_close(ball.radius, 1.0, 1e-6);
        assert_eq!(ball.center.len(), 3);
        for c in &ball.center {
            assert_close(*c, 0.0, CENTER_TOL);
        }

        // Fewer tangent points; the optimum is still unique
        let sparse = array![
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, -1.0],
            [0.2, 0.2, 0.2]
        ];
        let ball = min_enclosing_ball(sparse.view()).unwrap();
        let offset = ball.center.iter().map(|c| c * c).sum::<f64>().sqrt();
        assert!(offset <= CENTER_TOL, "center {:?} is {} from origin", ball.center, offset);
    }

    #[test]
    fn test_every_point_is_enclosed() {
        let points = Array2::from_shape_fn((30, 2), |(i, j)| {
            let t = i as f64 * 0.7 + j as f64 * 1.3;
            t.sin() * (1.0 + i as f64 / 10.0)
        });
        let ball = min_enclosing_ball(points.view()).unwrap();

        for p in points.rows() {
            let dist = p
                .iter()
                .zip(&ball.center)
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt();
            assert!(dist <= ball.radius + 1e-6);
        }
    }

    #[test]
    fn test_empty_input() {
        let points = Array2::<f64>::zeros((0, 2));
        assert!(matches!(
            min_enclosing_ball(points.view()),
            Err(SolverError::EmptyInput)
        ));
    }

    #[test]
    fn test_non_finite_input() {
        let points = array![[0.0, 0.0], [f64::NAN, 1.0]];
        assert!(matches!(
            min_enclosing_ball(points.view()),
            Err(SolverError::NonFinite { row: 1 })
        ));
    }

    #[test]
    fn test_ball_compute_outputs() {
        let input = NamedArray::from_array(
            INPUT_KEY,
            array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
        );
        let result = ball_compute(&Payload::new().with(input.clone())).unwrap();

        let radius = result.get(RADIUS_KEY).unwrap();
        assert_eq!(radius.ndim(), 0);
        assert_close(radius.data()[0], std::f64::consts::FRAC_1_SQRT_2, 1e-6);

        let midpoint = result.get(MIDPOINT_KEY).unwrap();
        assert_eq!(midpoint.shape(), &[2]);

        let points = result.get(POINTS_KEY).unwrap();
        assert_eq!(points.as_array(), input.as_array());
    }

    #[test]
    fn test_ball_compute_empty_is_invalid_input() {
        let input = NamedArray::new(INPUT_KEY, vec![], vec![0, 2]).unwrap();
        let result = ball_compute(&Payload::new().with(input));
        match result {
            Err(TransportError::InvalidInput { message }) => {
                assert_eq!(message, "Matrix has no values")
            }
            other => panic!("Expected InvalidInput, got: {:?}", other),
        }
    }

    #[test]
    fn test_ball_compute_wrong_key() {
        let wrong = NamedArray::from_array("wrong_key", array![[0.0, 0.0], [1.0, 1.0]]);
        assert!(matches!(
            ball_compute(&Payload::new().with(wrong)),
            Err(TransportError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_ball_compute_rejects_vectors() {
        let flat = NamedArray::vector(INPUT_KEY, vec![0.0, 1.0, 2.0]);
        assert!(matches!(
            ball_compute(&Payload::new().with(flat)),
            Err(TransportError::InvalidInput { .. })
        ));
    }
}
