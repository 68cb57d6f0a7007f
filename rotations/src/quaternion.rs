use super::*;
use crate::rotation_vector::RotationVector;
use nalgebra::{Matrix3, Vector3, Vector4};
use rand::{Rng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg};
use thiserror::Error;
use uncertainty::{Dispersion, Uncertainty, UncertaintyErrors};
use utilities::{ValidationErrors, vector4_from_slice};

/// A struct representing a quaternion for 3D rotations, scalar last.
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

/// Errors that can occur when creating a `Quaternion`.
#[derive(Debug, Clone, Error, Copy, PartialEq)]
pub enum QuaternionErrors {
    #[error("got zero magnitude quaternion")]
    ZeroMagnitude,
    #[error("got zero magnitude rotation axis")]
    ZeroMagnitudeAxis,
    #[error("quaternion norm is off unity by {drift:e}")]
    NotUnit { drift: f64 },
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
}

impl Quaternion {
    /// Creates an identity quaternion.
    ///
    /// # Returns
    ///
    /// A `Quaternion` representing no rotation.
    pub const IDENTITY: Self = Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    /// Creates a new `Quaternion` without normalizing it.
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    // Dot product of two quaternions
    pub fn dot(&self, other: &Quaternion) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    /// Conjugate, which is the inverse for unit quaternions.
    pub fn inv(&self) -> Quaternion {
        Quaternion::new(-self.x, -self.y, -self.z, self.w)
    }

    pub fn mag(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn as_vector4(&self) -> Vector4<f64> {
        Vector4::new(self.x, self.y, self.z, self.w)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }

    pub fn normalize(&self) -> Result<Self, QuaternionErrors> {
        if !self.is_finite() {
            let index = [self.x, self.y, self.z, self.w]
                .iter()
                .position(|v| !v.is_finite())
                .unwrap_or(0);
            return Err(ValidationErrors::NonFinite { index }.into());
        }
        let mag = self.mag();
        if mag < f64::EPSILON {
            return Err(QuaternionErrors::ZeroMagnitude);
        }
        Ok(Quaternion::new(
            self.x / mag,
            self.y / mag,
            self.z / mag,
            self.w / mag,
        ))
    }
}

impl Default for Quaternion {
    /// Provides the default value for a quaternion.
    ///
    /// # Returns
    ///
    /// The identity quaternion.
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Debug for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Quaternion ")?;
        writeln!(f, "   x: {: >10.6}", self.x)?;
        writeln!(f, "   y: {: >10.6}", self.y)?;
        writeln!(f, "   z: {: >10.6}", self.z)?;
        writeln!(f, "   w: {: >10.6}", self.w)?;
        Ok(())
    }
}

impl Mul<Quaternion> for Quaternion {
    type Output = Self;

    /// Multiplies two quaternions.
    /// IMPORTANT: This follows from the "x" logic rather than the "dot" logic from Markley/Crassidis
    /// Successive multiplications act like DCMs so that a rotation from a2c is
    /// q_a2c = q_b2c * q_a2b
    ///
    /// # Arguments
    ///
    /// * `rhs` - The right-hand side quaternion.
    ///
    /// # Returns
    ///
    /// The product of the two quaternions.
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.x + self.x * rhs.w - self.y * rhs.z + self.z * rhs.y,
            self.w * rhs.y + self.y * rhs.w - self.z * rhs.x + self.x * rhs.z,
            self.w * rhs.z + self.z * rhs.w - self.x * rhs.y + self.y * rhs.x,
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        )
    }
}

impl Mul<f64> for Quaternion {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs, self.w * rhs)
    }
}

impl MulAssign<f64> for Quaternion {
    fn mul_assign(&mut self, rhs: f64) {
        self.x *= rhs;
        self.y *= rhs;
        self.z *= rhs;
        self.w *= rhs;
    }
}

impl Add<Quaternion> for Quaternion {
    type Output = Self;
    /// Component-wise sum.
    /// NOTE: this is not a composition of attitudes, it is only meaningful
    /// for accumulating quaternion derivatives in an integrator.
    fn add(self, rhs: Quaternion) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z, self.w + rhs.w)
    }
}

impl AddAssign<&Quaternion> for Quaternion {
    fn add_assign(&mut self, rhs: &Quaternion) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
        self.w += rhs.w;
    }
}

impl Neg for Quaternion {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, -self.w)
    }
}

/// Largest norm drift accepted when reading a stored unit quaternion.
pub const STORED_NORM_TOLERANCE: f64 = 1e-6;

/// A quaternion that is kept at unit norm.
///
/// Deserialized values go through the same checks as [`UnitQuaternion::try_from`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Quaternion", into = "Quaternion")]
pub struct UnitQuaternion(pub(crate) Quaternion);

impl Default for UnitQuaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl UnitQuaternion {
    pub const IDENTITY: Self = Self(Quaternion::IDENTITY);

    /// Normalizes the components into a unit quaternion.
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Result<Self, QuaternionErrors> {
        Ok(Self(Quaternion::new(x, y, z, w).normalize()?))
    }

    /// Passive rotation of `angle` radians about `axis`.
    pub fn from_axis_angle(axis: &Vector3<f64>, angle: f64) -> Result<Self, QuaternionErrors> {
        let rv = RotationVector::from_axis_angle(axis, angle)
            .map_err(|_| QuaternionErrors::ZeroMagnitudeAxis)?;
        Ok(UnitQuaternion::from(&rv))
    }

    /// Draws a random attitude, for property tests and dispersions.
    pub fn random(rng: &mut SmallRng) -> Self {
        loop {
            let q = Quaternion::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            );
            // rejection sampling inside the unit ball keeps the draw uniform
            let mag = q.mag();
            if mag > 0.1 && mag <= 1.0 {
                return Self(q * (1.0 / mag));
            }
        }
    }

    pub fn quaternion(&self) -> &Quaternion {
        &self.0
    }

    pub fn x(&self) -> f64 {
        self.0.x
    }
    pub fn y(&self) -> f64 {
        self.0.y
    }
    pub fn z(&self) -> f64 {
        self.0.z
    }
    pub fn w(&self) -> f64 {
        self.0.w
    }

    /// Returns the representative with a non-negative scalar part.
    pub fn canonical(&self) -> Self {
        if self.0.w < 0.0 { Self(-self.0) } else { *self }
    }

    /// Distance of the stored norm from 1.
    pub fn norm_deviation(&self) -> f64 {
        (self.0.mag() - 1.0).abs()
    }

    /// Wraps a nearly unit quaternion, renormalizing if the drift exceeds `tol`.
    pub fn from_drifted(q: Quaternion, tol: f64) -> Result<Self, QuaternionErrors> {
        if q.is_finite() && (q.mag() - 1.0).abs() <= tol {
            Ok(Self(q))
        } else {
            Ok(Self(q.normalize()?))
        }
    }

    /// Applies `rhs` first, then `self`.
    pub fn compose(&self, rhs: &UnitQuaternion) -> Self {
        self.compose_with(rhs, &RotationTolerances::default())
    }

    pub fn compose_with(&self, rhs: &UnitQuaternion, tolerances: &RotationTolerances) -> Self {
        let q = self.0 * rhs.0;
        // the product of two unit quaternions is never zero
        Self::from_drifted(q, tolerances.quaternion_norm).unwrap_or(Self(q))
    }

    /// Rotation angle in radians between two attitudes, in [0, π].
    pub fn angle_to(&self, other: &UnitQuaternion) -> f64 {
        // atan2 keeps precision near zero where acos of the dot product does not
        let relative = self.0 * other.0.inv();
        2.0 * relative.vector().norm().atan2(relative.w.abs())
    }

    /// The passive direction cosine matrix A(q).
    pub fn dcm(&self) -> Matrix3<f64> {
        let (q1, q2, q3, q4) = (self.0.x, self.0.y, self.0.z, self.0.w);
        Matrix3::new(
            q1 * q1 - q2 * q2 - q3 * q3 + q4 * q4,
            2.0 * (q1 * q2 + q3 * q4),
            2.0 * (q1 * q3 - q2 * q4),
            2.0 * (q2 * q1 - q3 * q4),
            -q1 * q1 + q2 * q2 - q3 * q3 + q4 * q4,
            2.0 * (q2 * q3 + q1 * q4),
            2.0 * (q3 * q1 + q2 * q4),
            2.0 * (q3 * q2 - q1 * q4),
            -q1 * q1 - q2 * q2 + q3 * q3 + q4 * q4,
        )
    }

    /// Shepperd's method, branching on the largest of the trace and the diagonal.
    pub fn from_dcm(m: &Matrix3<f64>) -> Result<Self, QuaternionErrors> {
        let trace = m.trace();
        let candidates = [trace, m[(0, 0)], m[(1, 1)], m[(2, 2)]];
        let mut branch = 0;
        for (i, value) in candidates.iter().enumerate() {
            if *value > candidates[branch] {
                branch = i;
            }
        }

        let q = match branch {
            0 => {
                let w = 0.5 * (1.0 + trace).max(0.0).sqrt();
                let f = 0.25 / w;
                Quaternion::new(
                    (m[(1, 2)] - m[(2, 1)]) * f,
                    (m[(2, 0)] - m[(0, 2)]) * f,
                    (m[(0, 1)] - m[(1, 0)]) * f,
                    w,
                )
            }
            1 => {
                let x = 0.5 * (1.0 + m[(0, 0)] - m[(1, 1)] - m[(2, 2)]).max(0.0).sqrt();
                let f = 0.25 / x;
                Quaternion::new(
                    x,
                    (m[(0, 1)] + m[(1, 0)]) * f,
                    (m[(0, 2)] + m[(2, 0)]) * f,
                    (m[(1, 2)] - m[(2, 1)]) * f,
                )
            }
            2 => {
                let y = 0.5 * (1.0 - m[(0, 0)] + m[(1, 1)] - m[(2, 2)]).max(0.0).sqrt();
                let f = 0.25 / y;
                Quaternion::new(
                    (m[(0, 1)] + m[(1, 0)]) * f,
                    y,
                    (m[(1, 2)] + m[(2, 1)]) * f,
                    (m[(2, 0)] - m[(0, 2)]) * f,
                )
            }
            _ => {
                let z = 0.5 * (1.0 - m[(0, 0)] - m[(1, 1)] + m[(2, 2)]).max(0.0).sqrt();
                let f = 0.25 / z;
                Quaternion::new(
                    (m[(0, 2)] + m[(2, 0)]) * f,
                    (m[(1, 2)] + m[(2, 1)]) * f,
                    z,
                    (m[(0, 1)] - m[(1, 0)]) * f,
                )
            }
        };

        Ok(Self(q.normalize()?).canonical())
    }

    pub fn slerp(q1: &UnitQuaternion, q2: &UnitQuaternion, t: f64) -> Self {
        // t is 0 - 1, where result is q1 when t is 0 and result is q2 when t is 1
        let q1 = q1.0;
        let mut dot = q1.dot(&q2.0);

        // q and -q are the same attitude, take the shorter arc
        let q2 = if dot < 0.0 {
            dot = -dot;
            -q2.0
        } else {
            q2.0
        };

        // nearly parallel, fall back to normalized linear interpolation
        if dot > 0.9995 {
            let lerp = q1 * (1.0 - t) + q2 * t;
            return lerp
                .normalize()
                .map(Self)
                .unwrap_or(Self(q1));
        }

        let theta = dot.acos();
        let s = theta.sin();
        let a = ((1.0 - t) * theta).sin() / s;
        let b = (t * theta).sin() / s;
        let q = q1 * a + q2 * b;
        q.normalize()
            .map(Self)
            .unwrap_or(Self(q1))
    }
}

impl TryFrom<&Quaternion> for UnitQuaternion {
    type Error = QuaternionErrors;
    fn try_from(value: &Quaternion) -> Result<Self, QuaternionErrors> {
        Ok(Self(value.normalize()?))
    }
}

impl TryFrom<&[f64]> for UnitQuaternion {
    type Error = QuaternionErrors;
    /// Reads `[x, y, z, w]`, rejecting wrong lengths and non-finite values.
    fn try_from(values: &[f64]) -> Result<Self, QuaternionErrors> {
        let v = vector4_from_slice(values)?;
        UnitQuaternion::new(v[0], v[1], v[2], v[3])
    }
}

/// Accepts a stored quaternion whose norm is within [`STORED_NORM_TOLERANCE`] of one.
impl TryFrom<Quaternion> for UnitQuaternion {
    type Error = QuaternionErrors;
    fn try_from(value: Quaternion) -> Result<Self, QuaternionErrors> {
        utilities::validate_finite(value.as_vector4().as_slice(), 4)?;
        let drift = (value.mag() - 1.0).abs();
        if drift > STORED_NORM_TOLERANCE {
            return Err(QuaternionErrors::NotUnit { drift });
        }
        UnitQuaternion::from_drifted(value, RotationTolerances::default().quaternion_norm)
    }
}

impl From<UnitQuaternion> for Quaternion {
    fn from(value: UnitQuaternion) -> Self {
        value.0
    }
}

impl From<&UnitQuaternion> for Quaternion {
    fn from(value: &UnitQuaternion) -> Self {
        value.0
    }
}

impl From<&RotationMatrix> for UnitQuaternion {
    fn from(value: &RotationMatrix) -> Self {
        // a validated rotation matrix always yields a non-zero quaternion
        UnitQuaternion::from_dcm(&value.get_value()).unwrap_or(UnitQuaternion::IDENTITY)
    }
}

impl From<&EulerAngles> for UnitQuaternion {
    /// q = q_k(ψ) * q_j(θ) * q_i(φ), the first axis of the sequence is applied first.
    fn from(euler: &EulerAngles) -> Self {
        let (i, j, k) = euler.sequence.axes();
        let q1 = elementary(i, euler.phi);
        let q2 = elementary(j, euler.theta);
        let q3 = elementary(k, euler.psi);
        UnitQuaternion(q3 * q2 * q1)
    }
}

impl From<&RotationVector> for UnitQuaternion {
    fn from(rv: &RotationVector) -> Self {
        let angle = rv.angle();
        let v = rv.vector();
        if angle < 1e-12 {
            // first order, sin(a/2)/a -> 1/2
            let q = Quaternion::new(0.5 * v[0], 0.5 * v[1], 0.5 * v[2], 1.0);
            return UnitQuaternion(q.normalize().unwrap_or(Quaternion::IDENTITY));
        }
        let s = (0.5 * angle).sin() / angle;
        UnitQuaternion(Quaternion::new(
            v[0] * s,
            v[1] * s,
            v[2] * s,
            (0.5 * angle).cos(),
        ))
    }
}

impl From<&Rotation> for UnitQuaternion {
    fn from(rotation: &Rotation) -> Self {
        match rotation {
            Rotation::EulerAngles(v) => v.into(),
            Rotation::Quaternion(v) => *v,
            Rotation::RotationMatrix(v) => v.into(),
            Rotation::RotationVector(v) => v.into(),
        }
    }
}

/// Quaternion of the passive elementary rotation about a coordinate axis.
fn elementary(axis: usize, angle: f64) -> Quaternion {
    let (s, c) = (0.5 * angle).sin_cos();
    match axis {
        0 => Quaternion::new(s, 0.0, 0.0, c),
        1 => Quaternion::new(0.0, s, 0.0, c),
        _ => Quaternion::new(0.0, 0.0, s, c),
    }
}

impl RotationTrait for UnitQuaternion {
    /// Rotates a vector by the quaternion.
    /// Follows the logic from Markley/Crassidis
    /// aka Active Rotation or "Alibi"
    fn rotate(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.dcm().transpose() * v
    }

    /// Transforms a vector by the quaternion.
    /// Follows the logic from Markley/Crassidis
    /// Section 2.9.3, equations 2.125 and 2.130
    /// aka Passive Rotation or "Alias"
    fn transform(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.dcm() * v
    }

    fn identity() -> Self {
        Self::IDENTITY
    }

    fn inv(&self) -> Self {
        // conjugate keeps the norm
        UnitQuaternion(self.0.inv())
    }
}

impl Mul<UnitQuaternion> for UnitQuaternion {
    type Output = Self;
    fn mul(self, rhs: UnitQuaternion) -> Self::Output {
        self.compose(&rhs)
    }
}

impl Neg for UnitQuaternion {
    type Output = Self;
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

/// Builds attitudes for Monte-Carlo runs: a nominal attitude perturbed by a
/// rotation of dispersed angle about a uniformly random axis.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct UnitQuaternionBuilder {
    pub nominal: UnitQuaternion,
    pub angle_dispersion: Option<Dispersion>,
}

impl UnitQuaternionBuilder {
    pub fn new(nominal: UnitQuaternion) -> Self {
        Self { nominal, angle_dispersion: None }
    }

    pub fn with_angle_dispersion(mut self, dispersion: Dispersion) -> Self {
        self.angle_dispersion = Some(dispersion);
        self
    }
}

impl Uncertainty for UnitQuaternionBuilder {
    type Output = UnitQuaternion;
    type Error = UncertaintyErrors;
    fn sample(&self, nominal: bool, rng: &mut SmallRng) -> Result<UnitQuaternion, UncertaintyErrors> {
        let dispersion = match (&self.angle_dispersion, nominal) {
            (Some(dispersion), false) => dispersion,
            _ => return Ok(self.nominal),
        };
        let angle = dispersion.sample(rng)?;
        let axis = loop {
            let v = Vector3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            );
            let n = v.norm();
            if n > 0.1 && n <= 1.0 {
                break v / n;
            }
        };
        let perturbation = UnitQuaternion::from(&RotationVector::new(axis * angle));
        Ok(perturbation.compose(&self.nominal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use std::f64::consts::PI;

    const TOL: f64 = 1e-12;

    #[test]
    fn test_quaternion_new() {
        let q = UnitQuaternion::new(1.0, 2.0, 3.0, 4.0).unwrap();
        let mag = (1.0_f64 + 4.0 + 9.0 + 16.0).sqrt();
        assert_abs_diff_eq!(q.x(), 1.0 / mag, epsilon = TOL);
        assert_abs_diff_eq!(q.y(), 2.0 / mag, epsilon = TOL);
        assert_abs_diff_eq!(q.z(), 3.0 / mag, epsilon = TOL);
        assert_abs_diff_eq!(q.w(), 4.0 / mag, epsilon = TOL);
    }

    #[test]
    fn test_quaternion_zero_magnitude() {
        assert_eq!(
            UnitQuaternion::new(0.0, 0.0, 0.0, 0.0),
            Err(QuaternionErrors::ZeroMagnitude)
        );
    }

    #[test]
    fn test_quaternion_from_slice() {
        let q = UnitQuaternion::try_from([0.0, 0.0, 0.0, 2.0].as_slice()).unwrap();
        assert_eq!(q, UnitQuaternion::IDENTITY);
        assert!(matches!(
            UnitQuaternion::try_from([0.0, 0.0, 1.0].as_slice()),
            Err(QuaternionErrors::Validation(ValidationErrors::ShapeMismatch { .. }))
        ));
        assert!(matches!(
            UnitQuaternion::try_from([0.0, f64::NAN, 0.0, 1.0].as_slice()),
            Err(QuaternionErrors::Validation(ValidationErrors::NonFinite { index: 1 }))
        ));
    }

    #[test]
    fn test_quaternion_transform() {
        // frame rotated +90 deg about z: the inertial x axis reads as -y in the new frame
        let q = UnitQuaternion::from_axis_angle(&Vector3::z(), PI / 2.0).unwrap();
        let v = q.transform(&Vector3::new(1.0, 0.0, 0.0));
        assert_abs_diff_eq!(v, Vector3::new(0.0, -1.0, 0.0), epsilon = TOL);

        let v = q.rotate(&Vector3::new(1.0, 0.0, 0.0));
        assert_abs_diff_eq!(v, Vector3::new(0.0, 1.0, 0.0), epsilon = TOL);
    }

    #[test]
    fn test_multiplication_matches_matrix_product() {
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..50 {
            let p = UnitQuaternion::random(&mut rng);
            let q = UnitQuaternion::random(&mut rng);
            let pq = p * q;
            assert_abs_diff_eq!(pq.dcm(), p.dcm() * q.dcm(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_dcm_round_trip_all_branches() {
        // one attitude per Shepperd branch
        let cases = [
            UnitQuaternion::new(0.1, 0.2, 0.3, 0.9).unwrap(),
            UnitQuaternion::new(0.9, 0.2, 0.1, 0.1).unwrap(),
            UnitQuaternion::new(0.1, 0.9, 0.2, 0.1).unwrap(),
            UnitQuaternion::new(0.2, 0.1, 0.9, 0.1).unwrap(),
            UnitQuaternion::new(1.0, 0.0, 0.0, 0.0).unwrap(),
        ];
        for q in cases {
            let back = UnitQuaternion::from_dcm(&q.dcm()).unwrap();
            assert_abs_diff_eq!(q.angle_to(&back), 0.0, epsilon = 1e-12);
            assert!(back.w() >= 0.0);
        }
    }

    #[test]
    fn test_inverse_composition_is_identity() {
        let mut rng = SmallRng::seed_from_u64(5);
        for _ in 0..50 {
            let q = UnitQuaternion::random(&mut rng);
            let id = q * q.inv();
            assert_abs_diff_eq!(id.w().abs(), 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(id.quaternion().vector(), Vector3::zeros(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_stored_quaternion_is_checked() {
        let mut rng = SmallRng::seed_from_u64(3);
        let q = UnitQuaternion::random(&mut rng);
        let text = ron::to_string(&q).unwrap();
        assert_eq!(ron::from_str::<UnitQuaternion>(&text).unwrap(), q);

        let scaled = ron::to_string(&(Quaternion::from(q) * 2.0)).unwrap();
        assert!(ron::from_str::<UnitQuaternion>(&scaled).is_err());
        assert!(matches!(
            UnitQuaternion::try_from(Quaternion::new(0.0, 0.0, 0.0, 2.0)),
            Err(QuaternionErrors::NotUnit { .. })
        ));

        // small drift is accepted and renormalized
        let drifted = UnitQuaternion::try_from(Quaternion::new(0.0, 0.0, 0.0, 1.0 + 1e-7)).unwrap();
        assert!(drifted.norm_deviation() < 1e-12);
    }

    #[test]
    fn test_compose_renormalizes_drift() {
        let drifted = UnitQuaternion(Quaternion::new(0.0, 0.0, 0.0, 1.0 + 1e-6));
        let q = drifted.compose(&UnitQuaternion::IDENTITY);
        assert!(q.norm_deviation() < 1e-12);
    }

    #[test]
    fn test_slerp_endpoints_and_midpoint() {
        let q1 = UnitQuaternion::IDENTITY;
        let q2 = UnitQuaternion::from_axis_angle(&Vector3::x(), 1.0).unwrap();
        assert_abs_diff_eq!(UnitQuaternion::slerp(&q1, &q2, 0.0).angle_to(&q1), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(UnitQuaternion::slerp(&q1, &q2, 1.0).angle_to(&q2), 0.0, epsilon = 1e-12);
        let mid = UnitQuaternion::slerp(&q1, &q2, 0.5);
        assert_abs_diff_eq!(mid.angle_to(&q1), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_builder_nominal_and_dispersed() {
        let mut rng = SmallRng::seed_from_u64(9);
        let nominal = UnitQuaternion::from_axis_angle(&Vector3::y(), 0.3).unwrap();
        let builder = UnitQuaternionBuilder::new(nominal)
            .with_angle_dispersion(Dispersion::uniform(0.01, 0.02).unwrap());
        assert_eq!(builder.sample(true, &mut rng).unwrap(), nominal);
        for _ in 0..20 {
            let q = builder.sample(false, &mut rng).unwrap();
            let angle = q.angle_to(&nominal);
            assert!(angle >= 0.01 - 1e-9 && angle <= 0.02 + 1e-9);
        }
    }
}
