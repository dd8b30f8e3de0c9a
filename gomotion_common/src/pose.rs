//! Rigid-body pose, quaternion and joint-vector math (§3 Data Model).
//!
//! No kinematics (forward/inverse/Jacobian) lives here — that is the
//! domain-specific part of `gomotion_traj`. This module holds only the
//! frame-agnostic algebra every tier needs: pose composition/inverse,
//! quaternion normalization/SLERP, and the nearest-revolution joint shift
//! rule.

use std::f64::consts::PI;

/// A 3-vector, used for translation and for angular/linear velocity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn scale(self, k: f64) -> Vec3 {
        Vec3::new(self.x * k, self.y * k, self.z * k)
    }

    pub fn normalized(self) -> Vec3 {
        let n = self.norm();
        if n < f64::EPSILON { self } else { self.scale(1.0 / n) }
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

/// A unit quaternion rotation, `(w, x, y, z)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Quat {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Quat = Quat { w: 1.0, x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    pub fn norm(self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn normalized(self) -> Quat {
        let n = self.norm();
        if n < f64::EPSILON {
            Quat::IDENTITY
        } else {
            Quat::new(self.w / n, self.x / n, self.y / n, self.z / n)
        }
    }

    pub fn conj(self) -> Quat {
        Quat::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Quaternion inverse; equals the conjugate for unit quaternions.
    pub fn inverse(self) -> Quat {
        self.conj().normalized()
    }

    /// Hamilton product, `self * other`.
    pub fn mul(self, other: Quat) -> Quat {
        Quat::new(
            self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
            self.w * other.x + self.x * other.w + self.y * other.z - self.z * other.y,
            self.w * other.y - self.x * other.z + self.y * other.w + self.z * other.x,
            self.w * other.z + self.x * other.y - self.y * other.x + self.z * other.w,
        )
    }

    /// Rotate a vector by this quaternion.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let qv = Quat::new(0.0, v.x, v.y, v.z);
        let r = self.mul(qv).mul(self.conj());
        Vec3::new(r.x, r.y, r.z)
    }

    /// Construct from roll-pitch-yaw (radians), the `r p y` convention used
    /// in the configuration file (§6).
    pub fn from_rpy(roll: f64, pitch: f64, yaw: f64) -> Quat {
        let (sr, cr) = (roll * 0.5).sin_cos();
        let (sp, cp) = (pitch * 0.5).sin_cos();
        let (sy, cy) = (yaw * 0.5).sin_cos();
        Quat::new(
            cr * cp * cy + sr * sp * sy,
            sr * cp * cy - cr * sp * sy,
            cr * sp * cy + sr * cp * sy,
            cr * cp * sy - sr * sp * cy,
        )
        .normalized()
    }

    /// Convert to roll-pitch-yaw (radians). Ambiguous (gimbal-locked) near
    /// pitch = ±π/2 — callers must not assert exact round-trips there (§8).
    pub fn to_rpy(self) -> (f64, f64, f64) {
        let q = self.normalized();
        let sinr_cosp = 2.0 * (q.w * q.x + q.y * q.z);
        let cosr_cosp = 1.0 - 2.0 * (q.x * q.x + q.y * q.y);
        let roll = sinr_cosp.atan2(cosr_cosp);

        let sinp = 2.0 * (q.w * q.y - q.z * q.x);
        let pitch = if sinp.abs() >= 1.0 {
            (PI / 2.0).copysign(sinp)
        } else {
            sinp.asin()
        };

        let siny_cosp = 2.0 * (q.w * q.z + q.x * q.y);
        let cosy_cosp = 1.0 - 2.0 * (q.y * q.y + q.z * q.z);
        let yaw = siny_cosp.atan2(cosy_cosp);

        (roll, pitch, yaw)
    }

    /// Spherical linear interpolation, `t` in `[0, 1]`.
    pub fn slerp(self, mut other: Quat, t: f64) -> Quat {
        let a = self.normalized();
        let mut dot = a.w * other.w + a.x * other.x + a.y * other.y + a.z * other.z;
        if dot < 0.0 {
            other = Quat::new(-other.w, -other.x, -other.y, -other.z);
            dot = -dot;
        }
        if dot > 0.9995 {
            // Nearly parallel: fall back to linear interpolation + normalize.
            return Quat::new(
                a.w + (other.w - a.w) * t,
                a.x + (other.x - a.x) * t,
                a.y + (other.y - a.y) * t,
                a.z + (other.z - a.z) * t,
            )
            .normalized();
        }
        let theta_0 = dot.acos();
        let theta = theta_0 * t;
        let sin_theta = theta.sin();
        let sin_theta_0 = theta_0.sin();
        let s0 = (theta_0 - theta).sin() / sin_theta_0;
        let s1 = sin_theta / sin_theta_0;
        Quat::new(
            a.w * s0 + other.w * s1,
            a.x * s0 + other.x * s1,
            a.y * s0 + other.y * s1,
            a.z * s0 + other.z * s1,
        )
    }

    /// Construct a rotation of `angle` radians about `axis` (need not be
    /// normalized). Used by generic-serial DH-chain composition (§6).
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Quat {
        let axis = axis.normalized();
        let (s, c) = (angle * 0.5).sin_cos();
        Quat::new(c, axis.x * s, axis.y * s, axis.z * s)
    }

    /// Angular distance to `other`, in radians, in `[0, π]`.
    pub fn angle_to(self, other: Quat) -> f64 {
        let a = self.normalized();
        let b = other.normalized();
        let dot = (a.w * b.w + a.x * b.x + a.y * b.y + a.z * b.z).abs().min(1.0);
        2.0 * dot.acos()
    }
}

/// A rigid-body pose: translation + unit-quaternion rotation (§3).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct Pose {
    pub tran: Vec3,
    pub rot: Quat,
}

impl Pose {
    pub const IDENTITY: Pose = Pose { tran: Vec3::ZERO, rot: Quat::IDENTITY };

    pub const fn new(tran: Vec3, rot: Quat) -> Self {
        Self { tran, rot }
    }

    /// Standard rigid-body composition: `self` applied first, then `other`
    /// expressed relative to `self`'s frame — i.e. this pose post-multiplied
    /// by `other` (used throughout §3/§4.4 for KCP·tool_transform = ECP).
    pub fn compose(self, other: Pose) -> Pose {
        Pose::new(self.tran + self.rot.rotate(other.tran), self.rot.mul(other.rot))
    }

    pub fn inverse(self) -> Pose {
        let inv_rot = self.rot.inverse();
        Pose::new(inv_rot.rotate(-self.tran), inv_rot)
    }

    pub fn apply_to_point(self, p: Vec3) -> Vec3 {
        self.tran + self.rot.rotate(p)
    }

    /// Linear/angular distance between two poses, used by clamping and
    /// singularity-adjacent diagnostics.
    pub fn distance(self, other: Pose) -> (f64, f64) {
        ((other.tran - self.tran).norm(), self.rot.angle_to(other.rot))
    }
}

/// Semantic type of a joint, used by the nearest-revolution shift rule and
/// by scaling/units handling (§3, §6 `quantity`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JointType {
    #[default]
    Linear,
    Angular,
}

/// An ordered joint vector, up to `MAX_JOINTS` entries (§3).
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct JointVector {
    values: [f64; crate::consts::MAX_JOINTS],
    len: usize,
}

impl Default for JointVector {
    fn default() -> Self {
        Self::zeros(0)
    }
}

impl JointVector {
    pub fn zeros(len: usize) -> Self {
        assert!(len <= crate::consts::MAX_JOINTS);
        Self { values: [0.0; crate::consts::MAX_JOINTS], len }
    }

    pub fn from_slice(values: &[f64]) -> Self {
        let mut v = Self::zeros(values.len());
        v.values[..values.len()].copy_from_slice(values);
        v
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values[..self.len]
    }

    pub fn get(&self, i: usize) -> f64 {
        self.values[i]
    }

    pub fn set(&mut self, i: usize, v: f64) {
        self.values[i] = v;
    }

    /// Apply the nearest-revolution shift rule (§3, §8 invariant 8): for
    /// each angular joint whose new value differs from `prev` by more than
    /// `π`, shift by `±2π` toward `prev` so `|new - prev| <= π`.
    pub fn shift_to_nearest_revolution(&mut self, prev: &JointVector, types: &[JointType]) {
        for i in 0..self.len.min(prev.len).min(types.len()) {
            if types[i] != JointType::Angular {
                continue;
            }
            let mut delta = self.values[i] - prev.values[i];
            while delta > PI {
                self.values[i] -= 2.0 * PI;
                delta = self.values[i] - prev.values[i];
            }
            while delta < -PI {
                self.values[i] += 2.0 * PI;
                delta = self.values[i] - prev.values[i];
            }
        }
    }
}

/// Per-joint kinematic link parameters (§3). A plug-in consumes whichever
/// variant it expects via `set_parameters`/`get_parameters` (§6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkParams {
    /// Denavit-Hartenberg: `(a, alpha, d, theta)`.
    Dh { a: f64, alpha: f64, d: f64, theta: f64 },
    /// Parallel-kinematics base/platform point pair.
    ParallelPoint { base: Vec3, platform: Vec3 },
    /// Pose-and-point (hybrid serial/parallel joints).
    PoseAndPoint { pose: Pose, point: Vec3 },
    /// URDF-style joint: origin pose + rotation/translation axis.
    Urdf { origin: Pose, axis: Vec3 },
    /// Body inertia, carried for plug-ins with dynamics terms; unused by
    /// the kinematics-only solvers in this design.
    BodyInertia { mass: f64, inertia: [f64; 9] },
}

impl Default for LinkParams {
    fn default() -> Self {
        LinkParams::Dh { a: 0.0, alpha: 0.0, d: 0.0, theta: 0.0 }
    }
}
