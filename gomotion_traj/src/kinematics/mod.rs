//! Kinematics plug-in dispatch (§6 "Kinematics plug-in interface", §9
//! "Dynamic plug-in selection → tagged variants or trait objects").
//!
//! The original system selects a named plug-in at runtime via string match
//! against a C function-pointer table. Here that becomes a `dyn Kinematics`
//! trait object chosen once at boot by [`select`]. Of the eleven named
//! variants (§9), [`Trivial`](trivial::TrivialKinematics) and
//! [`GenSerial`](gen_serial::GenSerialKinematics) are fully implemented;
//! the remaining names are recognized (so string-name selection dispatch is
//! complete, per DESIGN.md open question 2) but resolve to
//! [`KinematicsError::NotFound`] at startup — the kinematics plug-in
//! library itself is an out-of-scope external collaborator (spec §1, §6).

pub mod gen_serial;
pub mod trivial;

use gomotion_common::pose::{JointType, JointVector, LinkParams, Pose};
use thiserror::Error;

/// Errors raised selecting or running a kinematics plug-in (§7).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KinematicsError {
    /// No plug-in variant matches the configured name (§6 `KINEMATICS`).
    #[error("kinematics plug-in '{0}' not found or not implemented")]
    NotFound(String),
    /// The forward/inverse solve hit a singularity or left the solver's
    /// domain (§7 "kinematics error").
    #[error("kinematics singularity or domain error: {0}")]
    Singular(String),
    /// `set_parameters` was called with the wrong link-parameter variant
    /// or joint count for this plug-in.
    #[error("invalid kinematics parameters: {0}")]
    InvalidParameters(String),
}

/// Which direction(s) a plug-in actually implements (§6 `get_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KinematicsType {
    Forward,
    Inverse,
    Both,
}

/// The forward/inverse/Jacobian contract every kinematics plug-in provides
/// (§6). `fwd`/`jac_fwd` map joints → KCP; `inv`/`jac_inv` map KCP → joints,
/// seeded from the previous joint vector to avoid a branch jump (§4.4).
pub trait Kinematics: Send {
    /// Plug-in name, as matched against `[TRAJ] KINEMATICS` (§6).
    fn name(&self) -> &str;

    /// Number of joints this plug-in drives.
    fn num_joints(&self) -> usize;

    /// Which direction(s) this plug-in implements (§6 `get_type`).
    fn get_type(&self) -> KinematicsType {
        KinematicsType::Both
    }

    /// Install per-joint link parameters (§3, §6 `set_parameters`).
    fn set_parameters(&mut self, links: &[LinkParams]) -> Result<(), KinematicsError>;

    /// Read back the currently installed link parameters.
    fn get_parameters(&self) -> Vec<LinkParams>;

    /// Semantic type (linear/angular) of each joint, used by the
    /// nearest-revolution shift rule (§3).
    fn joint_types(&self) -> Vec<JointType>;

    /// Forward kinematics: joints → KCP pose.
    fn fwd(&self, joints: &JointVector) -> Result<Pose, KinematicsError>;

    /// Inverse kinematics: KCP pose → joints, seeded from `seed` (§4.4
    /// "seeded from the previous joints to avoid branch-jump").
    fn inv(&self, pose: Pose, seed: &JointVector) -> Result<JointVector, KinematicsError>;

    /// Forward Jacobian at `joints`: `d(pose)/d(joints)`, `6 x n` row-major
    /// as `(3 translation rows, 3 rotation rows)`, flattened per joint
    /// column. Default: central finite differences on [`Self::fwd`].
    fn jac_fwd(&self, joints: &JointVector) -> Result<Vec<[f64; 6]>, KinematicsError> {
        crate::kinematics::numeric_jacobian(self, joints)
    }

    /// Inverse Jacobian at `joints` (pseudo-inverse of `jac_fwd`), used by
    /// Cartesian teleop (§4.4 "fed through the inverse Jacobian").
    fn jac_inv(&self, joints: &JointVector) -> Result<Vec<[f64; 6]>, KinematicsError> {
        crate::kinematics::numeric_jacobian(self, joints)
    }
}

/// Central finite-difference Jacobian, shared by every plug-in's default
/// `jac_fwd`/`jac_inv`. Returns one `[dx,dy,dz,drx,dry,drz]` column per
/// joint, where the rotational triple is the small-angle vector part of
/// `(pose(q+h) * pose(q-h).inverse())`.
pub fn numeric_jacobian(
    k: &(impl Kinematics + ?Sized),
    joints: &JointVector,
) -> Result<Vec<[f64; 6]>, KinematicsError> {
    const H: f64 = 1e-6;
    let n = joints.len();
    let mut cols = Vec::with_capacity(n);
    for i in 0..n {
        let mut plus = *joints;
        plus.set(i, plus.get(i) + H);
        let mut minus = *joints;
        minus.set(i, minus.get(i) - H);
        let pose_plus = k.fwd(&plus)?;
        let pose_minus = k.fwd(&minus)?;
        let d_tran = pose_plus.tran - pose_minus.tran;
        let rel = pose_plus.rot.mul(pose_minus.rot.inverse());
        // Small-angle vector part of the relative rotation, scaled by sign
        // of `w` so it stays a consistent local linearization.
        let sign = if rel.w < 0.0 { -1.0 } else { 1.0 };
        let rot_vec = [sign * rel.x, sign * rel.y, sign * rel.z];
        cols.push([
            d_tran.x / (2.0 * H),
            d_tran.y / (2.0 * H),
            d_tran.z / (2.0 * H),
            2.0 * rot_vec[0] / (2.0 * H),
            2.0 * rot_vec[1] / (2.0 * H),
            2.0 * rot_vec[2] / (2.0 * H),
        ]);
    }
    Ok(cols)
}

/// Select a kinematics plug-in by its configured name (§6, §9). Matching is
/// case-insensitive against the eleven named variants; only `trivial` and
/// `gen_serial` construct a working implementation.
pub fn select(name: &str, num_joints: usize) -> Result<Box<dyn Kinematics>, KinematicsError> {
    const KNOWN_BUT_UNIMPLEMENTED: &[&str] = &[
        "hexapod",
        "puma",
        "scara",
        "fanuc",
        "fanuc_lrmate200id",
        "three21",
        "spherist",
        "tripoint",
        "roboch",
    ];
    match name.to_ascii_lowercase().as_str() {
        "trivial" => Ok(Box::new(trivial::TrivialKinematics::new(num_joints))),
        "gen_serial" | "genserial" => Ok(Box::new(gen_serial::GenSerialKinematics::new(num_joints))),
        other if KNOWN_BUT_UNIMPLEMENTED.contains(&other) => {
            Err(KinematicsError::NotFound(format!("{other} (recognized, not implemented)")))
        }
        other => Err(KinematicsError::NotFound(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_trivial_succeeds() {
        let k = select("trivial", 6).unwrap();
        assert_eq!(k.name(), "trivial");
    }

    #[test]
    fn select_recognized_but_unimplemented_is_not_found() {
        let err = select("fanuc", 6).unwrap_err();
        assert!(matches!(err, KinematicsError::NotFound(_)));
    }

    #[test]
    fn select_unknown_name_is_not_found() {
        let err = select("no_such_plugin", 6).unwrap_err();
        assert!(matches!(err, KinematicsError::NotFound(_)));
    }

    #[test]
    fn select_is_case_insensitive() {
        assert!(select("TRIVIAL", 6).is_ok());
        assert!(select("Gen_Serial", 6).is_ok());
    }
}
