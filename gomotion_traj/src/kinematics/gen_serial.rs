//! The `gen_serial` plug-in (§6, §9): an arbitrary serial chain of
//! Denavit-Hartenberg links, each joint contributing one revolute degree of
//! freedom stacked onto `theta`. Forward kinematics composes the per-link
//! `RotZ(theta) * TransZ(d) * TransX(a) * RotX(alpha)` transform down the
//! chain (§3 `LinkParams::Dh`); inverse kinematics is a damped Gauss-Newton
//! search seeded from the previous joint vector (§4.4 "seeded ... to avoid
//! a branch jump"), since a closed-form inverse does not exist for an
//! arbitrary DH chain.

use super::{Kinematics, KinematicsError, KinematicsType};
use crate::linalg::{jt_error, normal_equations, solve};
use gomotion_common::consts::MAX_JOINTS;
use gomotion_common::pose::{JointType, JointVector, LinkParams, Pose, Quat, Vec3};

/// Newton iterations per `inv` call before giving up as singular.
const MAX_ITERS: usize = 50;
/// Converged when the 6-vector pose error norm drops below this.
const TOLERANCE: f64 = 1e-9;
/// Levenberg-Marquardt damping, fixed rather than adaptive — the joint
/// counts here (`n <= 7`) and per-cycle seeding keep steps well-conditioned
/// in practice.
const LAMBDA: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
struct DhLink {
    a: f64,
    alpha: f64,
    d: f64,
    theta_offset: f64,
}

impl Default for DhLink {
    fn default() -> Self {
        Self { a: 0.0, alpha: 0.0, d: 0.0, theta_offset: 0.0 }
    }
}

pub struct GenSerialKinematics {
    num_joints: usize,
    links: Vec<DhLink>,
}

impl GenSerialKinematics {
    pub fn new(num_joints: usize) -> Self {
        let num_joints = num_joints.min(MAX_JOINTS);
        Self { num_joints, links: vec![DhLink::default(); num_joints] }
    }

    fn link_transform(link: &DhLink, joint_value: f64) -> Pose {
        let theta = link.theta_offset + joint_value;
        let rot_z = Quat::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), theta);
        let trans_z = Pose::new(Vec3::new(0.0, 0.0, link.d), Quat::IDENTITY);
        let trans_x = Pose::new(Vec3::new(link.a, 0.0, 0.0), Quat::IDENTITY);
        let rot_x = Quat::from_axis_angle(Vec3::new(1.0, 0.0, 0.0), link.alpha);
        Pose::new(Vec3::ZERO, rot_z).compose(trans_z).compose(trans_x).compose(Pose::new(Vec3::ZERO, rot_x))
    }

    fn fwd_chain(&self, joints: &JointVector) -> Pose {
        let mut pose = Pose::IDENTITY;
        for (i, link) in self.links.iter().enumerate() {
            pose = pose.compose(Self::link_transform(link, joints.get(i)));
        }
        pose
    }
}

impl Kinematics for GenSerialKinematics {
    fn name(&self) -> &str {
        "gen_serial"
    }

    fn num_joints(&self) -> usize {
        self.num_joints
    }

    fn get_type(&self) -> KinematicsType {
        KinematicsType::Both
    }

    fn set_parameters(&mut self, links: &[LinkParams]) -> Result<(), KinematicsError> {
        if links.len() != self.num_joints {
            return Err(KinematicsError::InvalidParameters(format!(
                "expected {} DH links, got {}",
                self.num_joints,
                links.len()
            )));
        }
        let mut parsed = Vec::with_capacity(links.len());
        for l in links {
            match l {
                LinkParams::Dh { a, alpha, d, theta } => {
                    parsed.push(DhLink { a: *a, alpha: *alpha, d: *d, theta_offset: *theta })
                }
                other => {
                    return Err(KinematicsError::InvalidParameters(format!(
                        "gen_serial requires Dh link parameters, got {other:?}"
                    )))
                }
            }
        }
        self.links = parsed;
        Ok(())
    }

    fn get_parameters(&self) -> Vec<LinkParams> {
        self.links
            .iter()
            .map(|l| LinkParams::Dh { a: l.a, alpha: l.alpha, d: l.d, theta: l.theta_offset })
            .collect()
    }

    fn joint_types(&self) -> Vec<JointType> {
        vec![JointType::Angular; self.num_joints]
    }

    fn fwd(&self, joints: &JointVector) -> Result<Pose, KinematicsError> {
        Ok(self.fwd_chain(joints))
    }

    fn inv(&self, target: Pose, seed: &JointVector) -> Result<JointVector, KinematicsError> {
        let n = self.num_joints;
        let mut joints = *seed;

        for _ in 0..MAX_ITERS {
            let current = self.fwd_chain(&joints);
            let d_tran = target.tran - current.tran;
            let rel = target.rot.mul(current.rot.inverse());
            let sign = if rel.w < 0.0 { -1.0 } else { 1.0 };
            let err = [
                d_tran.x,
                d_tran.y,
                d_tran.z,
                2.0 * sign * rel.x,
                2.0 * sign * rel.y,
                2.0 * sign * rel.z,
            ];
            let err_norm: f64 = err.iter().map(|e| e * e).sum::<f64>().sqrt();
            if err_norm < TOLERANCE {
                return Ok(joints);
            }

            let jac_cols = self.jac_fwd(&joints)?;
            let mut jac = [[0.0; MAX_JOINTS]; 6];
            for (col, vals) in jac_cols.iter().enumerate() {
                for row in 0..6 {
                    jac[row][col] = vals[row];
                }
            }

            let lhs = normal_equations(&jac, n, LAMBDA);
            let rhs = jt_error(&jac, n, &err);
            let delta = solve(&lhs, &rhs, n)
                .ok_or_else(|| KinematicsError::Singular("Jacobian normal equations singular".into()))?;

            for i in 0..n {
                joints.set(i, joints.get(i) + delta[i]);
            }
        }

        Err(KinematicsError::Singular(format!("inverse kinematics did not converge in {MAX_ITERS} iterations")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_link_planar() -> GenSerialKinematics {
        let mut k = GenSerialKinematics::new(2);
        k.set_parameters(&[
            LinkParams::Dh { a: 1.0, alpha: 0.0, d: 0.0, theta: 0.0 },
            LinkParams::Dh { a: 1.0, alpha: 0.0, d: 0.0, theta: 0.0 },
        ])
        .unwrap();
        k
    }

    #[test]
    fn fwd_straight_arm_reaches_full_length() {
        let k = two_link_planar();
        let joints = JointVector::from_slice(&[0.0, 0.0]);
        let p = k.fwd(&joints).unwrap();
        assert!((p.tran.x - 2.0).abs() < 1e-9);
        assert!(p.tran.y.abs() < 1e-9);
    }

    #[test]
    fn inv_recovers_known_joint_solution() {
        let k = two_link_planar();
        let truth = JointVector::from_slice(&[0.3, -0.5]);
        let target = k.fwd(&truth).unwrap();
        let seed = JointVector::from_slice(&[0.1, -0.1]);
        let solved = k.inv(target, &seed).unwrap();
        let check = k.fwd(&solved).unwrap();
        assert!(check.distance(target).0 < 1e-6);
        assert!(check.distance(target).1 < 1e-6);
    }

    #[test]
    fn set_parameters_rejects_wrong_count() {
        let mut k = GenSerialKinematics::new(2);
        let err = k.set_parameters(&[LinkParams::default()]).unwrap_err();
        assert!(matches!(err, KinematicsError::InvalidParameters(_)));
    }

    #[test]
    fn set_parameters_rejects_non_dh_variant() {
        let mut k = GenSerialKinematics::new(1);
        let err = k
            .set_parameters(&[LinkParams::ParallelPoint { base: Vec3::ZERO, platform: Vec3::ZERO }])
            .unwrap_err();
        assert!(matches!(err, KinematicsError::InvalidParameters(_)));
    }
}
