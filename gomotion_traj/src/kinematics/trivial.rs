//! The `trivial` plug-in (§6, §9): each joint is independently one
//! translational axis of the KCP pose, in declaration order, with the
//! remaining `6 - n` axes (and all rotation) held at identity. Used for
//! gantries/Cartesian rigs and as the reference implementation that
//! exercises every channel without any real link geometry.

use super::{Kinematics, KinematicsError, KinematicsType};
use gomotion_common::pose::{JointType, JointVector, LinkParams, Pose, Vec3};

pub struct TrivialKinematics {
    num_joints: usize,
}

impl TrivialKinematics {
    pub fn new(num_joints: usize) -> Self {
        Self { num_joints: num_joints.min(gomotion_common::consts::MAX_JOINTS) }
    }
}

impl Kinematics for TrivialKinematics {
    fn name(&self) -> &str {
        "trivial"
    }

    fn num_joints(&self) -> usize {
        self.num_joints
    }

    fn get_type(&self) -> KinematicsType {
        KinematicsType::Both
    }

    fn set_parameters(&mut self, _links: &[LinkParams]) -> Result<(), KinematicsError> {
        // No link geometry to install; joints map straight to translation.
        Ok(())
    }

    fn get_parameters(&self) -> Vec<LinkParams> {
        vec![LinkParams::default(); self.num_joints]
    }

    fn joint_types(&self) -> Vec<JointType> {
        vec![JointType::Linear; self.num_joints]
    }

    fn fwd(&self, joints: &JointVector) -> Result<Pose, KinematicsError> {
        let mut t = Vec3::ZERO;
        if self.num_joints > 0 {
            t.x = joints.get(0);
        }
        if self.num_joints > 1 {
            t.y = joints.get(1);
        }
        if self.num_joints > 2 {
            t.z = joints.get(2);
        }
        Ok(Pose::new(t, gomotion_common::pose::Quat::IDENTITY))
    }

    fn inv(&self, pose: Pose, seed: &JointVector) -> Result<JointVector, KinematicsError> {
        let mut j = *seed;
        if self.num_joints > 0 {
            j.set(0, pose.tran.x);
        }
        if self.num_joints > 1 {
            j.set(1, pose.tran.y);
        }
        if self.num_joints > 2 {
            j.set(2, pose.tran.z);
        }
        Ok(j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fwd_maps_joints_to_translation() {
        let k = TrivialKinematics::new(3);
        let j = JointVector::from_slice(&[1.0, 2.0, 3.0]);
        let p = k.fwd(&j).unwrap();
        assert_eq!(p.tran, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(p.rot, gomotion_common::pose::Quat::IDENTITY);
    }

    #[test]
    fn inv_round_trips_fwd() {
        let k = TrivialKinematics::new(3);
        let j = JointVector::from_slice(&[1.0, 2.0, 3.0]);
        let p = k.fwd(&j).unwrap();
        let back = k.inv(p, &JointVector::zeros(3)).unwrap();
        assert_eq!(back.as_slice(), j.as_slice());
    }

    #[test]
    fn extra_joints_beyond_three_are_ignored_by_translation() {
        let k = TrivialKinematics::new(2);
        let j = JointVector::from_slice(&[5.0, 6.0]);
        let p = k.fwd(&j).unwrap();
        assert_eq!(p.tran, Vec3::new(5.0, 6.0, 0.0));
    }
}
