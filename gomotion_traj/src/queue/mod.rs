//! The motion queue and jerk-limited segment generator (§3 "Motion
//! segment"/"Motion queue", §4.3).
//!
//! A [`MotionQueue`] holds a FIFO of [`Segment`]s, each produced from one
//! `MoveJoint`/`MoveUjoint`/`MoveWorld` command (§4.1 `TrajCmd`) plus the
//! active [`gomotion_common::shm::segments::TrajProfile`] limits. The
//! Trajectory Loop (§4.4) calls [`MotionQueue::tick`] once per cycle to
//! advance the head segment and sample its current position; when a
//! segment's duration elapses the queue drops it and starts the next.
//!
//! Joint-space segments output a [`Sample::Joint`] directly, bypassing
//! kinematics; world-space segments output a [`Sample::World`] pose that
//! the cycle driver runs back through the active kinematics plug-in's
//! `inv` to get a joint-space setpoint (§4.4 "every cycle the loop ...
//! inverts the Cartesian pose to joints").

use gomotion_common::consts::{EPSILON, MAX_JOINTS};
use gomotion_common::error::ControlError;
use gomotion_common::pose::{JointVector, Pose, Vec3};
use gomotion_common::shm::segments::{QueueType, TrajProfile};

use crate::profile;

/// One sampled target for the current cycle.
#[derive(Debug, Clone, Copy)]
pub enum Sample {
    Joint(JointVector),
    World(Pose),
}

/// A synchronized (`MoveJoint`) or per-axis-independent (`MoveUjoint`)
/// joint-space segment (§4.3 "the slowest axis stretches the others" vs.
/// each axis running at its own rate).
#[derive(Debug, Clone, Copy)]
struct JointSegment {
    start: JointVector,
    end: JointVector,
    /// Per-axis duration. Synchronized moves repeat the shared maximum in
    /// every slot; unsynchronized moves give each axis its own.
    durations: [f64; MAX_JOINTS],
    n: usize,
}

impl JointSegment {
    fn duration(&self) -> f64 {
        self.durations[..self.n].iter().cloned().fold(0.0_f64, f64::max)
    }

    fn sample(&self, t: f64) -> JointVector {
        let mut out = self.start;
        for i in 0..self.n {
            let d = self.durations[i];
            let distance = self.end.get(i) - self.start.get(i);
            let (pos, _, _) = profile::sample(distance, d, t);
            out.set(i, self.start.get(i) + pos);
        }
        out
    }
}

#[derive(Debug, Clone, Copy)]
struct WorldLinearSegment {
    start: Pose,
    end: Pose,
    duration: f64,
}

impl WorldLinearSegment {
    /// Interpolate at an already-eased progress fraction `f ∈ [0, 1]`.
    fn pose_at(&self, f: f64) -> Pose {
        Pose::new(self.start.tran + (self.end.tran - self.start.tran).scale(f), self.start.rot.slerp(self.end.rot, f))
    }

    fn sample(&self, t: f64) -> Pose {
        self.pose_at(profile::fraction(self.duration, t))
    }
}

#[derive(Debug, Clone, Copy)]
struct WorldCircularSegment {
    start: Pose,
    end: Pose,
    center: Vec3,
    /// Unit normal of the sweep plane.
    normal: Vec3,
    /// Total signed sweep angle, `turns * 2*pi` plus the partial angle
    /// needed to land on `end`'s projection (§4.3 "circular sweep").
    total_angle: f64,
    radius: f64,
    /// Orthonormal in-plane basis so a point at `angle` is
    /// `center + radius*(cos(angle)*u + sin(angle)*w)`.
    u: Vec3,
    w: Vec3,
    duration: f64,
    /// True once `radius` was too small to define a sweep plane; the
    /// segment degenerates to a pure in-place rotation (§4.3 "pure-rotation
    /// degenerate case").
    pure_rotation: bool,
}

impl WorldCircularSegment {
    /// Interpolate at an already-eased progress fraction `f ∈ [0, 1]`.
    fn pose_at(&self, f: f64) -> Pose {
        let rot = self.start.rot.slerp(self.end.rot, f);
        if self.pure_rotation {
            return Pose::new(self.start.tran, rot);
        }
        let angle = self.total_angle * f;
        let (s, c) = angle.sin_cos();
        let tran = self.center + self.u.scale(self.radius * c) + self.w.scale(self.radius * s);
        Pose::new(tran, rot)
    }

    fn sample(&self, t: f64) -> Pose {
        self.pose_at(profile::fraction(self.duration, t))
    }

    /// Translational path-length covered over the full segment, used by
    /// [`MotionQueue::stop`] to convert a fraction rate into a physical
    /// linear speed.
    fn tran_distance(&self) -> f64 {
        self.radius * self.total_angle.abs()
    }

    fn rot_distance(&self) -> f64 {
        self.start.rot.angle_to(self.end.rot)
    }
}

/// A per-axis rest-from-`v0` ramp, retargeted from the in-flight segment's
/// position/velocity at the moment `stop()` was called (§4.3 `stop()`).
/// Unlike [`JointSegment`], each axis runs its own independent decel
/// duration rather than sharing the slowest axis's — a stopped axis holds
/// at its own resting point rather than waiting on the others.
#[derive(Debug, Clone, Copy)]
struct JointDecelSegment {
    start: JointVector,
    v0: [f64; MAX_JOINTS],
    durations: [f64; MAX_JOINTS],
    n: usize,
}

impl JointDecelSegment {
    fn duration(&self) -> f64 {
        self.durations[..self.n].iter().cloned().fold(0.0_f64, f64::max)
    }

    fn sample(&self, t: f64) -> JointVector {
        let mut out = self.start;
        for i in 0..self.n {
            let (disp, _) = profile::decel_sample(self.v0[i], self.durations[i], t);
            out.set(i, self.start.get(i) + disp);
        }
        out
    }
}

#[derive(Debug, Clone, Copy)]
enum WorldDecelShape {
    Linear(WorldLinearSegment),
    Circular(WorldCircularSegment),
}

impl WorldDecelShape {
    fn pose_at(&self, f: f64) -> Pose {
        match self {
            WorldDecelShape::Linear(s) => s.pose_at(f),
            WorldDecelShape::Circular(s) => s.pose_at(f),
        }
    }
}

/// The world-space counterpart of [`JointDecelSegment`]: the original
/// segment's path shape (straight line or circular sweep) is kept, only the
/// eased progress fraction `f` is re-timed to decay from the captured rate
/// down to rest instead of continuing on to the original endpoint.
#[derive(Debug, Clone, Copy)]
struct WorldDecelSegment {
    shape: WorldDecelShape,
    /// Progress fraction at the moment of capture.
    f0: f64,
    /// `d(f)/dt` at the moment of capture.
    frate0: f64,
    duration: f64,
}

impl WorldDecelSegment {
    fn sample(&self, t: f64) -> Pose {
        let (df, _) = profile::decel_sample(self.frate0, self.duration, t);
        let f = (self.f0 + df).clamp(0.0, 1.0);
        self.shape.pose_at(f)
    }
}

#[derive(Debug, Clone, Copy)]
enum Segment {
    Joint(JointSegment),
    WorldLinear(WorldLinearSegment),
    WorldCircular(WorldCircularSegment),
    JointDecel(JointDecelSegment),
    WorldDecel(WorldDecelSegment),
}

impl Segment {
    fn duration(&self) -> f64 {
        match self {
            Segment::Joint(s) => s.duration(),
            Segment::WorldLinear(s) => s.duration,
            Segment::WorldCircular(s) => s.duration,
            Segment::JointDecel(s) => s.duration(),
            Segment::WorldDecel(s) => s.duration,
        }
    }

    fn sample(&self, t: f64) -> Sample {
        match self {
            Segment::Joint(s) => Sample::Joint(s.sample(t)),
            Segment::WorldLinear(s) => Sample::World(s.sample(t)),
            Segment::WorldCircular(s) => Sample::World(s.sample(t)),
            Segment::JointDecel(s) => Sample::Joint(s.sample(t)),
            Segment::WorldDecel(s) => Sample::World(s.sample(t)),
        }
    }

    fn end_sample(&self) -> Sample {
        self.sample(self.duration())
    }
}

/// FIFO of pending motion segments plus the one currently executing
/// (§3 "Motion queue").
pub struct MotionQueue {
    pending: std::collections::VecDeque<Segment>,
    current: Option<Segment>,
    elapsed: f64,
    /// Timescale applied to elapsed time each tick, `0` holds in place,
    /// `1` is nominal (§3 "Timescale").
    scale: f64,
    /// World/joint mode of the currently queued motion (§4.3 `set_type`,
    /// §8 invariant 6: "`queue.type` changes only on a cycle where
    /// `queue.count == 0`").
    mode: QueueType,
}

impl Default for MotionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionQueue {
    pub fn new() -> Self {
        Self { pending: std::collections::VecDeque::new(), current: None, elapsed: 0.0, scale: 1.0, mode: QueueType::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.pending.is_empty()
    }

    pub fn queue_count(&self) -> u32 {
        (self.pending.len() + self.current.is_some() as usize) as u32
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale.max(0.0);
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn queue_type(&self) -> QueueType {
        self.mode
    }

    /// Switch the queue's world/joint mode. Rejected while the queue is
    /// non-empty and already in the other mode (§3 motion-queue invariant
    /// 1: "no world segment appended while mode is joint... without an
    /// empty-queue transition"); a no-op when `mode` already matches.
    pub fn set_type(&mut self, mode: QueueType) -> Result<(), ControlError> {
        if !self.is_empty() && self.mode != mode {
            return Err(ControlError::QueueModeMismatch);
        }
        self.mode = mode;
        Ok(())
    }

    /// Drop every pending and in-flight segment without changing the last
    /// known position (§4.1 `TrajCmdType::Stop`/`Abort`).
    pub fn clear(&mut self) {
        self.pending.clear();
        self.current = None;
        self.elapsed = 0.0;
    }

    /// Flush the queue and force it into `mode` unconditionally (`Here`,
    /// §3: "the designated abstraction for a joint-mode rehome with no
    /// motion").
    pub fn set_here(&mut self, mode: QueueType) {
        self.clear();
        self.mode = mode;
    }

    /// Append a synchronized joint move: every axis shares the slowest
    /// axis's duration (`MoveJoint`, §4.3).
    pub fn push_joint_move(
        &mut self,
        start: JointVector,
        end: JointVector,
        max_vel: &[f64],
        max_acc: &[f64],
        max_jerk: &[f64],
        time_override: Option<f64>,
    ) -> Result<(), ControlError> {
        self.set_type(QueueType::Joint)?;
        let n = end.len();
        let mut shared = 0.0_f64;
        for i in 0..n {
            let d = profile::min_duration(end.get(i) - start.get(i), max_vel[i], max_acc[i], max_jerk[i]);
            shared = shared.max(d);
        }
        if let Some(t) = time_override {
            shared = shared.max(t);
        }
        let mut durations = [0.0; MAX_JOINTS];
        durations[..n].fill(shared);
        self.pending.push_back(Segment::Joint(JointSegment { start, end, durations, n }));
        Ok(())
    }

    /// Append an unsynchronized joint move: each axis runs at its own pace
    /// and simply holds once it arrives (`MoveUjoint`, §4.3).
    pub fn push_ujoint_move(
        &mut self,
        start: JointVector,
        end: JointVector,
        max_vel: &[f64],
        max_acc: &[f64],
        max_jerk: &[f64],
        time_override: Option<f64>,
    ) -> Result<(), ControlError> {
        self.set_type(QueueType::Joint)?;
        let n = end.len();
        let mut durations = [0.0; MAX_JOINTS];
        for i in 0..n {
            let d = profile::min_duration(end.get(i) - start.get(i), max_vel[i], max_acc[i], max_jerk[i]);
            durations[i] = time_override.map(|t| t.max(d)).unwrap_or(d);
        }
        self.pending.push_back(Segment::Joint(JointSegment { start, end, durations, n }));
        Ok(())
    }

    /// Append a translational arc-length + SLERP rotation move
    /// (`MoveWorld`, §4.3: "the longer of the translational and rotational
    /// duration dictates the segment").
    pub fn push_world_linear(
        &mut self,
        start: Pose,
        end: Pose,
        profile_limits: &TrajProfile,
        time_override: Option<f64>,
    ) -> Result<(), ControlError> {
        self.set_type(QueueType::World)?;
        let (tran_dist, rot_dist) = start.distance(end);
        let t_tran =
            profile::min_duration(tran_dist, profile_limits.max_tvel, profile_limits.max_tacc, profile_limits.max_tjerk);
        let t_rot =
            profile::min_duration(rot_dist, profile_limits.max_rvel, profile_limits.max_racc, profile_limits.max_rjerk);
        let mut duration = t_tran.max(t_rot);
        if let Some(t) = time_override {
            duration = duration.max(t);
        }
        self.pending.push_back(Segment::WorldLinear(WorldLinearSegment { start, end, duration }));
        Ok(())
    }

    /// Append a circular sweep of `turns` full revolutions around `normal`
    /// through `center`, landing on `end` (`MoveWorld` with
    /// `is_circular`, §4.3). Degenerates to a pure rotation in place when
    /// `start`'s offset from `center` is (near) zero.
    pub fn push_world_circular(
        &mut self,
        start: Pose,
        end: Pose,
        center: Vec3,
        normal: Vec3,
        turns: i32,
        profile_limits: &TrajProfile,
        time_override: Option<f64>,
    ) -> Result<(), ControlError> {
        self.set_type(QueueType::World)?;
        let n = normal.normalized();
        let r0_full = start.tran - center;
        let r0 = r0_full - n.scale(r0_full.dot(n));
        let radius = r0.norm();

        if radius < EPSILON {
            let rot_dist = start.rot.angle_to(end.rot);
            let mut duration = profile::min_duration(
                rot_dist,
                profile_limits.max_rvel,
                profile_limits.max_racc,
                profile_limits.max_rjerk,
            );
            if let Some(t) = time_override {
                duration = duration.max(t);
            }
            self.pending.push_back(Segment::WorldCircular(WorldCircularSegment {
                start,
                end,
                center,
                normal: n,
                total_angle: 0.0,
                radius: 0.0,
                u: Vec3::ZERO,
                w: Vec3::ZERO,
                duration,
                pure_rotation: true,
            }));
            return Ok(());
        }

        let u = r0.scale(1.0 / radius);
        let w = n.cross(u);
        let r_end_full = end.tran - center;
        let r_end = r_end_full - n.scale(r_end_full.dot(n));
        let partial_angle = r_end.dot(w).atan2(r_end.dot(u));
        let full_turns = (turns as f64) * std::f64::consts::TAU;
        let total_angle = full_turns + partial_angle;

        let arc_length = radius * total_angle.abs();
        let rot_dist = start.rot.angle_to(end.rot);
        let t_tran =
            profile::min_duration(arc_length, profile_limits.max_tvel, profile_limits.max_tacc, profile_limits.max_tjerk);
        let t_rot =
            profile::min_duration(rot_dist, profile_limits.max_rvel, profile_limits.max_racc, profile_limits.max_rjerk);
        let mut duration = t_tran.max(t_rot);
        if let Some(t) = time_override {
            duration = duration.max(t);
        }

        self.pending.push_back(Segment::WorldCircular(WorldCircularSegment {
            start,
            end,
            center,
            normal: n,
            total_angle,
            radius,
            u,
            w,
            duration,
            pure_rotation: false,
        }));
        Ok(())
    }

    /// Retarget the in-flight segment into a jerk-limited ramp to rest at
    /// the current point, dropping everything queued behind it (§4.3
    /// `stop()`, §4.4 `Stop`: "continue publishing interpolated points
    /// until the queue is empty"). A no-op when the queue is already
    /// empty or already decelerating; `max_acc`/`max_jerk` are per-joint
    /// limits (only used when the current segment is joint-space).
    pub fn stop(&mut self, max_acc: &[f64], max_jerk: &[f64], world_limits: &TrajProfile) {
        self.pending.clear();
        let t = self.elapsed;
        self.elapsed = 0.0;
        let Some(seg) = self.current.take() else { return };
        self.current = Some(match seg {
            Segment::JointDecel(_) | Segment::WorldDecel(_) => seg,
            Segment::Joint(s) => {
                let mut start = s.start;
                let mut v0 = [0.0; MAX_JOINTS];
                let mut durations = [0.0; MAX_JOINTS];
                for i in 0..s.n {
                    let distance = s.end.get(i) - s.start.get(i);
                    let (pos, vel, _) = profile::sample(distance, s.durations[i], t);
                    start.set(i, s.start.get(i) + pos);
                    v0[i] = vel;
                    let acc = max_acc.get(i).copied().unwrap_or(1.0);
                    let jerk = max_jerk.get(i).copied().unwrap_or(1.0);
                    durations[i] = profile::decel_duration(vel, acc, jerk);
                }
                Segment::JointDecel(JointDecelSegment { start, v0, durations, n: s.n })
            }
            Segment::WorldLinear(s) => {
                let f0 = profile::fraction(s.duration, t);
                let frate0 = profile::fraction_rate(s.duration, t);
                let (tran_dist, rot_dist) = s.start.distance(s.end);
                let t_tran = profile::decel_duration(tran_dist * frate0, world_limits.max_tacc, world_limits.max_tjerk);
                let t_rot = profile::decel_duration(rot_dist * frate0, world_limits.max_racc, world_limits.max_rjerk);
                Segment::WorldDecel(WorldDecelSegment {
                    shape: WorldDecelShape::Linear(s),
                    f0,
                    frate0,
                    duration: t_tran.max(t_rot),
                })
            }
            Segment::WorldCircular(s) => {
                let f0 = profile::fraction(s.duration, t);
                let frate0 = profile::fraction_rate(s.duration, t);
                let t_tran = profile::decel_duration(s.tran_distance() * frate0, world_limits.max_tacc, world_limits.max_tjerk);
                let t_rot = profile::decel_duration(s.rot_distance() * frate0, world_limits.max_racc, world_limits.max_rjerk);
                Segment::WorldDecel(WorldDecelSegment {
                    shape: WorldDecelShape::Circular(s),
                    f0,
                    frate0,
                    duration: t_tran.max(t_rot),
                })
            }
        });
    }

    /// Advance by `dt` (scaled by [`Self::scale`]) and sample the result.
    /// Returns `None` when the queue is empty. When a segment completes,
    /// any leftover time carries over into the next one.
    pub fn tick(&mut self, dt: f64) -> Option<Sample> {
        let mut remaining = dt * self.scale;
        loop {
            if self.current.is_none() {
                self.current = self.pending.pop_front();
                self.elapsed = 0.0;
            }
            let seg = self.current.as_ref()?;
            let duration = seg.duration();
            if duration <= EPSILON {
                let finished = self.current.take().unwrap();
                if self.pending.is_empty() {
                    self.elapsed = 0.0;
                    return Some(finished.end_sample());
                }
                continue;
            }
            if self.elapsed + remaining < duration {
                self.elapsed += remaining;
                return Some(seg.sample(self.elapsed));
            }
            remaining -= duration - self.elapsed;
            let finished = self.current.take().unwrap();
            if self.pending.is_empty() {
                self.elapsed = duration;
                return Some(finished.end_sample());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        (vec![1.0; n], vec![5.0; n], vec![50.0; n])
    }

    #[test]
    fn empty_queue_ticks_to_none() {
        let mut q = MotionQueue::new();
        assert!(q.tick(0.01).is_none());
    }

    #[test]
    fn joint_move_reaches_target_and_drains() {
        let mut q = MotionQueue::new();
        let start = JointVector::from_slice(&[0.0, 0.0]);
        let end = JointVector::from_slice(&[1.0, -1.0]);
        let (v, a, j) = limits(2);
        q.push_joint_move(start, end, &v, &a, &j, None).unwrap();
        assert_eq!(q.queue_count(), 1);

        let mut last = None;
        for _ in 0..2000 {
            last = q.tick(0.01);
        }
        match last.unwrap() {
            Sample::Joint(j) => {
                assert!((j.get(0) - 1.0).abs() < 1e-6);
                assert!((j.get(1) + 1.0).abs() < 1e-6);
            }
            _ => panic!("expected joint sample"),
        }
        assert!(q.is_empty());
    }

    #[test]
    fn ujoint_move_lets_faster_axis_arrive_first() {
        let mut q = MotionQueue::new();
        let start = JointVector::from_slice(&[0.0, 0.0]);
        let end = JointVector::from_slice(&[0.1, 10.0]);
        let v = vec![1.0, 1.0];
        let a = vec![5.0, 5.0];
        let j = vec![50.0, 50.0];
        q.push_ujoint_move(start, end, &v, &a, &j, None).unwrap();
        let sample = q.tick(0.05).unwrap();
        if let Sample::Joint(joints) = sample {
            assert!(joints.get(0) > 0.0);
        }
    }

    #[test]
    fn world_linear_reaches_end_pose() {
        let mut q = MotionQueue::new();
        let start = Pose::IDENTITY;
        let end = Pose::new(Vec3::new(1.0, 0.0, 0.0), gomotion_common::pose::Quat::IDENTITY);
        let profile_limits =
            TrajProfile { max_tvel: 1.0, max_tacc: 5.0, max_tjerk: 50.0, max_rvel: 1.0, max_racc: 5.0, max_rjerk: 50.0 };
        q.push_world_linear(start, end, &profile_limits, None).unwrap();
        let mut last = None;
        for _ in 0..500 {
            last = q.tick(0.01);
        }
        if let Some(Sample::World(p)) = last {
            assert!((p.tran.x - 1.0).abs() < 1e-6);
        } else {
            panic!("expected world sample");
        }
    }

    #[test]
    fn explicit_time_override_stretches_duration() {
        let mut q1 = MotionQueue::new();
        let mut q2 = MotionQueue::new();
        let start = JointVector::from_slice(&[0.0]);
        let end = JointVector::from_slice(&[1.0]);
        let (v, a, j) = limits(1);
        q1.push_joint_move(start, end, &v, &a, &j, None).unwrap();
        q2.push_joint_move(start, end, &v, &a, &j, Some(100.0)).unwrap();
        let s1 = q1.tick(1.0).unwrap();
        let s2 = q2.tick(1.0).unwrap();
        if let (Sample::Joint(j1), Sample::Joint(j2)) = (s1, s2) {
            assert!(j1.get(0) > j2.get(0));
        }
    }

    #[test]
    fn pure_rotation_circular_segment_holds_position() {
        let mut q = MotionQueue::new();
        let start = Pose::IDENTITY;
        let end = Pose::new(Vec3::ZERO, gomotion_common::pose::Quat::from_rpy(0.0, 0.0, 1.0));
        let profile_limits =
            TrajProfile { max_tvel: 1.0, max_tacc: 5.0, max_tjerk: 50.0, max_rvel: 1.0, max_racc: 5.0, max_rjerk: 50.0 };
        q.push_world_circular(start, end, Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), 0, &profile_limits, None).unwrap();
        let mut last = None;
        for _ in 0..500 {
            last = q.tick(0.01);
        }
        if let Some(Sample::World(p)) = last {
            assert!(p.tran.norm() < 1e-9);
            assert!(p.rot.angle_to(end.rot) < 1e-6);
        } else {
            panic!("expected world sample");
        }
    }

    #[test]
    fn world_push_is_rejected_while_joint_move_in_flight() {
        let mut q = MotionQueue::new();
        let start = JointVector::from_slice(&[0.0]);
        let end = JointVector::from_slice(&[1.0]);
        let (v, a, j) = limits(1);
        q.push_joint_move(start, end, &v, &a, &j, None).unwrap();
        q.tick(0.001);

        let profile_limits =
            TrajProfile { max_tvel: 1.0, max_tacc: 5.0, max_tjerk: 50.0, max_rvel: 1.0, max_racc: 5.0, max_rjerk: 50.0 };
        let err = q.push_world_linear(Pose::IDENTITY, Pose::IDENTITY, &profile_limits, None).unwrap_err();
        assert_eq!(err, gomotion_common::error::ControlError::QueueModeMismatch);
        assert_eq!(q.queue_type(), QueueType::Joint);
    }

    #[test]
    fn mode_switch_allowed_once_queue_drains() {
        let mut q = MotionQueue::new();
        let start = JointVector::from_slice(&[0.0]);
        let end = JointVector::from_slice(&[0.001]);
        let (v, a, j) = limits(1);
        q.push_joint_move(start, end, &v, &a, &j, None).unwrap();
        for _ in 0..2000 {
            q.tick(0.01);
        }
        assert!(q.is_empty());

        let profile_limits =
            TrajProfile { max_tvel: 1.0, max_tacc: 5.0, max_tjerk: 50.0, max_rvel: 1.0, max_racc: 5.0, max_rjerk: 50.0 };
        q.push_world_linear(Pose::IDENTITY, Pose::IDENTITY, &profile_limits, None).unwrap();
        assert_eq!(q.queue_type(), QueueType::World);
    }

    #[test]
    fn stop_decelerates_instead_of_clearing_and_then_drains() {
        let mut q = MotionQueue::new();
        let start = JointVector::from_slice(&[0.0]);
        let end = JointVector::from_slice(&[10.0]);
        let (v, a, j) = limits(1);
        q.push_joint_move(start, end, &v, &a, &j, None).unwrap();

        // Run partway into the move so there is real in-flight velocity.
        let mut mid = JointVector::default();
        for _ in 0..50 {
            if let Some(Sample::Joint(s)) = q.tick(0.01) {
                mid = s;
            }
        }
        assert!(mid.get(0) > 0.0, "expected some progress before stopping");

        q.stop(&a, &j, &TrajProfile::default());
        assert!(!q.is_empty(), "stop must not clear the queue instantly");

        let mut last = mid;
        let mut saw_progress_after_stop = false;
        for _ in 0..5000 {
            match q.tick(0.01) {
                Some(Sample::Joint(s)) => {
                    if (s.get(0) - last.get(0)).abs() > 1e-9 {
                        saw_progress_after_stop = true;
                    }
                    last = s;
                }
                None => break,
            }
        }
        assert!(saw_progress_after_stop, "decel ramp should keep publishing changing points");
        assert!(last.get(0) < 10.0, "decel must not reach the original target");
        assert!(q.is_empty(), "queue must eventually drain to rest");
    }

    #[test]
    fn stop_on_empty_queue_is_a_no_op() {
        let mut q = MotionQueue::new();
        q.stop(&[1.0], &[1.0], &TrajProfile::default());
        assert!(q.is_empty());
    }
}
