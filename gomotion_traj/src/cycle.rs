//! The Trajectory Loop cycle (§4.4): clocked by the semaphore Servo 0
//! posts every `cycle_mult` ticks. Each tick reads every servo's
//! `stat`/`set`, advances the motion queue or teleop/track state, runs
//! forward and inverse kinematics, and writes a fresh `Servo` command to
//! every joint — the heartbeat that keeps PID and interpolation running
//! even when no new command arrived.

use std::time::Instant;

use gomotion_common::consts::MAX_JOINTS;
use gomotion_common::log::{LogEntryKind, LogRing};
use gomotion_common::pose::{JointType, JointVector, Pose, Vec3};
use gomotion_common::shm::p2p::P2pError;
use gomotion_common::shm::segments::{
    AdminState, ChannelStatus, QueueType, ServoCfg, ServoCmd, ServoCmdType, TrajCfg, TrajCmd, TrajCmdType, TrajSet,
    TrajStat,
};
use gomotion_common::shm::semaphore::{SemError, ServoClock};
use thiserror::Error;
use tracing::warn;

use crate::kinematics::{self, Kinematics, KinematicsError};
use crate::linalg::{jt_error, normal_equations, solve};
use crate::queue::{MotionQueue, Sample};
use crate::shm::TrajChannel;
use crate::state::{Dispatch, TrajStateMachine};

/// Fraction of `max_tvel`/`max_rvel` the walk-in filter closes the gap to a
/// newly-requested `ref.Xinv` by, per cycle (§4.4 step 6).
const XINV_WALK_IN_FRACTION: f64 = 0.1;

/// Errors opening the Trajectory Loop's runtime (§7 Fatal tier).
#[derive(Debug, Error)]
pub enum TrajCycleError {
    #[error("shared memory error: {0}")]
    Shm(#[from] P2pError),
    #[error("servo clock semaphore error: {0}")]
    Sem(#[from] SemError),
    #[error("kinematics selection failed: {0}")]
    Kinematics(#[from] KinematicsError),
}

/// O(1) running cycle-time statistics, mirrored from the Servo Loop's.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleStats {
    pub cycle_count: u64,
    pub last_cycle_ns: i64,
    pub max_cycle_ns: i64,
    pub overruns: u64,
}

impl CycleStats {
    pub fn record(&mut self, duration_ns: i64, budget_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        if duration_ns > self.max_cycle_ns {
            self.max_cycle_ns = duration_ns;
        }
        if duration_ns > budget_ns {
            self.overruns += 1;
        }
    }
}

/// Per-joint velocity ramp state for `TeleopJoint` (§4.4: "per-axis
/// velocity command with acceleration filter").
#[derive(Debug, Clone, Copy, Default)]
struct TeleopRamp {
    current_vel: [f64; MAX_JOINTS],
}

pub struct TrajCycle {
    channel: TrajChannel,
    clock: ServoClock,
    kin: Box<dyn Kinematics>,
    queue: MotionQueue,
    state_machine: TrajStateMachine,
    cfg: TrajCfg,
    num_joints: usize,
    joint_types: Vec<JointType>,

    /// Measured joints (scaled, offset-corrected) from the last tick every
    /// servo reported homed, else the last commanded value.
    joints_act: JointVector,
    /// Last commanded/interpolated joint vector; the inverse-kinematics
    /// seed (§4.4: "seeded from the previous joints to avoid branch-jump").
    joints_cmd: JointVector,
    homed: bool,
    joints_homed_mask: u32,
    joints_active_mask: u32,

    kcp_act: Pose,
    ecp_act: Pose,

    xinv_applied: Pose,

    teleop_ramp: TeleopRamp,
    here_target_joints: JointVector,

    last_cmd_serial: Option<u64>,
    servo_serial: u64,

    tick_count: u64,
    pub stats: CycleStats,
    pub log: LogRing,
}

impl TrajCycle {
    /// Open this loop's channel, attach the servo clock semaphore, and
    /// select the configured kinematics plug-in.
    pub fn new(cfg: TrajCfg, kinematics_name: &str, num_joints: usize, sem_key: i32, stale_threshold: u32) -> Result<Self, TrajCycleError> {
        let channel = TrajChannel::open(num_joints, stale_threshold)?;
        let clock = ServoClock::open(sem_key)?;
        let kin = kinematics::select(kinematics_name, num_joints)?;
        let joint_types = kin.joint_types();

        Ok(Self {
            channel,
            clock,
            kin,
            queue: MotionQueue::new(),
            state_machine: TrajStateMachine::default(),
            cfg,
            num_joints,
            joint_types,
            joints_act: JointVector::zeros(num_joints),
            joints_cmd: JointVector::zeros(num_joints),
            homed: false,
            joints_homed_mask: 0,
            joints_active_mask: 0,
            kcp_act: Pose::IDENTITY,
            ecp_act: Pose::IDENTITY,
            xinv_applied: Pose::IDENTITY,
            teleop_ramp: TeleopRamp::default(),
            here_target_joints: JointVector::zeros(num_joints),
            last_cmd_serial: None,
            servo_serial: 0,
            tick_count: 0,
            stats: CycleStats::default(),
            log: LogRing::new(LogEntryKind::Xinv),
        })
    }

    /// Apply a newly-received `cfg`: forward limits/profile/scale, and
    /// (only when the queue is empty, §4.4 "Configuration state tables")
    /// re-derive limits/home from a tool-transform change.
    fn apply_cfg(&mut self, cfg: TrajCfg) {
        if self.queue.is_empty() && cfg.tool_transform != self.cfg.tool_transform {
            // newToolInv * oldTool re-expresses the ECP-frame limits/home
            // under the new tool transform (§4.4).
            let correction = cfg.tool_transform.inverse().compose(self.cfg.tool_transform);
            self.ecp_act = self.ecp_act.compose(correction.inverse());
        }
        self.cfg = cfg;
        self.queue.set_scale(cfg.scale.clamp(0.0, cfg.max_scale.max(1.0)));
        self.forward_cycle_mult();
    }

    /// One tick. `dt` is the trajectory loop's own cycle time in seconds.
    pub fn tick(&mut self, dt: f64) {
        if self.channel.own_reader.cfg.has_changed() {
            if let Ok(cfg) = self.channel.own_reader.cfg.read() {
                self.apply_cfg(cfg);
            }
        }

        self.walk_in_xinv(dt);

        let cmd = match self.channel.own_reader.cmd.read() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "traj cmd read failed, holding last state");
                self.publish_servo_heartbeat();
                self.publish_stat(0);
                return;
            }
        };

        self.update_servo_feedback();

        if self.homed {
            if let Ok(kcp) = self.kin.fwd(&self.joints_act) {
                self.kcp_act = kcp;
                self.ecp_act = kcp.compose(self.cfg.tool_transform);
            }
        }

        let dispatch = self.state_machine.dispatch(cmd.serial_number, cmd.cmd_type);
        let is_new = self.last_cmd_serial != Some(cmd.serial_number);
        self.last_cmd_serial = Some(cmd.serial_number);

        if is_new {
            self.on_new_command(&cmd, dispatch);
        }

        if !dispatch.suspend_output {
            self.run_command(&cmd, dt);
        }

        self.publish_servo_heartbeat();
        self.publish_stat(cmd.serial_number);
        self.record_log();
        self.tick_count += 1;
    }

    /// Slew `xinv_applied` toward the last-seen `ref.Xinv` at a small
    /// fraction of the translational/rotational velocity limit per cycle
    /// (§4.4 step 6 "walk-in filter").
    fn walk_in_xinv(&mut self, dt: f64) {
        let Ok(xref) = self.channel.own_reader.xref.read() else { return };
        let (tran_dist, rot_dist) = self.xinv_applied.distance(xref.xinv);
        if tran_dist < 1e-9 && rot_dist < 1e-9 {
            return;
        }
        let max_tran_step = XINV_WALK_IN_FRACTION * self.cfg.profile.max_tvel * dt;
        let max_rot_step = XINV_WALK_IN_FRACTION * self.cfg.profile.max_rvel * dt;
        let tran_frac = if tran_dist > 1e-12 { (max_tran_step / tran_dist).min(1.0) } else { 1.0 };
        let rot_frac = if rot_dist > 1e-12 { (max_rot_step / rot_dist).min(1.0) } else { 1.0 };
        let frac = tran_frac.max(rot_frac).clamp(0.0, 1.0);
        self.xinv_applied = Pose::new(
            self.xinv_applied.tran + (xref.xinv.tran - self.xinv_applied.tran).scale(frac),
            self.xinv_applied.rot.slerp(xref.xinv.rot, frac),
        );
    }

    /// Read every servo's `stat`/`set` and update the active/homed masks
    /// plus measured joints and per-joint offset (§4.4 step 2).
    fn update_servo_feedback(&mut self) {
        let mut active_mask = 0u32;
        let mut homed_mask = 0u32;
        let mut joints = self.joints_act;
        for (i, reader) in self.channel.servo_readers.iter_mut().enumerate() {
            let Ok(stat) = reader.stat.read() else { continue };
            if stat.admin_state == AdminState::Initialized {
                active_mask |= 1 << i;
            }
            if stat.homed {
                homed_mask |= 1 << i;
                joints.set(i, stat.input - stat.offset);
            }
        }
        self.joints_active_mask = active_mask;
        self.joints_homed_mask = homed_mask;
        self.joints_act = joints;

        let all_homed = active_mask != 0 && (active_mask & homed_mask) == active_mask;
        if all_homed && !self.homed {
            // Homed transition: copy actual into commanded to avoid a jump.
            self.joints_cmd = self.joints_act;
            if let Ok(kcp) = self.kin.fwd(&self.joints_act) {
                self.kcp_act = kcp;
                self.ecp_act = kcp.compose(self.cfg.tool_transform);
            }
        }
        self.homed = all_homed;
    }

    /// On-entry hook for a freshly dispatched command (§4.4 step 4/5).
    fn on_new_command(&mut self, cmd: &TrajCmd, dispatch: Dispatch) {
        use TrajCmdType::*;
        match cmd.cmd_type {
            Init => {
                self.queue.clear();
                let _ = self.queue.set_type(QueueType::Joint);
                self.queue.set_scale(1.0);
                self.joints_cmd = self.joints_act;
            }
            Abort | Halt | Shutdown => {
                self.queue.clear();
            }
            Stop => self.queue_stop(),
            MoveUjoint | MoveJoint if dispatch.on_entry => self.push_joint_segment(cmd),
            MoveWorld | MoveTool if dispatch.on_entry && self.homed => self.push_world_segment(cmd),
            MoveWorld | MoveTool if dispatch.on_entry => {
                warn!(cmd = ?cmd.cmd_type, "rejecting world move: not yet homed");
                self.state_machine.mark_error();
            }
            Here => self.apply_here(cmd),
            _ => {}
        }
    }

    /// Retarget the in-flight segment into a jerk-limited deceleration to
    /// rest at the current point, leaving it to drain through `run_command`
    /// at every following tick until the queue empties (§4.3 `stop()`,
    /// §4.4 step 5 `Stop`).
    fn queue_stop(&mut self) {
        let n = self.num_joints;
        let mut max_acc = vec![0.0; n];
        let mut max_jerk = vec![0.0; n];
        for i in 0..n {
            let (_, a, j) = self.servo_limits(i);
            max_acc[i] = a;
            max_jerk[i] = j;
        }
        self.queue.stop(&max_acc, &max_jerk, &self.cfg.profile);
    }

    fn servo_limits(&mut self, joint: usize) -> (f64, f64, f64) {
        self.channel
            .servo_readers
            .get_mut(joint)
            .and_then(|r| r.set.read().ok())
            .map(|set| (set.cfg_echo.max_vel, set.cfg_echo.max_acc, set.cfg_echo.max_jerk))
            .unwrap_or((1.0, 1.0, 1.0))
    }

    fn push_joint_segment(&mut self, cmd: &TrajCmd) {
        let n = self.num_joints.min(cmd.joints.n as usize);
        let mut end = cmd.joints;
        if self.homed {
            for i in 0..n {
                let v = end.values[i]
                    .clamp(self.cfg.min_limit_joint.values[i], self.cfg.max_limit_joint.values[i]);
                end.values[i] = v;
            }
        }
        let end_vec = JointVector::from_slice(&end.values[..n]);
        let mut max_vel = vec![0.0; n];
        let mut max_acc = vec![0.0; n];
        let mut max_jerk = vec![0.0; n];
        for i in 0..n {
            let (v, a, j) = self.servo_limits(i);
            max_vel[i] = v;
            max_acc[i] = a;
            max_jerk[i] = j;
        }
        let time_override = cmd.has_time_override.then_some(cmd.time_override);
        let start = self.joints_cmd;
        let result = match cmd.cmd_type {
            TrajCmdType::MoveUjoint => self.queue.push_ujoint_move(start, end_vec, &max_vel, &max_acc, &max_jerk, time_override),
            _ => self.queue.push_joint_move(start, end_vec, &max_vel, &max_acc, &max_jerk, time_override),
        };
        if let Err(e) = result {
            warn!(error = %e, "rejecting joint move: queue mode mismatch");
            self.state_machine.mark_error();
            return;
        }
        self.joints_cmd = end_vec;
    }

    fn push_world_segment(&mut self, cmd: &TrajCmd) {
        let end = if cmd.cmd_type == TrajCmdType::MoveTool { self.ecp_act.compose(cmd.pose) } else { cmd.pose };
        let clamped = self.clamp_pose(end);
        let time_override = cmd.has_time_override.then_some(cmd.time_override);
        let result = if cmd.is_circular {
            let center = cmd.center.tran;
            let normal = cmd.normal.tran;
            self.queue.push_world_circular(self.ecp_act, clamped, center, normal, cmd.turns, &self.cfg.profile, time_override)
        } else {
            self.queue.push_world_linear(self.ecp_act, clamped, &self.cfg.profile, time_override)
        };
        if let Err(e) = result {
            warn!(error = %e, "rejecting world move: queue mode mismatch");
            self.state_machine.mark_error();
        }
    }

    fn clamp_pose(&self, pose: Pose) -> Pose {
        let t = pose.tran;
        let lo = self.cfg.min_limit_tran.tran;
        let hi = self.cfg.max_limit_tran.tran;
        Pose::new(Vec3::new(t.x.clamp(lo.x, hi.x), t.y.clamp(lo.y, hi.y), t.z.clamp(lo.z, hi.z)), pose.rot)
    }

    /// `Here`: redefine the current joints to correspond to the commanded
    /// ECP (§4.4 step 5).
    fn apply_here(&mut self, cmd: &TrajCmd) {
        let ecp = cmd.pose;
        let kcp = ecp.compose(self.cfg.tool_transform.inverse());
        if let Ok(joints) = self.kin.inv(kcp, &self.joints_cmd) {
            self.here_target_joints = joints;
            self.joints_cmd = joints;
            self.joints_act = joints;
            self.ecp_act = ecp;
            self.kcp_act = kcp;
            self.queue.set_here(QueueType::Joint);
        }
    }

    /// Advance this tick's interpolation / tracking / teleop state and
    /// fold the result into `joints_cmd` (§4.4 steps 4-5).
    fn run_command(&mut self, cmd: &TrajCmd, dt: f64) {
        use TrajCmdType::*;
        match cmd.cmd_type {
            MoveUjoint | MoveJoint => {
                if let Some(Sample::Joint(j)) = self.queue.tick(dt) {
                    self.joints_cmd = j;
                }
            }
            MoveWorld | MoveTool if self.homed => {
                if let Some(Sample::World(ecp)) = self.queue.tick(dt) {
                    self.inverse_into_joints(ecp);
                }
            }
            Stop => match self.queue.tick(dt) {
                Some(Sample::Joint(j)) => self.joints_cmd = j,
                Some(Sample::World(ecp)) => self.inverse_into_joints(ecp),
                None => {}
            },
            TrackWorld if self.homed => {
                let ecp = self.clamp_pose(cmd.pose);
                self.inverse_into_joints(ecp);
            }
            TrackJoint => {
                let n = self.num_joints.min(cmd.joints.n as usize);
                let mut target = self.joints_cmd;
                for i in 0..n {
                    let v = if self.homed {
                        cmd.joints.values[i].clamp(self.cfg.min_limit_joint.values[i], self.cfg.max_limit_joint.values[i])
                    } else {
                        cmd.joints.values[i]
                    };
                    target.set(i, v);
                }
                self.joints_cmd = target;
            }
            TeleopJoint => self.run_teleop_joint(cmd, dt),
            TeleopWorld | TeleopTool if self.homed => self.run_teleop_world(cmd, dt),
            _ => {}
        }
    }

    fn inverse_into_joints(&mut self, ecp: Pose) {
        let kcp = ecp.compose(self.cfg.tool_transform.inverse());
        if let Ok(mut joints) = self.kin.inv(kcp, &self.joints_cmd) {
            joints.shift_to_nearest_revolution(&self.joints_cmd, &self.joint_types);
            self.joints_cmd = joints;
        }
    }

    fn run_teleop_joint(&mut self, cmd: &TrajCmd, dt: f64) {
        let n = self.num_joints.min(cmd.joints.n as usize);
        let mut target = self.joints_cmd;
        for i in 0..n {
            let (_, max_acc, _) = self.servo_limits(i);
            let requested = cmd.joints.values[i];
            let current = self.teleop_ramp.current_vel[i];
            let max_step = max_acc.max(0.0) * dt;
            let new_vel = if requested > current {
                (current + max_step).min(requested)
            } else {
                (current - max_step).max(requested)
            };
            self.teleop_ramp.current_vel[i] = new_vel;
            let mut pos = target.get(i) + new_vel * dt;
            if self.homed {
                pos = pos.clamp(self.cfg.min_limit_joint.values[i], self.cfg.max_limit_joint.values[i]);
            }
            target.set(i, pos);
        }
        self.joints_cmd = target;
    }

    fn run_teleop_world(&mut self, cmd: &TrajCmd, dt: f64) {
        // The linear velocity is carried in `vel.tran`; the angular
        // velocity vector is carried in `vel.rot`'s vector part (a twist
        // encoded into a Pose container, since no dedicated wire type
        // exists for a 6-DoF velocity).
        let mut lin = cmd.vel.tran;
        let mut ang = Vec3::new(cmd.vel.rot.x, cmd.vel.rot.y, cmd.vel.rot.z);
        if cmd.cmd_type == TrajCmdType::TeleopTool {
            lin = self.ecp_act.rot.rotate(lin);
            ang = self.ecp_act.rot.rotate(ang);
        }

        let mut target_tran = self.ecp_act.tran + lin.scale(dt);
        let lo = self.cfg.min_limit_tran.tran;
        let hi = self.cfg.max_limit_tran.tran;
        if target_tran.x < lo.x || target_tran.x > hi.x {
            lin.x = 0.0;
        }
        if target_tran.y < lo.y || target_tran.y > hi.y {
            lin.y = 0.0;
        }
        if target_tran.z < lo.z || target_tran.z > hi.z {
            lin.z = 0.0;
        }
        target_tran = self.ecp_act.tran + lin.scale(dt);

        let twist = [lin.x, lin.y, lin.z, ang.x, ang.y, ang.z];
        let Ok(jac_cols) = self.kin.jac_fwd(&self.joints_act) else { return };
        let n = self.num_joints;
        let mut jac = [[0.0; MAX_JOINTS]; 6];
        for (col, vals) in jac_cols.iter().enumerate().take(n) {
            for row in 0..6 {
                jac[row][col] = vals[row];
            }
        }
        let lhs = normal_equations(&jac, n, 1e-6);
        let rhs = jt_error(&jac, n, &twist);
        let Some(joint_vel) = solve(&lhs, &rhs, n) else { return };

        let mut target = self.joints_cmd;
        for i in 0..n {
            target.set(i, target.get(i) + joint_vel[i] * dt);
        }
        self.joints_cmd = target;
        self.ecp_act = Pose::new(target_tran, self.ecp_act.rot);
    }

    /// Write a fresh `Servo` command to every joint this tick — the
    /// heartbeat every command table must perform regardless of dispatch
    /// (§4.4 step 4).
    fn publish_servo_heartbeat(&mut self) {
        self.servo_serial += 1;
        let admin_shutdown = self.state_machine.admin_state() == AdminState::Shutdown;
        let admin_init = self.state_machine.admin_state() != AdminState::Uninitialized;
        for (i, writer) in self.channel.servo_writers.iter_mut().enumerate() {
            let setpoint = self.joints_cmd.get(i.min(self.joints_cmd.len().saturating_sub(1)));
            let cmd_type = if admin_shutdown {
                ServoCmdType::Shutdown
            } else if admin_init {
                ServoCmdType::Servo
            } else {
                ServoCmdType::Nop
            };
            writer.cmd.write(ServoCmd {
                serial_number: writer.cmd.next_serial(),
                cmd_type,
                setpoint,
                home: false,
            });
        }
    }

    /// Propagate `cycle_time` to Servo 0's `cycle_mult` whenever this
    /// loop's own cycle time changes (§4.4 "Configuration state tables:
    /// cycle_time (propagates cycle_mult to Servo 0)").
    fn forward_cycle_mult(&mut self) {
        let Some(reader) = self.channel.servo_readers.first_mut() else { return };
        let Ok(servo0_set) = reader.set.read() else { return };
        let mut cfg = servo0_set.cfg_echo;
        if cfg.cycle_time <= 0.0 {
            return;
        }
        let cycle_mult = (self.cfg.cycle_time / cfg.cycle_time).round().max(1.0) as u32;
        if cfg.cycle_mult == cycle_mult {
            return;
        }
        cfg.cycle_mult = cycle_mult;
        cfg.serial_number = self.channel.servo_writers[0].cfg.next_serial();
        self.channel.servo_writers[0].cfg.write(cfg);
    }

    fn publish_stat(&mut self, echo_serial: u64) {
        let stat = TrajStat {
            serial_number: self.channel.own_writer.stat.next_serial(),
            echo_serial_number: echo_serial,
            status: self.state_machine.status(),
            admin_state: self.state_machine.admin_state(),
            ecp: self.ecp_act,
            kcp: self.kcp_act,
            joints_act: gomotion_common::shm::segments::JointArray::from_slice(self.joints_act.as_slice()),
            joints_homed_mask: self.joints_homed_mask,
            joints_active_mask: self.joints_active_mask,
            homed: self.homed,
            queue_count: self.queue.queue_count(),
            queue_type: self.queue.queue_type(),
            scale: self.queue.scale(),
        };
        self.channel.own_writer.stat.write(stat);

        let set = TrajSet {
            serial_number: self.channel.own_writer.set.next_serial(),
            echo_serial_number: echo_serial,
            status: self.state_machine.status(),
            admin_state: self.state_machine.admin_state(),
            cfg_echo: self.cfg,
        };
        self.channel.own_writer.set.write(set);
    }

    fn record_log(&mut self) {
        let value = match self.log.kind() {
            LogEntryKind::Xinv => self.xinv_applied.tran.norm(),
            LogEntryKind::MagXinv => self.xinv_applied.rot.angle_to(gomotion_common::pose::Quat::IDENTITY),
            _ => return,
        };
        self.log.push(self.tick_count, value);
    }

    /// Block on the Servo 0 clock, then tick. Never returns under normal
    /// operation (§5 "No other sleep in Traj").
    pub fn run(mut self) -> ! {
        loop {
            if let Err(e) = self.clock.wait() {
                warn!(error = %e, "servo clock wait failed");
                std::thread::sleep(std::time::Duration::from_millis(1));
                continue;
            }
            let start = Instant::now();
            let dt = self.cfg.cycle_time.max(1e-6);
            self.tick(dt);
            let elapsed = start.elapsed();
            self.stats.record(elapsed.as_nanos() as i64, (dt * 1e9) as i64);
        }
    }
}
