//! Damped least-squares solve for dragged joints.
//!
//! One call linearizes the current pose once, solves for rotation channel deltas that move every
//! dragged effector by its displacement, and writes the deltas into the pose's frame row.

use crate::runtime::pose::{effector_offset, local_transform};
use crate::{Error, MotionDocument, MoveMode, Pose, ROOT_TRANSLATE_SENSITIVITY, SolverSettings};
use glam::{DMat4, DVec3};
use nalgebra::{DMatrix, DVector};

/// Extra room allowed past the reach sphere before a target is clamped.
const REACH_EPSILON: f64 = 1e-9;

/// Singular values of `J Jᵀ + λ² I` below this fraction of the largest one count as zero.
const RANK_TOLERANCE: f64 = 1e-10;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SolveOutcome {
    /// Channel values were written to the frame row.
    Applied,
    /// Nothing to do (empty selection, zero displacement, or no rotation channels).
    Unchanged,
    /// The linear system was numerically singular or produced non-finite deltas; nothing was
    /// written.
    Discarded,
}

#[derive(Clone, Debug, Default)]
pub struct IkSolver {
    settings: SolverSettings,
}

/// One dragged joint: its chain (joint first, up to the child of the root) and target error.
struct Target {
    chain: Vec<usize>,
    /// Effector position from recomposing the chain, used as the Jacobian baseline.
    base: DVec3,
    error: DVec3,
}

impl IkSolver {
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SolverSettings {
        &mut self.settings
    }

    /// Applies one drag sample to the frame `pose` was evaluated for.
    ///
    /// `pose` must be current: re-evaluate it after every edit before the next call.
    pub fn apply(
        &self,
        document: &mut MotionDocument,
        pose: &Pose,
        selection: &[usize],
        displacement: DVec3,
    ) -> Result<SolveOutcome, Error> {
        if pose.joint_count() != document.joints().len() {
            return Err(Error::PoseMismatch {
                pose: pose.joint_count(),
                document: document.joints().len(),
            });
        }
        document.check_frame(pose.frame())?;
        self.settings.validate()?;

        let mut joints: Vec<usize> = Vec::with_capacity(selection.len());
        for &joint in selection {
            if document.joint(joint).is_none() {
                return Err(Error::InvalidJointIndex { index: joint });
            }
            if !joints.contains(&joint) {
                joints.push(joint);
            }
        }

        let displacement = self.settings.axes.apply(displacement);
        if joints.is_empty() || displacement == DVec3::ZERO {
            return Ok(SolveOutcome::Unchanged);
        }

        match self.settings.mode {
            MoveMode::Rotate => Ok(rotate(document, pose.frame(), &joints, displacement)),
            MoveMode::InverseKinematics => self.solve(document, pose, &joints, displacement),
        }
    }

    fn solve(
        &self,
        document: &mut MotionDocument,
        pose: &Pose,
        joints: &[usize],
        displacement: DVec3,
    ) -> Result<SolveOutcome, Error> {
        let Some(root) = document.root().map(|r| r.index) else {
            return Err(Error::MissingRoot);
        };
        let row: Vec<f64> = document
            .frame(pose.frame())
            .map(<[f64]>::to_vec)
            .unwrap_or_default();

        // Rotation channel columns in channel order.
        let mut column_of = vec![None; document.num_channels()];
        let mut rotation_channels = Vec::new();
        for channel in document.channels() {
            if channel.kind.is_rotation() {
                column_of[channel.index] = Some(rotation_channels.len());
                rotation_channels.push(channel.index);
            }
        }

        let targets: Vec<Target> = joints
            .iter()
            .filter(|&&joint| joint != root)
            .map(|&joint| self.target(document, pose, root, joint, &row, displacement))
            .collect();

        let rows = 3 * targets.len();
        let cols = rotation_channels.len();
        if rows == 0 || cols == 0 {
            return Ok(SolveOutcome::Unchanged);
        }

        let mut jacobian = DMatrix::<f64>::zeros(rows, cols);
        let mut error = DVector::<f64>::zeros(rows);
        let mut on_chain = vec![false; cols];
        let step = self.settings.perturbation;

        for (t, target) in targets.iter().enumerate() {
            error[3 * t] = target.error.x;
            error[3 * t + 1] = target.error.y;
            error[3 * t + 2] = target.error.z;

            for &joint in &target.chain {
                let Some(j) = document.joint(joint) else {
                    continue;
                };
                for &channel_index in &j.channels {
                    let Some(column) = column_of.get(channel_index).copied().flatten() else {
                        continue;
                    };
                    let moved = chain_effector(
                        document,
                        pose,
                        &target.chain,
                        &row,
                        Some((channel_index, step)),
                    );
                    let derivative = (moved - target.base) / step;
                    jacobian[(3 * t, column)] = derivative.x;
                    jacobian[(3 * t + 1, column)] = derivative.y;
                    jacobian[(3 * t + 2, column)] = derivative.z;
                    on_chain[column] = true;
                }
            }
        }

        // psi = Jᵀ (J Jᵀ + λ² I)⁻¹
        let lambda = self.settings.effective_lambda();
        let jt = jacobian.transpose();
        let damped = &jacobian * &jt + DMatrix::<f64>::identity(rows, rows) * (lambda * lambda);
        if is_rank_deficient(&damped) {
            log::warn!("IK update discarded: J Jᵀ + λ² I is singular (λ = {lambda})");
            return Ok(SolveOutcome::Discarded);
        }
        let Some(inverse) = damped.try_inverse() else {
            log::warn!("IK update discarded: J Jᵀ + λ² I is not invertible (λ = {lambda})");
            return Ok(SolveOutcome::Discarded);
        };
        let psi = &jt * inverse;
        let mut delta = &psi * &error;

        if self.settings.control {
            let mut z = DVector::<f64>::zeros(cols);
            for (column, &channel_index) in rotation_channels.iter().enumerate() {
                if !on_chain[column] {
                    continue;
                }
                let axis = document.channels()[channel_index].kind.axis();
                let squared: f64 = (0..targets.len()).map(|t| error[3 * t + axis].powi(2)).sum();
                z[column] = self.settings.gains[axis] * squared;
            }
            let null_space = DMatrix::<f64>::identity(cols, cols) - &psi * &jacobian;
            delta += null_space * z;
        }

        if delta.iter().any(|d| !d.is_finite()) {
            log::warn!("IK update discarded: non-finite channel delta");
            return Ok(SolveOutcome::Discarded);
        }

        let Some(frame_row) = document.frame_mut(pose.frame()) else {
            return Ok(SolveOutcome::Unchanged);
        };
        for (column, &channel_index) in rotation_channels.iter().enumerate() {
            frame_row[channel_index] += delta[column];
        }
        log::trace!(
            "IK applied to frame {} for {} target(s), |Δθ| = {}",
            pose.frame(),
            targets.len(),
            delta.norm()
        );
        Ok(SolveOutcome::Applied)
    }

    fn target(
        &self,
        document: &MotionDocument,
        pose: &Pose,
        root: usize,
        joint: usize,
        row: &[f64],
        displacement: DVec3,
    ) -> Target {
        let mut chain = Vec::new();
        let mut current = Some(joint);
        while let Some(index) = current {
            if index == root {
                break;
            }
            chain.push(index);
            current = document.joint(index).and_then(|j| j.parent);
        }

        let start = pose
            .effector_position(document, joint)
            .unwrap_or(DVec3::ZERO);
        let mut goal = start + displacement;

        if self.settings.clamp_reach {
            // Bone lengths are measured after `model`, in the space the positions live in.
            let scale = pose.scale();
            let model = pose.model();
            let mut reach: f64 = chain
                .iter()
                .filter_map(|&j| document.joint(j))
                .map(|j| model.transform_vector3(j.offset * scale).length())
                .sum();
            if let Some(j) = document.joint(joint) {
                reach += model
                    .transform_vector3(effector_offset(j, scale))
                    .length();
            }
            let origin = pose.global_position(root).unwrap_or(DVec3::ZERO);
            let distance = goal.distance(origin);
            if distance > reach + REACH_EPSILON && distance > 0.0 {
                goal = origin + (goal - origin) * (reach / distance);
            }
        }

        let base = chain_effector(document, pose, &chain, row, None);
        Target {
            chain,
            base,
            error: goal - start,
        }
    }
}

fn is_rank_deficient(matrix: &DMatrix<f64>) -> bool {
    let singular = matrix.singular_values();
    let largest = singular.max();
    !largest.is_finite() || largest <= 0.0 || singular.min() <= largest * RANK_TOLERANCE
}

/// Global effector position of `chain[0]`, recomposing the chain's local transforms on top of the
/// root's world transform, optionally with one channel perturbed.
fn chain_effector(
    document: &MotionDocument,
    pose: &Pose,
    chain: &[usize],
    row: &[f64],
    perturb: Option<(usize, f64)>,
) -> DVec3 {
    let Some((&joint, _)) = chain.split_first() else {
        return DVec3::ZERO;
    };
    let top = chain[chain.len() - 1];
    let base = document
        .joint(top)
        .and_then(|j| j.parent)
        .and_then(|parent| pose.world_transform(parent))
        .unwrap_or(DMat4::IDENTITY);

    let mut transform = pose.model() * base;
    for &index in chain.iter().rev() {
        let local = match (document.joint(index), perturb) {
            (Some(j), Some((channel, _))) if j.channels.contains(&channel) => {
                local_transform(document, j, row, pose.scale(), perturb).0
            }
            _ => pose.local_transform(index).unwrap_or(DMat4::IDENTITY),
        };
        transform *= local;
    }

    let effector = document
        .joint(joint)
        .map(|j| effector_offset(j, pose.scale()))
        .unwrap_or(DVec3::ZERO);
    transform.transform_point3(effector)
}

fn rotate(
    document: &mut MotionDocument,
    frame: usize,
    joints: &[usize],
    displacement: DVec3,
) -> SolveOutcome {
    let root = document.root().map(|r| r.index);
    let mut edits: Vec<(usize, f64)> = Vec::new();

    if let Some(root) = root.filter(|r| joints.contains(r)) {
        for &channel_index in &document.joints()[root].channels {
            let channel = &document.channels()[channel_index];
            if channel.kind.is_position() {
                let axis = channel.kind.axis();
                edits.push((channel.index, displacement[axis] * ROOT_TRANSLATE_SENSITIVITY));
            }
        }
    } else {
        for &joint in joints {
            for &channel_index in &document.joints()[joint].channels {
                let channel = &document.channels()[channel_index];
                if channel.kind.is_rotation() {
                    edits.push((channel.index, displacement[channel.kind.axis()]));
                }
            }
        }
    }

    let Some(row) = document.frame_mut(frame) else {
        return SolveOutcome::Unchanged;
    };
    if edits.is_empty() {
        return SolveOutcome::Unchanged;
    }
    for (column, delta) in edits {
        row[column] += delta;
    }
    SolveOutcome::Applied
}
