use crate::{Error, Joint, MotionDocument};
use glam::{DMat4, DVec3};

/// Forward kinematics of one motion frame.
///
/// Joints are stored in depth-first declaration order with every parent ahead of its children, so
/// a single pass in index order visits the hierarchy depth-first.
#[derive(Clone, Debug)]
pub struct Pose {
    frame: usize,
    scale: f64,
    model: DMat4,
    pub(crate) locals: Vec<DMat4>,
    /// Root-space transforms; the model transform is applied on top for global positions.
    pub(crate) worlds: Vec<DMat4>,
    angles: Vec<DVec3>,
}

/// A drawable bone between two global points.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoneSegment {
    pub joint: usize,
    pub start: DVec3,
    pub end: DVec3,
}

impl Pose {
    /// Evaluates `frame` of `document`. Offsets and root translation are multiplied by `scale`;
    /// `model` maps root space to the caller's space (view transform removed).
    pub fn evaluate(
        document: &MotionDocument,
        frame: usize,
        scale: f64,
        model: DMat4,
    ) -> Result<Self, Error> {
        if !document.is_load_success() {
            return Err(Error::NotLoaded);
        }
        document.check_frame(frame)?;
        let row = document.frame(frame).ok_or(Error::FrameOutOfRange {
            frame,
            frames: document.num_frames(),
        })?;

        let count = document.joints().len();
        let mut pose = Self {
            frame,
            scale,
            model,
            locals: Vec::with_capacity(count),
            worlds: Vec::with_capacity(count),
            angles: Vec::with_capacity(count),
        };

        for joint in document.joints() {
            let (local, angles) = local_transform(document, joint, row, scale, None);
            let world = match joint.parent {
                Some(parent) => pose.worlds[parent] * local,
                None => local,
            };
            pose.locals.push(local);
            pose.worlds.push(world);
            pose.angles.push(angles);
        }

        Ok(pose)
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn model(&self) -> DMat4 {
        self.model
    }

    pub fn joint_count(&self) -> usize {
        self.worlds.len()
    }

    /// Transform relative to the parent joint.
    pub fn local_transform(&self, joint: usize) -> Option<DMat4> {
        self.locals.get(joint).copied()
    }

    /// Transform relative to the skeleton root space, without the model transform.
    pub fn world_transform(&self, joint: usize) -> Option<DMat4> {
        self.worlds.get(joint).copied()
    }

    pub fn global_transform(&self, joint: usize) -> Option<DMat4> {
        self.worlds.get(joint).map(|world| self.model * *world)
    }

    pub fn global_position(&self, joint: usize) -> Option<DVec3> {
        self.global_transform(joint)
            .map(|m| m.transform_point3(DVec3::ZERO))
    }

    pub fn global_positions(&self) -> Vec<DVec3> {
        (0..self.worlds.len())
            .filter_map(|j| self.global_position(j))
            .collect()
    }

    /// Rotation channel values of a joint in degrees, per axis. Axes without a channel are zero.
    pub fn joint_angles(&self, joint: usize) -> Option<DVec3> {
        self.angles.get(joint).copied()
    }

    /// Global position of the point the solver drags for `joint`.
    pub fn effector_position(&self, document: &MotionDocument, joint: usize) -> Option<DVec3> {
        let j = document.joint(joint)?;
        let local = effector_offset(j, self.scale);
        self.global_transform(joint).map(|m| m.transform_point3(local))
    }

    /// Bones for drawing: a leaf points at its site, a single child at that child, and several
    /// children fan out from the mean of their offsets.
    pub fn bone_segments(&self, document: &MotionDocument) -> Vec<BoneSegment> {
        let mut segments = Vec::new();
        for joint in document.joints() {
            let Some(global) = self.global_transform(joint.index) else {
                continue;
            };
            let start = global.transform_point3(DVec3::ZERO);
            let offset_of = |child: usize| {
                document
                    .joint(child)
                    .map(|c| c.offset * self.scale)
                    .unwrap_or(DVec3::ZERO)
            };

            match joint.children.as_slice() {
                [] => {
                    if let Some(site) = joint.site {
                        segments.push(BoneSegment {
                            joint: joint.index,
                            start,
                            end: global.transform_point3(site * self.scale),
                        });
                    }
                }
                [child] => segments.push(BoneSegment {
                    joint: joint.index,
                    start,
                    end: global.transform_point3(offset_of(*child)),
                }),
                children => {
                    let sum: DVec3 = children.iter().map(|&c| offset_of(c)).sum();
                    let center = global.transform_point3(sum / children.len() as f64);
                    segments.push(BoneSegment {
                        joint: joint.index,
                        start,
                        end: center,
                    });
                    for &child in children {
                        segments.push(BoneSegment {
                            joint: joint.index,
                            start: center,
                            end: global.transform_point3(offset_of(child)),
                        });
                    }
                }
            }
        }
        segments
    }
}

/// Effector point in the joint's local frame: the site tip of a leaf, the origin otherwise.
pub(crate) fn effector_offset(joint: &Joint, scale: f64) -> DVec3 {
    match joint.site {
        Some(site) if joint.children.is_empty() => site * scale,
        _ => DVec3::ZERO,
    }
}

/// Local transform of `joint` for one motion row, plus its per-axis rotation angles in degrees.
///
/// `perturb` adds a delta (degrees) to one channel column before composing.
pub(crate) fn local_transform(
    document: &MotionDocument,
    joint: &Joint,
    row: &[f64],
    scale: f64,
    perturb: Option<(usize, f64)>,
) -> (DMat4, DVec3) {
    let mut translation = joint.offset;
    let mut rotation = DMat4::IDENTITY;
    let mut angles = DVec3::ZERO;

    for &channel_index in &joint.channels {
        let Some(channel) = document.channel(channel_index) else {
            continue;
        };
        let mut value = row.get(channel.index).copied().unwrap_or(0.0);
        match perturb {
            Some((column, delta)) if column == channel.index => value += delta,
            _ => {}
        }

        let axis = channel.kind.axis();
        if channel.kind.is_rotation() {
            angles[axis] = value;
            let radians = value.to_radians();
            rotation *= match axis {
                0 => DMat4::from_rotation_x(radians),
                1 => DMat4::from_rotation_y(radians),
                _ => DMat4::from_rotation_z(radians),
            };
        } else if joint.is_root() {
            translation[axis] = value;
        }
    }

    (DMat4::from_translation(translation * scale) * rotation, angles)
}
