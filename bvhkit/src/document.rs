use crate::{Bounds, Channel, Error, Joint, ParseWarning};
use glam::DVec3;
use std::collections::HashMap;
use std::path::Path;

/// A loaded BVH file: skeleton, channel layout and the `frames × channels` motion table.
///
/// Rows are stored contiguously; row `i`, column `j` is channel `j` at frame `i`. The hierarchy
/// text is kept verbatim so that saving reproduces the loaded skeleton definition.
#[derive(Clone, Debug, Default)]
pub struct MotionDocument {
    pub(crate) file_name: String,
    pub(crate) motion_name: String,
    pub(crate) is_load_success: bool,
    pub(crate) header: String,
    pub(crate) joints: Vec<Joint>,
    pub(crate) channels: Vec<Channel>,
    pub(crate) joint_index: HashMap<String, usize>,
    pub(crate) num_frames: usize,
    pub(crate) interval: f64,
    pub(crate) motion: Vec<f64>,
    pub(crate) keyframes: Vec<usize>,
    pub(crate) warnings: Vec<ParseWarning>,
}

impl MotionDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses BVH text. The file and motion names are left empty.
    pub fn from_bvh_str(input: &str) -> Result<Self, Error> {
        crate::parse::parse_document(input)
    }

    /// Reads and parses a BVH file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut document = Self::from_bvh_str(&text)?;
        document.file_name = path.to_string_lossy().into_owned();
        document.motion_name = motion_name_from_path(&document.file_name);
        log::debug!(
            "loaded '{}': {} joint(s), {} channel(s), {} frame(s)",
            document.file_name,
            document.joints.len(),
            document.channels.len(),
            document.num_frames
        );
        Ok(document)
    }

    /// Replaces this document with the contents of `path`.
    ///
    /// The document is cleared first. On failure it stays cleared and
    /// [`is_load_success`](Self::is_load_success) reports `false`.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), Error> {
        self.clear();
        match Self::open(path) {
            Ok(document) => {
                *self = document;
                Ok(())
            }
            Err(err) => {
                log::warn!("load failed: {err}");
                Err(err)
            }
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_load_success(&self) -> bool {
        self.is_load_success
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn motion_name(&self) -> &str {
        &self.motion_name
    }

    /// Hierarchy text up to, not including, the `MOTION` line.
    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn joint(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    pub fn joint_by_name(&self, name: &str) -> Option<&Joint> {
        self.joint_index.get(name).and_then(|&i| self.joints.get(i))
    }

    pub fn find_joint(&self, name: &str) -> Result<usize, Error> {
        self.joint_index
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownJoint {
                name: name.to_string(),
            })
    }

    pub fn root(&self) -> Option<&Joint> {
        self.joints.iter().find(|j| j.is_root())
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Seconds per frame.
    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn duration(&self) -> f64 {
        self.num_frames as f64 * self.interval
    }

    /// The whole motion table, row-major.
    pub fn motion(&self) -> &[f64] {
        &self.motion
    }

    pub fn frame(&self, frame: usize) -> Option<&[f64]> {
        let width = self.channels.len();
        if frame >= self.num_frames {
            return None;
        }
        self.motion.get(frame * width..(frame + 1) * width)
    }

    pub fn frame_mut(&mut self, frame: usize) -> Option<&mut [f64]> {
        let width = self.channels.len();
        if frame >= self.num_frames {
            return None;
        }
        self.motion.get_mut(frame * width..(frame + 1) * width)
    }

    pub fn value(&self, frame: usize, channel: usize) -> Option<f64> {
        self.frame(frame).and_then(|row| row.get(channel).copied())
    }

    pub fn keyframes(&self) -> &[usize] {
        &self.keyframes
    }

    /// Numeric tokens that were read as zero while parsing.
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    /// Root translation for one motion row.
    ///
    /// Starts from the root rest offset; every root position channel replaces its axis.
    pub fn root_translation(&self, row: &[f64]) -> DVec3 {
        let Some(root) = self.root() else {
            return DVec3::ZERO;
        };
        let mut translation = root.offset;
        for &channel_index in &root.channels {
            let channel = &self.channels[channel_index];
            if channel.kind.is_position() {
                translation[channel.kind.axis()] = row.get(channel.index).copied().unwrap_or(0.0);
            }
        }
        translation
    }

    /// Root-motion extent over all frames, `None` when there are no frames.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points((0..self.num_frames).filter_map(|i| {
            let row = self.frame(i)?;
            Some(self.root_translation(row))
        }))
    }

    pub(crate) fn check_frame(&self, frame: usize) -> Result<(), Error> {
        if frame < self.num_frames {
            Ok(())
        } else {
            Err(Error::FrameOutOfRange {
                frame,
                frames: self.num_frames,
            })
        }
    }
}

/// File stem after the last `/` or `\`, up to the last `.`.
pub(crate) fn motion_name_from_path(path: &str) -> String {
    let first = path.rfind(['\\', '/']).map(|i| i + 1).unwrap_or(0);
    let name = &path[first..];
    match name.rfind('.') {
        Some(last) => name[..last].to_string(),
        None => name.to_string(),
    }
}
