mod ik;
mod keyframes;
mod playback;
pub(crate) mod pose;
mod settings;

pub use ik::*;
pub use playback::*;
pub use pose::{BoneSegment, Pose};
pub use settings::*;


#[cfg(test)]
mod ik_tests;

#[cfg(test)]
mod keyframes_tests;
