//! BVH motion capture runtime: parsing, forward kinematics, Jacobian IK and keyframe editing.
//!
//! This crate is renderer-agnostic. [`Pose`] exposes global joint positions and bone segments;
//! drawing them is left to the caller (see `bvhkit-cli` for a headless front end).

#![forbid(unsafe_code)]

mod document;
mod error;
mod model;
mod parse;
mod runtime;
mod write;

pub use document::*;
pub use error::*;
pub use model::*;
pub use runtime::*;

pub use glam;
