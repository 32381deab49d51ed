use glam::DVec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Translation applied to the root per unit of drag displacement in rotate mode.
pub const ROOT_TRANSLATE_SENSITIVITY: f64 = 0.5;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum MoveMode {
    /// Drag displacement is added directly to rotation channels (or root position).
    Rotate,
    #[default]
    InverseKinematics,
}

/// Per-axis switches for the drag displacement.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AxisMask {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl Default for AxisMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl AxisMask {
    pub const ALL: Self = Self {
        x: true,
        y: true,
        z: true,
    };

    /// Zeroes the components of `v` whose axis is disabled.
    pub fn apply(self, v: DVec3) -> DVec3 {
        DVec3::new(
            if self.x { v.x } else { 0.0 },
            if self.y { v.y } else { 0.0 },
            if self.z { v.z } else { 0.0 },
        )
    }

    pub fn toggle(&mut self, axis: usize) {
        match axis {
            0 => self.x = !self.x,
            1 => self.y = !self.y,
            2 => self.z = !self.z,
            _ => {}
        }
    }
}

/// Solver inputs read at the time of each [`IkSolver::apply`](crate::IkSolver::apply) call.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct SolverSettings {
    pub mode: MoveMode,
    /// Adds `lambda² I` to `J Jᵀ` before inverting.
    pub damping: bool,
    pub lambda: f64,
    /// Adds the null-space control term.
    pub control: bool,
    /// Control gain per axis (x, y, z).
    pub gains: [f64; 3],
    pub axes: AxisMask,
    /// Pulls targets outside a chain's reach back onto its reach sphere.
    pub clamp_reach: bool,
    /// Channel perturbation in degrees for the numerical Jacobian.
    pub perturbation: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            mode: MoveMode::default(),
            damping: false,
            lambda: 1.0,
            control: false,
            gains: [1.0; 3],
            axes: AxisMask::ALL,
            clamp_reach: true,
            perturbation: 0.01,
        }
    }
}

impl SolverSettings {
    /// Damping factor actually used by the solve, zero when damping is off.
    pub fn effective_lambda(&self) -> f64 {
        if self.damping { self.lambda } else { 0.0 }
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(self.perturbation.is_finite() && self.perturbation != 0.0) {
            return Err(crate::Error::InvalidValue {
                message: format!("perturbation must be finite and non-zero, got {}", self.perturbation),
            });
        }
        if !self.lambda.is_finite() {
            return Err(crate::Error::InvalidValue {
                message: format!("lambda must be finite, got {}", self.lambda),
            });
        }
        if self.gains.iter().any(|g| !g.is_finite()) {
            return Err(crate::Error::InvalidValue {
                message: format!("gains must be finite, got {:?}", self.gains),
            });
        }
        Ok(())
    }
}
