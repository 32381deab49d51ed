use crate::{
    AxisMask, Error, IkSolver, MotionDocument, MoveMode, Pose, ROOT_TRANSLATE_SENSITIVITY,
    SolveOutcome, SolverSettings,
};
use glam::{DMat4, DVec3};

const ARM: &str = r"HIERARCHY
ROOT Hips
{
	OFFSET 0 0 0
	CHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
	JOINT Arm
	{
		OFFSET 0 10 0
		CHANNELS 3 Zrotation Xrotation Yrotation
		End Site
		{
			OFFSET 0 10 0
		}
	}
}
MOTION
Frames: 1
Frame Time: 0.04
0 0 0 0 0 0 0 0 0
";

// The arm can only turn about Z, so the Z row of the Jacobian is exactly zero.
const HINGE: &str = r"HIERARCHY
ROOT Base
{
	OFFSET 0 0 0
	CHANNELS 3 Xposition Yposition Zposition
	JOINT Hinge
	{
		OFFSET 0 10 0
		CHANNELS 1 Zrotation
		End Site
		{
			OFFSET 0 10 0
		}
	}
}
MOTION
Frames: 1
Frame Time: 0.04
0 0 0 0
";

// The same hinge under a root tilted 30 degrees about X, so no Jacobian entry is exactly zero.
const TILTED_HINGE: &str = r"HIERARCHY
ROOT Base
{
	OFFSET 0 0 0
	CHANNELS 4 Xposition Yposition Zposition Xrotation
	JOINT Hinge
	{
		OFFSET 0 10 0
		CHANNELS 1 Zrotation
		End Site
		{
			OFFSET 0 10 0
		}
	}
}
MOTION
Frames: 1
Frame Time: 0.04
0 0 0 30 0
";

const LIMB: &str = r"HIERARCHY
ROOT Hips
{
	OFFSET 0 0 0
	CHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
	JOINT Thigh
	{
		OFFSET 0 -10 0
		CHANNELS 3 Zrotation Xrotation Yrotation
		JOINT Shin
		{
			OFFSET 0 -10 0
			CHANNELS 3 Zrotation Xrotation Yrotation
			End Site
			{
				OFFSET 0 -10 0
			}
		}
	}
	JOINT Chest
	{
		OFFSET 0 10 0
		CHANNELS 3 Zrotation Xrotation Yrotation
		End Site
		{
			OFFSET 0 10 0
		}
	}
}
MOTION
Frames: 1
Frame Time: 0.04
0 0 0 0 0 0 30 0 0 -60 0 0 0 0 0
";

fn damped(lambda: f64) -> SolverSettings {
    SolverSettings {
        damping: true,
        lambda,
        ..SolverSettings::default()
    }
}

fn pose(doc: &MotionDocument) -> Pose {
    Pose::evaluate(doc, 0, 1.0, DMat4::IDENTITY).unwrap()
}

#[test]
fn dragged_arm_moves_toward_target() {
    let mut doc = MotionDocument::from_bvh_str(ARM).unwrap();
    let before = pose(&doc);
    let start = before.effector_position(&doc, 1).unwrap();
    let target = start + DVec3::new(0.0, 0.0, 1.0);

    let solver = IkSolver::new(damped(0.1));
    let outcome = solver
        .apply(&mut doc, &before, &[1], DVec3::new(0.0, 0.0, 1.0))
        .unwrap();
    assert_eq!(outcome, SolveOutcome::Applied);

    let after = pose(&doc);
    let moved = after.effector_position(&doc, 1).unwrap();
    assert!(
        (moved.z - target.z).abs() < (start.z - target.z).abs(),
        "z distance did not shrink: start {start}, moved {moved}"
    );
    assert!(moved.z > 0.5 && moved.z < 1.0, "unexpected z {}", moved.z);
    assert_eq!(&doc.frame(0).unwrap()[..6], &[0.0; 6]);
}

#[test]
fn zero_displacement_is_a_no_op() {
    let mut doc = MotionDocument::from_bvh_str(LIMB).unwrap();
    let motion = doc.motion().to_vec();
    let current = pose(&doc);

    for settings in [SolverSettings::default(), damped(0.5)] {
        let outcome = IkSolver::new(settings)
            .apply(&mut doc, &current, &[2, 3], DVec3::ZERO)
            .unwrap();
        assert_eq!(outcome, SolveOutcome::Unchanged);
    }
    assert_eq!(doc.motion(), motion.as_slice());
}

#[test]
fn singular_system_is_discarded() {
    let mut doc = MotionDocument::from_bvh_str(HINGE).unwrap();
    let motion = doc.motion().to_vec();
    let current = pose(&doc);

    let outcome = IkSolver::default()
        .apply(&mut doc, &current, &[1], DVec3::new(0.0, 0.0, 1.0))
        .unwrap();

    assert_eq!(outcome, SolveOutcome::Discarded);
    assert_eq!(doc.motion(), motion.as_slice());
}

#[test]
fn numerically_singular_system_is_discarded() {
    let mut doc = MotionDocument::from_bvh_str(TILTED_HINGE).unwrap();
    let motion = doc.motion().to_vec();
    let current = pose(&doc);

    // Every drag is orthogonal to the hinge's only direction of travel (X).
    for drag in [
        DVec3::new(0.0, -0.5, 0.866),
        DVec3::new(0.0, 0.0, 1.0),
        DVec3::new(0.0, -1.0, 0.0),
    ] {
        let outcome = IkSolver::default()
            .apply(&mut doc, &current, &[1], drag)
            .unwrap();
        assert_eq!(outcome, SolveOutcome::Discarded, "drag {drag}");
        assert_eq!(doc.motion(), motion.as_slice());
    }

    // Damping keeps the same system solvable.
    let outcome = IkSolver::new(damped(0.5))
        .apply(&mut doc, &current, &[1], DVec3::new(0.0, 0.0, 1.0))
        .unwrap();
    assert_eq!(outcome, SolveOutcome::Applied);
    assert!(doc.frame(0).unwrap()[4].abs() < 1.0);
}

#[test]
fn reach_is_measured_in_model_space() {
    let scaled_offsets = MotionDocument::from_bvh_str(ARM).unwrap();
    let mut by_offsets = scaled_offsets.clone();
    let mut by_model = scaled_offsets.clone();
    let offsets_pose = Pose::evaluate(&scaled_offsets, 0, 2.0, DMat4::IDENTITY).unwrap();
    let model_pose =
        Pose::evaluate(&scaled_offsets, 0, 1.0, DMat4::from_scale(DVec3::splat(2.0))).unwrap();

    // Just past the 40 unit reach of the doubled arm.
    let drag = DVec3::new(0.0, 0.0, 10.0);
    let solver = IkSolver::new(damped(0.1));
    assert_eq!(
        solver.apply(&mut by_offsets, &offsets_pose, &[1], drag).unwrap(),
        SolveOutcome::Applied
    );
    assert_eq!(
        solver.apply(&mut by_model, &model_pose, &[1], drag).unwrap(),
        SolveOutcome::Applied
    );

    let expected = by_offsets.frame(0).unwrap();
    let actual = by_model.frame(0).unwrap();
    assert!(expected[7] > 1.0, "arm did not turn: {expected:?}");
    for (e, a) in expected.iter().zip(actual) {
        assert!((e - a).abs() < 1.0e-6, "expected {expected:?}, got {actual:?}");
    }
}

#[test]
fn two_targets_solve_together() {
    let mut doc = MotionDocument::from_bvh_str(LIMB).unwrap();
    let current = pose(&doc);
    let foot = current.effector_position(&doc, 2).unwrap();
    let head = current.effector_position(&doc, 3).unwrap();
    let drag = DVec3::new(1.0, 0.0, 0.0);

    let outcome = IkSolver::new(damped(0.1))
        .apply(&mut doc, &current, &[2, 3], drag)
        .unwrap();
    assert_eq!(outcome, SolveOutcome::Applied);

    let after = pose(&doc);
    let foot_after = after.effector_position(&doc, 2).unwrap();
    let head_after = after.effector_position(&doc, 3).unwrap();
    assert!(foot_after.distance(foot + drag) < foot.distance(foot + drag));
    assert!(head_after.distance(head + drag) < head.distance(head + drag));
    assert_eq!(&doc.frame(0).unwrap()[..6], &[0.0; 6]);
}

#[test]
fn rotate_mode_adds_displacement_to_rotation_channels() {
    let mut doc = MotionDocument::from_bvh_str(ARM).unwrap();
    let current = pose(&doc);
    let solver = IkSolver::new(SolverSettings {
        mode: MoveMode::Rotate,
        ..SolverSettings::default()
    });

    let outcome = solver
        .apply(&mut doc, &current, &[1], DVec3::new(1.0, 2.0, 3.0))
        .unwrap();
    assert_eq!(outcome, SolveOutcome::Applied);
    // Arm channels are Zrotation Xrotation Yrotation.
    assert_eq!(&doc.frame(0).unwrap()[6..], &[3.0, 1.0, 2.0]);
}

#[test]
fn rotate_mode_translates_selected_root() {
    let mut doc = MotionDocument::from_bvh_str(ARM).unwrap();
    let current = pose(&doc);
    let solver = IkSolver::new(SolverSettings {
        mode: MoveMode::Rotate,
        ..SolverSettings::default()
    });

    solver
        .apply(&mut doc, &current, &[1, 0], DVec3::new(2.0, -4.0, 6.0))
        .unwrap();
    let row = doc.frame(0).unwrap();
    assert_eq!(
        &row[..3],
        &[
            2.0 * ROOT_TRANSLATE_SENSITIVITY,
            -4.0 * ROOT_TRANSLATE_SENSITIVITY,
            6.0 * ROOT_TRANSLATE_SENSITIVITY
        ]
    );
    assert_eq!(&row[3..], &[0.0; 6]);
}

#[test]
fn axis_mask_filters_displacement() {
    let mut doc = MotionDocument::from_bvh_str(ARM).unwrap();
    let current = pose(&doc);
    let solver = IkSolver::new(SolverSettings {
        mode: MoveMode::Rotate,
        axes: AxisMask {
            x: true,
            y: false,
            z: false,
        },
        ..SolverSettings::default()
    });

    solver
        .apply(&mut doc, &current, &[1], DVec3::new(1.0, 2.0, 3.0))
        .unwrap();
    assert_eq!(&doc.frame(0).unwrap()[6..], &[0.0, 1.0, 0.0]);

    let masked_out = solver
        .apply(&mut doc, &current, &[1], DVec3::new(0.0, 5.0, 5.0))
        .unwrap();
    assert_eq!(masked_out, SolveOutcome::Unchanged);
}

#[test]
fn unreachable_target_is_clamped_to_reach() {
    let mut doc = MotionDocument::from_bvh_str(ARM).unwrap();
    let current = pose(&doc);

    // Far beyond the 20 unit reach: the clamped goal sits straight above the root.
    let outcome = IkSolver::new(damped(0.1))
        .apply(&mut doc, &current, &[1], DVec3::new(0.0, 100.0, 0.0))
        .unwrap();
    assert_eq!(outcome, SolveOutcome::Applied);

    let row = doc.frame(0).unwrap();
    for value in row {
        assert!(value.abs() < 1.0e-6, "unexpected channel change {value}");
    }
}

#[test]
fn selecting_only_the_root_in_ik_mode_changes_nothing() {
    let mut doc = MotionDocument::from_bvh_str(ARM).unwrap();
    let current = pose(&doc);
    let outcome = IkSolver::new(damped(0.1))
        .apply(&mut doc, &current, &[0], DVec3::new(1.0, 0.0, 0.0))
        .unwrap();
    assert_eq!(outcome, SolveOutcome::Unchanged);
}

#[test]
fn null_space_control_keeps_primary_objective() {
    let mut plain = MotionDocument::from_bvh_str(LIMB).unwrap();
    let mut controlled = plain.clone();
    let current = pose(&plain);
    let drag = DVec3::new(0.0, 0.0, 0.5);

    IkSolver::new(damped(0.01))
        .apply(&mut plain, &current, &[2], drag)
        .unwrap();
    let outcome = IkSolver::new(SolverSettings {
        control: true,
        gains: [1.0, 1.0, 1.0],
        ..damped(0.01)
    })
    .apply(&mut controlled, &current, &[2], drag)
    .unwrap();
    assert_eq!(outcome, SolveOutcome::Applied);

    let start = current.effector_position(&plain, 2).unwrap();
    let target = start + drag;
    let plain_foot = pose(&plain).effector_position(&plain, 2).unwrap();
    let controlled_foot = pose(&controlled).effector_position(&controlled, 2).unwrap();
    assert!(controlled_foot.distance(target) < start.distance(target));
    assert!((controlled_foot.distance(target) - plain_foot.distance(target)).abs() < 0.1);
    // The chest is off the dragged chain.
    assert_eq!(&controlled.frame(0).unwrap()[12..], &[0.0; 3]);
}

#[test]
fn rejects_bad_selection_and_stale_pose() {
    let mut doc = MotionDocument::from_bvh_str(ARM).unwrap();
    let current = pose(&doc);
    let solver = IkSolver::default();

    assert!(matches!(
        solver.apply(&mut doc, &current, &[7], DVec3::X),
        Err(Error::InvalidJointIndex { index: 7 })
    ));

    let other = MotionDocument::from_bvh_str(LIMB).unwrap();
    let foreign = pose(&other);
    assert!(matches!(
        solver.apply(&mut doc, &foreign, &[1], DVec3::X),
        Err(Error::PoseMismatch {
            pose: 4,
            document: 2
        })
    ));
}
