use crate::{Error, MotionDocument};

const STRIP: &str = r"HIERARCHY
ROOT Hips
{
	OFFSET 0 0 0
	CHANNELS 3 Xposition Yposition Zrotation
	End Site
	{
		OFFSET 0 1 0
	}
}
MOTION
Frames: 4
Frame Time: 0.1
0 0 0
1 10 100
2 20 200
3 30 300
";

fn strip() -> MotionDocument {
    MotionDocument::from_bvh_str(STRIP).unwrap()
}

fn rows(doc: &MotionDocument) -> Vec<Vec<f64>> {
    (0..doc.num_frames())
        .map(|f| doc.frame(f).unwrap().to_vec())
        .collect()
}

#[test]
fn set_keyframe_is_idempotent() {
    let mut doc = strip();
    doc.set_keyframe(2).unwrap();
    doc.set_keyframe(0).unwrap();
    doc.set_keyframe(2).unwrap();
    assert_eq!(doc.keyframes(), [2, 0]);

    assert!(matches!(
        doc.set_keyframe(4),
        Err(Error::FrameOutOfRange {
            frame: 4,
            frames: 4
        })
    ));
}

#[test]
fn insert_frames_holds_the_pose() {
    let mut doc = strip();
    doc.insert_frames(1, 2).unwrap();

    assert_eq!(doc.num_frames(), 6);
    assert_eq!(doc.motion().len(), 6 * 3);
    assert_eq!(
        rows(&doc),
        [
            vec![0.0, 0.0, 0.0],
            vec![1.0, 10.0, 100.0],
            vec![1.0, 10.0, 100.0],
            vec![1.0, 10.0, 100.0],
            vec![2.0, 20.0, 200.0],
            vec![3.0, 30.0, 300.0],
        ]
    );
    assert_eq!(doc.keyframes(), [1, 3]);
}

#[test]
fn insert_frames_shifts_later_keyframes() {
    let mut doc = strip();
    doc.set_keyframe(0).unwrap();
    doc.set_keyframe(3).unwrap();
    doc.insert_frames(1, 5).unwrap();

    let mut keys = doc.keyframes().to_vec();
    keys.sort_unstable();
    assert_eq!(keys, [0, 1, 6, 8]);
    assert_eq!(doc.frame(8).unwrap(), [3.0, 30.0, 300.0]);
}

#[test]
fn insert_after_last_frame_appends() {
    let mut doc = strip();
    doc.insert_frames(3, 1).unwrap();
    assert_eq!(doc.num_frames(), 5);
    assert_eq!(doc.frame(4).unwrap(), [3.0, 30.0, 300.0]);
    assert!(doc.insert_frames(5, 1).is_err());
}

#[test]
fn lerp_hits_keyframes_exactly() {
    let mut doc = strip();
    doc.frame_mut(3).unwrap().copy_from_slice(&[9.0, -90.0, 30.0]);
    doc.set_keyframe(3).unwrap();
    doc.set_keyframe(0).unwrap();
    doc.lerp_keyframes();

    assert_eq!(doc.keyframes(), [0, 3]);
    assert_eq!(doc.frame(0).unwrap(), [0.0, 0.0, 0.0]);
    assert_eq!(doc.frame(1).unwrap(), [3.0, -30.0, 10.0]);
    assert_eq!(doc.frame(2).unwrap(), [6.0, -60.0, 20.0]);
    assert_eq!(doc.frame(3).unwrap(), [9.0, -90.0, 30.0]);
}

#[test]
fn insert_then_lerp_blends_new_span() {
    let mut doc = strip();
    // Frames 1..=5 hold row 1; the blend runs from row 1 to the shifted row 2.
    doc.insert_frames(1, 4).unwrap();
    doc.set_keyframe(5).unwrap();
    doc.set_keyframe(6).unwrap();
    doc.lerp_keyframes();

    assert_eq!(doc.keyframes(), [1, 5, 6]);
    assert_eq!(doc.frame(5).unwrap(), [1.0, 10.0, 100.0]);
    assert_eq!(doc.frame(6).unwrap(), [2.0, 20.0, 200.0]);
}

#[test]
fn lerp_leaves_frames_outside_keyframes() {
    let mut doc = strip();
    doc.set_keyframe(1).unwrap();
    doc.set_keyframe(2).unwrap();
    let before = rows(&doc);
    doc.lerp_keyframes();
    assert_eq!(rows(&doc), before);
}

#[test]
fn lerp_does_not_unwrap_angles() {
    let text = STRIP.replace("0 0 0\n1 10 100", "0 0 170\n1 10 100");
    let mut doc = MotionDocument::from_bvh_str(&text).unwrap();
    doc.frame_mut(2).unwrap()[2] = -170.0;
    doc.set_keyframe(0).unwrap();
    doc.set_keyframe(2).unwrap();
    doc.lerp_keyframes();
    assert_eq!(doc.value(1, 2), Some(0.0));
}
