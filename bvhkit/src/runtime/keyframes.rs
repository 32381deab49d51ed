use crate::{Error, MotionDocument};

impl MotionDocument {
    /// Records `frame` as a keyframe. Marking the same frame twice has no effect.
    pub fn set_keyframe(&mut self, frame: usize) -> Result<(), Error> {
        self.check_frame(frame)?;
        if !self.keyframes.contains(&frame) {
            self.keyframes.push(frame);
        }
        Ok(())
    }

    pub fn clear_keyframes(&mut self) {
        self.keyframes.clear();
    }

    /// Inserts `count` copies of row `frame` right after it.
    ///
    /// Keyframes after `frame` move with their rows; `frame` and `frame + count` become keyframes
    /// so a following [`lerp_keyframes`](Self::lerp_keyframes) blends across the new span.
    pub fn insert_frames(&mut self, frame: usize, count: usize) -> Result<(), Error> {
        self.check_frame(frame)?;
        if count == 0 {
            return self.set_keyframe(frame);
        }
        let width = self.channels.len();
        let frames = self
            .num_frames
            .checked_add(count)
            .ok_or_else(|| Error::InvalidValue {
                message: format!("cannot insert {count} frame(s) after {} frame(s)", self.num_frames),
            })?;

        let split = (frame + 1) * width;
        let held = self.motion[frame * width..split].to_vec();
        let mut motion = Vec::with_capacity(frames * width);
        motion.extend_from_slice(&self.motion[..split]);
        for _ in 0..count {
            motion.extend_from_slice(&held);
        }
        motion.extend_from_slice(&self.motion[split..]);

        self.motion = motion;
        self.num_frames = frames;
        for key in &mut self.keyframes {
            if *key > frame {
                *key += count;
            }
        }
        self.set_keyframe(frame)?;
        self.set_keyframe(frame + count)?;

        log::debug!("inserted {count} frame(s) after frame {frame}, now {frames} frame(s)");
        Ok(())
    }

    /// Linearly blends every channel between consecutive keyframes.
    ///
    /// For keyframes `a < b`, frame `i` in `[a, b)` gets `(1 - t)·m[a] + t·m[b]` with
    /// `t = (i - a) / (b - a)`. Frames before the first or after the last keyframe are left alone.
    /// Angles are blended as plain numbers, so a pair like 179 and -179 sweeps through zero.
    pub fn lerp_keyframes(&mut self) {
        self.keyframes.sort_unstable();
        self.keyframes.dedup();
        let num_frames = self.num_frames;
        self.keyframes.retain(|&k| k < num_frames);

        let width = self.channels.len();
        if width == 0 {
            return;
        }
        for pair in self.keyframes.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let start = self.motion[a * width..(a + 1) * width].to_vec();
            let end = self.motion[b * width..(b + 1) * width].to_vec();
            let span = (b - a) as f64;

            for i in a..b {
                let t = (i - a) as f64 / span;
                let row = &mut self.motion[i * width..(i + 1) * width];
                for ((value, from), to) in row.iter_mut().zip(&start).zip(&end) {
                    *value = (1.0 - t) * from + t * to;
                }
            }
        }
    }
}
