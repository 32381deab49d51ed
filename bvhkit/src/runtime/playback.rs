/// Tick length of the interactive viewer's timer, in milliseconds.
pub const DEFAULT_TICK_MS: f64 = 16.0;

/// Slowest speed either direction reaches before `rewind`/`fast_forward` flip direction.
pub const MIN_SPEED: f64 = 0.25;

/// Maps elapsed wall time to a frame index of a looping motion.
#[derive(Clone, Debug, PartialEq)]
pub struct Playback {
    time_ms: f64,
    frame: usize,
    paused: bool,
    speed: f64,
}

impl Default for Playback {
    fn default() -> Self {
        Self {
            time_ms: 0.0,
            frame: 0,
            paused: true,
            speed: 1.0,
        }
    }
}

impl Playback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn time_ms(&self) -> f64 {
        self.time_ms
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn play(&mut self) {
        self.paused = false;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn toggle(&mut self) {
        self.paused = !self.paused;
    }

    /// Sets the speed multiplier; negative values play backwards.
    pub fn set_speed(&mut self, speed: f64) {
        if speed.is_finite() {
            self.speed = speed;
        }
    }

    /// Halves forward speed, or doubles reverse speed. Forward at `MIN_SPEED` flips to reverse.
    pub fn rewind(&mut self) {
        if self.speed == MIN_SPEED {
            self.speed = -MIN_SPEED;
        } else if self.speed > 0.0 {
            self.speed /= 2.0;
        } else if self.speed < 0.0 {
            self.speed *= 2.0;
        }
    }

    /// Doubles forward speed, or halves reverse speed. Reverse at `MIN_SPEED` flips to forward.
    pub fn fast_forward(&mut self) {
        if self.speed == -MIN_SPEED {
            self.speed = MIN_SPEED;
        } else if self.speed > 0.0 {
            self.speed *= 2.0;
        } else if self.speed < 0.0 {
            self.speed /= 2.0;
        }
    }

    /// Rewinds to frame 0, pauses and restores normal speed.
    pub fn stop(&mut self) {
        *self = Self::default();
    }

    /// Advances the clock by `delta_ms * speed` while playing; time before zero wraps back from the
    /// last frame. Returns whether the frame changed.
    pub fn tick(&mut self, delta_ms: f64, interval: f64, num_frames: usize) -> bool {
        if self.paused || interval.is_nan() || interval <= 0.0 || num_frames == 0 {
            return false;
        }
        self.time_ms += delta_ms * self.speed;
        // Tolerance keeps a time set by `sync_time` on its own frame.
        let elapsed = self.time_ms / (interval * 1000.0) + 1e-9;
        let frame = (elapsed.floor() as i64).rem_euclid(num_frames as i64) as usize;
        let changed = frame != self.frame;
        self.frame = frame;
        changed
    }

    pub fn step_forward(&mut self, interval: f64, num_frames: usize) {
        if num_frames == 0 {
            return;
        }
        self.frame = (self.frame + 1) % num_frames;
        self.sync_time(interval);
    }

    pub fn step_backward(&mut self, interval: f64, num_frames: usize) {
        if num_frames == 0 {
            return;
        }
        self.frame = (self.frame + num_frames - 1) % num_frames;
        self.sync_time(interval);
    }

    /// Jumps to `frame`, clamped to the last frame.
    pub fn seek(&mut self, frame: usize, interval: f64, num_frames: usize) {
        if num_frames == 0 {
            return;
        }
        self.frame = frame.min(num_frames - 1);
        self.sync_time(interval);
    }

    fn sync_time(&mut self, interval: f64) {
        self.time_ms = if interval > 0.0 {
            self.frame as f64 * interval * 1000.0
        } else {
            0.0
        };
    }
}
