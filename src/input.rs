use crate::config::TesterConfig;

/// Raw levels of the four polled input lines, as read off the pins.
///
/// The encoder phases are active high; both buttons pull their line low
/// when pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinLevels {
    pub quad_a: bool,
    pub quad_b: bool,
    pub action_btn: bool,
    pub back_btn: bool,
}

impl Default for PinLevels {
    /// Everything idle: phases low, buttons released (high).
    fn default() -> Self {
        Self {
            quad_a: false,
            quad_b: false,
            action_btn: true,
            back_btn: true,
        }
    }
}

/// Something that can be sampled for the current pin levels.
pub trait PinSource {
    fn sample(&mut self) -> PinLevels;
}

/// Operator input after debouncing and decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Increment,
    Decrement,
    Action,
    Back,
}

/// Level debouncer: reports high only after `threshold` consecutive high
/// samples. Any low sample starts the count again.
#[derive(Debug, Clone)]
pub struct LevelDebounce {
    hold: u32,
    threshold: u32,
}

impl LevelDebounce {
    pub fn new(threshold: u32) -> Self {
        Self { hold: 0, threshold }
    }

    pub fn sample(&mut self, active: bool) -> bool {
        if active {
            self.hold = (self.hold + 1).min(self.threshold);
        } else {
            self.hold = 0;
        }
        self.hold >= self.threshold
    }
}

/// One-shot press detector with a quiet period.
///
/// Fires on the first active sample while idle, then stays deaf until the
/// button has been released for `quiet` consecutive polls. Holding the
/// button never repeats.
#[derive(Debug, Clone)]
pub struct ButtonDebounce {
    hold: u32,
    quiet: u32,
}

impl ButtonDebounce {
    pub fn new(quiet: u32) -> Self {
        Self { hold: 0, quiet }
    }

    pub fn sample(&mut self, active: bool) -> bool {
        if active {
            if self.hold == 0 {
                self.hold = self.quiet;
                return true;
            }
        } else if self.hold > 0 {
            self.hold -= 1;
        }
        false
    }
}

/// Quarter-step direction for `(previous << 2) | current`.
#[rustfmt::skip]
const QUAD_TABLE: [i8; 16] = [
     0,  1, -1,  0,
    -1,  0,  0,  1,
     1,  0,  0, -1,
     0, -1,  1,  0,
];

/// Turns a stream of 2-bit phase states into detent steps.
#[derive(Debug, Clone)]
pub struct QuadratureDecoder {
    previous: u8,
    acc: i8,
    threshold: i8,
}

impl QuadratureDecoder {
    pub fn new(threshold: i8) -> Self {
        Self {
            previous: 0,
            acc: 0,
            threshold,
        }
    }

    /// Feed the current state (`a | b << 1`). Returns an event when the
    /// accumulated quarter-steps reach the threshold either way; any excess
    /// is thrown away with the rest of the accumulator.
    pub fn step(&mut self, state: u8) -> Option<InputEvent> {
        let state = state & 3;
        if state == self.previous {
            return None;
        }
        let delta = QUAD_TABLE[((self.previous << 2) | state) as usize];
        self.previous = state;
        self.acc = self.acc.saturating_add(delta);

        if self.acc >= self.threshold {
            self.acc = 0;
            Some(InputEvent::Increment)
        } else if self.acc <= -self.threshold {
            self.acc = 0;
            Some(InputEvent::Decrement)
        } else {
            None
        }
    }

    pub fn accumulator(&self) -> i8 {
        self.acc
    }
}

/// Debounces and decodes all four lines. Call [`InputDecoder::poll`] once per
/// interactive loop iteration.
#[derive(Debug, Clone)]
pub struct InputDecoder {
    quad_a: LevelDebounce,
    quad_b: LevelDebounce,
    wheel: QuadratureDecoder,
    action: ButtonDebounce,
    back: ButtonDebounce,
}

impl InputDecoder {
    pub fn new(config: &TesterConfig) -> Self {
        Self {
            quad_a: LevelDebounce::new(config.encoder_debounce),
            quad_b: LevelDebounce::new(config.encoder_debounce),
            wheel: QuadratureDecoder::new(config.wheel_threshold),
            action: ButtonDebounce::new(config.button_quiet),
            back: ButtonDebounce::new(config.button_quiet),
        }
    }

    /// Process one sample. Events are reported wheel first, then action,
    /// then back.
    pub fn poll(&mut self, levels: PinLevels, mut on_event: impl FnMut(InputEvent)) {
        let a = self.quad_a.sample(levels.quad_a) as u8;
        let b = self.quad_b.sample(levels.quad_b) as u8;
        if let Some(ev) = self.wheel.step(a | (b << 1)) {
            on_event(ev);
        }
        if self.action.sample(!levels.action_btn) {
            on_event(InputEvent::Action);
        }
        if self.back.sample(!levels.back_btn) {
            on_event(InputEvent::Back);
        }
    }
}
