// Copyright (c) 2023 Mike Tsao. All rights reserved.

use crate::{
    time::{SampleRate, Seconds},
    traits::Configurable,
    types::{Normal, Sample, SignalType},
};
use derivative::Derivative;

pub(crate) trait Delays {
    fn peek_output(&self, apply_decay: bool) -> Sample;
    fn pop_output(&mut self, input: Sample) -> Sample;
}

#[derive(Clone, Debug, Derivative)]
#[derivative(Default)]
pub(crate) struct DelayLine {
    #[derivative(Default(value = "Seconds(0.1)"))]
    delay: Seconds,
    #[derivative(Default(value = "0.1"))]
    decay_factor: SignalType,

    sample_rate: SampleRate,
    buffer_size: usize,
    buffer_pointer: usize,
    buffer: Vec<Sample>,
}
impl Configurable for DelayLine {
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.sample_rate = sample_rate;
        self.resize_buffer();
    }
}
impl DelayLine {
    /// decay_factor: 1.0 = no decay
    pub(super) fn new_with(delay: Seconds, decay_factor: SignalType) -> Self {
        let mut r = Self {
            delay,
            decay_factor,
            ..Default::default()
        };
        r.resize_buffer();
        r
    }

    fn resize_buffer(&mut self) {
        self.buffer_size = self.delay.to_frames(self.sample_rate);
        self.buffer = vec![Sample::SILENCE; self.buffer_size];
        self.buffer_pointer = 0;
    }

    pub(super) fn decay_factor(&self) -> SignalType {
        self.decay_factor
    }
}
impl Delays for DelayLine {
    fn peek_output(&self, apply_decay: bool) -> Sample {
        if self.buffer_size == 0 {
            Sample::SILENCE
        } else if apply_decay {
            self.buffer[self.buffer_pointer] * self.decay_factor()
        } else {
            self.buffer[self.buffer_pointer]
        }
    }

    fn pop_output(&mut self, input: Sample) -> Sample {
        if self.buffer_size == 0 {
            input
        } else {
            let out = self.peek_output(true);
            self.buffer[self.buffer_pointer] = input;
            self.buffer_pointer += 1;
            if self.buffer_pointer >= self.buffer_size {
                self.buffer_pointer = 0;
            }
            out
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct RecirculatingDelayLine {
    delay: DelayLine,
}
impl RecirculatingDelayLine {
    pub(crate) fn new_with(
        delay: Seconds,
        decay: Seconds,
        final_amplitude: Normal,
        peak_amplitude: Normal,
    ) -> Self {
        let decay_factor = if decay.0 > 0.0 {
            (peak_amplitude.0 * final_amplitude.0).powf(delay.0 / decay.0)
        } else {
            0.0
        };
        Self {
            delay: DelayLine::new_with(delay, decay_factor),
        }
    }

    pub(super) fn decay_factor(&self) -> SignalType {
        self.delay.decay_factor()
    }
}
impl Delays for RecirculatingDelayLine {
    fn peek_output(&self, apply_decay: bool) -> Sample {
        self.delay.peek_output(apply_decay)
    }

    fn pop_output(&mut self, input: Sample) -> Sample {
        let output = self.peek_output(true);
        self.delay.pop_output(input + output);
        output
    }
}
impl Configurable for RecirculatingDelayLine {
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.delay.update_sample_rate(sample_rate);
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct AllPassDelayLine {
    delay: RecirculatingDelayLine,
}
impl AllPassDelayLine {
    pub(crate) fn new_with(
        delay: Seconds,
        decay: Seconds,
        final_amplitude: Normal,
        peak_amplitude: Normal,
    ) -> Self {
        Self {
            delay: RecirculatingDelayLine::new_with(delay, decay, final_amplitude, peak_amplitude),
        }
    }
}
impl Delays for AllPassDelayLine {
    // An all-pass line's output depends on its input, so there's nothing
    // meaningful to peek at. Reports the raw buffered value.
    fn peek_output(&self, _apply_decay: bool) -> Sample {
        self.delay.peek_output(false)
    }

    fn pop_output(&mut self, input: Sample) -> Sample {
        let decay_factor = self.delay.decay_factor();
        let vm = self.delay.peek_output(false);
        let vn = input - (vm * decay_factor);
        self.delay.pop_output(vn);
        vm + vn * decay_factor
    }
}
impl Configurable for AllPassDelayLine {
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.delay.update_sample_rate(sample_rate)
    }
}
