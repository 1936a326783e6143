// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Oscillators and envelopes, the raw material of synthesized voices.

use crate::{
    time::{SampleRate, Seconds},
    traits::prelude::*,
    types::{BipolarNormal, FrequencyHz, Normal, Ratio},
};
use derivative::Derivative;
use kahan::KahanSum;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use strum_macros::{Display, EnumIter, IntoStaticStr};

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    EnumIter,
    Eq,
    PartialEq,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[serde(rename = "waveform", rename_all = "kebab-case")]
#[allow(missing_docs)]
pub enum Waveform {
    None,
    #[default]
    Sine,
    Square,
    Triangle,
    Sawtooth,
    Noise,
}

/// A band-unlimited oscillator. Good enough for a toy.
#[derive(Debug)]
pub struct Oscillator {
    waveform: Waveform,

    /// Hertz. Any positive number. 440 = A4
    frequency: FrequencyHz,

    /// Multiplies `frequency`. Pitch sweeps and detune come through here.
    frequency_tune: Ratio,

    /// working variables to generate semi-deterministic noise.
    noise_x1: u32,
    noise_x2: u32,

    sample_rate: SampleRate,

    signal: BipolarNormal,

    // The "cursor" in the current waveform. The frequency can change over
    // time, so recalculating the position as if the current frequency were
    // always the frequency would click.
    //
    // Needs Kahan summation algorithm to avoid accumulation of FP errors.
    cycle_position: KahanSum<f64>,

    delta: f64,
    delta_updated: bool,
}
impl Default for Oscillator {
    fn default() -> Self {
        Self {
            waveform: Default::default(),
            frequency: FrequencyHz(440.0),
            frequency_tune: Default::default(),
            noise_x1: 0x70f4f854,
            noise_x2: 0xe1e9f0a7,
            sample_rate: Default::default(),
            signal: Default::default(),
            cycle_position: Default::default(),
            delta: Default::default(),
            delta_updated: Default::default(),
        }
    }
}
impl Generates<BipolarNormal> for Oscillator {
    fn value(&self) -> BipolarNormal {
        self.signal
    }
}
impl Configurable for Oscillator {
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.sample_rate = sample_rate;
        self.delta_updated = false;
    }
}
impl Ticks for Oscillator {
    fn tick(&mut self, tick_count: usize) {
        for _ in 0..tick_count {
            self.update_delta();
            let cycle_position = self.cycle_position.sum();
            let amplitude = self.amplitude_for_position(self.waveform, cycle_position);
            self.signal = BipolarNormal::from(amplitude);

            self.cycle_position += self.delta;
            if self.cycle_position.sum() >= 1.0 {
                self.cycle_position = KahanSum::new_with_value(self.cycle_position.sum().fract());
            }
        }
    }
}
#[allow(missing_docs)]
impl Oscillator {
    pub fn new_with_waveform_and_frequency(waveform: Waveform, frequency: FrequencyHz) -> Self {
        Self {
            waveform,
            frequency,
            ..Default::default()
        }
    }

    fn adjusted_frequency(&self) -> FrequencyHz {
        self.frequency * self.frequency_tune
    }

    fn update_delta(&mut self) {
        if !self.delta_updated {
            let sample_rate = self.sample_rate.value().max(1) as f64;
            self.delta = self.adjusted_frequency().0 / sample_rate;

            // This resets the accumulated error.
            self.cycle_position = KahanSum::new_with_value(self.cycle_position.sum());

            self.delta_updated = true;
        }
    }

    /// Restarts the waveform from the beginning of its cycle.
    pub fn reset(&mut self) {
        self.cycle_position = KahanSum::new();
        self.delta_updated = false;
    }

    // Some of these have seemingly arbitrary phase-shift constants in their
    // formulas. They ensure every waveform starts at amplitude zero, which
    // avoids transients when a note starts.
    fn amplitude_for_position(&mut self, waveform: Waveform, cycle_position: f64) -> f64 {
        match waveform {
            Waveform::None => 0.0,
            Waveform::Sine => (cycle_position * 2.0 * PI).sin(),
            Waveform::Square => -(cycle_position - 0.5).signum(),
            Waveform::Triangle => {
                4.0 * (cycle_position - (0.5 + cycle_position).floor()).abs() - 1.0
            }
            Waveform::Sawtooth => 2.0 * (cycle_position - (0.5 + cycle_position).floor()),
            Waveform::Noise => {
                // https://www.musicdsp.org/en/latest/Synthesis/216-fast-whitenoise-generator.html
                self.noise_x1 ^= self.noise_x2;
                let tmp = 2.0 * (self.noise_x2 as f64 - (u32::MAX as f64 / 2.0)) / u32::MAX as f64;
                (self.noise_x2, _) = self.noise_x2.overflowing_add(self.noise_x1);
                tmp
            }
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    pub fn frequency(&self) -> FrequencyHz {
        self.frequency
    }

    pub fn set_frequency(&mut self, frequency: FrequencyHz) {
        self.frequency = frequency;
        self.delta_updated = false;
    }

    pub fn frequency_tune(&self) -> Ratio {
        self.frequency_tune
    }

    pub fn set_frequency_tune(&mut self, frequency_tune: Ratio) {
        self.frequency_tune = frequency_tune;
        self.delta_updated = false;
    }
}

/// Attack/decay/sustain/release shape.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default, rename_all = "kebab-case")]
pub struct EnvelopeParams {
    #[derivative(Default(value = "Seconds(0.01)"))]
    pub attack: Seconds,
    #[derivative(Default(value = "Seconds(0.2)"))]
    pub decay: Seconds,
    #[derivative(Default(value = "Normal::new_const(0.5)"))]
    pub sustain: Normal,
    #[derivative(Default(value = "Seconds(0.2)"))]
    pub release: Seconds,
}
impl EnvelopeParams {
    #[allow(missing_docs)]
    pub fn new_with(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        Self {
            attack: Seconds(attack),
            decay: Seconds(decay),
            sustain: Normal::from(sustain),
            release: Seconds(release),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum EnvelopeState {
    #[default]
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// A linear ADSR envelope generator.
#[derive(Debug, Default)]
pub struct Envelope {
    params: EnvelopeParams,
    sample_rate: SampleRate,
    state: EnvelopeState,
    amplitude: f64,
    step: f64,
}
impl Envelope {
    #[allow(missing_docs)]
    pub fn new_with(params: EnvelopeParams) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    fn frames(&self, seconds: Seconds) -> usize {
        seconds.to_frames(self.sample_rate)
    }

    fn enter_decay(&mut self) {
        self.amplitude = 1.0;
        let sustain = self.params.sustain.value();
        let frames = self.frames(self.params.decay);
        if frames == 0 {
            self.amplitude = sustain;
            self.state = EnvelopeState::Sustain;
        } else {
            self.step = (1.0 - sustain) / frames as f64;
            self.state = EnvelopeState::Decay;
        }
    }

    #[allow(missing_docs)]
    pub fn params(&self) -> &EnvelopeParams {
        &self.params
    }
}
impl Generates<Normal> for Envelope {
    fn value(&self) -> Normal {
        Normal::from(self.amplitude)
    }
}
impl Configurable for Envelope {
    fn update_sample_rate(&mut self, sample_rate: SampleRate) {
        self.sample_rate = sample_rate;
    }
}
impl Ticks for Envelope {
    fn tick(&mut self, tick_count: usize) {
        for _ in 0..tick_count {
            match self.state {
                EnvelopeState::Idle | EnvelopeState::Sustain => {}
                EnvelopeState::Attack => {
                    self.amplitude += self.step;
                    if self.amplitude >= 1.0 {
                        self.enter_decay();
                    }
                }
                EnvelopeState::Decay => {
                    self.amplitude -= self.step;
                    if self.amplitude <= self.params.sustain.value() {
                        self.amplitude = self.params.sustain.value();
                        self.state = EnvelopeState::Sustain;
                    }
                }
                EnvelopeState::Release => {
                    self.amplitude -= self.step;
                    if self.amplitude <= 0.0 {
                        self.amplitude = 0.0;
                        self.state = EnvelopeState::Idle;
                    }
                }
            }
        }
    }
}
impl GeneratesEnvelope for Envelope {
    fn trigger_attack(&mut self) {
        let frames = self.frames(self.params.attack);
        if frames == 0 {
            self.enter_decay();
        } else {
            // Retriggering starts from the current amplitude so there's no
            // discontinuity.
            self.step = (1.0 - self.amplitude) / frames as f64;
            self.state = EnvelopeState::Attack;
        }
    }

    fn trigger_release(&mut self) {
        if self.state == EnvelopeState::Idle {
            return;
        }
        let frames = self.frames(self.params.release);
        if frames == 0 || self.amplitude <= 0.0 {
            self.amplitude = 0.0;
            self.state = EnvelopeState::Idle;
        } else {
            self.step = self.amplitude / frames as f64;
            self.state = EnvelopeState::Release;
        }
    }

    fn is_idle(&self) -> bool {
        self.state == EnvelopeState::Idle
    }
}
