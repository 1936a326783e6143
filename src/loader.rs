// Copyright (c) 2023 Mike Tsao. All rights reserved.

//! Recorded loops. The session asks a [SampleLibrary] whether a sound has a
//! usable recording; [SampleBank] is the WAV-backed implementation.

use crate::{
    catalog::{SampleRefs, SoundDefinition},
    instruments::{SampleBuffer, Variation},
    time::{SampleRate, Seconds},
    types::{Sample, StereoSample},
};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

/// Why a recording couldn't be used.
#[derive(Debug, Error)]
pub enum SampleLoadError {
    #[allow(missing_docs)]
    #[error("can't read {path}: {source}")]
    Wav {
        path: PathBuf,
        source: hound::Error,
    },
    #[allow(missing_docs)]
    #[error("{path} has {channels} channels; only mono and stereo are supported")]
    UnsupportedChannels { path: PathBuf, channels: u16 },
    #[allow(missing_docs)]
    #[error("{0} contains no audio")]
    Empty(PathBuf),
}

/// Where recorded loops come from.
pub trait SampleLibrary: Send + std::fmt::Debug {
    /// Whether a usable recording exists for the named sound.
    fn has_sample(&self, name: &str) -> bool;

    /// Whether loading has finished. Until it has, nothing should be played
    /// from the library.
    fn is_loaded(&self) -> bool;

    /// The decoded audio for one take of the named sound.
    fn buffer(&self, name: &str, variation: Variation) -> Option<Arc<SampleBuffer>>;

    /// The loop start, and the loop end if the recording specifies one.
    fn loop_points(&self, name: &str) -> Option<(Seconds, Option<Seconds>)>;
}

#[derive(Debug)]
struct BankEntry {
    primary: Arc<SampleBuffer>,
    alternate: Option<Arc<SampleBuffer>>,
    loop_start: Seconds,
    loop_end: Option<Seconds>,
}

/// An in-memory [SampleLibrary]. Each recording is loaded at most once; one
/// that fails stays unavailable for the rest of the session.
#[derive(Debug)]
pub struct SampleBank {
    entries: HashMap<String, BankEntry>,
    failed: Vec<String>,
    is_loaded: bool,
}
impl Default for SampleBank {
    fn default() -> Self {
        Self {
            entries: Default::default(),
            failed: Default::default(),
            is_loaded: true,
        }
    }
}
impl SampleLibrary for SampleBank {
    fn has_sample(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    fn is_loaded(&self) -> bool {
        self.is_loaded
    }

    fn buffer(&self, name: &str, variation: Variation) -> Option<Arc<SampleBuffer>> {
        let entry = self.entries.get(name)?;
        match variation {
            Variation::A => Some(Arc::clone(&entry.primary)),
            Variation::B => entry.alternate.as_ref().map(Arc::clone),
        }
    }

    fn loop_points(&self, name: &str) -> Option<(Seconds, Option<Seconds>)> {
        self.entries
            .get(name)
            .map(|e| (e.loop_start, e.loop_end))
    }
}
impl SampleBank {
    /// Loads the recordings of every sound that has them, resolving relative
    /// paths against `base_dir`. Failures are logged, and the affected sound
    /// falls back to synthesis.
    pub fn load<'a>(
        sounds: impl IntoIterator<Item = &'a SoundDefinition>,
        base_dir: &Path,
    ) -> Self {
        let mut r = Self {
            is_loaded: false,
            ..Default::default()
        };
        for sound in sounds {
            let Some(refs) = sound.samples() else {
                continue;
            };
            match Self::load_refs(refs, base_dir) {
                Ok((primary, alternate)) => {
                    log::info!("loaded sample for '{}'", sound.name());
                    r.insert(
                        sound.name(),
                        primary,
                        alternate,
                        refs.loop_start,
                        refs.loop_end,
                    );
                }
                Err(e) => {
                    log::warn!("'{}' will be synthesized: {e}", sound.name());
                    r.failed.push(sound.name().to_string());
                }
            }
        }
        r.is_loaded = true;
        r
    }

    fn load_refs(
        refs: &SampleRefs,
        base_dir: &Path,
    ) -> Result<(SampleBuffer, Option<SampleBuffer>), SampleLoadError> {
        let primary = Self::read_wav(&base_dir.join(&refs.primary))?;

        // A broken alternate only costs the B variation.
        let alternate = match refs.alternate.as_ref() {
            Some(path) => match Self::read_wav(&base_dir.join(path)) {
                Ok(buffer) => Some(buffer),
                Err(e) => {
                    log::warn!("ignoring alternate take: {e}");
                    None
                }
            },
            None => None,
        };
        Ok((primary, alternate))
    }

    /// Adds a decoded recording. Replaces anything already stored under the
    /// name.
    pub fn insert(
        &mut self,
        name: &str,
        primary: SampleBuffer,
        alternate: Option<SampleBuffer>,
        loop_start: Seconds,
        loop_end: Option<Seconds>,
    ) {
        self.failed.retain(|n| n != name);
        self.entries.insert(
            name.to_string(),
            BankEntry {
                primary: Arc::new(primary),
                alternate: alternate.map(Arc::new),
                loop_start,
                loop_end,
            },
        );
    }

    /// Names of sounds whose recordings couldn't be loaded.
    pub fn failed(&self) -> &[String] {
        &self.failed
    }

    /// Decodes a WAV file. Integer and float encodings are both accepted; mono
    /// is copied to both channels.
    pub fn read_wav(path: &Path) -> Result<SampleBuffer, SampleLoadError> {
        let wav_error = |source| SampleLoadError::Wav {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = hound::WavReader::open(path).map_err(wav_error)?;
        let spec = reader.spec();
        if !(1..=2).contains(&spec.channels) {
            return Err(SampleLoadError::UnsupportedChannels {
                path: path.to_path_buf(),
                channels: spec.channels,
            });
        }

        let values: Vec<f64> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .map(|s| s.map(|s| s as f64))
                .collect::<Result<_, _>>()
                .map_err(wav_error)?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f64;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|s| s as f64 / scale))
                    .collect::<Result<_, _>>()
                    .map_err(wav_error)?
            }
        };

        let frames: Vec<StereoSample> = values
            .chunks_exact(spec.channels as usize)
            .map(|frame| match frame {
                [left, right] => StereoSample(Sample(*left), Sample(*right)),
                [mono, ..] => StereoSample::from(*mono),
                [] => StereoSample::SILENCE,
            })
            .collect();
        if frames.is_empty() {
            return Err(SampleLoadError::Empty(path.to_path_buf()));
        }
        Ok(SampleBuffer::new_with(
            frames,
            SampleRate::new(spec.sample_rate as usize),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Category, SoundDefinitionBuilder};
    use float_cmp::approx_eq;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("wrenchbox-{}-{name}", std::process::id()))
    }

    fn write_wav(path: &Path, channels: u16, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            for c in 0..channels {
                let value = if c == 0 { i16::MAX / 2 } else { i16::MIN / 2 };
                writer.write_sample(if i % 2 == 0 { value } else { 0 }).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn empty_bank_is_loaded_and_has_nothing() {
        let bank = SampleBank::default();
        assert!(bank.is_loaded());
        assert!(!bank.has_sample("kick"));
        assert!(bank.buffer("kick", Variation::A).is_none());
        assert!(bank.loop_points("kick").is_none());
    }

    #[test]
    fn reads_stereo_and_mono() {
        let stereo = temp_path("stereo.wav");
        write_wav(&stereo, 2, 8000);
        let buffer = SampleBank::read_wav(&stereo).unwrap();
        assert_eq!(buffer.len(), 8000);
        assert_eq!(buffer.sample_rate(), SampleRate::new(8000));
        assert!(approx_eq!(f64, buffer.duration().0, 1.0));
        assert!(approx_eq!(f64, buffer.frames()[0].0 .0, 0.5, epsilon = 0.001));
        assert!(approx_eq!(f64, buffer.frames()[0].1 .0, -0.5, epsilon = 0.001));

        let mono = temp_path("mono.wav");
        write_wav(&mono, 1, 100);
        let buffer = SampleBank::read_wav(&mono).unwrap();
        assert_eq!(buffer.len(), 100);
        assert_eq!(buffer.frames()[0].0, buffer.frames()[0].1);

        let _ = std::fs::remove_file(stereo);
        let _ = std::fs::remove_file(mono);
    }

    #[test]
    fn load_skips_failures() {
        let good = temp_path("good.wav");
        write_wav(&good, 2, 800);
        let sounds = [
            SoundDefinitionBuilder::default()
                .name("good")
                .category(Category::Beats)
                .samples(SampleRefs {
                    primary: good.clone(),
                    alternate: Some(PathBuf::from("no-such-alternate.wav")),
                    loop_start: Seconds(0.0),
                    loop_end: Some(Seconds(0.1)),
                })
                .build()
                .unwrap(),
            SoundDefinitionBuilder::default()
                .name("bad")
                .samples(SampleRefs {
                    primary: PathBuf::from("no-such-file.wav"),
                    ..Default::default()
                })
                .build()
                .unwrap(),
            SoundDefinitionBuilder::default()
                .name("synth-only")
                .build()
                .unwrap(),
        ];
        let bank = SampleBank::load(sounds.iter(), &std::env::temp_dir());
        assert!(bank.is_loaded());
        assert!(bank.has_sample("good"));
        assert!(!bank.has_sample("bad"));
        assert!(!bank.has_sample("synth-only"));
        assert_eq!(bank.failed(), &["bad".to_string()]);
        assert!(bank.buffer("good", Variation::A).is_some());
        assert!(
            bank.buffer("good", Variation::B).is_none(),
            "a missing alternate doesn't sink the primary"
        );
        assert_eq!(
            bank.loop_points("good"),
            Some((Seconds(0.0), Some(Seconds(0.1))))
        );

        let _ = std::fs::remove_file(good);
    }

    #[test]
    fn insert_makes_a_sample_available() {
        let mut bank = SampleBank::default();
        bank.insert(
            "pad",
            SampleBuffer::new_with(vec![StereoSample::SILENCE; 10], SampleRate::DEFAULT),
            Some(SampleBuffer::new_with(vec![StereoSample::MAX; 10], SampleRate::DEFAULT)),
            Seconds(0.0),
            None,
        );
        assert!(bank.has_sample("pad"));
        assert_eq!(
            bank.buffer("pad", Variation::B).unwrap().frames()[0],
            StereoSample::MAX
        );
    }
}
