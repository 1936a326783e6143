// Copyright (c) 2024 Mike Tsao. All rights reserved.

use super::traits::ProvidesService;
use crate::{
    time::SampleRate,
    types::{ChannelPair, SampleType, StereoSample},
};
use core::fmt::Debug;
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    BufferSize, FromSample, Sample as CpalSample, SizedSample, Stream, StreamConfig,
    SupportedStreamConfig,
};
use crossbeam::queue::ArrayQueue;
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;

/// A ring buffer of stereo samples that the audio stream consumes.
#[derive(Debug)]
struct AudioQueue(Arc<ArrayQueue<StereoSample>>);
impl AudioQueue {
    fn new(buffer_size: usize) -> Self {
        Self(Arc::new(ArrayQueue::new(buffer_size.max(1))))
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn capacity(&self) -> usize {
        self.0.capacity()
    }

    fn pop(&self) -> Option<StereoSample> {
        self.0.pop()
    }

    fn force_push(&self, frame: StereoSample) -> Option<StereoSample> {
        self.0.force_push(frame)
    }
}
impl Clone for AudioQueue {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

/// An [AudioServiceInput] tells [AudioService] what to do.
#[derive(Debug)]
pub enum AudioServiceInput {
    /// Exit the service
    Quit,
    /// These audio frames should be made available to the audio interface.
    /// They're added to [AudioService]'s internal ring buffer and consumed as
    /// needed.
    Frames(Arc<Vec<StereoSample>>),
}

/// [AudioServiceEvent]s inform clients what's going on.
#[derive(Debug)]
pub enum AudioServiceEvent {
    /// The service has initialized. Provides the device's sample rate and
    /// channel count.
    Reset(SampleRate, u8),
    /// The audio interface needs audio frames ASAP. Provide the specified
    /// number with [AudioServiceInput::Frames].
    FramesNeeded(usize),
    /// Sent when the audio interface asked for more frames than we had
    /// available in the ring buffer.
    Underrun,
}

/// Wrapper for cpal structs that implements [core::fmt::Debug].
struct WrappedStream {
    // Dropping the stream stops playback.
    #[allow(dead_code)]
    cpal_stream: Stream,
    queue: AudioQueue,
    sample_rate: SampleRate,
    channel_count: u8,
}
impl Debug for WrappedStream {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WrappedStream")
            .field("cpal_stream", &"(skipped)")
            .field("queue", &self.queue)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}
impl WrappedStream {
    fn new_with(period_size: usize, sender: &Sender<AudioServiceEvent>) -> anyhow::Result<Self> {
        let (device, config) = Self::device_setup()?;

        // Three periods of slack, so the hardware can drain one while the
        // session renders another.
        let queue = AudioQueue::new(period_size * 3);
        let cpal_stream = Self::stream_setup_for(&device, &config, period_size, &queue, sender)?;
        cpal_stream.play()?;
        Ok(Self {
            cpal_stream,
            queue,
            sample_rate: SampleRate::new(config.sample_rate().0 as usize),
            channel_count: config.channels() as u8,
        })
    }

    /// The default output device and its preferred config.
    fn device_setup() -> anyhow::Result<(cpal::Device, SupportedStreamConfig)> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow::Error::msg("default output device is not available"))?;
        let config = device.default_output_config()?;
        log::info!(
            "audio output: {} at {} Hz",
            device.name().unwrap_or_else(|_| "(unnamed)".to_string()),
            config.sample_rate().0
        );
        Ok((device, config))
    }

    fn stream_setup_for(
        device: &cpal::Device,
        config: &SupportedStreamConfig,
        period_size: usize,
        queue: &AudioQueue,
        sender: &Sender<AudioServiceEvent>,
    ) -> anyhow::Result<Stream> {
        let sample_format = config.sample_format();
        let mut config: StreamConfig = config.clone().into();
        config.buffer_size = BufferSize::Fixed(period_size as u32);

        match sample_format {
            cpal::SampleFormat::I16 => {
                Self::stream_make::<i16>(&config, device, period_size, queue, sender)
            }
            cpal::SampleFormat::I32 => {
                Self::stream_make::<i32>(&config, device, period_size, queue, sender)
            }
            cpal::SampleFormat::U16 => {
                Self::stream_make::<u16>(&config, device, period_size, queue, sender)
            }
            cpal::SampleFormat::F32 => {
                Self::stream_make::<f32>(&config, device, period_size, queue, sender)
            }
            cpal::SampleFormat::F64 => {
                Self::stream_make::<f64>(&config, device, period_size, queue, sender)
            }
            other => Err(anyhow::anyhow!("unsupported output sample format {other}")),
        }
    }

    fn stream_make<T>(
        config: &StreamConfig,
        device: &cpal::Device,
        period_size: usize,
        queue: &AudioQueue,
        sender: &Sender<AudioServiceEvent>,
    ) -> anyhow::Result<Stream>
    where
        T: SizedSample + FromSample<SampleType>,
    {
        let err_fn = |err| log::error!("audio output stream error: {err}");

        let queue = queue.clone();
        let sender = sender.clone();
        let channel_count = config.channels as usize;
        let stream = device.build_output_stream(
            config,
            move |output: &mut [T], _: &cpal::OutputCallbackInfo| {
                Self::on_window(output, channel_count, period_size, &queue, &sender)
            },
            err_fn,
            None,
        )?;
        Ok(stream)
    }

    /// Supplies the device from the queue, then asks for enough frames to keep
    /// the queue comfortably ahead.
    fn on_window<T>(
        output: &mut [T],
        channel_count: usize,
        period_size: usize,
        queue: &AudioQueue,
        sender: &Sender<AudioServiceEvent>,
    ) where
        T: CpalSample + FromSample<SampleType>,
    {
        let have_len = queue.len();
        let need_len = output.len() / channel_count.max(1);

        let request_len = if have_len < need_len {
            need_len * 2
        } else if have_len > need_len * 2 {
            need_len / 2
        } else {
            need_len
        }
        .min(period_size);

        let mut is_underrun = false;
        for frame in output.chunks_exact_mut(channel_count.max(1)) {
            if let Some(sample) = queue.pop() {
                frame[0] = T::from_sample(sample.0 .0);
                if channel_count > 1 {
                    frame[1] = T::from_sample(sample.1 .0);
                }
            } else {
                frame.fill(T::EQUILIBRIUM);
                is_underrun = true;
            }
        }
        if is_underrun {
            let _ = sender.try_send(AudioServiceEvent::Underrun);
        }

        let request_len = (queue.capacity() - queue.len()).min(request_len);
        let _ = sender.try_send(AudioServiceEvent::FramesNeeded(request_len));
    }
}

/// Channel-based access to the default audio output device. Failing to open
/// the device is an error the caller has to deal with; nothing can be heard
/// without it.
#[derive(Debug)]
pub struct AudioService {
    inputs: ChannelPair<AudioServiceInput>,
    events: ChannelPair<AudioServiceEvent>,
    stream: WrappedStream,
}
impl ProvidesService<AudioServiceInput, AudioServiceEvent> for AudioService {
    fn receiver(&self) -> &Receiver<AudioServiceEvent> {
        &self.events.receiver
    }

    fn sender(&self) -> &Sender<AudioServiceInput> {
        &self.inputs.sender
    }
}
impl AudioService {
    /// This value is on the upper edge of perceptible latency for 44.1KHz (512
    /// / 44100 = 11.6 milliseconds).
    pub const SUGGESTED_PERIOD_SIZE: usize = 512;

    /// Opens the default output device with room for `period_size` frames per
    /// callback.
    pub fn new_with(period_size: usize) -> anyhow::Result<Self> {
        let events: ChannelPair<AudioServiceEvent> = Default::default();
        let stream = WrappedStream::new_with(period_size, &events.sender)?;
        let r = Self {
            inputs: Default::default(),
            events,
            stream,
        };
        let _ = r.events.sender.send(AudioServiceEvent::Reset(
            r.stream.sample_rate,
            r.stream.channel_count,
        ));
        r.start_thread();
        Ok(r)
    }

    /// The device's sample rate. Render at this rate.
    pub fn sample_rate(&self) -> SampleRate {
        self.stream.sample_rate
    }

    fn start_thread(&self) {
        let receiver = self.inputs.receiver.clone();
        let queue = self.stream.queue.clone();
        std::thread::spawn(move || {
            while let Ok(input) = receiver.recv() {
                match input {
                    AudioServiceInput::Quit => {
                        log::debug!("audio service quitting");
                        break;
                    }
                    AudioServiceInput::Frames(frames) => {
                        for frame in frames.iter() {
                            if queue.force_push(*frame).is_some() {
                                log::warn!("audio buffer overrun");
                            }
                        }
                    }
                }
            }
        });
    }
}
