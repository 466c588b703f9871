//! cpal streams around the shared [`AudioGraph`].
//!
//! The output callback renders the graph under the same lock the UI thread
//! takes for every topology edit, so a pull never observes half a re-patch.
//! It uses `try_lock` and plays silence for the block when the UI holds the
//! lock. The microphone callback never touches the graph: it downmixes into
//! a bounded channel that a `Stream` node drains.

use std::fmt;
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use pedalboard_core::{AudioContext, AudioGraph, AudioNodeId, NodeSpec};

use crate::error::{AppError, Result};

/// The audio graph shared between the UI thread and the output callback.
pub type SharedGraph = Arc<Mutex<AudioGraph>>;

/// Microphone channel capacity in samples (about a third of a second at 48 kHz).
const INPUT_CHANNEL_CAPACITY: usize = 16384;

/// Device and buffer choices from the command line and settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOptions {
    /// Output device name substring; `None` picks the default device.
    pub output_device: Option<String>,
    /// Input device name substring; `None` picks the default device.
    pub input_device: Option<String>,
    /// Sample rate used when the device reports no default configuration.
    pub sample_rate: u32,
    /// Fixed buffer size in frames.
    pub buffer_size: u32,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            output_device: None,
            input_device: None,
            sample_rate: 48000,
            buffer_size: 512,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

fn device_name(device: &cpal::Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Case-insensitive substring match; `search` must already be lowercase.
fn matches_name(name: &str, search: &str) -> bool {
    name.to_lowercase().contains(search)
}

/// Find a cpal device by name substring, or return the default.
fn find_device(host: &cpal::Host, direction: Direction, name: Option<&str>) -> Result<cpal::Device> {
    let Some(search) = name else {
        let device = match direction {
            Direction::Input => host.default_input_device(),
            Direction::Output => host.default_output_device(),
        };
        return device.ok_or(AppError::NoDevice);
    };

    let search_lower = search.to_lowercase();
    let devices: Vec<cpal::Device> = match direction {
        Direction::Input => host
            .input_devices()
            .map_err(|e| AppError::Stream(e.to_string()))?
            .collect(),
        Direction::Output => host
            .output_devices()
            .map_err(|e| AppError::Stream(e.to_string()))?
            .collect(),
    };

    devices
        .into_iter()
        .find(|device| device_name(device).is_ok_and(|n| matches_name(&n, &search_lower)))
        .ok_or_else(|| {
            AppError::DeviceNotFound(format!("no {direction} device matching '{search}'"))
        })
}

/// Names of every input device on the default host.
pub fn input_device_names() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| AppError::Stream(e.to_string()))?;
    Ok(devices.filter_map(|d| device_name(&d).ok()).collect())
}

/// Renders one interleaved output block from `graph`.
///
/// The graph is mono; every channel of a frame gets the same sample.
/// `mono` is scratch space reused across calls.
pub fn fill_output(graph: &Mutex<AudioGraph>, mono: &mut Vec<f32>, data: &mut [f32], channels: usize) {
    let channels = channels.max(1);
    let Some(mut graph) = graph.try_lock() else {
        data.fill(0.0);
        return;
    };
    mono.resize(data.len() / channels, 0.0);
    graph.render(mono);
    drop(graph);

    for (frame, &sample) in data.chunks_mut(channels).zip(mono.iter()) {
        frame.fill(sample);
    }
}

/// Averages each interleaved frame and queues it. Returns how many frames
/// were dropped because the channel was full.
pub fn downmix(data: &[f32], channels: usize, tx: &Sender<f32>) -> usize {
    let channels = channels.max(1);
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .filter(|&sample| tx.try_send(sample).is_err())
        .count()
}

/// The running output stream.
pub struct AudioOutput {
    stream: cpal::Stream,
    device: String,
    sample_rate: u32,
    paused: bool,
}

impl AudioOutput {
    /// Opens the output device, creates the graph at the device's rate and
    /// starts pulling it.
    pub fn open(options: &StreamOptions) -> Result<(Self, SharedGraph)> {
        let host = cpal::default_host();
        tracing::info!(host = host.id().name(), "cpal backend initialized");
        let device = find_device(&host, Direction::Output, options.output_device.as_deref())?;
        let name = device_name(&device).unwrap_or_else(|_| "unknown".to_string());

        let (channels, sample_rate) = match device.default_output_config() {
            Ok(config) => (config.channels(), config.sample_rate()),
            Err(_) => (2, options.sample_rate),
        };
        let config = cpal::StreamConfig {
            channels,
            sample_rate,
            buffer_size: cpal::BufferSize::Fixed(options.buffer_size),
        };

        let graph: SharedGraph = Arc::new(Mutex::new(AudioGraph::new(f64::from(sample_rate))));
        let render_graph = Arc::clone(&graph);
        let mut mono = Vec::with_capacity(options.buffer_size as usize);
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    fill_output(&render_graph, &mut mono, data, usize::from(channels));
                },
                |err| tracing::error!(error = %err, "output stream error"),
                None,
            )
            .map_err(|e| AppError::Stream(format!("failed to build output stream: {e}")))?;
        stream
            .play()
            .map_err(|e| AppError::Stream(format!("failed to start output stream: {e}")))?;

        tracing::info!(device = %name, channels, sample_rate, buffer_size = options.buffer_size, "output stream started");
        Ok((
            Self {
                stream,
                device: name,
                sample_rate,
                paused: false,
            },
            graph,
        ))
    }

    /// Output device name.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Negotiated sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns `true` while the stream is suspended.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Suspends or resumes the stream.
    pub fn set_paused(&mut self, paused: bool) -> Result<()> {
        if paused {
            self.stream
                .pause()
                .map_err(|e| AppError::Stream(e.to_string()))?;
        } else {
            self.stream
                .play()
                .map_err(|e| AppError::Stream(e.to_string()))?;
        }
        self.paused = paused;
        tracing::info!(paused, "output stream toggled");
        Ok(())
    }
}

/// A running microphone stream and the graph node it feeds.
pub struct MicrophoneInput {
    _stream: cpal::Stream,
    node: AudioNodeId,
}

impl MicrophoneInput {
    /// Opens an input device (by name substring, or the default) and adds a
    /// `Stream` node for it to `graph`.
    pub fn open(graph: &SharedGraph, name: Option<&str>, buffer_size: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = find_device(&host, Direction::Input, name)?;
        let device_label = device_name(&device).unwrap_or_else(|_| "unknown".to_string());

        let channels = match device.default_input_config() {
            Ok(config) => config.channels(),
            Err(_) => 1,
        };
        let sample_rate = graph.lock().sample_rate() as u32;
        let config = cpal::StreamConfig {
            channels,
            sample_rate,
            buffer_size: cpal::BufferSize::Fixed(buffer_size),
        };

        let (tx, rx) = crossbeam_channel::bounded::<f32>(INPUT_CHANNEL_CAPACITY);
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    downmix(data, usize::from(channels), &tx);
                },
                |err| tracing::error!(error = %err, "input stream error"),
                None,
            )
            .map_err(|e| AppError::Stream(format!("failed to build input stream: {e}")))?;
        stream
            .play()
            .map_err(|e| AppError::Stream(format!("failed to start input stream: {e}")))?;

        let node = graph.lock().create_node(NodeSpec::Stream(rx))?;
        tracing::info!(device = %device_label, channels, sample_rate, %node, "input stream started");
        Ok(Self {
            _stream: stream,
            node,
        })
    }

    /// The `Stream` node carrying the microphone signal.
    pub fn node(&self) -> AudioNodeId {
        self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pedalboard_core::Waveform;

    #[test]
    fn name_match_is_case_insensitive_substring() {
        assert!(matches_name("USB Audio CODEC", "usb"));
        assert!(matches_name("USB Audio CODEC", "audio codec"));
        assert!(!matches_name("Built-in Microphone", "usb"));
    }

    #[test]
    fn output_fans_mono_out_to_every_channel() {
        let mut graph = AudioGraph::new(48000.0);
        let osc = graph
            .create_node(NodeSpec::Oscillator {
                waveform: Waveform::Square,
                frequency: 100.0,
            })
            .unwrap();
        let out = graph.create_node(NodeSpec::Destination).unwrap();
        graph.connect(osc, out).unwrap();
        let graph = Mutex::new(graph);

        let mut mono = Vec::new();
        let mut data = vec![0.5f32; 8];
        fill_output(&graph, &mut mono, &mut data, 2);
        assert_eq!(mono.len(), 4);
        assert_eq!(data, vec![1.0; 8]);
    }

    #[test]
    fn contended_lock_plays_silence() {
        let graph = Mutex::new(AudioGraph::new(48000.0));
        let _held = graph.lock();
        let mut data = vec![0.5f32; 6];
        fill_output(&graph, &mut Vec::new(), &mut data, 3);
        assert_eq!(data, vec![0.0; 6]);
    }

    #[test]
    fn downmix_averages_frames_and_counts_overflow() {
        let (tx, rx) = crossbeam_channel::bounded(2);
        let dropped = downmix(&[1.0, 0.0, 0.5, 0.5, -1.0, -1.0], 2, &tx);
        assert_eq!(dropped, 1);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![0.5, 0.5]);
    }

    #[test]
    fn microphone_samples_reach_the_graph() {
        let (tx, rx) = crossbeam_channel::bounded(16);
        let mut graph = AudioGraph::new(48000.0);
        let mic = graph.create_node(NodeSpec::Stream(rx)).unwrap();
        let out = graph.create_node(NodeSpec::Destination).unwrap();
        graph.connect(mic, out).unwrap();

        downmix(&[0.25, 0.25, 0.75, 0.75], 2, &tx);
        let mut block = vec![0.0f32; 3];
        graph.render(&mut block);
        assert_eq!(block, vec![0.25, 0.75, 0.0]);
    }
}
