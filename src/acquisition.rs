// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::camera::CaptureSession;
use crate::decode::{FrameTemperatureStats, TemperatureDecoder};
use crate::device::DeviceDescriptor;
use crate::frame::{FrameSplitter, SplitFrame};
use crate::temperature::{convert_delta_for_display, convert_for_display, TemperatureUnit};

/// Decoded temperatures, converted to the unit they're shown in.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisplayStats {
    pub unit: TemperatureUnit,
    pub center: f64,
    pub average: f64,
    pub minimum: f64,
    pub maximum: f64,

    /// How far the extremes must be from the average before they get a label.
    pub label_threshold: f64,

    /// `(row, col)` of the coldest pixel in the thermal plane.
    pub minimum_position: (usize, usize),

    /// `(row, col)` of the hottest pixel in the thermal plane.
    pub maximum_position: (usize, usize),
}

impl DisplayStats {
    pub fn new(stats: &FrameTemperatureStats, unit: TemperatureUnit, label_threshold: f64) -> Self {
        Self {
            unit,
            center: convert_for_display(stats.center.celsius, unit),
            average: convert_for_display(stats.average.celsius, unit),
            minimum: convert_for_display(stats.minimum.celsius(), unit),
            maximum: convert_for_display(stats.maximum.celsius(), unit),
            label_threshold: convert_delta_for_display(label_threshold, unit),
            minimum_position: stats.minimum.position(),
            maximum_position: stats.maximum.position(),
        }
    }

    pub fn show_minimum_label(&self) -> bool {
        self.minimum < self.average - self.label_threshold
    }

    pub fn show_maximum_label(&self) -> bool {
        self.maximum > self.average + self.label_threshold
    }
}

/// Receives the results of every successfully decoded frame.
///
/// Rendering, recording and anything else that wants the frames lives behind this.
pub trait FrameSink {
    fn frame(
        &mut self,
        split: &SplitFrame,
        stats: &FrameTemperatureStats,
        shown: &DisplayStats,
    ) -> anyhow::Result<()>;
}

/// What happened during a single read-decode cycle.
#[derive(Clone, Debug, PartialEq)]
pub enum Cycle {
    Decoded(DisplayStats),
    Skipped,
    EndOfStream,
}

/// Counts of what the loop did, for logging once it stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub decoded: usize,
    pub skipped: usize,
}

/// Reads frames from a capture session, decodes them, and hands them to a sink.
pub struct AcquisitionLoop {
    session: CaptureSession,
    splitter: FrameSplitter,
    decoder: TemperatureDecoder,
    unit: TemperatureUnit,
    label_threshold: f64,
    read_warned: bool,
}

impl AcquisitionLoop {
    pub fn new(
        session: CaptureSession,
        descriptor: DeviceDescriptor,
        unit: TemperatureUnit,
        label_threshold: f64,
    ) -> Self {
        Self {
            session,
            splitter: FrameSplitter::new(descriptor.clone()),
            decoder: TemperatureDecoder::new(descriptor),
            unit,
            label_threshold,
            read_warned: false,
        }
    }

    /// Switch to the next display unit, returning it.
    pub fn cycle_unit(&mut self) -> TemperatureUnit {
        self.unit = self.unit.next();
        debug!(unit = %self.unit, "Changed display unit");
        self.unit
    }

    pub fn decoder(&self) -> &TemperatureDecoder {
        &self.decoder
    }

    /// Read one frame and decode it. Only failures from `sink` are returned as errors.
    pub fn step(&mut self, sink: &mut dyn FrameSink) -> anyhow::Result<Cycle> {
        let raw = match self.session.read_frame() {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(Cycle::EndOfStream),
            Err(err) => {
                if self.read_warned {
                    debug!("Unable to read frame: {}", err);
                } else {
                    warn!("Unable to read frame: {}", err);
                    self.read_warned = true;
                }
                return Ok(Cycle::Skipped);
            }
        };
        let split = match self.splitter.split(&raw) {
            Ok(split) => split,
            Err(_) => return Ok(Cycle::Skipped),
        };
        let stats = self.decoder.decode_stats(split.thermal());
        let display = DisplayStats::new(&stats, self.unit, self.label_threshold);
        trace!(?stats, "Decoded frame");
        sink.frame(&split, &stats, &display)?;
        Ok(Cycle::Decoded(display))
    }

    /// Run until `quit` is set or the stream ends. The capture session is released on return.
    pub fn run(mut self, sink: &mut dyn FrameSink, quit: &AtomicBool) -> anyhow::Result<RunSummary> {
        info!(backend = self.session.backend(), "Starting acquisition");
        let mut summary = RunSummary::default();
        while !quit.load(Ordering::SeqCst) {
            match self.step(sink)? {
                Cycle::Decoded(_) => summary.decoded += 1,
                Cycle::Skipped => summary.skipped += 1,
                Cycle::EndOfStream => {
                    info!("Capture stream ended");
                    break;
                }
            }
        }
        info!(
            decoded = summary.decoded,
            skipped = summary.skipped,
            "Stopped acquisition"
        );
        Ok(summary)
    }
}
