// SPDX-License-Identifier: GPL-3.0-or-later
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context as _;
use structopt::StructOpt;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use tc_thermal::acquisition::{AcquisitionLoop, DisplayStats, FrameSink};
use tc_thermal::camera::{negotiate_capture, CaptureBackend as _};
use tc_thermal::decode::FrameTemperatureStats;
use tc_thermal::frame::SplitFrame;
use tc_thermal::settings::{Args, Settings};

/// Reports decoded frames, either as JSON lines or as periodic log messages.
struct ReportSink<W> {
    json: bool,
    log_every: usize,
    count: usize,
    out: W,
}

impl<W: Write> ReportSink<W> {
    fn new(json: bool, log_every: usize, out: W) -> Self {
        Self {
            json,
            log_every: log_every.max(1),
            count: 0,
            out,
        }
    }
}

impl<W: Write> FrameSink for ReportSink<W> {
    fn frame(
        &mut self,
        _split: &SplitFrame,
        _stats: &FrameTemperatureStats,
        shown: &DisplayStats,
    ) -> anyhow::Result<()> {
        self.count += 1;
        if self.json {
            serde_json::to_writer(&mut self.out, shown).context("Unable to serialize frame stats")?;
            writeln!(self.out).context("Unable to write frame stats")?;
        } else if (self.count - 1) % self.log_every == 0 {
            info!(
                center = shown.center,
                average = shown.average,
                minimum = shown.minimum,
                maximum = shown.maximum,
                min_at = ?shown.minimum_position,
                max_at = ?shown.maximum_position,
                "Temperatures (°{})",
                shown.unit
            );
        }
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::from_args();
    let settings = Settings::load(&args)?;
    let descriptor = settings
        .device
        .descriptor()
        .context("Invalid device configuration")?;
    info!(
        device = %descriptor.name,
        index = descriptor.index,
        width = descriptor.width,
        height = descriptor.height,
        "Using thermal camera"
    );

    let candidates = settings.capture.create_backends()?;
    debug!(
        backends = ?candidates.iter().map(|b| b.id()).collect::<Vec<_>>(),
        "Capture backends to try"
    );
    let session = negotiate_capture(&candidates, descriptor.index, &descriptor)?;

    let quit = Arc::new(AtomicBool::new(false));
    let handler_quit = Arc::clone(&quit);
    ctrlc::set_handler(move || {
        handler_quit.store(true, Ordering::SeqCst);
    })
    .context("Unable to install Ctrl-C handler")?;

    let stdout = io::stdout();
    let mut sink = ReportSink::new(
        settings.display.json,
        descriptor.frame_rate as usize,
        stdout.lock(),
    );
    let acquisition = AcquisitionLoop::new(
        session,
        descriptor,
        settings.display.unit,
        settings.display.label_threshold,
    );
    acquisition.run(&mut sink, &quit)?;
    Ok(())
}
