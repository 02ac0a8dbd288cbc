use std::fs::File;
use std::path::Path;
use std::time::Duration;

use csv::Writer;
use umbra_core::{AgentStats, FrameReport, FrameStatus, TrailStats};

/// Everything measured for one sampled frame
pub struct FrameSample<'a> {
    pub report: &'a FrameReport,
    pub mean_luminance: f32,
    pub trail: Option<TrailStats>,
    pub agents: Option<&'a AgentStats>,
    pub frame_time: Duration,
}

/// Metrics writer for CSV output and performance logging
pub struct MetricsWriter {
    csv_writer: Writer<File>,
    rows: u32,
    retained: u32,
}

impl MetricsWriter {
    pub fn new(output_dir: &Path) -> Result<Self, anyhow::Error> {
        let csv_path = output_dir.join("metrics.csv");
        let file = File::create(&csv_path)?;

        let mut csv_writer = Writer::from_writer(file);
        csv_writer.write_record([
            "frame",
            "mode",
            "status",
            "objects",
            "shapes",
            "agents",
            "mean_luminance",
            "trail_energy",
            "trail_max",
            "trail_covered",
            "mean_x",
            "mean_y",
            "heading_spread",
            "non_finite",
            "dt",
            "wall_time_ms",
            "fps_proxy",
        ])?;

        Ok(Self {
            csv_writer,
            rows: 0,
            retained: 0,
        })
    }

    /// Append one row; slime-only columns stay empty in other modes
    pub fn write_frame(&mut self, sample: &FrameSample) -> Result<(), anyhow::Error> {
        let report = sample.report;
        if report.status == FrameStatus::Retained {
            self.retained += 1;
        }

        let wall_time_ms = sample.frame_time.as_secs_f64() * 1000.0;
        let fps_proxy = if wall_time_ms > 0.0 { 1000.0 / wall_time_ms } else { 0.0 };

        let optional = |value: Option<String>| value.unwrap_or_default();
        let trail = sample.trail.as_ref();
        let agents = sample.agents;

        self.csv_writer.write_record(&[
            report.frame.to_string(),
            format!("{:?}", report.mode).to_lowercase(),
            format!("{:?}", report.status).to_lowercase(),
            report.objects.to_string(),
            report.shapes.to_string(),
            report.agents.to_string(),
            sample.mean_luminance.to_string(),
            optional(trail.map(|t| t.total_energy.to_string())),
            optional(trail.map(|t| t.max_energy.to_string())),
            optional(trail.map(|t| t.covered.to_string())),
            optional(agents.map(|a| a.mean_position[0].to_string())),
            optional(agents.map(|a| a.mean_position[1].to_string())),
            optional(agents.map(|a| a.heading_spread.to_string())),
            optional(agents.map(|a| a.non_finite.to_string())),
            report.elapsed.to_string(),
            format!("{:.3}", wall_time_ms),
            format!("{:.1}", fps_proxy),
        ])?;

        self.csv_writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Sampled frames that kept the previous image
    pub fn retained(&self) -> u32 {
        self.retained
    }
}
