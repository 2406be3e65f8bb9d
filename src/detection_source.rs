// src/detection_source.rs
//
// Input side of the pipeline. The tracker itself runs elsewhere; this module
// reads its per-frame output, applies the frame stride, maps boxes back to
// original-frame pixels and turns them into observations.
//
// Record format (one JSON object per line):
//
//   {"frame": 18, "timestamp": 0.6, "detections": [{"id": 7, "bbox": [x1, y1, x2, y2]}]}
//
// `id` is null while the tracker has not assigned one yet; such boxes are
// ignored.
//
// Frames are numbered from 1. A record with frame 0 is skipped.

use crate::error::GateError;
use crate::types::{Observation, SamplingConfig, SourceConfig, TrackId};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Detection {
    #[serde(default)]
    pub id: Option<TrackId>,
    /// Left-top-right-bottom
    pub bbox: [f32; 4],
}

impl Detection {
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        let [x1, y1, x2, y2] = self.bbox;
        ((x1 + x2) / 2.0, (y1 + y2) / 2.0)
    }

    /// Center truncated to whole pixels.
    #[inline]
    pub fn pixel_center(&self) -> (f32, f32) {
        let (cx, cy) = self.center();
        (cx.trunc(), cy.trunc())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FrameDetections {
    #[serde(rename = "frame")]
    pub frame_index: u64,
    #[serde(rename = "timestamp")]
    pub timestamp_secs: f64,
    #[serde(default)]
    pub detections: Vec<Detection>,
    /// Boxes were mapped to original-frame pixels; centers are truncated
    /// the same way.
    #[serde(skip)]
    pub whole_pixels: bool,
}

impl FrameDetections {
    /// Observations for every identified box, in delivery order.
    pub fn observations(&self) -> impl Iterator<Item = Observation> + '_ {
        self.detections.iter().filter_map(move |det| {
            let id = det.id.clone()?;
            let (cx, cy) = if self.whole_pixels {
                det.pixel_center()
            } else {
                det.center()
            };
            Some(Observation {
                track_id: id,
                center_x: cx,
                center_y: cy,
                frame_index: self.frame_index,
                timestamp_secs: self.timestamp_secs,
            })
        })
    }
}

/// Maps boxes from the tracker's input resolution to the original frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameScale {
    pub width_ratio: f32,
    pub height_ratio: f32,
}

impl FrameScale {
    pub fn between(inference: (u32, u32), original: (u32, u32)) -> Self {
        Self {
            width_ratio: original.0 as f32 / inference.0 as f32,
            height_ratio: original.1 as f32 / inference.1 as f32,
        }
    }

    /// Scales and truncates to whole pixels.
    pub fn apply(&self, bbox: [f32; 4]) -> [f32; 4] {
        let [x1, y1, x2, y2] = bbox;
        [
            (x1 * self.width_ratio).trunc(),
            (y1 * self.height_ratio).trunc(),
            (x2 * self.width_ratio).trunc(),
            (y2 * self.height_ratio).trunc(),
        ]
    }
}

pub trait DetectionSource {
    /// Next sampled frame. `None` once the stream is exhausted.
    fn next_frame(&mut self) -> Option<Result<FrameDetections, GateError>>;
}

pub struct JsonLinesSource<R> {
    reader: R,
    label: String,
    line_no: usize,
    sampling: SamplingConfig,
    scale: Option<FrameScale>,
    frames_read: u64,
}

impl JsonLinesSource<BufReader<File>> {
    pub fn open(config: &SourceConfig, sampling: SamplingConfig) -> Result<Self, GateError> {
        let path: &Path = &config.path;
        let file = File::open(path).map_err(|e| GateError::io(path, e))?;

        let scale = match (config.inference_size, config.frame_size) {
            (Some(inference), Some(original)) => {
                Some(FrameScale::between(inference, original))
            }
            _ => None,
        };

        info!(
            "Reading detections from {} (frame_skip={}, rescale={:?})",
            path.display(),
            sampling.frame_skip,
            scale
        );

        Ok(Self::new(BufReader::new(file), sampling, scale).with_label(path.display()))
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R, sampling: SamplingConfig, scale: Option<FrameScale>) -> Self {
        Self {
            reader,
            label: "<reader>".to_string(),
            line_no: 0,
            sampling,
            scale,
            frames_read: 0,
        }
    }

    fn with_label(mut self, label: impl std::fmt::Display) -> Self {
        self.label = label.to_string();
        self
    }

    /// Records parsed so far, sampled or not.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

impl<R: BufRead> DetectionSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> Option<Result<FrameDetections, GateError>> {
        let mut line = String::new();

        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => self.line_no += 1,
                Err(e) => return Some(Err(GateError::io(&self.label, e))),
            }

            if line.trim().is_empty() {
                continue;
            }

            let mut frame: FrameDetections = match serde_json::from_str(&line) {
                Ok(frame) => frame,
                Err(source) => {
                    return Some(Err(GateError::MalformedRecord {
                        line: self.line_no,
                        source,
                    }))
                }
            };
            self.frames_read += 1;

            // Frame indices are 1-based.
            if frame.frame_index == 0 {
                warn!("Ignoring record with frame 0 at line {}", self.line_no);
                continue;
            }

            if !self.sampling.is_sampled(frame.frame_index) {
                continue;
            }

            if let Some(scale) = self.scale {
                for det in &mut frame.detections {
                    det.bbox = scale.apply(det.bbox);
                }
                frame.whole_pixels = true;
            }

            debug!(
                "Frame {} @ {:.2}s: {} detection(s)",
                frame.frame_index,
                frame.timestamp_secs,
                frame.detections.len()
            );
            return Some(Ok(frame));
        }
    }
}
