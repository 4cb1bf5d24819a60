//! Recorded detector output.
//!
//! A trace captures what a detector reported for each frame of a session,
//! so the gate can be replayed offline without a camera or model.
//!
//! # Formats
//!
//! - `*.json` - human-editable JSON
//! - anything else - bincode
//! - either of the above with a trailing `.bz2` - bzip2-compressed
//!
//! ```ignore
//! let trace = DetectionTrace::load("session.json.bz2")?;
//! let detector = trace.into_detector();
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use bzip2::Compression;
use serde::{Deserialize, Serialize};

use crate::detector::{ScriptedDetector, ScriptedFrame};
use crate::error::Result;
use crate::types::Detection;

/// Detector output for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Milliseconds since the stream started.
    pub at_ms: u64,
    pub detections: Vec<Detection>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionTrace {
    pub entries: Vec<TraceEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Bincode,
}

/// Work out the encoding and compression from a file name.
fn classify(path: &Path) -> (Format, bool) {
    let compressed = path.extension().is_some_and(|ext| ext == "bz2");
    let inner = if compressed {
        path.file_stem().map(Path::new).and_then(Path::extension)
    } else {
        path.extension()
    };
    let format = if inner.is_some_and(|ext| ext == "json") {
        Format::Json
    } else {
        Format::Bincode
    };
    (format, compressed)
}

impl DetectionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the detector output for the frame at `at`.
    pub fn record(&mut self, at: Duration, detections: Vec<Detection>) {
        self.entries.push(TraceEntry {
            at_ms: at.as_millis() as u64,
            detections,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = Duration> + '_ {
        self.entries
            .iter()
            .map(|entry| Duration::from_millis(entry.at_ms))
    }

    /// Replay the trace, one entry per submitted frame.
    pub fn into_detector(self) -> ScriptedDetector {
        ScriptedDetector::new(
            self.entries
                .into_iter()
                .map(|entry| ScriptedFrame::Faces(entry.detections)),
        )
    }

    /// Load a trace, choosing the format from the file name.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let (format, compressed) = classify(path);
        let reader = BufReader::new(File::open(path)?);

        if compressed {
            Self::from_reader(BzDecoder::new(reader), format)
        } else {
            Self::from_reader(reader, format)
        }
    }

    /// Save a trace, choosing the format from the file name.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let (format, compressed) = classify(path);
        let writer = BufWriter::new(File::create(path)?);

        if compressed {
            let mut encoder = BzEncoder::new(writer, Compression::default());
            self.to_writer(&mut encoder, format)?;
            encoder.finish()?.flush()?;
        } else {
            let mut writer = writer;
            self.to_writer(&mut writer, format)?;
            writer.flush()?;
        }
        Ok(())
    }

    fn from_reader<R: Read>(mut reader: R, format: Format) -> Result<Self> {
        let trace = match format {
            Format::Json => serde_json::from_reader(reader)?,
            Format::Bincode => {
                let mut bytes = Vec::new();
                reader.read_to_end(&mut bytes)?;
                bincode::deserialize(&bytes)?
            }
        };
        Ok(trace)
    }

    fn to_writer<W: Write>(&self, writer: &mut W, format: Format) -> Result<()> {
        match format {
            Format::Json => serde_json::to_writer_pretty(&mut *writer, self)?,
            Format::Bincode => {
                let bytes = bincode::serialize(self)?;
                writer.write_all(&bytes)?;
            }
        }
        Ok(())
    }
}
