/// Status sink writing one JSON object per line
use log::{debug, info};
use serde::Serialize;
use std::io::Write;

use crate::device::DeviceId;
use crate::error::SinkError;
use crate::models::{Capabilities, StatusReport};
use crate::publish::StatusSink;
use crate::utils::now_timestamp;

#[derive(Serialize)]
struct Line<'a, T: Serialize> {
    ts: String,
    object: &'a str,
    #[serde(flatten)]
    body: T,
}

#[derive(Serialize)]
struct Registration<'a> {
    register: &'a Capabilities,
}

#[derive(Serialize)]
struct Status<'a> {
    status: &'a StatusReport,
}

/// Writes registrations and status updates as JSON lines to any writer
///
/// ```text
/// {"ts":"2024-03-01T12:30:05Z","object":"atc_kitchen","status":{"temperature":21.34}}
/// ```
pub struct JsonLineSink<W: Write> {
    out: W,
    published: u64,
}

impl<W: Write> JsonLineSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, published: 0 }
    }

    pub fn published(&self) -> u64 {
        self.published
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line<T: Serialize>(&mut self, object: &str, body: T) -> Result<(), SinkError> {
        let line = Line {
            ts: now_timestamp(),
            object,
            body,
        };
        serde_json::to_writer(&mut self.out, &line)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> StatusSink for JsonLineSink<W> {
    fn register_device(
        &mut self,
        key: &str,
        device: DeviceId,
        capabilities: &Capabilities,
    ) -> Result<(), SinkError> {
        info!("Registering {} ({}) with {:?}", key, device, capabilities);
        self.write_line(
            key,
            Registration {
                register: capabilities,
            },
        )
    }

    fn publish(
        &mut self,
        key: &str,
        device: DeviceId,
        status: &StatusReport,
    ) -> Result<(), SinkError> {
        debug!("Publishing {} ({}): {:?}", key, device, status);
        self.write_line(key, Status { status })?;
        self.published += 1;
        Ok(())
    }
}
