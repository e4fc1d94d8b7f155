pub mod render;
pub mod sink;

pub use render::{capabilities, status_report};
pub use sink::JsonLineSink;

use crate::device::DeviceId;
use crate::error::SinkError;
use crate::models::{Capabilities, StatusReport};

/// Receiver of device registrations and rate-limited status updates
///
/// Calls are made from the engine's single control flow and must return
/// promptly; any asynchrony is the implementor's concern.
pub trait StatusSink {
    /// Called once per newly discovered device, before its first publish
    fn register_device(
        &mut self,
        key: &str,
        device: DeviceId,
        capabilities: &Capabilities,
    ) -> Result<(), SinkError>;

    fn publish(&mut self, key: &str, device: DeviceId, status: &StatusReport)
        -> Result<(), SinkError>;
}
