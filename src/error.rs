use thiserror::Error as ThisError;

use crate::device::DeviceId;
use crate::models::MacAddress;

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
#[error("invalid MAC address: {0:?}")]
pub struct AddressError(pub String);

#[derive(ThisError, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("invalid device entry {entry:?}: {reason}")]
    InvalidDevice { entry: String, reason: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(ThisError, Debug)]
pub enum SinkError {
    #[error("sink rejected {key}: {reason}")]
    Rejected { key: String, reason: String },

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

#[derive(ThisError, Debug)]
pub enum RegistryError {
    #[error("name {key} already belongs to {existing}, rejecting {rejected}")]
    NameCollision {
        key: String,
        existing: MacAddress,
        rejected: MacAddress,
    },

    #[error("device limit of {0} reached")]
    Full(usize),

    #[error("no device for handle {0}")]
    UnknownHandle(DeviceId),

    #[error("failed to register {key}: {source}")]
    Registration {
        key: String,
        #[source]
        source: SinkError,
    },
}

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("timer channel closed")]
    ChannelClosed,

    #[error("no async runtime available for timers")]
    NoRuntime,
}

#[derive(ThisError, Debug)]
pub enum IngestError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}
