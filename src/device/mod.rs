pub mod identity;
pub mod merge;
pub mod registry;
pub mod state;

pub use identity::resolve_key;
pub use merge::MergeOutcome;
pub use registry::{DeviceId, NewDevice, Registry};
pub use state::DeviceState;
