pub mod commands;
pub mod frame;
pub mod response;

pub use commands::Command;
pub use frame::{FrameBody, build_command_frame, build_frame, is_ack, parse_frame, parse_response};
pub use response::{FirmwareVersion, PassiveTarget, parse_firmware_version, parse_passive_target};
