pub mod file;
pub mod provider;

pub use file::load_payload_file;
pub use provider::{HttpPayloadSource, PayloadSource};
