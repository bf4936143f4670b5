pub mod audio;
pub mod config;
pub mod error;
pub mod kernel;
pub mod services;

// Re-export the pieces a host needs to wire a conversation together
pub use audio::{AudioSink, LogSink, PlaybackQueue};
pub use config::ClientConfig;
pub use kernel::driver::{ConversationDriver, DriverEvent};
pub use kernel::segment::Segment;
pub use services::api::{ApiClient, ScamApi};
