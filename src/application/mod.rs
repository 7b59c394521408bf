//! Application layer - change detection and the monitoring pipeline
//!
//! Pure detection logic plus the orchestration that wires fetching,
//! extraction, payload building and publishing together.

pub mod change_detection;
pub mod payload_builder;
pub mod publish;
pub mod runner;

pub use change_detection::{detect_new, ChangeSet};
pub use payload_builder::build_payload;
pub use publish::{DiscordNotifier, ImageMirror, JsonlSink, MirrorCache, NoopMirror, Notifier, PayloadSink};
pub use runner::{Runner, SiteSummary};
