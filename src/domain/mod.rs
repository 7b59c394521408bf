//! Domain module - Core entities of the monitoring pipeline
//!
//! Contains the listing/state entities, the raw per-site field set and
//! the canonical publishing payload.

pub mod listing;
pub mod payload;
pub mod raw_fields;

pub use listing::{ListingItem, SiteState};
pub use payload::CanonicalPayload;
pub use raw_fields::RawFields;
