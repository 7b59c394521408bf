//! goods-monitor - Multi-site hobby goods listing monitor
//!
//! Watches storefront listing pages for new merchandise, scrapes each
//! product's detail page through a per-site adapter, and produces a
//! normalized payload with a content signature for downstream publishing.

pub mod domain;
pub mod application;
pub mod infrastructure;
