//! Normalization of antimicrobial resistance detection reports
//!
//! Tool reports go in through [`adapter::open`], come out as canonical
//! [`record::Record`]s, and are written with the serializers in [`output`].
//! [`aggregate::merge`] combines already-normalized reports.

pub mod adapter;
pub mod aggregate;
pub mod config;
pub mod error;
pub mod graph;
pub mod metadata;
pub mod output;
pub mod record;
pub mod tools;

pub use error::{HamronizeError, Result};
pub use metadata::MetadataContext;
pub use record::{Record, RecordBuilder};
pub use tools::Tool;
