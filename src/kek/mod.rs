//! Scraper and in-memory model for the KEK media-ownership data
//! ("Kommission zur Ermittlung der Konzentration im Medienbereich").
//!
//! The data comes from the undocumented JSON API behind
//! `medienvielfaltsmonitor.de/api/v1/` and is mirrored into a cache directory.

mod archive;
mod client;
mod object;
mod pattern;
mod store;

pub use archive::{parse_filters, Collection, Kek, OwnerShare, TreeDirection};
pub use client::{ApiClient, CachingMode};
pub use object::{EntityKind, KekObject, Relation};
pub(crate) use object::is_truthy;
pub use pattern::Pattern;
pub use store::{ObjectSource, ObjectStore};
pub(crate) use store::check_squuid;

#[cfg(test)]
pub(crate) use archive::tests::sample_kek;
