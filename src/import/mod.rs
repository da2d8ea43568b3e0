//! The import engine
//!
//! A run is ingest, sort, materialize, announce. [`Importer`] drives it,
//! [`ImportRun`] holds its state, and [`Materializer`] writes one vertex at a
//! time while the [`RevisionLinkTable`] keeps later references pointing at the
//! revisions this run produced.

pub mod importer;
pub mod materializer;
pub mod revision;
pub mod run;

pub use importer::{Importer, ImporterBuilder};
pub use materializer::{Disposition, Materializer, SkipReason};
pub use revision::RevisionLinkTable;
pub use run::{ImportOutcome, ImportRun};
