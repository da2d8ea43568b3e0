//! State of a single import run
//!
//! Everything a run accumulates lives in [`ImportRun`]: the record store and
//! graph while files are ingested, then the revision links and result sets
//! while vertices are materialized. The run is consumed by
//! [`ImportRun::materialize`], so nothing survives into the next one.

use crate::core::error::Result;
use crate::core::types::Uuid;
use crate::events::EntitySet;
use crate::graph::{sort, GraphBuilder, Record};
use crate::import::materializer::{Disposition, Materializer};
use crate::import::revision::RevisionLinkTable;
use crate::storage::EntityStorage;
use tracing::{debug, info};

/// What a run did
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportOutcome {
    /// Module whose content was imported
    pub module: String,
    /// Entities created, in materialization order
    pub created: EntitySet,
    /// Entities updated in place, in materialization order
    pub updated: EntitySet,
    /// Vertices that produced no write
    pub skipped: usize,
    /// Every vertex UUID, in the order it was visited
    pub order: Vec<Uuid>,
}

impl ImportOutcome {
    /// Outcome of a run that found nothing to import
    pub fn empty(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Self::default()
        }
    }

    /// Whether the run wrote anything
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty()
    }
}

/// Per-run state, from the first ingested file to the last save
#[derive(Debug)]
pub struct ImportRun {
    module: String,
    builder: GraphBuilder,
    links: RevisionLinkTable,
}

impl ImportRun {
    /// Start a run for `module`
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            builder: GraphBuilder::new(),
            links: RevisionLinkTable::new(),
        }
    }

    /// Add a decoded record to the graph
    pub fn ingest(&mut self, record: Record) -> Result<()> {
        self.builder.ingest(record).map(|_| ())
    }

    /// Number of records ingested
    pub fn len(&self) -> usize {
        self.builder.records().len()
    }

    /// Whether no record was ingested
    pub fn is_empty(&self) -> bool {
        self.builder.records().is_empty()
    }

    /// Sort the graph and materialize every vertex in order
    pub fn materialize<S: EntityStorage + ?Sized>(
        self,
        materializer: &Materializer<'_, S>,
    ) -> Result<ImportOutcome> {
        let Self {
            module,
            builder,
            mut links,
        } = self;
        let (mut records, graph) = builder.into_parts();

        let sorted = sort(&graph, |uuid| records.weight(uuid));
        info!(
            module = %module,
            records = records.len(),
            vertices = graph.len(),
            edges = graph.edge_count(),
            "materializing"
        );

        let mut outcome = ImportOutcome::empty(module);
        for vertex in sorted {
            outcome.order.push(vertex.uuid);
            let record = records.take(&vertex.uuid);
            match materializer.materialize(record.as_ref(), &mut links)? {
                Disposition::Created(entity) => outcome.created.insert(entity),
                Disposition::Updated(entity) => outcome.updated.insert(entity),
                Disposition::Skipped(reason) => {
                    debug!(uuid = %vertex.uuid, ?reason, "skipped");
                    outcome.skipped += 1;
                }
            }
        }

        Ok(outcome)
    }
}
