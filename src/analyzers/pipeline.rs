//! Ordered composition of enrichment stages.
//!
//! A [`Pipeline`] is checked against the table's columns before any stage
//! runs, so a missing input fails the whole table up front instead of after
//! some stages have already been applied.

use std::collections::BTreeSet;
use tracing::debug;

use crate::analyzers::stages::Stage;
use crate::analyzers::types::{Column, SessionTable};
use crate::error::AnalysisError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Pipeline { stages }
    }

    /// All five stages: running counts, ranking, percentile, best lap, position change.
    pub fn standard() -> Self {
        Pipeline::new(Stage::ALL.to_vec())
    }

    /// Orders the stages needed to produce `targets` from a table that already
    /// carries `available`, pulling in upstream stages transitively.
    ///
    /// Columns no stage produces are left for [`Pipeline::validate`] to report.
    pub fn resolve(targets: &[Column], available: &BTreeSet<Column>) -> Self {
        let mut planned = available.clone();
        let mut stages = Vec::new();
        for target in targets {
            plan(*target, &mut planned, &mut stages);
        }
        Pipeline { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Walks the stages over `columns`, failing on the first stage whose inputs
    /// would not be present at its turn.
    pub fn validate(&self, columns: &BTreeSet<Column>) -> Result<(), AnalysisError> {
        let mut schema = columns.clone();
        for stage in &self.stages {
            let missing: Vec<Column> = stage
                .requires()
                .iter()
                .copied()
                .filter(|c| !schema.contains(c))
                .collect();
            if !missing.is_empty() {
                return Err(AnalysisError::MissingColumns {
                    stage: stage.name(),
                    columns: missing,
                });
            }
            schema.extend(stage.produces());
            for removed in stage.removes() {
                schema.remove(removed);
            }
        }
        Ok(())
    }

    pub fn run(&self, table: SessionTable) -> Result<SessionTable, AnalysisError> {
        self.validate(table.schema())?;
        self.stages.iter().try_fold(table, |table, stage| {
            debug!(stage = stage.name(), rows = table.len(), "Applying stage");
            stage.apply(table)
        })
    }
}

fn plan(target: Column, planned: &mut BTreeSet<Column>, stages: &mut Vec<Stage>) {
    if planned.contains(&target) {
        return;
    }
    let Some(stage) = Stage::producing(target) else {
        return;
    };
    for input in stage.requires() {
        plan(*input, planned, stages);
    }
    planned.extend(stage.produces());
    stages.push(stage);
}

/// Runs every enrichment stage over `table`.
pub fn enrich(table: SessionTable) -> Result<SessionTable, AnalysisError> {
    Pipeline::standard().run(table)
}
