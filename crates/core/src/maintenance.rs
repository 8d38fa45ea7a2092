use crate::error::IngestError;
use crate::models::{MaintenanceReport, MaintenanceStep, RankWeights};
use crate::traits::FullTextCollection;
use tracing::{info, warn};

/// Post-load index upkeep: rank weights, rebuild, optimize.
///
/// Best effort. Each step is attempted once in order even if an earlier one
/// failed, and nothing here touches committed rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexMaintainer {
    weights: RankWeights,
}

impl IndexMaintainer {
    pub fn new(weights: RankWeights) -> Self {
        Self { weights }
    }

    pub fn run<S: FullTextCollection>(&self, store: &mut S) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        for step in MaintenanceStep::ORDER {
            let outcome = match step {
                MaintenanceStep::SetRank => store.set_rank(&self.weights),
                MaintenanceStep::Rebuild => store.rebuild(),
                MaintenanceStep::Optimize => store.optimize(),
            };

            match outcome {
                Ok(()) => {
                    info!(%step, "index maintenance step done");
                    report.completed.push(step);
                }
                Err(source) => {
                    warn!(%step, error = %source, "index maintenance step failed");
                    report
                        .failures
                        .push(IngestError::MaintenanceFailed { step, source });
                }
            }
        }

        report
    }
}
