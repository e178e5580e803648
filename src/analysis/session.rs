use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use super::oracle::Oracle;
use super::types::{AnalysisRequest, AnalysisResult, GuidelinePayload};
use super::validate::parse_analysis_response;
use crate::catalog::{CanonicalRecord, Catalog, merge, select_top};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub retailer: String,
    pub guideline: GuidelinePayload,
    pub competitor_limit: usize,
}

#[derive(Debug, Clone)]
pub struct CompletedAnalysis {
    pub generation: u64,
    pub target: CanonicalRecord,
    pub competitors: Vec<CanonicalRecord>,
    pub result: AnalysisResult,
    pub merged: CanonicalRecord,
}

#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    Applied(Arc<CompletedAnalysis>),
    /// A newer selection or a reset happened while the oracle call was pending.
    Superseded { generation: u64, target_id: String },
}

/// Target selection state over one immutable catalog. Each analysis takes a
/// generation token; only the holder of the latest token may apply its result.
pub struct AnalysisSession {
    catalog: Arc<Catalog>,
    latest: AtomicU64,
    applied: Mutex<Option<Arc<CompletedAnalysis>>>,
}

impl AnalysisSession {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            latest: AtomicU64::new(0),
            applied: Mutex::new(None),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn latest_generation(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<Arc<CompletedAnalysis>> {
        self.lock_applied().clone()
    }

    /// Abandons the current selection. Pending analyses resolve as superseded.
    pub fn reset(&self) {
        let mut applied = self.lock_applied();
        self.latest.fetch_add(1, Ordering::SeqCst);
        *applied = None;
    }

    /// Resolves the target and its competitors into an oracle request.
    pub fn prepare_request(
        &self,
        target_id: &str,
        settings: &AnalysisSettings,
    ) -> Result<AnalysisRequest> {
        let target = self
            .catalog
            .find(target_id)
            .cloned()
            .ok_or_else(|| PipelineError::TargetNotFound(target_id.to_string()))?;
        let competitors = select_top(&target, &self.catalog, settings.competitor_limit)
            .into_iter()
            .cloned()
            .collect::<Vec<CanonicalRecord>>();

        Ok(AnalysisRequest {
            retailer: settings.retailer.clone(),
            target,
            competitors,
            guideline: settings.guideline.clone(),
        })
    }

    pub async fn analyze_target(
        &self,
        oracle: &dyn Oracle,
        target_id: &str,
        settings: &AnalysisSettings,
    ) -> Result<AnalysisOutcome> {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let request = self.prepare_request(target_id, settings)?;

        info!(
            generation,
            target_id,
            category = %request.target.category,
            competitors = request.competitors.len(),
            "starting analysis"
        );

        let outcome = analyze(oracle, &request).await;

        let mut applied = self.lock_applied();
        if self.latest.load(Ordering::SeqCst) != generation {
            warn!(generation, target_id, "discarding analysis for superseded selection");
            return Ok(AnalysisOutcome::Superseded {
                generation,
                target_id: target_id.to_string(),
            });
        }

        let result = outcome?;
        let merged = merge(&request.target, &result);
        let completed = Arc::new(CompletedAnalysis {
            generation,
            target: request.target,
            competitors: request.competitors,
            result,
            merged,
        });
        *applied = Some(Arc::clone(&completed));

        Ok(AnalysisOutcome::Applied(completed))
    }

    fn lock_applied(&self) -> MutexGuard<'_, Option<Arc<CompletedAnalysis>>> {
        self.applied.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One oracle round trip plus validation. No retries.
pub async fn analyze(oracle: &dyn Oracle, request: &AnalysisRequest) -> Result<AnalysisResult> {
    let raw = oracle.complete(request).await?;
    parse_analysis_response(&raw)
}
