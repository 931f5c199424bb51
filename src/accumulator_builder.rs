use crate::combination_finder::{Combination, CombinationFinder};
use crate::error::{EngineError, EngineResult};
use crate::prediction::{PredictionCandidate, PredictionStatus};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// A named odds bucket, e.g. "2x" = accumulators close to 2.0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OddsCategory {
    pub name: String,
    pub target: f64,
    pub tolerance: f64,
}

impl OddsCategory {
    pub fn new(name: impl Into<String>, target: f64, tolerance: f64) -> Self {
        Self {
            name: name.into(),
            target,
            tolerance,
        }
    }

    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("2x", 2.0, 0.3),
            Self::new("5x", 5.0, 0.75),
            Self::new("10x", 10.0, 1.5),
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct CandidateFilters {
    pub statuses: Vec<PredictionStatus>, // empty = any status
    pub max_odds: Option<f64>,
}

impl CandidateFilters {
    pub fn matches(&self, prediction: &PredictionCandidate) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&prediction.status) {
            return false;
        }
        match self.max_odds {
            Some(max) => prediction.odds <= max,
            None => true,
        }
    }

    pub fn filter_candidates(
        &self,
        candidates: &[PredictionCandidate],
    ) -> Vec<PredictionCandidate> {
        candidates
            .iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResult {
    pub category: OddsCategory,
    pub combinations: Vec<Combination>,
}

impl CategoryResult {
    pub fn best(&self) -> Option<&Combination> {
        self.combinations.first()
    }
}

/// Runs the combination search once per odds category over the same pool.
#[derive(Debug, Clone)]
pub struct AccumulatorBuilder {
    categories: Vec<OddsCategory>,
    filters: CandidateFilters,
    finder: CombinationFinder,
}

impl Default for AccumulatorBuilder {
    fn default() -> Self {
        Self::new(OddsCategory::defaults(), CandidateFilters::default())
    }
}

impl AccumulatorBuilder {
    pub fn new(categories: Vec<OddsCategory>, filters: CandidateFilters) -> Self {
        Self {
            categories,
            filters,
            finder: CombinationFinder::default(),
        }
    }

    pub fn with_finder(mut self, finder: CombinationFinder) -> Self {
        self.finder = finder;
        self
    }

    pub fn categories(&self) -> &[OddsCategory] {
        &self.categories
    }

    pub fn build(&self, candidates: &[PredictionCandidate]) -> EngineResult<Vec<CategoryResult>> {
        let pool = self.filters.filter_candidates(candidates);

        self.categories
            .iter()
            .map(|category| -> EngineResult<CategoryResult> {
                let combinations = self.finder.find_combinations(
                    &pool,
                    category.target,
                    category.tolerance,
                )?;
                log_category(category, &combinations);
                Ok(CategoryResult {
                    category: category.clone(),
                    combinations,
                })
            })
            .collect()
    }

    /// Same as [`build`](Self::build), with each category searched on the blocking pool.
    pub async fn build_concurrent(
        &self,
        candidates: Vec<PredictionCandidate>,
    ) -> EngineResult<Vec<CategoryResult>> {
        let pool = Arc::new(self.filters.filter_candidates(&candidates));

        let tasks = self.categories.iter().cloned().map(|category| {
            let pool = Arc::clone(&pool);
            let finder = self.finder.clone();
            tokio::task::spawn_blocking(move || {
                finder
                    .find_combinations(&pool, category.target, category.tolerance)
                    .map(|combinations| CategoryResult {
                        category,
                        combinations,
                    })
            })
        });

        let mut results = Vec::with_capacity(self.categories.len());
        for joined in join_all(tasks).await {
            match joined {
                Ok(result) => {
                    let result = result?;
                    log_category(&result.category, &result.combinations);
                    results.push(result);
                }
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => return Err(EngineError::SearchAborted(e.to_string())),
            }
        }

        Ok(results)
    }
}

fn log_category(category: &OddsCategory, combinations: &[Combination]) {
    match combinations.first() {
        Some(best) => info!(
            "📊 {}: {} combinations, best {} legs @ {:.2}",
            category.name,
            combinations.len(),
            best.len(),
            best.total_odds
        ),
        None => info!("📊 {}: no combination within ±{:.2}", category.name, category.tolerance),
    }
}
