use crate::error::{check_target, check_tolerance, EngineResult};
use crate::prediction::{validate_all, PredictionCandidate, PredictionStatus};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use tracing::{debug, warn};
use uuid::Uuid;

pub const DEFAULT_MAX_RESULTS: usize = 5;

/// A set of independent predictions bet together as one accumulator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Combination {
    /// UUIDv5 over the member ids, stable across runs.
    pub id: Uuid,
    pub predictions: Vec<PredictionCandidate>,
    pub total_odds: f64,
}

impl Combination {
    pub fn new(predictions: Vec<PredictionCandidate>) -> Self {
        let total_odds = predictions.iter().map(|p| p.odds).product();
        let key = predictions
            .iter()
            .map(|p| p.id.as_str())
            .collect::<Vec<_>>()
            .join("|");

        Self {
            id: Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()),
            predictions,
            total_odds,
        }
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    /// Won only when every leg won, lost as soon as one leg lost.
    pub fn status(&self) -> PredictionStatus {
        if self.predictions.is_empty() {
            return PredictionStatus::Pending;
        }
        if self
            .predictions
            .iter()
            .any(|p| p.status == PredictionStatus::Lost)
        {
            PredictionStatus::Lost
        } else if self
            .predictions
            .iter()
            .all(|p| p.status == PredictionStatus::Won)
        {
            PredictionStatus::Won
        } else {
            PredictionStatus::Pending
        }
    }

    pub fn difference(&self, target: f64) -> f64 {
        (self.total_odds - target).abs()
    }

    pub fn potential_return(&self, stake: f64) -> f64 {
        stake * self.total_odds
    }
}

/// Maximum number of legs for a given target multiplier.
pub fn size_cap(target: f64) -> usize {
    if target <= 3.0 {
        2
    } else if target <= 6.0 {
        3
    } else {
        4
    }
}

/// Bounded subset search for accumulators whose multiplied odds land near a target.
///
/// The tolerance band is symmetric: branches are explored while the running
/// product stays at or below `target + tolerance`, and a subset is accepted when
/// its product lies in `[target - tolerance, target + tolerance]`.
#[derive(Debug, Clone)]
pub struct CombinationFinder {
    max_results: usize,
}

impl Default for CombinationFinder {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl CombinationFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn find_combinations(
        &self,
        candidates: &[PredictionCandidate],
        target: f64,
        tolerance: f64,
    ) -> EngineResult<Vec<Combination>> {
        check_target(target)?;
        check_tolerance(tolerance)?;
        validate_all(candidates)?;

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut pool = unique_by_id(candidates);
        // Stable sort: equal odds keep their input order
        pool.sort_by(|a, b| a.odds.total_cmp(&b.odds));

        let odds: Vec<f64> = pool.iter().map(|p| p.odds).collect();
        let cap = size_cap(target);
        let band = (target - tolerance, target + tolerance);

        let (top, visited) = search(&odds, cap, target, band, self.max_results);
        let matched = top.seen;

        let combinations: Vec<Combination> = top
            .into_sorted()
            .into_iter()
            .map(|ranked| {
                let legs = ranked.legs().iter().map(|&i| pool[i].clone()).collect();
                Combination::new(legs)
            })
            .collect();

        debug!(
            "Search {:.2} ± {:.2}: {} candidates, cap {}, {} nodes, {} matches, {} kept",
            target,
            tolerance,
            pool.len(),
            cap,
            visited,
            matched,
            combinations.len()
        );

        Ok(combinations)
    }
}

/// Search with the default result limit.
pub fn find_combinations(
    candidates: &[PredictionCandidate],
    target: f64,
    tolerance: f64,
) -> EngineResult<Vec<Combination>> {
    CombinationFinder::default().find_combinations(candidates, target, tolerance)
}

fn unique_by_id(candidates: &[PredictionCandidate]) -> Vec<&PredictionCandidate> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|p| {
            let fresh = seen.insert(p.id.as_str());
            if !fresh {
                warn!("Duplicate prediction id {} ignored", p.id);
            }
            fresh
        })
        .collect()
}

const MAX_LEGS: usize = 4;

#[derive(Clone, Copy)]
struct Frame {
    next: usize,
    product: f64,
    len: usize,
    members: [usize; MAX_LEGS],
}

/// An accepted subset, ordered by distance to target then discovery order.
struct Ranked {
    difference: f64,
    seq: usize,
    len: usize,
    members: [usize; MAX_LEGS],
}

impl Ranked {
    fn legs(&self) -> &[usize] {
        &self.members[..self.len]
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.difference
            .total_cmp(&other.difference)
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// Bounded max-heap holding the `limit` closest subsets seen so far.
struct TopMatches {
    limit: usize,
    heap: BinaryHeap<Ranked>,
    seen: usize,
}

impl TopMatches {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            heap: BinaryHeap::with_capacity(limit.min(64) + 1),
            seen: 0,
        }
    }

    fn offer(&mut self, frame: &Frame, target: f64) {
        let candidate = Ranked {
            difference: (frame.product - target).abs(),
            seq: self.seen,
            len: frame.len,
            members: frame.members,
        };
        self.seen += 1;

        if self.limit == 0 {
            return;
        }
        if self.heap.len() == self.limit {
            // A later find with an equal difference ranks behind the kept one
            let closer = self.heap.peek().is_some_and(|worst| candidate < *worst);
            if !closer {
                return;
            }
            self.heap.pop();
        }
        self.heap.push(candidate);
    }

    fn into_sorted(self) -> Vec<Ranked> {
        self.heap.into_sorted_vec()
    }
}

/// Depth-first enumeration of index subsets over `odds` (sorted ascending).
///
/// Every frame on the stack has a product <= the band ceiling. Children are
/// pushed in reverse so subsets pop in lexicographic order, which fixes the
/// tie order. Returns the closest `limit` matches and the number of visited nodes.
fn search(
    odds: &[f64],
    cap: usize,
    target: f64,
    (floor, ceiling): (f64, f64),
    limit: usize,
) -> (TopMatches, usize) {
    let cap = cap.min(MAX_LEGS);
    let mut top = TopMatches::new(limit);
    let mut visited = 0;
    let mut stack = vec![Frame {
        next: 0,
        product: 1.0,
        len: 0,
        members: [0; MAX_LEGS],
    }];

    while let Some(frame) = stack.pop() {
        visited += 1;

        if frame.len > 0 && frame.product >= floor && frame.product <= ceiling {
            top.offer(&frame, target);
        }
        if frame.len == cap {
            continue;
        }

        // Later odds are no smaller, so once one overshoots the rest do too
        let mut end = frame.next;
        while end < odds.len() && frame.product * odds[end] <= ceiling {
            end += 1;
        }
        for j in (frame.next..end).rev() {
            let mut child = frame;
            child.next = j + 1;
            child.product = frame.product * odds[j];
            child.members[frame.len] = j;
            child.len = frame.len + 1;
            stack.push(child);
        }
    }

    (top, visited)
}
