use crate::combination_finder::CombinationFinder;
use crate::error::{check_stake, check_target, check_tolerance, EngineError, EngineResult};
use crate::prediction::PredictionCandidate;
use crate::rollover_ledger::{build_ledger, RolloverDay, RolloverProgress};
use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const DEFAULT_CHALLENGE_DAYS: u32 = 10;
pub const DEFAULT_INITIAL_AMOUNT: f64 = 100.0;
pub const DEFAULT_ROLLOVER_TARGET: f64 = 2.0;
pub const DEFAULT_ROLLOVER_TOLERANCE: f64 = 0.3;

/// Assigns predictions to calendar days in one fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBucketer {
    offset: FixedOffset,
}

impl Default for DayBucketer {
    fn default() -> Self {
        Self { offset: Utc.fix() }
    }
}

impl DayBucketer {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// `None` when the offset is a day or more away from UTC.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(Self::new)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn day_of(&self, prediction: &PredictionCandidate) -> NaiveDate {
        prediction.start_time.with_timezone(&self.offset).date_naive()
    }

    pub fn bucket(
        &self,
        candidates: &[PredictionCandidate],
    ) -> BTreeMap<NaiveDate, Vec<PredictionCandidate>> {
        let mut buckets: BTreeMap<NaiveDate, Vec<PredictionCandidate>> = BTreeMap::new();
        for prediction in candidates {
            buckets
                .entry(self.day_of(prediction))
                .or_default()
                .push(prediction.clone());
        }
        buckets
    }

    pub fn earliest_day(&self, candidates: &[PredictionCandidate]) -> Option<NaiveDate> {
        candidates.iter().map(|p| self.day_of(p)).min()
    }
}

/// Consecutive-day accumulator challenge where each day's winnings roll into the next stake.
#[derive(Debug, Clone)]
pub struct RolloverChallenge {
    pub start_date: NaiveDate,
    pub length: u32,
    pub target: f64,
    pub tolerance: f64,
    pub initial_amount: f64,
    bucketer: DayBucketer,
    finder: CombinationFinder,
}

impl RolloverChallenge {
    pub fn new(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            length: DEFAULT_CHALLENGE_DAYS,
            target: DEFAULT_ROLLOVER_TARGET,
            tolerance: DEFAULT_ROLLOVER_TOLERANCE,
            initial_amount: DEFAULT_INITIAL_AMOUNT,
            bucketer: DayBucketer::default(),
            finder: CombinationFinder::default(),
        }
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    pub fn with_target(mut self, target: f64, tolerance: f64) -> Self {
        self.target = target;
        self.tolerance = tolerance;
        self
    }

    pub fn with_initial_amount(mut self, initial_amount: f64) -> Self {
        self.initial_amount = initial_amount;
        self
    }

    pub fn with_bucketer(mut self, bucketer: DayBucketer) -> Self {
        self.bucketer = bucketer;
        self
    }

    pub fn with_finder(mut self, finder: CombinationFinder) -> Self {
        self.finder = finder;
        self
    }

    /// (day number, date) for every slot of the challenge window.
    pub fn slots(&self) -> impl Iterator<Item = (u32, NaiveDate)> + '_ {
        (1..=self.length).zip(self.start_date.iter_days())
    }

    /// Best combination for each day of the window; days without a match get no combo.
    pub fn plan_days(&self, candidates: &[PredictionCandidate]) -> EngineResult<Vec<RolloverDay>> {
        if self.length == 0 {
            return Err(EngineError::InvalidChallengeLength);
        }
        check_target(self.target)?;
        check_tolerance(self.tolerance)?;

        let buckets = self.bucketer.bucket(candidates);
        let mut days = Vec::with_capacity(self.length as usize);

        for (day, date) in self.slots() {
            let combo = match buckets.get(&date) {
                Some(pool) => self
                    .finder
                    .find_combinations(pool, self.target, self.tolerance)?
                    .into_iter()
                    .next(),
                None => None,
            };

            match &combo {
                Some(c) => debug!(
                    "Day {} ({}): {} legs @ {:.2} [{:?}]",
                    day,
                    date,
                    c.len(),
                    c.total_odds,
                    c.status()
                ),
                None => debug!("Day {} ({}): no combination", day, date),
            }

            days.push(RolloverDay::new(day, date, combo));
        }

        Ok(days)
    }

    pub fn progress(&self, candidates: &[PredictionCandidate]) -> EngineResult<RolloverProgress> {
        check_stake(self.initial_amount)?;
        let days = self.plan_days(candidates)?;
        info!(
            "📝 Rollover challenge from {} ({} days, target {:.2} ± {:.2})",
            self.start_date, self.length, self.target, self.tolerance
        );
        build_ledger(&days, self.initial_amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::PredictionStatus::{self, Lost, Pending, Won};
    use chrono::{TimeZone, Utc};

    fn pick(
        id: &str,
        odds: f64,
        day: u32,
        hour: u32,
        status: PredictionStatus,
    ) -> PredictionCandidate {
        let start = Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap();
        PredictionCandidate::new(id, odds, start).with_status(status)
    }

    fn march(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn test_bucketing_respects_offset() {
        let late = pick("late", 1.5, 1, 23, Pending);

        assert_eq!(DayBucketer::default().day_of(&late), march(1));

        let cet = DayBucketer::from_offset_minutes(60).unwrap();
        assert_eq!(cet.day_of(&late), march(2));

        let early = pick("early", 1.5, 2, 2, Pending);
        let pacific = DayBucketer::from_offset_minutes(-8 * 60).unwrap();
        assert_eq!(pacific.day_of(&early), march(1));

        assert!(DayBucketer::from_offset_minutes(24 * 60).is_none());
    }

    #[test]
    fn test_bucket_groups_by_day() {
        let batch = vec![
            pick("a", 1.5, 2, 12, Pending),
            pick("b", 1.4, 1, 9, Pending),
            pick("c", 1.6, 2, 20, Pending),
        ];
        let bucketer = DayBucketer::default();
        let buckets = bucketer.bucket(&batch);

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[&march(2)].len(), 2);
        assert_eq!(bucketer.earliest_day(&batch), Some(march(1)));
        assert_eq!(bucketer.earliest_day(&[]), None);
    }

    #[test]
    fn test_plan_covers_whole_window() {
        let batch = vec![
            pick("a", 1.4, 1, 12, Won),
            pick("b", 1.5, 1, 15, Won),
            pick("c", 2.05, 3, 15, Pending),
        ];
        let challenge = RolloverChallenge::new(march(1)).with_length(4);
        let days = challenge.plan_days(&batch).unwrap();

        assert_eq!(days.len(), 4);
        assert_eq!(days.iter().map(|d| d.day).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(days[3].date, march(4));
        assert!(days[0].combo.is_some());
        assert!(days[1].combo.is_none());
        assert_eq!(days[2].combo.as_ref().map(|c| c.len()), Some(1));
        assert!(days[3].combo.is_none());
    }

    #[test]
    fn test_progress_over_challenge() {
        let batch = vec![
            // Day 1: 1.4 * 1.5 = 2.1, won
            pick("a", 1.4, 1, 12, Won),
            pick("b", 1.5, 1, 15, Won),
            // Day 2: 1.45 * 1.4 = 2.03, lost
            pick("c", 1.45, 2, 12, Lost),
            pick("d", 1.4, 2, 18, Won),
            // Day 3: 1.35 * 1.5 = 2.025, pending
            pick("e", 1.35, 3, 12, Pending),
            pick("f", 1.5, 3, 18, Won),
        ];
        let challenge = RolloverChallenge::new(march(1))
            .with_length(3)
            .with_initial_amount(50.0);
        let progress = challenge.progress(&batch).unwrap();

        assert_eq!(progress.current_day, 3);
        assert!((progress.current_amount - 50.0).abs() < 1e-9);
        assert!((progress.projected_amount - 50.0 * 1.35 * 1.5).abs() < 1e-9);
        assert_eq!(progress.statistics.resets, 1);
        assert!((progress.entries[0].balance - 50.0 * 1.4 * 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_challenge_settings() {
        let batch = vec![pick("a", 1.4, 1, 12, Won)];

        let zero = RolloverChallenge::new(march(1)).with_length(0);
        assert_eq!(zero.plan_days(&batch), Err(EngineError::InvalidChallengeLength));

        let no_stake = RolloverChallenge::new(march(1)).with_initial_amount(-5.0);
        assert_eq!(no_stake.progress(&batch), Err(EngineError::InvalidStake(-5.0)));

        let flat = RolloverChallenge::new(march(1)).with_target(0.5, 0.1);
        assert!(flat.plan_days(&batch).is_err());
    }
}
