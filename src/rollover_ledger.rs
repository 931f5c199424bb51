use crate::combination_finder::Combination;
use crate::error::{check_stake, EngineResult};
use crate::prediction::PredictionStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One slot of the rollover challenge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RolloverDay {
    pub day: u32, // 1-based
    pub date: NaiveDate,
    pub combo: Option<Combination>,
}

impl RolloverDay {
    pub fn new(day: u32, date: NaiveDate, combo: Option<Combination>) -> Self {
        Self { day, date, combo }
    }

    /// A day without a usable combination stays pending.
    pub fn status(&self) -> PredictionStatus {
        self.combo
            .as_ref()
            .map(|c| c.status())
            .unwrap_or(PredictionStatus::Pending)
    }

    pub fn total_odds(&self) -> Option<f64> {
        self.combo
            .as_ref()
            .filter(|c| !c.is_empty())
            .map(|c| c.total_odds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub day: u32,
    pub date: NaiveDate,
    pub status: PredictionStatus,
    pub total_odds: Option<f64>,
    pub stake: f64,   // Balance going into the day
    pub balance: f64, // Balance after the day
    pub projected: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStatistics {
    pub won_days: usize,
    pub lost_days: usize,
    pub pending_days: usize,
    pub resets: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RolloverProgress {
    pub initial_amount: f64,
    pub current_day: u32,
    pub current_amount: f64,
    /// Best case: every day from `current_day` on is assumed to win.
    pub projected_amount: f64,
    pub entries: Vec<LedgerEntry>,
    pub statistics: LedgerStatistics,
}

impl RolloverProgress {
    pub fn profit(&self) -> f64 {
        self.current_amount - self.initial_amount
    }

    pub fn projected_profit(&self) -> f64 {
        self.projected_amount - self.initial_amount
    }

    pub fn settled_entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter().filter(|e| !e.projected)
    }
}

/// Fold the challenge days (in day order) into a progress snapshot.
///
/// Won days compound the balance, lost days reset it to `initial_amount`, and
/// the first pending day freezes it. From that day on every existing
/// combination is multiplied into the projection whatever its status, starting
/// from wherever the balance stands after any resets.
pub fn build_ledger(days: &[RolloverDay], initial_amount: f64) -> EngineResult<RolloverProgress> {
    check_stake(initial_amount)?;

    let mut current = initial_amount;
    let mut projected = initial_amount;
    let mut decided: u32 = 0;
    let mut stopped_at: Option<u32> = None;
    let mut entries = Vec::with_capacity(days.len());
    let mut statistics = LedgerStatistics::default();

    for day in days {
        let status = day.status();
        let total_odds = day.total_odds();

        match status {
            PredictionStatus::Won => statistics.won_days += 1,
            PredictionStatus::Lost => statistics.lost_days += 1,
            PredictionStatus::Pending => statistics.pending_days += 1,
        }

        if stopped_at.is_none() {
            match (status, total_odds) {
                (PredictionStatus::Won, Some(odds)) => {
                    let stake = current;
                    current *= odds;
                    decided += 1;
                    debug!("Day {} won @ {:.2}: {:.2} -> {:.2}", day.day, odds, stake, current);
                    entries.push(entry(day, status, total_odds, stake, current, false));
                    continue;
                }
                (PredictionStatus::Lost, _) => {
                    let stake = current;
                    current = initial_amount;
                    decided += 1;
                    statistics.resets += 1;
                    debug!("Day {} lost: {:.2} forfeited, reset to {:.2}", day.day, stake, current);
                    entries.push(entry(day, status, total_odds, stake, current, false));
                    continue;
                }
                _ => {
                    stopped_at = Some(day.day);
                    projected = current;
                }
            }
        }

        let stake = projected;
        if let Some(odds) = total_odds.filter(|o| *o > 0.0) {
            projected *= odds;
        }
        entries.push(entry(day, status, total_odds, stake, projected, true));
    }

    if stopped_at.is_none() {
        projected = current;
    }
    let current_day = stopped_at.unwrap_or(decided + 1);

    info!(
        "💰 Rollover ledger: day {}, current {:.2}, projected {:.2} (won {}, lost {}, pending {})",
        current_day,
        current,
        projected,
        statistics.won_days,
        statistics.lost_days,
        statistics.pending_days
    );

    Ok(RolloverProgress {
        initial_amount,
        current_day,
        current_amount: current,
        projected_amount: projected,
        entries,
        statistics,
    })
}

fn entry(
    day: &RolloverDay,
    status: PredictionStatus,
    total_odds: Option<f64>,
    stake: f64,
    balance: f64,
    projected: bool,
) -> LedgerEntry {
    LedgerEntry {
        day: day.day,
        date: day.date,
        status,
        total_odds,
        stake,
        balance,
        projected,
    }
}
