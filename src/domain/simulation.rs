//! Daily rebalancing simulator.
//!
//! For every consecutive pair of dates the alpha scores the earlier date's
//! cross-section (the data day); those scores size integer positions that are
//! bought at the later date's open and sold at its close (the trading day).

use crate::domain::alpha::Alpha;
use crate::domain::dataset::HistoricalDataset;
use crate::domain::error::AlphaSimError;
use crate::domain::historical::HistoricalRecord;
use chrono::NaiveDate;
use log::{debug, info};

pub const INITIAL_FUNDS: f64 = 1_000_000.0;

/// Minimum number of aligned dates: one data day plus one trading day.
pub const MIN_DAYS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    /// Per trading day: day P&L * 100 / funds before the day.
    pub returns: Vec<f64>,
    /// Per trading day: dot product of today's and yesterday's position
    /// vectors, 0.0 for the first trading day.
    pub turnover: Vec<f64>,
    pub trading_days: Vec<NaiveDate>,
    /// Share counts per trading day, in cross-section order.
    pub quantities: Vec<Vec<i64>>,
    /// Funds balance after each trading day.
    pub funds: Vec<f64>,
    pub initial_funds: f64,
}

impl SimulationResult {
    pub fn final_funds(&self) -> f64 {
        self.funds.last().copied().unwrap_or(self.initial_funds)
    }
}

/// Running totals for a single run. Built fresh by every `run` call.
struct SimulationState {
    funds: f64,
    previous_quantities: Option<Vec<i64>>,
    result: SimulationResult,
}

impl SimulationState {
    fn new(initial_funds: f64, capacity: usize) -> Self {
        Self {
            funds: initial_funds,
            previous_quantities: None,
            result: SimulationResult {
                returns: Vec::with_capacity(capacity),
                turnover: Vec::with_capacity(capacity),
                trading_days: Vec::with_capacity(capacity),
                quantities: Vec::with_capacity(capacity),
                funds: Vec::with_capacity(capacity),
                initial_funds,
            },
        }
    }

    fn record_day(&mut self, date: NaiveDate, quantities: Vec<i64>, day_total: f64) {
        self.result.returns.push(day_total * 100.0 / self.funds);
        self.funds += day_total;
        self.result.funds.push(self.funds);

        let turnover = match &self.previous_quantities {
            Some(previous) => dot(&quantities, previous),
            None => 0.0,
        };
        self.result.turnover.push(turnover);
        self.result.trading_days.push(date);
        self.result.quantities.push(quantities.clone());
        self.previous_quantities = Some(quantities);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Simulator {
    initial_funds: f64,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(INITIAL_FUNDS)
    }
}

impl Simulator {
    pub fn new(initial_funds: f64) -> Self {
        Self { initial_funds }
    }

    pub fn initial_funds(&self) -> f64 {
        self.initial_funds
    }

    /// Runs `alpha` over every consecutive date pair of `dataset`.
    ///
    /// Overwrites the realized return of every record on a trading day.
    pub fn run(
        &self,
        dataset: &mut HistoricalDataset,
        alpha: &dyn Alpha,
    ) -> Result<SimulationResult, AlphaSimError> {
        let days = dataset.dates();
        if days.len() < MIN_DAYS {
            return Err(AlphaSimError::InsufficientData {
                days: days.len(),
                minimum: MIN_DAYS,
            });
        }

        info!(
            "simulating {} over {} trading days ({} to {})",
            alpha.name(),
            days.len() - 1,
            days[1],
            days[days.len() - 1]
        );

        let mut state = SimulationState::new(self.initial_funds, days.len() - 1);

        for pair in days.windows(2) {
            let (data_day, trading_day) = (pair[0], pair[1]);

            if !(state.funds.is_finite() && state.funds > 0.0) {
                return Err(AlphaSimError::FundsExhausted {
                    date: trading_day,
                    funds: state.funds,
                });
            }

            let scores = score_cross_section(dataset, data_day, trading_day, alpha)?;
            let alpha_total = check_allocation(&scores, trading_day)?;

            let records = dataset.cross_section_mut(trading_day).ok_or_else(|| {
                AlphaSimError::MisalignedCrossSection {
                    date: trading_day,
                    reason: "date vanished from dataset".to_string(),
                }
            })?;

            let mut quantities = Vec::with_capacity(records.len());
            let mut day_total = 0.0;
            for (record, score) in records.iter_mut().zip(&scores) {
                let quantity = target_quantity(*score, state.funds, alpha_total, record.open());
                let realized = record.intraday_change() * quantity as f64;
                record.set_realized_return(realized);
                day_total += realized;
                quantities.push(quantity);
            }

            debug!(
                "{}: pnl {:.2} on funds {:.2}, positions {:?}",
                trading_day, day_total, state.funds, quantities
            );
            state.record_day(trading_day, quantities, day_total);
        }

        info!(
            "simulation finished: funds {:.2} -> {:.2}",
            self.initial_funds, state.funds
        );
        Ok(state.result)
    }
}

/// Runs `alpha` with the default starting funds.
pub fn simulate(
    dataset: &mut HistoricalDataset,
    alpha: &dyn Alpha,
) -> Result<SimulationResult, AlphaSimError> {
    Simulator::default().run(dataset, alpha)
}

/// Scores the data day after checking it lines up stock-for-stock with the
/// next day.
fn score_cross_section(
    dataset: &HistoricalDataset,
    data_day: NaiveDate,
    trading_day: NaiveDate,
    alpha: &dyn Alpha,
) -> Result<Vec<f64>, AlphaSimError> {
    let data = dataset.cross_section(data_day).unwrap_or_default();
    let trading = dataset.cross_section(trading_day).unwrap_or_default();
    ensure_aligned(data, trading, trading_day)?;
    Ok(data.iter().map(|record| alpha.score(record)).collect())
}

fn check_allocation(scores: &[f64], trading_day: NaiveDate) -> Result<f64, AlphaSimError> {
    let degenerate = |reason: String| AlphaSimError::DegenerateAllocation {
        date: trading_day,
        reason,
    };

    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        return Err(degenerate(format!("non-finite score {bad}")));
    }
    if !scores.iter().any(|s| *s > 0.0) {
        return Err(degenerate("no stock has a positive score".to_string()));
    }
    // A non-positive total would flip every position's side.
    let total: f64 = scores.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return Err(degenerate(format!("scores sum to {total}, need a positive total")));
    }
    Ok(total)
}

/// Shares to hold: score's share of `funds`, divided by the open price,
/// truncated toward zero. Negative scores give short positions.
pub fn target_quantity(score: f64, funds: f64, alpha_total: f64, open: f64) -> i64 {
    (score * funds / (alpha_total * open)).trunc() as i64
}

fn dot(a: &[i64], b: &[i64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum()
}

/// Checks that `data` and `trading` hold the same stocks in the same order.
fn ensure_aligned(
    data: &[HistoricalRecord],
    trading: &[HistoricalRecord],
    trading_day: NaiveDate,
) -> Result<(), AlphaSimError> {
    if data.len() != trading.len() {
        return Err(AlphaSimError::MisalignedCrossSection {
            date: trading_day,
            reason: format!("{} stocks vs {} on the prior day", trading.len(), data.len()),
        });
    }
    for (index, (prior, today)) in data.iter().zip(trading).enumerate() {
        if prior.code() != today.code() {
            return Err(AlphaSimError::MisalignedCrossSection {
                date: trading_day,
                reason: format!(
                    "position {index} holds {} but held {} on the prior day",
                    today.code(),
                    prior.code()
                ),
            });
        }
    }
    Ok(())
}
