//! Summary statistics over a simulation's returns and turnover series.

use super::simulation::SimulationResult;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub trading_days: usize,
    pub initial_funds: f64,
    pub final_funds: f64,
    /// Percent change of funds over the whole run.
    pub total_return_pct: f64,
    /// Mean of the daily percent returns.
    pub mean_daily_return: f64,
    /// Sample standard deviation of the daily percent returns.
    pub daily_volatility: f64,
    /// Annualized mean / volatility; 0.0 when fewer than two days or flat.
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough fall of funds, as a fraction of the peak.
    pub max_drawdown: f64,
    /// Mean turnover, leaving out the first-day sentinel.
    pub mean_turnover: f64,
}

impl Summary {
    pub fn compute(result: &SimulationResult) -> Self {
        let returns = &result.returns;
        let trading_days = returns.len();
        let initial_funds = result.initial_funds;
        let final_funds = result.final_funds();

        let total_return_pct = if initial_funds != 0.0 {
            (final_funds - initial_funds) * 100.0 / initial_funds
        } else {
            0.0
        };

        let mean_daily_return = mean(returns);
        let daily_volatility = sample_std(returns, mean_daily_return);
        let sharpe_ratio = if trading_days >= 2 && daily_volatility > 0.0 {
            mean_daily_return / daily_volatility * TRADING_DAYS_PER_YEAR.sqrt()
        } else {
            0.0
        };

        let mean_turnover = mean(result.turnover.get(1..).unwrap_or_default());

        Summary {
            trading_days,
            initial_funds,
            final_funds,
            total_return_pct,
            mean_daily_return,
            daily_volatility,
            sharpe_ratio,
            max_drawdown: compute_drawdown(initial_funds, &result.funds),
            mean_turnover,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn sample_std(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn compute_drawdown(initial_funds: f64, funds: &[f64]) -> f64 {
    let mut peak = initial_funds;
    let mut max_dd = 0.0_f64;
    for &value in funds {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            max_dd = max_dd.max((peak - value) / peak);
        }
    }
    max_dd
}
