use crate::config::EconomicsConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Per-fisher accounting state and the bankruptcy/lay-low machine.
///
/// `wealth` mirrors `capital` after every mutation. `bankrupt` is
/// sticky once set; `lay_low` is transient and counts down daily.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct FinancialLedger {
    pub capital: f64,
    pub wealth: f64,
    pub total_revenue: f64,
    pub total_cost: f64,
    pub total_profit: f64,
    pub profitable_trips: u64,
    pub unprofitable_trips: u64,
    pub bankrupt: bool,
    pub lay_low: bool,
    pub lay_low_counter: u32,
}

impl FinancialLedger {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            capital: initial_capital,
            wealth: initial_capital,
            total_revenue: 0.0,
            total_cost: 0.0,
            total_profit: 0.0,
            profitable_trips: 0,
            unprofitable_trips: 0,
            bankrupt: false,
            lay_low: false,
            lay_low_counter: 0,
        }
    }

    /// Settle one trip: apply the profit to capital, accumulate the
    /// totals and trip counters, then re-evaluate solvency.
    pub fn update_finances<R: Rng>(
        &mut self,
        profit: f64,
        cost: f64,
        revenue: f64,
        cost_existence: f64,
        eco: &EconomicsConfig,
        rng: &mut R,
    ) {
        self.capital += profit;
        self.wealth = self.capital;
        self.total_revenue += revenue;
        self.total_cost += cost;
        self.total_profit += profit;
        if profit > 0.0 {
            self.profitable_trips += 1;
        } else {
            self.unprofitable_trips += 1;
        }
        self.check_bankruptcy(cost_existence, eco, rng);
    }

    /// Charge a cost with no trip attached (a day ashore).
    pub fn pay(&mut self, amount: f64) {
        self.capital -= amount;
        self.wealth = self.capital;
    }

    /// Deep debt bankrupts the fisher and forces a long lay-low; mild
    /// debt sometimes triggers a short precautionary one.
    pub fn check_bankruptcy<R: Rng>(
        &mut self,
        cost_existence: f64,
        eco: &EconomicsConfig,
        rng: &mut R,
    ) {
        let threshold = -(cost_existence * 365.0 * eco.bankruptcy_threshold_years);
        if self.capital < threshold {
            if !self.bankrupt {
                self.bankrupt = true;
                self.lay_low = true;
                self.lay_low_counter = eco.bankruptcy_lay_low_days;
            }
        } else if self.capital < 0.0
            && !self.lay_low
            && rng.random::<f64>() < eco.negative_capital_lay_low_probability
        {
            self.lay_low = true;
            self.lay_low_counter = eco.negative_capital_lay_low_days;
        }
    }

    /// Count down an active lay-low. Returns true while the day is
    /// lost to it.
    pub fn tick_lay_low(&mut self) -> bool {
        if !self.lay_low {
            return false;
        }
        self.lay_low_counter = self.lay_low_counter.saturating_sub(1);
        if self.lay_low_counter == 0 {
            self.lay_low = false;
        }
        true
    }

    /// Whether a trip of the given cost leaves the safety buffer
    /// untouched.
    pub fn can_afford_trip(&self, cost: f64, cost_existence: f64, eco: &EconomicsConfig) -> bool {
        let buffer = cost_existence * eco.safety_buffer_days;
        self.capital >= cost + buffer
    }
}
