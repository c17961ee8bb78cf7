use crate::fisher::{Archetype, Fisher};
use crate::grid::{PatchGrid, Region};
use crate::stats::{Accumulator, AccumulatorReport, gini, safe_mean, safe_median};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One value per fishable region.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct RegionLevels {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl RegionLevels {
    fn collect(value: impl Fn(Region) -> f64) -> Self {
        Self {
            a: value(Region::A),
            b: value(Region::B),
            c: value(Region::C),
            d: value(Region::D),
        }
    }
}

/// Aggregate state of the world at the end of one day, taken after the
/// agents acted and before regrowth.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub day: u64,
    pub bad_weather: bool,

    pub stocks: RegionLevels,
    pub total_stock: f64,

    pub num_fishing: usize,
    pub num_at_home: usize,
    pub num_at_sea: usize,
    pub num_bankrupt: usize,
    pub num_lay_low: usize,

    pub daily_catch: f64,
    pub cumulative_catch: f64,

    pub total_capital: f64,
    pub avg_capital: f64,
    pub median_capital: f64,

    pub gini_capital: f64,
    pub gini_wealth: f64,
    pub gini_catch: f64,
}

impl DailySnapshot {
    pub fn collect(
        grid: &PatchGrid,
        fishers: &[Fisher],
        day: u64,
        bad_weather: bool,
        daily_catch: f64,
    ) -> Self {
        let capitals: Vec<f64> = fishers.iter().map(|f| f.ledger.capital).collect();
        let wealths: Vec<f64> = fishers.iter().map(|f| f.ledger.wealth).collect();
        let catches: Vec<f64> = fishers.iter().map(|f| f.total_catch).collect();

        Self {
            day,
            bad_weather,
            stocks: RegionLevels::collect(|region| grid.region_stock(region)),
            total_stock: grid.total_stock(),
            num_fishing: fishers.iter().filter(|f| f.gone_fishing).count(),
            num_at_home: fishers.iter().filter(|f| f.at_home).count(),
            num_at_sea: fishers.iter().filter(|f| f.at_sea).count(),
            num_bankrupt: fishers.iter().filter(|f| f.ledger.bankrupt).count(),
            num_lay_low: fishers.iter().filter(|f| f.ledger.lay_low).count(),
            daily_catch,
            cumulative_catch: catches.iter().sum(),
            total_capital: capitals.iter().sum(),
            avg_capital: safe_mean(&capitals),
            median_capital: safe_median(&capitals),
            gini_capital: gini(&capitals),
            gini_wealth: gini(&wealths),
            gini_catch: gini(&catches),
        }
    }
}

/// Catch and capital aggregates for one archetype.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct ArchetypeBreakdown {
    pub count: usize,
    pub total_catch: f64,
    pub avg_catch: f64,
    pub avg_capital: f64,
}

impl ArchetypeBreakdown {
    fn collect(fishers: &[Fisher], archetype: Archetype) -> Self {
        let catches: Vec<f64> = fishers
            .iter()
            .filter(|f| f.archetype == archetype)
            .map(|f| f.total_catch)
            .collect();
        let capitals: Vec<f64> = fishers
            .iter()
            .filter(|f| f.archetype == archetype)
            .map(|f| f.ledger.capital)
            .collect();
        Self {
            count: catches.len(),
            total_catch: catches.iter().sum(),
            avg_catch: safe_mean(&catches),
            avg_capital: safe_mean(&capitals),
        }
    }
}

/// Year-boundary summary, richer than the daily snapshot.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct YearlySnapshot {
    pub year: u64,
    pub day: u64,

    pub stocks: RegionLevels,
    /// Regional stock as a fraction of regional capacity.
    pub stock_fractions: RegionLevels,
    pub total_stock: f64,

    pub num_agents: usize,
    pub num_bankrupt: usize,
    pub archipelago: ArchetypeBreakdown,
    pub coastal: ArchetypeBreakdown,
    pub trawler: ArchetypeBreakdown,

    pub total_catch: f64,
    pub yearly_catch: f64,
    pub total_capital: f64,
    pub total_profit: f64,
    pub total_revenue: f64,
    pub total_cost: f64,

    pub gini_capital: f64,
    pub gini_wealth: f64,
    pub gini_catch: f64,

    pub total_trips: u64,
    pub profitable_trips: u64,
    pub avg_success_rate: f64,
    pub avg_days_at_sea: f64,
}

impl YearlySnapshot {
    pub fn collect(grid: &PatchGrid, fishers: &[Fisher], day: u64, yearly_catch: f64) -> Self {
        let capitals: Vec<f64> = fishers.iter().map(|f| f.ledger.capital).collect();
        let wealths: Vec<f64> = fishers.iter().map(|f| f.ledger.wealth).collect();
        let catches: Vec<f64> = fishers.iter().map(|f| f.total_catch).collect();
        let success_rates: Vec<f64> = fishers
            .iter()
            .map(|f| {
                let trips = f.ledger.profitable_trips + f.ledger.unprofitable_trips;
                if trips > 0 {
                    f.ledger.profitable_trips as f64 / trips as f64
                } else {
                    0.0
                }
            })
            .collect();
        let days_at_sea: Vec<f64> = fishers.iter().map(|f| f.days_at_sea as f64).collect();

        Self {
            year: day / 365,
            day,
            stocks: RegionLevels::collect(|region| grid.region_stock(region)),
            stock_fractions: RegionLevels::collect(|region| {
                let capacity = grid.region_capacity(region);
                if capacity > 0.0 {
                    grid.region_stock(region) / capacity
                } else {
                    0.0
                }
            }),
            total_stock: grid.total_stock(),
            num_agents: fishers.len(),
            num_bankrupt: fishers.iter().filter(|f| f.ledger.bankrupt).count(),
            archipelago: ArchetypeBreakdown::collect(fishers, Archetype::Archipelago),
            coastal: ArchetypeBreakdown::collect(fishers, Archetype::Coastal),
            trawler: ArchetypeBreakdown::collect(fishers, Archetype::Trawler),
            total_catch: catches.iter().sum(),
            yearly_catch,
            total_capital: capitals.iter().sum(),
            total_profit: fishers.iter().map(|f| f.ledger.total_profit).sum(),
            total_revenue: fishers.iter().map(|f| f.ledger.total_revenue).sum(),
            total_cost: fishers.iter().map(|f| f.ledger.total_cost).sum(),
            gini_capital: gini(&capitals),
            gini_wealth: gini(&wealths),
            gini_catch: gini(&catches),
            total_trips: fishers
                .iter()
                .map(|f| f.ledger.profitable_trips + f.ledger.unprofitable_trips)
                .sum(),
            profitable_trips: fishers.iter().map(|f| f.ledger.profitable_trips).sum(),
            avg_success_rate: safe_mean(&success_rates),
            avg_days_at_sea: safe_mean(&days_at_sea),
        }
    }
}

/// Receives snapshots as the simulation produces them. The simulation
/// core never writes files itself; exporters implement this trait.
pub trait Observer {
    fn on_day(&mut self, snapshot: &DailySnapshot) -> Result<()>;

    fn on_year(&mut self, _snapshot: &YearlySnapshot) -> Result<()> {
        Ok(())
    }
}

/// In-memory observer keeping every snapshot it receives.
#[derive(Debug, Default)]
pub struct SnapshotLog {
    pub daily: Vec<DailySnapshot>,
    pub yearly: Vec<YearlySnapshot>,
}

impl Observer for SnapshotLog {
    fn on_day(&mut self, snapshot: &DailySnapshot) -> Result<()> {
        self.daily.push(snapshot.clone());
        Ok(())
    }

    fn on_year(&mut self, snapshot: &YearlySnapshot) -> Result<()> {
        self.yearly.push(snapshot.clone());
        Ok(())
    }
}

/// Observer accumulating fleet activity over the whole run.
pub struct FleetActivity {
    fishing: Accumulator,
    daily_catch: Accumulator,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FleetActivityReport {
    pub fishing: AccumulatorReport,
    pub daily_catch: AccumulatorReport,
}

impl FleetActivity {
    pub fn new() -> Self {
        Self {
            fishing: Accumulator::new(),
            daily_catch: Accumulator::new(),
        }
    }

    pub fn report(&self) -> FleetActivityReport {
        FleetActivityReport {
            fishing: self.fishing.report(),
            daily_catch: self.daily_catch.report(),
        }
    }
}

impl Default for FleetActivity {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for FleetActivity {
    fn on_day(&mut self, snapshot: &DailySnapshot) -> Result<()> {
        self.fishing.add(snapshot.num_fishing as f64);
        self.daily_catch.add(snapshot.daily_catch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn population(cfg: &Config) -> Vec<Fisher> {
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        [Archetype::Archipelago, Archetype::Coastal, Archetype::Trawler]
            .into_iter()
            .enumerate()
            .map(|(id, archetype)| {
                Fisher::new(id, archetype, cfg, &mut rng).expect("fisher builds")
            })
            .collect()
    }

    #[test]
    fn daily_snapshot_counts_agent_states() {
        let cfg = Config::default();
        let grid = PatchGrid::new(&cfg.grid);
        let mut fishers = population(&cfg);
        fishers[0].gone_fishing = true;
        fishers[0].at_home = false;
        fishers[0].at_sea = true;
        fishers[2].ledger.bankrupt = true;
        fishers[2].ledger.lay_low = true;

        let snapshot = DailySnapshot::collect(&grid, &fishers, 12, true, 5.0);
        assert_eq!(snapshot.day, 12);
        assert!(snapshot.bad_weather);
        assert_eq!(snapshot.num_fishing, 1);
        assert_eq!(snapshot.num_at_home, 2);
        assert_eq!(snapshot.num_bankrupt, 1);
        assert_eq!(snapshot.num_lay_low, 1);
        assert_eq!(snapshot.daily_catch, 5.0);
        // All capitals are equal at the start.
        assert!(snapshot.gini_capital.abs() < 1e-12);
        assert_eq!(snapshot.total_capital, 3000.0);
    }

    #[test]
    fn yearly_snapshot_breaks_down_archetypes() {
        let cfg = Config::default();
        let grid = PatchGrid::new(&cfg.grid);
        let mut fishers = population(&cfg);
        fishers[2].total_catch = 300.0;
        fishers[2].ledger.profitable_trips = 3;
        fishers[2].ledger.unprofitable_trips = 1;

        let snapshot = YearlySnapshot::collect(&grid, &fishers, 730, 300.0);
        assert_eq!(snapshot.year, 2);
        assert_eq!(snapshot.num_agents, 3);
        assert_eq!(snapshot.trawler.count, 1);
        assert_eq!(snapshot.trawler.total_catch, 300.0);
        assert_eq!(snapshot.archipelago.total_catch, 0.0);
        assert_eq!(snapshot.total_trips, 4);
        assert!((snapshot.avg_success_rate - 0.25).abs() < 1e-12);
        // Every region starts at its maximum sustainable yield level.
        assert!((snapshot.stock_fractions.a - 0.5).abs() < 1e-3);
        assert!((snapshot.stock_fractions.d - 0.5).abs() < 1e-3);
    }

    #[test]
    fn snapshot_log_and_fleet_activity_observe_days() {
        let cfg = Config::default();
        let grid = PatchGrid::new(&cfg.grid);
        let fishers = population(&cfg);

        let mut log = SnapshotLog::default();
        let mut activity = FleetActivity::new();
        for day in 0..3 {
            let snapshot = DailySnapshot::collect(&grid, &fishers, day, false, 10.0);
            log.on_day(&snapshot).expect("log never fails");
            activity.on_day(&snapshot).expect("activity never fails");
        }
        let yearly = YearlySnapshot::collect(&grid, &fishers, 365, 30.0);
        log.on_year(&yearly).expect("log never fails");

        assert_eq!(log.daily.len(), 3);
        assert_eq!(log.yearly.len(), 1);
        let report = activity.report();
        assert!((report.daily_catch.mean - 10.0).abs() < 1e-12);
        assert_eq!(report.daily_catch.std_dev, 0.0);
    }
}
