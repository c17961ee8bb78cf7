use crate::config::Config;
use crate::decision::{self, Decision, FleetView};
use crate::fisher::{Archetype, Fisher, FisherSummary};
use crate::grid::{Patch, PatchGrid, Region};
use crate::report::{DailySnapshot, Observer, YearlySnapshot};
use crate::{resource, trip};
use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use rand_distr::{Bernoulli, Distribution};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

const DAYS_PER_YEAR: u64 = 365;

/// Simulation engine.
///
/// Holds the configuration, spatial grid, fleet, and random number
/// generator, and provides methods to initialize, run, save, and load
/// simulations. Observers are not part of checkpoints and must be
/// re-attached after [`Simulation::load_checkpoint`].
#[derive(Serialize, Deserialize)]
pub struct Simulation {
    cfg: Config,
    grid: PatchGrid,
    fishers: Vec<Fisher>,
    rng: ChaCha12Rng,
    day: u64,
    catch_at_year_start: f64,
    last_daily: Option<DailySnapshot>,
    yearly: Vec<YearlySnapshot>,
    #[serde(skip)]
    observers: Vec<Box<dyn Observer>>,
}

impl Simulation {
    /// Create a new `Simulation` from a validated configuration and a
    /// fixed seed. The same seed always reproduces the same run.
    pub fn new(cfg: Config, seed: u64) -> Result<Self> {
        cfg.validate().context("failed to validate config")?;
        let rng = ChaCha12Rng::seed_from_u64(seed);
        Self::with_rng(cfg, rng)
    }

    /// Create a new `Simulation` seeded from the operating system.
    pub fn from_entropy(cfg: Config) -> Result<Self> {
        cfg.validate().context("failed to validate config")?;
        let rng = ChaCha12Rng::try_from_os_rng().context("failed to seed rng")?;
        Self::with_rng(cfg, rng)
    }

    fn with_rng(cfg: Config, mut rng: ChaCha12Rng) -> Result<Self> {
        let grid = PatchGrid::new(&cfg.grid);

        let sim = &cfg.simulation;
        let mut fishers = Vec::with_capacity(sim.num_archipelago + sim.num_coastal + sim.num_trawler);
        let counts = [
            (Archetype::Archipelago, sim.num_archipelago),
            (Archetype::Coastal, sim.num_coastal),
            (Archetype::Trawler, sim.num_trawler),
        ];
        for (archetype, count) in counts {
            for _ in 0..count {
                let id = fishers.len();
                let fisher = Fisher::new(id, archetype, &cfg, &mut rng)
                    .with_context(|| format!("failed to create fisher {id}"))?;
                fishers.push(fisher);
            }
        }

        Ok(Self {
            cfg,
            grid,
            fishers,
            rng,
            day: 0,
            catch_at_year_start: 0.0,
            last_daily: None,
            yearly: Vec::new(),
            observers: Vec::new(),
        })
    }

    /// Attach an observer receiving daily and yearly snapshots.
    pub fn add_observer(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(observer);
    }

    /// Advance the simulation by `n_days`, never past the configured
    /// horizon.
    ///
    /// Resumable: a simulation loaded from a checkpoint continues from
    /// the day it was saved at.
    pub fn run(&mut self, n_days: u64) -> Result<()> {
        let horizon = self.cfg.simulation.horizon_days;
        let target = self.day.saturating_add(n_days).min(horizon);
        while self.day < target {
            self.step().context("failed to perform step")?;

            if self.cfg.simulation.verbose && self.day % self.cfg.simulation.days_per_log == 0 {
                let progress = 100.0 * self.day as f64 / horizon as f64;
                log::info!("completed {progress:06.2}%");
            }
        }
        Ok(())
    }

    /// Simulate one day.
    ///
    /// Weather is drawn first, then every fisher observes the fleet,
    /// decides, and acts in fixed id order. Snapshots are collected
    /// before the stock regrows so observers see the day's extraction.
    pub fn step(&mut self) -> Result<()> {
        let weather = Bernoulli::new(self.cfg.simulation.bad_weather_probability)
            .context("failed to build weather distribution")?;
        let bad_weather = weather.sample(&mut self.rng);
        let catch_before = self.fleet_catch();

        for index in 0..self.fishers.len() {
            let fleet = FleetView::observe(&self.fishers, self.fishers[index].id);
            self.act(index, &fleet, bad_weather);
        }

        let daily_catch = self.fleet_catch() - catch_before;
        let daily = DailySnapshot::collect(&self.grid, &self.fishers, self.day, bad_weather, daily_catch);
        for observer in &mut self.observers {
            observer
                .on_day(&daily)
                .context("failed to observe daily snapshot")?;
        }
        self.last_daily = Some(daily);

        resource::grow(&mut self.grid, &self.cfg.resource, 1.0);
        self.day += 1;

        if self.day % DAYS_PER_YEAR == 0 {
            self.close_year()?;
        }

        Ok(())
    }

    fn act(&mut self, index: usize, fleet: &FleetView, bad_weather: bool) {
        let day = self.day;
        let fisher = &mut self.fishers[index];
        match decision::decide(fisher, &self.cfg, bad_weather) {
            Decision::StayHome => trip::stay_home(fisher, &self.cfg, day, &mut self.rng),
            Decision::Fish(region) => {
                match decision::select_spot(fisher, &self.grid, fleet, region, &mut self.rng) {
                    Some(location) => {
                        trip::go_fish(fisher, &mut self.grid, &self.cfg, location, day);
                        // Day-trip vessels land and settle the same evening.
                        if !fisher.is_trawler() {
                            trip::return_home_and_land(fisher, &self.cfg, day, &mut self.rng);
                        }
                    }
                    None if fisher.at_sea => {
                        trip::return_home_and_land(fisher, &self.cfg, day, &mut self.rng);
                    }
                    None => trip::stay_home(fisher, &self.cfg, day, &mut self.rng),
                }
            }
            Decision::SwitchRegion(region) => {
                match decision::select_spot(fisher, &self.grid, fleet, region, &mut self.rng) {
                    Some(location) => {
                        trip::jump_to_region(fisher, &self.cfg.economics.travel, region, location);
                        trip::go_fish(fisher, &mut self.grid, &self.cfg, location, day);
                    }
                    None => trip::return_home_and_land(fisher, &self.cfg, day, &mut self.rng),
                }
            }
            Decision::ReturnHome => {
                trip::return_home_and_land(fisher, &self.cfg, day, &mut self.rng);
            }
        }
    }

    fn close_year(&mut self) -> Result<()> {
        let total_catch = self.fleet_catch();
        let yearly_catch = total_catch - self.catch_at_year_start;
        self.catch_at_year_start = total_catch;

        let yearly = YearlySnapshot::collect(&self.grid, &self.fishers, self.day, yearly_catch);
        for observer in &mut self.observers {
            observer
                .on_year(&yearly)
                .context("failed to observe yearly snapshot")?;
        }
        self.yearly.push(yearly);

        let max_age = self.cfg.behavior.spatial_memory_max_age;
        for fisher in &mut self.fishers {
            fisher.memory.forget_old_spots(self.day, max_age);
        }

        Ok(())
    }

    fn fleet_catch(&self) -> f64 {
        self.fishers.iter().map(|fisher| fisher.total_catch).sum()
    }

    /// Save a checkpoint of the entire simulation state.
    ///
    /// Can be used to resume the simulation later.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &self).context("failed to serialize simulation")?;
        Ok(())
    }

    /// Load a previously saved simulation checkpoint.
    pub fn load_checkpoint<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let simulation = decode::from_read(&mut reader).context("failed to deserialize simulation")?;
        Ok(simulation)
    }

    pub fn day(&self) -> u64 {
        self.day
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn grid(&self) -> &PatchGrid {
        &self.grid
    }

    pub fn patch_info(&self, x: u16, y: u16) -> &Patch {
        self.grid.patch(x, y)
    }

    /// Snapshot of the most recently completed day, for exporters
    /// that poll instead of registering an observer.
    pub fn last_daily(&self) -> Option<&DailySnapshot> {
        self.last_daily.as_ref()
    }

    /// Snapshots of every completed year so far.
    pub fn yearly(&self) -> &[YearlySnapshot] {
        &self.yearly
    }

    pub fn fishers(&self) -> &[Fisher] {
        &self.fishers
    }

    pub fn total_stock(&self) -> f64 {
        self.grid.total_stock()
    }

    pub fn region_stock(&self, region: Region) -> f64 {
        self.grid.region_stock(region)
    }

    pub fn fisher_summaries(&self) -> Vec<FisherSummary> {
        self.fishers.iter().map(Fisher::summary).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::SnapshotLog;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn small_config() -> Config {
        let mut cfg = Config::default();
        cfg.simulation.num_archipelago = 4;
        cfg.simulation.num_coastal = 3;
        cfg.simulation.num_trawler = 2;
        cfg.simulation.horizon_days = 30;
        cfg
    }

    struct SharedLog(Rc<RefCell<SnapshotLog>>);

    impl Observer for SharedLog {
        fn on_day(&mut self, snapshot: &DailySnapshot) -> Result<()> {
            self.0.borrow_mut().on_day(snapshot)
        }

        fn on_year(&mut self, snapshot: &YearlySnapshot) -> Result<()> {
            self.0.borrow_mut().on_year(snapshot)
        }
    }

    #[test]
    fn population_matches_the_configuration() {
        let sim = Simulation::new(small_config(), 1).expect("simulation builds");
        assert_eq!(sim.fishers().len(), 9);
        assert_eq!(sim.day(), 0);
        let trawlers = sim
            .fishers()
            .iter()
            .filter(|fisher| fisher.archetype == Archetype::Trawler)
            .count();
        assert_eq!(trawlers, 2);
        // Ids follow vector order.
        for (index, fisher) in sim.fishers().iter().enumerate() {
            assert_eq!(fisher.id, index);
        }
    }

    #[test]
    fn rejects_invalid_configuration() {
        let mut cfg = small_config();
        cfg.simulation.bad_weather_probability = 2.0;
        assert!(Simulation::new(cfg, 1).is_err());
    }

    #[test]
    fn a_run_reaches_the_horizon_and_reports_every_day() {
        let log = Rc::new(RefCell::new(SnapshotLog::default()));
        let mut sim = Simulation::new(small_config(), 42).expect("simulation builds");
        sim.add_observer(Box::new(SharedLog(Rc::clone(&log))));
        sim.run(30).expect("run completes");

        assert_eq!(sim.day(), 30);
        let last = sim.last_daily().expect("a day was simulated");
        assert_eq!(last.day, 29);
        let log = log.borrow();
        assert_eq!(log.daily.len(), 30);
        assert!(log.yearly.is_empty());
        assert_eq!(log.daily[0].day, 0);
        assert_eq!(log.daily[29], *last);
        let fleet_catch: f64 = sim.fishers().iter().map(|f| f.total_catch).sum();
        let reported: f64 = log.daily.iter().map(|d| d.daily_catch).sum();
        assert!((fleet_catch - reported).abs() < 1e-9);
    }

    #[test]
    fn the_stock_never_exceeds_capacity() {
        let mut cfg = small_config();
        cfg.simulation.horizon_days = 120;
        let mut sim = Simulation::new(cfg, 7).expect("simulation builds");
        let capacity: f64 = crate::grid::FISHABLE_REGIONS
            .iter()
            .map(|&region| sim.grid().region_capacity(region))
            .sum();
        for _ in 0..120 {
            sim.step().expect("step succeeds");
            assert!(sim.total_stock() <= capacity + 1e-6);
            for patch in sim.grid().patches() {
                assert!(patch.fish_stock >= 0.0);
            }
        }
    }

    #[test]
    fn a_year_boundary_emits_a_yearly_snapshot_and_prunes_memory() {
        let log = Rc::new(RefCell::new(SnapshotLog::default()));
        let mut cfg = small_config();
        cfg.simulation.horizon_days = 365;
        cfg.behavior.spatial_memory_max_age = 60;
        let mut sim = Simulation::new(cfg, 3).expect("simulation builds");
        sim.add_observer(Box::new(SharedLog(Rc::clone(&log))));
        sim.run(365).expect("run completes");

        assert_eq!(sim.yearly().len(), 1);
        let log = log.borrow();
        assert_eq!(log.yearly.len(), 1);
        let year = &log.yearly[0];
        assert_eq!(year.year, 1);
        assert_eq!(year.num_agents, 9);
        assert!((year.yearly_catch - year.total_catch).abs() < 1e-9);
        for fisher in sim.fishers() {
            for (_, spot) in fisher.memory.good_spots(sim.grid(), None, 0, usize::MAX) {
                assert!(365 - spot.last_visit <= 60);
            }
        }
    }

    #[test]
    fn run_never_advances_past_the_horizon() {
        let mut sim = Simulation::new(small_config(), 8).expect("simulation builds");
        sim.run(7).expect("run completes");
        assert_eq!(sim.day(), 7);
        sim.run(u64::MAX).expect("run completes");
        assert_eq!(sim.day(), 30);
    }

    #[test]
    fn equal_seeds_reproduce_the_same_run() {
        let mut first = Simulation::new(small_config(), 11).expect("simulation builds");
        let mut second = Simulation::new(small_config(), 11).expect("simulation builds");
        first.run(30).expect("run completes");
        second.run(30).expect("run completes");
        assert_eq!(first.fishers(), second.fishers());
        assert_eq!(first.grid(), second.grid());

        let mut other = Simulation::new(small_config(), 12).expect("simulation builds");
        other.run(30).expect("run completes");
        assert!(other.fishers() != first.fishers() || other.grid() != first.grid());
    }

    #[test]
    fn a_checkpoint_resumes_exactly_where_it_left_off() {
        let dir = std::env::temp_dir().join("fibe-engine-test");
        std::fs::create_dir_all(&dir).expect("temp dir");
        let file = dir.join("checkpoint.msgpack");

        let mut cfg = small_config();
        cfg.simulation.horizon_days = 40;
        let mut reference = Simulation::new(cfg.clone(), 5).expect("simulation builds");
        reference.run(40).expect("run completes");

        let mut sim = Simulation::new(cfg, 5).expect("simulation builds");
        for _ in 0..20 {
            sim.step().expect("step succeeds");
        }
        sim.save_checkpoint(&file).expect("checkpoint saves");

        let mut resumed = Simulation::load_checkpoint(&file).expect("checkpoint loads");
        assert_eq!(resumed.day(), 20);
        resumed.run(20).expect("run completes");

        assert_eq!(resumed.day(), reference.day());
        assert_eq!(resumed.fishers(), reference.fishers());
        assert_eq!(resumed.grid(), reference.grid());
        std::fs::remove_file(&file).ok();
    }
}
