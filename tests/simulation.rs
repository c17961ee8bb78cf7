use anyhow::Result;
use fibe::report::{DailySnapshot, Observer, SnapshotLog, YearlySnapshot};
use fibe::{Config, Simulation};
use std::cell::RefCell;
use std::rc::Rc;
use std::{fs, path::PathBuf};

fn init_logs() {
    let _ = env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .is_test(true)
        .try_init();
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
fn an_archipelago_fleet_lives_within_its_means() {
    let mut cfg = Config::default();
    cfg.simulation.num_archipelago = 5;
    cfg.simulation.num_coastal = 0;
    cfg.simulation.num_trawler = 0;
    cfg.simulation.bad_weather_probability = 0.0;
    cfg.simulation.horizon_days = 30;

    let mut sim = Simulation::new(cfg, 9).expect("failed to build simulation");
    sim.run(30).expect("failed to run simulation");
    assert_eq!(sim.day(), 30);

    for fisher in sim.fishers() {
        // Day trips always end ashore with the hold emptied.
        assert!(fisher.at_home);
        assert_eq!(fisher.fish_onboard, 0.0);
        assert!(fisher.days_at_sea <= 30);
        assert!(fisher.total_catch <= 5.0 * fisher.days_at_sea as f64 + 1e-9);

        let ledger = &fisher.ledger;
        assert!((ledger.total_revenue - 10.0 * fisher.total_catch).abs() < 1e-9);
        for trip in fisher.memory.trips() {
            assert!(trip.region.is_none() || trip.region == Some(fibe::grid::Region::A));
        }
    }
}

#[test]
fn a_lone_satisficer_remembers_every_catch() {
    let mut cfg = Config::default();
    cfg.simulation.num_archipelago = 1;
    cfg.simulation.num_coastal = 0;
    cfg.simulation.num_trawler = 0;
    cfg.simulation.bad_weather_probability = 0.0;
    cfg.simulation.horizon_days = 30;
    // Hold the whole month so no record is evicted.
    cfg.behavior.memory_size = 40;

    let mut sim = Simulation::new(cfg, 13).expect("failed to build simulation");
    sim.run(30).expect("failed to run simulation");

    let fisher = &sim.fishers()[0];
    assert!(fisher.total_catch <= 150.0 + 1e-9);
    let remembered: f64 = fisher.memory.trips().map(|trip| trip.catch).sum();
    assert!((fisher.total_catch - remembered).abs() < 1e-9);

    let last = sim.last_daily().expect("a day was simulated");
    assert_eq!(last.day, 29);
    assert!((last.cumulative_catch - fisher.total_catch).abs() < 1e-9);
    assert_eq!(sim.patch_info(7, 3).region, fibe::grid::Region::A);
}

#[test]
fn trawlers_land_before_overflowing_storage() {
    let mut cfg = Config::default();
    cfg.simulation.num_archipelago = 0;
    cfg.simulation.num_coastal = 0;
    cfg.simulation.num_trawler = 3;
    cfg.archetypes.trawler.storage_capacity = 120.0;

    let mut sim = Simulation::new(cfg, 21).expect("failed to build simulation");
    for _ in 0..120 {
        sim.step().expect("failed to perform step");
        for fisher in sim.fishers() {
            // A full hold forces a landing before the next haul.
            assert!(fisher.fish_onboard <= 120.0 + fisher.params.catchability);
        }
    }

    for fisher in sim.fishers() {
        let trips = fisher.ledger.profitable_trips + fisher.ledger.unprofitable_trips;
        assert!(trips > 0, "trawler {} never landed a trip", fisher.id);
    }
}

#[test]
fn a_mixed_fishery_runs_three_years() {
    init_logs();
    let log = Rc::new(RefCell::new(SnapshotLog::default()));
    let mut cfg = Config::default();
    cfg.simulation.num_archipelago = 8;
    cfg.simulation.num_coastal = 4;
    cfg.simulation.num_trawler = 2;
    cfg.simulation.horizon_days = 3 * 365;
    cfg.simulation.verbose = true;

    let mut sim = Simulation::new(cfg, 4).expect("failed to build simulation");
    sim.add_observer(Box::new(SharedLog(Rc::clone(&log))));
    sim.run(3 * 365).expect("failed to run simulation");

    let log = log.borrow();
    assert_eq!(log.daily.len(), 3 * 365);
    assert_eq!(log.yearly.len(), 3);

    for daily in &log.daily {
        assert!(daily.daily_catch >= 0.0);
        assert!(daily.total_stock >= 0.0);
    }
    for yearly in &log.yearly {
        assert_eq!(yearly.num_agents, 14);
        assert!(yearly.yearly_catch >= 0.0);
        for gini in [yearly.gini_capital, yearly.gini_wealth, yearly.gini_catch] {
            assert!((0.0..=1.0).contains(&gini), "gini out of range: {gini}");
        }
    }

    for fisher in sim.fishers() {
        let ledger = &fisher.ledger;
        let balance = ledger.total_revenue - ledger.total_cost;
        assert!((ledger.total_profit - balance).abs() < 1e-6);
        // Shore days only ever drain capital below the settled profits.
        assert!(ledger.capital <= 1000.0 + ledger.total_profit + 1e-6);
    }
}

#[test]
fn a_configuration_file_drives_the_run() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("config_run");
    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");

    let config_path = test_dir.join("config.toml");
    let config_contents = String::new()
        + "[simulation]\n"
        + "horizon_days = 60\n"
        + "num_archipelago = 2\n"
        + "num_coastal = 1\n"
        + "num_trawler = 1\n"
        + "bad_weather_probability = 0.05\n"
        + "\n"
        + "[economics]\n"
        + "fish_price = 12.5\n"
        + "\n"
        + "[economics.travel]\n"
        + "region_a = 3.0\n"
        + "\n"
        + "[behavior]\n"
        + "memory_size = 6\n";
    fs::write(&config_path, config_contents).expect("failed to write config file");

    let cfg = Config::from_file(&config_path).expect("failed to load config");
    assert_eq!(cfg.simulation.horizon_days, 60);
    assert_eq!(cfg.economics.fish_price, 12.5);
    assert_eq!(cfg.economics.travel.region_a, 3.0);
    // Unset fields keep the reference defaults.
    assert_eq!(cfg.economics.travel.region_b, 5.0);
    assert_eq!(cfg.behavior.memory_size, 6);
    assert_eq!(cfg.grid.width, 50);

    let mut sim = Simulation::new(cfg, 2).expect("failed to build simulation");
    sim.run(60).expect("failed to run simulation");
    assert_eq!(sim.day(), 60);

    let bad_path = test_dir.join("bad.toml");
    fs::write(&bad_path, "[simulation]\nbad_weather_probability = 1.5\n")
        .expect("failed to write config file");
    assert!(Config::from_file(&bad_path).is_err());

    fs::remove_dir_all(&test_dir).ok();
}

#[test]
fn a_checkpoint_survives_a_cold_restart() {
    let test_dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("checkpoint_restart");
    fs::remove_dir_all(&test_dir).ok();
    fs::create_dir(&test_dir).expect("failed to create test directory");
    let checkpoint = test_dir.join("sim.msgpack");

    let mut cfg = Config::default();
    cfg.simulation.num_archipelago = 3;
    cfg.simulation.num_coastal = 2;
    cfg.simulation.num_trawler = 1;
    cfg.simulation.horizon_days = 100;

    let mut reference = Simulation::new(cfg.clone(), 17).expect("failed to build simulation");
    reference.run(100).expect("failed to run simulation");

    let mut sim = Simulation::new(cfg, 17).expect("failed to build simulation");
    for _ in 0..50 {
        sim.step().expect("failed to perform step");
    }
    sim.save_checkpoint(&checkpoint).expect("failed to save checkpoint");
    drop(sim);

    let mut resumed = Simulation::load_checkpoint(&checkpoint).expect("failed to load checkpoint");
    assert_eq!(resumed.day(), 50);
    resumed.run(50).expect("failed to run simulation");

    assert_eq!(resumed.day(), reference.day());
    assert_eq!(resumed.fishers(), reference.fishers());
    assert_eq!(resumed.grid(), reference.grid());

    fs::remove_dir_all(&test_dir).ok();
}
