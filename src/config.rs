use crate::grid::Region;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Every tunable constant of the model lives here. [`Config::default`]
/// carries the reference parameter set; [`Config::from_file`] loads a
/// TOML file and validates it before use.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub grid: GridConfig,
    pub resource: ResourceConfig,
    pub economics: EconomicsConfig,
    pub behavior: BehaviorConfig,
    pub archetypes: ArchetypeTable,
}

/// Run-level parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulation horizon in days.
    pub horizon_days: u64,
    /// Number of archipelago fishers.
    pub num_archipelago: usize,
    /// Number of coastal fishers.
    pub num_coastal: usize,
    /// Number of trawler fishers.
    pub num_trawler: usize,
    /// Daily probability of bad weather.
    pub bad_weather_probability: f64,
    /// Emit progress logs while running.
    pub verbose: bool,
    /// Number of days between progress logs.
    pub days_per_log: u64,
}

/// Axis-aligned cell rectangle, half-open on both axes.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct Rect {
    pub x_min: u16,
    pub x_max: u16,
    pub y_min: u16,
    pub y_max: u16,
}

impl Rect {
    pub const fn new(x_min: u16, x_max: u16, y_min: u16, y_max: u16) -> Self {
        Self { x_min, x_max, y_min, y_max }
    }

    pub fn contains(&self, x: u16, y: u16) -> bool {
        self.x_min <= x && x < self.x_max && self.y_min <= y && y < self.y_max
    }
}

/// Spatial layout of the fishery.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Grid width in cells.
    pub width: u16,
    /// Grid height in cells.
    pub height: u16,

    /// Archipelago zone.
    pub region_a: Rect,
    /// Inner coastal zone.
    pub region_b: Rect,
    /// Outer coastal zone.
    pub region_c: Rect,
    /// Open sea zone.
    pub region_d: Rect,
    /// Non-fishable land zone.
    pub land: Rect,

    /// High-density cluster centers per region.
    pub hotspots_a: Vec<(u16, u16)>,
    pub hotspots_b: Vec<(u16, u16)>,
    pub hotspots_c: Vec<(u16, u16)>,
    pub hotspots_d: Vec<(u16, u16)>,

    /// Carrying capacity of a low-density patch.
    pub capacity_low: f64,
    /// Carrying capacity of a medium-density patch.
    pub capacity_medium: f64,
    /// Carrying capacity of a high-density patch.
    pub capacity_high: f64,
}

/// Capacity clamping strictness for daily regrowth.
///
/// `Regional` scales proposed growth so the regional aggregate never
/// exceeds the regional capacity, letting a single patch transiently
/// exceed its own nominal capacity. `PerPatch` additionally caps every
/// patch at its own capacity.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampMode {
    #[default]
    Regional,
    PerPatch,
}

/// Stock regrowth parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Annual logistic growth rate.
    pub annual_growth_rate: f64,
    /// Regrowth multiplier for low-density patches.
    pub density_mult_low: f64,
    /// Regrowth multiplier for medium-density patches.
    pub density_mult_medium: f64,
    /// Regrowth multiplier for high-density patches.
    pub density_mult_high: f64,
    /// Capacity clamping strictness.
    pub clamp_mode: ClampMode,
}

/// Per-region travel cost table.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TravelCosts {
    /// Travel to region A.
    pub region_a: f64,
    /// Travel to region B.
    pub region_b: f64,
    /// Travel to region B with a large vessel.
    pub region_b_large_vessel: f64,
    /// Travel to region C or D.
    pub region_cd: f64,
    /// Multiplier applied when switching regions mid-trip.
    pub inter_region_multiplier: f64,
    /// Cost per unit of euclidean distance between two known points.
    pub per_unit_distance: f64,
}

/// Market and solvency parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomicsConfig {
    /// Market price per unit of fish.
    pub fish_price: f64,
    /// Starting capital of every fisher.
    pub initial_capital: f64,
    /// Minimum initial fisher age.
    pub min_age: u32,
    /// Maximum initial fisher age.
    pub max_age: u32,
    /// Years of existence costs below zero before bankruptcy.
    pub bankruptcy_threshold_years: f64,
    /// Lay-low duration after bankruptcy, in days.
    pub bankruptcy_lay_low_days: u32,
    /// Probability of laying low when capital is negative.
    pub negative_capital_lay_low_probability: f64,
    /// Lay-low duration on negative capital, in days.
    pub negative_capital_lay_low_days: u32,
    /// Days of existence costs kept as affordability buffer.
    pub safety_buffer_days: f64,
    pub travel: TravelCosts,
}

/// Memory and decision thresholds shared by all archetypes.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Temporal memory capacity, in trips.
    pub memory_size: usize,
    /// Age in days after which a remembered spot is forgotten.
    pub spatial_memory_max_age: u64,
    /// Home satisfaction level below which a coastal fisher goes out.
    pub satisfaction_home_threshold: f64,
    /// Growth satisfaction level above which a coastal fisher goes out.
    pub satisfaction_growth_threshold: f64,
    /// Perceived catch trend below twice this value reads as scarcity.
    pub scarce_perception_threshold: f64,
    /// Catch fraction of expectation for a spot to count as good.
    pub good_spot_efficiency_threshold: f64,
    /// Trips in the recent perception window.
    pub recent_window: usize,
    /// Trips in the older perception window.
    pub older_window: usize,
    /// Trips summed for the weekly need comparison.
    pub weekly_window: usize,
    /// Trips inspected for home satisfaction.
    pub biweekly_window: usize,
    /// Trips inspected for regional catch expectations.
    pub monthly_window: usize,
    /// Catch-to-catchability ratio below which fish read as scarce.
    pub scarcity_catch_ratio: f64,
    /// Fishing trips required before scarcity can be perceived.
    pub scarcity_min_memory: usize,
    /// Trips before a coastal fisher leaves the exploration phase.
    pub exploration_phase_trips: usize,
    /// Days of existence costs a trawler trip must clear to depart.
    pub trawler_profit_threshold_days: f64,
    /// Expected catch fraction of catchability with no regional memory.
    pub expected_catch_default_fraction: f64,
    /// Same default for the trawler lookahead.
    pub trawler_expected_catch_default_fraction: f64,
}

/// Fixed parameters of one behavioral archetype.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ArchetypeParams {
    /// Daily existence cost.
    pub cost_existence: f64,
    /// Cost of one day of fishing activity.
    pub cost_activity: f64,
    /// Maximum fish extracted per fishing action.
    pub catchability: f64,
    /// Regions this archetype may fish in.
    pub accessible_regions: Vec<Region>,
    /// Maximum good spots returned by spatial memory queries.
    pub max_good_spots: usize,
    /// Onboard storage capacity, zero for day-trip vessels.
    pub storage_capacity: f64,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchetypeTable {
    pub archipelago: ArchetypeParams,
    pub coastal: ArchetypeParams,
    pub trawler: ArchetypeParams,
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// Missing sections and fields fall back to the reference defaults.
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let text = fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&text).context("failed to parse config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        check_num(sim.horizon_days, 1..1_000_000).context("invalid simulation horizon")?;
        check_num(sim.bad_weather_probability, 0.0..=1.0)
            .context("invalid bad weather probability")?;
        check_num(sim.days_per_log, 1..).context("invalid log interval")?;
        check_num(
            sim.num_archipelago + sim.num_coastal + sim.num_trawler,
            1..100_000,
        )
        .context("invalid population size")?;

        let grid = &self.grid;
        check_num(grid.width, 1..1000).context("invalid grid width")?;
        check_num(grid.height, 1..1000).context("invalid grid height")?;
        check_num(grid.capacity_low, 0.0..).context("invalid low capacity")?;
        check_num(grid.capacity_medium, 0.0..).context("invalid medium capacity")?;
        check_num(grid.capacity_high, 0.0..).context("invalid high capacity")?;
        for rect in [
            grid.region_a,
            grid.region_b,
            grid.region_c,
            grid.region_d,
            grid.land,
        ] {
            check_rect(rect, grid.width, grid.height)?;
        }

        let res = &self.resource;
        check_num(res.annual_growth_rate, 0.0..10.0).context("invalid growth rate")?;
        for mult in [
            res.density_mult_low,
            res.density_mult_medium,
            res.density_mult_high,
        ] {
            check_num(mult, 0.0..).context("invalid density multiplier")?;
        }

        let eco = &self.economics;
        check_num(eco.fish_price, 0.0..).context("invalid fish price")?;
        check_num(eco.min_age, 0..eco.max_age).context("invalid age range")?;
        check_num(eco.bankruptcy_threshold_years, 0.0..).context("invalid bankruptcy threshold")?;
        check_num(eco.negative_capital_lay_low_probability, 0.0..=1.0)
            .context("invalid lay-low probability")?;
        check_num(eco.travel.inter_region_multiplier, 0.0..=1.0)
            .context("invalid inter-region multiplier")?;

        let beh = &self.behavior;
        check_num(beh.memory_size, 1..1000).context("invalid memory size")?;
        check_num(beh.spatial_memory_max_age, 1..).context("invalid spatial memory age")?;
        check_num(beh.satisfaction_home_threshold, 0.0..=1.0)
            .context("invalid home satisfaction threshold")?;
        check_num(beh.satisfaction_growth_threshold, 0.0..=1.0)
            .context("invalid growth satisfaction threshold")?;
        check_num(beh.good_spot_efficiency_threshold, 0.0..=1.0)
            .context("invalid good spot threshold")?;
        check_num(beh.scarcity_catch_ratio, 0.0..=1.0).context("invalid scarcity ratio")?;

        for (name, params) in [
            ("archipelago", &self.archetypes.archipelago),
            ("coastal", &self.archetypes.coastal),
            ("trawler", &self.archetypes.trawler),
        ] {
            params
                .validate()
                .with_context(|| format!("invalid {name} parameters"))?;
        }

        Ok(())
    }
}

impl ArchetypeParams {
    fn validate(&self) -> Result<()> {
        check_num(self.cost_existence, 0.0..).context("invalid existence cost")?;
        check_num(self.cost_activity, 0.0..).context("invalid activity cost")?;
        check_num(self.catchability, 0.0..).context("invalid catchability")?;
        check_num(self.storage_capacity, 0.0..).context("invalid storage capacity")?;
        if self.accessible_regions.is_empty() {
            bail!("accessible regions must not be empty");
        }
        if self
            .accessible_regions
            .iter()
            .any(|region| !region.is_fishable())
        {
            bail!("accessible regions must be fishable");
        }
        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_rect(rect: Rect, width: u16, height: u16) -> Result<()> {
    if rect.x_min >= rect.x_max || rect.y_min >= rect.y_max {
        bail!("rectangle {rect:?} is empty");
    }
    if rect.x_max > width || rect.y_max > height {
        bail!("rectangle {rect:?} exceeds the {width}x{height} grid");
    }
    Ok(())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            grid: GridConfig::default(),
            resource: ResourceConfig::default(),
            economics: EconomicsConfig::default(),
            behavior: BehaviorConfig::default(),
            archetypes: ArchetypeTable::default(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            horizon_days: 10 * 365,
            num_archipelago: 20,
            num_coastal: 10,
            num_trawler: 5,
            bad_weather_probability: 0.1,
            verbose: false,
            days_per_log: 365,
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 50,
            height: 56,
            region_a: Rect::new(0, 25, 0, 8),
            region_b: Rect::new(0, 25, 8, 24),
            region_c: Rect::new(0, 25, 24, 56),
            region_d: Rect::new(25, 50, 24, 56),
            land: Rect::new(25, 50, 0, 24),
            hotspots_a: vec![(7, 3), (16, 3), (3, 3), (10, 7)],
            hotspots_b: vec![(3, 19), (8, 11), (19, 11), (15, 19)],
            hotspots_c: vec![
                (4, 51),
                (21, 51),
                (13, 45),
                (3, 39),
                (12, 36),
                (22, 40),
                (7, 27),
                (19, 27),
            ],
            hotspots_d: vec![
                (30, 51),
                (47, 51),
                (37, 45),
                (29, 39),
                (46, 39),
                (37, 33),
                (31, 27),
                (44, 27),
            ],
            capacity_low: 4.0,
            capacity_medium: 3276.0,
            capacity_high: 873_600.0,
        }
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            annual_growth_rate: 0.1,
            density_mult_low: 1.0,
            density_mult_medium: 1.25,
            density_mult_high: 2.0,
            clamp_mode: ClampMode::Regional,
        }
    }
}

impl Default for TravelCosts {
    fn default() -> Self {
        Self {
            region_a: 2.5,
            region_b: 5.0,
            region_b_large_vessel: 8.0,
            region_cd: 15.0,
            inter_region_multiplier: 0.5,
            per_unit_distance: 1.0,
        }
    }
}

impl Default for EconomicsConfig {
    fn default() -> Self {
        Self {
            fish_price: 10.0,
            initial_capital: 1000.0,
            min_age: 18,
            max_age: 65,
            bankruptcy_threshold_years: 1.0,
            bankruptcy_lay_low_days: 30,
            negative_capital_lay_low_probability: 0.3,
            negative_capital_lay_low_days: 7,
            safety_buffer_days: 7.0,
            travel: TravelCosts::default(),
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            memory_size: 10,
            spatial_memory_max_age: 2 * 365,
            satisfaction_home_threshold: 0.5,
            satisfaction_growth_threshold: 0.6,
            scarce_perception_threshold: -0.05,
            good_spot_efficiency_threshold: 0.7,
            recent_window: 5,
            older_window: 10,
            weekly_window: 7,
            biweekly_window: 14,
            monthly_window: 30,
            scarcity_catch_ratio: 0.5,
            scarcity_min_memory: 10,
            exploration_phase_trips: 5,
            trawler_profit_threshold_days: 3.0,
            expected_catch_default_fraction: 0.8,
            trawler_expected_catch_default_fraction: 0.6,
        }
    }
}

impl Default for ArchetypeTable {
    fn default() -> Self {
        Self {
            archipelago: ArchetypeParams {
                cost_existence: 0.5,
                cost_activity: 0.5,
                catchability: 5.0,
                accessible_regions: vec![Region::A],
                max_good_spots: 5,
                storage_capacity: 0.0,
            },
            coastal: ArchetypeParams {
                cost_existence: 1.0,
                cost_activity: 1.0,
                catchability: 10.0,
                accessible_regions: vec![Region::A, Region::B],
                max_good_spots: 3,
                storage_capacity: 0.0,
            },
            trawler: ArchetypeParams {
                cost_existence: 5.0,
                cost_activity: 5.0,
                catchability: 50.0,
                accessible_regions: vec![Region::A, Region::B, Region::C, Region::D],
                max_good_spots: 2,
                storage_capacity: 5000.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().expect("defaults must validate");
    }

    #[test]
    fn rejects_out_of_range_probability() {
        let mut config = Config::default();
        config.simulation.bad_weather_probability = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_population() {
        let mut config = Config::default();
        config.simulation.num_archipelago = 0;
        config.simulation.num_coastal = 0;
        config.simulation.num_trawler = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_region_outside_grid() {
        let mut config = Config::default();
        config.grid.region_d = Rect::new(25, 60, 24, 56);
        assert!(config.validate().is_err());
    }
}
