use crate::config::{ArchetypeParams, Config};
use crate::finance::FinancialLedger;
use crate::grid::Region;
use crate::memory::AgentMemory;
use anyhow::{Context, Result};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

/// Behavioral archetype of a fisher.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Archetype {
    /// Satisficer fishing its home region for subsistence.
    Archipelago,
    /// Lifestyle and growth optimizer on day trips.
    Coastal,
    /// Profit maximizer running multi-day trips with onboard storage.
    Trawler,
}

/// How a fisher picks the exact cell to fish within a chosen region.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpotStrategy {
    /// Own spatial memory, exploring a random hotspot when it is empty.
    #[default]
    Knowledge,
    /// Mimic the most successful fisher currently out in the region.
    Expertise,
    /// Join the most crowded spot in the region.
    DescriptiveNorm,
    /// Step to the richest adjacent cell; trawlers with sonar only.
    UphillClimbing,
}

/// One economic agent.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Fisher {
    pub id: usize,
    pub archetype: Archetype,
    pub age: u32,
    pub params: ArchetypeParams,
    pub ledger: FinancialLedger,
    pub memory: AgentMemory,

    pub at_home: bool,
    pub at_sea: bool,
    /// Out fishing today; drives the social spot strategies.
    pub gone_fishing: bool,
    pub location: Option<(u16, u16)>,
    pub region: Option<Region>,
    pub region_preference: Option<Region>,

    pub spot_strategy: SpotStrategy,
    pub has_technology: bool,

    pub total_catch: f64,
    pub days_at_sea: u64,

    /// Catch accumulated onboard during the current trip.
    pub fish_onboard: f64,
    /// Costs accumulated during the current trip.
    pub trip_cost: f64,
    pub days_at_sea_current_trip: u32,
    /// Set when the current trip switched regions at sea.
    pub jumped_region: bool,
}

impl Fisher {
    pub fn new<R: Rng>(id: usize, archetype: Archetype, cfg: &Config, rng: &mut R) -> Result<Self> {
        let params = match archetype {
            Archetype::Archipelago => cfg.archetypes.archipelago.clone(),
            Archetype::Coastal => cfg.archetypes.coastal.clone(),
            Archetype::Trawler => cfg.archetypes.trawler.clone(),
        };
        let ages = Uniform::new_inclusive(cfg.economics.min_age, cfg.economics.max_age)
            .context("failed to build age distribution")?;
        Ok(Self {
            id,
            archetype,
            age: ages.sample(rng),
            params,
            ledger: FinancialLedger::new(cfg.economics.initial_capital),
            memory: AgentMemory::new(cfg.behavior.memory_size),
            at_home: true,
            at_sea: false,
            gone_fishing: false,
            location: None,
            region: None,
            region_preference: None,
            spot_strategy: SpotStrategy::default(),
            has_technology: false,
            total_catch: 0.0,
            days_at_sea: 0,
            fish_onboard: 0.0,
            trip_cost: 0.0,
            days_at_sea_current_trip: 0,
            jumped_region: false,
        })
    }

    pub fn is_trawler(&self) -> bool {
        self.archetype == Archetype::Trawler
    }

    pub fn storage_full(&self) -> bool {
        self.is_trawler() && self.fish_onboard >= self.params.storage_capacity
    }

    pub fn summary(&self) -> FisherSummary {
        FisherSummary {
            id: self.id,
            archetype: self.archetype,
            age: self.age,
            capital: self.ledger.capital,
            wealth: self.ledger.wealth,
            total_catch: self.total_catch,
            total_revenue: self.ledger.total_revenue,
            total_cost: self.ledger.total_cost,
            total_profit: self.ledger.total_profit,
            profitable_trips: self.ledger.profitable_trips,
            unprofitable_trips: self.ledger.unprofitable_trips,
            days_at_sea: self.days_at_sea,
            at_home: self.at_home,
            at_sea: self.at_sea,
            bankrupt: self.ledger.bankrupt,
            lay_low: self.ledger.lay_low,
            memory_len: self.memory.len(),
            known_spots: self.memory.spot_count(),
        }
    }
}

/// Read-only per-agent state exposed to external exporters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct FisherSummary {
    pub id: usize,
    pub archetype: Archetype,
    pub age: u32,
    pub capital: f64,
    pub wealth: f64,
    pub total_catch: f64,
    pub total_revenue: f64,
    pub total_cost: f64,
    pub total_profit: f64,
    pub profitable_trips: u64,
    pub unprofitable_trips: u64,
    pub days_at_sea: u64,
    pub at_home: bool,
    pub at_sea: bool,
    pub bankrupt: bool,
    pub lay_low: bool,
    pub memory_len: usize,
    pub known_spots: usize,
}
