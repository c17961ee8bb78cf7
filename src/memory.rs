use crate::grid::{PatchGrid, Region};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// One day of activity as the fisher remembers it.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct TripRecord {
    /// Fishing spot, `None` for a day spent at home.
    pub location: Option<(u16, u16)>,
    pub catch: f64,
    pub cost: f64,
    pub profit: f64,
    /// Days covered by this record.
    pub days: u32,
    /// Simulation day the record was made.
    pub day: u64,
    pub region: Option<Region>,
    pub went_fishing: bool,
}

impl TripRecord {
    /// Record for a day spent ashore.
    pub fn home_day(day: u64, cost: f64) -> Self {
        Self {
            location: None,
            catch: 0.0,
            cost,
            profit: -cost,
            days: 1,
            day,
            region: None,
            went_fishing: false,
        }
    }
}

/// What a fisher knows about one spot it has fished.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SpotMemory {
    /// Running mean catch over all visits.
    pub avg_catch: f64,
    pub visits: u32,
    /// Simulation day of the most recent visit.
    pub last_visit: u64,
    /// Catch relative to expectation on the most recent visit.
    pub efficiency: f64,
    pub is_good: bool,
}

/// Summary of the temporal memory contents.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct MemoryStatistics {
    pub total_trips: usize,
    pub avg_profit: f64,
    pub avg_catch: f64,
    pub success_rate: f64,
    pub best_location: Option<(u16, u16)>,
}

/// Bounded temporal trip log plus a decaying spatial cache of good
/// fishing spots.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct AgentMemory {
    trips: VecDeque<TripRecord>,
    capacity: usize,
    spots: BTreeMap<(u16, u16), SpotMemory>,
}

impl AgentMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            trips: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            spots: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    pub fn trips(&self) -> impl Iterator<Item = &TripRecord> {
        self.trips.iter()
    }

    pub fn spot_count(&self) -> usize {
        self.spots.len()
    }

    pub fn spot(&self, location: (u16, u16)) -> Option<&SpotMemory> {
        self.spots.get(&location)
    }

    /// Append a trip, evicting the oldest record once full.
    pub fn record_trip(&mut self, record: TripRecord) {
        self.trips.push_back(record);
        while self.trips.len() > self.capacity {
            self.trips.pop_front();
        }
    }

    /// The last `n` records, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &TripRecord> {
        self.trips.iter().skip(self.trips.len().saturating_sub(n))
    }

    /// Sum of catches over the last `n` records.
    pub fn catches_over_last(&self, n: usize) -> f64 {
        self.recent(n).map(|trip| trip.catch).sum()
    }

    /// Relative change of recent mean catch against the preceding
    /// window. Zero until both windows are filled or when the older
    /// window caught nothing.
    pub fn growth_perception(&self, recent_window: usize, older_window: usize) -> f64 {
        if self.trips.len() < older_window {
            return 0.0;
        }
        let catches: Vec<f64> = self
            .recent(older_window)
            .map(|trip| trip.catch)
            .collect();
        let split = older_window - recent_window;
        let older_mean = mean(&catches[..split]);
        let recent_mean = mean(&catches[split..]);
        if older_mean == 0.0 {
            return 0.0;
        }
        (recent_mean - older_mean) / older_mean
    }

    /// Whether recent fishing days suggest the stock is thin: the mean
    /// catch over the last `min_trips` fishing days falls below
    /// `ratio_threshold` of catchability. Needs a full window of
    /// fishing days to trigger.
    pub fn perceives_scarcity(
        &self,
        catchability: f64,
        ratio_threshold: f64,
        min_trips: usize,
    ) -> bool {
        if catchability <= 0.0 {
            return false;
        }
        let catches: Vec<f64> = self
            .trips
            .iter()
            .rev()
            .filter(|trip| trip.went_fishing)
            .take(min_trips)
            .map(|trip| trip.catch)
            .collect();
        if catches.len() < min_trips {
            return false;
        }
        mean(&catches) / catchability < ratio_threshold
    }

    /// Fraction of the last `window` records that were not fishing
    /// days; 1 when the memory is empty.
    pub fn home_satisfaction(&self, window: usize) -> f64 {
        let inspected: Vec<&TripRecord> = self.recent(window).collect();
        if inspected.is_empty() {
            return 1.0;
        }
        let fishing = inspected.iter().filter(|trip| trip.went_fishing).count();
        1.0 - fishing as f64 / inspected.len() as f64
    }

    /// Mean catch over the last `window` fishing records in `region`,
    /// or `default` when the region is unknown to this fisher.
    pub fn expected_catch_in(&self, region: Region, window: usize, default: f64) -> f64 {
        let catches: Vec<f64> = self
            .trips
            .iter()
            .rev()
            .filter(|trip| trip.went_fishing && trip.region == Some(region))
            .take(window)
            .map(|trip| trip.catch)
            .collect();
        if catches.is_empty() {
            return default;
        }
        mean(&catches)
    }

    /// Fold one visit into the spatial cache.
    pub fn record_visit(
        &mut self,
        location: (u16, u16),
        catch: f64,
        expected_catch: f64,
        day: u64,
        efficiency_threshold: f64,
    ) {
        let efficiency = if expected_catch > 0.0 {
            catch / expected_catch
        } else {
            0.0
        };

        let spot = self
            .spots
            .entry(location)
            .and_modify(|spot| {
                let visits = f64::from(spot.visits);
                spot.avg_catch = (spot.avg_catch * visits + catch) / (visits + 1.0);
                spot.visits += 1;
            })
            .or_insert(SpotMemory {
                avg_catch: catch,
                visits: 1,
                last_visit: day,
                efficiency,
                is_good: false,
            });
        spot.last_visit = day;
        spot.efficiency = efficiency;
        spot.is_good = efficiency >= efficiency_threshold;
    }

    /// Remembered good spots, best first. Filters by minimum visits and
    /// (optionally) by the owning region of the spot, and caps the
    /// result at `max_spots`.
    pub fn good_spots(
        &self,
        grid: &PatchGrid,
        region: Option<Region>,
        min_visits: u32,
        max_spots: usize,
    ) -> Vec<((u16, u16), &SpotMemory)> {
        let mut spots: Vec<((u16, u16), &SpotMemory)> = self
            .spots
            .iter()
            .filter(|(_, spot)| spot.visits >= min_visits && spot.is_good)
            .filter(|&(&(x, y), _)| region.is_none_or(|region| grid.region_of(x, y) == region))
            .map(|(&location, spot)| (location, spot))
            .collect();
        spots.sort_by(|a, b| b.1.avg_catch.total_cmp(&a.1.avg_catch).then(a.0.cmp(&b.0)));
        spots.truncate(max_spots);
        spots
    }

    /// Drop spots last visited more than `max_age` days ago.
    pub fn forget_old_spots(&mut self, current_day: u64, max_age: u64) {
        self.spots
            .retain(|_, spot| current_day.saturating_sub(spot.last_visit) <= max_age);
    }

    pub fn statistics(&self) -> MemoryStatistics {
        if self.trips.is_empty() {
            return MemoryStatistics {
                total_trips: 0,
                avg_profit: 0.0,
                avg_catch: 0.0,
                success_rate: 0.0,
                best_location: None,
            };
        }

        let n = self.trips.len() as f64;
        let total_profit: f64 = self.trips.iter().map(|trip| trip.profit).sum();
        let total_catch: f64 = self.trips.iter().map(|trip| trip.catch).sum();
        let profitable = self.trips.iter().filter(|trip| trip.profit > 0.0).count();
        let best = self
            .trips
            .iter()
            .max_by(|a, b| a.profit.total_cmp(&b.profit));

        MemoryStatistics {
            total_trips: self.trips.len(),
            avg_profit: total_profit / n,
            avg_catch: total_catch / n,
            success_rate: profitable as f64 / n,
            best_location: best.and_then(|trip| trip.location),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
