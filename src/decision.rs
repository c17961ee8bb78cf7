use crate::config::Config;
use crate::fisher::{Archetype, Fisher, SpotStrategy};
use crate::grid::{PatchGrid, Region};
use crate::trip::{estimate_trip_cost, region_travel_cost};
use rand::Rng;
use std::collections::BTreeMap;

/// Outcome of one daily decision.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Decision {
    /// Spend the day ashore.
    StayHome,
    /// Go fishing (or keep fishing) in the given region.
    Fish(Region),
    /// Move the current trip to another region.
    SwitchRegion(Region),
    /// End the current trip and land the catch.
    ReturnHome,
}

/// Decide what the fisher does today.
///
/// An active lay-low consumes the day before any archetype logic runs,
/// and a bankrupt fisher never goes out again.
pub fn decide(fisher: &mut Fisher, cfg: &Config, bad_weather: bool) -> Decision {
    if fisher.ledger.tick_lay_low() {
        return Decision::StayHome;
    }
    if fisher.ledger.bankrupt {
        return Decision::StayHome;
    }
    match fisher.archetype {
        Archetype::Archipelago => satisfice_lifestyle(fisher, cfg, bad_weather),
        Archetype::Coastal => optimize_lifestyle_and_growth(fisher, cfg, bad_weather),
        Archetype::Trawler => optimize_growth(fisher, cfg),
    }
}

/// Subsistence logic: go out only when the last week of catches no
/// longer covers existence costs, unless the fish look scarce and the
/// capital buffer still holds.
fn satisfice_lifestyle(fisher: &mut Fisher, cfg: &Config, bad_weather: bool) -> Decision {
    let beh = &cfg.behavior;
    let catches_last_week = fisher.memory.catches_over_last(beh.weekly_window);
    let weekly_need = fisher.params.cost_existence * beh.weekly_window as f64;
    let growth = fisher
        .memory
        .growth_perception(beh.recent_window, beh.older_window);
    let fish_is_scarce = growth < 2.0 * beh.scarce_perception_threshold;

    let in_need = catches_last_week < weekly_need || fisher.ledger.capital < 0.0;
    let deterred = fish_is_scarce && fisher.ledger.capital >= 0.0;
    if in_need && !bad_weather && !deterred {
        let region = home_region(fisher);
        fisher.region_preference = Some(region);
        Decision::Fish(region)
    } else {
        Decision::StayHome
    }
}

/// Day-trip optimizer balancing expected profit against time at home.
fn optimize_lifestyle_and_growth(fisher: &mut Fisher, cfg: &Config, bad_weather: bool) -> Decision {
    let beh = &cfg.behavior;
    let Some((region, best_profit)) = best_region(
        fisher,
        cfg,
        beh.monthly_window,
        beh.expected_catch_default_fraction,
    ) else {
        return Decision::StayHome;
    };

    let profit_worthwhile = best_profit > fisher.params.cost_existence;
    let will_fish = if fisher.memory.len() < beh.exploration_phase_trips {
        !bad_weather && profit_worthwhile
    } else {
        let home_satisfaction = fisher.memory.home_satisfaction(beh.biweekly_window);
        let growth_satisfaction = if best_profit > 0.0 {
            (best_profit / (2.0 * fisher.params.cost_existence)).min(1.0)
        } else {
            0.0
        };
        !bad_weather
            && profit_worthwhile
            && (growth_satisfaction > beh.satisfaction_growth_threshold
                || home_satisfaction < beh.satisfaction_home_threshold
                || fisher.ledger.capital < 0.0)
    };

    if will_fish {
        fisher.region_preference = Some(region);
        Decision::Fish(region)
    } else {
        Decision::StayHome
    }
}

fn optimize_growth(fisher: &mut Fisher, cfg: &Config) -> Decision {
    if fisher.at_sea {
        trawler_at_sea(fisher, cfg)
    } else {
        trawler_at_home(fisher, cfg)
    }
}

/// Departure rule: the best regional lookahead must clear several days
/// of existence costs, unless debt forces the trawler out.
fn trawler_at_home(fisher: &mut Fisher, cfg: &Config) -> Decision {
    let beh = &cfg.behavior;
    let Some((region, best_profit)) = best_region(
        fisher,
        cfg,
        beh.older_window,
        beh.trawler_expected_catch_default_fraction,
    ) else {
        return Decision::StayHome;
    };

    let threshold = beh.trawler_profit_threshold_days * fisher.params.cost_existence;
    if best_profit > threshold || fisher.ledger.capital < 0.0 {
        fisher.region_preference = Some(region);
        Decision::Fish(region)
    } else {
        Decision::StayHome
    }
}

/// Mid-trip rule: full storage forces a landing; otherwise compare
/// staying, jumping to the best other region, and heading home. Ties
/// favor staying.
fn trawler_at_sea(fisher: &mut Fisher, cfg: &Config) -> Decision {
    if fisher.storage_full() {
        fisher.region_preference = None;
        return Decision::ReturnHome;
    }

    let beh = &cfg.behavior;
    let eco = &cfg.economics;
    let Some(current) = fisher.region.or(fisher.region_preference) else {
        fisher.region_preference = None;
        return Decision::ReturnHome;
    };
    let default = fisher.params.catchability * beh.trawler_expected_catch_default_fraction;

    let stay_value = fisher
        .memory
        .expected_catch_in(current, beh.older_window, default)
        * eco.fish_price
        - fisher.params.cost_activity;

    let mut switch: Option<(Region, f64)> = None;
    for &region in &fisher.params.accessible_regions {
        if region == current {
            continue;
        }
        let expected = fisher
            .memory
            .expected_catch_in(region, beh.older_window, default);
        let jump_cost =
            eco.travel.inter_region_multiplier * region_travel_cost(&eco.travel, region, true);
        let value = expected * eco.fish_price - fisher.params.cost_activity - jump_cost;
        match switch {
            Some((_, best)) if value <= best => {}
            _ => switch = Some((region, value)),
        }
    }

    let days = f64::from(fisher.days_at_sea_current_trip.max(1));
    let trip_profit = fisher.fish_onboard * eco.fish_price - fisher.trip_cost;
    let return_value = trip_profit / days - fisher.params.cost_existence;

    let mut best_value = stay_value;
    let mut decision = Decision::Fish(current);
    if let Some((region, value)) = switch
        && value > best_value
    {
        best_value = value;
        decision = Decision::SwitchRegion(region);
    }
    if return_value > best_value {
        decision = Decision::ReturnHome;
    }

    match decision {
        Decision::SwitchRegion(region) => fisher.region_preference = Some(region),
        Decision::ReturnHome => fisher.region_preference = None,
        _ => {}
    }
    decision
}

/// Accessible region with the highest expected profit, first wins ties.
fn best_region(
    fisher: &Fisher,
    cfg: &Config,
    window: usize,
    default_fraction: f64,
) -> Option<(Region, f64)> {
    let mut best: Option<(Region, f64)> = None;
    for &region in &fisher.params.accessible_regions {
        let profit = expected_regional_profit(fisher, cfg, region, window, default_fraction);
        match best {
            Some((_, current)) if profit <= current => {}
            _ => best = Some((region, profit)),
        }
    }
    best
}

fn expected_regional_profit(
    fisher: &Fisher,
    cfg: &Config,
    region: Region,
    window: usize,
    default_fraction: f64,
) -> f64 {
    let default = fisher.params.catchability * default_fraction;
    let expected = fisher.memory.expected_catch_in(region, window, default);
    let cost = estimate_trip_cost(
        &fisher.params,
        &cfg.economics.travel,
        region,
        fisher.is_trawler(),
    );
    expected * cfg.economics.fish_price - cost
}

fn home_region(fisher: &Fisher) -> Region {
    fisher
        .params
        .accessible_regions
        .first()
        .copied()
        .unwrap_or(Region::A)
}

/// Positions of the fishers currently out on the water, as visible to
/// a fisher choosing a spot.
#[derive(Debug, Default, Clone)]
pub struct FleetView {
    sightings: Vec<Sighting>,
}

#[derive(Debug, Clone)]
struct Sighting {
    location: (u16, u16),
    region: Region,
    total_catch: f64,
}

impl FleetView {
    /// Snapshot every fisher except `observer` that is out fishing at
    /// a known location.
    pub fn observe(fishers: &[Fisher], observer: usize) -> Self {
        let sightings = fishers
            .iter()
            .filter(|fisher| fisher.id != observer && fisher.gone_fishing)
            .filter_map(|fisher| {
                let location = fisher.location?;
                let region = fisher.region?;
                Some(Sighting {
                    location,
                    region,
                    total_catch: fisher.total_catch,
                })
            })
            .collect();
        Self { sightings }
    }

    /// Position of the fisher with the highest cumulative catch out in
    /// `region`.
    pub fn most_successful_in(&self, region: Region) -> Option<(u16, u16)> {
        self.sightings
            .iter()
            .filter(|sighting| sighting.region == region)
            .max_by(|a, b| {
                a.total_catch
                    .total_cmp(&b.total_catch)
                    .then(b.location.cmp(&a.location))
            })
            .map(|sighting| sighting.location)
    }

    /// Position currently hosting the most fishers in `region`.
    pub fn most_crowded_in(&self, region: Region) -> Option<(u16, u16)> {
        let mut counts: BTreeMap<(u16, u16), usize> = BTreeMap::new();
        for sighting in self.sightings.iter().filter(|s| s.region == region) {
            *counts.entry(sighting.location).or_default() += 1;
        }
        counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(location, _)| location)
    }
}

/// Pick the cell to fish within `region` following the fisher's spot
/// strategy. Social strategies and sonar climbing fall back to own
/// knowledge when they find nothing to imitate.
pub fn select_spot<R: Rng>(
    fisher: &Fisher,
    grid: &PatchGrid,
    fleet: &FleetView,
    region: Region,
    rng: &mut R,
) -> Option<(u16, u16)> {
    match fisher.spot_strategy {
        SpotStrategy::Knowledge => knowledge_spot(fisher, grid, region, rng),
        SpotStrategy::Expertise => fleet
            .most_successful_in(region)
            .or_else(|| knowledge_spot(fisher, grid, region, rng)),
        SpotStrategy::DescriptiveNorm => fleet
            .most_crowded_in(region)
            .or_else(|| knowledge_spot(fisher, grid, region, rng)),
        SpotStrategy::UphillClimbing => {
            uphill_spot(fisher, grid, region).or_else(|| knowledge_spot(fisher, grid, region, rng))
        }
    }
}

/// Random choice among remembered good spots, else a random hotspot.
fn knowledge_spot<R: Rng>(
    fisher: &Fisher,
    grid: &PatchGrid,
    region: Region,
    rng: &mut R,
) -> Option<(u16, u16)> {
    let spots = fisher
        .memory
        .good_spots(grid, Some(region), 1, fisher.params.max_good_spots);
    if !spots.is_empty() {
        return Some(spots[rng.random_range(0..spots.len())].0);
    }
    let hotspots = grid.hotspots(region);
    if hotspots.is_empty() {
        return None;
    }
    Some(hotspots[rng.random_range(0..hotspots.len())])
}

/// Step to the richest adjacent same-region cell. Requires sonar and a
/// known current position.
fn uphill_spot(fisher: &Fisher, grid: &PatchGrid, region: Region) -> Option<(u16, u16)> {
    if !fisher.has_technology || !fisher.is_trawler() {
        return None;
    }
    let (x, y) = fisher.location?;
    let mut best: Option<((u16, u16), f64)> = None;
    for dy in -1i32..=1 {
        for dx in -1i32..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = i32::from(x) + dx;
            let ny = i32::from(y) + dy;
            if nx < 0 || ny < 0 || nx >= i32::from(grid.width()) || ny >= i32::from(grid.height()) {
                continue;
            }
            let (nx, ny) = (nx as u16, ny as u16);
            if grid.region_of(nx, ny) != region {
                continue;
            }
            let stock = grid.patch(nx, ny).fish_stock;
            if best.is_none_or(|(_, top)| stock > top) {
                best = Some(((nx, ny), stock));
            }
        }
    }
    best.map(|(location, _)| location)
}
