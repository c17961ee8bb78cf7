use crate::config::{ArchetypeParams, Config, TravelCosts};
use crate::fisher::Fisher;
use crate::grid::{PatchGrid, Region};
use crate::memory::TripRecord;
use rand::Rng;

/// What one day of fishing produced.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct FishingOutcome {
    pub catch: f64,
    pub cost: f64,
}

/// Cost of reaching a region from port. Larger vessels pay more for
/// the inner coastal zone.
pub fn region_travel_cost(travel: &TravelCosts, region: Region, large_vessel: bool) -> f64 {
    match region {
        Region::A => travel.region_a,
        Region::B if large_vessel => travel.region_b_large_vessel,
        Region::B => travel.region_b,
        Region::C | Region::D => travel.region_cd,
        Region::Land | Region::Null => 0.0,
    }
}

/// Cost of moving between two known positions.
pub fn distance_cost(travel: &TravelCosts, from: (u16, u16), to: (u16, u16)) -> f64 {
    let dx = f64::from(from.0) - f64::from(to.0);
    let dy = f64::from(from.1) - f64::from(to.1);
    travel.per_unit_distance * (dx * dx + dy * dy).sqrt()
}

/// Full cost of a one-day outing to `region` from port.
pub fn estimate_trip_cost(
    params: &ArchetypeParams,
    travel: &TravelCosts,
    region: Region,
    large_vessel: bool,
) -> f64 {
    params.cost_existence + params.cost_activity + region_travel_cost(travel, region, large_vessel)
}

/// Fish one day at `location`.
///
/// Extracts up to catchability from the patch, charges the day's
/// costs to the running trip, and folds the visit into spatial
/// memory. Settlement happens at landing, not here.
pub fn go_fish(
    fisher: &mut Fisher,
    grid: &mut PatchGrid,
    cfg: &Config,
    location: (u16, u16),
    day: u64,
) -> FishingOutcome {
    let (x, y) = location;
    let travel = match fisher.location {
        Some(from) => distance_cost(&cfg.economics.travel, from, location),
        None => region_travel_cost(&cfg.economics.travel, grid.region_of(x, y), fisher.is_trawler()),
    };

    let potential = fisher.params.catchability.min(grid.patch(x, y).fish_stock);
    let catch = grid.reduce(x, y, potential);
    let cost = fisher.params.cost_existence + fisher.params.cost_activity + travel;

    fisher.at_home = false;
    fisher.at_sea = true;
    fisher.gone_fishing = true;
    fisher.location = Some(location);
    fisher.region = Some(grid.region_of(x, y));
    fisher.total_catch += catch;
    fisher.days_at_sea += 1;
    fisher.fish_onboard += catch;
    fisher.trip_cost += cost;
    fisher.days_at_sea_current_trip += 1;

    fisher.memory.record_visit(
        location,
        catch,
        fisher.params.catchability,
        day,
        cfg.behavior.good_spot_efficiency_threshold,
    );

    FishingOutcome { catch, cost }
}

/// Steam an active trip into another region at the reduced
/// inter-region rate, positioning the vessel on `destination` so the
/// fishing action itself adds no further travel.
pub fn jump_to_region(
    fisher: &mut Fisher,
    travel: &TravelCosts,
    region: Region,
    destination: (u16, u16),
) {
    fisher.trip_cost +=
        travel.inter_region_multiplier * region_travel_cost(travel, region, fisher.is_trawler());
    fisher.jumped_region = true;
    fisher.location = Some(destination);
}

/// End the current trip: sell everything onboard, settle the ledger,
/// remember the trip, and reset to the at-home state.
pub fn return_home_and_land<R: Rng>(fisher: &mut Fisher, cfg: &Config, day: u64, rng: &mut R) {
    let eco = &cfg.economics;
    let revenue = fisher.fish_onboard * eco.fish_price;
    let cost = fisher.trip_cost;
    let profit = revenue - cost;
    fisher
        .ledger
        .update_finances(profit, cost, revenue, fisher.params.cost_existence, eco, rng);

    fisher.memory.record_trip(TripRecord {
        location: fisher.location,
        catch: fisher.fish_onboard,
        cost,
        profit,
        days: fisher.days_at_sea_current_trip.max(1),
        day,
        region: fisher.region,
        went_fishing: true,
    });

    fisher.fish_onboard = 0.0;
    fisher.trip_cost = 0.0;
    fisher.days_at_sea_current_trip = 0;
    fisher.jumped_region = false;
    fisher.at_home = true;
    fisher.at_sea = false;
    fisher.gone_fishing = false;
    fisher.location = None;
    fisher.region = None;
}

/// Spend the day ashore: pay existence costs, re-evaluate solvency,
/// and remember the idle day.
pub fn stay_home<R: Rng>(fisher: &mut Fisher, cfg: &Config, day: u64, rng: &mut R) {
    let cost = fisher.params.cost_existence;
    fisher.ledger.pay(cost);
    fisher.ledger.check_bankruptcy(cost, &cfg.economics, rng);
    fisher.memory.record_trip(TripRecord::home_day(day, cost));
    fisher.at_home = true;
    fisher.gone_fishing = false;
}
