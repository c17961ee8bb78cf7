use crate::config::{ClampMode, ResourceConfig};
use crate::grid::{Density, FISHABLE_REGIONS, PatchGrid, Region};

/// Apply logistic regrowth to every fishable patch for a step of
/// `days` simulated days.
///
/// Regrowth is proposed per patch from its own stock and capacity, then
/// applied per region: whenever the proposed regional total would push
/// the region past its aggregate capacity, every member patch's regrowth
/// is scaled down by the same factor. Under [`ClampMode::PerPatch`] each
/// patch is additionally capped at its own capacity.
pub fn grow(grid: &mut PatchGrid, cfg: &ResourceConfig, days: f64) {
    let effective_rate = cfg.annual_growth_rate * (days / 365.0);

    let mut proposed = [0.0; 4];
    for patch in grid.patches_mut() {
        let Some(slot) = region_slot(patch.region) else {
            continue;
        };
        let regen = if patch.carrying_capacity > 0.0 {
            let factor = density_factor(cfg, patch.density);
            patch.fish_stock
                * effective_rate
                * factor
                * (1.0 - patch.fish_stock / patch.carrying_capacity)
        } else {
            0.0
        };
        patch.last_regen = regen;
        proposed[slot] += regen;
    }

    for region in FISHABLE_REGIONS {
        let slot = region_slot(region).unwrap_or(0);
        let current = grid.region_stock(region);
        let capacity = grid.region_capacity(region);

        let scale = if current + proposed[slot] > capacity {
            if proposed[slot] > 0.0 {
                ((capacity - current) / proposed[slot]).clamp(0.0, 1.0)
            } else {
                0.0
            }
        } else {
            1.0
        };

        for patch in grid.patches_mut() {
            if patch.region != region {
                continue;
            }
            let mut regen = patch.last_regen * scale;
            if cfg.clamp_mode == ClampMode::PerPatch {
                regen = regen.min((patch.carrying_capacity - patch.fish_stock).max(0.0));
            }
            patch.last_regen = regen;
            patch.fish_stock += regen;
        }
    }
}

fn density_factor(cfg: &ResourceConfig, density: Option<Density>) -> f64 {
    match density {
        Some(Density::High) => cfg.density_mult_high,
        Some(Density::Medium) => cfg.density_mult_medium,
        Some(Density::Low) | None => cfg.density_mult_low,
    }
}

fn region_slot(region: Region) -> Option<usize> {
    FISHABLE_REGIONS.iter().position(|&fishable| fishable == region)
}
