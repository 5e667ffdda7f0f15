//! Poisson-disc (blue noise) sampling over a rectangle.
//!
//! Bridson's algorithm: keep a list of active points, try up to `iterations` candidates in the
//! annulus `[radius, 2 * radius)` around a random active point, and retire the point once every
//! try is rejected. A background grid with cells of `radius / sqrt(2)` holds at most one sample
//! per cell, so each candidate only checks the surrounding 5x5 cells.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Upper bound on background grid cells. Smaller radii are raised until the grid fits.
pub const MAX_CELLS: usize = 1 << 18;

/// Deterministic sample positions in `[0, region.x) x [0, region.y)`, pairwise at least `radius` apart.
pub fn generate_local_points(radius: f32, region: Vec2, seed: u64, iterations: u32) -> Vec<Vec2> {
    let mut rng = StdRng::seed_from_u64(seed);
    generate_with_rng(radius, region, iterations, &mut rng)
}

pub fn generate_with_rng<R: Rng>(
    radius: f32,
    region: Vec2,
    iterations: u32,
    rng: &mut R,
) -> Vec<Vec2> {
    if !(radius > 0.0 && region.x > 0.0 && region.y > 0.0 && region.is_finite()) {
        return Vec::new();
    }

    // Keep the grid under MAX_CELLS; past the diagonal only one sample fits anyway
    let min_radius = (2.0 * region.x * region.y / MAX_CELLS as f32).sqrt();
    let radius = radius.max(min_radius).min(region.length());

    let cell_size = radius / std::f32::consts::SQRT_2;
    let cols = ((region.x / cell_size).ceil() as usize).max(1);
    let rows = ((region.y / cell_size).ceil() as usize).max(1);
    // Index + 1 of the sample occupying each cell, 0 when empty
    let mut grid = vec![0usize; cols * rows];
    let mut points: Vec<Vec2> = Vec::new();
    let mut active: Vec<usize> = Vec::new();

    let cell_of = |p: Vec2| -> (usize, usize) {
        (
            ((p.x / cell_size) as usize).min(cols - 1),
            ((p.y / cell_size) as usize).min(rows - 1),
        )
    };

    let first = Vec2::new(rng.gen_range(0.0..region.x), rng.gen_range(0.0..region.y));
    let (cx, cy) = cell_of(first);
    grid[cy * cols + cx] = 1;
    points.push(first);
    active.push(0);

    let radius_sq = radius * radius;
    let iterations = iterations.max(1);

    while !active.is_empty() {
        let slot = rng.gen_range(0..active.len());
        let centre = points[active[slot]];
        let mut accepted = false;

        for _ in 0..iterations {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let distance = rng.gen_range(radius..2.0 * radius);
            let candidate = centre + Vec2::new(angle.cos(), angle.sin()) * distance;

            if !(candidate.x >= 0.0
                && candidate.y >= 0.0
                && candidate.x < region.x
                && candidate.y < region.y)
            {
                continue;
            }

            let (gx, gy) = cell_of(candidate);
            let x_range = gx.saturating_sub(2)..=(gx + 2).min(cols - 1);
            let too_close = (gy.saturating_sub(2)..=(gy + 2).min(rows - 1)).any(|y| {
                x_range.clone().any(|x| {
                    let occupant = grid[y * cols + x];
                    occupant != 0
                        && (points[occupant - 1] - candidate).length_squared() < radius_sq
                })
            });
            if too_close {
                continue;
            }

            points.push(candidate);
            grid[gy * cols + gx] = points.len();
            active.push(points.len() - 1);
            accepted = true;
            break;
        }

        if !accepted {
            active.swap_remove(slot);
        }
    }

    points
}
