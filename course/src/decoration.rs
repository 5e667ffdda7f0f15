//! Deterministic decoration placement.
//!
//! Candidates come from Poisson-disc sampling over the chunk footprint and are snapped to the
//! lowest nearby terrain point. Each candidate picks an eligible decoration for the biome
//! under it and a concrete prefab for that decoration. The result is pure placement data; the
//! host decides how to spawn it.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::biome::Biome;
use crate::chunk::ChunkCoord;
use crate::config::{BiomeDecorations, DecorationSettings};
use crate::poisson;
use crate::spatial::PointGrid;
use crate::terrain_map::TerrainMap;

/// Category of scatterable cosmetic object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decoration {
    Tree,
    Bush,
    Rock,
    Flower,
    Cactus,
    Reed,
    IceSpike,
}

impl Decoration {
    pub fn all() -> &'static [Decoration] {
        &[
            Decoration::Tree,
            Decoration::Bush,
            Decoration::Rock,
            Decoration::Flower,
            Decoration::Cactus,
            Decoration::Reed,
            Decoration::IceSpike,
        ]
    }

    /// Stable string id
    pub const fn id(&self) -> &'static str {
        match self {
            Decoration::Tree => "tree",
            Decoration::Bush => "bush",
            Decoration::Rock => "rock",
            Decoration::Flower => "flower",
            Decoration::Cactus => "cactus",
            Decoration::Reed => "reed",
            Decoration::IceSpike => "ice_spike",
        }
    }
}

/// Opaque identifier of a concrete placeable asset, owned by the host's prefab registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrefabId(pub String);

impl PrefabId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Position and orientation of one placed object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectTransform {
    pub position: Vec3,
    pub rotation: Quat,
}

/// Every placement of one prefab within one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldObjectPlacement {
    pub prefab: PrefabId,
    pub transforms: Vec<ObjectTransform>,
}

impl WorldObjectPlacement {
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.transforms.iter().map(|t| t.position)
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

/// Total number of objects across a chunk's placements.
pub fn count_objects(placements: &[WorldObjectPlacement]) -> usize {
    placements.iter().map(WorldObjectPlacement::len).sum()
}

/// Seed for a chunk's decoration, stable across runs and independent of load order.
///
/// FNV-1a over the coordinate's display form, e.g. `"(3, -1)"`.
pub fn chunk_seed(coord: ChunkCoord) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    coord
        .to_string()
        .bytes()
        .fold(OFFSET, |hash, b| (hash ^ b as u64).wrapping_mul(PRIME))
}

/// Scatters decorations over built terrain maps.
#[derive(Debug, Clone)]
pub struct DecorationPlacer {
    radius: f32,
    iterations: u32,
    prefabs: HashMap<Decoration, Vec<PrefabId>>,
    eligible: HashMap<Biome, Vec<Decoration>>,
}

impl DecorationPlacer {
    pub fn new(settings: &DecorationSettings) -> Self {
        // Merge presets of the same decoration in declaration order
        let mut prefabs: HashMap<Decoration, Vec<PrefabId>> = HashMap::new();
        for preset in &settings.presets {
            prefabs
                .entry(preset.decoration)
                .or_default()
                .extend(preset.prefabs.iter().cloned());
        }

        Self {
            radius: settings.radius,
            iterations: settings.iterations.clamp(1, 10),
            prefabs,
            eligible: eligibility_table(&settings.biome_decorations),
        }
    }

    /// Minimum distance between any two objects, within and across chunks
    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn eligible_decorations(&self, biome: Biome) -> &[Decoration] {
        self.eligible.get(&biome).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn prefabs_for(&self, decoration: Decoration) -> &[PrefabId] {
        self.prefabs.get(&decoration).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Placements for one chunk, one record per prefab in order of first use.
    pub fn generate(&self, map: &TerrainMap) -> Vec<WorldObjectPlacement> {
        self.generate_for_chunk(map, &[])
    }

    /// Like [`generate`](Self::generate), but a non-empty `requests` list replaces the
    /// configured biome table for this chunk.
    pub fn generate_for_chunk(
        &self,
        map: &TerrainMap,
        requests: &[BiomeDecorations],
    ) -> Vec<WorldObjectPlacement> {
        let chunk_table;
        let eligible = if requests.is_empty() {
            &self.eligible
        } else {
            chunk_table = eligibility_table(requests);
            &chunk_table
        };

        let bounds = map.bounds();
        let seed = chunk_seed(map.chunk());

        let local_points = poisson::generate_local_points(
            self.radius,
            Vec2::new(bounds.size.x, bounds.size.z),
            seed,
            self.iterations,
        );

        let mut rng = StdRng::seed_from_u64(seed);
        let offset = Vec3::new(bounds.min().x, 0.0, bounds.min().z);

        let mut placements: Vec<WorldObjectPlacement> = Vec::new();
        let mut by_prefab: HashMap<PrefabId, usize> = HashMap::new();
        let mut discarded = 0usize;

        for local in local_points {
            let mut world_pos = Vec3::new(local.x, 0.0, local.y) + offset;
            let index = map.closest_point_index(world_pos);
            world_pos.y = map.lowest_neighbour_height(index);

            let biome = map.points()[index].biome();
            let decorations = eligible.get(&biome).map(Vec::as_slice).unwrap_or(&[]);
            if decorations.is_empty() {
                discarded += 1;
                continue;
            }

            // Randomly choose the decoration type, then the prefab
            let decoration = decorations[rng.gen_range(0..decorations.len())];
            let prefabs = self.prefabs_for(decoration);
            if prefabs.is_empty() {
                discarded += 1;
                continue;
            }
            let prefab = &prefabs[rng.gen_range(0..prefabs.len())];
            let yaw = rng.gen_range(0.0..std::f32::consts::TAU);

            let slot = *by_prefab.entry(prefab.clone()).or_insert_with(|| {
                placements.push(WorldObjectPlacement {
                    prefab: prefab.clone(),
                    transforms: Vec::new(),
                });
                placements.len() - 1
            });
            placements[slot].transforms.push(ObjectTransform {
                position: world_pos,
                rotation: Quat::from_rotation_y(yaw),
            });
        }

        debug!(
            "Chunk {}: {} objects in {} prefab groups ({} candidates discarded)",
            map.chunk(),
            count_objects(&placements),
            placements.len(),
            discarded
        );

        placements
    }

    /// Remove every object in `chunk` closer than the radius to an object in `neighbour`.
    pub fn prune(&self, chunk: &mut [WorldObjectPlacement], neighbour: &[WorldObjectPlacement]) {
        let grid = PointGrid::from_points(
            self.radius,
            neighbour.iter().flat_map(WorldObjectPlacement::positions),
        );
        if grid.is_empty() {
            return;
        }

        for placement in chunk.iter_mut() {
            placement
                .transforms
                .retain(|t| !grid.any_within(t.position, self.radius));
        }
    }
}

/// Merge rules for the same biome in declaration order.
fn eligibility_table(rules: &[BiomeDecorations]) -> HashMap<Biome, Vec<Decoration>> {
    let mut eligible: HashMap<Biome, Vec<Decoration>> = HashMap::new();
    for rule in rules {
        eligible
            .entry(rule.biome)
            .or_default()
            .extend(rule.decorations.iter().copied());
    }
    eligible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrefabPreset;
    use crate::hole::HoleTable;
    use crate::terrain_map::tests::flat_map;

    fn settings(radius: f32) -> DecorationSettings {
        DecorationSettings {
            radius,
            iterations: 5,
            presets: vec![
                PrefabPreset {
                    decoration: Decoration::Tree,
                    prefabs: vec![PrefabId::new("oak"), PrefabId::new("pine")],
                },
                PrefabPreset {
                    decoration: Decoration::Rock,
                    prefabs: vec![PrefabId::new("boulder")],
                },
            ],
            biome_decorations: vec![
                BiomeDecorations {
                    biome: Biome::Grass,
                    decorations: vec![Decoration::Tree, Decoration::Rock],
                },
                // Flowers have no prefabs registered
                BiomeDecorations {
                    biome: Biome::Sand,
                    decorations: vec![Decoration::Flower],
                },
            ],
        }
    }

    fn all_positions(placements: &[WorldObjectPlacement]) -> Vec<Vec3> {
        placements.iter().flat_map(|p| p.positions()).collect()
    }

    #[test]
    fn test_seed_depends_only_on_coord() {
        assert_eq!(chunk_seed(ChunkCoord::new(3, -1)), chunk_seed(ChunkCoord::new(3, -1)));
        assert_ne!(chunk_seed(ChunkCoord::new(3, -1)), chunk_seed(ChunkCoord::new(-1, 3)));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let placer = DecorationPlacer::new(&settings(4.0));
        let mut holes = HoleTable::new();
        let map = flat_map(ChunkCoord::new(2, 5), 31, &[], &[], &mut holes);

        let a = placer.generate(&map);
        let b = placer.generate(&map.clone());
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn test_groups_by_prefab_and_stays_in_bounds() {
        let placer = DecorationPlacer::new(&settings(3.0));
        let mut holes = HoleTable::new();
        let map = flat_map(ChunkCoord::new(0, 0), 31, &[], &[], &mut holes);

        let placements = placer.generate(&map);
        let mut seen = std::collections::HashSet::new();
        for p in &placements {
            assert!(seen.insert(p.prefab.clone()), "duplicate group {:?}", p.prefab);
            assert!(["oak", "pine", "boulder"].contains(&p.prefab.as_str()));
            for pos in p.positions() {
                assert!(map.bounds().contains_xz(pos));
                assert_eq!(pos.y, 0.0);
            }
        }
    }

    #[test]
    fn test_ineligible_biomes_get_nothing() {
        let placer = DecorationPlacer::new(&settings(3.0));
        let mut holes = HoleTable::new();
        // Every cell is a hole: no decorations are eligible
        let cells: Vec<(usize, usize)> = (0..11).flat_map(|y| (0..11).map(move |x| (x, y))).collect();
        let map = flat_map(ChunkCoord::new(0, 0), 11, &cells, &[], &mut holes);
        assert!(placer.generate(&map).is_empty());

        // Every cell is sand: flowers are eligible but have no prefabs
        let mut holes = HoleTable::new();
        let map = flat_map(ChunkCoord::new(0, 0), 11, &[], &cells, &mut holes);
        assert!(placer.generate(&map).is_empty());
    }

    #[test]
    fn test_chunk_requests_replace_biome_table() {
        let placer = DecorationPlacer::new(&settings(3.0));
        let mut holes = HoleTable::new();
        let map = flat_map(ChunkCoord::new(0, 0), 31, &[], &[], &mut holes);

        let rocks_only = [BiomeDecorations {
            biome: Biome::Grass,
            decorations: vec![Decoration::Rock],
        }];
        let placements = placer.generate_for_chunk(&map, &rocks_only);
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].prefab.as_str(), "boulder");
        assert!(!placements[0].is_empty());

        // The chunk's list is the whole table: Grass is not in it, so nothing is placed
        let sand_only = [BiomeDecorations {
            biome: Biome::Sand,
            decorations: vec![Decoration::Rock],
        }];
        assert!(placer.generate_for_chunk(&map, &sand_only).is_empty());

        // An empty list keeps the configured table
        assert_eq!(placer.generate_for_chunk(&map, &[]), placer.generate(&map));
    }

    #[test]
    fn test_objects_sit_on_lowest_neighbour() {
        let placer = DecorationPlacer::new(&settings(2.0));
        let mut holes = HoleTable::new();
        // One bunker in the middle of a 5x5 map lowers its 3x3 neighbourhood's placements
        let map = flat_map(ChunkCoord::new(0, 0), 5, &[], &[(2, 2)], &mut holes);
        for pos in all_positions(&placer.generate(&map)) {
            let index = map.closest_point_index(pos);
            let (x, y) = map.coords_of(index);
            let near_bunker = (1..=3).contains(&x) && (1..=3).contains(&y);
            if map.points()[index].biome() == Biome::Grass {
                assert_eq!(pos.y, if near_bunker { -1.0 } else { 0.0 }, "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_prune_enforces_spacing_across_chunks() {
        let radius = 4.0;
        let placer = DecorationPlacer::new(&settings(radius));
        let mut holes = HoleTable::new();
        let left = flat_map(ChunkCoord::new(0, 0), 31, &[], &[], &mut holes);
        let right = flat_map(ChunkCoord::new(1, 0), 31, &[], &[], &mut holes);

        let neighbour = placer.generate(&left);
        let mut chunk = placer.generate(&right);
        let before = count_objects(&chunk);
        placer.prune(&mut chunk, &neighbour);
        assert!(count_objects(&chunk) <= before);

        for a in all_positions(&chunk) {
            for b in all_positions(&neighbour) {
                assert!(a.distance(b) >= radius - 1e-4, "{a} too close to {b}");
            }
        }
    }

    #[test]
    fn test_prune_order_does_not_matter() {
        let placer = DecorationPlacer::new(&settings(4.0));
        let mut holes = HoleTable::new();
        let centre = flat_map(ChunkCoord::new(0, 0), 31, &[], &[], &mut holes);
        let east = placer.generate(&flat_map(ChunkCoord::new(1, 0), 31, &[], &[], &mut holes));
        let north = placer.generate(&flat_map(ChunkCoord::new(0, -1), 31, &[], &[], &mut holes));

        let mut first = placer.generate(&centre);
        placer.prune(&mut first, &east);
        placer.prune(&mut first, &north);

        let mut second = placer.generate(&centre);
        placer.prune(&mut second, &north);
        placer.prune(&mut second, &east);

        assert_eq!(first, second);
    }

    #[test]
    fn test_prune_removes_exact_overlap_only_within_radius() {
        let placer = DecorationPlacer::new(&settings(5.0));
        let at = |x: f32| ObjectTransform {
            position: Vec3::new(x, 0.0, 0.0),
            rotation: Quat::IDENTITY,
        };
        let mut chunk = vec![WorldObjectPlacement {
            prefab: PrefabId::new("oak"),
            transforms: vec![at(0.0), at(4.9), at(5.0), at(20.0)],
        }];
        let neighbour = vec![WorldObjectPlacement {
            prefab: PrefabId::new("boulder"),
            transforms: vec![at(0.0)],
        }];
        placer.prune(&mut chunk, &neighbour);
        let left: Vec<f32> = chunk[0].positions().map(|p| p.x).collect();
        assert_eq!(left, vec![5.0, 20.0]);
    }
}
