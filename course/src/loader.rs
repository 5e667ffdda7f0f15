//! Incremental level loading.
//!
//! [`TerrainLoader::step`] advances one phase of one chunk per call so the host can spread
//! a load over frames. Every chunk is built and stitched before any is decorated, so object
//! heights see the final neighbour graph, and pruning runs as a last pass over final
//! placements:
//!
//! `NotStarted -> BuildingChunk(0) -> Stitching(0) -> BuildingChunk(1) -> ... -> Decorating(0)
//! -> ... -> Pruning(0) -> ... -> Done`

use bevy::prelude::*;
use std::time::Instant;

use crate::chunk_store::ChunkStore;
use crate::config::DecorationSettings;
use crate::decoration::{count_objects, DecorationPlacer};
use crate::error::TerrainError;
use crate::host::ChunkHost;
use crate::level::LevelData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NotStarted,
    BuildingChunk(usize),
    Stitching(usize),
    Decorating(usize),
    Pruning(usize),
    Done,
    Cancelled,
}

impl LoadState {
    pub fn is_finished(&self) -> bool {
        matches!(self, LoadState::Done | LoadState::Cancelled)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct LoadStats {
    pub chunks: usize,
    pub hole_merges: usize,
    pub meshes_rebuilt: usize,
    pub objects: usize,
    pub objects_pruned: usize,
    pub seconds: f32,
}

#[derive(Resource)]
pub struct TerrainLoader {
    level: LevelData,
    placer: DecorationPlacer,
    state: LoadState,
    stats: LoadStats,
    started: Option<Instant>,
}

impl TerrainLoader {
    pub fn new(level: LevelData, decoration: &DecorationSettings) -> Self {
        Self {
            level,
            placer: DecorationPlacer::new(decoration),
            state: LoadState::NotStarted,
            stats: LoadStats::default(),
            started: None,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    pub fn level(&self) -> &LevelData {
        &self.level
    }

    pub fn placer(&self) -> &DecorationPlacer {
        &self.placer
    }

    /// Fraction of load phases completed.
    pub fn progress(&self) -> f32 {
        let n = self.level.chunks.len().max(1);
        let phases = (4 * n) as f32;
        let done = match self.state {
            LoadState::NotStarted | LoadState::Cancelled => return 0.0,
            LoadState::BuildingChunk(i) => 2 * i,
            LoadState::Stitching(i) => 2 * i + 1,
            LoadState::Decorating(i) => 2 * n + i,
            LoadState::Pruning(i) => 3 * n + i,
            LoadState::Done => return 1.0,
        };
        done as f32 / phases
    }

    /// Advance the load by one phase.
    ///
    /// An error cancels the load; the store keeps the chunks that were fully stitched.
    pub fn step(
        &mut self,
        store: &mut ChunkStore,
        host: &mut impl ChunkHost,
    ) -> Result<LoadState, TerrainError> {
        match self.advance(store, host) {
            Ok(state) => {
                self.state = state;
                Ok(state)
            }
            Err(e) => {
                error!("Terrain load cancelled: {}", e);
                self.state = LoadState::Cancelled;
                Err(e)
            }
        }
    }

    fn advance(
        &mut self,
        store: &mut ChunkStore,
        host: &mut impl ChunkHost,
    ) -> Result<LoadState, TerrainError> {
        let next = match self.state {
            LoadState::NotStarted => {
                store.clear(host);
                if let Some(settings) = &self.level.settings {
                    store.set_settings(settings.clone());
                }
                self.stats = LoadStats::default();
                self.started = Some(Instant::now());
                info!(
                    "Loading level '{}' with {} chunks",
                    self.level.name,
                    self.level.chunks.len()
                );
                self.first_phase(LoadState::BuildingChunk(0))
            }
            LoadState::BuildingChunk(i) => {
                store.get_or_create(&self.level.chunks[i])?;
                self.stats.chunks += 1;
                LoadState::Stitching(i)
            }
            LoadState::Stitching(i) => {
                let coord = self.level.chunks[i].coord();
                let report = store.stitch_with_neighbours(coord)?;
                self.stats.hole_merges += report.merges;

                if report.needs_update() {
                    let others: Vec<_> = report.dirty.iter().copied().filter(|c| *c != coord).collect();
                    self.stats.meshes_rebuilt += store.rebuild_meshes(&others, host);
                }
                store.build_mesh(coord, host)?;
                if i + 1 < self.level.chunks.len() {
                    LoadState::BuildingChunk(i + 1)
                } else {
                    LoadState::Decorating(0)
                }
            }
            LoadState::Decorating(i) => {
                let coord = self.level.chunks[i].coord();
                let placements = match store.try_get(coord) {
                    Some(record) => self
                        .placer
                        .generate_for_chunk(record.map(), &record.data().decorations),
                    None => return Err(TerrainError::UnknownChunk(coord)),
                };
                store.set_placements(coord, placements)?;
                if i + 1 < self.level.chunks.len() {
                    LoadState::Decorating(i + 1)
                } else {
                    LoadState::Pruning(0)
                }
            }
            LoadState::Pruning(i) => {
                let coord = self.level.chunks[i].coord();
                self.stats.objects_pruned += store.prune_against_neighbours(coord, &self.placer)?;
                if i + 1 < self.level.chunks.len() {
                    LoadState::Pruning(i + 1)
                } else {
                    LoadState::Done
                }
            }
            LoadState::Done | LoadState::Cancelled => self.state,
        };

        if next == LoadState::Done && self.state != LoadState::Done {
            self.finish(store);
        }
        Ok(next)
    }

    fn first_phase(&self, state: LoadState) -> LoadState {
        if self.level.chunks.is_empty() {
            LoadState::Done
        } else {
            state
        }
    }

    fn finish(&mut self, store: &ChunkStore) {
        self.stats.objects = store
            .all_chunks()
            .map(|record| count_objects(record.placements()))
            .sum();
        self.stats.seconds = self
            .started
            .map(|t| t.elapsed().as_secs_f32())
            .unwrap_or_default();
        info!(
            "Loaded terrain in {:.3} seconds with {} chunks ({} hole merges, {} objects, {} pruned)",
            self.stats.seconds,
            self.stats.chunks,
            self.stats.hole_merges,
            self.stats.objects,
            self.stats.objects_pruned
        );
    }

    /// Step until the load is done or cancelled.
    pub fn run_to_completion(
        &mut self,
        store: &mut ChunkStore,
        host: &mut impl ChunkHost,
    ) -> Result<&LoadStats, TerrainError> {
        while !self.state.is_finished() {
            self.step(store, host)?;
        }
        Ok(&self.stats)
    }

    /// Abort the load and release everything loaded so far.
    pub fn cancel(&mut self, store: &mut ChunkStore, host: &mut impl ChunkHost) {
        if self.state.is_finished() {
            return;
        }
        warn!("Cancelling terrain load at {:?}", self.state);
        store.clear(host);
        self.state = LoadState::Cancelled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::TerrainSettings;
    use crate::chunk::ChunkCoord;
    use crate::chunk_store::tests::flat_chunk;
    use crate::config::GenerationConfig;
    use crate::generator::{LevelGenerator, LevelLayout};
    use crate::host::HeadlessHost;
    use crate::level::{ChunkData, LEVEL_VERSION};

    fn generated() -> (TerrainLoader, ChunkStore) {
        let config = GenerationConfig::default();
        let level = LevelGenerator::new(LevelLayout::default()).generate();
        (
            TerrainLoader::new(level, &config.decoration),
            ChunkStore::from_config(&config),
        )
    }

    #[test]
    fn test_full_pipeline() {
        let (mut loader, mut store) = generated();
        let mut host = HeadlessHost::default();
        let stats = loader.run_to_completion(&mut store, &mut host).unwrap().clone();

        assert_eq!(loader.state(), LoadState::Done);
        assert_eq!(stats.chunks, 9);
        assert_eq!(store.len(), 9);
        assert_eq!(host.built.len(), 9);
        assert!(stats.hole_merges >= 1);
        assert!(stats.objects > 0);
        assert!(store.all_chunks().all(|r| r.is_decorated()));
        assert_eq!(loader.progress(), 1.0);

        // The cup on the (0, 0) | (1, 0) border is one hole
        let left = store.try_get(ChunkCoord::new(0, 0)).unwrap();
        let right = store.try_get(ChunkCoord::new(1, 0)).unwrap();
        let a = left.map().point(15, 7).unwrap().hole().unwrap();
        let b = right.map().point(0, 7).unwrap().hole().unwrap();
        assert_eq!(store.holes().resolve(a), store.holes().resolve(b));
    }

    #[test]
    fn test_placements_keep_spacing_across_chunks() {
        let (mut loader, mut store) = generated();
        let mut host = HeadlessHost::default();
        loader.run_to_completion(&mut store, &mut host).unwrap();
        let radius = loader.placer().radius();

        let positions: Vec<(ChunkCoord, Vec3)> = store
            .all_chunks()
            .flat_map(|r| {
                let coord = r.coord();
                r.placements()
                    .iter()
                    .flat_map(|p| p.positions())
                    .map(move |pos| (coord, pos))
                    .collect::<Vec<_>>()
            })
            .collect();

        for (i, (ca, a)) in positions.iter().enumerate() {
            for (cb, b) in &positions[i + 1..] {
                if ca != cb {
                    assert!(
                        a.distance(*b) >= radius - 1e-3,
                        "{} in {} and {} in {} are too close",
                        a,
                        ca,
                        b,
                        cb
                    );
                }
            }
        }
    }

    #[test]
    fn test_loading_is_deterministic() {
        let mut host = HeadlessHost::default();
        let (mut first, mut store_a) = generated();
        first.run_to_completion(&mut store_a, &mut host).unwrap();
        let (mut second, mut store_b) = generated();
        second.run_to_completion(&mut store_b, &mut host).unwrap();

        for (a, b) in store_a.all_chunks().zip(store_b.all_chunks()) {
            assert_eq!(a.coord(), b.coord());
            assert_eq!(a.placements(), b.placements());
        }
    }

    #[test]
    fn test_phase_order() {
        let level = LevelData {
            version: LEVEL_VERSION,
            name: "two".to_string(),
            settings: None,
            chunks: vec![
                flat_chunk(ChunkCoord::new(0, 0), 150.0, 4, &[]),
                flat_chunk(ChunkCoord::new(1, 0), 150.0, 4, &[]),
            ],
        };
        let mut loader = TerrainLoader::new(level, &DecorationSettings::default());
        let mut store = ChunkStore::new(150.0, TerrainSettings::default());
        let mut host = HeadlessHost::default();

        let mut states = Vec::new();
        while !loader.state().is_finished() {
            states.push(loader.step(&mut store, &mut host).unwrap());
        }
        assert_eq!(
            states,
            vec![
                LoadState::BuildingChunk(0),
                LoadState::Stitching(0),
                LoadState::BuildingChunk(1),
                LoadState::Stitching(1),
                LoadState::Decorating(0),
                LoadState::Decorating(1),
                LoadState::Pruning(0),
                LoadState::Pruning(1),
                LoadState::Done,
            ]
        );
        // Further steps are no-ops
        assert_eq!(loader.step(&mut store, &mut host).unwrap(), LoadState::Done);
    }

    #[test]
    fn test_load_order_does_not_change_placements() {
        let flat = flat_chunk(ChunkCoord::new(0, 0), 150.0, 5, &[]);
        let cells: Vec<(usize, usize)> = (0..5).flat_map(|y| (0..5).map(move |x| (x, y))).collect();
        let mut sunken = flat_chunk(ChunkCoord::new(1, 0), 150.0, 5, &cells);
        sunken.heights = vec![-10.0; 25];

        let load = |chunks: Vec<ChunkData>| {
            let level = LevelData {
                version: LEVEL_VERSION,
                name: String::new(),
                settings: None,
                chunks,
            };
            let mut loader = TerrainLoader::new(level, &DecorationSettings::default());
            let mut store = ChunkStore::new(150.0, TerrainSettings::default());
            let mut host = HeadlessHost::default();
            loader.run_to_completion(&mut store, &mut host).unwrap();
            store
                .try_get(ChunkCoord::new(0, 0))
                .unwrap()
                .placements()
                .to_vec()
        };

        let flat_first = load(vec![flat.clone(), sunken.clone()]);
        let sunken_first = load(vec![sunken, flat]);
        assert_eq!(flat_first, sunken_first);

        // Objects by the shared border sit on the lower neighbour
        assert!(flat_first
            .iter()
            .flat_map(|p| p.positions())
            .any(|pos| pos.y == -10.0));
    }

    #[test]
    fn test_cancel_releases_store() {
        let (mut loader, mut store) = generated();
        let mut host = HeadlessHost::default();
        for _ in 0..8 {
            loader.step(&mut store, &mut host).unwrap();
        }
        assert!(!store.is_empty());

        loader.cancel(&mut store, &mut host);
        assert_eq!(loader.state(), LoadState::Cancelled);
        assert!(store.is_empty());
        assert!(host.built.is_empty());
        assert_eq!(loader.step(&mut store, &mut host).unwrap(), LoadState::Cancelled);
    }

    #[test]
    fn test_bad_chunk_cancels_load() {
        let mut bad = flat_chunk(ChunkCoord::new(1, 0), 150.0, 4, &[]);
        bad.heights.pop();
        let level = LevelData {
            version: LEVEL_VERSION,
            name: String::new(),
            settings: None,
            chunks: vec![flat_chunk(ChunkCoord::new(0, 0), 150.0, 4, &[]), bad],
        };
        let mut loader = TerrainLoader::new(level, &DecorationSettings::default());
        let mut store = ChunkStore::new(150.0, TerrainSettings::default());
        let mut host = HeadlessHost::default();

        let result = loader.run_to_completion(&mut store, &mut host);
        assert!(matches!(result, Err(TerrainError::SampleLength { name: "heights", .. })));
        assert_eq!(loader.state(), LoadState::Cancelled);
        // The first chunk was fully loaded and stays
        assert_eq!(store.len(), 1);
        assert!(store.try_get(ChunkCoord::new(0, 0)).unwrap().has_mesh());
    }

    #[test]
    fn test_empty_level_finishes_immediately() {
        let level = LevelData {
            version: LEVEL_VERSION,
            name: String::new(),
            settings: None,
            chunks: Vec::new(),
        };
        let mut loader = TerrainLoader::new(level, &DecorationSettings::default());
        let mut store = ChunkStore::new(150.0, TerrainSettings::default());
        let mut host = HeadlessHost::default();
        assert_eq!(loader.step(&mut store, &mut host).unwrap(), LoadState::Done);
        assert_eq!(loader.stats().chunks, 0);
    }
}
