//! Registry of every chunk in the loaded level.
//!
//! Records live in an arena and are addressed by [`ChunkId`]; an id handed out once keeps
//! pointing at the same record until [`ChunkStore::clear`]. Refreshing a chunk updates the
//! record in place.

use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::biome::TerrainSettings;
use crate::chunk::{Bounds, ChunkCoord, NeighbourDirection};
use crate::config::GenerationConfig;
use crate::decoration::{count_objects, DecorationPlacer, WorldObjectPlacement};
use crate::error::TerrainError;
use crate::hole::{HoleId, HoleTable};
use crate::host::ChunkHost;
use crate::level::ChunkData;
use crate::terrain_map::{grid_base_positions, TerrainMap};

/// Stable handle to a [`ChunkRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkId(usize);

/// Everything the core knows about one chunk.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    coord: ChunkCoord,
    bounds: Bounds,
    map: TerrainMap,
    data: ChunkData,
    placements: Vec<WorldObjectPlacement>,
    decorated: bool,
    pruned: bool,
    visible: bool,
    mesh_built: bool,
}

impl ChunkRecord {
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn map(&self) -> &TerrainMap {
        &self.map
    }

    /// Level data this chunk was last created or refreshed from
    pub fn data(&self) -> &ChunkData {
        &self.data
    }

    pub fn placements(&self) -> &[WorldObjectPlacement] {
        &self.placements
    }

    /// True once placements were generated for this chunk.
    pub fn is_decorated(&self) -> bool {
        self.decorated
    }

    /// True once placements were pruned against the neighbours and will not change again.
    pub fn has_final_placements(&self) -> bool {
        self.pruned
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn has_mesh(&self) -> bool {
        self.mesh_built
    }
}

/// Result of stitching one chunk against its registered neighbours.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StitchReport {
    pub merges: usize,
    /// Chunks containing a hole whose identity changed, sorted
    pub dirty: Vec<ChunkCoord>,
    /// Neighbours that could not be stitched because their grids differ in size
    pub rejected: Vec<ChunkCoord>,
}

impl StitchReport {
    pub fn needs_update(&self) -> bool {
        self.merges > 0
    }
}

#[derive(Resource, Debug)]
pub struct ChunkStore {
    chunk_size: f32,
    settings: TerrainSettings,
    records: Vec<ChunkRecord>,
    index: HashMap<ChunkCoord, ChunkId>,
    holes: HoleTable,
}

impl ChunkStore {
    pub fn new(chunk_size: f32, settings: TerrainSettings) -> Self {
        Self {
            chunk_size: chunk_size.max(1.0),
            settings,
            records: Vec::new(),
            index: HashMap::new(),
            holes: HoleTable::new(),
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new(config.chunk_size, config.terrain.clone())
    }

    pub fn chunk_size(&self) -> f32 {
        self.chunk_size
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    /// Settings used for chunks created from now on.
    pub fn set_settings(&mut self, settings: TerrainSettings) {
        self.settings = settings;
    }

    pub fn holes(&self) -> &HoleTable {
        &self.holes
    }

    pub fn holes_mut(&mut self) -> &mut HoleTable {
        &mut self.holes
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Register a chunk, or refresh the stored data of an existing one.
    ///
    /// A refresh keeps the record's identity, map, placements and visibility.
    pub fn get_or_create(&mut self, data: &ChunkData) -> Result<ChunkId, TerrainError> {
        let coord = data.coord();
        if let Some(&id) = self.index.get(&coord) {
            debug!("Refreshing chunk data for {}", coord);
            self.records[id.0].data = data.clone();
            return Ok(id);
        }

        let bounds = data.bounds();
        if !self.fits_grid(data) {
            let expected = self.chunk_bounds(coord);
            warn!(
                "Chunk {} data spans centre {} size {}, but the store grid expects centre {} size {}",
                coord, bounds.centre, bounds.size, expected.centre, expected.size
            );
        }
        let base_positions = grid_base_positions(bounds, data.width, data.height);
        let map = TerrainMap::new(
            coord,
            data.width,
            data.height,
            bounds,
            data.samples(&base_positions),
            &self.settings,
            &mut self.holes,
        )?;

        let id = ChunkId(self.records.len());
        self.records.push(ChunkRecord {
            coord,
            bounds,
            map,
            data: data.clone(),
            placements: Vec::new(),
            decorated: false,
            pruned: false,
            visible: false,
            mesh_built: false,
        });
        self.index.insert(coord, id);
        Ok(id)
    }

    pub fn id_of(&self, coord: ChunkCoord) -> Option<ChunkId> {
        self.index.get(&coord).copied()
    }

    pub fn get(&self, id: ChunkId) -> &ChunkRecord {
        &self.records[id.0]
    }

    pub fn try_get(&self, coord: ChunkCoord) -> Option<&ChunkRecord> {
        self.id_of(coord).map(|id| &self.records[id.0])
    }

    /// Registered chunks among `coords`, in the order given.
    pub fn get_chunks(&self, coords: &[ChunkCoord]) -> Vec<&ChunkRecord> {
        coords.iter().filter_map(|c| self.try_get(*c)).collect()
    }

    /// Every record in registration order.
    pub fn all_chunks(&self) -> impl Iterator<Item = &ChunkRecord> {
        self.records.iter()
    }

    pub fn exists(&self, coord: ChunkCoord) -> bool {
        self.index.contains_key(&coord)
    }

    pub fn is_visible(&self, coord: ChunkCoord) -> bool {
        self.try_get(coord).is_some_and(ChunkRecord::is_visible)
    }

    pub fn world_to_chunk(&self, pos: Vec3) -> ChunkCoord {
        ChunkCoord::from_world_pos(pos, self.chunk_size)
    }

    pub fn chunk_centre_world(&self, coord: ChunkCoord) -> Vec3 {
        coord.centre_world(self.chunk_size)
    }

    /// Flat world-space bounds of a grid cell, whether or not the chunk is registered.
    pub fn chunk_bounds(&self, coord: ChunkCoord) -> Bounds {
        Bounds::new(
            self.chunk_centre_world(coord),
            Vec3::new(self.chunk_size, 0.0, self.chunk_size),
        )
    }

    /// Position relative to the chunk's min corner, in world space.
    pub fn local_to_world(&self, coord: ChunkCoord, local: Vec3) -> Vec3 {
        coord.min_corner_world(self.chunk_size) + local
    }

    /// True if the data's horizontal footprint matches its cell in this store's grid.
    pub fn fits_grid(&self, data: &ChunkData) -> bool {
        const TOLERANCE: f32 = 1e-3;
        let expected = self.chunk_bounds(data.coord());
        let actual = data.bounds();
        (actual.centre.x - expected.centre.x).abs() <= TOLERANCE
            && (actual.centre.z - expected.centre.z).abs() <= TOLERANCE
            && (actual.size.x - expected.size.x).abs() <= TOLERANCE
            && (actual.size.z - expected.size.z).abs() <= TOLERANCE
    }

    /// Make exactly the chunks in `visible` visible and hide every other chunk.
    pub fn set_visible(&mut self, visible: &HashSet<ChunkCoord>, host: &mut impl ChunkHost) {
        for record in self.records.iter_mut() {
            record.visible = visible.contains(&record.coord);
            host.set_visible(record.coord, record.visible);
        }
    }

    /// Show only the chunks whose centre lies within `view_distance` of `pos`.
    ///
    /// A non-positive or NaN view distance leaves visibility untouched. Returns the number of
    /// visible chunks.
    pub fn set_visible_within(
        &mut self,
        pos: Vec3,
        view_distance: f32,
        host: &mut impl ChunkHost,
    ) -> usize {
        if !(view_distance > 0.0) {
            return self.records.iter().filter(|r| r.visible).count();
        }
        let max_sq = view_distance * view_distance;
        let visible: HashSet<ChunkCoord> = self
            .records
            .iter()
            .filter(|r| (r.bounds.centre - pos).length_squared() <= max_sq)
            .map(|r| r.coord)
            .collect();
        self.set_visible(&visible, host);
        visible.len()
    }

    /// Stitch `coord` against every registered neighbour.
    pub fn stitch_with_neighbours(&mut self, coord: ChunkCoord) -> Result<StitchReport, TerrainError> {
        let id = self.id_of(coord).ok_or(TerrainError::UnknownChunk(coord))?;
        let mut report = StitchReport::default();
        let mut survivors: Vec<HoleId> = Vec::new();

        for direction in NeighbourDirection::ALL {
            let Some(other) = self.id_of(coord.step(direction)) else {
                continue;
            };
            if other == id {
                continue;
            }

            let (this, neighbour) = pair_mut(&mut self.records, id, other);
            match this.map.stitch_merges(direction, &mut neighbour.map, &mut self.holes) {
                Ok(merged) => {
                    report.merges += merged.len();
                    survivors.extend(merged);
                }
                Err(TerrainError::MismatchedDimensions { .. }) => {
                    report.rejected.push(neighbour.coord);
                }
                Err(e) => return Err(e),
            }
        }

        if !survivors.is_empty() {
            let roots: HashSet<HoleId> = survivors.iter().map(|h| self.holes.find(*h)).collect();
            report.dirty = self.chunks_with_holes(&roots);
            info!(
                "Stitching {} merged {} split hole(s); {} chunk(s) need rebuilding",
                coord,
                report.merges,
                report.dirty.len()
            );
        }

        Ok(report)
    }

    fn chunks_with_holes(&mut self, roots: &HashSet<HoleId>) -> Vec<ChunkCoord> {
        let holes = &mut self.holes;
        let mut dirty: Vec<ChunkCoord> = self
            .records
            .iter()
            .filter(|r| {
                r.map
                    .points()
                    .iter()
                    .filter_map(|p| p.hole())
                    .any(|h| roots.contains(&holes.find(h)))
            })
            .map(|r| r.coord)
            .collect();
        dirty.sort();
        dirty
    }

    /// Store freshly generated placements for a chunk.
    pub fn set_placements(
        &mut self,
        coord: ChunkCoord,
        placements: Vec<WorldObjectPlacement>,
    ) -> Result<(), TerrainError> {
        let id = self.id_of(coord).ok_or(TerrainError::UnknownChunk(coord))?;
        let record = &mut self.records[id.0];
        record.placements = placements;
        record.decorated = true;
        record.pruned = false;
        Ok(())
    }

    /// Prune a chunk's placements against every adjacent chunk whose placements are final,
    /// then mark this chunk's placements final too.
    ///
    /// Returns how many objects were removed.
    pub fn prune_against_neighbours(
        &mut self,
        coord: ChunkCoord,
        placer: &DecorationPlacer,
    ) -> Result<usize, TerrainError> {
        let id = self.id_of(coord).ok_or(TerrainError::UnknownChunk(coord))?;
        let before = count_objects(&self.records[id.0].placements);

        for (_, adjacent) in coord.adjacent() {
            let Some(other) = self.id_of(adjacent) else {
                continue;
            };
            if other == id || !self.records[other.0].pruned {
                continue;
            }
            let (this, neighbour) = pair_mut(&mut self.records, id, other);
            placer.prune(&mut this.placements, &neighbour.placements);
        }
        self.records[id.0].pruned = true;

        Ok(before - count_objects(&self.records[id.0].placements))
    }

    /// Hand a stitched chunk to the host for meshing.
    pub fn build_mesh(&mut self, coord: ChunkCoord, host: &mut impl ChunkHost) -> Result<(), TerrainError> {
        let id = self.id_of(coord).ok_or(TerrainError::UnknownChunk(coord))?;
        host.build_mesh(&self.records[id.0], &self.holes);
        self.records[id.0].mesh_built = true;
        Ok(())
    }

    /// Rebuild the meshes of the chunks in `coords` that were already handed to the host.
    pub fn rebuild_meshes(&mut self, coords: &[ChunkCoord], host: &mut impl ChunkHost) -> usize {
        let mut rebuilt = 0;
        for coord in coords {
            let Some(id) = self.id_of(*coord) else {
                continue;
            };
            if self.records[id.0].mesh_built {
                host.build_mesh(&self.records[id.0], &self.holes);
                rebuilt += 1;
            }
        }
        rebuilt
    }

    /// Release every chunk and its host resources, and reset the grid.
    pub fn clear(&mut self, host: &mut impl ChunkHost) {
        for record in &self.records {
            host.destroy(record.coord);
        }
        self.records.clear();
        self.index.clear();
        self.holes.clear();
    }
}

fn pair_mut(
    records: &mut [ChunkRecord],
    a: ChunkId,
    b: ChunkId,
) -> (&mut ChunkRecord, &mut ChunkRecord) {
    debug_assert_ne!(a, b);
    if a.0 < b.0 {
        let (low, high) = records.split_at_mut(b.0);
        (&mut low[a.0], &mut high[0])
    } else {
        let (low, high) = records.split_at_mut(a.0);
        (&mut high[0], &mut low[b.0])
    }
}
