//! Seam between the core and whatever renders/collides chunks.

use std::collections::HashSet;

use crate::chunk::ChunkCoord;
use crate::chunk_store::ChunkRecord;
use crate::hole::HoleTable;

/// Mesh building, visibility and teardown of chunk visuals, addressed by chunk coordinate.
pub trait ChunkHost {
    /// Build, or rebuild after a hole merge, the mesh of a fully stitched chunk.
    fn build_mesh(&mut self, chunk: &ChunkRecord, holes: &HoleTable);

    fn set_visible(&mut self, coord: ChunkCoord, visible: bool);

    /// Release every resource held for the chunk.
    fn destroy(&mut self, coord: ChunkCoord);
}

/// Host without any resources. It only remembers what it was asked to do.
#[derive(Debug, Default, Clone)]
pub struct HeadlessHost {
    pub built: HashSet<ChunkCoord>,
    pub builds: usize,
    pub visible: HashSet<ChunkCoord>,
    pub destroyed: usize,
}

impl ChunkHost for HeadlessHost {
    fn build_mesh(&mut self, chunk: &ChunkRecord, _holes: &HoleTable) {
        self.built.insert(chunk.coord());
        self.builds += 1;
    }

    fn set_visible(&mut self, coord: ChunkCoord, visible: bool) {
        if visible {
            self.visible.insert(coord);
        } else {
            self.visible.remove(&coord);
        }
    }

    fn destroy(&mut self, coord: ChunkCoord) {
        self.built.remove(&coord);
        self.visible.remove(&coord);
        self.destroyed += 1;
    }
}
