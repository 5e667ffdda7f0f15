//! Hole identities shared by terrain points, possibly across several chunks.
//!
//! Points keep the [`HoleId`] they were handed when their map was built. Merging two holes
//! only touches this table: the subsumed identity is redirected to the survivor and every
//! lookup resolves through the redirects, compressing paths as it goes.

use serde::{Deserialize, Serialize};

/// Handle to a hole identity. Resolve it with [`HoleTable::find`] before comparing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HoleId(u32);

impl HoleId {
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Union-find over every hole identity created during a load.
#[derive(Debug, Default, Clone)]
pub struct HoleTable {
    parent: Vec<u32>,
    size: Vec<u32>,
}

impl HoleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh, unmerged identity.
    pub fn create(&mut self) -> HoleId {
        let id = self.parent.len() as u32;
        self.parent.push(id);
        self.size.push(1);
        HoleId(id)
    }

    /// Number of identities ever created, merged or not.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Number of distinct holes left after merging.
    pub fn distinct(&self) -> usize {
        self.parent
            .iter()
            .enumerate()
            .filter(|(i, p)| *i as u32 == **p)
            .count()
    }

    /// Canonical identity for `id`, compressing the redirect chain.
    pub fn find(&mut self, id: HoleId) -> HoleId {
        let mut root = id.0;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }

        let mut current = id.0;
        while self.parent[current as usize] != root {
            let next = self.parent[current as usize];
            self.parent[current as usize] = root;
            current = next;
        }

        HoleId(root)
    }

    /// Canonical identity for `id` without mutating the table.
    pub fn resolve(&self, id: HoleId) -> HoleId {
        let mut root = id.0;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        HoleId(root)
    }

    pub fn same(&mut self, a: HoleId, b: HoleId) -> bool {
        self.find(a) == self.find(b)
    }

    /// Unify two identities and return the survivor.
    ///
    /// The larger set survives; on a tie `a`'s identity does.
    pub fn merge(&mut self, a: HoleId, b: HoleId) -> HoleId {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return ra;
        }

        let (survivor, subsumed) = if self.size[rb.index()] > self.size[ra.index()] {
            (rb, ra)
        } else {
            (ra, rb)
        };

        self.parent[subsumed.index()] = survivor.0;
        self.size[survivor.index()] += self.size[subsumed.index()];
        survivor
    }

    pub fn clear(&mut self) {
        self.parent.clear();
        self.size.clear();
    }
}
