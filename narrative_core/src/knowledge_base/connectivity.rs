//! Connectivity analysis over the atom index.
//!
//! Two atoms are neighbours when their cells are adjacent and they suggest at
//! least one common next action. Clusters are the connected components of
//! that relation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::index::AtomIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NeighbourClass {
    #[default]
    Isolated,
    /// One or two neighbours.
    Sparse,
    Dense,
}

impl NeighbourClass {
    pub fn from_count(neighbours: usize) -> Self {
        match neighbours {
            0 => NeighbourClass::Isolated,
            1..=2 => NeighbourClass::Sparse,
            _ => NeighbourClass::Dense,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Connectivity {
    pub neighbours: usize,
    pub class: NeighbourClass,
    /// Assigned by [`AtomIndex::analyze_connectivity`].
    pub cluster: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityReport {
    pub clusters: usize,
    pub isolated: usize,
}

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }
}

impl AtomIndex {
    /// Recompute neighbour counts, classes and cluster ids for every atom.
    pub fn analyze_connectivity(&mut self) -> ConnectivityReport {
        let nodes: Vec<_> = self
            .atoms()
            .map(|(r, atom)| {
                let names: BTreeSet<String> =
                    atom.next_actions().iter().map(|n| n.action.clone()).collect();
                (r.cell, names)
            })
            .collect();

        let mut neighbours = vec![0usize; nodes.len()];
        let mut sets = DisjointSet::new(nodes.len());
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let (cell_i, names_i) = &nodes[i];
                let (cell_j, names_j) = &nodes[j];
                if cell_i.is_adjacent(*cell_j) && !names_i.is_disjoint(names_j) {
                    neighbours[i] += 1;
                    neighbours[j] += 1;
                    sets.union(i, j);
                }
            }
        }

        let mut cluster_ids: HashMap<usize, usize> = HashMap::new();
        let mut isolated = 0;
        let mut i = 0;
        for cell in self.cells_mut() {
            for atom in cell.atoms_mut() {
                let root = sets.find(i);
                let next_id = cluster_ids.len();
                let cluster = *cluster_ids.entry(root).or_insert(next_id);
                let class = NeighbourClass::from_count(neighbours[i]);
                if class == NeighbourClass::Isolated {
                    isolated += 1;
                }
                atom.core_mut().connectivity = Connectivity {
                    neighbours: neighbours[i],
                    class,
                    cluster: Some(cluster),
                };
                i += 1;
            }
        }

        tracing::debug!(
            atoms = i,
            clusters = cluster_ids.len(),
            isolated,
            "atom connectivity analysed"
        );
        ConnectivityReport {
            clusters: cluster_ids.len(),
            isolated,
        }
    }
}
