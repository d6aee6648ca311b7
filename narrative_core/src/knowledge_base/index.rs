//! The atom index - atoms bucketed into cells by shape.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::atom::{Atom, CellKey};

/// Stable reference to a stored atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AtomRef {
    pub cell: CellKey,
    /// Sequential id within the cell.
    pub id: usize,
}

impl std::fmt::Display for AtomRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.cell, self.id)
    }
}

/// Atoms sharing one shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    key: CellKey,
    atoms: Vec<Atom>,
}

impl Cell {
    fn new(key: CellKey) -> Self {
        Self {
            key,
            atoms: Vec::new(),
        }
    }

    pub fn key(&self) -> CellKey {
        self.key
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub(crate) fn atoms_mut(&mut self) -> &mut [Atom] {
        &mut self.atoms
    }
}

/// Result of [`AtomIndex::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Stored(AtomRef),
    /// Folded into an existing fact-set-equal atom.
    Merged(AtomRef),
    /// Atoms without facts are never stored.
    Empty,
}

/// All atoms, partitioned by (tension count, emotion count).
///
/// Atoms are only ever added; references stay valid for the life of the index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtomIndex {
    cells: BTreeMap<CellKey, Cell>,
}

impl AtomIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cell for a shape, creating it on first use.
    pub fn lookup_cell(&mut self, tensions: usize, emotions: usize) -> &mut Cell {
        let key = CellKey::new(tensions, emotions);
        self.cells.entry(key).or_insert_with(|| Cell::new(key))
    }

    pub fn cell(&self, key: CellKey) -> Option<&Cell> {
        self.cells.get(&key)
    }

    /// Store an atom, merging it into an existing one with the same facts.
    pub fn insert(&mut self, atom: Atom) -> InsertOutcome {
        if atom.core().fact_count() == 0 {
            return InsertOutcome::Empty;
        }
        let key = atom.shape();
        let cell = self.lookup_cell(key.tensions, key.emotions);

        if let Some(id) = cell
            .atoms
            .iter()
            .position(|existing| existing.core().same_facts(atom.core()))
        {
            cell.atoms[id].absorb(atom);
            return InsertOutcome::Merged(AtomRef { cell: key, id });
        }
        cell.atoms.push(atom);
        InsertOutcome::Stored(AtomRef {
            cell: key,
            id: cell.atoms.len() - 1,
        })
    }

    pub fn get(&self, atom: AtomRef) -> Option<&Atom> {
        self.cells.get(&atom.cell).and_then(|c| c.atoms.get(atom.id))
    }

    /// Cells in (tension, emotion) order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    /// Every atom with its reference, in cell order.
    pub fn atoms(&self) -> impl Iterator<Item = (AtomRef, &Atom)> {
        self.cells.values().flat_map(|cell| {
            cell.atoms.iter().enumerate().map(move |(id, atom)| {
                (
                    AtomRef {
                        cell: cell.key,
                        id,
                    },
                    atom,
                )
            })
        })
    }

    /// Number of stored atoms.
    pub fn len(&self) -> usize {
        self.cells.values().map(Cell::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.cells.values_mut()
    }
}
