use std::collections::HashMap;

pub use string_cache::DefaultAtom as Atom;

/// Interned stimulus names in first-seen order.
///
/// Ids are dense and stable for the lifetime of the catalog, so they can be
/// used as indices into a preload list handed to the presentation layer.
#[derive(Debug, Clone, Default)]
pub struct StimulusCatalog {
    atoms: Vec<Atom>,
    index: HashMap<Atom, usize>,
}

impl StimulusCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an already interned atom and return its id
    pub fn insert(&mut self, atom: &Atom) -> usize {
        if let Some(&id) = self.index.get(atom) {
            return id;
        }
        let id = self.atoms.len();
        self.atoms.push(atom.clone());
        self.index.insert(atom.clone(), id);
        id
    }

    /// Current count of unique stimuli
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.iter()
    }

    pub fn into_atoms(self) -> Vec<Atom> {
        self.atoms
    }
}
