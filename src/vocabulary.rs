//! Class vocabulary reconciliation.
//!
//! Two independently numbered taxonomies coexist during evaluation: the
//! fixed reference numbering (which may have gaps, e.g. ids 1..90 for 80
//! actual classes) and a dataset taxonomy carrying extra classes. Extended
//! classes are assigned ids from a reserved offset so the two ranges never
//! collide. Names are compared case-insensitively throughout, because the
//! two source taxonomies differ in capitalization convention.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{EvalError, Result};
use crate::types::{Category, CocoDataset};

/// First id handed out to classes absent from the reference taxonomy.
pub const EXTENDED_ID_OFFSET: u32 = 100;

/// Bidirectional map between class names and numeric ids, spanning the
/// reference and extended numbering spaces.
///
/// Within one vocabulary every class name maps to exactly one id; ids are
/// reused for a class across images and models only through this single
/// mapping instance.
#[derive(Debug, Clone, Default)]
pub struct ClassVocabulary {
    ids_by_key: BTreeMap<String, u32>,
    names_by_id: BTreeMap<u32, String>,
}

impl ClassVocabulary {
    /// Build a vocabulary from the reference taxonomy plus extended class
    /// names.
    ///
    /// Reference ids are taken verbatim and must stay below
    /// [`EXTENDED_ID_OFFSET`]. Each extended name not already present gets
    /// the next free id starting at the offset.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` when a name (compared lowercase) would end up with
    /// two different ids, when two distinct names share an id, or when a
    /// reference id reaches into the extended range.
    pub fn build(reference: &[Category], extended: &[String]) -> Result<Self> {
        let mut vocab = Self::default();

        for category in reference {
            if category.id >= EXTENDED_ID_OFFSET {
                return Err(EvalError::Conflict(format!(
                    "reference id {} for '{}' collides with the extended range (>= {})",
                    category.id, category.name, EXTENDED_ID_OFFSET
                )));
            }
            vocab.insert(category.id, &category.name)?;
        }

        let mut next_id = EXTENDED_ID_OFFSET;
        for name in extended {
            if vocab.ids_by_key.contains_key(&name.to_lowercase()) {
                continue;
            }
            while vocab.names_by_id.contains_key(&next_id) {
                next_id += 1;
            }
            vocab.insert(next_id, name)?;
            next_id += 1;
        }

        Ok(vocab)
    }

    fn insert(&mut self, id: u32, name: &str) -> Result<()> {
        let key = name.to_lowercase();
        if let Some(&existing) = self.ids_by_key.get(&key) {
            if existing != id {
                return Err(EvalError::Conflict(format!(
                    "class '{name}' already mapped to id {existing}, cannot assign {id}"
                )));
            }
            return Ok(());
        }
        if let Some(existing) = self.names_by_id.get(&id) {
            return Err(EvalError::Conflict(format!(
                "id {id} already assigned to '{existing}', cannot assign '{name}'"
            )));
        }
        self.ids_by_key.insert(key, id);
        self.names_by_id.insert(id, name.to_string());
        Ok(())
    }

    /// Look up the id for a class name, case-insensitively.
    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.ids_by_key.get(&name.to_lowercase()).copied()
    }

    /// Look up the canonical name for an id.
    pub fn name_of(&self, id: u32) -> Option<&str> {
        self.names_by_id.get(&id).map(String::as_str)
    }

    /// Whether the vocabulary knows this class name.
    pub fn contains(&self, name: &str) -> bool {
        self.ids_by_key.contains_key(&name.to_lowercase())
    }

    /// Number of classes in the vocabulary.
    pub fn len(&self) -> usize {
        self.names_by_id.len()
    }

    /// Whether the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.names_by_id.is_empty()
    }

    /// Canonical class names, ordered by id.
    pub fn names(&self) -> Vec<&str> {
        self.names_by_id.values().map(String::as_str).collect()
    }

    /// Iterate (id, canonical name) pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names_by_id.iter().map(|(&id, name)| (id, name.as_str()))
    }

    /// Build the old-id -> new-id table taking a foreign taxonomy into this
    /// vocabulary's numbering. Categories whose name is unknown here are
    /// left out of the table.
    pub fn remap_table(&self, categories: &[Category]) -> BTreeMap<u32, u32> {
        categories
            .iter()
            .filter_map(|c| self.id_of(&c.name).map(|new_id| (c.id, new_id)))
            .collect()
    }
}

/// Case-insensitive set intersection of class names.
///
/// Returned names keep the spelling of `a` (the annotation-side taxonomy).
pub fn common_classes(a: &BTreeSet<String>, b: &BTreeSet<String>) -> BTreeSet<String> {
    let b_keys: BTreeSet<String> = b.iter().map(|s| s.to_lowercase()).collect();
    a.iter()
        .filter(|name| b_keys.contains(&name.to_lowercase()))
        .cloned()
        .collect()
}

/// Apply an id renumbering to a COCO-style collection, rewriting every
/// category reference. The input is left untouched.
///
/// Ids absent from `old_to_new` are carried over unchanged. This transform
/// is NOT idempotent: applying it twice double-remaps, so callers must
/// always remap from a pristine copy, exactly once per collection.
pub fn remap(dataset: &CocoDataset, old_to_new: &BTreeMap<u32, u32>) -> CocoDataset {
    let lookup = |id: u32| old_to_new.get(&id).copied().unwrap_or(id);

    let categories = dataset
        .categories
        .iter()
        .map(|c| Category {
            id: lookup(c.id),
            name: c.name.clone(),
            supercategory: c.supercategory.clone(),
        })
        .collect();

    let annotations = dataset
        .annotations
        .iter()
        .map(|a| {
            let mut ann = a.clone();
            ann.category_id = lookup(a.category_id);
            ann
        })
        .collect();

    CocoDataset {
        images: dataset.images.clone(),
        categories,
        annotations,
    }
}
