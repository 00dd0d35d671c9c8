use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use thiserror::Error;

use crate::domain::item::{Item, ItemKey};

#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("could not read catalog file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog contains no items")]
    Empty,
    #[error("catalog entry #{index} has a blank name")]
    BlankName { index: usize },
    #[error("catalog item `{name}` has no images")]
    NoImages { name: String },
    #[error("catalog item `{name}` has a blank image reference at position {position}")]
    BlankImage { name: String, position: usize },
    #[error("catalog item `{name}` duplicates the identity `{key}`")]
    DuplicateItem { name: String, key: ItemKey },
}

/// Read-only list of votable items, loaded once at startup.
#[derive(Clone, Debug)]
pub struct Catalog {
    items: Vec<Item>,
}

impl Catalog {
    pub fn new(items: Vec<Item>) -> Result<Self, CatalogLoadError> {
        validate(&items)?;
        Ok(Self { items })
    }

    pub fn load(path: &Path) -> Result<Self, CatalogLoadError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| CatalogLoadError::ReadFile { path: path.to_path_buf(), source })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CatalogLoadError> {
        let items: Vec<Item> = serde_json::from_str(raw)?;
        Self::new(items)
    }

    pub fn pick_random<R>(&self, rng: &mut R) -> &Item
    where
        R: Rng + ?Sized,
    {
        &self.items[rng.gen_range(0..self.items.len())]
    }

    pub fn all(&self) -> &[Item] {
        &self.items
    }

    pub fn find(&self, key: &ItemKey) -> Option<&Item> {
        self.items.iter().find(|item| &item.key() == key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn validate(items: &[Item]) -> Result<(), CatalogLoadError> {
    if items.is_empty() {
        return Err(CatalogLoadError::Empty);
    }

    let mut seen = HashSet::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if item.name.trim().is_empty() {
            return Err(CatalogLoadError::BlankName { index });
        }
        if item.images.is_empty() {
            return Err(CatalogLoadError::NoImages { name: item.name.clone() });
        }
        if let Some(position) = item.images.iter().position(|image| image.trim().is_empty()) {
            return Err(CatalogLoadError::BlankImage { name: item.name.clone(), position });
        }

        let key = item.key();
        if !seen.insert(key.clone()) {
            return Err(CatalogLoadError::DuplicateItem { name: item.name.clone(), key });
        }
    }

    Ok(())
}
