use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage identity of a catalog item: the lower-cased display name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey(pub String);

impl ItemKey {
    pub fn from_name(name: &str) -> Self {
        Self(name.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(alias = "title")]
    pub name: String,
    pub images: Vec<String>,
}

impl Item {
    pub fn new(name: impl Into<String>, images: Vec<String>) -> Self {
        Self { name: name.into(), images }
    }

    pub fn key(&self) -> ItemKey {
        ItemKey::from_name(&self.name)
    }

    pub fn page_count(&self) -> usize {
        self.images.len()
    }

    pub fn image(&self, page: usize) -> Option<&str> {
        self.images.get(page).map(String::as_str)
    }
}
