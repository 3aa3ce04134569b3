use std::collections::HashMap;
use lazy_static::lazy_static;

include!(concat!(env!("OUT_DIR"), "/library_table.rs"));

lazy_static! {
    static ref BUILTIN: LibraryTable = LibraryTable::from_pairs(LIBRARY_SOURCES.iter().copied());
}

/// Named GLSL fragments that shaders can pull in with `#import("name")`.
#[derive(Clone, Debug, Default)]
pub struct LibraryTable {
    sources: HashMap<String, String>,
}

impl LibraryTable {
    /// The libraries under `shaders/libs`, baked in at build time.
    pub fn builtin() -> &'static LibraryTable {
        &BUILTIN
    }

    pub fn from_pairs<I, N, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        Self {
            sources: pairs.into_iter().map(|(n, s)| (n.into(), s.into())).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.sources.get(name).map(|s| s.as_str())
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sources.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}
