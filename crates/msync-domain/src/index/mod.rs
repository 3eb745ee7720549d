//! In-memory view of the index snapshot used by rebuild.
//!
//! The snapshot stores every manifest location as a chain of path fragments linked by
//! parent ids (an adjacency list). [`PathResolver`] turns a fragment id back into the
//! slash-separated path, walking iteratively and memoizing every ancestor it resolves.

use std::collections::{HashMap, HashSet};

pub const PATH_SEPARATOR: char = '/';

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("index references unknown name id {0}")]
    MissingName(i64),
    #[error("index references unknown path part id {0}")]
    MissingPathPart(i64),
    #[error("index path parts form a cycle through id {0}")]
    Cycle(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPart {
    pub parent: Option<i64>,
    pub fragment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestRow {
    pub name_id: i64,
    pub path_part_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct IndexTree {
    names: HashMap<i64, String>,
    path_parts: HashMap<i64, PathPart>,
    manifests: Vec<ManifestRow>,
}

impl IndexTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_name(&mut self, id: i64, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    pub fn insert_path_part(&mut self, id: i64, parent: Option<i64>, fragment: impl Into<String>) {
        self.path_parts.insert(
            id,
            PathPart {
                parent,
                fragment: fragment.into(),
            },
        );
    }

    pub fn push_manifest(&mut self, name_id: i64, path_part_id: i64) {
        self.manifests.push(ManifestRow {
            name_id,
            path_part_id,
        });
    }

    #[must_use]
    pub fn manifests(&self) -> &[ManifestRow] {
        &self.manifests
    }

    pub fn name(&self, id: i64) -> Result<&str, IndexError> {
        self.names
            .get(&id)
            .map(String::as_str)
            .ok_or(IndexError::MissingName(id))
    }

    #[must_use]
    pub fn resolver(&self) -> PathResolver<'_> {
        PathResolver {
            tree: self,
            cache: HashMap::new(),
        }
    }
}

pub struct PathResolver<'a> {
    tree: &'a IndexTree,
    cache: HashMap<i64, String>,
}

impl PathResolver<'_> {
    /// Full path of fragment `id`: its ancestors' fragments joined by [`PATH_SEPARATOR`].
    pub fn resolve(&mut self, id: i64) -> Result<String, IndexError> {
        if let Some(cached) = self.cache.get(&id) {
            return Ok(cached.clone());
        }

        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut base = None;
        let mut current = Some(id);
        while let Some(cursor) = current {
            if let Some(cached) = self.cache.get(&cursor) {
                base = Some(cached.clone());
                break;
            }
            if !visited.insert(cursor) {
                return Err(IndexError::Cycle(cursor));
            }
            let part = self
                .tree
                .path_parts
                .get(&cursor)
                .ok_or(IndexError::MissingPathPart(cursor))?;
            chain.push(cursor);
            current = part.parent;
        }

        let mut resolved = String::new();
        for cursor in chain.into_iter().rev() {
            let part = &self.tree.path_parts[&cursor];
            resolved = match (part.parent, base.take()) {
                (None, _) => part.fragment.clone(),
                (Some(_), Some(parent_path)) => {
                    format!("{parent_path}{PATH_SEPARATOR}{}", part.fragment)
                }
                (Some(_), None) => format!("{resolved}{PATH_SEPARATOR}{}", part.fragment),
            };
            self.cache.insert(cursor, resolved.clone());
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> IndexTree {
        let mut tree = IndexTree::new();
        tree.insert_name(10, "Publisher.App");
        tree.insert_path_part(1, None, "publisher");
        tree.insert_path_part(2, Some(1), "app");
        tree.insert_path_part(3, Some(2), "1.0");
        tree.insert_path_part(4, Some(2), "2.0");
        tree.push_manifest(10, 3);
        tree
    }

    #[test]
    fn resolves_nested_path() {
        let tree = sample_tree();
        let mut resolver = tree.resolver();
        assert_eq!(resolver.resolve(3).unwrap(), "publisher/app/1.0");
        assert_eq!(resolver.resolve(1).unwrap(), "publisher");
    }

    #[test]
    fn shared_ancestors_are_memoized() {
        let tree = sample_tree();
        let mut resolver = tree.resolver();
        resolver.resolve(3).unwrap();
        assert_eq!(resolver.cache.len(), 3);
        assert_eq!(resolver.resolve(4).unwrap(), "publisher/app/2.0");
        assert_eq!(resolver.cache.len(), 4);
    }

    #[test]
    fn cycles_are_detected() {
        let mut tree = IndexTree::new();
        tree.insert_path_part(1, Some(2), "a");
        tree.insert_path_part(2, Some(1), "b");
        assert!(matches!(
            tree.resolver().resolve(1),
            Err(IndexError::Cycle(_))
        ));
    }

    #[test]
    fn dangling_references_are_reported() {
        let tree = sample_tree();
        assert_eq!(
            tree.resolver().resolve(99).unwrap_err(),
            IndexError::MissingPathPart(99)
        );
        assert_eq!(tree.name(11).unwrap_err(), IndexError::MissingName(11));
        assert_eq!(tree.name(10).unwrap(), "Publisher.App");
    }
}
