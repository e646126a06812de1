//! Route resolution
//!
//! Maps request paths to registry entries. The table is built once from a
//! validated registry; lookups are exact-match only, so `/blogs/fastapi-2`
//! never resolves to `/blogs/fastapi` and unknown paths fall through to the
//! caller's not-found handling.

use crate::registry::Registry;
use indexmap::IndexMap;
use percent_encoding::percent_decode_str;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("duplicate route paths in registry: {}", paths.join(", "))]
    DuplicatePath { paths: Vec<String> },
}

/// Exact-match route table, one route per registry entry
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    by_path: IndexMap<String, usize>,
}

impl RouteTable {
    /// Build the table from a registry, failing if any two entries claim
    /// the same path. All duplicated paths are reported, not just the first.
    pub fn build(registry: &Registry) -> Result<Self, RouteError> {
        let mut by_path = IndexMap::with_capacity(registry.len());
        let mut duplicates = Vec::new();
        for (index, entry) in registry.entries().enumerate() {
            let path = normalize(&entry.path);
            if by_path.insert(path.clone(), index).is_some() && !duplicates.contains(&path) {
                duplicates.push(path);
            }
        }
        if !duplicates.is_empty() {
            return Err(RouteError::DuplicatePath { paths: duplicates });
        }
        Ok(Self { by_path })
    }

    /// Resolve a request path to a registry index. Percent-encoding is
    /// decoded and a single trailing slash is ignored; anything else must
    /// match the registered path exactly.
    pub fn resolve(&self, path: &str) -> Option<usize> {
        let decoded = percent_decode_str(path).decode_utf8().ok()?;
        self.by_path.get(&normalize(&decoded)).copied()
    }

    /// Registered routes in registry order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.by_path.iter().map(|(path, index)| (path.as_str(), *index))
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

/// Trim one trailing slash so `/blogs/fastapi/` and `/blogs/fastapi` are the
/// same route. The root path `/` stays as-is.
fn normalize(path: &str) -> String {
    if path.len() > 1 && path.ends_with('/') {
        path[..path.len() - 1].to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{BlogEntry, Registry};
    use chrono::NaiveDate;

    fn entry(path: &str) -> BlogEntry {
        BlogEntry {
            title: format!("Entry {path}"),
            date: NaiveDate::from_ymd_opt(2025, 1, 18).unwrap(),
            path: path.to_string(),
            summary: None,
            image: None,
            source: "post.md".to_string(),
        }
    }

    fn registry(paths: &[&str]) -> Registry {
        Registry::from_entries(paths.iter().map(|p| entry(p)).collect(), "/blogs").unwrap()
    }

    #[test]
    fn test_one_route_per_entry() {
        let registry = registry(&["/blogs/async-await-python", "/blogs/fastapi", "/blogs/airflow"]);
        let table = RouteTable::build(&registry).unwrap();
        assert_eq!(table.len(), 3);

        for (index, entry) in registry.entries().enumerate() {
            assert_eq!(table.resolve(&entry.path), Some(index));
        }
    }

    #[test]
    fn test_exact_match_only() {
        let table = RouteTable::build(&registry(&["/blogs/fastapi"])).unwrap();
        assert_eq!(table.resolve("/blogs/fastapi"), Some(0));
        assert_eq!(table.resolve("/blogs/fastapi-2"), None);
        assert_eq!(table.resolve("/blogs/fast"), None);
        assert_eq!(table.resolve("/blogs"), None);
        assert_eq!(table.resolve("/blogs/FASTAPI"), None);
    }

    #[test]
    fn test_unknown_path_is_none() {
        let table = RouteTable::build(&registry(&["/blogs/fastapi"])).unwrap();
        assert_eq!(table.resolve("/blogs/unknown"), None);
        assert_eq!(table.resolve("/"), None);
    }

    #[test]
    fn test_trailing_slash_ignored() {
        let table = RouteTable::build(&registry(&["/blogs/fastapi"])).unwrap();
        assert_eq!(table.resolve("/blogs/fastapi/"), Some(0));
    }

    #[test]
    fn test_percent_encoding_decoded() {
        let table = RouteTable::build(&registry(&["/blogs/async-await-python"])).unwrap();
        assert_eq!(table.resolve("/blogs/async%2Dawait%2Dpython"), Some(0));
    }

    #[test]
    fn test_duplicate_paths_all_reported() {
        let entries = vec![
            entry("/blogs/a"),
            entry("/blogs/b"),
            entry("/blogs/a"),
            entry("/blogs/b"),
            entry("/blogs/c"),
        ];
        let registry = Registry::from_entries(entries, "/blogs").unwrap();
        let err = RouteTable::build(&registry).unwrap_err();
        match err {
            RouteError::DuplicatePath { paths } => {
                assert_eq!(paths, vec!["/blogs/a", "/blogs/b"]);
            }
        }
    }

    #[test]
    fn test_duplicate_after_normalization() {
        let entries = vec![entry("/blogs/a"), entry("/blogs/a/")];
        let registry = Registry::from_entries(entries, "/blogs").unwrap();
        assert!(RouteTable::build(&registry).is_err());
    }

    #[test]
    fn test_iter_preserves_registry_order() {
        let table =
            RouteTable::build(&registry(&["/blogs/c", "/blogs/a", "/blogs/b"])).unwrap();
        let order: Vec<(&str, usize)> = table.iter().collect();
        assert_eq!(
            order,
            vec![("/blogs/c", 0), ("/blogs/a", 1), ("/blogs/b", 2)]
        );
    }
}
