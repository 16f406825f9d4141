//! Class-name resolution for annotation tags and entity names
//!
//! Short names are resolved against the import table of the source being
//! parsed. Resolution is permissive: a name that cannot be resolved comes
//! back unchanged and fails later, where it is used as a type.

use super::values::{Annotation, Value, ValueMap};
use crate::config::constants::compile_time::syntax::MAX_RESOLUTION_CACHE_ENTRIES;
use std::collections::{HashMap, HashSet};

const SEPARATOR: char = '\\';

/// Oracle for "does this fully qualified name denote a known type"
pub trait TypeResolver {
    fn exists(&self, name: &str) -> bool;

    /// Builds the value for an annotation of type `name`
    fn construct(&self, name: &str, parameters: ValueMap) -> Result<Value, String>;
}

impl<T: TypeResolver + ?Sized> TypeResolver for &T {
    fn exists(&self, name: &str) -> bool {
        (**self).exists(name)
    }

    fn construct(&self, name: &str, parameters: ValueMap) -> Result<Value, String> {
        (**self).construct(name, parameters)
    }
}

/// A fixed set of known class names; constructs plain [`Annotation`] values
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    known: HashSet<String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_types<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Self::new();
        for name in names {
            registry.register(name.as_ref());
        }
        registry
    }

    pub fn register(&mut self, name: &str) {
        self.known
            .insert(name.trim_start_matches(SEPARATOR).to_string());
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

impl TypeResolver for TypeRegistry {
    fn exists(&self, name: &str) -> bool {
        self.known.contains(name.trim_start_matches(SEPARATOR))
    }

    fn construct(&self, name: &str, parameters: ValueMap) -> Result<Value, String> {
        if !self.exists(name) {
            return Err(format!("'{}' is not registered", name));
        }
        Ok(Value::Annotation(Box::new(Annotation::new(name, parameters))))
    }
}

// === IMPORTS ===

/// `use` aliases of one source file, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportTable {
    entries: Vec<(String, String)>,
}

impl ImportTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `alias => fqn`; a later alias of the same name wins
    pub fn insert(&mut self, alias: impl Into<String>, fqn: impl Into<String>) {
        let alias = alias.into();
        let fqn = fqn.into().trim_start_matches(SEPARATOR).to_string();
        match self.entries.iter_mut().find(|(a, _)| *a == alias) {
            Some((_, slot)) => *slot = fqn,
            None => self.entries.push((alias, fqn)),
        }
    }

    pub fn get(&self, alias: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, fqn)| fqn.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(a, f)| (a.as_str(), f.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses an `alias=Fully\Qualified\Name` argument. Without `=` the
    /// alias is the last segment of the name.
    pub fn parse_entry(entry: &str) -> Option<(String, String)> {
        let (alias, fqn) = match entry.split_once('=') {
            Some((alias, fqn)) => (alias.trim().to_string(), fqn.trim()),
            None => {
                let fqn = entry.trim();
                (fqn.rsplit(SEPARATOR).next()?.to_string(), fqn)
            }
        };
        if alias.is_empty() || fqn.is_empty() {
            return None;
        }
        Some((alias, fqn.to_string()))
    }
}

impl<A: Into<String>, F: Into<String>> FromIterator<(A, F)> for ImportTable {
    fn from_iter<I: IntoIterator<Item = (A, F)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (alias, fqn) in iter {
            table.insert(alias, fqn);
        }
        table
    }
}

// === RESOLVER ===

/// Resolves short class names with a per-instance memo cache.
///
/// The cache is keyed by the unresolved name and is not synchronized; one
/// resolver serves one parse at a time.
#[derive(Debug, Clone)]
pub struct ClassNameResolver {
    imports: ImportTable,
    namespace: Option<String>,
    /// Last segment of every import prefix mapped to that prefix
    namespace_map: HashMap<String, String>,
    cache: HashMap<String, String>,
    cache_enabled: bool,
}

impl ClassNameResolver {
    pub fn new(imports: ImportTable, namespace: Option<String>) -> Self {
        let mut namespace_map = HashMap::new();
        for (_, fqn) in imports.iter() {
            let mut prefix = String::new();
            for segment in fqn.split(SEPARATOR).filter(|s| !s.is_empty()) {
                if !prefix.is_empty() {
                    prefix.push(SEPARATOR);
                }
                prefix.push_str(segment);
                namespace_map
                    .entry(segment.to_string())
                    .or_insert_with(|| prefix.clone());
            }
        }

        Self {
            imports,
            namespace: namespace
                .map(|ns| ns.trim_matches(SEPARATOR).to_string())
                .filter(|ns| !ns.is_empty()),
            namespace_map,
            cache: HashMap::new(),
            cache_enabled: true,
        }
    }

    pub fn set_cache_enabled(&mut self, enabled: bool) {
        self.cache_enabled = enabled;
        if !enabled {
            self.cache.clear();
        }
    }

    pub fn imports(&self) -> &ImportTable {
        &self.imports
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Resolves `name` to a fully qualified class name.
    ///
    /// Order: leading separator (verbatim), direct import alias, alias as the
    /// first segment of a compound name, partial-namespace search over the
    /// imports, namespace-prefix map, current namespace, global name.
    pub fn resolve<R: TypeResolver + ?Sized>(&mut self, name: &str, types: &R) -> String {
        if let Some(qualified) = name.strip_prefix(SEPARATOR) {
            return qualified.to_string();
        }

        if self.cache_enabled {
            if let Some(hit) = self.cache.get(name) {
                return hit.clone();
            }
        }

        let resolved = self.resolve_uncached(name, types);

        if self.cache_enabled && self.cache.len() < MAX_RESOLUTION_CACHE_ENTRIES {
            self.cache.insert(name.to_string(), resolved.clone());
        }
        resolved
    }

    fn resolve_uncached<R: TypeResolver + ?Sized>(&self, name: &str, types: &R) -> String {
        if let Some(fqn) = self.imports.get(name) {
            return fqn.to_string();
        }

        let (first, rest) = match name.split_once(SEPARATOR) {
            Some((first, rest)) => (first, Some(rest)),
            None => (name, None),
        };

        if let (Some(rest), Some(fqn)) = (rest, self.imports.get(first)) {
            return format!("{}{}{}", fqn, SEPARATOR, rest);
        }

        if let Some(found) = self.search_partial_namespace(first, rest, types) {
            return found;
        }

        if let Some(prefix) = self.namespace_map.get(first) {
            return match rest {
                Some(rest) => format!("{}{}{}", prefix, SEPARATOR, rest),
                None => prefix.clone(),
            };
        }

        if let Some(namespace) = &self.namespace {
            let candidate = format!("{}{}{}", namespace, SEPARATOR, name);
            if types.exists(&candidate) {
                return candidate;
            }
        }

        name.to_string()
    }

    /// Looks for `first` inside each import path and probes the name formed
    /// by splicing the target onto the matching prefix
    fn search_partial_namespace<R: TypeResolver + ?Sized>(
        &self,
        first: &str,
        rest: Option<&str>,
        types: &R,
    ) -> Option<String> {
        for (_, fqn) in self.imports.iter() {
            let segments: Vec<&str> = fqn.split(SEPARATOR).collect();
            for (i, segment) in segments.iter().enumerate() {
                if *segment != first {
                    continue;
                }
                let mut candidate = segments[..=i].join("\\");
                if let Some(rest) = rest {
                    candidate.push(SEPARATOR);
                    candidate.push_str(rest);
                }
                if types.exists(&candidate) {
                    return Some(candidate);
                }
            }
        }
        None
    }
}
