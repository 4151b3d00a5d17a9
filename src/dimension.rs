//! Dimension resolution.
//!
//! The [`DimensionRegistry`] owns every dimension of a transform. Variables refer to dimensions through non-owning [`DimensionId`]s.
//!
//! Dimensions live in scopes: one scope per target group in hierarchical mode, a single root scope otherwise.
//! Within a scope, names are unique.
//! Variables that request the same name and size share one dimension; a request with the same name but a
//! different size is a conflict, retried once under the name qualified by the variable's embed path.
//! Anonymous dimensions receive synthetic `dim<N>` names that avoid user-declared `dim<N>` names.

use std::collections::{BTreeSet, HashMap};

use derive_more::Display;

use crate::{
    error::{DimensionConflictError, InternalInvariantError},
    name::NameSanitizer,
    target::NcDimId,
};

/// The prefix of synthetic dimension names.
pub const SYNTHETIC_DIMENSION_PREFIX: &str = "dim";

/// A dimension handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{_0}")]
pub struct DimensionId(usize);

impl DimensionId {
    /// The dimension index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A dimension scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{_0}")]
pub struct ScopeId(usize);

impl ScopeId {
    /// The root scope.
    pub const ROOT: Self = Self(0);

    /// The scope index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A registered dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    name: String,
    size: u64,
    scope: ScopeId,
    ref_count: usize,
    declared: bool,
    target: Option<NcDimId>,
}

impl Dimension {
    /// The dimension name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The dimension size.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The scope of the dimension.
    #[must_use]
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// The number of holders of the dimension.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        self.ref_count
    }

    /// Returns true if the dimension was declared by a group.
    #[must_use]
    pub fn is_declared(&self) -> bool {
        self.declared
    }

    /// The target id of the dimension, once defined.
    #[must_use]
    pub fn target(&self) -> Option<NcDimId> {
        self.target
    }
}

/// The owner of the dimensions of a transform.
#[derive(Debug, Clone)]
pub struct DimensionRegistry {
    dimensions: Vec<Option<Dimension>>,
    index: HashMap<(ScopeId, String), DimensionId>,
    scope_parents: Vec<Option<ScopeId>>,
    sanitizer: NameSanitizer,
    next_synthetic: u64,
    reserved_synthetic: BTreeSet<u64>,
}

impl Default for DimensionRegistry {
    fn default() -> Self {
        Self::new(NameSanitizer::default())
    }
}

impl DimensionRegistry {
    /// Create a registry with a root scope. Dimension names are sanitized with `sanitizer`.
    #[must_use]
    pub fn new(sanitizer: NameSanitizer) -> Self {
        Self {
            dimensions: Vec::new(),
            index: HashMap::new(),
            scope_parents: vec![None],
            sanitizer,
            next_synthetic: 1,
            reserved_synthetic: BTreeSet::new(),
        }
    }

    /// Clear every dimension, scope and synthetic name reservation.
    pub fn reset_all(&mut self) {
        *self = Self::new(self.sanitizer.clone());
    }

    /// Add a scope nested in `parent`.
    pub fn add_scope(&mut self, parent: ScopeId) -> ScopeId {
        self.scope_parents.push(Some(parent));
        ScopeId(self.scope_parents.len() - 1)
    }

    /// The parent of a scope, [`None`] for the root scope.
    #[must_use]
    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scope_parents.get(scope.0).copied().flatten()
    }

    /// Reserve the suffix of every name of the form `dim<N>`, so that synthetic names never collide with them.
    pub fn reserve_synthetic_suffixes<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        for name in names {
            if let Some(suffix) = name
                .strip_prefix(SYNTHETIC_DIMENSION_PREFIX)
                .and_then(|suffix| suffix.parse::<u64>().ok())
            {
                self.reserved_synthetic.insert(suffix);
            }
        }
    }

    /// Generate the next synthetic dimension name.
    pub fn next_synthetic_name(&mut self) -> String {
        while self.reserved_synthetic.contains(&self.next_synthetic) {
            self.next_synthetic += 1;
        }
        let name = format!("{SYNTHETIC_DIMENSION_PREFIX}{}", self.next_synthetic);
        self.next_synthetic += 1;
        name
    }

    /// Resolve a dimension named `name` of `size` in `scope`, for a variable with the embed path `embed`.
    ///
    /// An empty name is given a synthetic name. An existing dimension with the same name and size is shared.
    ///
    /// # Errors
    /// Returns a [`DimensionConflictError`] if a dimension with the same name has a different size and the
    /// embed path is empty, or the embed-qualified name also conflicts.
    pub fn resolve<S: AsRef<str>>(
        &mut self,
        scope: ScopeId,
        name: &str,
        size: u64,
        embed: &[S],
    ) -> Result<DimensionId, DimensionConflictError> {
        let name = if name.is_empty() {
            self.next_synthetic_name()
        } else {
            self.sanitizer.sanitize(name)
        };
        match self.lookup_mut(scope, &name) {
            Some((id, existing)) => {
                let existing_size = existing.size;
                if existing_size == size {
                    existing.ref_count += 1;
                    Ok(id)
                } else if embed.is_empty() {
                    Err(DimensionConflictError::new(name, existing_size, size))
                } else {
                    let qualified = self.sanitizer.embedded_name(embed, &name).name;
                    log::debug!(
                        "dimension {name} has size {existing_size}, resolving size {size} as {qualified}"
                    );
                    self.resolve::<&str>(scope, &qualified, size, &[])
                }
            }
            None => Ok(self.insert(scope, name, size, false)),
        }
    }

    /// Resolve a dimension named `name` in `scope`, sharing any existing dimension of that name regardless of size.
    ///
    /// Used for the length dimensions of text variables, which are grown with [`DimensionRegistry::grow`].
    pub fn resolve_ignoring_size(&mut self, scope: ScopeId, name: &str, size: u64) -> DimensionId {
        let name = self.sanitizer.sanitize(name);
        match self.lookup_mut(scope, &name) {
            Some((id, existing)) => {
                existing.ref_count += 1;
                id
            }
            None => self.insert(scope, name, size, false),
        }
    }

    /// Declare a dimension of a group.
    ///
    /// Declaring a name twice in the same scope returns the first declaration.
    pub fn declare(&mut self, scope: ScopeId, name: &str, size: u64) -> DimensionId {
        let name = self.sanitizer.sanitize(name);
        match self.lookup(scope, &name) {
            Some(id) => id,
            None => self.insert(scope, name, size, true),
        }
    }

    /// Find a declared dimension named `name` in `scope` or its ancestors, nearest first.
    #[must_use]
    pub fn lookup_declared(&self, scope: ScopeId, name: &str) -> Option<DimensionId> {
        let name = self.sanitizer.sanitize(name);
        let mut current = Some(scope);
        while let Some(scope) = current {
            if let Some(id) = self.lookup(scope, &name) {
                if self.dimensions[id.0].as_ref().is_some_and(|d| d.declared) {
                    return Some(id);
                }
            }
            current = self.parent(scope);
        }
        None
    }

    /// Get a dimension.
    #[must_use]
    pub fn get(&self, id: DimensionId) -> Option<&Dimension> {
        self.dimensions.get(id.0).and_then(Option::as_ref)
    }

    /// Add a holder to a dimension.
    ///
    /// # Errors
    /// Returns an [`InternalInvariantError`] if the dimension has been released.
    pub fn retain(&mut self, id: DimensionId) -> Result<(), InternalInvariantError> {
        self.get_mut(id)?.ref_count += 1;
        Ok(())
    }

    /// Raise the size of a dimension to at least `size`.
    ///
    /// # Errors
    /// Returns an [`InternalInvariantError`] if the dimension has been released.
    pub fn grow(&mut self, id: DimensionId, size: u64) -> Result<(), InternalInvariantError> {
        let dimension = self.get_mut(id)?;
        dimension.size = dimension.size.max(size);
        Ok(())
    }

    /// Record the target id of a dimension.
    ///
    /// # Errors
    /// Returns an [`InternalInvariantError`] if the dimension has been released.
    pub fn set_target(&mut self, id: DimensionId, target: NcDimId) -> Result<(), InternalInvariantError> {
        self.get_mut(id)?.target = Some(target);
        Ok(())
    }

    /// Remove a holder from a dimension.
    ///
    /// Returns true if that was the last holder, in which case the dimension is removed from the registry.
    /// A dimension already defined in the target stays defined.
    ///
    /// # Errors
    /// Returns an [`InternalInvariantError`] if the dimension has already been released.
    pub fn release(&mut self, id: DimensionId) -> Result<bool, InternalInvariantError> {
        let dimension = self.get_mut(id)?;
        dimension.ref_count = dimension.ref_count.saturating_sub(1);
        if dimension.ref_count > 0 {
            return Ok(false);
        }
        if let Some(dimension) = self.dimensions[id.0].take() {
            self.index.remove(&(dimension.scope, dimension.name));
        }
        Ok(true)
    }

    /// The number of registered dimensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dimensions.iter().flatten().count()
    }

    /// Returns true if no dimensions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the registered dimensions of `scope` in registration order.
    pub fn dimensions_in(&self, scope: ScopeId) -> impl Iterator<Item = (DimensionId, &Dimension)> {
        self.dimensions
            .iter()
            .enumerate()
            .filter_map(move |(index, dimension)| match dimension {
                Some(dimension) if dimension.scope == scope => Some((DimensionId(index), dimension)),
                _ => None,
            })
    }

    fn lookup(&self, scope: ScopeId, name: &str) -> Option<DimensionId> {
        self.index.get(&(scope, name.to_string())).copied()
    }

    fn insert(&mut self, scope: ScopeId, name: String, size: u64, declared: bool) -> DimensionId {
        let id = DimensionId(self.dimensions.len());
        self.index.insert((scope, name.clone()), id);
        self.dimensions.push(Some(Dimension {
            name,
            size,
            scope,
            ref_count: 1,
            declared,
            target: None,
        }));
        id
    }

    fn lookup_mut(&mut self, scope: ScopeId, name: &str) -> Option<(DimensionId, &mut Dimension)> {
        let id = self.lookup(scope, name)?;
        let dimension = self.dimensions.get_mut(id.0)?.as_mut()?;
        Some((id, dimension))
    }

    fn get_mut(&mut self, id: DimensionId) -> Result<&mut Dimension, InternalInvariantError> {
        self.dimensions
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| InternalInvariantError::UnknownDimension(id.0).logged())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_EMBED: &[&str] = &[];

    #[test]
    fn resolve_shares_equal_dimensions() {
        let mut registry = DimensionRegistry::default();
        let a = registry.resolve(ScopeId::ROOT, "lat", 180, NO_EMBED).unwrap();
        let b = registry.resolve(ScopeId::ROOT, "lat", 180, NO_EMBED).unwrap();
        assert_eq!(a, b);
        assert_eq!(registry.get(a).unwrap().ref_count(), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn resolve_conflict_without_embed() {
        let mut registry = DimensionRegistry::default();
        registry.resolve(ScopeId::ROOT, "lat", 180, NO_EMBED).unwrap();
        let error = registry
            .resolve(ScopeId::ROOT, "lat", 90, NO_EMBED)
            .unwrap_err();
        assert_eq!(error.name(), "lat");
        assert_eq!(error.existing(), 180);
        assert_eq!(error.requested(), 90);
    }

    #[test]
    fn resolve_conflict_retries_with_embed() {
        let mut registry = DimensionRegistry::default();
        registry.resolve(ScopeId::ROOT, "x", 10, NO_EMBED).unwrap();
        let id = registry.resolve(ScopeId::ROOT, "x", 20, &["S"]).unwrap();
        assert_eq!(registry.get(id).unwrap().name(), "S.x");
        assert_eq!(registry.get(id).unwrap().size(), 20);

        // the qualified name can also conflict
        assert!(registry.resolve(ScopeId::ROOT, "x", 30, &["S"]).is_err());
    }

    #[test]
    fn synthetic_names_skip_reserved() {
        let mut registry = DimensionRegistry::default();
        registry.reserve_synthetic_suffixes(["dim1", "dim3", "dimension", "lat"]);
        let a = registry.resolve(ScopeId::ROOT, "", 4, NO_EMBED).unwrap();
        let b = registry.resolve(ScopeId::ROOT, "", 4, NO_EMBED).unwrap();
        let c = registry.resolve(ScopeId::ROOT, "", 5, NO_EMBED).unwrap();
        assert_ne!(a, b);
        assert_eq!(registry.get(a).unwrap().name(), "dim2");
        assert_eq!(registry.get(b).unwrap().name(), "dim4");
        assert_eq!(registry.get(c).unwrap().name(), "dim5");
    }

    #[test]
    fn names_are_sanitized() {
        let mut registry = DimensionRegistry::default();
        let id = registry.resolve(ScopeId::ROOT, "2 d", 3, NO_EMBED).unwrap();
        assert_eq!(registry.get(id).unwrap().name(), "nc_2_d");
    }

    #[test]
    fn text_length_dimension_grows() {
        let mut registry = DimensionRegistry::default();
        let a = registry.resolve_ignoring_size(ScopeId::ROOT, "name_len", 4);
        let b = registry.resolve_ignoring_size(ScopeId::ROOT, "name_len", 9);
        assert_eq!(a, b);
        registry.grow(b, 9).unwrap();
        registry.grow(b, 2).unwrap();
        assert_eq!(registry.get(a).unwrap().size(), 9);
    }

    #[test]
    fn release_disposes_at_zero() {
        let mut registry = DimensionRegistry::default();
        let a = registry.resolve(ScopeId::ROOT, "t", 2, NO_EMBED).unwrap();
        registry.retain(a).unwrap();
        assert!(!registry.release(a).unwrap());
        assert!(registry.release(a).unwrap());
        assert!(registry.get(a).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "internal invariant violated"))]
    fn release_twice_is_an_invariant_violation() {
        let mut registry = DimensionRegistry::default();
        let a = registry.resolve(ScopeId::ROOT, "t", 2, NO_EMBED).unwrap();
        assert!(registry.release(a).unwrap());
        assert!(matches!(
            registry.release(a),
            Err(InternalInvariantError::UnknownDimension(0))
        ));
    }

    #[test]
    fn scopes_and_declarations() {
        let mut registry = DimensionRegistry::default();
        let child = registry.add_scope(ScopeId::ROOT);
        let grandchild = registry.add_scope(child);
        assert_eq!(registry.parent(grandchild), Some(child));
        assert_eq!(registry.parent(ScopeId::ROOT), None);

        let declared = registry.declare(ScopeId::ROOT, "time", 12);
        registry.resolve(child, "x", 3, NO_EMBED).unwrap();
        assert_eq!(registry.lookup_declared(grandchild, "time"), Some(declared));
        assert_eq!(registry.lookup_declared(grandchild, "x"), None);

        // the same name in different scopes is a different dimension
        let a = registry.resolve(child, "n", 3, NO_EMBED).unwrap();
        let b = registry.resolve(grandchild, "n", 4, NO_EMBED).unwrap();
        assert_ne!(a, b);
        assert_eq!(registry.dimensions_in(child).count(), 2);

        registry.reset_all();
        assert!(registry.is_empty());
        assert_eq!(registry.parent(child), None);
    }
}
