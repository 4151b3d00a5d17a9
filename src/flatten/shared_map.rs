use crate::{data_type::ElementType, dimension::ScopeId, values::ElementValues};

/// A one-dimensional coordinate array emitted once and shared by every container that references it.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedMap {
    name: String,
    emitted_name: String,
    scope: ScopeId,
    element_type: ElementType,
    dimension_name: String,
    dimension_size: u64,
    values: ElementValues,
    owners: Vec<String>,
}

impl SharedMap {
    /// The source name of the map.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name of the emitted variable.
    #[must_use]
    pub fn emitted_name(&self) -> &str {
        &self.emitted_name
    }

    /// The scope the map was emitted in.
    #[must_use]
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// The element type.
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// The name of the dimension of the map.
    #[must_use]
    pub fn dimension_name(&self) -> &str {
        &self.dimension_name
    }

    /// The size of the dimension of the map.
    #[must_use]
    pub fn dimension_size(&self) -> u64 {
        self.dimension_size
    }

    /// The names of the containers referencing the map, in flattening order.
    ///
    /// A map emitted as a standalone variable has an empty owner name.
    #[must_use]
    pub fn owners(&self) -> &[String] {
        &self.owners
    }

    /// The number of containers referencing the map.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        self.owners.len()
    }

    fn matches(&self, candidate: &SharedMapCandidate<'_>) -> bool {
        self.scope == candidate.scope
            && self.name == candidate.name
            && self.element_type == candidate.element_type
            && self.dimension_name == candidate.dimension_name
            && self.dimension_size == candidate.dimension_size
            && &self.values == candidate.values
    }
}

/// A map about to be emitted, compared against the maps already emitted.
#[derive(Debug, Clone, Copy)]
pub struct SharedMapCandidate<'a> {
    /// The source name.
    pub name: &'a str,
    /// The scope it would be emitted in.
    pub scope: ScopeId,
    /// The element type.
    pub element_type: ElementType,
    /// The dimension name.
    pub dimension_name: &'a str,
    /// The dimension size.
    pub dimension_size: u64,
    /// The values.
    pub values: &'a ElementValues,
}

/// The maps emitted by a transform.
///
/// Two maps are equal if they have the same name, element type, dimension and values, and are emitted in the same scope.
#[derive(Debug, Clone, Default)]
pub struct SharedMapTable {
    maps: Vec<SharedMap>,
}

impl SharedMapTable {
    /// Find an emitted map equal to `candidate`.
    #[must_use]
    pub fn find(&self, candidate: &SharedMapCandidate<'_>) -> Option<usize> {
        self.maps.iter().position(|map| map.matches(candidate))
    }

    /// Record a map emitted as `emitted_name` for `owner`.
    pub fn register(
        &mut self,
        candidate: &SharedMapCandidate<'_>,
        emitted_name: &str,
        owner: &str,
    ) -> usize {
        self.maps.push(SharedMap {
            name: candidate.name.to_string(),
            emitted_name: emitted_name.to_string(),
            scope: candidate.scope,
            element_type: candidate.element_type,
            dimension_name: candidate.dimension_name.to_string(),
            dimension_size: candidate.dimension_size,
            values: candidate.values.clone(),
            owners: vec![owner.to_string()],
        });
        self.maps.len() - 1
    }

    /// Add `owner` as a referrer of the map at `index`.
    ///
    /// Returns false if there is no such map.
    pub fn share(&mut self, index: usize, owner: &str) -> bool {
        if let Some(map) = self.maps.get_mut(index) {
            map.owners.push(owner.to_string());
            true
        } else {
            false
        }
    }

    /// Get a map.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&SharedMap> {
        self.maps.get(index)
    }

    /// The emitted maps, in emission order.
    #[must_use]
    pub fn maps(&self) -> &[SharedMap] {
        &self.maps
    }

    /// The number of emitted maps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    /// Returns true if no maps were emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Forget every map.
    pub fn clear(&mut self) {
        self.maps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_map_table() {
        let lat = ElementValues::Float32(vec![-45.0, 0.0, 45.0]);
        let candidate = SharedMapCandidate {
            name: "lat",
            scope: ScopeId::ROOT,
            element_type: ElementType::Float32,
            dimension_name: "lat",
            dimension_size: 3,
            values: &lat,
        };
        let mut table = SharedMapTable::default();
        assert_eq!(table.find(&candidate), None);
        let index = table.register(&candidate, "lat", "sst");
        assert_eq!(table.find(&candidate), Some(index));
        assert!(table.share(index, "ice"));
        assert!(!table.share(index + 1, "ice"));

        let map = table.get(index).unwrap();
        assert_eq!(map.ref_count(), 2);
        assert_eq!(map.owners(), ["sst", "ice"]);

        // different values are a different map
        let shifted = ElementValues::Float32(vec![-44.0, 1.0, 46.0]);
        let other = SharedMapCandidate {
            values: &shifted,
            ..candidate
        };
        assert_eq!(table.find(&other), None);

        table.clear();
        assert!(table.is_empty());
    }
}
