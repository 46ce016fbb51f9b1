//! # Locations
//!
//! The read-only location catalog and the cascading location → sublocation
//! selection that feeds `submit`.
//!
//! ## Cascading Selection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  select_location("1002")                                                │
//! │       │                                                                 │
//! │       ├── unknown / empty id → selection cleared, sublocations disabled │
//! │       │                                                                 │
//! │       ├── no sublocations    → sublocations disabled, value empty       │
//! │       │                                                                 │
//! │       └── has sublocations   → options = sublocations sorted by name    │
//! │                                chosen sublocation reset to empty        │
//! │                                                                         │
//! │  The selection never touches the batch; ids are passed through at      │
//! │  submit time.                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Catalog
// =============================================================================

/// A selectable sublocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sublocation {
    pub id: String,
    pub name: String,
}

impl Sublocation {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Sublocation {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A target location and its sublocations, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sublocations: Vec<Sublocation>,
}

impl Location {
    pub fn new(id: impl Into<String>, name: impl Into<String>, sublocations: Vec<Sublocation>) -> Self {
        Location {
            id: id.into(),
            name: name.into(),
            sublocations,
        }
    }
}

/// Location id → location, loaded once per page session.
///
/// Locations keep source order. When an id repeats, the first entry wins.
///
/// Serializes as a plain array; deserializing goes through `new`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Location>", into = "Vec<Location>")]
pub struct LocationCatalog {
    locations: Vec<Location>,
}

impl From<Vec<Location>> for LocationCatalog {
    fn from(locations: Vec<Location>) -> Self {
        LocationCatalog::new(locations)
    }
}

impl From<LocationCatalog> for Vec<Location> {
    fn from(catalog: LocationCatalog) -> Self {
        catalog.locations
    }
}

impl LocationCatalog {
    /// Builds a catalog, dropping repeated location ids.
    pub fn new(locations: Vec<Location>) -> Self {
        let mut seen = HashSet::new();
        let locations = locations
            .into_iter()
            .filter(|l| seen.insert(l.id.clone()))
            .collect();
        LocationCatalog { locations }
    }

    /// Catalog used when the location source cannot be reached.
    pub fn fallback() -> Self {
        LocationCatalog::new(vec![
            Location::new(
                "1",
                "Warehouse A (Fallback)",
                vec![
                    Sublocation::new("sub1", "Section A1"),
                    Sublocation::new("sub2", "Section A2"),
                ],
            ),
            Location::new(
                "2",
                "Laboratory (Fallback)",
                vec![Sublocation::new("sub3", "Lab Storage")],
            ),
        ])
    }

    /// Looks up a location by id.
    pub fn get(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }

    /// All locations in source order.
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

// =============================================================================
// Selection
// =============================================================================

/// The operator's current target, with the sublocation options it implies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LocationSelection {
    location_id: Option<String>,
    sublocation_id: Option<String>,
    options: Vec<Sublocation>,
}

impl LocationSelection {
    /// Chooses a location and re-evaluates the sublocation options.
    ///
    /// Always clears the chosen sublocation. Returns false (and clears the
    /// whole selection) if `id` is empty or not in the catalog.
    pub fn select_location(&mut self, catalog: &LocationCatalog, id: &str) -> bool {
        self.clear();

        let Some(location) = catalog.get(id.trim()) else {
            return false;
        };

        let mut options = location.sublocations.clone();
        options.sort_by(by_name);

        self.location_id = Some(location.id.clone());
        self.options = options;
        true
    }

    /// Chooses a sublocation from the current options; empty clears it.
    pub fn select_sublocation(&mut self, id: &str) -> CoreResult<()> {
        let id = id.trim();
        if id.is_empty() {
            self.sublocation_id = None;
            return Ok(());
        }

        if !self.options.iter().any(|s| s.id == id) {
            return Err(CoreError::UnknownSublocation { id: id.to_string() });
        }

        self.sublocation_id = Some(id.to_string());
        Ok(())
    }

    /// Clears location, sublocation and options.
    pub fn clear(&mut self) {
        self.location_id = None;
        self.sublocation_id = None;
        self.options.clear();
    }

    /// Returns false when the chosen location has no sublocations.
    pub fn sublocation_enabled(&self) -> bool {
        !self.options.is_empty()
    }

    /// Sublocations offered for the chosen location, sorted by name.
    pub fn options(&self) -> &[Sublocation] {
        &self.options
    }

    pub fn location_id(&self) -> Option<&str> {
        self.location_id.as_deref()
    }

    pub fn sublocation_id(&self) -> Option<&str> {
        self.sublocation_id.as_deref()
    }

    /// `(location_id, sublocation_id)` to pass to `submit`.
    ///
    /// The location id is empty when nothing is chosen, so `submit` rejects
    /// it with `NoLocation`.
    pub fn target(&self) -> (&str, Option<&str>) {
        (
            self.location_id.as_deref().unwrap_or_default(),
            self.sublocation_id.as_deref(),
        )
    }
}

fn by_name(a: &Sublocation, b: &Sublocation) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.name.cmp(&b.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> LocationCatalog {
        LocationCatalog::new(vec![
            Location::new(
                "1001",
                "Warehouse A",
                vec![
                    Sublocation::new("s3", "section b"),
                    Sublocation::new("s1", "Section C"),
                    Sublocation::new("s2", "Section A"),
                ],
            ),
            Location::new("1003", "Office Building", vec![]),
        ])
    }

    #[test]
    fn test_select_location_sorts_sublocations() {
        let mut selection = LocationSelection::default();
        assert!(selection.select_location(&catalog(), "1001"));

        let names: Vec<&str> = selection.options().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Section A", "section b", "Section C"]);
        assert!(selection.sublocation_enabled());
        assert_eq!(selection.sublocation_id(), None);
    }

    #[test]
    fn test_location_without_sublocations_disables_choice() {
        let catalog = catalog();
        let mut selection = LocationSelection::default();

        selection.select_location(&catalog, "1001");
        selection.select_sublocation("s2").unwrap();

        assert!(selection.select_location(&catalog, "1003"));
        assert!(!selection.sublocation_enabled());
        assert_eq!(selection.target(), ("1003", None));
        assert_eq!(
            selection.select_sublocation("s2"),
            Err(CoreError::UnknownSublocation {
                id: "s2".to_string()
            })
        );
    }

    #[test]
    fn test_location_change_clears_sublocation() {
        let catalog = catalog();
        let mut selection = LocationSelection::default();

        selection.select_location(&catalog, "1001");
        selection.select_sublocation("s1").unwrap();
        assert_eq!(selection.target(), ("1001", Some("s1")));

        selection.select_location(&catalog, "1001");
        assert_eq!(selection.target(), ("1001", None));
    }

    #[test]
    fn test_unknown_location_clears_selection() {
        let catalog = catalog();
        let mut selection = LocationSelection::default();

        selection.select_location(&catalog, "1001");
        assert!(!selection.select_location(&catalog, "9999"));
        assert_eq!(selection.target(), ("", None));
        assert!(!selection.sublocation_enabled());

        assert!(!selection.select_location(&catalog, ""));
    }

    #[test]
    fn test_empty_sublocation_clears_choice() {
        let mut selection = LocationSelection::default();
        selection.select_location(&catalog(), "1001");
        selection.select_sublocation("s3").unwrap();

        selection.select_sublocation("").unwrap();
        assert_eq!(selection.sublocation_id(), None);
    }

    #[test]
    fn test_catalog_dedupes_and_keeps_order() {
        let catalog = LocationCatalog::new(vec![
            Location::new("2", "Second", vec![]),
            Location::new("1", "First", vec![]),
            Location::new("2", "Shadowed", vec![]),
        ]);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.locations()[0].name, "Second");
        assert_eq!(catalog.get("2").map(|l| l.name.as_str()), Some("Second"));
    }

    #[test]
    fn test_deserialized_catalog_dedupes() {
        let catalog: LocationCatalog = serde_json::from_str(
            r#"[
                { "id": "2", "name": "Second" },
                { "id": "2", "name": "Shadowed", "sublocations": [] }
            ]"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("2").map(|l| l.name.as_str()), Some("Second"));

        let json = serde_json::to_value(&catalog).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["name"], "Second");
    }

    #[test]
    fn test_fallback_catalog() {
        let fallback = LocationCatalog::fallback();
        assert_eq!(fallback.len(), 2);
        assert_eq!(fallback.get("1").map(|l| l.sublocations.len()), Some(2));
        assert_eq!(fallback.get("2").map(|l| l.sublocations.len()), Some(1));
    }
}
