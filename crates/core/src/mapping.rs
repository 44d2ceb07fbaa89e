//! Field mapping editor state.
//!
//! Holds the source-column to destination-field mapping and the per-column
//! transformation rules the user edits on the mapping step. Edits are never
//! rejected; the "one source column per destination" and "every required
//! field mapped" rules are reported by [`MappingEditor::validate`] and
//! enforced by the wizard gate.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::profile::{EntityImportProfile, ProfileField};
use crate::types::{DestinationRecord, SourceRow};

/// Source column name -> destination field name, in insertion order.
pub type FieldMapping = IndexMap<String, String>;

/// Source column name -> transformation applied to its values.
pub type TransformationRules = IndexMap<String, TransformationKind>;

// ---------------------------------------------------------------------------
// Transformations
// ---------------------------------------------------------------------------

/// Value transformation applied to a mapped column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformationKind {
    Uppercase,
    Lowercase,
    Capitalize,
    Trim,
}

impl TransformationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uppercase => "uppercase",
            Self::Lowercase => "lowercase",
            Self::Capitalize => "capitalize",
            Self::Trim => "trim",
        }
    }

    /// Parse a transformation name. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "uppercase" => Some(Self::Uppercase),
            "lowercase" => Some(Self::Lowercase),
            "capitalize" => Some(Self::Capitalize),
            "trim" => Some(Self::Trim),
            _ => None,
        }
    }

    /// All valid transformation names.
    pub const ALL: &'static [&'static str] = &["uppercase", "lowercase", "capitalize", "trim"];

    /// Apply the transformation to one cell value.
    pub fn apply(&self, value: &str) -> String {
        match self {
            Self::Uppercase => value.to_uppercase(),
            Self::Lowercase => value.to_lowercase(),
            Self::Capitalize => {
                let mut chars = value.chars();
                match chars.next() {
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.as_str().to_lowercase().chars())
                        .collect(),
                    None => String::new(),
                }
            }
            Self::Trim => value.trim().to_string(),
        }
    }
}

impl std::fmt::Display for TransformationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map one source row through `mapping`, applying `rules`.
///
/// Mapped columns missing from the row produce empty values.
pub fn map_row(
    mapping: &FieldMapping,
    rules: &TransformationRules,
    row: &SourceRow,
) -> DestinationRecord {
    mapping
        .iter()
        .map(|(source, dest)| {
            let raw = row.get(source).map(String::as_str).unwrap_or_default();
            let value = match rules.get(source) {
                Some(kind) => kind.apply(raw),
                None => raw.to_string(),
            };
            (dest.clone(), value)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Validation checklist
// ---------------------------------------------------------------------------

/// One line of the required-field checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequiredFieldStatus {
    pub field: &'static str,
    pub label: &'static str,
    /// Source column currently mapped to this field, if any.
    pub mapped_from: Option<String>,
}

/// Live validation of a mapping against a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingValidation {
    pub required: Vec<RequiredFieldStatus>,
    /// Destinations claimed by more than one source column.
    pub duplicate_destinations: Vec<String>,
    /// Destinations the profile does not know.
    pub unknown_destinations: Vec<String>,
}

impl MappingValidation {
    /// Required fields that no column maps to.
    pub fn missing_required(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.required
            .iter()
            .filter(|r| r.mapped_from.is_none())
            .map(|r| r.field)
    }

    /// Whether the mapping may leave the mapping step.
    pub fn is_valid(&self) -> bool {
        self.missing_required().next().is_none()
            && self.duplicate_destinations.is_empty()
            && self.unknown_destinations.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

/// Mutable mapping + transformation state for one wizard run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEditor {
    mapping: FieldMapping,
    rules: TransformationRules,
}

impl MappingEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a suggested mapping with no transformation rules.
    pub fn from_mapping(mapping: FieldMapping) -> Self {
        Self {
            mapping,
            rules: TransformationRules::new(),
        }
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    pub fn rules(&self) -> &TransformationRules {
        &self.rules
    }

    /// Set or clear the destination of a source column.
    ///
    /// `None` or a blank destination removes the column's mapping together
    /// with its transformation rule. Anything else overwrites the entry.
    pub fn set_mapping(&mut self, source: &str, destination: Option<&str>) {
        match destination.map(str::trim).filter(|d| !d.is_empty()) {
            Some(dest) => {
                self.mapping.insert(source.to_string(), dest.to_string());
            }
            None => {
                self.mapping.shift_remove(source);
                self.rules.shift_remove(source);
            }
        }
    }

    /// Set or clear the transformation of a source column.
    ///
    /// Ignored when the column has no mapping.
    pub fn set_transformation(&mut self, source: &str, kind: Option<TransformationKind>) {
        if !self.mapping.contains_key(source) {
            return;
        }
        match kind {
            Some(kind) => {
                self.rules.insert(source.to_string(), kind);
            }
            None => {
                self.rules.shift_remove(source);
            }
        }
    }

    /// True iff every required field of `profile` is mapped from some column.
    pub fn is_ready(&self, profile: &EntityImportProfile) -> bool {
        profile
            .required_names()
            .all(|name| self.mapping.values().any(|dest| dest == name))
    }

    /// Destinations claimed by more than one column, in first-seen order.
    pub fn duplicate_destinations(&self) -> Vec<String> {
        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for dest in self.mapping.values() {
            *counts.entry(dest.as_str()).or_default() += 1;
        }
        counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(dest, _)| dest.to_string())
            .collect()
    }

    /// Build the live checklist for `profile`.
    pub fn validate(&self, profile: &EntityImportProfile) -> MappingValidation {
        let by_destination: HashMap<&str, &str> = self
            .mapping
            .iter()
            .rev()
            .map(|(src, dest)| (dest.as_str(), src.as_str()))
            .collect();

        let required = profile
            .required
            .iter()
            .map(|f| RequiredFieldStatus {
                field: f.name,
                label: f.label,
                mapped_from: by_destination.get(f.name).map(|s| s.to_string()),
            })
            .collect();

        let unknown_destinations = self
            .mapping
            .values()
            .filter(|dest| !profile.is_known_field(dest))
            .cloned()
            .collect();

        MappingValidation {
            required,
            duplicate_destinations: self.duplicate_destinations(),
            unknown_destinations,
        }
    }

    /// Fields selectable for `source`: every profile field not already used
    /// by another column. The column's own destination stays selectable.
    pub fn available_destinations(
        &self,
        source: &str,
        profile: &EntityImportProfile,
    ) -> Vec<&'static ProfileField> {
        profile
            .fields()
            .filter(|f| {
                !self
                    .mapping
                    .iter()
                    .any(|(src, dest)| src != source && dest == f.name)
            })
            .collect()
    }

    /// Map a source row into a destination record, applying rules.
    pub fn apply_to_row(&self, row: &SourceRow) -> DestinationRecord {
        map_row(&self.mapping, &self.rules, row)
    }

    /// Drop every mapping and rule.
    pub fn clear(&mut self) {
        self.mapping.clear();
        self.rules.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{PRODUCTS, SUPPLIERS};

    fn editor(pairs: &[(&str, &str)]) -> MappingEditor {
        let mut e = MappingEditor::new();
        for (src, dest) in pairs {
            e.set_mapping(src, Some(*dest));
        }
        e
    }

    // -- TransformationKind ---------------------------------------------------

    #[test]
    fn transformation_round_trip() {
        for s in TransformationKind::ALL {
            let kind = TransformationKind::from_str(s).unwrap();
            assert_eq!(kind.as_str(), *s);
        }
        assert!(TransformationKind::from_str("reverse").is_none());
    }

    #[test]
    fn transformations_apply() {
        assert_eq!(TransformationKind::Uppercase.apply("Lyon"), "LYON");
        assert_eq!(TransformationKind::Lowercase.apply("LYON"), "lyon");
        assert_eq!(TransformationKind::Capitalize.apply("éCOLE nord"), "École nord");
        assert_eq!(TransformationKind::Capitalize.apply(""), "");
        assert_eq!(TransformationKind::Trim.apply("  a b  "), "a b");
    }

    // -- set_mapping / set_transformation ------------------------------------

    #[test]
    fn blank_destination_removes_mapping_and_rule() {
        let mut e = editor(&[("Ville", "city")]);
        e.set_transformation("Ville", Some(TransformationKind::Uppercase));
        e.set_mapping("Ville", Some("  "));
        assert!(e.mapping().is_empty());
        assert!(e.rules().is_empty());
    }

    #[test]
    fn set_mapping_overwrites() {
        let mut e = editor(&[("Ville", "city")]);
        e.set_mapping("Ville", Some("address"));
        assert_eq!(e.mapping()["Ville"], "address");
        assert_eq!(e.mapping().len(), 1);
    }

    #[test]
    fn transformation_on_unmapped_column_is_ignored() {
        let mut e = editor(&[("Nom", "name")]);
        let before = e.rules().clone();
        e.set_transformation("col", Some(TransformationKind::Uppercase));
        assert_eq!(e.rules(), &before);
        assert!(e.rules().is_empty());
    }

    #[test]
    fn transformation_can_be_cleared() {
        let mut e = editor(&[("Nom", "name")]);
        e.set_transformation("Nom", Some(TransformationKind::Trim));
        assert_eq!(e.rules()["Nom"], TransformationKind::Trim);
        e.set_transformation("Nom", None);
        assert!(e.rules().is_empty());
    }

    // -- is_ready ------------------------------------------------------------

    #[test]
    fn ready_when_all_required_mapped() {
        let e = editor(&[("Nom", "name"), ("Ref", "reference"), ("Prix", "unit_price")]);
        assert!(e.is_ready(&PRODUCTS));
    }

    #[test]
    fn not_ready_when_some_required_missing() {
        let e = editor(&[("Nom", "name"), ("Prix", "unit_price"), ("EAN", "barcode")]);
        assert!(!e.is_ready(&PRODUCTS));
    }

    #[test]
    fn not_ready_when_nothing_mapped() {
        assert!(!MappingEditor::new().is_ready(&PRODUCTS));
        assert!(!MappingEditor::new().is_ready(&SUPPLIERS));
    }

    // -- validate ------------------------------------------------------------

    #[test]
    fn validation_lists_missing_and_duplicates() {
        let e = editor(&[("Nom", "name"), ("Libellé", "name"), ("Couleur", "colour")]);
        let v = e.validate(&PRODUCTS);
        assert_eq!(v.missing_required().collect::<Vec<_>>(), vec!["reference", "unit_price"]);
        assert_eq!(v.duplicate_destinations, vec!["name"]);
        assert_eq!(v.unknown_destinations, vec!["colour"]);
        assert_eq!(v.required[0].mapped_from.as_deref(), Some("Nom"));
        assert!(!v.is_valid());
    }

    #[test]
    fn validation_passes_for_clean_mapping() {
        let e = editor(&[("Nom", "name"), ("Ville", "city")]);
        assert!(e.validate(&SUPPLIERS).is_valid());
    }

    // -- available_destinations ----------------------------------------------

    #[test]
    fn fields_used_elsewhere_are_not_offered() {
        let e = editor(&[("Nom", "name"), ("Ville", "city")]);
        let for_ville: Vec<_> = e
            .available_destinations("Ville", &SUPPLIERS)
            .iter()
            .map(|f| f.name)
            .collect();
        assert!(!for_ville.contains(&"name"));
        assert!(for_ville.contains(&"city"));

        let for_new: Vec<_> = e
            .available_destinations("Pays", &SUPPLIERS)
            .iter()
            .map(|f| f.name)
            .collect();
        assert!(!for_new.contains(&"city"));
        assert!(for_new.contains(&"country"));
    }

    // -- apply_to_row --------------------------------------------------------

    #[test]
    fn apply_maps_and_transforms() {
        let mut e = editor(&[("Nom", "name"), ("Ville", "city"), ("Absent", "notes")]);
        e.set_transformation("Ville", Some(TransformationKind::Uppercase));

        let mut row = SourceRow::new();
        row.insert("Nom".into(), "Acme".into());
        row.insert("Ville".into(), "lyon".into());
        row.insert("Ignored".into(), "x".into());

        let record = e.apply_to_row(&row);
        assert_eq!(record["name"], "Acme");
        assert_eq!(record["city"], "LYON");
        assert_eq!(record["notes"], "");
        assert!(!record.contains_key("Ignored"));
    }

    #[test]
    fn clear_empties_everything() {
        let mut e = editor(&[("Nom", "name")]);
        e.set_transformation("Nom", Some(TransformationKind::Trim));
        e.clear();
        assert_eq!(e, MappingEditor::new());
    }
}
