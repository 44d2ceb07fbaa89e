//! Entity import profiles.
//!
//! One static profile per importable entity type. A profile lists the
//! destination fields (required first, then optional), the ordered synonym
//! table used by the mapping suggestion engine, and the field the backend
//! uses to detect an already-existing record.
//!
//! Profiles are compile-time data and never change at runtime.

use serde::Serialize;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A destination field of an importable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProfileField {
    /// Field name as expected by the backend (e.g. `"postal_code"`).
    pub name: &'static str,
    /// Human-readable label, used for the field template header row.
    pub label: &'static str,
    /// Placeholder value written to the field template example row.
    pub example: &'static str,
}

/// Static import description for one entity type.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EntityImportProfile {
    /// Backend entity key (e.g. `"suppliers"`).
    pub entity_key: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// Fields that must be mapped before the import can run.
    pub required: &'static [ProfileField],
    /// Fields that may be mapped.
    pub optional: &'static [ProfileField],
    /// Ordered `(pattern, destination_field)` pairs. Order is significant:
    /// the first matching pattern wins.
    pub synonyms: &'static [(&'static str, &'static str)],
    /// Destination field used to recognise an existing record.
    pub duplicate_key: &'static str,
}

impl EntityImportProfile {
    /// All destination fields, required first, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &'static ProfileField> {
        self.required.iter().chain(self.optional.iter())
    }

    /// Look up a destination field by name.
    pub fn field(&self, name: &str) -> Option<&'static ProfileField> {
        self.fields().find(|f| f.name == name)
    }

    pub fn is_known_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|f| f.name == name)
    }

    /// Names of the required fields, in declaration order.
    pub fn required_names(&self) -> impl Iterator<Item = &'static str> {
        self.required.iter().map(|f| f.name)
    }
}

const fn field(
    name: &'static str,
    label: &'static str,
    example: &'static str,
) -> ProfileField {
    ProfileField {
        name,
        label,
        example,
    }
}

// ---------------------------------------------------------------------------
// Suppliers
// ---------------------------------------------------------------------------

pub const SUPPLIERS: EntityImportProfile = EntityImportProfile {
    entity_key: "suppliers",
    label: "Suppliers",
    required: &[field("name", "Name", "Acme Supplies")],
    optional: &[
        field("email", "Email", "orders@acme.example"),
        field("phone", "Phone", "+33 1 23 45 67 89"),
        field("address", "Address", "12 rue des Lilas"),
        field("city", "City", "Lyon"),
        field("postal_code", "Postal code", "69001"),
        field("country", "Country", "France"),
        field("tax_id", "Tax ID", "FR12345678901"),
        field("website", "Website", "https://acme.example"),
        field("contact_person", "Contact person", "Jeanne Martin"),
        field("notes", "Notes", ""),
    ],
    synonyms: &[
        ("name", "name"),
        ("nom", "name"),
        ("fournisseur", "name"),
        ("supplier", "name"),
        ("raison_sociale", "name"),
        ("company", "name"),
        ("societe", "name"),
        ("email", "email"),
        ("courriel", "email"),
        ("mail", "email"),
        ("phone", "phone"),
        ("telephone", "phone"),
        ("mobile", "phone"),
        ("address", "address"),
        ("adresse", "address"),
        ("street", "address"),
        ("city", "city"),
        ("ville", "city"),
        ("town", "city"),
        ("localite", "city"),
        ("postal_code", "postal_code"),
        ("code_postal", "postal_code"),
        ("zip", "postal_code"),
        ("country", "country"),
        ("pays", "country"),
        ("tax_id", "tax_id"),
        ("siret", "tax_id"),
        ("vat", "tax_id"),
        ("tva", "tax_id"),
        ("website", "website"),
        ("site_web", "website"),
        ("url", "website"),
        ("contact_person", "contact_person"),
        ("contact", "contact_person"),
        ("interlocuteur", "contact_person"),
        ("notes", "notes"),
        ("remarque", "notes"),
        ("commentaire", "notes"),
    ],
    duplicate_key: "name",
};

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

pub const PRODUCTS: EntityImportProfile = EntityImportProfile {
    entity_key: "products",
    label: "Products",
    required: &[
        field("name", "Name", "Steel bolt M8"),
        field("reference", "Reference", "BOLT-M8-50"),
        field("unit_price", "Unit price", "0.45"),
    ],
    optional: &[
        field("description", "Description", "Zinc-plated hex bolt"),
        field("category", "Category", "Hardware"),
        field("barcode", "Barcode", "3760123456789"),
        field("cost_price", "Cost price", "0.20"),
        field("tax_rate", "Tax rate", "20"),
        field("stock_quantity", "Stock quantity", "500"),
        field("unit", "Unit", "piece"),
    ],
    synonyms: &[
        ("name", "name"),
        ("designation", "name"),
        ("libelle", "name"),
        ("product", "name"),
        ("produit", "name"),
        ("reference", "reference"),
        ("ref", "reference"),
        ("sku", "reference"),
        ("cost_price", "cost_price"),
        ("prix_achat", "cost_price"),
        ("purchase_price", "cost_price"),
        ("unit_price", "unit_price"),
        ("prix_unitaire", "unit_price"),
        ("prix_vente", "unit_price"),
        ("price", "unit_price"),
        ("prix", "unit_price"),
        ("description", "description"),
        ("category", "category"),
        ("categorie", "category"),
        ("famille", "category"),
        ("barcode", "barcode"),
        ("ean", "barcode"),
        ("code_barre", "barcode"),
        ("tax_rate", "tax_rate"),
        ("taux_tva", "tax_rate"),
        ("vat_rate", "tax_rate"),
        ("stock_quantity", "stock_quantity"),
        ("stock", "stock_quantity"),
        ("quantite", "stock_quantity"),
        ("quantity", "stock_quantity"),
        ("unit", "unit"),
        ("unite", "unit"),
    ],
    duplicate_key: "reference",
};

// ---------------------------------------------------------------------------
// Clients
// ---------------------------------------------------------------------------

pub const CLIENTS: EntityImportProfile = EntityImportProfile {
    entity_key: "clients",
    label: "Clients",
    required: &[
        field("name", "Name", "Dupont SARL"),
        field("email", "Email", "contact@dupont.example"),
    ],
    optional: &[
        field("phone", "Phone", "+33 4 56 78 90 12"),
        field("address", "Address", "5 avenue Foch"),
        field("city", "City", "Marseille"),
        field("postal_code", "Postal code", "13001"),
        field("country", "Country", "France"),
        field("tax_id", "Tax ID", "FR98765432109"),
        field("payment_terms", "Payment terms", "30 days"),
        field("notes", "Notes", ""),
    ],
    synonyms: &[
        ("name", "name"),
        ("nom", "name"),
        ("client", "name"),
        ("customer", "name"),
        ("raison_sociale", "name"),
        ("company", "name"),
        ("societe", "name"),
        ("email", "email"),
        ("courriel", "email"),
        ("mail", "email"),
        ("phone", "phone"),
        ("telephone", "phone"),
        ("mobile", "phone"),
        ("address", "address"),
        ("adresse", "address"),
        ("street", "address"),
        ("city", "city"),
        ("ville", "city"),
        ("town", "city"),
        ("postal_code", "postal_code"),
        ("code_postal", "postal_code"),
        ("zip", "postal_code"),
        ("country", "country"),
        ("pays", "country"),
        ("tax_id", "tax_id"),
        ("siret", "tax_id"),
        ("vat", "tax_id"),
        ("payment_terms", "payment_terms"),
        ("conditions_paiement", "payment_terms"),
        ("echeance", "payment_terms"),
        ("notes", "notes"),
        ("remarque", "notes"),
        ("commentaire", "notes"),
    ],
    duplicate_key: "email",
};

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Every importable entity type, in the order offered to the user.
pub const ALL_PROFILES: &[&EntityImportProfile] = &[&SUPPLIERS, &PRODUCTS, &CLIENTS];

/// Find the profile for an entity key.
pub fn find_profile(entity_key: &str) -> Result<&'static EntityImportProfile, CoreError> {
    ALL_PROFILES
        .iter()
        .copied()
        .find(|p| p.entity_key == entity_key)
        .ok_or_else(|| CoreError::UnknownEntity(entity_key.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn find_profile_by_key() {
        let profile = find_profile("products").unwrap();
        assert_eq!(profile.label, "Products");
    }

    #[test]
    fn find_profile_unknown_key() {
        assert_matches!(
            find_profile("invoices"),
            Err(CoreError::UnknownEntity(k)) if k == "invoices"
        );
    }

    #[test]
    fn synonyms_target_known_fields() {
        for profile in ALL_PROFILES {
            for (pattern, dest) in profile.synonyms {
                assert!(
                    profile.is_known_field(dest),
                    "{}: pattern '{pattern}' targets unknown field '{dest}'",
                    profile.entity_key
                );
            }
        }
    }

    #[test]
    fn field_names_are_unique() {
        for profile in ALL_PROFILES {
            let mut seen = HashSet::new();
            for f in profile.fields() {
                assert!(seen.insert(f.name), "{}: duplicate field {}", profile.entity_key, f.name);
            }
        }
    }

    #[test]
    fn duplicate_key_is_a_known_field() {
        for profile in ALL_PROFILES {
            assert!(profile.is_known_field(profile.duplicate_key));
        }
    }

    #[test]
    fn required_fields_come_first() {
        let names: Vec<_> = PRODUCTS.fields().map(|f| f.name).collect();
        assert_eq!(&names[..3], &["name", "reference", "unit_price"]);
        assert!(PRODUCTS.is_required("reference"));
        assert!(!PRODUCTS.is_required("barcode"));
    }
}
