//! "Download field template" support.
//!
//! Produces a delimited file whose header row holds the destination field
//! labels of a profile and whose single data row holds placeholder values.

use crate::error::CoreError;
use crate::profile::EntityImportProfile;

/// File name offered for a profile's template download.
pub fn template_file_name(profile: &EntityImportProfile) -> String {
    format!("{}_import_template.csv", profile.entity_key)
}

/// Render the field template for `profile` using `delimiter`.
///
/// Required fields come first, then optional ones, matching the order the
/// mapping step lists them in.
pub fn field_template(
    profile: &EntityImportProfile,
    delimiter: char,
) -> Result<Vec<u8>, CoreError> {
    if !delimiter.is_ascii() {
        return Err(CoreError::Validation(format!(
            "Delimiter '{delimiter}' must be a single ASCII character"
        )));
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter as u8)
        .from_writer(Vec::new());

    let internal = |e: csv::Error| CoreError::Internal(e.to_string());
    writer
        .write_record(profile.fields().map(|f| f.label))
        .map_err(internal)?;
    writer
        .write_record(profile.fields().map(|f| f.example))
        .map_err(internal)?;

    writer
        .into_inner()
        .map_err(|e| CoreError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::preview::{parse_preview, FormatOptions};
    use crate::profile::{PRODUCTS, SUPPLIERS};
    use crate::suggestion::suggest;

    #[test]
    fn template_has_labels_and_example_row() {
        let bytes = field_template(&PRODUCTS, ',').unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Name,Reference,Unit price,Description,Category,Barcode,\
             Cost price,Tax rate,Stock quantity,Unit"
        );
        assert!(lines.next().unwrap().starts_with("Steel bolt M8,BOLT-M8-50,0.45,"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn template_round_trips_through_preview_and_suggestion() {
        let bytes = field_template(&SUPPLIERS, ';').unwrap();
        let options = FormatOptions {
            delimiter: ';',
            has_header: true,
        };
        let preview = parse_preview(&bytes, options).unwrap();
        assert_eq!(preview.total_row_count, 1);

        let mapping = suggest(&preview.headers, &SUPPLIERS);
        assert_eq!(mapping.len(), SUPPLIERS.fields().count());
        for f in SUPPLIERS.fields() {
            assert_eq!(mapping[f.label], f.name);
        }
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        assert_matches!(field_template(&SUPPLIERS, '§'), Err(CoreError::Validation(_)));
    }

    #[test]
    fn file_name_uses_entity_key() {
        assert_eq!(template_file_name(&SUPPLIERS), "suppliers_import_template.csv");
    }
}
