//! Heuristic source-column to destination-field matching.
//!
//! Headers and synonym patterns are both reduced to a normalized token
//! (lower-case, no diacritics, `_` between alphanumeric runs). A pattern
//! matches a header when the tokens are equal or one contains the other.
//! The synonym table is walked in declaration order and the first match
//! wins; a destination already claimed by an earlier header is skipped.
//!
//! False positives and negatives are expected: every suggestion can be
//! overridden in the mapping editor.

use std::collections::HashSet;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::mapping::FieldMapping;
use crate::profile::EntityImportProfile;

/// Normalize a header or pattern into a comparable token.
///
/// `"Nom du Fournisseur (principal)"` becomes `"nom_du_fournisseur_principal"`,
/// `"Téléphone"` becomes `"telephone"`.
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut separator_pending = false;

    for c in input.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_alphanumeric() {
            if separator_pending && !out.is_empty() {
                out.push('_');
            }
            separator_pending = false;
            out.extend(c.to_lowercase());
        } else {
            separator_pending = true;
        }
    }

    out
}

/// Whether a normalized header and a normalized pattern match.
fn tokens_match(header: &str, pattern: &str) -> bool {
    header == pattern || header.contains(pattern) || pattern.contains(header)
}

/// Propose a mapping for `headers` against `profile`.
///
/// Deterministic: the result depends only on the header order and the
/// profile's synonym order.
pub fn suggest(headers: &[String], profile: &EntityImportProfile) -> FieldMapping {
    let patterns: Vec<(String, &'static str)> = profile
        .synonyms
        .iter()
        .map(|(pattern, dest)| (normalize(pattern), *dest))
        .filter(|(pattern, _)| !pattern.is_empty())
        .collect();

    let mut mapping = FieldMapping::new();
    let mut claimed: HashSet<&'static str> = HashSet::new();

    for header in headers {
        if mapping.contains_key(header) {
            continue;
        }
        let token = normalize(header);
        if token.is_empty() {
            continue;
        }

        let hit = patterns
            .iter()
            .find(|(pattern, dest)| !claimed.contains(dest) && tokens_match(&token, pattern));

        if let Some((_, dest)) = hit {
            claimed.insert(*dest);
            mapping.insert(header.clone(), (*dest).to_string());
        }
    }

    mapping
}
