//! Reader for the older equipment document shape, where each piece of kit was a
//! top-level boolean flag (`casco: true`) with its details spread over sibling keys
//! (`numero_serie_casco`, `talla_funda`).
//!
//! Some documents from earlier seasons were never migrated to the item list. The
//! normalizer only consults this module when `legacy_flags` is enabled.

use crate::models::EquipmentRecord;
use serde_json::Value;
use std::collections::BTreeMap;

struct LegacyFlag {
    flag: &'static str,
    name: &'static str,
    /// (detail key shown on the item, key on the record)
    details: &'static [(&'static str, &'static str)],
}

const LEGACY_FLAGS: &[LegacyFlag] = &[
    LegacyFlag {
        flag: "casco",
        name: "Casco",
        details: &[
            ("numero_serie", "numero_serie_casco"),
            ("talla", "talla_funda"),
        ],
    },
    LegacyFlag {
        flag: "hombreras_riddell_potros_24",
        name: "Hombreras Riddell Potros 24",
        details: &[("numero_serie", "numero_serie_hombreras")],
    },
    LegacyFlag {
        flag: "jersey",
        name: "Jersey",
        details: &[
            ("numero_serie", "numero_serie_jersey"),
            ("talla", "talla_jersey"),
            ("tipo", "tipo_jersey"),
        ],
    },
];

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyItem {
    pub name: &'static str,
    pub extra_fields: BTreeMap<String, Value>,
}

/// Items whose flag is set on the record, in flag table order
pub fn read_legacy_items(record: &EquipmentRecord) -> Vec<LegacyItem> {
    LEGACY_FLAGS
        .iter()
        .filter(|def| record.extra.get(def.flag).is_some_and(is_flag_set))
        .map(|def| LegacyItem {
            name: def.name,
            extra_fields: def
                .details
                .iter()
                .filter_map(|(shown, stored)| {
                    record
                        .extra
                        .get(*stored)
                        .filter(|v| !v.is_null())
                        .map(|v| (shown.to_string(), v.clone()))
                })
                .collect(),
        })
        .collect()
}

/// Flags were written as booleans, "SI"/"NO" strings, or 0/1
pub fn is_flag_set(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => {
            let s = s.trim();
            !s.is_empty() && !s.eq_ignore_ascii_case("no") && !s.eq_ignore_ascii_case("false")
        }
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flag_truthiness() {
        assert!(is_flag_set(&json!(true)));
        assert!(is_flag_set(&json!("SI")));
        assert!(is_flag_set(&json!(1)));
        assert!(!is_flag_set(&json!(false)));
        assert!(!is_flag_set(&json!("NO")));
        assert!(!is_flag_set(&json!("")));
        assert!(!is_flag_set(&json!(0)));
        assert!(!is_flag_set(&json!(null)));
    }

    #[test]
    fn test_reads_all_flags_in_table_order() {
        let record: EquipmentRecord = serde_json::from_value(json!({
            "jersey": "SI",
            "numero_serie_jersey": "J-4",
            "talla_jersey": "XL",
            "tipo_jersey": null,
            "casco": true,
            "hombreras_riddell_potros_24": false
        }))
        .unwrap();

        let items = read_legacy_items(&record);
        let names: Vec<_> = items.iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["Casco", "Jersey"]);

        assert!(items[0].extra_fields.is_empty());
        let jersey = &items[1].extra_fields;
        assert_eq!(jersey.get("numero_serie"), Some(&json!("J-4")));
        assert_eq!(jersey.get("talla"), Some(&json!("XL")));
        assert!(!jersey.contains_key("tipo"));
    }

    #[test]
    fn test_no_flags_no_items() {
        assert!(read_legacy_items(&EquipmentRecord::default()).is_empty());
    }
}
