//! Properties the normalizer must hold for any record shape

use serde_json::{Value, json};
use squad_gear::normalize::{UNKNOWN_PLAYER, UNNAMED_ITEM};
use squad_gear::{EquipmentRecord, normalize};

fn record(v: Value) -> EquipmentRecord {
    serde_json::from_value(v).expect("fixture should deserialize")
}

fn sample_records() -> Vec<EquipmentRecord> {
    vec![
        record(json!({
            "jugadorId": {"value": "p1", "label": "Juan Perez"},
            "equipamiento_asignado": [{"label": "CASCO"}, {"label": "JERSEY", "talla": "M"}],
            "fecha_asignacion": "2024-01-01",
            "devuelto": "NO"
        })),
        record(json!({
            "jugadorId": {"value": "p2"},
            "equipamiento_asignado": [
                {"value": "h1"},
                {"value": "j1", "label": "JERSEY", "numero_serie": 77, "medidas": {"pecho": 100}},
                {"label": "GUANTES", "value": "g1", "label_extra": "x"}
            ],
            "fecha_entrega": "2024-03-01",
            "devuelto": "SI"
        })),
        record(json!({
            "player": {"id": "p3", "label": "Ana"},
            "assignedItemsList": [{"label": "BALON", "tipo": "oficial"}]
        })),
    ]
}

#[test]
fn item_count_and_order_match_the_stored_list() {
    for rec in sample_records() {
        let stored: Vec<Value> = rec.assigned_items.as_array().cloned().unwrap_or_default();
        let items = normalize(&rec);
        assert_eq!(items.len(), stored.len());
        for (item, raw) in items.iter().zip(&stored) {
            let expected = raw
                .get("label")
                .and_then(Value::as_str)
                .unwrap_or(UNNAMED_ITEM);
            assert_eq!(item.name, expected);
        }
    }
}

#[test]
fn missing_labels_get_placeholders() {
    let rec = &sample_records()[1];
    let items = normalize(rec);
    assert_eq!(items[0].name, UNNAMED_ITEM);
    assert!(items.iter().all(|i| i.player_name == UNKNOWN_PLAYER));
}

#[test]
fn siblings_share_record_level_fields() {
    for rec in sample_records() {
        let items = normalize(&rec);
        for pair in items.windows(2) {
            assert_eq!(pair[0].player_name, pair[1].player_name);
            assert_eq!(pair[0].assignment_date, pair[1].assignment_date);
            assert_eq!(pair[0].delivery_date, pair[1].delivery_date);
            assert_eq!(pair[0].returned, pair[1].returned);
        }
    }
}

#[test]
fn extra_fields_never_expose_value_or_label() {
    for rec in sample_records() {
        for item in normalize(&rec) {
            assert!(!item.extra_fields.contains_key("value"));
            assert!(!item.extra_fields.contains_key("label"));
        }
    }
    // Keys that merely start with a reserved name are still extras
    let items = normalize(&sample_records()[1]);
    assert!(items[2].extra_fields.contains_key("label_extra"));
    assert_eq!(items[1].extra_fields.get("medidas"), Some(&json!({"pecho": 100})));
}

#[test]
fn absent_or_empty_list_yields_no_items() {
    for v in [
        json!({}),
        json!({"equipamiento_asignado": []}),
        json!({"equipamiento_asignado": null}),
        json!({"equipamiento_asignado": {"0": {"label": "CASCO"}}}),
    ] {
        assert!(normalize(&record(v)).is_empty());
    }
}

#[test]
fn normalizing_twice_gives_identical_lists() {
    for rec in sample_records() {
        let snapshot = rec.clone();
        let first = normalize(&rec);
        let second = normalize(&rec);
        assert_eq!(first, second);
        assert_eq!(rec, snapshot);
    }
}

#[test]
fn identifiers_are_unique_within_a_pass() {
    let cones: Vec<Value> = (0..50).map(|_| json!({"label": "CONO"})).collect();
    let rec = record(json!({ "equipamiento_asignado": cones }));
    let items = normalize(&rec);
    let mut ids: Vec<_> = items.iter().map(|i| i.identifier.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 50);
}
