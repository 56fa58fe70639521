//! Flattens a stored equipment document into display items.
//!
//! Pure functions only: no I/O, the record is borrowed immutably, and the same
//! record always yields the same list (identifiers included).

use crate::deserializers::value_to_display;
use crate::legacy;
use crate::models::{AssignedItem, EquipmentRecord};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

pub const UNNAMED_ITEM: &str = "Sin nombre";
pub const UNKNOWN_PLAYER: &str = "Jugador desconocido";
/// Returned flag assumed when the record has none
pub const NOT_RETURNED: &str = "NO";

/// Keys that are either promoted to named fields or structural, never shown as extras
pub const RESERVED_KEYS: &[&str] = &[
    // item id/label pair
    "value",
    "label",
    "id",
    // stored names of the promoted fields
    "nombre",
    "jugador",
    "fecha_asignacion",
    "fecha_entrega",
    "devuelto",
    "asignado",
    // normalized names
    "identifier",
    "name",
    "playerName",
    "assignmentDate",
    "deliveryDate",
    "returned",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Append items found through the old per-item boolean flags
    pub legacy_flags: bool,
}

/// Normalize using the current document shape only
pub fn normalize(record: &EquipmentRecord) -> Vec<AssignedItem> {
    normalize_with(record, &NormalizeOptions::default())
}

pub fn normalize_with(record: &EquipmentRecord, options: &NormalizeOptions) -> Vec<AssignedItem> {
    let shared = SharedFields::from_record(record);
    let mut items = Vec::new();

    if let Some(entries) = record.assigned_items.as_array() {
        for (position, entry) in entries.iter().enumerate() {
            if is_blank_entry(entry) {
                debug!(
                    record = record.record_key(),
                    position, "skipping empty item entry: {}", entry
                );
                continue;
            }
            let item = match entry {
                Value::Object(fields) => {
                    let name = fields.get("label").and_then(value_to_display);
                    shared.item(items.len(), name, extra_fields(fields))
                }
                // A bare string entry is a label with nothing else attached
                Value::String(label) => {
                    shared.item(items.len(), Some(label.clone()), BTreeMap::new())
                }
                // Any other present value still counts as an item, just an unnamed one
                _ => shared.item(items.len(), None, BTreeMap::new()),
            };
            items.push(item);
        }
    } else if !record.assigned_items.is_null() {
        debug!(
            record = record.record_key(),
            "assigned item list is not an array, treating as empty"
        );
    }

    if options.legacy_flags {
        for found in legacy::read_legacy_items(record) {
            let item = shared.item(
                items.len(),
                Some(found.name.to_string()),
                found.extra_fields,
            );
            items.push(item);
        }
    }

    items
}

/// Null, `false`, zero, blank strings and empty containers carry no item
fn is_blank_entry(entry: &Value) -> bool {
    match entry {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(true) => false,
    }
}

/// Every key on the raw item that is not reserved
pub fn extra_fields(fields: &Map<String, Value>) -> BTreeMap<String, Value> {
    fields
        .iter()
        .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Deterministic list key for the item at `position` within `record_key`
pub fn item_identifier(record_key: &str, position: usize) -> String {
    let digest = blake3::hash(format!("{}#{}", record_key, position).as_bytes());
    let hex = digest.to_hex();
    format!("item-{}-{}", position, &hex.as_str()[..12])
}

/// Record-level values copied verbatim onto every item
struct SharedFields<'a> {
    record_key: &'a str,
    player_name: String,
    assignment_date: Option<String>,
    delivery_date: Option<String>,
    returned: String,
}

impl<'a> SharedFields<'a> {
    fn from_record(record: &'a EquipmentRecord) -> Self {
        Self {
            record_key: record.record_key(),
            player_name: record
                .player_label()
                .unwrap_or(UNKNOWN_PLAYER)
                .to_string(),
            assignment_date: record.assignment_date.clone(),
            delivery_date: record.delivery_date.clone(),
            returned: record
                .returned_flag
                .clone()
                .unwrap_or_else(|| NOT_RETURNED.to_string()),
        }
    }

    fn item(
        &self,
        position: usize,
        name: Option<String>,
        extra_fields: BTreeMap<String, Value>,
    ) -> AssignedItem {
        AssignedItem {
            identifier: item_identifier(self.record_key, position),
            name: name.unwrap_or_else(|| UNNAMED_ITEM.to_string()),
            player_name: self.player_name.clone(),
            assignment_date: self.assignment_date.clone(),
            delivery_date: self.delivery_date.clone(),
            returned: self.returned.clone(),
            extra_fields,
        }
    }
}
