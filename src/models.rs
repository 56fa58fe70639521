use crate::deserializers::{de_option_string_forgiving, value_to_display};
use crate::presentation::ReturnStatus;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Player reference embedded in an equipment document (`jugadorId`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
    #[serde(
        rename = "value",
        alias = "id",
        default,
        deserialize_with = "de_option_string_forgiving"
    )]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de_option_string_forgiving")]
    pub label: Option<String>,
}

/// One equipment document as stored, one per player.
///
/// Only the fields the view reads are typed; anything else lands in `extra` so the
/// legacy flag reader can still find it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "de_option_string_forgiving"
    )]
    pub id: Option<String>,
    #[serde(
        rename = "jugadorId",
        alias = "player",
        default,
        deserialize_with = "de_option_player"
    )]
    pub player: Option<PlayerRef>,
    /// Raw item list; anything other than an array reads as "no items"
    #[serde(rename = "equipamiento_asignado", alias = "assignedItemsList", default)]
    pub assigned_items: Value,
    #[serde(
        rename = "fecha_asignacion",
        alias = "assignmentDate",
        default,
        deserialize_with = "de_option_string_forgiving"
    )]
    pub assignment_date: Option<String>,
    #[serde(
        rename = "fecha_entrega",
        alias = "deliveryDate",
        default,
        deserialize_with = "de_option_string_forgiving"
    )]
    pub delivery_date: Option<String>,
    #[serde(
        rename = "devuelto",
        alias = "returnedFlag",
        default,
        deserialize_with = "de_option_string_forgiving"
    )]
    pub returned_flag: Option<String>,
    #[serde(
        rename = "numero",
        alias = "jerseyNumber",
        default,
        deserialize_with = "de_option_string_forgiving"
    )]
    pub jersey_number: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EquipmentRecord {
    pub fn player_id(&self) -> Option<&str> {
        self.player.as_ref().and_then(|p| p.id.as_deref())
    }

    pub fn player_label(&self) -> Option<&str> {
        self.player.as_ref().and_then(|p| p.label.as_deref())
    }

    /// Stable key for the record: document id, then player id
    pub fn record_key(&self) -> &str {
        self.id
            .as_deref()
            .or_else(|| self.player_id())
            .unwrap_or("anonymous")
    }
}

/// Accepts the usual `{value, label}` object, or a bare id string
fn de_option_player<'de, D>(deserializer: D) -> Result<Option<PlayerRef>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<Value>::deserialize(deserializer)?;
    Ok(match opt {
        None | Some(Value::Null) => None,
        Some(Value::Object(obj)) => {
            let id = obj
                .get("value")
                .or_else(|| obj.get("id"))
                .and_then(value_to_display);
            let label = obj.get("label").and_then(value_to_display);
            Some(PlayerRef { id, label })
        }
        Some(other) => value_to_display(&other).map(|id| PlayerRef {
            id: Some(id),
            label: None,
        }),
    })
}

/// One assigned piece of equipment, flattened for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignedItem {
    pub identifier: String,
    pub name: String,
    pub player_name: String,
    pub assignment_date: Option<String>,
    pub delivery_date: Option<String>,
    /// Record-level returned flag, `"NO"` while the item is still out
    pub returned: String,
    pub extra_fields: BTreeMap<String, Value>,
}

impl AssignedItem {
    pub fn return_status(&self) -> ReturnStatus {
        ReturnStatus::from_flag(&self.returned)
    }
}
