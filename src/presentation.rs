//! Display model for the equipment screen: cards, detail rows and the return badge.

use crate::models::{AssignedItem, EquipmentRecord};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

pub const NOT_SPECIFIED: &str = "No especificada";
pub const TITLE_PREFIX: &str = "EQUIPAMIENTO ASIGNADO A:";
pub const DEFAULT_TITLE_NAME: &str = "Jugador";

pub const MSG_NO_RECORD: &str = "No se encontró registro de equipamiento";
pub const MSG_NO_ITEMS: &str = "No hay equipamiento asignado";
pub const MSG_LOAD_FAILED: &str = "Error al cargar el equipamiento";
pub const MSG_AMBIGUOUS: &str = "Hay más de un registro de equipamiento para este jugador";
pub const MSG_INVALID_PLAYER: &str = "Jugador no válido";

/// Two-state badge driven by the record's returned flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    PendingReturn,
    Returned,
}

impl ReturnStatus {
    /// `"NO"` is the only value meaning the item is still out
    pub fn from_flag(flag: &str) -> Self {
        if flag == "NO" {
            ReturnStatus::PendingReturn
        } else {
            ReturnStatus::Returned
        }
    }

    pub fn badge_text(self) -> &'static str {
        match self {
            ReturnStatus::PendingReturn => "PENDIENTE POR DEVOLVER",
            ReturnStatus::Returned => "DEVUELTO",
        }
    }
}

impl fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.badge_text())
    }
}

/// User action offered next to an empty or failed screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewAction {
    Retry,
    Refresh,
}

impl ViewAction {
    pub fn label(self) -> &'static str {
        match self {
            ViewAction::Retry => "Reintentar",
            ViewAction::Refresh => "Actualizar",
        }
    }
}

/// Extra field key as shown to the user
pub fn field_label(key: &str) -> String {
    key.replace('_', " ")
}

pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailRow {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemCard {
    /// List key, the item's identifier
    pub key: String,
    pub name: String,
    pub assignment_date: String,
    pub delivery_date: String,
    pub details: Vec<DetailRow>,
    pub badge: ReturnStatus,
}

impl ItemCard {
    pub fn from_item(item: &AssignedItem) -> Self {
        Self {
            key: item.identifier.clone(),
            name: item.name.clone(),
            assignment_date: item
                .assignment_date
                .clone()
                .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
            delivery_date: item
                .delivery_date
                .clone()
                .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
            details: item
                .extra_fields
                .iter()
                .map(|(key, value)| DetailRow {
                    label: field_label(key),
                    value: display_value(value),
                })
                .collect(),
            badge: item.return_status(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EquipmentSheet {
    pub title: String,
    pub jersey_number: Option<String>,
    pub cards: Vec<ItemCard>,
}

impl EquipmentSheet {
    pub fn build(record: &EquipmentRecord, items: &[AssignedItem]) -> Self {
        Self {
            title: format!(
                "{} {}",
                TITLE_PREFIX,
                record.player_label().unwrap_or(DEFAULT_TITLE_NAME)
            ),
            jersey_number: record.jersey_number.clone(),
            cards: items.iter().map(ItemCard::from_item).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
