//! Terminal rendering of the equipment screen for the CLI.

use crate::presentation::{EquipmentSheet, ItemCard};
use crate::view::ViewState;
use prettytable::{Table, row};

/// One row per card; extra details folded into a single cell
pub fn sheet_table(sheet: &EquipmentSheet) -> Table {
    let mut table = Table::new();
    table.add_row(row![
        "Equipo",
        "Fecha asignación",
        "Fecha entrega",
        "Detalles",
        "Estado"
    ]);
    for card in &sheet.cards {
        table.add_row(row![
            card.name,
            card.assignment_date,
            card.delivery_date,
            details_cell(card),
            card.badge.badge_text(),
        ]);
    }
    table
}

fn details_cell(card: &ItemCard) -> String {
    card.details
        .iter()
        .map(|d| format!("{}: {}", d.label, d.value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn print_header(sheet: &EquipmentSheet) {
    println!("{}", sheet.title);
    if let Some(number) = &sheet.jersey_number {
        println!("Número: {}", number);
    }
}

/// Print whatever the view currently shows
pub fn print_state(state: &ViewState) {
    match state {
        ViewState::Loading => println!("Cargando equipamiento..."),
        ViewState::Ready { sheet, .. } => {
            print_header(sheet);
            sheet_table(sheet).printstd();
        }
        ViewState::Empty { reason, sheet } => {
            if let Some(sheet) = sheet {
                print_header(sheet);
            }
            println!("{}", reason.message());
        }
        ViewState::Failed { message, .. } => println!("{}", message),
    }
    if let Some(action) = state.action() {
        println!("[{}]", action.label());
    }
}
