use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, modifiers, presets};
use engine::{PositionRow, PositionStatus, SessionView};
use events::{LogBook, LogLevel};
use rust_decimal::Decimal;

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|t| Cell::new(t).add_attribute(Attribute::Bold))
        .collect()
}

fn price(value: Decimal) -> String {
    if value.is_zero() {
        "-".to_string()
    } else {
        format!("{value:.2}")
    }
}

/// The position board: one row per holding.
pub fn position_table(rows: &[PositionRow]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header(&[
        "Code", "Name", "Shares", "Cost", "Price", "Hist. High", "High", "Exit", "Status",
    ]));

    for row in rows {
        let price_cell = Cell::new(price(row.current_price));
        let price_cell = if row.current_price.is_zero() || row.cost_price.is_zero() {
            price_cell
        } else if row.current_price >= row.cost_price {
            price_cell.fg(Color::Green)
        } else {
            price_cell.fg(Color::Red)
        };
        let status_cell = match row.status {
            PositionStatus::Monitoring => Cell::new(row.status).fg(Color::Cyan),
            PositionStatus::Excluded => Cell::new(row.status).fg(Color::DarkGrey),
            PositionStatus::Idle => Cell::new(row.status),
        };

        table.add_row(vec![
            Cell::new(&row.code),
            Cell::new(if row.name.is_empty() { "-" } else { row.name.as_str() }),
            Cell::new(row.quantity),
            Cell::new(price(row.cost_price)),
            price_cell,
            Cell::new(row.historical_high.map(price).unwrap_or_else(|| "-".to_string())),
            Cell::new(price(row.base_high)),
            Cell::new(price(row.exit_price)),
            status_cell,
        ]);
    }
    table
}

/// Refreshes board rows from the session's latest view.
pub fn apply_session(rows: &mut [PositionRow], view: &SessionView) {
    for row in rows.iter_mut() {
        if row.status == PositionStatus::Excluded {
            continue;
        }
        match view.target(&row.code) {
            Some(target) => row.apply_view(target, view.trailing_stop_pct),
            None => row.mark_idle(),
        }
    }
}

pub fn print_log_book(log: &LogBook) {
    println!("\n--- Operator log (newest first) ---");
    for entry in log.entries() {
        match entry.level {
            LogLevel::Error => println!("!! {entry}"),
            LogLevel::Warn => println!(" ! {entry}"),
            LogLevel::Info => println!("   {entry}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{Holding, OrderType};
    use engine::{HoldingQuote, MonitorStatus, TargetView};

    fn row(code: &str, excluded: bool) -> PositionRow {
        let holding = Holding {
            code: code.to_string(),
            quantity: 1000,
            cost_price: Decimal::from(100),
            last_price: Decimal::from(110),
        };
        let quote = HoldingQuote {
            name: format!("Stock {code}"),
            price: Decimal::from(110),
        };
        PositionRow::new(&holding, &quote, None, Decimal::from(10), excluded)
    }

    #[test]
    fn session_view_drives_the_board() {
        let mut rows = vec![row("2330", false), row("2603", false), row("0050", true)];
        let view = SessionView {
            status: MonitorStatus::Running,
            trailing_stop_pct: Decimal::from(10),
            order_type: OrderType::Rod,
            targets: vec![TargetView {
                symbol: "2330".to_string(),
                quantity: 1000,
                cost_basis: Decimal::from(100),
                latest_price: Some(Decimal::from(120)),
                running_high: Some(Decimal::from(130)),
                exit_price: Some(Decimal::from(117)),
            }],
        };

        apply_session(&mut rows, &view);

        assert_eq!(rows[0].status, PositionStatus::Monitoring);
        assert_eq!(rows[0].exit_price, Decimal::from(117));
        assert_eq!(rows[1].status, PositionStatus::Idle);
        assert_eq!(rows[2].status, PositionStatus::Excluded);
        assert_eq!(position_table(&rows).row_iter().count(), 3);
    }

    #[test]
    fn board_shows_contract_names() {
        let mut unnamed = row("9999", false);
        unnamed.name.clear();

        let table = position_table(&[row("2330", false), unnamed]);
        let name_of = |index: usize| table.row(index).unwrap().cell_iter().nth(1).unwrap().content();

        assert_eq!(name_of(0), "Stock 2330");
        assert_eq!(name_of(1), "-");
        assert!(table.to_string().contains("Name"));
    }
}
