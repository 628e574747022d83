//! Rendering of price lookups for the CLI

use comfy_table::{Cell, Color, Table};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PriceRow {
    pub instance_type: String,
    pub region: String,
    /// On-demand hourly price; `0.0` when the catalog lists no price
    pub price_usd: f64,
}

pub fn render_table(rows: &[PriceRow]) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Instance type", "Region", "USD/hr"]);

    for row in rows {
        let price = if row.price_usd > 0.0 {
            Cell::new(format!("{:.4}", row.price_usd))
        } else {
            Cell::new("not listed").fg(Color::Yellow)
        };
        table.add_row(vec![
            Cell::new(&row.instance_type),
            Cell::new(&row.region),
            price,
        ]);
    }

    table.to_string()
}

pub fn render_json(rows: &[PriceRow]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(rows)
}
