//! Rendering of price snapshots for the terminal.
use price_common::{PriceSnapshot, Result};

/// Render `requested` symbols as an aligned table; missing symbols show `n/a`.
pub fn render_table(snapshot: &PriceSnapshot, requested: &[String], currency: &str) -> String {
    let mut out = format!("{:<8} {:>16} {:>10}\n", "SYMBOL", format!("PRICE ({})", currency), "24H");
    for symbol in requested {
        match snapshot.get(symbol) {
            Some(quote) => out.push_str(&format!(
                "{:<8} {:>16.4} {:>+9.2}%\n",
                symbol, quote.price, quote.change_24h
            )),
            None => out.push_str(&format!("{:<8} {:>16} {:>10}\n", symbol, "n/a", "n/a")),
        }
    }
    out
}

/// Render the quotes of `requested` symbols as a JSON object keyed by symbol.
pub fn render_json(snapshot: &PriceSnapshot, requested: &[String]) -> Result<String> {
    let selected: PriceSnapshot = requested
        .iter()
        .filter_map(|symbol| snapshot.get(symbol).map(|quote| (symbol.clone(), *quote)))
        .collect();
    Ok(serde_json::to_string_pretty(&selected)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use price_common::PriceQuote;

    fn sample() -> PriceSnapshot {
        let mut snapshot = PriceSnapshot::new();
        snapshot.insert("BTC", PriceQuote::new(43250.0, 2.34));
        snapshot.insert("EUR", PriceQuote::pass_through());
        snapshot
    }

    #[test]
    fn table_marks_missing_symbols() {
        let requested = vec!["BTC".to_string(), "PEPE".to_string()];
        let table = render_table(&sample(), &requested, "EUR");
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("PRICE (EUR)"));
        assert!(lines[1].starts_with("BTC"));
        assert!(lines[1].contains("43250.0000"));
        assert!(lines[1].contains("+2.34%"));
        assert!(lines[2].starts_with("PEPE"));
        assert!(lines[2].contains("n/a"));
    }

    #[test]
    fn json_only_contains_requested_symbols() {
        let json = render_json(&sample(), &["EUR".to_string()]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["EUR"]["price"], 1.0);
        assert!(value.get("BTC").is_none());
    }
}
