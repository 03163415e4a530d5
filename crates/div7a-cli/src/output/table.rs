use serde_json::Value;
use tabled::{builder::Builder, Table};

/// Columns shown for each loan in the per-loan table.
const LOAN_COLUMNS: &[&str] = &[
    "shareholder",
    "opening_balance",
    "closing_balance",
    "risk_level",
    "classification_confidence",
];

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if map.contains_key("loan_analyses") {
                print_summary_tables(map);
            } else if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(value);
            }
        }
        Value::Array(arr) => {
            print_array_table(arr);
        }
        _ => {
            println!("{}", value);
        }
    }
}

/// Tenant summary: headline figures first, then one row per loan,
/// then warnings and amalgamation notes.
fn print_summary_tables(map: &serde_json::Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        if matches!(
            key.as_str(),
            "loan_analyses" | "safe_harbour_exclusions" | "warnings" | "amalgamation_notes"
        ) {
            continue;
        }
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));

    if let Some(Value::Array(loans)) = map.get("loan_analyses") {
        if !loans.is_empty() {
            println!("\nLoans:");
            let mut builder = Builder::default();
            builder.push_record(LOAN_COLUMNS.iter().copied());
            for loan in loans {
                if let Value::Object(loan_map) = loan {
                    let row: Vec<String> = LOAN_COLUMNS
                        .iter()
                        .map(|c| loan_map.get(*c).map(format_value).unwrap_or_default())
                        .collect();
                    builder.push_record(row);
                }
            }
            println!("{}", Table::from(builder));
        }
    }

    for (key, heading) in [
        ("amalgamation_notes", "Amalgamation notes"),
        ("warnings", "Warnings"),
    ] {
        if let Some(Value::Array(items)) = map.get(key) {
            if !items.is_empty() {
                println!("\n{}:", heading);
                for item in items {
                    if let Value::String(s) = item {
                        println!("  - {}", s);
                    }
                }
            }
        }
    }
}

/// Computation envelope (e.g. a repayment schedule): result fields, then
/// schedule rows, warnings and methodology.
fn print_result_table(result: &Value, envelope: &serde_json::Map<String, Value>) {
    if let Value::Object(res_map) = result {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in res_map {
            if key == "rows" {
                continue;
            }
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        println!("{}", Table::from(builder));

        if let Some(Value::Array(rows)) = res_map.get("rows") {
            println!();
            print_array_table(rows);
        }
    } else {
        print_flat_object(&Value::Object(envelope.clone()));
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        println!("{}", Table::from(builder));
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
