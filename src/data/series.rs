use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

use crate::utils::{HubError, Result};

/// Render sensor readings as Prometheus exposition lines, one per metric:
/// `metric{key="value",..} reading`. Metrics and labels come out sorted.
pub fn to_time_series(
    data: &HashMap<String, f64>,
    labels: &BTreeMap<String, String>,
) -> Result<String> {
    if data.is_empty() {
        return Err(HubError::MalformedMessage(
            "sensor data cannot be empty".to_string(),
        ));
    }

    let label_set = labels
        .iter()
        .map(|(k, v)| format!("{k}=\"{}\"", escape_label(v)))
        .collect::<Vec<_>>()
        .join(",");

    let mut metrics: Vec<_> = data.iter().collect();
    metrics.sort_by(|a, b| a.0.cmp(b.0));

    let mut out = String::new();
    for (metric, value) in metrics {
        // writing to a String cannot fail
        let _ = writeln!(out, "{metric}{{{label_set}}} {value}");
    }
    Ok(out)
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
