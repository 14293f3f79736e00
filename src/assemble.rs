//! Result assembly: one flat row per at-risk property.

use serde_json::Value;
use tracing::info;

use crate::models::{Attributes, Row};
use crate::pip::PropertyMatch;

/// Options for [`assemble`]
#[derive(Debug, Clone, Default)]
pub struct AssembleOptions {
    /// Zone attributes to carry into each row as `zone_<name>` arrays
    pub zone_fields: Vec<String>,
}

/// Build output rows from overlay matches, keeping the match order.
///
/// A property inside several zones still yields exactly one row.
pub fn assemble(matches: &[PropertyMatch<'_>], options: &AssembleOptions) -> Vec<Row> {
    let rows: Vec<Row> = matches
        .iter()
        .map(|m| Row {
            source_index: m.index,
            attributes: m.attributes.clone(),
            at_risk: !m.zones.is_empty(),
            zone_count: m.zones.len(),
            zone_values: carried_fields(&m.zones, &options.zone_fields),
        })
        .collect();

    info!("Assembled {} at-risk rows", rows.len());
    rows
}

fn carried_fields(zones: &[&Attributes], fields: &[String]) -> Attributes {
    fields
        .iter()
        .map(|name| {
            let values = zones
                .iter()
                .map(|z| z.get(name).cloned().unwrap_or(Value::Null))
                .collect();
            (format!("zone_{}", name), Value::Array(values))
        })
        .collect()
}
