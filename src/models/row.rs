//! Flat output rows produced by the result assembler.

use serde_json::Value;
use tracing::debug;

use super::Attributes;

/// Attribute name of the derived risk flag
pub const AT_RISK_FIELD: &str = "at_risk";
/// Where a property's own `at_risk` attribute is kept on output
pub const SHADOWED_AT_RISK_FIELD: &str = "property_at_risk";
/// Attribute name of the matching zone count
pub const ZONE_COUNT_FIELD: &str = "zone_count";

/// One at-risk property.
///
/// Derived values are kept apart from the property's own attributes and are
/// only merged when the row is flattened for output.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Position of the property in the input collection
    pub source_index: usize,
    /// Property attributes, untouched
    pub attributes: Attributes,
    pub at_risk: bool,
    pub zone_count: usize,
    /// Zone attributes carried over on request, keyed `zone_<name>`
    pub zone_values: Attributes,
}

impl Row {
    /// Flatten into a single attribute table entry.
    ///
    /// `at_risk` is always written; a property attribute already using that
    /// name moves to `property_at_risk`. Other derived fields never replace a
    /// property attribute of the same name.
    pub fn to_attributes(&self) -> Attributes {
        let mut out = self.attributes.clone();

        let flag = Value::Bool(self.at_risk);
        if let Some(shadowed) = out.insert(AT_RISK_FIELD.to_string(), flag) {
            debug!(
                "Row {}: property attribute `{}` moved to `{}`",
                self.source_index, AT_RISK_FIELD, SHADOWED_AT_RISK_FIELD
            );
            out.insert(SHADOWED_AT_RISK_FIELD.to_string(), shadowed);
        }

        let count = (ZONE_COUNT_FIELD.to_string(), Value::from(self.zone_count));
        let zone_values = self.zone_values.iter().map(|(k, v)| (k.clone(), v.clone()));
        let derived = std::iter::once(count).chain(zone_values);

        for (key, value) in derived {
            if out.contains_key(&key) {
                debug!(
                    "Row {}: keeping property attribute `{}` over derived value",
                    self.source_index, key
                );
                continue;
            }
            out.insert(key, value);
        }

        out
    }
}
