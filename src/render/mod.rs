//! Rendering of the decoder call expression.
//!
//! Selection walks the field table in order and keeps every descriptor whose
//! condition is satisfied; the formatter then emits the two parallel lists
//! (decode types, keys) wrapped in the fixed call boilerplate. The fragment
//! is meant to be pasted into the body of a JavaScript uplink decoder, so
//! its structural shape (one entry per line with a trailing comma, both
//! lists closed) is part of the contract.

use thiserror::Error;

use crate::extract::ActiveFeatures;
use crate::profile::{FieldDescriptor, PayloadProfile};

/// Two simultaneously active fields want the same output key.
///
/// Duplicate keys in the table are only valid while their conditions stay
/// mutually exclusive; a configuration that activates both is refused
/// instead of silently emitting the key twice.
#[derive(Debug, Error, PartialEq)]
#[error("output key '{key}' selected twice: '{first}' and '{second}' are both active")]
pub struct KeyConflict {
    pub key: String,
    pub first: String,
    pub second: String,
}

/// Fields whose condition is satisfied, in table order.
pub fn select_fields<'a>(
    profile: &'a PayloadProfile,
    active: &ActiveFeatures,
) -> Result<Vec<&'a FieldDescriptor>, KeyConflict> {
    let mut selected: Vec<&FieldDescriptor> = Vec::new();
    for field in &profile.fields {
        let included = match &field.condition {
            None => true,
            Some(feature) => active.contains(feature),
        };
        if !included {
            continue;
        }
        if let Some(prev) = selected.iter().find(|p| p.key == field.key) {
            return Err(KeyConflict {
                key: field.key.clone(),
                first: prev.condition_label().to_string(),
                second: field.condition_label().to_string(),
            });
        }
        selected.push(field);
    }
    Ok(selected)
}

/// Format the selected fields as the decoder call expression.
pub fn decoder_call(fields: &[&FieldDescriptor]) -> String {
    let mut out = String::from("return decode(\n    bytes,\n    [\n");
    for field in fields {
        out.push_str("        ");
        out.push_str(&field.decode_type);
        out.push_str(",\n");
    }
    out.push_str("    ],\n    [\n");
    for field in fields {
        out.push_str("        ");
        out.push_str(&field.key);
        out.push_str(",\n");
    }
    out.push_str("    ],\n);");
    out
}

/// Selection and formatting in one step.
pub fn render(profile: &PayloadProfile, active: &ActiveFeatures) -> Result<String, KeyConflict> {
    Ok(decoder_call(&select_fields(profile, active)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::FieldDescriptor;

    fn field(key: &str, condition: Option<&str>, decode_type: &str) -> FieldDescriptor {
        FieldDescriptor {
            key: key.to_string(),
            condition: condition.map(|c| c.to_string()),
            decode_type: decode_type.to_string(),
        }
    }

    #[test]
    fn call_shape_is_exact() {
        let profile = PayloadProfile {
            features: vec!["SENSORID_EN".into()],
            fields: vec![
                field("id", Some("SENSORID_EN"), "uint32"),
                field("status", None, "bitmap"),
            ],
        };
        let active = ActiveFeatures::from_names(["SENSORID_EN"]);
        let expected = r#"return decode(
    bytes,
    [
        uint32,
        bitmap,
    ],
    [
        id,
        status,
    ],
);"#;
        assert_eq!(render(&profile, &active).expect("render"), expected);
    }

    #[test]
    fn empty_selection_still_renders() {
        let profile = PayloadProfile {
            features: vec!["ADC_EN".into()],
            fields: vec![field("supply_v", Some("ADC_EN"), "uint16")],
        };
        let expected = r#"return decode(
    bytes,
    [
    ],
    [
    ],
);"#;
        assert_eq!(
            render(&profile, &ActiveFeatures::default()).expect("render"),
            expected
        );
    }

    #[test]
    fn selection_keeps_table_order() {
        let profile = PayloadProfile::default();
        let active = ActiveFeatures::from_names(["RAINDATA_EN", "SENSORID_EN"]);
        let selected = select_fields(&profile, &active).expect("select");
        let keys: Vec<&str> = selected.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(
            keys,
            [
                "id",
                "status_node",
                "status",
                "air_temp_c",
                "humidity",
                "wind_gust_meter_sec",
                "wind_avg_meter_sec",
                "wind_direction_deg",
                "rain_mm",
                "rain_hr",
                "rain_day",
                "rain_week",
                "rain_mon"
            ]
        );
    }

    #[test]
    fn conflicting_duplicate_is_refused() {
        let profile = PayloadProfile::default();
        let active = ActiveFeatures::from_names(["THEENGSDECODER_EN", "MITHERMOMETER_EN"]);
        let err = select_fields(&profile, &active).expect_err("conflict");
        assert_eq!(err.key, "indoor_temp_c");
        assert_eq!(err.first, "THEENGSDECODER_EN");
        assert_eq!(err.second, "MITHERMOMETER_EN");
    }
}
