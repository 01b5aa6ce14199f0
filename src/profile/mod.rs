//! # Payload Profile Module
//!
//! A payload profile describes one uplink payload layout: the catalog of
//! feature flags the generator recognizes, and the ordered table of field
//! descriptors that may appear in the payload.
//!
//! ## Order Is the Contract
//!
//! The firmware encoder packs fields into the uplink buffer in a fixed
//! sequence; the decoder must read them back in the same sequence. The
//! `fields` table therefore is an ordered list, never a map: the position of
//! a descriptor *is* its byte position in the payload. Nothing in this tool
//! can verify that the table matches the firmware; the table is trusted,
//! authored data.
//!
//! ## Built-in Layout and Custom Profiles
//!
//! [`PayloadProfile::default`] carries the layout of the Bresser weather
//! station uplink. A different node can ship its own layout as a TOML file
//! (see [`PayloadProfile::load`]):
//!
//! ```toml
//! features = ["SENSORID_EN", "ADC_EN"]
//!
//! [[fields]]
//! key = "id"
//! condition = "SENSORID_EN"
//! type = "uint32"
//!
//! [[fields]]
//! key = "status"
//! type = "bitmap"
//! ```
//!
//! A field without a `condition` is always present. Duplicate keys are legal
//! as long as their conditions are mutually exclusive in practice; the
//! selection step rejects a configuration that activates both.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use decodegen::profile::PayloadProfile;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let profile = PayloadProfile::load("payload-profile.toml").await?;
//!     println!("{} fields, {} known flags", profile.fields.len(), profile.features.len());
//!     Ok(())
//! }
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

/// One potential output field of the uplink payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// JSON key the decoder emits for this field.
    pub key: String,
    /// Feature flag that must be defined for the encoder to pack this field;
    /// `None` means it is always packed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Name of the decode function the downstream decoder applies. Opaque to
    /// this tool.
    #[serde(rename = "type")]
    pub decode_type: String,
}

impl FieldDescriptor {
    /// Human-readable condition, `"always"` for unconditional fields.
    pub fn condition_label(&self) -> &str {
        self.condition.as_deref().unwrap_or("always")
    }
}

/// Profile validation failures.
#[derive(Debug, Error, PartialEq)]
pub enum ProfileError {
    #[error("field '{key}' is gated on '{feature}', which is not in the feature catalog")]
    UnknownCondition { key: String, feature: String },
    #[error("fields #{first} and #{second} both emit '{key}' under condition '{condition}'")]
    DuplicateField {
        key: String,
        condition: String,
        first: usize,
        second: usize,
    },
}

/// Feature catalog plus field descriptor table for one payload layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadProfile {
    /// Flag names the scanner recognizes. Anything else in the input is
    /// ignored. May list flags no field references.
    #[serde(default)]
    pub features: Vec<String>,
    /// Field descriptors in encoder packing order.
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl PayloadProfile {
    /// Membership test against the feature catalog.
    pub fn is_known_feature(&self, name: &str) -> bool {
        self.features.iter().any(|f| f == name)
    }

    /// Load a profile from a TOML file and validate it.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read profile {}: {}", path, e))?;

        let profile: PayloadProfile = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse profile {}: {}", path, e))?;

        profile
            .validate()
            .map_err(|e| anyhow!("Invalid profile {}: {}", path, e))?;

        Ok(profile)
    }

    /// Write the built-in layout as a TOML template file.
    pub async fn write_template(path: &str) -> Result<()> {
        let profile = PayloadProfile::default();
        let content = toml::to_string_pretty(&profile)
            .map_err(|e| anyhow!("Failed to serialize profile template: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write profile {}: {}", path, e))?;

        Ok(())
    }

    /// Check the table against the catalog.
    ///
    /// Rejects a condition naming a flag the catalog does not contain (such a
    /// field could never be activated by any input) and two fields that emit
    /// the same key under the same condition (guaranteed to collide whenever
    /// selected). Duplicate keys under *different* conditions pass: they are
    /// the authoring idiom for mutually exclusive firmware variants.
    pub fn validate(&self) -> Result<(), ProfileError> {
        for field in &self.fields {
            if let Some(feature) = &field.condition {
                if !self.is_known_feature(feature) {
                    return Err(ProfileError::UnknownCondition {
                        key: field.key.clone(),
                        feature: feature.clone(),
                    });
                }
            }
        }

        for (i, field) in self.fields.iter().enumerate() {
            for (j, other) in self.fields.iter().enumerate().skip(i + 1) {
                if field.key == other.key && field.condition == other.condition {
                    return Err(ProfileError::DuplicateField {
                        key: field.key.clone(),
                        condition: field.condition_label().to_string(),
                        first: i + 1,
                        second: j + 1,
                    });
                }
            }
        }

        Ok(())
    }

    /// Keys emitted by more than one descriptor, with the conditions
    /// involved, in table order.
    pub fn shared_keys(&self) -> Vec<(String, Vec<String>)> {
        let mut shared: Vec<(String, Vec<String>)> = Vec::new();
        for field in &self.fields {
            match shared.iter_mut().find(|(key, _)| key == &field.key) {
                Some((_, conditions)) => conditions.push(field.condition_label().to_string()),
                None => shared.push((
                    field.key.clone(),
                    vec![field.condition_label().to_string()],
                )),
            }
        }
        shared.retain(|(_, conditions)| conditions.len() > 1);
        shared
    }
}

fn field(key: &str, condition: Option<&str>, decode_type: &str) -> FieldDescriptor {
    FieldDescriptor {
        key: key.to_string(),
        condition: condition.map(|c| c.to_string()),
        decode_type: decode_type.to_string(),
    }
}

impl Default for PayloadProfile {
    fn default() -> Self {
        let features = [
            "SENSORID_EN",
            "ONEWIRE_EN",
            "SLEEP_EN",
            "THEENGSDECODER_EN",
            "RAINDATA_EN",
            "SOILSENSOR_EN",
            "MITHERMOMETER_EN",
            "DISTANCESENSOR_EN",
            "ADC_EN",
            "PIN_ADC_IN",
            "PIN_ADC0_IN",
            "PIN_ADC1_IN",
            "PIN_ADC2_IN",
            "PIN_ADC3_IN",
            "LIGHTNINGSENSOR_EN",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        // Table order must match the order the firmware encoder packs fields
        // into the uplink buffer.
        let fields = vec![
            field("id", Some("SENSORID_EN"), "uint32"),
            field("status_node", None, "bitmap"),
            field("status", None, "bitmap"),
            field("air_temp_c", None, "temperature"),
            field("humidity", None, "uint8"),
            field("wind_gust_meter_sec", None, "uint16fp1"),
            field("wind_avg_meter_sec", None, "uint16fp1"),
            field("wind_direction_deg", None, "uint16fp1"),
            field("rain_mm", None, "rawfloat"),
            field("supply_v", Some("ADC_EN"), "uint16"),
            field("battery_v", Some("PIN_ADC3_IN"), "uint16"),
            field("water_temp_c", Some("ONEWIRE_EN"), "temperature"),
            // THEENGSDECODER_EN and MITHERMOMETER_EN are alternative BLE
            // thermometer stacks; a real configuration enables at most one.
            field("indoor_temp_c", Some("THEENGSDECODER_EN"), "temperature"),
            field("indoor_humidity", Some("THEENGSDECODER_EN"), "uint8"),
            field("indoor_temp_c", Some("MITHERMOMETER_EN"), "temperature"),
            field("indoor_humidity", Some("MITHERMOMETER_EN"), "uint8"),
            field("soil_temp_c", Some("SOILSENSOR_EN"), "temperature"),
            field("soil_moisture", Some("SOILSENSOR_EN"), "uint8"),
            field("rain_hr", Some("RAINDATA_EN"), "rawfloat"),
            field("rain_day", Some("RAINDATA_EN"), "rawfloat"),
            field("rain_week", Some("RAINDATA_EN"), "rawfloat"),
            field("rain_mon", Some("RAINDATA_EN"), "rawfloat"),
            field("adc0_v", Some("PIN_ADC0_IN"), "uint16"),
            field("adc1_v", Some("PIN_ADC1_IN"), "uint16"),
            field("adc2_v", Some("PIN_ADC2_IN"), "uint16"),
            field("distance_mm", Some("DISTANCESENSOR_EN"), "uint16"),
            field("lightning_count", Some("LIGHTNINGSENSOR_EN"), "uint16"),
            field("lightning_distance_km", Some("LIGHTNINGSENSOR_EN"), "uint8"),
        ];

        PayloadProfile { features, fields }
    }
}
