use decodegen::extract::{ActiveFeatures, DefineScanner};
use decodegen::profile::{FieldDescriptor, PayloadProfile};
use decodegen::render::{decoder_call, render, select_fields};

fn field(key: &str, condition: Option<&str>, decode_type: &str) -> FieldDescriptor {
    FieldDescriptor {
        key: key.to_string(),
        condition: condition.map(|c| c.to_string()),
        decode_type: decode_type.to_string(),
    }
}

#[test]
fn six_field_station_renders_expected_call() {
    let profile = PayloadProfile {
        features: vec![
            "SENSORID_EN".into(),
            "ADC_EN".into(),
            "RAINDATA_EN".into(),
        ],
        fields: vec![
            field("id", Some("SENSORID_EN"), "uint32"),
            field("status_node", None, "bitmap"),
            field("status", None, "bitmap"),
            field("air_temp_c", None, "temperature"),
            field("supply_v", Some("ADC_EN"), "uint16"),
            field("rain_hr", Some("RAINDATA_EN"), "rawfloat"),
        ],
    };

    let mut scanner = DefineScanner::new(&profile);
    scanner.scan_lines([
        "#define SENSORID_EN",
        "#define ADC_EN",
        "#define RAINDATA_EN",
    ]);
    let active = scanner.finish();

    let expected = r#"return decode(
    bytes,
    [
        uint32,
        bitmap,
        bitmap,
        temperature,
        uint16,
        rawfloat,
    ],
    [
        id,
        status_node,
        status,
        air_temp_c,
        supply_v,
        rain_hr,
    ],
);"#;
    assert_eq!(render(&profile, &active).expect("render"), expected);
}

#[test]
fn empty_input_renders_unconditional_fields() {
    let profile = PayloadProfile::default();
    let mut scanner = DefineScanner::new(&profile);
    scanner.scan_lines("".lines());
    let active = scanner.finish();

    let expected = r#"return decode(
    bytes,
    [
        bitmap,
        bitmap,
        temperature,
        uint8,
        uint16fp1,
        uint16fp1,
        uint16fp1,
        rawfloat,
    ],
    [
        status_node,
        status,
        air_temp_c,
        humidity,
        wind_gust_meter_sec,
        wind_avg_meter_sec,
        wind_direction_deg,
        rain_mm,
    ],
);"#;
    assert_eq!(render(&profile, &active).expect("render"), expected);
}

#[test]
fn builtin_dump_pipeline_end_to_end() {
    let dump = "\
#define __GNUC__ 12
#define SENSORID_EN
#define ADC_EN
#define PIN_ADC_IN A0
#define RAINDATA_EN
#define SLEEP_INTERVAL 360
";
    let profile = PayloadProfile::default();
    let mut scanner = DefineScanner::new(&profile);
    scanner.scan_lines(dump.lines());
    let active = scanner.finish();

    let expected = r#"return decode(
    bytes,
    [
        uint32,
        bitmap,
        bitmap,
        temperature,
        uint8,
        uint16fp1,
        uint16fp1,
        uint16fp1,
        rawfloat,
        uint16,
        rawfloat,
        rawfloat,
        rawfloat,
        rawfloat,
    ],
    [
        id,
        status_node,
        status,
        air_temp_c,
        humidity,
        wind_gust_meter_sec,
        wind_avg_meter_sec,
        wind_direction_deg,
        rain_mm,
        supply_v,
        rain_hr,
        rain_day,
        rain_week,
        rain_mon,
    ],
);"#;
    assert_eq!(render(&profile, &active).expect("render"), expected);
}

#[test]
fn fragment_line_count_tracks_selection() {
    let profile = PayloadProfile::default();
    let active = ActiveFeatures::from_names(["ONEWIRE_EN", "SOILSENSOR_EN"]);
    let selected = select_fields(&profile, &active).expect("selection");
    let fragment = decoder_call(&selected);
    // Seven boilerplate lines plus one type line and one key line per field.
    assert_eq!(fragment.lines().count(), 7 + 2 * selected.len());
    assert!(fragment.ends_with(");"));
}
