//! Unit metadata validation
//!
//! Metadata named `unit`, `unitText` or `unitCode` (case-insensitive) must
//! reference a recognised UN/CEFACT unit. The value is normalised to the
//! canonical representation for each name.

use serde_json::{json, Value};
use tracing::debug;

use crate::error::{NgsiError, NgsiResult};
use crate::vocabulary::{AttributeType, DataType};

/// A UN/CEFACT common code unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unit {
    pub code: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
}

/// Recognised units
pub const UNITS: &[Unit] = &[
    Unit { code: "CEL", name: "degree Celsius", symbol: "°C" },
    Unit { code: "FAH", name: "degree Fahrenheit", symbol: "°F" },
    Unit { code: "KEL", name: "kelvin", symbol: "K" },
    Unit { code: "P1", name: "percent", symbol: "%" },
    Unit { code: "MTR", name: "metre", symbol: "m" },
    Unit { code: "CMT", name: "centimetre", symbol: "cm" },
    Unit { code: "MMT", name: "millimetre", symbol: "mm" },
    Unit { code: "KMT", name: "kilometre", symbol: "km" },
    Unit { code: "MTK", name: "square metre", symbol: "m²" },
    Unit { code: "MTQ", name: "cubic metre", symbol: "m³" },
    Unit { code: "LTR", name: "litre", symbol: "l" },
    Unit { code: "GRM", name: "gram", symbol: "g" },
    Unit { code: "KGM", name: "kilogram", symbol: "kg" },
    Unit { code: "SEC", name: "second", symbol: "s" },
    Unit { code: "MIN", name: "minute", symbol: "min" },
    Unit { code: "HUR", name: "hour", symbol: "h" },
    Unit { code: "MTS", name: "metre per second", symbol: "m/s" },
    Unit { code: "KMH", name: "kilometre per hour", symbol: "km/h" },
    Unit { code: "PAL", name: "pascal", symbol: "Pa" },
    Unit { code: "HPA", name: "hectopascal", symbol: "hPa" },
    Unit { code: "BAR", name: "bar", symbol: "bar" },
    Unit { code: "WTT", name: "watt", symbol: "W" },
    Unit { code: "KWT", name: "kilowatt", symbol: "kW" },
    Unit { code: "KWH", name: "kilowatt hour", symbol: "kW·h" },
    Unit { code: "JOU", name: "joule", symbol: "J" },
    Unit { code: "AMP", name: "ampere", symbol: "A" },
    Unit { code: "VLT", name: "volt", symbol: "V" },
    Unit { code: "OHM", name: "ohm", symbol: "Ω" },
    Unit { code: "HTZ", name: "hertz", symbol: "Hz" },
    Unit { code: "LUX", name: "lux", symbol: "lx" },
    Unit { code: "59", name: "part per million", symbol: "ppm" },
];

/// Find a unit by its common code (case-insensitive)
pub fn find_by_code(code: &str) -> Option<&'static Unit> {
    UNITS.iter().find(|u| u.code.eq_ignore_ascii_case(code.trim()))
}

/// Find a unit by its name or symbol (case-insensitive)
pub fn find_by_name(name: &str) -> Option<&'static Unit> {
    let name = name.trim();
    UNITS
        .iter()
        .find(|u| u.name.eq_ignore_ascii_case(name) || u.symbol == name)
}

/// Whether a metadata name triggers unit validation
pub fn is_unit_metadata(name: &str) -> bool {
    matches!(
        name.to_lowercase().as_str(),
        "unit" | "unittext" | "unitcode"
    )
}

/// Validate and normalise a unit metadata record
///
/// Returns the (possibly defaulted) type and normalised value.
pub fn validate_unit_data(
    name: &str,
    metadata_type: Option<AttributeType>,
    value: &Value,
) -> NgsiResult<(Option<AttributeType>, Value)> {
    let key = name.to_lowercase();
    let text = || metadata_type.clone().or(Some(DataType::Text.into()));

    match key.as_str() {
        "unitcode" => {
            let unit = value
                .as_str()
                .and_then(find_by_code)
                .ok_or_else(|| unknown_unit(name, value))?;
            debug!(code = unit.code, "normalised unitCode metadata");
            Ok((text(), Value::String(unit.code.to_string())))
        }
        "unittext" => {
            let unit = value
                .as_str()
                .and_then(find_by_name)
                .ok_or_else(|| unknown_unit(name, value))?;
            Ok((text(), Value::String(unit.name.to_string())))
        }
        "unit" => {
            let unit = resolve_unit(value).ok_or_else(|| unknown_unit(name, value))?;
            let unit_type = metadata_type.or_else(|| AttributeType::parse("Unit").ok());
            Ok((
                unit_type,
                json!({ "code": unit.code, "name": unit.name, "symbol": unit.symbol }),
            ))
        }
        _ => Ok((metadata_type, value.clone())),
    }
}

fn resolve_unit(value: &Value) -> Option<&'static Unit> {
    match value {
        Value::String(s) => find_by_code(s).or_else(|| find_by_name(s)),
        Value::Object(map) => {
            let by_code = map.get("code").and_then(Value::as_str).and_then(find_by_code);
            by_code.or_else(|| map.get("name").and_then(Value::as_str).and_then(find_by_name))
        }
        _ => None,
    }
}

fn unknown_unit(name: &str, value: &Value) -> NgsiError {
    NgsiError::validation(name, format!("unknown unit {}", value))
}
