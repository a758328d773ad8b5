use serde::{Deserialize, Serialize};

/// A point's value: booleans for digital points, finite `f64` for analog
/// ones. Design Note 9 of the spec calls this out explicitly as a tagged
/// variant carried through every read/write path.
///
/// Serializes untagged (bare `true`/`false`/number), matching the wire
/// shape in the configuration schema and change events.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Digital(bool),
    Analog(f64),
}

impl Value {
    pub fn as_digital(self) -> Option<bool> {
        match self {
            Value::Digital(b) => Some(b),
            Value::Analog(_) => None,
        }
    }

    pub fn as_analog(self) -> Option<f64> {
        match self {
            Value::Digital(_) => None,
            Value::Analog(f) => Some(f),
        }
    }

    /// Default value used to seed a point with no initial reading:
    /// `false` for digital, `0.0` for analog (spec §4.5).
    pub fn default_for(io_type: crate::IoType) -> Self {
        if io_type.is_digital() {
            Value::Digital(false)
        } else {
            Value::Analog(0.0)
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Digital(a), Value::Digital(b)) => a == b,
            (Value::Analog(a), Value::Analog(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digital_and_analog_never_compare_equal() {
        assert_ne!(Value::Digital(true), Value::Analog(1.0));
    }

    #[test]
    fn untagged_serialization_is_bare() {
        assert_eq!(serde_json::to_string(&Value::Digital(true)).unwrap(), "true");
        assert_eq!(serde_json::to_string(&Value::Analog(1.5)).unwrap(), "1.5");
    }

    #[test]
    fn default_for_matches_io_type() {
        assert_eq!(
            Value::default_for(crate::IoType::DigitalInput),
            Value::Digital(false)
        );
        assert_eq!(
            Value::default_for(crate::IoType::AnalogOutput),
            Value::Analog(0.0)
        );
    }
}
