//! Wire format of the device link
//!
//! Inbound: one framed message per reading, comma-separated fields with
//! two-character prefixes — `G:` gas level, `H:` moisture code. Unrecognized
//! prefixes are ignored. Parsing is total: malformed device output must
//! never take the session down, so missing or garbled fields fall back to
//! documented defaults (gas `0`, moisture `-1`) instead of erroring.
//!
//! Outbound: plain ASCII commands, newline-terminated. The vocabulary is
//! the field unit's: `1` actuator on, `0` actuator off, `GET_DATA` request
//! a reading. No checksum, no escaping, in either direction.

use crate::types::MOISTURE_UNKNOWN;

/// One parsed sensor sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Gas level; `0` when the field was missing or garbled
    pub gas: i32,
    /// Moisture code; `-1` when the field was missing or garbled
    pub moisture: i32,
}

impl Sample {
    /// Apply the documented defaults to optionally-parsed fields
    pub fn from_fields(gas: Option<i32>, moisture: Option<i32>) -> Self {
        Self {
            gas: gas.unwrap_or(0),
            moisture: moisture.unwrap_or(MOISTURE_UNKNOWN),
        }
    }
}

/// Extract the raw gas and moisture fields from one framed message
///
/// `None` means the field was absent or failed integer parsing. When a
/// prefix repeats, the last occurrence wins, even if it fails to parse.
pub(crate) fn parse_fields(message: &str) -> (Option<i32>, Option<i32>) {
    let mut gas_field: Option<&str> = None;
    let mut moisture_field: Option<&str> = None;

    for part in message.split(',') {
        if let Some(rest) = part.strip_prefix("G:") {
            gas_field = Some(rest);
        } else if let Some(rest) = part.strip_prefix("H:") {
            moisture_field = Some(rest);
        }
    }

    (
        gas_field.and_then(|s| s.parse().ok()),
        moisture_field.and_then(|s| s.parse().ok()),
    )
}

/// Parse one framed message into a sample
///
/// Total over all inputs; never fails.
pub fn parse_sample(message: &str) -> Sample {
    let (gas, moisture) = parse_fields(message);
    Sample::from_fields(gas, moisture)
}

/// Commands the app sends to the field unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Switch the actuator on
    ActuatorOn,
    /// Switch the actuator off
    ActuatorOff,
    /// Ask the unit to take and report a reading
    RequestReading,
}

impl DeviceCommand {
    /// The command text, without the terminator
    pub fn as_wire(&self) -> &'static str {
        match self {
            DeviceCommand::ActuatorOn => "1",
            DeviceCommand::ActuatorOff => "0",
            DeviceCommand::RequestReading => "GET_DATA",
        }
    }

    /// The bytes written to the stream, newline-terminated
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = self.as_wire().as_bytes().to_vec();
        bytes.push(b'\n');
        bytes
    }
}

impl std::fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_message() {
        assert_eq!(
            parse_sample("G:450,H:0"),
            Sample {
                gas: 450,
                moisture: 0
            }
        );
        assert_eq!(
            parse_sample("G:12,H:1"),
            Sample {
                gas: 12,
                moisture: 1
            }
        );
    }

    #[test]
    fn test_field_order_does_not_matter() {
        assert_eq!(
            parse_sample("H:1,G:7"),
            Sample {
                gas: 7,
                moisture: 1
            }
        );
    }

    #[test]
    fn test_missing_fields_default() {
        assert_eq!(
            parse_sample("G:450"),
            Sample {
                gas: 450,
                moisture: MOISTURE_UNKNOWN
            }
        );
        assert_eq!(
            parse_sample("H:1"),
            Sample {
                gas: 0,
                moisture: 1
            }
        );
        assert_eq!(
            parse_sample(""),
            Sample {
                gas: 0,
                moisture: MOISTURE_UNKNOWN
            }
        );
    }

    #[test]
    fn test_garbled_fields_default() {
        assert_eq!(
            parse_sample("G:xyz,H:0"),
            Sample {
                gas: 0,
                moisture: 0
            }
        );
        assert_eq!(
            parse_sample("G:450,H:maybe"),
            Sample {
                gas: 450,
                moisture: MOISTURE_UNKNOWN
            }
        );
        assert_eq!(
            parse_sample("complete nonsense"),
            Sample {
                gas: 0,
                moisture: MOISTURE_UNKNOWN
            }
        );
    }

    #[test]
    fn test_unrecognized_prefixes_ignored() {
        assert_eq!(
            parse_sample("X:9,G:450,T:123,H:1"),
            Sample {
                gas: 450,
                moisture: 1
            }
        );
    }

    #[test]
    fn test_last_repeated_field_wins() {
        assert_eq!(parse_sample("G:1,G:2,H:0").gas, 2);
        // A later garbled occurrence still replaces the earlier value
        assert_eq!(parse_sample("G:1,G:oops,H:0").gas, 0);
    }

    #[test]
    fn test_negative_and_large_values_parse() {
        assert_eq!(parse_sample("G:-5,H:0").gas, -5);
        assert_eq!(parse_sample("G:2147483647,H:0").gas, i32::MAX);
        // Overflow fails integer parsing and falls back
        assert_eq!(parse_sample("G:2147483648,H:0").gas, 0);
    }

    #[test]
    fn test_prefix_match_is_case_sensitive() {
        assert_eq!(
            parse_sample("g:450,h:1"),
            Sample {
                gas: 0,
                moisture: MOISTURE_UNKNOWN
            }
        );
    }

    #[test]
    fn test_command_encoding() {
        assert_eq!(DeviceCommand::ActuatorOn.encode(), b"1\n");
        assert_eq!(DeviceCommand::ActuatorOff.encode(), b"0\n");
        assert_eq!(DeviceCommand::RequestReading.encode(), b"GET_DATA\n");
    }

    #[test]
    fn test_command_display() {
        assert_eq!(DeviceCommand::RequestReading.to_string(), "GET_DATA");
    }
}
