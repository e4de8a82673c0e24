//! Meter Command Class (0x32): Get/SupportedGet/Reset/Report/SupportedReport (§4.D "Meter
//! reports").
//!
//! Properties are packed manually (rather than with `modular_bitfield`) to mirror the original
//! library's own manual mask-and-shift style for this command class (`znet_cmd_configuration.c`
//! does the same for Configuration, the closest sibling in the original source).

use super::{expect_header, CommandClass};
use crate::error::{Result, ZnetError};

const CLASS: CommandClass = CommandClass::Meter;
pub(crate) const GET: u8 = 0x01;
pub(crate) const REPORT: u8 = 0x02;
pub(crate) const SUPPORTED_GET: u8 = 0x03;
pub(crate) const SUPPORTED_REPORT: u8 = 0x04;
pub(crate) const RESET: u8 = 0x05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterType {
    Electric,
    Gas,
    Water,
}

impl MeterType {
    fn from_bits(b: u8) -> Result<Self> {
        Ok(match b {
            1 => MeterType::Electric,
            2 => MeterType::Gas,
            3 => MeterType::Water,
            other => return Err(ZnetError::RadioError(other)),
        })
    }

    fn to_bits(self) -> u8 {
        match self {
            MeterType::Electric => 1,
            MeterType::Gas => 2,
            MeterType::Water => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateType {
    Unspecified,
    Import,
    Export,
}

impl RateType {
    fn from_bits(b: u8) -> Self {
        match b {
            1 => RateType::Import,
            2 => RateType::Export,
            _ => RateType::Unspecified,
        }
    }

    fn to_bits(self) -> u8 {
        match self {
            RateType::Unspecified => 0,
            RateType::Import => 1,
            RateType::Export => 2,
        }
    }
}

fn size_from_code(code: u8) -> Result<usize> {
    match code {
        0 => Ok(1),
        1 => Ok(2),
        2 => Ok(4),
        other => Err(ZnetError::InvalidConfigSize(other)),
    }
}

fn size_to_code(size: usize) -> Result<u8> {
    match size {
        1 => Ok(0),
        2 => Ok(1),
        4 => Ok(2),
        other => Err(ZnetError::InvalidConfigSize(other as u8)),
    }
}

fn decode_value(bytes: &[u8]) -> i32 {
    let mut acc: i32 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
    for &b in bytes {
        acc = (acc << 8) | b as i32;
    }
    acc
}

fn encode_value(value: i32, size: usize) -> Vec<u8> {
    let full = value.to_be_bytes();
    full[4 - size..].to_vec()
}

pub fn encode_get(scale: Option<u8>) -> Vec<u8> {
    match scale {
        None => vec![CLASS.to_byte(), GET],
        Some(scale) => vec![CLASS.to_byte(), GET, scale << 3],
    }
}

pub fn encode_supported_get() -> Vec<u8> {
    vec![CLASS.to_byte(), SUPPORTED_GET]
}

pub fn encode_reset() -> Vec<u8> {
    vec![CLASS.to_byte(), RESET]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterReport {
    pub meter_type: MeterType,
    pub rate_type: RateType,
    pub scale: u8,
    pub precision: u8,
    pub value: i32,
    pub delta_time_secs: u16,
    pub previous_value: Option<i32>,
}

pub fn parse_report(bytes: &[u8]) -> Result<MeterReport> {
    expect_header(bytes, CLASS, REPORT, 6)?;

    let meter_type_byte = bytes[2];
    let meter_type = MeterType::from_bits(meter_type_byte & 0x1F)?;
    let rate_type = RateType::from_bits((meter_type_byte >> 5) & 0x03);

    let properties1 = bytes[3];
    let size = size_from_code(properties1 & 0x03)?;
    let scale = (properties1 >> 2) & 0x07;
    let precision = (properties1 >> 5) & 0x07;

    let need = 4 + size + 2;
    if bytes.len() < need {
        return Err(ZnetError::ShortFrame {
            have: bytes.len(),
            need,
        });
    }
    let value = decode_value(&bytes[4..4 + size]);
    let delta_time_secs = u16::from_be_bytes([bytes[4 + size], bytes[5 + size]]);

    let previous_value = if bytes.len() >= need + size {
        Some(decode_value(&bytes[need..need + size]))
    } else {
        None
    };

    Ok(MeterReport {
        meter_type,
        rate_type,
        scale,
        precision,
        value,
        delta_time_secs,
        previous_value,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterSupportedReport {
    pub meter_type: MeterType,
    pub can_reset: bool,
    pub supported_scales: u8,
}

pub fn parse_supported_report(bytes: &[u8]) -> Result<MeterSupportedReport> {
    expect_header(bytes, CLASS, SUPPORTED_REPORT, 4)?;
    let meter_type_byte = bytes[2];
    Ok(MeterSupportedReport {
        meter_type: MeterType::from_bits(meter_type_byte & 0x1F)?,
        can_reset: meter_type_byte & 0x80 != 0,
        supported_scales: bytes[3],
    })
}

/// Round-trips a report back into wire bytes; exercised by the round-trip property in §8.
pub fn encode_report(report: &MeterReport) -> Result<Vec<u8>> {
    let fits = |v: i32, size: usize| -> bool {
        match size {
            1 => (i8::MIN as i32..=i8::MAX as i32).contains(&v),
            2 => (i16::MIN as i32..=i16::MAX as i32).contains(&v),
            _ => true,
        }
    };
    let mut size = 1usize;
    for candidate in [1usize, 2, 4] {
        if fits(report.value, candidate) && report.previous_value.is_none_or(|p| fits(p, candidate)) {
            size = candidate;
            break;
        }
        size = 4;
    }
    let size_code = size_to_code(size)?;

    let mut out = vec![CLASS.to_byte(), REPORT];
    out.push(report.meter_type.to_bits() | (report.rate_type.to_bits() << 5));
    out.push(size_code | (report.scale << 2) | (report.precision << 5));
    out.extend(encode_value(report.value, size));
    out.extend(report.delta_time_secs.to_be_bytes());
    if let Some(prev) = report.previous_value {
        out.extend(encode_value(prev, size));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_round_trip() {
        let report = MeterReport {
            meter_type: MeterType::Electric,
            rate_type: RateType::Import,
            scale: 0,
            precision: 2,
            value: 1234,
            delta_time_secs: 60,
            previous_value: Some(1200),
        };
        let bytes = encode_report(&report).unwrap();
        let decoded = parse_report(&bytes).unwrap();
        assert_eq!(decoded, report);
    }

    #[test]
    fn supported_report_parses_reset_flag() {
        let report = parse_supported_report(&[0x32, 0x04, 0x01 | 0x80, 0b0000_1111]).unwrap();
        assert!(report.can_reset);
        assert_eq!(report.meter_type, MeterType::Electric);
        assert_eq!(report.supported_scales, 0b1111);
    }
}
