//! Configuration Command Class (0x70): Get/Set/BulkGet/BulkSet/NameGet/InfoGet/PropertiesGet/
//! DefaultReset (§4.D "Configuration parameter sizes").
//!
//! Directly grounded on `znet_cc_configuration_report`/`znet_cc_configuration_bulk_report` in the
//! original `znet_cmd_configuration.c`: legal sizes are `1`, `2`, `4`; `0` means "no value" and `3`
//! is explicitly illegal, and the size lives in the low 3 bits of a properties byte.

use modular_bitfield::prelude::*;

use super::{expect_header, CommandClass};
use crate::error::{Result, ZnetError};

const CLASS: CommandClass = CommandClass::Configuration;
pub(crate) const DEFAULT_RESET: u8 = 0x01;
pub(crate) const SET: u8 = 0x04;
pub(crate) const GET: u8 = 0x05;
pub(crate) const REPORT: u8 = 0x06;
pub(crate) const BULK_SET: u8 = 0x07;
pub(crate) const BULK_GET: u8 = 0x08;
pub(crate) const BULK_REPORT: u8 = 0x09;
pub(crate) const NAME_GET: u8 = 0x0A;
pub(crate) const NAME_REPORT: u8 = 0x0B;
pub(crate) const INFO_GET: u8 = 0x0C;
pub(crate) const INFO_REPORT: u8 = 0x0D;
pub(crate) const PROPERTIES_GET: u8 = 0x0E;
pub(crate) const PROPERTIES_REPORT: u8 = 0x0F;

/// "`CONFIGURATION_SET_LEVEL_SIZE_MASK`": only bit patterns `1`, `2`, `4` are legal; `0` means "no
/// value present" and `3` is explicitly illegal.
pub fn validate_size(size: u8) -> Result<usize> {
    match size {
        1 | 2 | 4 => Ok(size as usize),
        other => Err(ZnetError::InvalidConfigSize(other)),
    }
}

#[bitfield]
#[derive(Debug, Clone, Copy)]
pub struct SetProperties {
    pub size: B3,
    pub rfu: B4,
    pub set_to_default: bool,
}

fn decode_be(bytes: &[u8]) -> i32 {
    let mut acc: i32 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
    for &b in bytes {
        acc = (acc << 8) | b as i32;
    }
    acc
}

fn encode_be(value: i32, size: usize) -> Vec<u8> {
    value.to_be_bytes()[4 - size..].to_vec()
}

pub fn encode_default_reset() -> Vec<u8> {
    vec![CLASS.to_byte(), DEFAULT_RESET]
}

pub fn encode_get(param: u8) -> Vec<u8> {
    vec![CLASS.to_byte(), GET, param]
}

/// `size` is ignored (and `0x00` is sent as the properties byte) when `set_to_default` is true.
pub fn encode_set(param: u8, size: u8, set_to_default: bool, value: i32) -> Result<Vec<u8>> {
    let mut out = vec![CLASS.to_byte(), SET, param];
    if set_to_default {
        out.push(
            SetProperties::new()
                .with_set_to_default(true)
                .into_bytes()[0],
        );
        return Ok(out);
    }
    let size_usize = validate_size(size)?;
    out.push(SetProperties::new().with_size(size).into_bytes()[0]);
    out.extend(encode_be(value, size_usize));
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigurationReport {
    pub param: u8,
    pub size: usize,
    pub value: i32,
}

pub fn parse_report(bytes: &[u8]) -> Result<ConfigurationReport> {
    expect_header(bytes, CLASS, REPORT, 4)?;
    let size = validate_size(bytes[3] & 0x07)?;
    let need = 4 + size;
    if bytes.len() < need {
        return Err(ZnetError::ShortFrame {
            have: bytes.len(),
            need,
        });
    }
    Ok(ConfigurationReport {
        param: bytes[2],
        size,
        value: decode_be(&bytes[4..need]),
    })
}

pub fn encode_bulk_get(param_offset: u16, count: u8) -> Vec<u8> {
    let offset = param_offset.to_be_bytes();
    vec![CLASS.to_byte(), BULK_GET, offset[0], offset[1], count]
}

pub fn encode_bulk_set(
    param_offset: u16,
    size: u8,
    set_to_default: bool,
    need_report: bool,
    values: &[i32],
) -> Result<Vec<u8>> {
    let offset = param_offset.to_be_bytes();
    let mut out = vec![
        CLASS.to_byte(),
        BULK_SET,
        offset[0],
        offset[1],
        values.len() as u8,
    ];
    let props = SetProperties::new()
        .with_size(if set_to_default { 0 } else { size })
        .with_set_to_default(set_to_default);
    let mut byte = props.into_bytes()[0];
    if need_report {
        byte |= 0x40;
    }
    out.push(byte);
    if !set_to_default {
        let size_usize = validate_size(size)?;
        for &v in values {
            out.extend(encode_be(v, size_usize));
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkReport {
    pub param_offset: u16,
    pub reports_to_follow: u8,
    pub size: usize,
    pub values: Vec<i32>,
}

pub fn parse_bulk_report(bytes: &[u8]) -> Result<BulkReport> {
    expect_header(bytes, CLASS, BULK_REPORT, 7)?;
    let param_offset = u16::from_be_bytes([bytes[2], bytes[3]]);
    let count = bytes[4] as usize;
    let reports_to_follow = bytes[5];
    let size = validate_size(bytes[6] & 0x07)?;

    let need = 7 + count * size;
    if bytes.len() < need {
        return Err(ZnetError::ShortFrame {
            have: bytes.len(),
            need,
        });
    }
    let values = bytes[7..need]
        .chunks_exact(size)
        .map(decode_be)
        .collect();

    Ok(BulkReport {
        param_offset,
        reports_to_follow,
        size,
        values,
    })
}

pub fn encode_name_get(param: u16) -> Vec<u8> {
    let p = param.to_be_bytes();
    vec![CLASS.to_byte(), NAME_GET, p[0], p[1]]
}

/// One segment of a multi-part Name Report (§4.D "Multi-part reports", scenario 4 in §8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameSegment {
    pub param: u16,
    pub reports_to_follow: u8,
    pub name: Vec<u8>,
}

pub fn parse_name_report(bytes: &[u8]) -> Result<NameSegment> {
    expect_header(bytes, CLASS, NAME_REPORT, 5)?;
    Ok(NameSegment {
        param: u16::from_be_bytes([bytes[2], bytes[3]]),
        reports_to_follow: bytes[4],
        name: bytes[5..].to_vec(),
    })
}

pub fn encode_info_get(param: u16) -> Vec<u8> {
    let p = param.to_be_bytes();
    vec![CLASS.to_byte(), INFO_GET, p[0], p[1]]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoSegment {
    pub param: u16,
    pub reports_to_follow: u8,
    pub info: Vec<u8>,
}

pub fn parse_info_report(bytes: &[u8]) -> Result<InfoSegment> {
    expect_header(bytes, CLASS, INFO_REPORT, 5)?;
    Ok(InfoSegment {
        param: u16::from_be_bytes([bytes[2], bytes[3]]),
        reports_to_follow: bytes[4],
        info: bytes[5..].to_vec(),
    })
}

pub fn encode_properties_get(param: u16) -> Vec<u8> {
    let p = param.to_be_bytes();
    vec![CLASS.to_byte(), PROPERTIES_GET, p[0], p[1]]
}

#[bitfield]
#[derive(Debug, Clone, Copy)]
pub struct PropertiesFlags {
    pub size: B3,
    pub format: B3,
    pub read_only: bool,
    pub altering_capabilities: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertiesReport {
    pub param: u16,
    pub size: usize,
    pub format: u8,
    pub read_only: bool,
    pub altering_capabilities: bool,
    pub min_value: i32,
    pub max_value: i32,
    pub default_value: i32,
    pub next_param: u16,
}

pub fn parse_properties_report(bytes: &[u8]) -> Result<PropertiesReport> {
    expect_header(bytes, CLASS, PROPERTIES_REPORT, 5)?;
    let flags = PropertiesFlags::from_bytes([bytes[4]]);
    let size = validate_size(flags.size())?;

    let need = 5 + 3 * size + 2;
    if bytes.len() < need {
        return Err(ZnetError::ShortFrame {
            have: bytes.len(),
            need,
        });
    }

    let mut cursor = 5;
    let min_value = decode_be(&bytes[cursor..cursor + size]);
    cursor += size;
    let max_value = decode_be(&bytes[cursor..cursor + size]);
    cursor += size;
    let default_value = decode_be(&bytes[cursor..cursor + size]);
    cursor += size;
    let next_param = u16::from_be_bytes([bytes[cursor], bytes[cursor + 1]]);

    Ok(PropertiesReport {
        param: u16::from_be_bytes([bytes[2], bytes[3]]),
        size,
        format: flags.format(),
        read_only: flags.read_only(),
        altering_capabilities: flags.altering_capabilities(),
        min_value,
        max_value,
        default_value,
        next_param,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_3_illegal_size_is_rejected() {
        assert_eq!(
            encode_set(1, 3, false, 0),
            Err(ZnetError::InvalidConfigSize(3))
        );
    }

    #[test]
    fn report_matches_original_layout() {
        // cc_data = [0x70, REPORT, param=5, size=2, value_hi, value_lo]
        let report = parse_report(&[0x70, REPORT, 5, 2, 0x01, 0x02]).unwrap();
        assert_eq!(report.param, 5);
        assert_eq!(report.size, 2);
        assert_eq!(report.value, 0x0102);
    }

    #[test]
    fn set_round_trips_through_report_decoding() {
        let bytes = encode_set(7, 4, false, -5).unwrap();
        // Reuse the report decoder on the tail of a Set frame, since both share [param, props,
        // value...].
        let synthetic_report = [&[CLASS.to_byte(), REPORT][..], &bytes[2..]].concat();
        let report = parse_report(&synthetic_report).unwrap();
        assert_eq!(report.value, -5);
        assert_eq!(report.size, 4);
    }

    #[test]
    fn scenario_4_multi_part_name() {
        let first = parse_name_report(&[0x70, NAME_REPORT, 0, 7, 1, b'p', b'a', b'r']).unwrap();
        assert_eq!(first.reports_to_follow, 1);
        assert_eq!(first.name, b"par");

        let second = parse_name_report(&[0x70, NAME_REPORT, 0, 7, 0, b't', b'1']).unwrap();
        assert_eq!(second.reports_to_follow, 0);
        assert_eq!(second.name, b"t1");
    }

    #[test]
    fn bulk_report_round_trips() {
        let bytes = encode_bulk_set(10, 2, false, false, &[1, 2, 3]).unwrap();
        let synthetic = {
            let mut v = vec![CLASS.to_byte(), BULK_REPORT];
            v.extend_from_slice(&bytes[2..5]);
            v.push(0);
            v.extend_from_slice(&bytes[5..]);
            v
        };
        let report = parse_bulk_report(&synthetic).unwrap();
        assert_eq!(report.values, vec![1, 2, 3]);
        assert_eq!(report.param_offset, 10);
    }

    #[test]
    fn properties_report_parses_flags_and_bounds() {
        let mut bytes = vec![CLASS.to_byte(), PROPERTIES_REPORT, 0, 9];
        let flags = PropertiesFlags::new().with_size(1).with_read_only(true);
        bytes.push(flags.into_bytes()[0]);
        bytes.push(0); // min
        bytes.push(100); // max
        bytes.push(10); // default
        bytes.extend(10u16.to_be_bytes()); // next_param
        let report = parse_properties_report(&bytes).unwrap();
        assert!(report.read_only);
        assert_eq!(report.max_value, 100);
        assert_eq!(report.next_param, 10);
    }

    #[test]
    fn name_report_with_no_reports_to_follow_byte_is_rejected_not_indexed() {
        let err = parse_name_report(&[0x70, NAME_REPORT, 0, 7]).unwrap_err();
        assert_eq!(err, ZnetError::ShortFrame { have: 4, need: 5 });
    }

    #[test]
    fn info_report_with_no_reports_to_follow_byte_is_rejected_not_indexed() {
        let err = parse_info_report(&[0x70, INFO_REPORT, 0, 7]).unwrap_err();
        assert_eq!(err, ZnetError::ShortFrame { have: 4, need: 5 });
    }
}
