//! Manufacturer Specific Command Class (0x72): Get/Report and DeviceSpecificGet/Report.

use super::{expect_header, CommandClass};
use crate::error::{Result, ZnetError};

const CLASS: CommandClass = CommandClass::ManufacturerSpecific;
pub(crate) const GET: u8 = 0x04;
pub(crate) const REPORT: u8 = 0x05;
pub(crate) const DEVICE_SPECIFIC_GET: u8 = 0x06;
pub(crate) const DEVICE_SPECIFIC_REPORT: u8 = 0x07;

pub fn encode_get() -> Vec<u8> {
    vec![CLASS.to_byte(), GET]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManufacturerSpecificReport {
    pub manufacturer_id: u16,
    pub product_type_id: u16,
    pub product_id: u16,
}

pub fn parse_report(bytes: &[u8]) -> Result<ManufacturerSpecificReport> {
    expect_header(bytes, CLASS, REPORT, 8)?;
    Ok(ManufacturerSpecificReport {
        manufacturer_id: u16::from_be_bytes([bytes[2], bytes[3]]),
        product_type_id: u16::from_be_bytes([bytes[4], bytes[5]]),
        product_id: u16::from_be_bytes([bytes[6], bytes[7]]),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceIdType {
    FactoryDefault,
    SerialNumber,
    PseudoRandom,
}

impl DeviceIdType {
    fn from_bits(b: u8) -> Result<Self> {
        Ok(match b {
            0 => DeviceIdType::FactoryDefault,
            1 => DeviceIdType::SerialNumber,
            2 => DeviceIdType::PseudoRandom,
            other => return Err(ZnetError::RadioError(other)),
        })
    }
}

pub fn encode_device_specific_get(id_type: DeviceIdType) -> Vec<u8> {
    let bits = match id_type {
        DeviceIdType::FactoryDefault => 0,
        DeviceIdType::SerialNumber => 1,
        DeviceIdType::PseudoRandom => 2,
    };
    vec![CLASS.to_byte(), DEVICE_SPECIFIC_GET, bits]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpecificReport {
    pub id_type: DeviceIdType,
    pub device_id: Vec<u8>,
}

pub fn parse_device_specific_report(bytes: &[u8]) -> Result<DeviceSpecificReport> {
    expect_header(bytes, CLASS, DEVICE_SPECIFIC_REPORT, 4)?;
    let id_type = DeviceIdType::from_bits(bytes[2] & 0x07)?;
    let data_len = (bytes[3] & 0x1F) as usize;
    let need = 4 + data_len;
    if bytes.len() < need {
        return Err(ZnetError::ShortFrame {
            have: bytes.len(),
            need,
        });
    }
    Ok(DeviceSpecificReport {
        id_type,
        device_id: bytes[4..need].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_parses_three_u16_ids() {
        let report = parse_report(&[0x72, REPORT, 0, 1, 0, 2, 0, 3]).unwrap();
        assert_eq!(report.manufacturer_id, 1);
        assert_eq!(report.product_type_id, 2);
        assert_eq!(report.product_id, 3);
    }

    #[test]
    fn device_specific_report_parses_variable_length_id() {
        let report =
            parse_device_specific_report(&[0x72, DEVICE_SPECIFIC_REPORT, 1, 0x03, 9, 8, 7])
                .unwrap();
        assert_eq!(report.id_type, DeviceIdType::SerialNumber);
        assert_eq!(report.device_id, vec![9, 8, 7]);
    }

    #[test]
    fn device_specific_report_with_no_data_length_byte_is_rejected_not_indexed() {
        let err = parse_device_specific_report(&[0x72, DEVICE_SPECIFIC_REPORT, 1]).unwrap_err();
        assert_eq!(err, ZnetError::ShortFrame { have: 3, need: 4 });
    }
}
