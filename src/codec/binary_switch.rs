//! Binary Switch Command Class (0x25): Get/Set/Report.

use super::{expect_header, CommandClass, SwitchValue};
use crate::error::Result;

const CLASS: CommandClass = CommandClass::BinarySwitch;
pub(crate) const GET: u8 = 0x02;
pub(crate) const SET: u8 = 0x01;
pub(crate) const REPORT: u8 = 0x03;

pub fn encode_get() -> Vec<u8> {
    vec![CLASS.to_byte(), GET]
}

pub fn encode_set(value: SwitchValue) -> Vec<u8> {
    vec![CLASS.to_byte(), SET, value.get()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinarySwitchReport {
    pub value: SwitchValue,
}

pub fn parse_report(bytes: &[u8]) -> Result<BinarySwitchReport> {
    expect_header(bytes, CLASS, REPORT, 3)?;
    Ok(BinarySwitchReport {
        value: SwitchValue::new(bytes[2])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_1_switch_on() {
        let bytes = encode_set(SwitchValue::new(0xFF).unwrap());
        assert_eq!(bytes, vec![0x25, 0x01, 0xFF]);

        let bytes = encode_get();
        assert_eq!(bytes, vec![0x25, 0x02]);

        let report = parse_report(&[0x25, 0x03, 0xFF]).unwrap();
        assert_eq!(report.value, SwitchValue::new(0xFF).unwrap());
    }
}
