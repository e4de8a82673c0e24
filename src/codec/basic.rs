//! Basic Command Class (0x20): Get/Set/Report.

use super::{expect_header, CommandClass, SwitchValue};
use crate::error::Result;

const CLASS: CommandClass = CommandClass::Basic;
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
pub struct BasicReport {
    pub value: SwitchValue,
}

pub fn parse_report(bytes: &[u8]) -> Result<BasicReport> {
    expect_header(bytes, CLASS, REPORT, 3)?;
    Ok(BasicReport {
        value: SwitchValue::new(bytes[2])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_on_scenario() {
        // Scenario 1: binary_switch_set begins `0x25 0x01 0xFF`; basic shares the same shape.
        let bytes = encode_set(SwitchValue::new(0xFF).unwrap());
        assert_eq!(bytes, vec![0x20, 0x01, 0xFF]);

        let report = parse_report(&[0x20, 0x03, 0xFF]).unwrap();
        assert_eq!(report.value, SwitchValue::new(0xFF).unwrap());
    }

    #[test]
    fn short_report_is_rejected() {
        assert!(parse_report(&[0x20, 0x03]).is_err());
    }
}
