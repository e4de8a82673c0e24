//! Multilevel Switch Command Class (0x26): Get/Set/StartChange/StopChange/Report.

use modular_bitfield::prelude::*;

use super::{expect_header, CommandClass, SwitchValue};
use crate::error::Result;

const CLASS: CommandClass = CommandClass::MultilevelSwitch;
pub(crate) const SET: u8 = 0x01;
pub(crate) const GET: u8 = 0x02;
pub(crate) const REPORT: u8 = 0x03;
pub(crate) const START_CHANGE: u8 = 0x04;
pub(crate) const STOP_CHANGE: u8 = 0x05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Specifier)]
#[bits = 1]
pub enum Direction {
    Up = 0,
    Down = 1,
}

/// Properties1 byte of the Start Level Change frame.
#[bitfield]
#[derive(Debug, Clone, Copy)]
pub struct StartChangeProperties {
    pub rfu: B5,
    pub ignore_start_level: bool,
    #[bits = 1]
    pub direction: Direction,
    pub rfu2: B1,
}

pub fn encode_get() -> Vec<u8> {
    vec![CLASS.to_byte(), GET]
}

pub fn encode_set(value: SwitchValue) -> Vec<u8> {
    vec![CLASS.to_byte(), SET, value.get()]
}

/// `start_level` is ignored (and omitted from the wire frame) when `ignore_start_level` is set.
pub fn encode_start_change(direction: Direction, ignore_start_level: bool, start_level: u8) -> Vec<u8> {
    let props = StartChangeProperties::new()
        .with_direction(direction)
        .with_ignore_start_level(ignore_start_level);
    vec![CLASS.to_byte(), START_CHANGE, props.into_bytes()[0], start_level]
}

pub fn encode_stop_change() -> Vec<u8> {
    vec![CLASS.to_byte(), STOP_CHANGE]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultilevelSwitchReport {
    pub value: SwitchValue,
}

pub fn parse_report(bytes: &[u8]) -> Result<MultilevelSwitchReport> {
    expect_header(bytes, CLASS, REPORT, 3)?;
    Ok(MultilevelSwitchReport {
        value: SwitchValue::new(bytes[2])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_change_encodes_direction_and_level() {
        let bytes = encode_start_change(Direction::Up, false, 0x20);
        assert_eq!(bytes[0], 0x26);
        assert_eq!(bytes[1], 0x04);
        assert_eq!(bytes[3], 0x20);

        let props = StartChangeProperties::from_bytes([bytes[2]]);
        assert_eq!(props.direction(), Direction::Up);
        assert!(!props.ignore_start_level());
    }

    #[test]
    fn stop_change_has_no_payload() {
        assert_eq!(encode_stop_change(), vec![0x26, 0x05]);
    }

    #[test]
    fn report_round_trips() {
        let report = parse_report(&[0x26, 0x03, 0x50]).unwrap();
        assert_eq!(report.value.get(), 0x50);
    }
}
