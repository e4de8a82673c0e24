//! Dispatch metadata table (§4.D "Codec dispatch table", §9 "Dispatch by command-class byte").
//!
//! Generalizes the "big switch on command-class byte" the original leans on into a static table of
//! `(class, command)` records carrying what the session layer needs to know about each operation:
//! whether it is a multi-part report and how long a session should wait before timing out. Built
//! once and checked for coverage by [`assert_every_class_covered`], which [`crate::Controller::init`]
//! calls so an incomplete table is a construction-time failure rather than a silent runtime gap.

use super::CommandClass;

/// One registered (class, command) pair and what the session table needs to know about it.
#[derive(Debug, Clone, Copy)]
pub struct DispatchEntry {
    pub class: CommandClass,
    pub command: u8,
    pub name: &'static str,
    pub multi_part: bool,
    pub timeout_ms: u64,
}

const DEFAULT_TIMEOUT_MS: u64 = 3_000;
const CONFIG_TIMEOUT_MS: u64 = 5_000;

macro_rules! entry {
    ($class:expr, $command:expr, $name:expr) => {
        DispatchEntry {
            class: $class,
            command: $command,
            name: $name,
            multi_part: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    };
    ($class:expr, $command:expr, $name:expr, multi_part) => {
        DispatchEntry {
            class: $class,
            command: $command,
            name: $name,
            multi_part: true,
            timeout_ms: CONFIG_TIMEOUT_MS,
        }
    };
}

/// The full registry. Order is insertion order; lookups are linear (the table is tiny and built
/// once, matching the teacher's small fixed-size `PARAMETERS` tables rather than a `HashMap`).
pub const TABLE: &[DispatchEntry] = &[
    entry!(CommandClass::Basic, 0x01, "basic.set"),
    entry!(CommandClass::Basic, 0x02, "basic.get"),
    entry!(CommandClass::BinarySwitch, 0x01, "binary_switch.set"),
    entry!(CommandClass::BinarySwitch, 0x02, "binary_switch.get"),
    entry!(CommandClass::MultilevelSwitch, 0x01, "multilevel_switch.set"),
    entry!(CommandClass::MultilevelSwitch, 0x02, "multilevel_switch.get"),
    entry!(CommandClass::MultilevelSwitch, 0x04, "multilevel_switch.start_change"),
    entry!(CommandClass::MultilevelSwitch, 0x05, "multilevel_switch.stop_change"),
    entry!(CommandClass::Meter, 0x01, "meter.get"),
    entry!(CommandClass::Meter, 0x03, "meter.supported_get"),
    entry!(CommandClass::Meter, 0x05, "meter.reset"),
    entry!(CommandClass::MultiChannel, 0x07, "multi_channel.endpoint_get"),
    entry!(CommandClass::MultiChannel, 0x09, "multi_channel.capability_get"),
    entry!(CommandClass::MultiChannel, 0x0B, "multi_channel.endpoint_find", multi_part),
    entry!(CommandClass::MultiChannel, 0x0E, "multi_channel.aggregated_members_get"),
    entry!(CommandClass::Configuration, 0x01, "configuration.default_reset"),
    entry!(CommandClass::Configuration, 0x04, "configuration.set"),
    entry!(CommandClass::Configuration, 0x05, "configuration.get"),
    entry!(CommandClass::Configuration, 0x07, "configuration.bulk_set"),
    entry!(CommandClass::Configuration, 0x08, "configuration.bulk_get", multi_part),
    entry!(CommandClass::Configuration, 0x0A, "configuration.name_get", multi_part),
    entry!(CommandClass::Configuration, 0x0C, "configuration.info_get", multi_part),
    entry!(CommandClass::Configuration, 0x0E, "configuration.properties_get"),
    entry!(CommandClass::Version, 0x11, "version.get"),
    entry!(CommandClass::Version, 0x13, "version.command_class_get"),
    entry!(CommandClass::Version, 0x15, "version.capabilities_get"),
    entry!(CommandClass::ManufacturerSpecific, 0x04, "manufacturer_specific.get"),
    entry!(CommandClass::ManufacturerSpecific, 0x06, "manufacturer_specific.device_specific_get"),
    entry!(CommandClass::ZWavePlusInfo, 0x01, "zwave_plus_info.get"),
];

/// Returns the timeout for a session issuing `(class, command)`, or the default if unregistered.
pub fn timeout_ms(class: CommandClass, command: u8) -> u64 {
    TABLE
        .iter()
        .find(|e| e.class == class && e.command == command)
        .map(|e| e.timeout_ms)
        .unwrap_or(DEFAULT_TIMEOUT_MS)
}

/// Returns whether `(class, command)` is a multi-part ("reports to follow") operation.
pub fn is_multi_part(class: CommandClass, command: u8) -> bool {
    TABLE
        .iter()
        .any(|e| e.class == class && e.command == command && e.multi_part)
}

/// Every `CommandClass` the codec supports must have at least one registered operation; called
/// from `Controller::init` so a gap in the table fails construction instead of silently dropping a
/// request at dispatch time.
pub fn assert_every_class_covered() {
    for class in [
        CommandClass::Basic,
        CommandClass::BinarySwitch,
        CommandClass::MultilevelSwitch,
        CommandClass::Meter,
        CommandClass::MultiChannel,
        CommandClass::Configuration,
        CommandClass::Version,
        CommandClass::ManufacturerSpecific,
        CommandClass::ZWavePlusInfo,
    ] {
        assert!(
            TABLE.iter().any(|e| e.class == class),
            "dispatch table has no entry for {class:?}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_command_class() {
        assert_every_class_covered();
    }

    #[test]
    fn multi_part_operations_get_the_longer_timeout() {
        assert!(is_multi_part(CommandClass::Configuration, 0x0A));
        assert_eq!(timeout_ms(CommandClass::Configuration, 0x0A), CONFIG_TIMEOUT_MS);
        assert!(!is_multi_part(CommandClass::Basic, 0x02));
    }

    #[test]
    fn unregistered_pair_falls_back_to_default_timeout() {
        assert_eq!(timeout_ms(CommandClass::Basic, 0xFF), DEFAULT_TIMEOUT_MS);
    }
}
