//! Multi Channel Command Class (0x60): encapsulation, EndpointGet/CapabilityGet/EndpointFind/
//! AggregatedMembersGet (§4.D "Encapsulation").

use modular_bitfield::prelude::*;

use super::{expect_header, CommandClass};
use crate::error::{Result, ZnetError};
use crate::ids::EndpointId;

const CLASS: CommandClass = CommandClass::MultiChannel;
pub(crate) const ENDPOINT_GET: u8 = 0x07;
pub(crate) const ENDPOINT_REPORT: u8 = 0x08;
pub(crate) const CAPABILITY_GET: u8 = 0x09;
pub(crate) const CAPABILITY_REPORT: u8 = 0x0A;
pub(crate) const ENDPOINT_FIND: u8 = 0x0B;
pub(crate) const ENDPOINT_FIND_REPORT: u8 = 0x0C;
pub(crate) const CMD_ENCAP: u8 = 0x0D;
pub(crate) const AGGREGATED_MEMBERS_GET: u8 = 0x0E;
pub(crate) const AGGREGATED_MEMBERS_REPORT: u8 = 0x0F;

/// Source/destination header byte carried by a Multi Channel Command Encapsulation frame.
#[bitfield]
#[derive(Debug, Clone, Copy)]
pub struct EndpointHeader {
    pub endpoint: B7,
    pub bit_address: bool,
}

fn endpoint_header_byte(endpoint: EndpointId, bit_address: bool) -> u8 {
    EndpointHeader::new()
        .with_endpoint(endpoint.get())
        .with_bit_address(bit_address)
        .into_bytes()[0]
}

/// Wrap `inner` (a complete command-class frame) in a Multi Channel encapsulation addressed to
/// `dst_endpoint`, with the host always presenting as the root endpoint (§4.D "Encapsulation").
pub fn encode_encapsulation(dst_endpoint: EndpointId, inner: &[u8]) -> Vec<u8> {
    let mut out = vec![
        CLASS.to_byte(),
        CMD_ENCAP,
        endpoint_header_byte(EndpointId::root(), false),
        endpoint_header_byte(dst_endpoint, false),
    ];
    out.extend_from_slice(inner);
    out
}

/// Unwrap an inbound encapsulated frame, returning `(source_endpoint, inner_frame_bytes)`.
pub fn decode_encapsulation(bytes: &[u8]) -> Result<(EndpointId, &[u8])> {
    expect_header(bytes, CLASS, CMD_ENCAP, 5)?;
    let src_header = EndpointHeader::from_bytes([bytes[2]]);
    let src_endpoint = EndpointId::new(src_header.endpoint())?;
    Ok((src_endpoint, &bytes[4..]))
}

pub fn encode_endpoint_get() -> Vec<u8> {
    vec![CLASS.to_byte(), ENDPOINT_GET]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointReport {
    pub dynamic: bool,
    pub identical_capabilities: bool,
    pub individual_endpoint_count: u8,
    pub aggregated_endpoint_count: u8,
}

pub fn parse_endpoint_report(bytes: &[u8]) -> Result<EndpointReport> {
    expect_header(bytes, CLASS, ENDPOINT_REPORT, 4)?;
    let properties1 = bytes[2];
    Ok(EndpointReport {
        dynamic: properties1 & 0x80 != 0,
        identical_capabilities: properties1 & 0x40 != 0,
        individual_endpoint_count: bytes[3] & 0x7F,
        aggregated_endpoint_count: if bytes.len() > 4 { bytes[4] & 0x7F } else { 0 },
    })
}

pub fn encode_capability_get(endpoint: EndpointId) -> Vec<u8> {
    vec![CLASS.to_byte(), CAPABILITY_GET, endpoint.get()]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityReport {
    pub endpoint: EndpointId,
    pub generic_class: u8,
    pub specific_class: u8,
    pub command_classes: Vec<u8>,
}

pub fn parse_capability_report(bytes: &[u8]) -> Result<CapabilityReport> {
    expect_header(bytes, CLASS, CAPABILITY_REPORT, 5)?;
    let header = EndpointHeader::from_bytes([bytes[2]]);
    Ok(CapabilityReport {
        endpoint: EndpointId::new(header.endpoint())?,
        generic_class: bytes[3],
        specific_class: bytes[4],
        command_classes: bytes[5..].to_vec(),
    })
}

pub fn encode_endpoint_find(generic_class: u8, specific_class: u8) -> Vec<u8> {
    vec![CLASS.to_byte(), ENDPOINT_FIND, generic_class, specific_class]
}

/// One segment of a (possibly multi-part) Endpoint Find Report (§4.D "Multi-part reports").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointFindReport {
    pub reports_to_follow: u8,
    pub generic_class: u8,
    pub specific_class: u8,
    pub endpoints: Vec<EndpointId>,
}

pub fn parse_endpoint_find_report(bytes: &[u8]) -> Result<EndpointFindReport> {
    expect_header(bytes, CLASS, ENDPOINT_FIND_REPORT, 5)?;
    let mut endpoints = Vec::with_capacity(bytes.len() - 5);
    for &b in &bytes[5..] {
        endpoints.push(EndpointId::new(b & 0x7F)?);
    }
    Ok(EndpointFindReport {
        reports_to_follow: bytes[2],
        generic_class: bytes[3],
        specific_class: bytes[4],
        endpoints,
    })
}

pub fn encode_aggregated_members_get(aggregated_endpoint: EndpointId) -> Vec<u8> {
    vec![
        CLASS.to_byte(),
        AGGREGATED_MEMBERS_GET,
        aggregated_endpoint.get(),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedMembersReport {
    pub aggregated_endpoint: EndpointId,
    pub members: Vec<EndpointId>,
}

pub fn parse_aggregated_members_report(bytes: &[u8]) -> Result<AggregatedMembersReport> {
    expect_header(bytes, CLASS, AGGREGATED_MEMBERS_REPORT, 4)?;
    let header = EndpointHeader::from_bytes([bytes[2]]);
    let bitmask_len = bytes[3] as usize;
    let need = 4 + bitmask_len;
    if bytes.len() < need {
        return Err(ZnetError::ShortFrame {
            have: bytes.len(),
            need,
        });
    }
    let mut members = Vec::new();
    for (byte_index, &byte) in bytes[4..need].iter().enumerate() {
        for bit in 0..8u8 {
            if byte & (1 << bit) != 0 {
                let endpoint = (byte_index as u8) * 8 + bit + 1;
                if endpoint <= 127 {
                    members.push(EndpointId::new(endpoint)?);
                }
            }
        }
    }
    Ok(AggregatedMembersReport {
        aggregated_endpoint: EndpointId::new(header.endpoint())?,
        members,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_2_multi_channel_get() {
        // basic_get(node=9, endpoint=2) wraps `0x20 0x02` with src=0, dst=2.
        let inner = crate::codec::basic::encode_get();
        let encapsulated = encode_encapsulation(EndpointId::new(2).unwrap(), &inner);
        assert_eq!(encapsulated, vec![0x60, 0x0D, 0x00, 0x02, 0x20, 0x02]);

        // Simulated encapsulated reply src=2, dst=0, inner `0x20 0x03 0x40`.
        let reply = [0x60, 0x0D, 0x02, 0x00, 0x20, 0x03, 0x40];
        let (src_endpoint, inner) = decode_encapsulation(&reply).unwrap();
        assert_eq!(src_endpoint, EndpointId::new(2).unwrap());
        let report = crate::codec::basic::parse_report(inner).unwrap();
        assert_eq!(report.value.get(), 0x40);
    }

    #[test]
    fn aggregated_members_report_parses_bitmask() {
        let report =
            parse_aggregated_members_report(&[0x60, 0x0F, 0x81, 1, 0b0000_0101]).unwrap();
        assert_eq!(report.members, vec![EndpointId::new(1).unwrap(), EndpointId::new(3).unwrap()]);
    }
}
