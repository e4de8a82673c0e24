//! Node Cache (§4.E): the persisted inventory of known nodes and their command-class/endpoint
//! capabilities, backed by the host's opaque blob store.
//!
//! Blob layout (this port's own choice; not specified by the distillation, per §9 "Open
//! questions"): a one-byte version tag, a little-endian `u32` payload length, then that many bytes
//! of a flat record encoding. An unrecognized version (including an all-zero/empty store, which the
//! store-load contract returns for out-of-range reads) starts the cache empty rather than failing.

use std::collections::HashMap;

use crate::error::{Result, ZnetError};
use crate::ids::{EndpointId, NodeId};
use crate::params::Parameters;

pub const BLOB_VERSION: u8 = 1;
const HEADER_LEN: usize = 1 + 4;

/// A multi-channel sub-endpoint's own device classes and supported command classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRecord {
    pub generic_class: u8,
    pub specific_class: u8,
    pub command_classes: Vec<u8>,
}

/// Everything the cache knows about one node (§3 "Node record").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub id: NodeId,
    pub basic_class: u8,
    pub generic_class: u8,
    pub specific_class: u8,
    /// The root endpoint's supported command classes; authoritative for the node (§3 invariant).
    pub command_classes: Vec<u8>,
    pub endpoints: HashMap<EndpointId, EndpointRecord>,
    pub aggregated_members: HashMap<EndpointId, Vec<EndpointId>>,
}

impl NodeRecord {
    pub fn new(id: NodeId, basic_class: u8, generic_class: u8, specific_class: u8) -> Self {
        Self {
            id,
            basic_class,
            generic_class,
            specific_class,
            command_classes: Vec::new(),
            endpoints: HashMap::new(),
            aggregated_members: HashMap::new(),
        }
    }
}

/// The in-memory table, mirrored to the blob store on every mutation.
pub struct NodeCache {
    max_command_classes: usize,
    nodes: HashMap<NodeId, NodeRecord>,
}

impl NodeCache {
    pub fn new(params: &Parameters) -> Self {
        Self {
            max_command_classes: params.max_command_classes_per_node,
            nodes: HashMap::new(),
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All known node ids, ascending (used by the ListNodes FSM).
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Insert or replace a node's record. Command-class lists longer than the configured cap are
    /// truncated with a warning, matching the original's fixed-capacity trailing arrays (§9).
    pub fn upsert(&mut self, mut record: NodeRecord) {
        if record.command_classes.len() > self.max_command_classes {
            log::warn!(
                "znet: node {} reports {} command classes, truncating to {}",
                record.id.get(),
                record.command_classes.len(),
                self.max_command_classes
            );
            record.command_classes.truncate(self.max_command_classes);
        }
        self.nodes.insert(record.id, record);
    }

    pub fn remove(&mut self, id: NodeId) -> Option<NodeRecord> {
        self.nodes.remove(&id)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Load from the host's blob store, via [`crate::callbacks::Callbacks::store_load`]. An
    /// unrecognized version tag starts the cache empty (§4.E).
    pub fn load(&mut self, cb: &mut dyn crate::callbacks::Callbacks) -> Result<()> {
        let mut header = [0u8; HEADER_LEN];
        cb.store_load(0, &mut header)?;

        let version = header[0];
        if version != BLOB_VERSION {
            log::info!("znet: no recognized node-cache blob (version tag {version}), starting empty");
            self.nodes.clear();
            return Ok(());
        }

        let len = u32::from_le_bytes([header[1], header[2], header[3], header[4]]) as usize;
        let mut body = vec![0u8; len];
        cb.store_load(HEADER_LEN, &mut body)?;
        self.nodes = decode_records(&body)?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();
        Ok(())
    }

    /// Serialize and persist the whole cache (§4.E "serializes on every mutation").
    pub fn save(&self, cb: &mut dyn crate::callbacks::Callbacks) -> Result<()> {
        let body = encode_records(&self.nodes);
        let mut header = Vec::with_capacity(HEADER_LEN);
        header.push(BLOB_VERSION);
        header.extend((body.len() as u32).to_le_bytes());
        cb.store_save(0, &header)?;
        cb.store_save(HEADER_LEN, &body)?;
        Ok(())
    }

    /// Wipe the cache and the persisted blob, used by a successful `set_default` (§4.C).
    pub fn reset(&mut self, cb: &mut dyn crate::callbacks::Callbacks) -> Result<()> {
        self.nodes.clear();
        cb.store_reset(HEADER_LEN)?;
        self.save(cb)
    }
}

fn encode_records(nodes: &HashMap<NodeId, NodeRecord>) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(nodes.len() as u8);
    let mut ids: Vec<&NodeId> = nodes.keys().collect();
    ids.sort();
    for id in ids {
        let record = &nodes[id];
        out.push(record.id.get());
        out.push(record.basic_class);
        out.push(record.generic_class);
        out.push(record.specific_class);
        out.push(record.command_classes.len() as u8);
        out.extend_from_slice(&record.command_classes);

        out.push(record.endpoints.len() as u8);
        let mut endpoint_ids: Vec<&EndpointId> = record.endpoints.keys().collect();
        endpoint_ids.sort();
        for eid in endpoint_ids {
            let endpoint = &record.endpoints[eid];
            out.push(eid.get());
            out.push(endpoint.generic_class);
            out.push(endpoint.specific_class);
            out.push(endpoint.command_classes.len() as u8);
            out.extend_from_slice(&endpoint.command_classes);
        }

        out.push(record.aggregated_members.len() as u8);
        let mut agg_ids: Vec<&EndpointId> = record.aggregated_members.keys().collect();
        agg_ids.sort();
        for aid in agg_ids {
            let members = &record.aggregated_members[aid];
            out.push(aid.get());
            out.push(members.len() as u8);
            out.extend(members.iter().map(|m| m.get()));
        }
    }
    out
}

fn decode_records(bytes: &[u8]) -> Result<Vec<NodeRecord>> {
    let mut cursor = Cursor::new(bytes);
    let node_count = cursor.u8()?;
    let mut records = Vec::with_capacity(node_count as usize);

    for _ in 0..node_count {
        let id = NodeId::new(cursor.u8()?)?;
        let basic_class = cursor.u8()?;
        let generic_class = cursor.u8()?;
        let specific_class = cursor.u8()?;
        let cc_count = cursor.u8()? as usize;
        let command_classes = cursor.bytes(cc_count)?.to_vec();

        let mut record = NodeRecord {
            id,
            basic_class,
            generic_class,
            specific_class,
            command_classes,
            endpoints: HashMap::new(),
            aggregated_members: HashMap::new(),
        };

        let endpoint_count = cursor.u8()?;
        for _ in 0..endpoint_count {
            let eid = EndpointId::new(cursor.u8()?)?;
            let generic_class = cursor.u8()?;
            let specific_class = cursor.u8()?;
            let cc_count = cursor.u8()? as usize;
            let command_classes = cursor.bytes(cc_count)?.to_vec();
            record.endpoints.insert(
                eid,
                EndpointRecord {
                    generic_class,
                    specific_class,
                    command_classes,
                },
            );
        }

        let agg_count = cursor.u8()?;
        for _ in 0..agg_count {
            let aid = EndpointId::new(cursor.u8()?)?;
            let member_count = cursor.u8()? as usize;
            let mut members = Vec::with_capacity(member_count);
            for &b in cursor.bytes(member_count)? {
                members.push(EndpointId::new(b)?);
            }
            record.aggregated_members.insert(aid, members);
        }

        records.push(record);
    }

    Ok(records)
}

/// A tiny cursor over a byte slice for the hand-rolled blob decoder, in the style of the teacher's
/// own `serde::Reader` used by `PhyPayload::from_bytes`.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn u8(&mut self) -> Result<u8> {
        let b = *self.bytes.get(self.pos).ok_or(ZnetError::ShortFrame {
            have: self.bytes.len(),
            need: self.pos + 1,
        })?;
        self.pos += 1;
        Ok(b)
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let need = self.pos + n;
        if self.bytes.len() < need {
            return Err(ZnetError::ShortFrame {
                have: self.bytes.len(),
                need,
            });
        }
        let slice = &self.bytes[self.pos..need];
        self.pos = need;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeHost;

    fn node(id: u8) -> NodeRecord {
        let mut r = NodeRecord::new(NodeId::new(id).unwrap(), 4, 0x10, 0x01);
        r.command_classes = vec![0x20, 0x25, 0x70];
        r.endpoints.insert(
            EndpointId::new(2).unwrap(),
            EndpointRecord {
                generic_class: 0x10,
                specific_class: 0x01,
                command_classes: vec![0x20],
            },
        );
        r.aggregated_members.insert(
            EndpointId::new(5).unwrap(),
            vec![EndpointId::new(1).unwrap(), EndpointId::new(2).unwrap()],
        );
        r
    }

    #[test]
    fn save_then_load_round_trips() {
        let params = Parameters::default();
        let mut cache = NodeCache::new(&params);
        cache.upsert(node(5));
        cache.upsert(node(9));

        let mut host = FakeHost::new();
        cache.save(&mut host).unwrap();

        let mut reloaded = NodeCache::new(&params);
        reloaded.load(&mut host).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get(NodeId::new(9).unwrap()), cache.get(NodeId::new(9).unwrap()));
    }

    #[test]
    fn loading_an_empty_store_starts_clean() {
        let params = Parameters::default();
        let mut cache = NodeCache::new(&params);
        let mut host = FakeHost::new();
        cache.load(&mut host).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn reset_clears_memory_and_blob() {
        let params = Parameters::default();
        let mut cache = NodeCache::new(&params);
        cache.upsert(node(5));
        let mut host = FakeHost::new();
        cache.save(&mut host).unwrap();

        cache.reset(&mut host).unwrap();
        assert!(cache.is_empty());

        let mut reloaded = NodeCache::new(&params);
        reloaded.load(&mut host).unwrap();
        assert!(reloaded.is_empty());
    }

    #[test]
    fn oversized_command_class_list_is_truncated() {
        let params = Parameters {
            max_command_classes_per_node: 2,
            ..Parameters::default()
        };
        let mut cache = NodeCache::new(&params);
        cache.upsert(node(5));
        assert_eq!(cache.get(NodeId::new(5).unwrap()).unwrap().command_classes.len(), 2);
    }
}
