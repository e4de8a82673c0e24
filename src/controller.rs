//! The public API surface (§6): one owned `Controller` per serial port, replacing the original's
//! file-scope globals (§9 "Global singleton"). Wires the transport, session table, node cache, and
//! controller FSMs together behind fire-and-forget request functions and per-call callbacks.

use std::cell::RefCell;

use crate::cache::{EndpointRecord, NodeCache, NodeRecord};
use crate::callbacks::Callbacks;
use crate::codec::{
    basic, binary_switch, configuration, dispatch, manufacturer_specific, meter, multi_channel,
    multilevel_switch, version, zwave_plus_info, CommandClass, SwitchValue,
};
use crate::error::{Result, ZnetError};
use crate::fsm::{
    add_node::AddNode, list_nodes::ListNodes, remove_node::RemoveNode, set_default::SetDefault,
    ControllerState, ListCallback, NodeCallback, UnitCallback,
};
use crate::ids::{EndpointId, NodeId};
use crate::params::Parameters;
use crate::session::{SessionCallback, SessionEvent, SessionTable};
use crate::transport::Transport;
use crate::wire::{Frame, FrameType};

/// Delivered once, with the removed node's id when the radio reported one (§6).
pub type RemoveCallback = Box<dyn FnOnce(Result<Option<NodeId>>)>;

pub struct Controller {
    cb: Box<dyn Callbacks>,
    params: Parameters,
    transport: Transport,
    sessions: SessionTable,
    cache: NodeCache,
    state: ControllerState,
    set_default_fsm: Option<(SetDefault, UnitCallback)>,
    add_node_fsm: Option<(AddNode, NodeCallback)>,
    remove_node_fsm: Option<(RemoveNode, RemoveCallback)>,
    list_nodes_fsm: Option<(ListNodes, ListCallback)>,
}

impl Controller {
    /// Construct a controller over `cb`, loading the persisted node cache. Fails only if a
    /// mandatory callback reports failure while loading (§7 "Fatal" failures); there is no
    /// uninitialized state to misuse afterward, since every public entry requires a `Controller`
    /// value (§7).
    pub fn init(mut cb: Box<dyn Callbacks>, params: Parameters) -> Result<Self> {
        dispatch::assert_every_class_covered();
        let mut cache = NodeCache::new(&params);
        cache.load(&mut *cb)?;
        Ok(Self {
            transport: Transport::new(params),
            sessions: SessionTable::new(params.max_sessions),
            cache,
            cb,
            params,
            state: ControllerState::Idle,
            set_default_fsm: None,
            add_node_fsm: None,
            remove_node_fsm: None,
            list_nodes_fsm: None,
        })
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn node_info(&self, id: NodeId) -> Option<&NodeRecord> {
        self.cache.get(id)
    }

    pub fn known_node_count(&self) -> usize {
        self.cache.len()
    }

    /// The periodic pump (§5): drains at most one inbound frame, then scans for expired sessions
    /// and FSMs. Call at roughly 1 kHz, per the concurrency model.
    pub fn proc(&mut self) -> Result<()> {
        let now = self.cb.now_ms();
        if let Some(frame) = self.transport.pump(&mut *self.cb)? {
            self.handle_frame(frame.payload);
        }
        self.sessions.expire_timeouts(now);
        self.expire_fsms(now);
        Ok(())
    }

    // ---- controller-wide operations (§4.C) ----

    pub fn set_default(&mut self, callback: UnitCallback) -> Result<()> {
        if self.state != ControllerState::Idle {
            callback(Err(ZnetError::Busy));
            return Err(ZnetError::Busy);
        }
        self.state = ControllerState::SetDefaultInProgress;
        self.sessions.cancel_all();
        let now = self.cb.now_ms();
        if let Err(e) = self.send_function_frame(SetDefault::request_frame()) {
            self.state = ControllerState::Idle;
            callback(Err(e.clone()));
            return Err(e);
        }
        let timeout_ms = self.params.session_timeout.as_millis() as u64;
        self.set_default_fsm = Some((SetDefault::start(now, timeout_ms), callback));
        Ok(())
    }

    pub fn node_add(&mut self, callback: NodeCallback) -> Result<()> {
        if self.state != ControllerState::Idle {
            callback(Err(ZnetError::Busy));
            return Err(ZnetError::Busy);
        }
        self.state = ControllerState::AddingNode;
        let now = self.cb.now_ms();
        if let Err(e) = self.send_function_frame(AddNode::request_frame()) {
            self.state = ControllerState::Idle;
            callback(Err(e.clone()));
            return Err(e);
        }
        let timeout_ms = self.params.inclusion_timeout.as_millis() as u64;
        self.add_node_fsm = Some((AddNode::start(now, timeout_ms), callback));
        Ok(())
    }

    pub fn node_rem(&mut self, callback: RemoveCallback) -> Result<()> {
        if self.state != ControllerState::Idle {
            callback(Err(ZnetError::Busy));
            return Err(ZnetError::Busy);
        }
        self.state = ControllerState::RemovingNode;
        let now = self.cb.now_ms();
        if let Err(e) = self.send_function_frame(RemoveNode::request_frame()) {
            self.state = ControllerState::Idle;
            callback(Err(e.clone()));
            return Err(e);
        }
        let timeout_ms = self.params.inclusion_timeout.as_millis() as u64;
        self.remove_node_fsm = Some((RemoveNode::start(now, timeout_ms), callback));
        Ok(())
    }

    /// Abort an in-progress exclusion window before any node has presented itself (§4.C).
    pub fn node_rem_break(&mut self) -> Result<()> {
        let Some((fsm, callback)) = self.remove_node_fsm.take() else {
            return Err(ZnetError::Busy);
        };
        if !fsm.awaiting_node() {
            self.remove_node_fsm = Some((fsm, callback));
            return Ok(());
        }
        self.send_function_frame(RemoveNode::break_frame())?;
        self.remove_node_fsm = Some((fsm, callback));
        Ok(())
    }

    pub fn node_list(&mut self, callback: ListCallback) -> Result<()> {
        if self.state != ControllerState::Idle {
            return Err(ZnetError::Busy);
        }
        self.state = ControllerState::ListingNodes;
        let now = self.cb.now_ms();
        if let Err(e) = self.send_function_frame(ListNodes::request_frame()) {
            self.state = ControllerState::Idle;
            return Err(e);
        }
        let timeout_ms = self.params.session_timeout.as_millis() as u64;
        self.list_nodes_fsm = Some((ListNodes::start(now, timeout_ms), callback));
        Ok(())
    }

    // ---- Basic (0x20) ----

    pub fn basic_set(&mut self, node: NodeId, endpoint: EndpointId, value: SwitchValue) -> Result<()> {
        self.fire_and_forget(node, endpoint, basic::encode_set(value))
    }

    pub fn basic_get(
        &mut self,
        node: NodeId,
        endpoint: EndpointId,
        callback: Box<dyn FnOnce(Result<basic::BasicReport>)>,
    ) -> Result<()> {
        self.single_shot(node, endpoint, CommandClass::Basic, basic::GET, basic::encode_get(), basic::parse_report, callback)
    }

    // ---- Binary Switch (0x25) ----

    pub fn binary_switch_set(&mut self, node: NodeId, endpoint: EndpointId, value: SwitchValue) -> Result<()> {
        self.fire_and_forget(node, endpoint, binary_switch::encode_set(value))
    }

    pub fn binary_switch_get(
        &mut self,
        node: NodeId,
        endpoint: EndpointId,
        callback: Box<dyn FnOnce(Result<binary_switch::BinarySwitchReport>)>,
    ) -> Result<()> {
        self.single_shot(
            node,
            endpoint,
            CommandClass::BinarySwitch,
            binary_switch::GET,
            binary_switch::encode_get(),
            binary_switch::parse_report,
            callback,
        )
    }

    // ---- Multilevel Switch (0x26) ----

    pub fn multilevel_switch_set(&mut self, node: NodeId, endpoint: EndpointId, value: SwitchValue) -> Result<()> {
        self.fire_and_forget(node, endpoint, multilevel_switch::encode_set(value))
    }

    pub fn multilevel_switch_get(
        &mut self,
        node: NodeId,
        endpoint: EndpointId,
        callback: Box<dyn FnOnce(Result<multilevel_switch::MultilevelSwitchReport>)>,
    ) -> Result<()> {
        self.single_shot(
            node,
            endpoint,
            CommandClass::MultilevelSwitch,
            multilevel_switch::GET,
            multilevel_switch::encode_get(),
            multilevel_switch::parse_report,
            callback,
        )
    }

    pub fn multilevel_switch_start_change(
        &mut self,
        node: NodeId,
        endpoint: EndpointId,
        direction: multilevel_switch::Direction,
        ignore_start_level: bool,
        start_level: u8,
    ) -> Result<()> {
        self.fire_and_forget(
            node,
            endpoint,
            multilevel_switch::encode_start_change(direction, ignore_start_level, start_level),
        )
    }

    pub fn multilevel_switch_stop_change(&mut self, node: NodeId, endpoint: EndpointId) -> Result<()> {
        self.fire_and_forget(node, endpoint, multilevel_switch::encode_stop_change())
    }

    // ---- Meter (0x32) ----

    pub fn meter_get(
        &mut self,
        node: NodeId,
        endpoint: EndpointId,
        scale: Option<u8>,
        callback: Box<dyn FnOnce(Result<meter::MeterReport>)>,
    ) -> Result<()> {
        self.single_shot(node, endpoint, CommandClass::Meter, meter::GET, meter::encode_get(scale), meter::parse_report, callback)
    }

    pub fn meter_supported_get(
        &mut self,
        node: NodeId,
        endpoint: EndpointId,
        callback: Box<dyn FnOnce(Result<meter::MeterSupportedReport>)>,
    ) -> Result<()> {
        self.single_shot(
            node,
            endpoint,
            CommandClass::Meter,
            meter::SUPPORTED_GET,
            meter::encode_supported_get(),
            meter::parse_supported_report,
            callback,
        )
    }

    pub fn meter_reset(&mut self, node: NodeId, endpoint: EndpointId) -> Result<()> {
        self.fire_and_forget(node, endpoint, meter::encode_reset())
    }

    // ---- Multi Channel (0x60) ----

    pub fn multi_channel_endpoint_get(
        &mut self,
        node: NodeId,
        callback: Box<dyn FnOnce(Result<multi_channel::EndpointReport>)>,
    ) -> Result<()> {
        self.single_shot(
            node,
            EndpointId::root(),
            CommandClass::MultiChannel,
            multi_channel::ENDPOINT_GET,
            multi_channel::encode_endpoint_get(),
            multi_channel::parse_endpoint_report,
            callback,
        )
    }

    pub fn multi_channel_capability_get(
        &mut self,
        node: NodeId,
        endpoint: EndpointId,
        callback: Box<dyn FnOnce(Result<multi_channel::CapabilityReport>)>,
    ) -> Result<()> {
        self.single_shot(
            node,
            EndpointId::root(),
            CommandClass::MultiChannel,
            multi_channel::CAPABILITY_GET,
            multi_channel::encode_capability_get(endpoint),
            multi_channel::parse_capability_report,
            callback,
        )
    }

    pub fn multi_channel_endpoint_find(
        &mut self,
        node: NodeId,
        generic_class: u8,
        specific_class: u8,
        callback: Box<dyn FnMut(Result<Option<multi_channel::EndpointFindReport>>)>,
    ) -> Result<()> {
        self.multi_part(
            node,
            EndpointId::root(),
            CommandClass::MultiChannel,
            multi_channel::ENDPOINT_FIND,
            multi_channel::encode_endpoint_find(generic_class, specific_class),
            multi_channel::parse_endpoint_find_report,
            callback,
        )
    }

    pub fn multi_channel_aggregated_members_get(
        &mut self,
        node: NodeId,
        aggregated_endpoint: EndpointId,
        callback: Box<dyn FnOnce(Result<multi_channel::AggregatedMembersReport>)>,
    ) -> Result<()> {
        self.single_shot(
            node,
            EndpointId::root(),
            CommandClass::MultiChannel,
            multi_channel::AGGREGATED_MEMBERS_GET,
            multi_channel::encode_aggregated_members_get(aggregated_endpoint),
            multi_channel::parse_aggregated_members_report,
            callback,
        )
    }

    // ---- Configuration (0x70) ----

    pub fn configuration_get(
        &mut self,
        node: NodeId,
        endpoint: EndpointId,
        param: u8,
        callback: Box<dyn FnOnce(Result<configuration::ConfigurationReport>)>,
    ) -> Result<()> {
        self.single_shot(
            node,
            endpoint,
            CommandClass::Configuration,
            configuration::GET,
            configuration::encode_get(param),
            configuration::parse_report,
            callback,
        )
    }

    /// Validated and rejected synchronously before any wire traffic if `size` is illegal
    /// (§7, scenario 3).
    pub fn configuration_set(
        &mut self,
        node: NodeId,
        endpoint: EndpointId,
        param: u8,
        size: u8,
        set_to_default: bool,
        value: i32,
    ) -> Result<()> {
        let bytes = configuration::encode_set(param, size, set_to_default, value)?;
        self.fire_and_forget(node, endpoint, bytes)
    }

    pub fn configuration_bulk_get(
        &mut self,
        node: NodeId,
        endpoint: EndpointId,
        param_offset: u16,
        count: u8,
        callback: Box<dyn FnMut(Result<Option<configuration::BulkReport>>)>,
    ) -> Result<()> {
        self.multi_part(
            node,
            endpoint,
            CommandClass::Configuration,
            configuration::BULK_GET,
            configuration::encode_bulk_get(param_offset, count),
            configuration::parse_bulk_report,
            callback,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn configuration_bulk_set(
        &mut self,
        node: NodeId,
        endpoint: EndpointId,
        param_offset: u16,
        size: u8,
        set_to_default: bool,
        need_report: bool,
        values: &[i32],
    ) -> Result<()> {
        let bytes = configuration::encode_bulk_set(param_offset, size, set_to_default, need_report, values)?;
        self.fire_and_forget(node, endpoint, bytes)
    }

    pub fn configuration_name_get(
        &mut self,
        node: NodeId,
        endpoint: EndpointId,
        param: u16,
        callback: Box<dyn FnMut(Result<Option<configuration::NameSegment>>)>,
    ) -> Result<()> {
        self.multi_part(
            node,
            endpoint,
            CommandClass::Configuration,
            configuration::NAME_GET,
            configuration::encode_name_get(param),
            configuration::parse_name_report,
            callback,
        )
    }

    pub fn configuration_info_get(
        &mut self,
        node: NodeId,
        endpoint: EndpointId,
        param: u16,
        callback: Box<dyn FnMut(Result<Option<configuration::InfoSegment>>)>,
    ) -> Result<()> {
        self.multi_part(
            node,
            endpoint,
            CommandClass::Configuration,
            configuration::INFO_GET,
            configuration::encode_info_get(param),
            configuration::parse_info_report,
            callback,
        )
    }

    pub fn configuration_properties_get(
        &mut self,
        node: NodeId,
        endpoint: EndpointId,
        param: u16,
        callback: Box<dyn FnOnce(Result<configuration::PropertiesReport>)>,
    ) -> Result<()> {
        self.single_shot(
            node,
            endpoint,
            CommandClass::Configuration,
            configuration::PROPERTIES_GET,
            configuration::encode_properties_get(param),
            configuration::parse_properties_report,
            callback,
        )
    }

    pub fn configuration_default_reset(&mut self, node: NodeId, endpoint: EndpointId) -> Result<()> {
        self.fire_and_forget(node, endpoint, configuration::encode_default_reset())
    }

    // ---- Version (0x86) ----

    pub fn version_get(
        &mut self,
        node: NodeId,
        callback: Box<dyn FnOnce(Result<version::VersionReport>)>,
    ) -> Result<()> {
        self.single_shot(
            node,
            EndpointId::root(),
            CommandClass::Version,
            version::GET,
            version::encode_get(),
            version::parse_report,
            callback,
        )
    }

    pub fn version_command_class_get(
        &mut self,
        node: NodeId,
        command_class: u8,
        callback: Box<dyn FnOnce(Result<version::CommandClassVersionReport>)>,
    ) -> Result<()> {
        self.single_shot(
            node,
            EndpointId::root(),
            CommandClass::Version,
            version::COMMAND_CLASS_GET,
            version::encode_command_class_get(command_class),
            version::parse_command_class_report,
            callback,
        )
    }

    pub fn version_capabilities_get(
        &mut self,
        node: NodeId,
        callback: Box<dyn FnOnce(Result<version::CapabilitiesReport>)>,
    ) -> Result<()> {
        self.single_shot(
            node,
            EndpointId::root(),
            CommandClass::Version,
            version::CAPABILITIES_GET,
            version::encode_capabilities_get(),
            version::parse_capabilities_report,
            callback,
        )
    }

    // ---- Manufacturer/Device Specific (0x72) ----

    pub fn manufacturer_specific_get(
        &mut self,
        node: NodeId,
        callback: Box<dyn FnOnce(Result<manufacturer_specific::ManufacturerSpecificReport>)>,
    ) -> Result<()> {
        self.single_shot(
            node,
            EndpointId::root(),
            CommandClass::ManufacturerSpecific,
            manufacturer_specific::GET,
            manufacturer_specific::encode_get(),
            manufacturer_specific::parse_report,
            callback,
        )
    }

    pub fn device_specific_get(
        &mut self,
        node: NodeId,
        id_type: manufacturer_specific::DeviceIdType,
        callback: Box<dyn FnOnce(Result<manufacturer_specific::DeviceSpecificReport>)>,
    ) -> Result<()> {
        self.single_shot(
            node,
            EndpointId::root(),
            CommandClass::ManufacturerSpecific,
            manufacturer_specific::DEVICE_SPECIFIC_GET,
            manufacturer_specific::encode_device_specific_get(id_type),
            manufacturer_specific::parse_device_specific_report,
            callback,
        )
    }

    // ---- Z-Wave Plus Info (0x5E) ----

    pub fn zwave_plus_info_get(
        &mut self,
        node: NodeId,
        callback: Box<dyn FnOnce(Result<zwave_plus_info::ZWavePlusInfoReport>)>,
    ) -> Result<()> {
        self.single_shot(
            node,
            EndpointId::root(),
            CommandClass::ZWavePlusInfo,
            zwave_plus_info::GET,
            zwave_plus_info::encode_get(),
            zwave_plus_info::parse_report,
            callback,
        )
    }

    // ---- internals ----

    fn wrap_envelope(&self, node: NodeId, endpoint: EndpointId, cc_bytes: Vec<u8>) -> Vec<u8> {
        if endpoint.is_root() {
            let mut v = vec![node.get(), endpoint.get()];
            v.extend(cc_bytes);
            v
        } else {
            let wrapped = multi_channel::encode_encapsulation(endpoint, &cc_bytes);
            let mut v = vec![node.get(), EndpointId::root().get()];
            v.extend(wrapped);
            v
        }
    }

    fn fire_and_forget(&mut self, node: NodeId, endpoint: EndpointId, cc_bytes: Vec<u8>) -> Result<()> {
        let envelope = self.wrap_envelope(node, endpoint, cc_bytes);
        let frame = Frame::new(FrameType::Request, envelope);
        self.transport.send(&mut *self.cb, &frame)
    }

    fn send_function_frame(&mut self, inner: Vec<u8>) -> Result<()> {
        let mut payload = vec![0u8];
        payload.extend(inner);
        let frame = Frame::new(FrameType::Request, payload);
        self.transport.send(&mut *self.cb, &frame)
    }

    /// Open a session, send the request, and deliver exactly one `Ok`/`Err` to `callback` once
    /// the single report (or failure) arrives.
    #[allow(clippy::too_many_arguments)]
    fn single_shot<T: 'static>(
        &mut self,
        node: NodeId,
        endpoint: EndpointId,
        class: CommandClass,
        command: u8,
        cc_bytes: Vec<u8>,
        parse: fn(&[u8]) -> Result<T>,
        callback: Box<dyn FnOnce(Result<T>)>,
    ) -> Result<()> {
        let slot = RefCell::new(Some(callback));
        self.request_cc(node, endpoint, class, command, cc_bytes, Box::new(move |ev| {
            let mut slot = slot.borrow_mut();
            match ev {
                Ok(SessionEvent::Segment(payload)) => {
                    if let Some(cb) = slot.take() {
                        cb(parse(&payload));
                    }
                }
                Ok(SessionEvent::Done) => {}
                Err(e) => {
                    if let Some(cb) = slot.take() {
                        cb(Err(e));
                    }
                }
            }
        }))
    }

    /// Open a multi-part session: `callback` is invoked with `Ok(Some(segment))` per segment, then
    /// `Ok(None)` as the terminator, or `Err(e)` on failure/timeout (§4.D).
    #[allow(clippy::too_many_arguments)]
    fn multi_part<T: 'static>(
        &mut self,
        node: NodeId,
        endpoint: EndpointId,
        class: CommandClass,
        command: u8,
        cc_bytes: Vec<u8>,
        parse: fn(&[u8]) -> Result<T>,
        mut callback: Box<dyn FnMut(Result<Option<T>>)>,
    ) -> Result<()> {
        self.request_cc(node, endpoint, class, command, cc_bytes, Box::new(move |ev| match ev {
            Ok(SessionEvent::Segment(payload)) => callback(parse(&payload).map(Some)),
            Ok(SessionEvent::Done) => callback(Ok(None)),
            Err(e) => callback(Err(e)),
        }))
    }

    fn request_cc(
        &mut self,
        node: NodeId,
        endpoint: EndpointId,
        class: CommandClass,
        command: u8,
        cc_bytes: Vec<u8>,
        callback: SessionCallback,
    ) -> Result<()> {
        let now = self.cb.now_ms();
        let multi_part = dispatch::is_multi_part(class, command);
        let timeout_ms = dispatch::timeout_ms(class, command);
        self.sessions.open(node, endpoint, class, multi_part, now, timeout_ms, callback)?;

        let envelope = self.wrap_envelope(node, endpoint, cc_bytes);
        let frame = Frame::new(FrameType::Request, envelope);
        if let Err(e) = self.transport.send(&mut *self.cb, &frame) {
            self.sessions.fail(node, endpoint, class, e.clone());
            return Err(e);
        }
        Ok(())
    }

    fn handle_frame(&mut self, payload: Vec<u8>) {
        if payload.first() == Some(&0u8) {
            self.handle_function_frame(&payload[1..]);
            return;
        }
        if payload.len() < 4 {
            log::warn!("znet: dropping short application frame ({} bytes)", payload.len());
            return;
        }
        let Ok(node) = NodeId::new(payload[0]) else {
            log::warn!("znet: dropping frame with invalid node id {}", payload[0]);
            return;
        };
        let Ok(envelope_endpoint) = EndpointId::new(payload[1]) else {
            log::warn!("znet: dropping frame with invalid endpoint id {}", payload[1]);
            return;
        };
        let cc_bytes = &payload[2..];
        let Ok(class) = CommandClass::from_byte(cc_bytes[0]) else {
            log::debug!("znet: unknown command class {:#04x}", cc_bytes[0]);
            return;
        };

        let (endpoint, class, inner) =
            if class == CommandClass::MultiChannel && cc_bytes.get(1) == Some(&multi_channel::CMD_ENCAP) {
                match multi_channel::decode_encapsulation(cc_bytes) {
                    Ok((src_endpoint, inner)) => {
                        if inner.len() < 2 {
                            return;
                        }
                        match CommandClass::from_byte(inner[0]) {
                            Ok(inner_class) => (src_endpoint, inner_class, inner.to_vec()),
                            Err(_) => return,
                        }
                    }
                    Err(e) => {
                        log::warn!("znet: failed to unwrap multi-channel encapsulation: {e}");
                        return;
                    }
                }
            } else {
                (envelope_endpoint, class, cc_bytes.to_vec())
            };

        self.maybe_learn_from_report(node, class, &inner);

        let more_follow = reports_to_follow(class, &inner).map(|b| b != 0).unwrap_or(false);
        let matched = self.sessions.deliver(node, endpoint, class, inner, more_follow);
        if !matched {
            log::debug!(
                "znet: unsolicited report from node {} endpoint {} class {:?}",
                node.get(),
                endpoint.get(),
                class
            );
        }
    }

    /// Opportunistically learn endpoint capabilities from an unsolicited (or session-matched)
    /// Multi Channel Capability Report, mirroring §4.E "Writes: ... on capability report for a
    /// newly discovered endpoint."
    fn maybe_learn_from_report(&mut self, node: NodeId, class: CommandClass, inner: &[u8]) {
        if class != CommandClass::MultiChannel || inner.get(1) != Some(&multi_channel::CAPABILITY_REPORT) {
            return;
        }
        let Ok(report) = multi_channel::parse_capability_report(inner) else {
            return;
        };
        let Some(existing) = self.cache.get(node) else {
            return;
        };
        let mut record = existing.clone();
        record.endpoints.insert(
            report.endpoint,
            EndpointRecord {
                generic_class: report.generic_class,
                specific_class: report.specific_class,
                command_classes: report.command_classes,
            },
        );
        self.cache.upsert(record);
        if let Err(e) = self.cache.save(&mut *self.cb) {
            log::error!("znet: failed to persist node cache: {e}");
        }
    }

    fn handle_function_frame(&mut self, payload: &[u8]) {
        if self.set_default_fsm.is_some() && SetDefault::matches(payload) {
            let (_, callback) = self.set_default_fsm.take().unwrap();
            let result = SetDefault::on_frame(payload);
            if result.is_ok() {
                if let Err(e) = self.cache.reset(&mut *self.cb) {
                    log::error!("znet: failed to reset node cache after set_default: {e}");
                }
            }
            self.state = ControllerState::Idle;
            callback(result);
            return;
        }

        let add_node_matches = self.add_node_fsm.as_ref().map(|(fsm, _)| fsm.matches(payload)).unwrap_or(false);
        if add_node_matches {
            let (mut fsm, callback) = self.add_node_fsm.take().unwrap();
            if fsm.awaiting_node() {
                match fsm.on_node_found(payload) {
                    Ok(stop_frame) => match self.send_function_frame(stop_frame) {
                        Ok(()) => self.add_node_fsm = Some((fsm, callback)),
                        Err(e) => {
                            self.state = ControllerState::Idle;
                            callback(Err(e));
                        }
                    },
                    Err(e) => {
                        self.state = ControllerState::Idle;
                        callback(Err(e));
                    }
                }
            } else {
                let result = fsm.on_stop_frame(payload);
                if let Ok(record) = &result {
                    self.cache.upsert(record.clone());
                    if let Err(e) = self.cache.save(&mut *self.cb) {
                        log::error!("znet: failed to persist node cache: {e}");
                    }
                }
                self.state = ControllerState::Idle;
                callback(result);
            }
            return;
        }

        let remove_node_matches = self.remove_node_fsm.as_ref().map(|(fsm, _)| fsm.matches(payload)).unwrap_or(false);
        if remove_node_matches {
            let (mut fsm, callback) = self.remove_node_fsm.take().unwrap();
            if fsm.awaiting_node() {
                match fsm.on_node_removed(payload) {
                    Ok(stop_frame) => match self.send_function_frame(stop_frame) {
                        Ok(()) => self.remove_node_fsm = Some((fsm, callback)),
                        Err(e) => {
                            self.state = ControllerState::Idle;
                            callback(Err(e));
                        }
                    },
                    Err(e) => {
                        self.state = ControllerState::Idle;
                        callback(Err(e));
                    }
                }
            } else {
                let result = fsm.on_stop_frame(payload);
                if let Ok(Some(id)) = &result {
                    self.cache.remove(*id);
                    if let Err(e) = self.cache.save(&mut *self.cb) {
                        log::error!("znet: failed to persist node cache: {e}");
                    }
                }
                self.state = ControllerState::Idle;
                callback(result);
            }
            return;
        }

        if self.list_nodes_fsm.is_some() && ListNodes::matches(payload) {
            let (_, mut callback) = self.list_nodes_fsm.take().unwrap();
            match ListNodes::on_mask_frame(payload) {
                Ok(ids) => {
                    for id in ids {
                        if let Some(record) = self.cache.get(id) {
                            callback(Some(record.clone()));
                        }
                    }
                    callback(None);
                }
                Err(e) => log::warn!("znet: failed to parse node mask report: {e}"),
            }
            self.state = ControllerState::Idle;
            return;
        }

        log::debug!("znet: unmatched function frame (first byte {:?})", payload.first());
    }

    fn expire_fsms(&mut self, now_ms: u64) {
        if self.set_default_fsm.as_ref().map(|(fsm, _)| fsm.is_expired(now_ms)).unwrap_or(false) {
            let (_, callback) = self.set_default_fsm.take().unwrap();
            self.state = ControllerState::Idle;
            callback(Err(ZnetError::SessionTimeout));
        }
        if self.add_node_fsm.as_ref().map(|(fsm, _)| fsm.is_expired(now_ms)).unwrap_or(false) {
            let (_, callback) = self.add_node_fsm.take().unwrap();
            self.state = ControllerState::Idle;
            callback(Err(ZnetError::SessionTimeout));
        }
        if self.remove_node_fsm.as_ref().map(|(fsm, _)| fsm.is_expired(now_ms)).unwrap_or(false) {
            let (_, callback) = self.remove_node_fsm.take().unwrap();
            self.state = ControllerState::Idle;
            callback(Err(ZnetError::SessionTimeout));
        }
        if self.list_nodes_fsm.as_ref().map(|(fsm, _)| fsm.is_expired(now_ms)).unwrap_or(false) {
            let (_, mut callback) = self.list_nodes_fsm.take().unwrap();
            self.state = ControllerState::Idle;
            callback(None);
        }
    }
}

/// Where the "reports to follow" byte lives for each multi-part report type (§4.D); `None` means
/// the `(class, command)` pair is single-shot.
fn reports_to_follow(class: CommandClass, inner: &[u8]) -> Option<u8> {
    match (class, inner.get(1).copied()) {
        (CommandClass::Configuration, Some(configuration::BULK_REPORT)) => inner.get(5).copied(),
        (CommandClass::Configuration, Some(configuration::NAME_REPORT)) => inner.get(4).copied(),
        (CommandClass::Configuration, Some(configuration::INFO_REPORT)) => inner.get(4).copied(),
        (CommandClass::MultiChannel, Some(multi_channel::ENDPOINT_FIND_REPORT)) => inner.get(2).copied(),
        _ => None,
    }
}
