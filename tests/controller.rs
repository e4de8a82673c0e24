//! End-to-end scenarios from the controller's own wire perspective (§8), driven entirely through
//! the public `Controller` API over the in-memory `FakeHost` harness.

use std::cell::RefCell;
use std::rc::Rc;

use znet::codec::SwitchValue;
use znet::test_support::FakeHost;
use znet::wire::{Frame, FrameType, ACK, NACK};
use znet::{Controller, EndpointId, NodeId, Parameters, ZnetError};

// `FakeHost` is moved into the controller, so tests instead build the controller once and reach
// the host back out through the frames it records; this helper wraps it in an `Rc<RefCell<_>>`.
fn new_controller() -> (Controller, Rc<RefCell<FakeHost>>) {
    // `Controller` owns its `Box<dyn Callbacks>` outright, so a test that wants to both drive the
    // controller and inspect what was written to "the wire" needs a shared, interior-mutable host.
    struct Shared(Rc<RefCell<FakeHost>>);
    impl znet::Callbacks for Shared {
        fn now_ms(&mut self) -> u64 {
            self.0.borrow_mut().now_ms()
        }
        fn uart_write(&mut self, data: &[u8]) -> znet::Result<usize> {
            self.0.borrow_mut().uart_write(data)
        }
        fn uart_read(&mut self, buf: &mut [u8]) -> znet::Result<usize> {
            self.0.borrow_mut().uart_read(buf)
        }
        fn store_save(&mut self, offset: usize, data: &[u8]) -> znet::Result<()> {
            self.0.borrow_mut().store_save(offset, data)
        }
        fn store_load(&mut self, offset: usize, buf: &mut [u8]) -> znet::Result<()> {
            self.0.borrow_mut().store_load(offset, buf)
        }
        fn store_reset(&mut self, reserve: usize) -> znet::Result<()> {
            self.0.borrow_mut().store_reset(reserve)
        }
    }

    let host = Rc::new(RefCell::new(FakeHost::new()));
    let controller = Controller::init(Box::new(Shared(host.clone())), Parameters::default()).unwrap();
    (controller, host)
}

fn node(id: u8) -> NodeId {
    NodeId::new(id).unwrap()
}

fn endpoint(id: u8) -> EndpointId {
    EndpointId::new(id).unwrap()
}

/// Build the bytes for a simulated inbound frame carrying `payload` (node-addressed application
/// data or a controller function frame).
fn inbound_frame(payload: Vec<u8>) -> Vec<u8> {
    Frame::new(FrameType::Response, payload).encode()
}

#[test]
fn scenario_1_switch_on() {
    let (mut ctrl, host) = new_controller();

    host.borrow_mut().queue_inbound(&[ACK]);
    ctrl.binary_switch_set(node(5), endpoint(0), SwitchValue::new(0xFF).unwrap()).unwrap();

    let sent = host.borrow().last_written().unwrap();
    let frame = Frame::decode_body(&sent[1..]).unwrap();
    assert_eq!(frame.payload, vec![5, 0, 0x25, 0x01, 0xFF]);

    host.borrow_mut().queue_inbound(&[ACK]);
    let result = Rc::new(RefCell::new(None));
    let result_clone = result.clone();
    ctrl.binary_switch_get(
        node(5),
        endpoint(0),
        Box::new(move |r| *result_clone.borrow_mut() = Some(r)),
    )
    .unwrap();

    host.borrow_mut().queue_inbound(&inbound_frame(vec![5, 0, 0x25, 0x03, 0xFF]));
    ctrl.proc().unwrap();

    let report = result.borrow_mut().take().unwrap().unwrap();
    assert_eq!(report.value.get(), 0xFF);
}

#[test]
fn scenario_2_multi_channel_get() {
    let (mut ctrl, host) = new_controller();

    host.borrow_mut().queue_inbound(&[ACK]);
    let result = Rc::new(RefCell::new(None));
    let result_clone = result.clone();
    ctrl.basic_get(node(9), endpoint(2), Box::new(move |r| *result_clone.borrow_mut() = Some(r))).unwrap();

    let sent = host.borrow().last_written().unwrap();
    let frame = Frame::decode_body(&sent[1..]).unwrap();
    assert_eq!(frame.payload, vec![9, 0, 0x60, 0x0D, 0x00, 0x02, 0x20, 0x02]);

    host.borrow_mut().queue_inbound(&inbound_frame(vec![9, 0, 0x60, 0x0D, 0x02, 0x00, 0x20, 0x03, 0x40]));
    ctrl.proc().unwrap();

    let report = result.borrow_mut().take().unwrap().unwrap();
    assert_eq!(report.value.get(), 0x40);
}

#[test]
fn scenario_3_configuration_set_illegal_size_is_rejected_synchronously() {
    let (mut ctrl, host) = new_controller();

    let err = ctrl.configuration_set(node(5), endpoint(0), 1, 3, false, 0).unwrap_err();
    assert_eq!(err, ZnetError::InvalidConfigSize(3));
    assert_eq!(host.borrow().written_frames(), 0);
}

#[test]
fn scenario_4_multi_part_name_get() {
    let (mut ctrl, host) = new_controller();

    host.borrow_mut().queue_inbound(&[ACK]);
    let segments = Rc::new(RefCell::new(Vec::new()));
    let segments_clone = segments.clone();
    ctrl.configuration_name_get(
        node(5),
        endpoint(0),
        7,
        Box::new(move |r| segments_clone.borrow_mut().push(r.unwrap())),
    )
    .unwrap();

    host.borrow_mut().queue_inbound(&inbound_frame(vec![5, 0, 0x70, 0x0B, 0, 7, 1, b'p', b'a', b'r']));
    ctrl.proc().unwrap();
    host.borrow_mut().queue_inbound(&inbound_frame(vec![5, 0, 0x70, 0x0B, 0, 7, 0, b't', b'1']));
    ctrl.proc().unwrap();

    let segments = segments.borrow();
    assert_eq!(segments.len(), 3);
    assert_eq!(segments[0].as_ref().unwrap().name, b"par");
    assert_eq!(segments[1].as_ref().unwrap().name, b"t1");
    assert!(segments[2].is_none());
}

#[test]
fn scenario_5_nack_then_ack_is_one_logical_send() {
    let (mut ctrl, host) = new_controller();

    host.borrow_mut().queue_inbound(&[NACK]);
    host.borrow_mut().queue_inbound(&[ACK]);
    ctrl.binary_switch_set(node(5), endpoint(0), SwitchValue::new(0x00).unwrap()).unwrap();

    assert_eq!(host.borrow().written_frames(), 2);
    let first = Frame::decode_body(&host.borrow().all_written()[0][1..]).unwrap();
    let second = Frame::decode_body(&host.borrow().all_written()[1][1..]).unwrap();
    assert_eq!(first.payload, second.payload);
}

#[test]
fn scenario_6_request_with_no_reply_times_out() {
    let (mut ctrl, host) = new_controller();

    host.borrow_mut().queue_inbound(&[ACK]);
    let result = Rc::new(RefCell::new(None));
    let result_clone = result.clone();
    ctrl.binary_switch_get(node(5), endpoint(0), Box::new(move |r| *result_clone.borrow_mut() = Some(r))).unwrap();

    // Default single-shot session timeout is 3000ms; FakeHost's clock advances 50ms per proc().
    for _ in 0..65 {
        ctrl.proc().unwrap();
        if result.borrow().is_some() {
            break;
        }
    }

    let err = result.borrow_mut().take().unwrap().unwrap_err();
    assert_eq!(err, ZnetError::SessionTimeout);
}
