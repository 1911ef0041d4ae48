//! Hostile input from the control channel
//!
//! The main process is trusted, but a bug there must never corrupt the
//! worker: every frame either ends the worker with a distinct reason or is
//! handled without touching the committed transport.

use std::os::fd::AsRawFd;

use tunnel_worker::channel::{CMD_PAYLOAD_MAX, CMD_TERMINATE, CMD_UDP_FD};
use tunnel_worker::{CommandOutcome, ExitReason, HandoverOutcome, UdpState};

use super::common::{establish, peer_closed, transport_pair, worker, worker_with_session};

/// Small deterministic generator, enough to spread inputs
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        self.0 >> 33
    }

    fn byte(&mut self) -> u8 {
        (self.next() & 0xff) as u8
    }
}

// ============================================================================
// Frame fuzzing
// ============================================================================

#[test]
fn test_fuzz_frames_never_panic() {
    let mut rng = Lcg(0x5eed);

    for _ in 0..500 {
        let (main, mut worker) = worker_with_session();
        let opcode = rng.byte();
        let len = (rng.next() as usize) % (CMD_PAYLOAD_MAX + 16);
        let payload: Vec<u8> = (0..len).map(|_| rng.byte()).collect();
        let declared = (rng.next() & 0xffff) as u16;

        main.send_raw(opcode, declared, &payload, &[]).unwrap();

        match worker.handle_command() {
            Ok(outcome) => {
                assert_eq!(opcode, CMD_UDP_FD);
                assert!(usize::from(declared) <= len.min(CMD_PAYLOAD_MAX));
                assert!(matches!(outcome, CommandOutcome::Discarded(_)));
            }
            Err(ExitReason::MalformedFrame { declared: d, .. }) => {
                assert_eq!(d, declared);
            }
            Err(ExitReason::UnknownCommand(op)) => assert_eq!(op, opcode),
            Err(ExitReason::Terminated) => assert_eq!(opcode, CMD_TERMINATE),
            Err(other) => panic!("unexpected exit reason: {other}"),
        }
    }
}

#[test]
fn test_fuzz_payload_with_descriptor() {
    let mut rng = Lcg(42);

    for _ in 0..200 {
        let (main, mut worker) = worker_with_session();
        let first_peer = establish(&main, &mut worker);

        let len = (rng.next() as usize) % 64;
        let payload: Vec<u8> = (0..len).map(|_| rng.byte()).collect();
        let (fd, _peer) = transport_pair();
        main.send(CMD_UDP_FD, &payload, &[fd.as_raw_fd()]).unwrap();
        drop(fd);

        // whatever the payload says, the worker either adopted the new
        // descriptor or kept the old one intact
        match worker.handle_command().unwrap() {
            CommandOutcome::Handover(HandoverOutcome::Adopted { state, .. }) => {
                assert_ne!(state, UdpState::Disabled);
                assert!(peer_closed(&first_peer));
            }
            CommandOutcome::Handover(HandoverOutcome::Rejected) => {
                assert_eq!(worker.udp().state(), UdpState::Active);
                assert!(!peer_closed(&first_peer));
            }
            CommandOutcome::Discarded(e) => panic!("descriptor was attached: {e}"),
        }
        assert_eq!(
            worker.session().unwrap().transport().fd(),
            worker.udp().active().raw_fd()
        );
    }
}

// ============================================================================
// Boundaries
// ============================================================================

#[test]
fn test_boundary_declared_equals_received() {
    let (main, mut worker) = worker();
    main.send_raw(CMD_UDP_FD, 4, &[0u8; 4], &[]).unwrap();
    assert!(worker.handle_command().is_ok());
}

#[test]
fn test_boundary_declared_one_past_received() {
    let (main, mut worker) = worker();
    main.send_raw(CMD_UDP_FD, 5, &[0u8; 4], &[]).unwrap();
    assert!(matches!(
        worker.handle_command(),
        Err(ExitReason::MalformedFrame { .. })
    ));
}

#[test]
fn test_boundary_max_declared_length() {
    let (main, mut worker) = worker();
    main.send_raw(CMD_UDP_FD, u16::MAX, &[0u8; 8], &[]).unwrap();
    assert!(matches!(
        worker.handle_command(),
        Err(ExitReason::MalformedFrame { .. })
    ));
}
