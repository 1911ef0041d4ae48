//! Command channel integration tests
//!
//! Frames are sent over a real `SOCK_SEQPACKET` pair and read back through
//! the worker's receive, validation and dispatch path.

use std::fs::File;
use std::io::Write;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::sync::mpsc;
use std::time::Duration;

use tunnel_worker::channel::{CMD_PAYLOAD_MAX, CMD_TERMINATE, CMD_UDP_FD};
use tunnel_worker::config::ControlConfig;
use tunnel_worker::{CommandOutcome, ControlChannel, ExitReason, HandoverError, UdpState, Worker};

use super::common::{control_pair, peer_closed, transport_pair, worker, worker_with_session};

// ============================================================================
// Termination
// ============================================================================

#[test]
fn test_terminate_command() {
    let (main, mut worker) = worker();
    main.send(CMD_TERMINATE, &[], &[]).unwrap();

    let reason = worker.handle_command().unwrap_err();
    assert!(matches!(reason, ExitReason::Terminated));
    assert_eq!(reason.exit_code(), 0);
}

#[test]
fn test_parent_closed() {
    let (main, mut worker) = worker();
    drop(main);

    let reason = worker.handle_command().unwrap_err();
    assert!(matches!(reason, ExitReason::ParentClosed));
    assert_eq!(reason.exit_code(), 2);
}

#[test]
fn test_unknown_opcode_terminates_without_mutation() {
    let (main, mut worker) = worker_with_session();
    let before = worker.session().unwrap().transport();

    main.send(0xff, b"ignored", &[]).unwrap();

    let reason = worker.handle_command().unwrap_err();
    assert!(matches!(reason, ExitReason::UnknownCommand(0xff)));
    assert_eq!(reason.exit_code(), 4);
    assert_eq!(worker.udp().state(), UdpState::WaitFd);
    assert!(!worker.udp().active().is_some());
    assert_eq!(worker.session().unwrap().transport(), before);
}

#[test]
fn test_unknown_opcode_closes_carried_descriptor() {
    let (main, mut worker) = worker();
    let (fd, peer) = transport_pair();
    main.send(0x42, &[], &[fd.as_raw_fd()]).unwrap();
    drop(fd);

    assert!(worker.handle_command().is_err());
    assert!(peer_closed(&peer));
}

// ============================================================================
// Frame validation
// ============================================================================

#[test]
fn test_declared_length_beyond_received() {
    let (main, mut worker) = worker();
    main.send_raw(CMD_UDP_FD, 100, &[0u8; 10], &[]).unwrap();

    let reason = worker.handle_command().unwrap_err();
    match &reason {
        ExitReason::MalformedFrame {
            command,
            received,
            declared,
        } => {
            assert_eq!(command, "udp fd");
            assert_eq!(*received, 10);
            assert_eq!(*declared, 100);
        }
        other => panic!("unexpected exit reason: {other}"),
    }
    assert_eq!(reason.exit_code(), 3);
}

#[test]
fn test_malformed_frame_closes_descriptor() {
    let (main, mut worker) = worker();
    let (fd, peer) = transport_pair();
    main.send_raw(CMD_UDP_FD, 500, &[1, 2, 3], &[fd.as_raw_fd()]).unwrap();
    drop(fd);

    assert!(matches!(
        worker.handle_command(),
        Err(ExitReason::MalformedFrame { .. })
    ));
    assert!(peer_closed(&peer));
    assert!(!worker.udp().active().is_some());
}

#[test]
fn test_oversized_frame_is_malformed() {
    let (main, mut worker) = worker();
    let payload = vec![0u8; CMD_PAYLOAD_MAX + 64];
    main.send(CMD_UDP_FD, &payload, &[]).unwrap();

    assert!(matches!(
        worker.handle_command(),
        Err(ExitReason::MalformedFrame { .. })
    ));
}

#[test]
fn test_short_frame_is_malformed() {
    let (main, mut worker) = worker();
    main.send_bytes(&[CMD_UDP_FD, 0], &[]).unwrap();

    assert!(matches!(
        worker.handle_command(),
        Err(ExitReason::MalformedFrame { .. })
    ));
}

#[test]
fn test_max_payload_accepted() {
    let (main, mut worker) = worker();
    let payload = vec![0u8; CMD_PAYLOAD_MAX];
    main.send(CMD_UDP_FD, &payload, &[]).unwrap();

    // no descriptor attached, so the hand-off is discarded
    assert!(matches!(
        worker.handle_command(),
        Ok(CommandOutcome::Discarded(HandoverError::MissingDescriptor))
    ));
}

#[test]
fn test_trailing_bytes_beyond_declared_length_ignored() {
    let (main, mut worker) = worker();
    main.send_raw(CMD_UDP_FD, 0, b"trailing", &[]).unwrap();

    assert!(matches!(
        worker.handle_command(),
        Ok(CommandOutcome::Discarded(HandoverError::MissingDescriptor))
    ));
}

// ============================================================================
// Run loop
// ============================================================================

#[test]
fn test_run_serves_until_terminate() {
    let (main, mut worker) = worker();
    let (fd, _peer) = transport_pair();
    main.send(CMD_UDP_FD, &[], &[fd.as_raw_fd()]).unwrap();
    drop(fd);
    main.send(CMD_TERMINATE, &[], &[]).unwrap();

    let reason = worker.run();
    assert!(matches!(reason, ExitReason::Terminated));
    assert_eq!(worker.udp().state(), UdpState::Setup);
}

#[test]
fn test_run_returns_when_parent_goes_away() {
    let (main, channel) = control_pair();
    let config = ControlConfig {
        poll_timeout_ms: 10,
        ..ControlConfig::default()
    };
    let mut worker = Worker::new(channel, &config);

    let closer = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        drop(main);
    });

    let reason = worker.run();
    closer.join().unwrap();
    assert!(matches!(reason, ExitReason::ParentClosed));
}

#[test]
fn test_udp_disabled_by_config() {
    let (_main, channel) = control_pair();
    let config = ControlConfig {
        udp_enabled: false,
        ..ControlConfig::default()
    };
    let worker = Worker::new(channel, &config);
    assert_eq!(worker.udp().state(), UdpState::Disabled);
}

// ============================================================================
// Receive failures
// ============================================================================

/// Worker whose control channel is a pipe with one byte pending.
///
/// The pipe polls readable but `recvmsg(2)` on it fails with `ENOTSOCK`.
fn worker_on_pipe() -> (File, Worker) {
    let mut fds = [0; 2];
    assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
    let (read_end, write_end) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };

    let mut writer = File::from(write_end);
    writer.write_all(&[CMD_TERMINATE]).unwrap();

    let config = ControlConfig {
        poll_timeout_ms: 10,
        ..ControlConfig::default()
    };
    (writer, Worker::new(ControlChannel::new(read_end), &config))
}

#[test]
fn test_receive_error_ends_worker() {
    let (_writer, mut worker) = worker_on_pipe();

    let reason = worker.handle_command().unwrap_err();
    assert!(matches!(reason, ExitReason::ReceiveFailed(_)));
    assert_eq!(reason.exit_code(), 1);
    assert_eq!(worker.udp().state(), UdpState::WaitFd);
}

#[test]
fn test_run_returns_on_receive_error() {
    let (_writer, mut worker) = worker_on_pipe();

    let reason = worker.run();
    assert!(matches!(reason, ExitReason::ReceiveFailed(_)));
    assert_eq!(reason.exit_code(), 1);
}

extern "C" fn ignore_signal(_: libc::c_int) {}

#[test]
fn test_interrupted_receive_is_retried() {
    // no SA_RESTART: a blocked recvmsg returns EINTR when the signal lands
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = ignore_signal as libc::sighandler_t;
        action.sa_flags = 0;
        libc::sigemptyset(&raw mut action.sa_mask);
        assert_eq!(libc::sigaction(libc::SIGUSR1, &action, std::ptr::null_mut()), 0);
    }

    let (main, channel) = control_pair();
    let (tx, rx) = mpsc::channel();

    let handle = std::thread::spawn(move || {
        let mut worker = Worker::new(channel, &ControlConfig::default());
        tx.send(unsafe { libc::pthread_self() }).unwrap();
        worker.handle_command().map(|_| ())
    });

    let thread = rx.recv().unwrap();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(unsafe { libc::pthread_kill(thread, libc::SIGUSR1) }, 0);
    std::thread::sleep(Duration::from_millis(50));
    main.send(CMD_TERMINATE, &[], &[]).unwrap();

    let result = handle.join().unwrap();
    assert!(matches!(result, Err(ExitReason::Terminated)));
}
