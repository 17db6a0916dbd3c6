//! Tearing down running stand-in servers through the process listing.

use e2e_tests::{
    fakecached_config, free_port, free_ports, ps_available, server_pids, wait_for_port_released, FAKECACHED,
};
use memsup_fixture::{wait_until_listening, LocalServerControl, PosixServerControl};
use memsup_process::process_exists;
use std::time::Duration;

const FAKECACHED_BIN: &str = env!("CARGO_BIN_EXE_fakecached");

fn skip_without_ps() -> bool {
    if !ps_available() {
        println!("ps with -C support not available, skipping");
        return true;
    }
    false
}

#[test]
fn test_terminate_kills_only_target_port() {
    if skip_without_ps() {
        return;
    }

    let ports = free_ports(2);
    let (target, bystander) = (ports[0], ports[1]);
    let control = PosixServerControl::new(fakecached_config(FAKECACHED_BIN));

    control.add_local_server(&[target, bystander]).unwrap();
    wait_until_listening(("127.0.0.1", target), Duration::from_secs(5)).unwrap();
    wait_until_listening(("127.0.0.1", bystander), Duration::from_secs(5)).unwrap();

    let target_pids = server_pids(FAKECACHED, target);
    assert_eq!(target_pids.len(), 1, "expected one server on port {}", target);
    assert!(process_exists(target_pids[0]).unwrap());

    let report = control.remove_configured_server(&[target]);
    assert_eq!(report.signalled, vec![(target, target_pids[0])]);

    wait_for_port_released(FAKECACHED, target, Duration::from_secs(5)).unwrap();
    assert_eq!(server_pids(FAKECACHED, bystander).len(), 1);

    control.remove_configured_server(&[bystander]);
    wait_for_port_released(FAKECACHED, bystander, Duration::from_secs(5)).unwrap();
}

#[test]
fn test_terminate_twice_is_idempotent() {
    if skip_without_ps() {
        return;
    }

    let port = free_port();
    let control = PosixServerControl::new(fakecached_config(FAKECACHED_BIN));

    control.add_local_server(&[port]).unwrap();
    wait_until_listening(("127.0.0.1", port), Duration::from_secs(5)).unwrap();

    let first = control.remove_local_server(FAKECACHED, &[port]);
    assert_eq!(first.signal_count(), 1);
    wait_for_port_released(FAKECACHED, port, Duration::from_secs(5)).unwrap();

    let second = control.remove_local_server(FAKECACHED, &[port]);
    assert_eq!(second.signal_count(), 0);
    assert!(second.is_clean());
}

#[test]
fn test_terminate_with_nothing_running_returns_normally() {
    let control = PosixServerControl::new(fakecached_config(FAKECACHED_BIN));

    // Works whether or not `ps` exists: failures are only recorded
    let report = control.remove_local_server("memsup-not-running", &[free_port()]);
    assert_eq!(report.signal_count(), 0);
}
