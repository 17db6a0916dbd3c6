//! Launching the stand-in server and classifying its startup output.

use e2e_tests::{fakecached_config, free_port, FAKECACHED};
use memsup_fixture::{
    build_parameters, wait_until_listening, LaunchError, LocalServerControl, PosixServerControl,
};
use std::net::TcpListener;
use std::time::Duration;

const FAKECACHED_BIN: &str = env!("CARGO_BIN_EXE_fakecached");

#[test]
fn test_silent_start_is_ready() {
    let port = free_port();
    let control = PosixServerControl::new(fakecached_config(FAKECACHED_BIN));

    control.add_local_server(&[port]).unwrap();
    wait_until_listening(("127.0.0.1", port), Duration::from_secs(5)).unwrap();

    control.remove_local_server(FAKECACHED, &[port]);
}

#[test]
fn test_warning_on_start_is_benign() {
    let port = free_port();
    let config = fakecached_config(FAKECACHED_BIN);
    let control = PosixServerControl::new(config.clone());

    let mut params = build_parameters(&config);
    params.insert("--scenario", "warning");

    control.add_local_server_with(&params, &[port]).unwrap();
    wait_until_listening(("127.0.0.1", port), Duration::from_secs(5)).unwrap();

    control.remove_local_server(FAKECACHED, &[port]);
}

#[test]
fn test_crash_on_start_is_reported_verbatim() {
    let port = free_port();
    let config = fakecached_config(FAKECACHED_BIN);
    let control = PosixServerControl::new(config.clone());

    let mut params = build_parameters(&config);
    params.insert("--scenario", "segv");

    let err = control.add_local_server_with(&params, &[port]).unwrap_err();
    assert_eq!(err.to_string(), "Segmentation fault");
    assert!(matches!(err, LaunchError::Fatal { .. }));
}

#[test]
fn test_port_already_taken_is_benign() {
    let occupied = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();
    let control = PosixServerControl::new(fakecached_config(FAKECACHED_BIN));

    // The server prints "failed to listen on ..." and exits; the existing
    // listener keeps serving the port.
    control.add_local_server(&[port]).unwrap();
}

#[test]
fn test_tls_start_with_certificates() {
    let certs = tempfile::tempdir().unwrap();
    std::fs::write(certs.path().join("public.cert"), "chain").unwrap();
    std::fs::write(certs.path().join("private.cert"), "key").unwrap();

    let port = free_port();
    let mut config = fakecached_config(FAKECACHED_BIN);
    config.cert_folder = Some(certs.path().to_path_buf());
    let control = PosixServerControl::new(config);

    control.add_local_server(&[port]).unwrap();
    wait_until_listening(("127.0.0.1", port), Duration::from_secs(5)).unwrap();

    control.remove_local_server(FAKECACHED, &[port]);
}

#[test]
fn test_tls_start_without_certificates_fails() {
    let certs = tempfile::tempdir().unwrap();

    let port = free_port();
    let mut config = fakecached_config(FAKECACHED_BIN);
    config.cert_folder = Some(certs.path().to_path_buf());
    let control = PosixServerControl::new(config);

    let err = control.add_local_server(&[port]).unwrap_err();
    assert!(err.to_string().starts_with("Could not load certificate"));
}
