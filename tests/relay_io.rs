//! End-to-end relay tests over a socketpair standing in for the serial
//! device, with pipes (or a plain file) standing in for stdin/stdout.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::thread;

use nix::sys::socket::{socketpair, AddressFamily, SockFlag, SockType};
use nix::unistd::pipe;

use ttybridge::{BridgeError, Endpoint, Relay};

fn device_pair() -> (std::os::fd::OwnedFd, std::os::fd::OwnedFd) {
    socketpair(
        AddressFamily::Unix,
        SockType::Stream,
        None,
        SockFlag::empty(),
    )
    .expect("socketpair")
}

#[test]
fn relays_in_both_directions_until_device_hangup() {
    let (dev_local, dev_remote) = device_pair();
    let (stdin_read, stdin_write) = pipe().unwrap();
    let (stdout_read, stdout_write) = pipe().unwrap();

    let handle = thread::spawn(move || Relay::new(dev_local, stdin_read, stdout_write).run());

    let mut remote = File::from(dev_remote);
    let mut stdin_write = File::from(stdin_write);
    let mut stdout_read = File::from(stdout_read);

    // device -> stdout
    remote.write_all(b"hello").unwrap();
    let mut buf = [0u8; 5];
    stdout_read.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"hello");

    // stdin -> device
    stdin_write.write_all(b"world").unwrap();
    let mut buf = [0u8; 5];
    remote.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"world");

    // Closing the device ends the relay with an endpoint-closed error.
    drop(remote);
    let result = handle.join().unwrap();
    assert!(matches!(
        result,
        Err(BridgeError::EndpointClosed(Endpoint::Device))
    ));
}

#[test]
fn large_transfers_survive_chunking() {
    let (dev_local, dev_remote) = device_pair();
    let (stdin_read, _stdin_write) = pipe().unwrap();
    let (stdout_read, stdout_write) = pipe().unwrap();

    let handle = thread::spawn(move || Relay::new(dev_local, stdin_read, stdout_write).run());

    let payload: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
    let mut remote = File::from(dev_remote);
    remote.write_all(&payload).unwrap();

    let mut stdout_read = File::from(stdout_read);
    let mut received = vec![0u8; payload.len()];
    stdout_read.read_exact(&mut received).unwrap();
    assert_eq!(received, payload);

    drop(remote);
    assert!(handle.join().unwrap().is_err());
}

#[test]
fn stdin_eof_keeps_device_side_alive() {
    let (dev_local, dev_remote) = device_pair();
    let (stdout_read, stdout_write) = pipe().unwrap();

    // A regular file as stdin: readable until exhausted, then zero-length
    // reads with no hang-up event.
    let mut input = tempfile::tempfile().unwrap();
    input.write_all(b"boot\n").unwrap();
    input.seek(SeekFrom::Start(0)).unwrap();

    let handle = thread::spawn(move || Relay::new(dev_local, input, stdout_write).run());

    let mut remote = File::from(dev_remote);
    let mut buf = [0u8; 5];
    remote.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"boot\n");

    // Stdin is exhausted now; device output must still be relayed.
    remote.write_all(b"ok").unwrap();
    let mut stdout_read = File::from(stdout_read);
    let mut buf = [0u8; 2];
    stdout_read.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"ok");

    drop(remote);
    assert!(matches!(
        handle.join().unwrap(),
        Err(BridgeError::EndpointClosed(Endpoint::Device))
    ));
}

#[test]
fn stdin_hangup_terminates_relay() {
    let (dev_local, _dev_remote) = device_pair();
    let (stdin_read, stdin_write) = pipe().unwrap();
    let (_stdout_read, stdout_write) = pipe().unwrap();

    let handle = thread::spawn(move || Relay::new(dev_local, stdin_read, stdout_write).run());

    // An empty pipe whose writers are gone polls as hang-up.
    drop(stdin_write);
    let result = handle.join().unwrap();
    assert!(matches!(
        result,
        Err(BridgeError::EndpointClosed(Endpoint::Stdin))
    ));
}
