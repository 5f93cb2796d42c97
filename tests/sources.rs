mod common;

use common::{assert_same_content, init_logging, noisy_stream};
use sensor_stream::session::{Session, SessionOutcome};
use sensor_stream::sink::MemorySink;
use sensor_stream::source::{self, SourceConfig};
use sensor_stream::{CancelToken, Limits};
use std::fs::OpenOptions;
use std::io::Write;
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

#[test]
fn test_tcp_bridge_stream() {
    init_logging();
    let stream = noisy_stream(31, 5);
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let bytes = stream.bytes.clone();
    let device = thread::spawn(move || {
        let (mut socket, _) = listener.accept().unwrap();
        for chunk in bytes.chunks(64) {
            socket.write_all(chunk).unwrap();
            thread::sleep(Duration::from_millis(1));
        }
    });

    let config = SourceConfig::tcp(address).with_read_timeout_ms(20);
    let cancel = CancelToken::new();
    let byte_source = source::from_config(&config, Limits::default().max_line_len, cancel.clone()).unwrap();
    let mut session = Session::new(byte_source, Limits::default(), cancel);
    let mut sink = MemorySink::new(8);
    let summary = session.run(&mut sink).unwrap();
    device.join().unwrap();

    assert_eq!(summary.outcome, SessionOutcome::SourceClosed);
    assert_eq!(summary.frames, 5);
    for (actual, expected) in sink.frames().iter().zip(&stream.frames) {
        assert_same_content(actual, expected);
    }
}

#[test]
fn test_followed_file_sees_only_appended_frames() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vusb");
    let old = noisy_stream(41, 2);
    std::fs::write(&path, &old.bytes).unwrap();

    let cancel = CancelToken::new();
    let config = SourceConfig::follow(&path);
    let byte_source = source::from_config(&config, 4096, cancel.clone()).unwrap();
    let mut session =
        Session::new(byte_source, Limits::default(), cancel.clone()).with_max_frames(Some(3));

    let fresh = noisy_stream(42, 3);
    let appended = fresh.bytes.clone();
    let writer_path = path.clone();
    let writer = thread::spawn(move || {
        let mut file = OpenOptions::new().append(true).open(writer_path).unwrap();
        for chunk in appended.chunks(100) {
            file.write_all(chunk).unwrap();
            file.flush().unwrap();
            thread::sleep(Duration::from_millis(2));
        }
    });

    let mut sink = MemorySink::new(8);
    let summary = session.run(&mut sink).unwrap();
    writer.join().unwrap();

    assert_eq!(summary.outcome, SessionOutcome::FrameLimit);
    for (actual, expected) in sink.frames().iter().zip(&fresh.frames) {
        assert_same_content(actual, expected);
    }
}

#[test]
fn test_capture_file_replay() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.bin");
    let stream = noisy_stream(51, 4);
    std::fs::write(&path, &stream.bytes).unwrap();

    let byte_source = source::from_config(&SourceConfig::file(&path), 4096, CancelToken::new()).unwrap();
    let mut session = Session::new(byte_source, Limits::default(), CancelToken::new());
    let mut sink = MemorySink::new(8);
    let summary = session.run(&mut sink).unwrap();

    assert_eq!(summary.frames, 4);
    assert_eq!(summary.outcome, SessionOutcome::SourceClosed);
}

#[test]
fn test_missing_device_fails_to_open() {
    let config = SourceConfig::device("/nonexistent/ttyACM9");
    assert!(source::from_config(&config, 4096, CancelToken::new()).is_err());
}

#[cfg(unix)]
#[test]
fn test_silent_device_stops_on_cancel() {
    use serialport::SerialPort;
    use std::sync::mpsc;

    init_logging();
    // The master end stays open and never writes.
    let (_master, slave) = serialport::TTYPort::pair().unwrap();
    let path = slave.name().unwrap();
    drop(slave);

    let cancel = CancelToken::new();
    let config = SourceConfig::device(&path).with_read_timeout_ms(20);
    let byte_source = source::from_config(&config, 4096, cancel.clone()).unwrap();
    let mut session = Session::new(byte_source, Limits::default(), cancel.clone());

    let (done_tx, done_rx) = mpsc::channel();
    let runner = thread::spawn(move || {
        let mut sink = MemorySink::new(1);
        let summary = session.run(&mut sink);
        let _ = done_tx.send(());
        summary
    });

    thread::sleep(Duration::from_millis(50));
    cancel.cancel();
    assert!(
        done_rx.recv_timeout(Duration::from_secs(2)).is_ok(),
        "session kept blocking on {} after cancel",
        path
    );
    let summary = runner.join().unwrap().unwrap();
    assert_eq!(summary.outcome, SessionOutcome::Cancelled);
    assert_eq!(summary.frames, 0);
}

#[test]
fn test_shipped_config_parses() {
    let config = sensor_stream::Config::from_file(std::path::Path::new("config/default.toml")).unwrap();
    config.validate().unwrap();
    assert_eq!(config.limits, Limits::default());
}
