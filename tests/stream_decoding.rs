mod common;

use common::{assert_same_content, init_logging, noisy_stream};
use sensor_stream::session::{Acquired, Session, SessionOutcome};
use sensor_stream::sink::{FrameSink, MemorySink};
use sensor_stream::source::{ReaderSource, ScriptedSource};
use sensor_stream::{AppError, CancelToken, DecodeError, Limits};
use std::io::Cursor;
use std::thread;
use std::time::Duration;

#[test]
fn test_noisy_capture_decodes_every_frame() {
    init_logging();
    let stream = noisy_stream(7, 25);
    let source = ReaderSource::new(Cursor::new(stream.bytes.clone()), "capture");
    let mut session = Session::new(source, Limits::default(), CancelToken::new());
    let mut sink = MemorySink::new(64);

    let summary = session.run(&mut sink).unwrap();

    assert_eq!(summary.outcome, SessionOutcome::SourceClosed);
    assert_eq!(summary.frames, 25);
    assert_eq!(summary.advisory_lines, stream.advisory_lines);
    assert_eq!(summary.resyncs, stream.garbage_lines);
    assert_eq!(summary.overwritten_slots, 0);

    let decoded: Vec<_> = sink.frames().iter().collect();
    assert_eq!(decoded.len(), stream.frames.len());
    for (index, (actual, expected)) in decoded.iter().zip(&stream.frames).enumerate() {
        assert_eq!(actual.sequence, index as u64 + 1);
        assert_same_content(actual, expected);
    }
}

#[test]
fn test_fragmented_delivery_with_timeouts() {
    init_logging();
    let stream = noisy_stream(11, 6);
    let mut source = ScriptedSource::new().with_max_chunk(3);
    for chunk in stream.bytes.chunks(7) {
        source = source.bytes(chunk.to_vec()).idle();
    }
    let mut session = Session::new(source, Limits::default(), CancelToken::new());
    let mut sink = MemorySink::new(16);

    let summary = session.run(&mut sink).unwrap();

    assert_eq!(summary.frames, 6);
    for (actual, expected) in sink.frames().iter().zip(&stream.frames) {
        assert_same_content(actual, expected);
    }
}

#[test]
fn test_frame_limit_stops_early() {
    let stream = noisy_stream(3, 10);
    let source = ReaderSource::new(Cursor::new(stream.bytes), "capture");
    let mut session =
        Session::new(source, Limits::default(), CancelToken::new()).with_max_frames(Some(4));
    let mut sink = MemorySink::new(16);

    let summary = session.run(&mut sink).unwrap();

    assert_eq!(summary.outcome, SessionOutcome::FrameLimit);
    assert_eq!(sink.frames().len(), 4);
}

#[test]
fn test_next_frame_pull_api() {
    let stream = noisy_stream(5, 2);
    let source = ReaderSource::new(Cursor::new(stream.bytes), "capture");
    let mut session = Session::new(source, Limits::default(), CancelToken::new());

    let mut frames = Vec::new();
    loop {
        match session.next_frame().unwrap() {
            Acquired::Frame(frame) => frames.push(frame),
            Acquired::End(outcome) => {
                assert_eq!(outcome, SessionOutcome::SourceClosed);
                break;
            }
        }
    }
    assert_eq!(frames.len(), 2);
    assert_same_content(&frames[1], &stream.frames[1]);
}

#[test]
fn test_truncated_capture_is_reported() {
    let mut bytes = noisy_stream(9, 1).bytes;
    // Device disconnects five bytes into a 16 byte image payload.
    bytes.extend_from_slice(b"image:image,4,4,1,0,\n");
    bytes.extend_from_slice(&[0u8; 5]);
    let source = ReaderSource::new(Cursor::new(bytes), "capture");
    let mut session = Session::new(source, Limits::default(), CancelToken::new());
    let mut sink = MemorySink::new(4);

    let err = session.run(&mut sink).unwrap_err();
    assert!(matches!(
        err,
        AppError::Decode(DecodeError::TruncatedPayload {
            expected: 16,
            received: 5,
            ..
        })
    ));
    assert_eq!(sink.frames().len(), 1);
}

#[test]
fn test_oversized_declaration_is_rejected() {
    let bytes = b"image:image,4096,4096,1,0,\n".to_vec();
    let source = ReaderSource::new(Cursor::new(bytes), "capture");
    let mut session = Session::new(source, Limits::default(), CancelToken::new());

    let err = session.run(&mut MemorySink::new(1)).unwrap_err();
    assert!(matches!(
        err,
        AppError::Decode(DecodeError::LimitExceeded { .. })
    ));
}

#[test]
fn test_cancel_from_another_thread() {
    let cancel = CancelToken::new();
    let source = ScriptedSource::new()
        .bytes(b"image:image,1,1,1,0,\n\x01\n".to_vec())
        .idle_when_exhausted()
        .with_cancel(cancel.clone());
    let mut session = Session::new(source, Limits::default(), cancel.clone());

    let canceller = {
        let cancel = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            cancel.cancel();
        })
    };
    let mut sink = MemorySink::new(1);
    let summary = session.run(&mut sink).unwrap();
    canceller.join().unwrap();

    assert_eq!(summary.outcome, SessionOutcome::Cancelled);
    assert_eq!(summary.frames, 0);
}

#[test]
fn test_independent_sessions_run_in_parallel() {
    let handles: Vec<_> = [21u64, 22]
        .into_iter()
        .map(|seed| {
            thread::spawn(move || {
                let stream = noisy_stream(seed, 8);
                let source = ReaderSource::new(Cursor::new(stream.bytes.clone()), format!("device-{}", seed));
                let mut session = Session::new(source, Limits::default(), CancelToken::new());
                let mut sink = MemorySink::new(16);
                let summary = session.run(&mut sink).unwrap();
                sink.finish().unwrap();
                (summary.frames, sink.frames().len(), stream.frames.len())
            })
        })
        .collect();

    for handle in handles {
        let (frames, kept, expected) = handle.join().unwrap();
        assert_eq!(frames as usize, expected);
        assert_eq!(kept, expected);
    }
}
