#![allow(dead_code)]

use chrono::Utc;
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sensor_stream::protocol::encoder::{encode_frame, DEFAULT_PRECISION};
use sensor_stream::{BoundingBox, Centroid, CentroidPoint, Frame, ImageFrame, Samples};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Multiples of 0.25 survive the device's two-decimal text encoding exactly.
fn quarter(rng: &mut StdRng, max: u32) -> f32 {
    rng.gen_range(0..=max * 4) as f32 / 4.0
}

pub fn random_image(rng: &mut StdRng, title: &str) -> ImageFrame {
    let width = rng.gen_range(1..=8);
    let height = rng.gen_range(1..=8);
    let depth = rng.gen_range(1..=6);
    let shape = (height, width, depth);
    let samples = if rng.gen_bool(0.5) {
        Samples::UInt8(Array3::from_shape_fn(shape, |_| rng.gen()))
    } else {
        Samples::Float32(Array3::from_shape_fn(shape, |_| rng.gen_range(-40.0f32..120.0)))
    };
    ImageFrame {
        title: title.to_string(),
        width,
        height,
        depth,
        samples,
        meta: format!("Crossed (L/R/T): {}/0/1, Present: {}", rng.gen_range(0..5), rng.gen_range(0..3)),
    }
}

pub fn random_frame(rng: &mut StdRng) -> Frame {
    let bboxes = (0..rng.gen_range(0..4))
        .map(|_| {
            let mut bbox = BoundingBox::new(quarter(rng, 32), quarter(rng, 24), quarter(rng, 8), quarter(rng, 8));
            if rng.gen_bool(0.5) {
                bbox.confidence = Some(quarter(rng, 1));
                bbox.class_id = Some(rng.gen_range(0..3));
            }
            bbox
        })
        .collect();
    let centroids = (0..rng.gen_range(0..4))
        .map(|_| {
            let current = CentroidPoint::new(quarter(rng, 32), quarter(rng, 24), rng.gen_range(1..5));
            if rng.gen_bool(0.5) {
                Centroid::Tracked {
                    current,
                    previous: CentroidPoint::new(quarter(rng, 32), quarter(rng, 24), rng.gen_range(1..5)),
                    dist_squared: quarter(rng, 16),
                }
            } else {
                Centroid::Bare(current)
            }
        })
        .collect();
    Frame {
        sequence: 0,
        received_at: Utc::now(),
        image: random_image(rng, "image"),
        heatmap: random_image(rng, "heatmap"),
        bboxes,
        centroids,
    }
}

/// Encoded frames with device chatter and undecodable bytes between them.
pub struct NoisyStream {
    pub bytes: Vec<u8>,
    pub frames: Vec<Frame>,
    pub advisory_lines: u64,
    pub garbage_lines: u64,
}

pub fn noisy_stream(seed: u64, count: usize) -> NoisyStream {
    let mut rng = rng(seed);
    let mut stream = NoisyStream {
        bytes: Vec::new(),
        frames: Vec::new(),
        advisory_lines: 0,
        garbage_lines: 0,
    };
    for _ in 0..count {
        if rng.gen_bool(0.5) {
            stream.bytes.extend_from_slice(b"Init camera done\r\n");
            stream.advisory_lines += 1;
        }
        if rng.gen_bool(0.3) {
            stream.bytes.extend_from_slice(&[0xff, 0xfe, 0x80, 0x01, b'\n']);
            stream.garbage_lines += 1;
        }
        let frame = random_frame(&mut rng);
        stream.bytes.extend(encode_frame(&frame, DEFAULT_PRECISION));
        stream.frames.push(frame);
    }
    stream
}

pub fn assert_same_content(actual: &Frame, expected: &Frame) {
    assert_eq!(actual.image, expected.image);
    assert_eq!(actual.heatmap, expected.heatmap);
    assert_eq!(actual.bboxes, expected.bboxes);
    assert_eq!(actual.centroids, expected.centroids);
}
