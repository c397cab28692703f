/// Integration tests for the pixel-sample handler.
///
/// Covers the RGB/RGBA transcoding round trips, the whole-sample length
/// guards, square reconstruction through PNG, and the all-or-nothing batch
/// behavior.
use std::sync::Arc;
use std::thread;

use fconv_core::{ErrorKind, FileRecord, FormatDescriptor, FormatHandler};
use fconv_handlers::{PixelSampleHandler, INTERNAL_PNG, INTERNAL_RGB, INTERNAL_RGBA};
use rstest::rstest;

// ── helpers ───────────────────────────────────────────────────────────────

fn ready_handler() -> PixelSampleHandler {
    let mut handler = PixelSampleHandler::new();
    handler.init().unwrap();
    handler
}

fn fmt(handler: &PixelSampleHandler, internal: &str) -> FormatDescriptor {
    handler.format(internal).unwrap().clone()
}

/// Deterministic bytes from a simple LCG.
fn pseudo_random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = seed;
    (0..len)
        .map(|_| {
            rng = rng
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (rng >> 56) as u8
        })
        .collect()
}

fn convert(
    handler: &PixelSampleHandler,
    files: &[FileRecord],
    from: &str,
    to: &str,
) -> Result<Vec<FileRecord>, fconv_core::ConvertError> {
    handler.do_convert(files, &fmt(handler, from), &fmt(handler, to))
}

// ── tests ──────────────────────────────────────────────────────────────────

#[test]
fn test_refuses_work_before_init() {
    let mut initialized = PixelSampleHandler::new();
    initialized.init().unwrap();
    let rgb = fmt(&initialized, INTERNAL_RGB);
    let rgba = fmt(&initialized, INTERNAL_RGBA);

    let handler = PixelSampleHandler::new();
    assert!(!handler.ready());
    assert!(handler.supported_formats().is_empty());
    let err = handler
        .do_convert(&[FileRecord::new("a.rgb", vec![1, 2, 3])], &rgb, &rgba)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotReady);
}

#[test]
fn test_init_is_idempotent() {
    let mut handler = ready_handler();
    let before = handler.supported_formats().to_vec();
    handler.init().unwrap();
    assert!(handler.ready());
    assert_eq!(handler.supported_formats(), before.as_slice());
}

#[test]
fn test_rgb_rgba_rgb_is_exact() {
    let handler = ready_handler();
    let rgb = pseudo_random_bytes(3 * 1000, 0xC0FFEE);
    let input = [FileRecord::new("noise.rgb", rgb.clone())];

    let rgba = convert(&handler, &input, INTERNAL_RGB, INTERNAL_RGBA).unwrap();
    assert_eq!(rgba.len(), 1);
    assert_eq!(rgba[0].name, "noise.rgba");
    assert_eq!(rgba[0].len(), rgb.len() / 3 * 4);

    let back = convert(&handler, &rgba, INTERNAL_RGBA, INTERNAL_RGB).unwrap();
    assert_eq!(back[0].name, "noise.rgb");
    assert_eq!(back[0].bytes, rgb, "RGB channels must survive the round trip");
}

#[test]
fn test_rgba_rgb_rgba_forces_opaque_alpha() {
    let handler = ready_handler();
    let rgba = pseudo_random_bytes(4 * 257, 7);
    let input = [FileRecord::new("sprite.rgba", rgba.clone())];

    let rgb = convert(&handler, &input, INTERNAL_RGBA, INTERNAL_RGB).unwrap();
    let back = convert(&handler, &rgb, INTERNAL_RGB, INTERNAL_RGBA).unwrap();

    assert_eq!(back[0].len(), rgba.len());
    for (orig, px) in rgba.chunks_exact(4).zip(back[0].bytes.chunks_exact(4)) {
        assert_eq!(&orig[..3], &px[..3]);
        assert_eq!(px[3], 0xFF);
    }
}

#[rstest]
#[case(INTERNAL_RGB, INTERNAL_RGBA, 1)]
#[case(INTERNAL_RGB, INTERNAL_RGBA, 4)]
#[case(INTERNAL_RGB, INTERNAL_RGBA, 3001)]
#[case(INTERNAL_RGBA, INTERNAL_RGB, 3)]
#[case(INTERNAL_RGBA, INTERNAL_RGB, 6)]
#[case(INTERNAL_RGBA, INTERNAL_PNG, 4 * 9 + 1)]
fn test_rejects_partial_samples(#[case] from: &str, #[case] to: &str, #[case] len: usize) {
    let handler = ready_handler();
    let input = [FileRecord::new("broken.raw", vec![0u8; len])];
    let err = convert(&handler, &input, from, to).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
    assert!(
        err.to_string().contains("not a whole number of samples"),
        "unexpected message: {err}"
    );
}

#[test]
fn test_perfect_square_round_trips_through_png() {
    let handler = ready_handler();
    let rgba = pseudo_random_bytes(4 * 16, 99);
    let input = [FileRecord::new("tile.rgba", rgba.clone())];

    let png = convert(&handler, &input, INTERNAL_RGBA, INTERNAL_PNG).unwrap();
    assert_eq!(png[0].name, "tile.png");
    assert!(png[0].bytes.starts_with(b"\x89PNG"));

    let back = convert(&handler, &png, INTERNAL_PNG, INTERNAL_RGBA).unwrap();
    assert_eq!(back[0].name, "tile.rgba");
    assert_eq!(back[0].bytes, rgba);
}

/// Ten pixels do not fill a square: the canvas is 4x4 and the six pixels past
/// the input are transparent black.
#[test]
fn test_non_square_pads_with_transparent_black() {
    let handler = ready_handler();
    let rgba: Vec<u8> = (1..=40).collect();
    let input = [FileRecord::new("ten.rgba", rgba.clone())];

    let png = convert(&handler, &input, INTERNAL_RGBA, INTERNAL_PNG).unwrap();
    let back = convert(&handler, &png, INTERNAL_PNG, INTERNAL_RGBA).unwrap();

    assert_eq!(back[0].len(), 4 * 4 * 4);
    assert_eq!(&back[0].bytes[..40], rgba.as_slice());
    assert!(back[0].bytes[40..].iter().all(|&b| b == 0));
}

#[test]
fn test_empty_rgba_cannot_be_rasterized() {
    let handler = ready_handler();
    let input = [FileRecord::new("empty.rgba", Vec::new())];
    let err = convert(&handler, &input, INTERNAL_RGBA, INTERNAL_PNG).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
}

#[test]
fn test_png_to_rgb_defers_to_image_codec() {
    let handler = ready_handler();
    let input = [FileRecord::new("a.png", b"\x89PNG".to_vec())];
    for (from, to) in [(INTERNAL_PNG, INTERNAL_RGB), (INTERNAL_RGB, INTERNAL_PNG)] {
        let err = convert(&handler, &input, from, to).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedConversion);
        assert!(err.to_string().contains("defer to general image codec"));
    }
}

#[test]
fn test_corrupt_png_is_engine_failure() {
    let handler = ready_handler();
    let input = [FileRecord::new("broken.png", b"\x89PNG not really".to_vec())];
    let err = convert(&handler, &input, INTERNAL_PNG, INTERNAL_RGBA).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EngineFailure);
    assert!(err.to_string().starts_with("broken.png"), "got: {err}");
}

#[test]
fn test_same_format_pair_is_rejected() {
    let handler = ready_handler();
    let input = [FileRecord::new("a.rgb", vec![1, 2, 3])];
    let err = convert(&handler, &input, INTERNAL_RGB, INTERNAL_RGB).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedConversion);
}

#[test]
fn test_undeclared_descriptors_are_rejected() {
    let handler = ready_handler();
    let rgba = fmt(&handler, INTERNAL_RGBA);
    let input = [FileRecord::new("a.rgb", vec![1, 2, 3])];

    let mut not_readable = fmt(&handler, INTERNAL_RGB);
    not_readable.from = false;
    let err = handler.do_convert(&input, &not_readable, &rgba).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedConversion);

    let mut foreign = fmt(&handler, INTERNAL_RGB);
    foreign.internal = "jpeg".to_string();
    let err = handler.do_convert(&input, &foreign, &rgba).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedConversion);
}

#[test]
fn test_malformed_file_aborts_whole_batch() {
    let handler = ready_handler();
    let files: Vec<FileRecord> = (0..5)
        .map(|i| {
            let len = if i == 2 { 7 } else { 9 };
            FileRecord::new(format!("frame{i}.rgb"), vec![i as u8; len])
        })
        .collect();

    let result = convert(&handler, &files, INTERNAL_RGB, INTERNAL_RGBA);
    let err = result.expect_err("third file is malformed; no outputs may be returned");
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
    assert!(err.to_string().starts_with("frame2.rgb"));
}

#[test]
fn test_batch_preserves_order_and_names() {
    let handler = ready_handler();
    let files: Vec<FileRecord> = (0..3)
        .map(|i| FileRecord::new(format!("frame{i}.rgb"), vec![i as u8; 6]))
        .collect();

    let out = convert(&handler, &files, INTERNAL_RGB, INTERNAL_RGBA).unwrap();
    let names: Vec<&str> = out.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["frame0.rgba", "frame1.rgba", "frame2.rgba"]);
    assert_eq!(out[1].bytes, vec![1, 1, 1, 0xFF, 1, 1, 1, 0xFF]);
    // inputs are untouched
    assert_eq!(files[1].bytes, vec![1u8; 6]);
}

/// The shared surface is locked per call, so concurrent calls with different
/// canvas sizes never see each other's pixels.
#[test]
fn test_concurrent_calls_share_one_surface_safely() {
    let handler = Arc::new(ready_handler());

    let workers: Vec<_> = (1..=8u64)
        .map(|side| {
            let handler = Arc::clone(&handler);
            thread::spawn(move || {
                let pixels = (side * side) as usize;
                let rgba = pseudo_random_bytes(pixels * 4, side);
                let input = [FileRecord::new(format!("{side}.rgba"), rgba.clone())];
                for _ in 0..10 {
                    let png = convert(&handler, &input, INTERNAL_RGBA, INTERNAL_PNG).unwrap();
                    let back = convert(&handler, &png, INTERNAL_PNG, INTERNAL_RGBA).unwrap();
                    assert_eq!(back[0].bytes, rgba);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
}
