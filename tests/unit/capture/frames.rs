use super::*;

fn png(w: u32, h: u32, shade: u8) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([shade, shade, shade, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn plan(frames: u64) -> FramePlan {
    // 10 fps: one frame per 100 ms plus the frame at t = 0.
    FramePlan::new(10, (frames - 1) * 100 + 50).unwrap()
}

#[test]
fn frames_are_named_with_six_digit_indices() {
    assert_eq!(frame_file_name(FrameIndex(0)), "frame_000000.png");
    assert_eq!(frame_file_name(FrameIndex(1234)), "frame_001234.png");
}

#[test]
fn writes_frames_and_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let mut w = FrameWriter::create(dir.path().join("frames"), plan(3)).unwrap();
    for i in 0..3u8 {
        let path = w
            .write_frame(FrameIndex(u64::from(i)), f64::from(i) * 100.0, &png(4, 2, i))
            .unwrap();
        assert!(path.exists());
    }
    assert_eq!(w.frame_size(), Some((4, 2)));
    let manifest = w.finish().unwrap();

    assert_eq!(manifest.frame_count, 3);
    assert_eq!((manifest.width, manifest.height), (4, 2));
    assert_eq!(manifest.frames[2].file, "frame_000002.png");
    assert_eq!(manifest.frames[2].t_ms, 200.0);
    assert_eq!(manifest.frames[0].sha256.len(), 64);
    assert_ne!(manifest.frames[0].sha256, manifest.frames[1].sha256);

    let reread = FrameManifest::read(&dir.path().join("frames")).unwrap();
    assert_eq!(reread, manifest);
}

#[test]
fn digest_matches_file_contents() {
    let dir = tempfile::tempdir().unwrap();
    let mut w = FrameWriter::create(dir.path(), plan(1)).unwrap();
    let bytes = png(2, 2, 9);
    let path = w.write_frame(FrameIndex(0), 0.0, &bytes).unwrap();
    let manifest = w.finish().unwrap();
    assert_eq!(std::fs::read(path).unwrap(), bytes);
    assert_eq!(manifest.frames[0].sha256, sha256_hex(&bytes));
}

#[test]
fn stale_frames_are_removed_but_other_files_kept() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("frame_000099.png"), b"old").unwrap();
    std::fs::write(dir.path().join(MANIFEST_FILE), b"{}").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

    let w = FrameWriter::create(dir.path(), plan(1)).unwrap();
    assert_eq!(w.written(), 0);
    assert!(!dir.path().join("frame_000099.png").exists());
    assert!(!dir.path().join(MANIFEST_FILE).exists());
    assert!(dir.path().join("notes.txt").exists());
}

#[test]
fn out_of_order_frame_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut w = FrameWriter::create(dir.path(), plan(3)).unwrap();
    let err = w.write_frame(FrameIndex(1), 100.0, &png(2, 2, 0)).unwrap_err();
    assert!(err.to_string().contains("out of order"));
}

#[test]
fn size_change_mid_sequence_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut w = FrameWriter::create(dir.path(), plan(2)).unwrap();
    w.write_frame(FrameIndex(0), 0.0, &png(2, 2, 0)).unwrap();
    let err = w.write_frame(FrameIndex(1), 100.0, &png(3, 2, 0)).unwrap_err();
    assert!(err.to_string().contains("3x2"));
}

#[test]
fn non_png_bytes_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut w = FrameWriter::create(dir.path(), plan(1)).unwrap();
    assert!(w.write_frame(FrameIndex(0), 0.0, b"not a png").is_err());
    assert!(!dir.path().join("frame_000000.png").exists());
}

#[test]
fn incomplete_sequence_fails_to_finish() {
    let dir = tempfile::tempdir().unwrap();
    let mut w = FrameWriter::create(dir.path(), plan(3)).unwrap();
    w.write_frame(FrameIndex(0), 0.0, &png(2, 2, 0)).unwrap();
    let err = w.finish().unwrap_err();
    assert!(err.to_string().contains("1 of 3"));
    assert!(!dir.path().join(MANIFEST_FILE).exists());
}

#[test]
fn pattern_points_into_the_frames_dir() {
    let dir = tempfile::tempdir().unwrap();
    let w = FrameWriter::create(dir.path(), plan(1)).unwrap();
    assert_eq!(w.pattern(), dir.path().join("frame_%06d.png"));
}
