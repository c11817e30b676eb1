//! Fixtures shared by the unit tests: small images on disk, a JPEG carrying
//! an EXIF block, and shell scripts standing in for external tools.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};

pub fn write_rgba_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let image = RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 128, 200]));
    image.save(&path).unwrap();
    path
}

pub fn write_rgb_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    rgb_pattern(width, height).save(&path).unwrap();
    path
}

pub fn rgb_pattern(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| Rgb([(x * 7) as u8, (y * 13) as u8, ((x + y) * 3) as u8]))
}

/// PNG cut off inside its header
pub fn write_truncated_png(dir: &Path, name: &str) -> PathBuf {
    let source = write_rgb_png(dir, &format!("full-{}", name), 16, 16);
    let bytes = std::fs::read(&source).unwrap();
    std::fs::remove_file(&source).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, &bytes[..30]).unwrap();
    path
}

/// Baseline JPEG with an APP1 segment holding one IFD0 entry: Orientation = 6
pub fn jpeg_with_orientation_exif(width: u32, height: u32) -> Vec<u8> {
    let mut encoded = Vec::new();
    DynamicImage::ImageRgb8(rgb_pattern(width, height))
        .write_with_encoder(JpegEncoder::new_with_quality(&mut encoded, 90))
        .unwrap();

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II\x2a\x00");
    tiff.extend_from_slice(&8u32.to_le_bytes());
    tiff.extend_from_slice(&1u16.to_le_bytes());
    // tag 0x0112, type SHORT, count 1, value 6
    tiff.extend_from_slice(&0x0112u16.to_le_bytes());
    tiff.extend_from_slice(&3u16.to_le_bytes());
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&[6, 0, 0, 0]);
    tiff.extend_from_slice(&0u32.to_le_bytes());

    let mut app1 = vec![0xFF, 0xE1];
    let length = (2 + 6 + tiff.len()) as u16;
    app1.extend_from_slice(&length.to_be_bytes());
    app1.extend_from_slice(b"Exif\x00\x00");
    app1.extend_from_slice(&tiff);

    let mut out = Vec::with_capacity(encoded.len() + app1.len());
    out.extend_from_slice(&encoded[..2]);
    out.extend_from_slice(&app1);
    out.extend_from_slice(&encoded[2..]);
    out
}

/// Executable `/bin/sh` script standing in for an external tool
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Fake ffmpeg: logs its arguments, fails on missing inputs and on inputs containing "bad"
/// (after writing a partial output), sleeps on inputs containing "slow".
#[cfg(unix)]
pub fn write_fake_ffmpeg(dir: &Path) -> (PathBuf, PathBuf) {
    let log = dir.join("ffmpeg-args.log");
    let body = format!(
        r#"for last; do :; done
printf '%s\n' "$@" >> "{log}"
[ -e "$2" ] || {{ echo "$2: No such file or directory" >&2; exit 1; }}
case "$2" in
  *bad*) printf 'partial' > "$last"; echo "Invalid data found when processing input" >&2; exit 1 ;;
  *slow*) sleep 5 ;;
esac
printf 'remuxed' > "$last""#,
        log = log.display()
    );
    (write_script(dir, "ffmpeg", &body), log)
}

/// Names of the entries directly inside `dir`, sorted
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
