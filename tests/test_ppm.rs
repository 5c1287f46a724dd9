// tests/test_ppm.rs — P6 codec against files on disk and the `image` decoder.

use std::io::Cursor;
use std::path::PathBuf;

use gaussblur::image::{Channels, PixelBuffer};
use gaussblur::ppm::{self, PpmError};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("gaussblur-{}-{name}", std::process::id()))
}

fn gradient(w: usize, h: usize) -> PixelBuffer {
    let mut img = PixelBuffer::new(w, h, Channels::Rgb);
    for y in 0..h {
        for x in 0..w {
            img.set_pixel(x, y, &[(x * 255 / w.max(1)) as u8, (y * 255 / h.max(1)) as u8, ((x ^ y) & 0xff) as u8]);
        }
    }
    img
}

#[test]
fn save_then_load_preserves_pixels() {
    let img = gradient(17, 9);
    let path = temp_path("round-trip.ppm");
    ppm::save(&img, &path).unwrap();
    let back = ppm::load(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(back, img);
}

#[test]
fn written_header_is_canonical() {
    let img = gradient(3, 2);
    let mut out = Vec::new();
    ppm::write_ppm(&img, &mut out).unwrap();
    let header = b"P6\n3 2\n255\n";
    assert_eq!(&out[..header.len()], header);
    assert_eq!(&out[header.len()..], img.as_bytes());
}

#[test]
fn output_decodes_with_image_crate() {
    let img = gradient(8, 5);
    let mut out = Vec::new();
    ppm::write_ppm(&img, &mut out).unwrap();
    let decoded = image::load_from_memory_with_format(&out, image::ImageFormat::Pnm)
        .unwrap()
        .to_rgb8();
    assert_eq!(decoded.dimensions(), (8, 5));
    assert_eq!(decoded.as_raw().as_slice(), img.as_bytes());
}

#[test]
fn reads_comment_between_header_fields() {
    let bytes = b"P6\n# creator\n2 1\n255\n\x00\x01\x02\x03\x04\x05";
    let img = ppm::read_ppm(&mut Cursor::new(&bytes[..])).unwrap();
    assert_eq!(img.pixel(1, 0), &[3, 4, 5]);
}

#[test]
fn rejects_ascii_pixmap() {
    let err = ppm::read_ppm(&mut Cursor::new(&b"P3\n1 1\n255\n0 0 0\n"[..])).unwrap_err();
    assert!(matches!(err, PpmError::BadMagic(_)));
}

#[test]
fn rejects_sixteen_bit_samples() {
    let err = ppm::read_ppm(&mut Cursor::new(&b"P6\n1 1\n65535\n\0\0\0\0\0\0"[..])).unwrap_err();
    assert!(matches!(err, PpmError::BadMaxValue(65535)));
}

#[test]
fn missing_file_is_io_error() {
    let err = ppm::load(temp_path("does-not-exist.ppm")).unwrap_err();
    assert!(matches!(err, PpmError::Io(_)));
}
