use std::io::Cursor;

use super::*;

fn encode_png(width: u32, height: u32, rgba: Vec<u8>) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(width, height, rgba).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_png_keeps_straight_alpha() {
    let png = encode_png(2, 1, vec![100, 50, 200, 128, 0, 0, 0, 0]);
    let bmp = decode_bitmap(&png).unwrap();
    assert_eq!((bmp.width, bmp.height), (2, 1));
    assert_eq!(bmp.rgba_at(0), [100, 50, 200, 128]);
    assert_eq!(bmp.rgb_at(0), Rgb::new(100, 50, 200));
    assert_eq!(bmp.alpha_at(1), 0);
}

#[test]
fn decode_garbage_fails() {
    assert!(decode_bitmap(b"not an image").is_err());
}

#[test]
fn new_checks_buffer_length() {
    assert!(RgbaBitmap::new(2, 2, vec![0; 16]).is_ok());
    let err = RgbaBitmap::new(2, 2, vec![0; 15]).unwrap_err();
    assert!(matches!(err, PlacerError::Geometry(_)));
}

#[test]
fn put_overwrites_one_pixel() {
    let mut bmp = RgbaBitmap::filled(3, 1, [9, 9, 9, 255]);
    bmp.put(1, [1, 2, 3, 4]);
    assert_eq!(bmp.rgba_at(0), [9, 9, 9, 255]);
    assert_eq!(bmp.rgba_at(1), [1, 2, 3, 4]);
    assert_eq!(bmp.row_bytes(), 12);
}
