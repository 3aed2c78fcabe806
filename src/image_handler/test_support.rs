//! 测试辅助：生成内存图片。

use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, Rgba};

pub(crate) fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        let r = (x % 255) as u8;
        let g = (y % 255) as u8;
        let b = ((x + y) % 255) as u8;
        Rgba([r, g, b, 255])
    });

    let dyn_img = DynamicImage::ImageRgba8(img);
    let mut cursor = Cursor::new(Vec::new());
    dyn_img
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("failed to encode test image");
    cursor.into_inner()
}

pub(crate) fn create_solid_png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = ImageBuffer::from_pixel(width, height, Rgb(color));

    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("failed to encode solid test image");
    cursor.into_inner()
}
