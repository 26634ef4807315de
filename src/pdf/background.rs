use image::imageops::FilterType;
use image::{load_from_memory, DynamicImage, GenericImageView};
use png::{BitDepth as PngBitDepth, ColorType as PngColorType, Encoder as PngEncoder};

use crate::error::{AppError, AppResult};

/// Longest edge kept for the background; A4 at 300 dpi.
const MAX_EDGE_PX: u32 = 3508;

pub struct Background {
    pub png: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

pub fn prepare(bytes: &[u8]) -> AppResult<Background> {
    let img = load_from_memory(bytes)
        .map_err(|e| AppError::internal(format!("template image decode failed: {}", e)))?;

    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(AppError::internal("template image has no pixels"));
    }

    let img = if w.max(h) > MAX_EDGE_PX {
        img.resize(MAX_EDGE_PX, MAX_EDGE_PX, FilterType::Lanczos3)
    } else {
        img
    };

    // genpdf cannot embed an alpha channel, so composite over white.
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut background = image::RgbaImage::from_pixel(w, h, image::Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut background, &rgba, 0, 0);
    let raw = DynamicImage::ImageRgba8(background).to_rgb8().into_raw();

    let mut png = Vec::new();
    {
        let mut encoder = PngEncoder::new(&mut png, w, h);
        encoder.set_color(PngColorType::Rgb);
        encoder.set_depth(PngBitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| AppError::internal(format!("png header write failed: {}", e)))?;
        writer
            .write_image_data(&raw)
            .map_err(|e| AppError::internal(format!("png write failed: {}", e)))?;
    }

    Ok(Background {
        png,
        width_px: w,
        height_px: h,
    })
}
