//! Image decoding and normalization into ViT input tensors

use candle_core::{Device, Tensor};
use image::imageops::FilterType;
use image::RgbImage;
use scarycat_core::BackendError;

/// Decode encoded image bytes and resize to a `size` x `size` RGB image
pub fn decode_and_resize(image: &[u8], size: u32) -> Result<RgbImage, BackendError> {
    let decoded = image::load_from_memory(image)
        .map_err(|e| BackendError::wrap("cannot decode image", e))?;
    Ok(decoded
        .resize_exact(size, size, FilterType::Triangle)
        .to_rgb8())
}

/// Planar CHW floats, each channel scaled to [0, 1] then normalized
pub fn to_chw(rgb: &RgbImage, mean: f32, std: f32) -> Vec<f32> {
    let plane = (rgb.width() * rgb.height()) as usize;
    let mut data = vec![0f32; 3 * plane];

    for (i, pixel) in rgb.pixels().enumerate() {
        for channel in 0..3 {
            let value = pixel[channel] as f32 / 255.0;
            data[channel * plane + i] = (value - mean) / std;
        }
    }
    data
}

/// Batch-of-one input tensor of shape (1, 3, size, size)
pub fn image_tensor(
    image: &[u8],
    size: usize,
    mean: f32,
    std: f32,
    device: &Device,
) -> Result<Tensor, BackendError> {
    let rgb = decode_and_resize(image, size as u32)?;
    let data = to_chw(&rgb, mean, std);
    Tensor::from_vec(data, (1, 3, size, size), device)
        .map_err(|e| BackendError::wrap("cannot build input tensor", e))
}
