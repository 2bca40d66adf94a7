//! Camera buffer normalisation to packed RGB8.

use anyhow::{anyhow, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb24,
    Bgr24,
    Nv12,
}

pub fn normalize_to_rgb(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Vec<u8>> {
    match format {
        PixelFormat::Rgb24 => {
            check_packed_len(pixels, width, height, "RGB")?;
            Ok(pixels.to_vec())
        }
        PixelFormat::Bgr24 => {
            check_packed_len(pixels, width, height, "BGR")?;
            Ok(pixels
                .chunks_exact(3)
                .flat_map(|bgr| [bgr[2], bgr[1], bgr[0]])
                .collect())
        }
        PixelFormat::Nv12 => nv12_to_rgb(pixels, width, height),
    }
}

fn check_packed_len(pixels: &[u8], width: u32, height: u32, name: &str) -> Result<()> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(3))
        .ok_or_else(|| anyhow!("{} frame dimensions overflow", name))?;
    if pixels.len() != expected {
        return Err(anyhow!(
            "{} frame length mismatch: expected {}, got {}",
            name,
            expected,
            pixels.len()
        ));
    }
    Ok(())
}

fn nv12_to_rgb(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let w = width as usize;
    let h = height as usize;
    let y_plane = w
        .checked_mul(h)
        .ok_or_else(|| anyhow!("NV12 frame dimensions overflow"))?;
    let expected = y_plane
        .checked_add(y_plane / 2)
        .ok_or_else(|| anyhow!("NV12 frame dimensions overflow"))?;
    if pixels.len() != expected {
        return Err(anyhow!(
            "NV12 frame length mismatch: expected {}, got {}",
            expected,
            pixels.len()
        ));
    }

    let mut rgb = vec![0u8; y_plane * 3];
    for j in 0..h {
        for i in 0..w {
            let y = pixels[j * w + i] as f32;
            let uv_index = y_plane + (j / 2) * w + (i / 2) * 2;
            let u = pixels[uv_index] as f32 - 128.0;
            let v = pixels[uv_index + 1] as f32 - 128.0;

            let offset = (j * w + i) * 3;
            rgb[offset] = clamp_to_u8(y + 1.402_f32 * v);
            rgb[offset + 1] = clamp_to_u8(y - 0.344_136_f32 * u - 0.714_136_f32 * v);
            rgb[offset + 2] = clamp_to_u8(y + 1.772_f32 * u);
        }
    }

    Ok(rgb)
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
