// THEORY:
// The `mask` module is the per-image unit of work. Given one input path it
// decodes the image, thresholds every pixel through `bright_pixel`, persists the
// resulting single-channel mask next to the input, and reports how many pixels
// were bright.
//
// Key architectural principles:
// 1.  **Self-Contained**: `process_image` touches nothing but its own input file
//     and its own output file. It is safe to run any number of them in parallel.
// 2.  **Never Throws Past the Image**: Every failure (decode, directory creation,
//     encode) is folded into a `MaskResult::Failure`, so the caller only ever
//     sees a result, never an error that could end the batch.
// 3.  **Explicit Outcome**: A genuinely dark image is `Success` with a count of
//     zero. A broken one is `Failure`. The two are never conflated.

use crate::core_modules::bright_pixel::bright_pixel::{MASK_ON, mask_value};
use crate::core_modules::utils::image_helper::image_helper::save_mask;
use crate::error::{MaskError, Result};
use image::{DynamicImage, GrayImage, ImageBuffer, ImageReader, Luma, Pixel};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Name of the output directory created beside the inputs.
pub const MASK_DIR_NAME: &str = "masks";
/// Appended to the input stem to name the mask file.
pub const MASK_FILE_SUFFIX: &str = "_mask.png";

/// The outcome of processing one image.
#[derive(Debug)]
pub enum MaskResult {
    Success { path: PathBuf, bright_pixels: u64 },
    Failure { path: PathBuf, reason: MaskError },
}

impl MaskResult {
    pub fn path(&self) -> &Path {
        match self {
            MaskResult::Success { path, .. } | MaskResult::Failure { path, .. } => path,
        }
    }

    /// Contribution to the batch total. Failures contribute zero.
    pub fn bright_pixels(&self) -> u64 {
        match self {
            MaskResult::Success { bright_pixels, .. } => *bright_pixels,
            MaskResult::Failure { .. } => 0,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MaskResult::Success { .. })
    }
}

/// A computed mask and the number of pixels set to `MASK_ON`.
#[derive(Debug, Clone)]
pub struct Mask {
    pub image: GrayImage,
    pub bright_pixels: u64,
}

/// Thresholds an image over all of its channels.
///
/// 8-bit layouts are used as decoded. Deeper layouts are first converted to the
/// 8-bit layout with the same channels, so alpha is kept wherever it exists.
pub fn build_mask(image: &DynamicImage) -> Mask {
    match image {
        DynamicImage::ImageLuma8(buffer) => threshold_buffer(buffer),
        DynamicImage::ImageLumaA8(buffer) => threshold_buffer(buffer),
        DynamicImage::ImageRgb8(buffer) => threshold_buffer(buffer),
        DynamicImage::ImageRgba8(buffer) => threshold_buffer(buffer),
        other => {
            let color = other.color();
            match (color.has_color(), color.has_alpha()) {
                (false, false) => threshold_buffer(&other.to_luma8()),
                (false, true) => threshold_buffer(&other.to_luma_alpha8()),
                (true, false) => threshold_buffer(&other.to_rgb8()),
                (true, true) => threshold_buffer(&other.to_rgba8()),
            }
        }
    }
}

fn threshold_buffer<P>(buffer: &ImageBuffer<P, Vec<u8>>) -> Mask
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = buffer.dimensions();
    let mut image = GrayImage::new(width, height);
    let mut bright_pixels = 0u64;

    for (source, target) in buffer.pixels().zip(image.pixels_mut()) {
        let value = mask_value(source.channels());
        if value == MASK_ON {
            bright_pixels += 1;
        }
        *target = Luma([value]);
    }

    Mask {
        image,
        bright_pixels,
    }
}

/// `<parent>/masks/<stem>_mask.png` for an input at `<parent>/<stem>.<ext>`.
pub fn mask_output_path(input: &Path) -> Result<PathBuf> {
    let stem = input.file_stem().ok_or_else(|| MaskError::InvalidFileName {
        path: input.to_path_buf(),
    })?;
    let parent = input.parent().unwrap_or_else(|| Path::new(""));

    let mut file_name = stem.to_os_string();
    file_name.push(MASK_FILE_SUFFIX);

    Ok(parent.join(MASK_DIR_NAME).join(file_name))
}

/// Decodes an image, sniffing the format from its content before trusting the
/// extension.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let open_error = |source| MaskError::Open {
        path: path.to_path_buf(),
        source,
    };

    ImageReader::open(path)
        .map_err(open_error)?
        .with_guessed_format()
        .map_err(open_error)?
        .decode()
        .map_err(|source| MaskError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

/// Writes the mask for `input`, creating the `masks` directory if needed.
/// Returns the path written.
pub fn write_mask(input: &Path, mask: &GrayImage) -> Result<PathBuf> {
    let output = mask_output_path(input)?;

    if let Some(mask_dir) = output.parent() {
        fs::create_dir_all(mask_dir).map_err(|source| MaskError::CreateMaskDir {
            path: mask_dir.to_path_buf(),
            source,
        })?;
    }

    save_mask(&output, mask).map_err(|source| MaskError::Encode {
        path: output.clone(),
        source,
    })?;

    Ok(output)
}

fn mask_image(path: &Path) -> Result<u64> {
    let image = load_image(path)?;
    let mask = build_mask(&image);
    write_mask(path, &mask.image)?;
    Ok(mask.bright_pixels)
}

/// Runs the full per-image algorithm and logs the outcome.
pub fn process_image(path: &Path) -> MaskResult {
    match mask_image(path) {
        Ok(bright_pixels) => {
            info!("Processed {}: {} bright pixels", path.display(), bright_pixels);
            MaskResult::Success {
                path: path.to_path_buf(),
                bright_pixels,
            }
        }
        Err(reason) => {
            error!("Failed to process image {}: {}", path.display(), reason);
            MaskResult::Failure {
                path: path.to_path_buf(),
                reason,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, LumaA, Rgb, RgbImage, Rgba, RgbaImage};

    fn write_rgb(dir: &Path, name: &str, image: &RgbImage) -> PathBuf {
        let path = dir.join(name);
        image.save(&path).expect("Error Saving File.");
        path
    }

    #[test]
    fn single_white_pixel_scenario() {
        let mut rgb = RgbImage::from_pixel(2, 2, Rgb([100, 100, 100]));
        rgb.put_pixel(0, 0, Rgb([255, 255, 255]));

        let mask = build_mask(&DynamicImage::ImageRgb8(rgb));

        assert_eq!(mask.bright_pixels, 1);
        assert_eq!(mask.image.as_raw(), &vec![255, 0, 0, 0]);
    }

    #[test]
    fn all_dark_image_is_all_zero() {
        let rgb = RgbImage::from_pixel(5, 4, Rgb([200, 200, 200]));
        let mask = build_mask(&DynamicImage::ImageRgb8(rgb));

        assert_eq!(mask.bright_pixels, 0);
        assert!(mask.image.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn all_bright_image_counts_every_pixel() {
        let rgb = RgbImage::from_pixel(5, 4, Rgb([201, 250, 255]));
        let mask = build_mask(&DynamicImage::ImageRgb8(rgb));

        assert_eq!(mask.bright_pixels, 20);
        assert!(mask.image.pixels().all(|p| p.0[0] == 255));
        assert_eq!(mask.image.dimensions(), (5, 4));
    }

    #[test]
    fn one_dim_channel_turns_pixel_off() {
        let mut rgb = RgbImage::from_pixel(3, 1, Rgb([255, 255, 255]));
        rgb.put_pixel(0, 0, Rgb([199, 255, 255]));
        rgb.put_pixel(1, 0, Rgb([255, 150, 255]));

        let mask = build_mask(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(mask.image.as_raw(), &vec![0, 0, 255]);
        assert_eq!(mask.bright_pixels, 1);
    }

    #[test]
    fn alpha_is_part_of_the_rule() {
        let mut rgba = RgbaImage::from_pixel(2, 1, Rgba([255, 255, 255, 255]));
        rgba.put_pixel(1, 0, Rgba([255, 255, 255, 128]));

        let mask = build_mask(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(mask.image.as_raw(), &vec![255, 0]);
    }

    #[test]
    fn gray_alpha_layout() {
        let buffer = ImageBuffer::from_fn(2, 1, |x, _| {
            if x == 0 { LumaA([230u8, 255]) } else { LumaA([230u8, 10]) }
        });

        let mask = build_mask(&DynamicImage::ImageLumaA8(buffer));
        assert_eq!(mask.image.as_raw(), &vec![255, 0]);
    }

    #[test]
    fn sixteen_bit_input_is_scaled() {
        let buffer: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_fn(2, 1, |x, _| {
            if x == 0 { Luma([60_000u16]) } else { Luma([20_000u16]) }
        });

        let mask = build_mask(&DynamicImage::ImageLuma16(buffer));
        assert_eq!(mask.image.as_raw(), &vec![255, 0]);
    }

    #[test]
    fn output_path_sits_in_masks_dir() {
        let output = mask_output_path(Path::new("/data/photos/beach.JPG")).unwrap();
        assert_eq!(output, PathBuf::from("/data/photos/masks/beach_mask.png"));
    }

    #[test]
    fn output_path_keeps_inner_dots() {
        let output = mask_output_path(Path::new("/data/v1.2.final.png")).unwrap();
        assert_eq!(output, PathBuf::from("/data/masks/v1.2.final_mask.png"));
    }

    #[test]
    fn process_writes_mask_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        let mut rgb = RgbImage::from_pixel(2, 2, Rgb([100, 100, 100]));
        rgb.put_pixel(0, 0, Rgb([255, 255, 255]));
        let input = write_rgb(dir.path(), "scene.png", &rgb);

        let result = process_image(&input);

        assert!(result.is_success());
        assert_eq!(result.bright_pixels(), 1);
        let written = image::open(dir.path().join("masks").join("scene_mask.png"))
            .unwrap()
            .to_luma8();
        assert_eq!(written.as_raw(), &vec![255, 0, 0, 0]);
    }

    #[test]
    fn process_handles_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let rgb = RgbImage::from_pixel(8, 8, Rgb([255, 255, 255]));
        let input = write_rgb(dir.path(), "white.jpg", &rgb);

        let result = process_image(&input);

        assert_eq!(result.bright_pixels(), 64);
        assert!(dir.path().join("masks").join("white_mask.png").is_file());
    }

    #[test]
    fn corrupt_file_fails_without_mask() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.png");
        fs::write(&input, b"definitely not a png").unwrap();

        let result = process_image(&input);

        assert!(!result.is_success());
        assert_eq!(result.bright_pixels(), 0);
        assert!(!dir.path().join("masks").join("bad_mask.png").exists());
    }

    #[test]
    fn zero_byte_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.jpg");
        fs::write(&input, b"").unwrap();

        let result = process_image(&input);
        assert!(matches!(
            result,
            MaskResult::Failure {
                reason: MaskError::Decode { .. },
                ..
            }
        ));
    }

    #[test]
    fn vanished_file_fails_with_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = process_image(&dir.path().join("gone.png"));

        assert!(matches!(
            result,
            MaskResult::Failure {
                reason: MaskError::Open { .. },
                ..
            }
        ));
    }

    #[test]
    fn unwritable_mask_dir_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let rgb = RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]));
        let input = write_rgb(dir.path(), "blocked.png", &rgb);
        // A plain file where the directory should go.
        fs::write(dir.path().join("masks"), b"").unwrap();

        let result = process_image(&input);

        assert!(matches!(
            result,
            MaskResult::Failure {
                reason: MaskError::CreateMaskDir { .. },
                ..
            }
        ));
        assert_eq!(result.bright_pixels(), 0);
    }

    #[test]
    fn rerun_produces_identical_mask() {
        let dir = tempfile::tempdir().unwrap();
        let rgb = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 240]));
        let input = write_rgb(dir.path(), "gradient.png", &rgb);
        let output = dir.path().join("masks").join("gradient_mask.png");

        let first = process_image(&input).bright_pixels();
        let first_bytes = fs::read(&output).unwrap();
        let second = process_image(&input).bright_pixels();
        let second_bytes = fs::read(&output).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_bytes, second_bytes);
    }
}
