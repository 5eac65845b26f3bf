pub mod image_helper {
    use image::{GrayImage, ImageEncoder};
    use std::fs::File;
    use std::io::{BufWriter, Write};
    use std::path::Path;

    /// Encodes a single-channel mask as an 8-bit grayscale PNG, truncating any
    /// existing file at `path`.
    pub fn save_mask(path: &Path, mask: &GrayImage) -> Result<(), image::error::ImageError> {
        let mut output = BufWriter::new(File::create(path)?);
        let encoder = image::codecs::png::PngEncoder::new(&mut output);

        encoder.write_image(
            mask.as_raw(),
            mask.width(),
            mask.height(),
            image::ExtendedColorType::L8,
        )?;
        output.flush()?;

        Ok(())
    }
}
