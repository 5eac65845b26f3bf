// THEORY:
// The `bright_pixel` module holds the single per-pixel rule the whole tool is
// built around. A pixel is "bright" when every one of its channels is strictly
// above a fixed threshold. It is deliberately a tiny, pure module: it knows
// nothing about files, image formats or masks, only about a slice of channel
// intensities.
//
// Key architectural principles:
// 1.  **Channel Agnostic**: The rule is evaluated over however many channels the
//     decoded pixel carries (gray, gray+alpha, RGB, RGBA). Nothing here assumes
//     three channels.
// 2.  **Binary Output**: The mask vocabulary is exactly two values, `MASK_ON`
//     and `MASK_OFF`, so downstream code can count bright pixels by comparing
//     against `MASK_ON`.

pub mod bright_pixel {
    pub type Channel = u8;
    pub type MaskValue = u8;

    /// Intensity every channel must strictly exceed.
    pub const BRIGHTNESS_THRESHOLD: Channel = 200;

    pub const MASK_ON: MaskValue = 255;
    pub const MASK_OFF: MaskValue = 0;

    /// Returns true iff every channel is strictly greater than the threshold.
    /// A pixel with no channels is never bright.
    pub fn is_bright(channels: &[Channel]) -> bool {
        !channels.is_empty() && channels.iter().all(|&c| c > BRIGHTNESS_THRESHOLD)
    }

    pub fn mask_value(channels: &[Channel]) -> MaskValue {
        if is_bright(channels) { MASK_ON } else { MASK_OFF }
    }
}
