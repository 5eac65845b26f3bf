pub mod bright_pixel;
pub mod mask;
pub mod scanner;
pub mod utils;
