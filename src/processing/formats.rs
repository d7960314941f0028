//! The single supported codec: JPEG in, JPEG out

use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use crate::config::SizeTarget;
use crate::error::Result;

/// Extension written on every output file
pub const OUTPUT_EXTENSION: &str = "jpg";

/// Get supported input extensions
pub fn supported_input_formats() -> &'static [&'static str] {
    &["jpg", "jpeg"]
}

/// Check if a file extension is supported for input
pub fn is_supported_input_format(extension: &str) -> bool {
    supported_input_formats()
        .iter()
        .any(|&fmt| fmt.eq_ignore_ascii_case(extension))
}

/// Check whether a path names a candidate source image
pub fn is_source_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(is_supported_input_format)
}

/// File stem used to name every variant of a source (`a.jpg` -> `a`)
pub fn base_name<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Output file name for one (source, size) pair: `<base>_<size>.jpg`
pub fn output_file_name(base_name: &str, size: SizeTarget) -> String {
    format!("{}_{}.{}", base_name, size, OUTPUT_EXTENSION)
}

/// Decode JPEG bytes. Runs on the blocking pool.
pub fn decode_jpeg(data: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)?;
    Ok(image)
}

/// Encode `image` as JPEG into `writer`. Runs on the blocking pool.
pub fn encode_jpeg<W: Write>(image: &DynamicImage, writer: W, quality: u8) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    let encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
    image.write_with_encoder(encoder)?;
    writer.flush()?;
    Ok(())
}
