// Indexed image sources: GIF and palette PNG decoded to one byte per pixel

use image::ImageFormat;
use std::io::Cursor;
use std::path::Path;

use crate::video::VideoError;

/// Largest canvas a decoder will allocate (4096 x 4096)
pub const MAX_IMAGE_PIXELS: usize = 1 << 24;

/// Decoded indexed raster, one palette index per byte, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
    /// RGBA color table; `None` when the source has none
    pub palette: Option<Vec<[u8; 4]>>,
}

impl IndexedImage {
    pub fn new(width: usize, height: usize, pixels: Vec<u8>, palette: Option<Vec<[u8; 4]>>) -> Self {
        Self {
            width,
            height,
            pixels,
            palette,
        }
    }

    pub fn open(path: &Path) -> Result<Self, VideoError> {
        let data = std::fs::read(path)
            .map_err(|e| VideoError::unavailable(path.display().to_string(), e))?;
        Self::load_from_bytes(&data, &path.display().to_string())
    }

    /// Decode from memory; `name` is only used in error messages
    pub fn load_from_bytes(data: &[u8], name: &str) -> Result<Self, VideoError> {
        match image::guess_format(data) {
            Ok(ImageFormat::Gif) => Self::decode_gif(data, name),
            Ok(ImageFormat::Png) => Self::decode_png(data, name),
            Ok(other) => Err(VideoError::UnsupportedFormat(format!(
                "{}: {:?} images carry no indexed color table",
                name, other
            ))),
            Err(e) => Err(VideoError::unavailable(name, e)),
        }
    }

    fn decode_gif(data: &[u8], name: &str) -> Result<Self, VideoError> {
        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::Indexed);

        let mut decoder = options
            .read_info(Cursor::new(data))
            .map_err(|e| VideoError::unavailable(name, e))?;

        let width = decoder.width() as usize;
        let height = decoder.height() as usize;
        check_size(width, height, name)?;
        let global_palette = decoder.global_palette().map(|p| p.to_vec());

        let frame = decoder
            .read_next_frame()
            .map_err(|e| VideoError::unavailable(name, e))?
            .ok_or_else(|| VideoError::unavailable(name, "GIF has no frames"))?;

        // A local table on the first frame wins over the global one
        let table = frame.palette.clone().or(global_palette);
        let palette = table.map(|rgb| {
            rgb.chunks_exact(3)
                .enumerate()
                .map(|(index, c)| {
                    let alpha = if frame.transparent == Some(index as u8) { 0 } else { 255 };
                    [c[0], c[1], c[2], alpha]
                })
                .collect::<Vec<_>>()
        });

        // Place the first frame on a full-size canvas of index 0
        let mut pixels = vec![0u8; width * height];
        let (left, top) = (frame.left as usize, frame.top as usize);
        let frame_width = frame.width as usize;
        for (row, line) in frame.buffer.chunks(frame_width.max(1)).enumerate() {
            let y = top + row;
            if y >= height {
                break;
            }
            for (col, &index) in line.iter().enumerate() {
                let x = left + col;
                if x < width {
                    pixels[y * width + x] = index;
                }
            }
        }

        Ok(Self::new(width, height, pixels, palette))
    }

    fn decode_png(data: &[u8], name: &str) -> Result<Self, VideoError> {
        let mut decoder = png::Decoder::new(Cursor::new(data));
        decoder.set_transformations(png::Transformations::IDENTITY);

        let mut reader = decoder
            .read_info()
            .map_err(|e| VideoError::unavailable(name, e))?;

        let info = reader.info();
        if info.color_type != png::ColorType::Indexed {
            return Err(VideoError::UnsupportedFormat(format!(
                "{}: {:?} PNG has no indexed color table",
                name, info.color_type
            )));
        }

        let width = info.width as usize;
        let height = info.height as usize;
        check_size(width, height, name)?;
        let sample_bits = info.bit_depth as usize;
        let plte = info.palette.as_ref().map(|p| p.to_vec());
        let trns = info.trns.as_ref().map(|t| t.to_vec()).unwrap_or_default();

        let mut buf = vec![0; reader.output_buffer_size()];
        let output = reader
            .next_frame(&mut buf)
            .map_err(|e| VideoError::unavailable(name, e))?;

        let palette = plte.map(|rgb| {
            rgb.chunks_exact(3)
                .enumerate()
                .map(|(index, c)| [c[0], c[1], c[2], trns.get(index).copied().unwrap_or(255)])
                .collect::<Vec<_>>()
        });

        let mut pixels = Vec::with_capacity(width * height);
        for line in buf.chunks(output.line_size).take(height) {
            pixels.extend((0..width).map(|x| unpack_sample(line, x, sample_bits)));
        }

        Ok(Self::new(width, height, pixels, palette))
    }
}

fn check_size(width: usize, height: usize, name: &str) -> Result<(), VideoError> {
    match width.checked_mul(height) {
        Some(pixels) if pixels <= MAX_IMAGE_PIXELS => Ok(()),
        _ => Err(VideoError::UnsupportedFormat(format!(
            "{}: {}x{} exceeds the {} pixel limit",
            name, width, height, MAX_IMAGE_PIXELS
        ))),
    }
}

/// Sample `x` of a PNG scanline packed at `bits` per sample, MSB first
fn unpack_sample(line: &[u8], x: usize, bits: usize) -> u8 {
    if bits >= 8 {
        return line.get(x).copied().unwrap_or(0);
    }
    let bit = x * bits;
    let byte = line.get(bit / 8).copied().unwrap_or(0);
    let shift = 8 - bits - bit % 8;
    (byte >> shift) & ((1u8 << bits) - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_gif(width: u16, height: u16, pixels: &[u8], palette: &[u8], transparent: Option<u8>) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = gif::Encoder::new(&mut out, width, height, palette).unwrap();
            let mut frame = gif::Frame::from_indexed_pixels(width, height, pixels.to_vec(), transparent);
            frame.delay = 10;
            encoder.write_frame(&frame).unwrap();
        }
        out
    }

    fn encode_png(width: u32, height: u32, color: png::ColorType, depth: png::BitDepth, data: &[u8], palette: Option<&[u8]>, trns: Option<&[u8]>) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(color);
            encoder.set_depth(depth);
            if let Some(palette) = palette {
                encoder.set_palette(palette.to_vec());
            }
            if let Some(trns) = trns {
                encoder.set_trns(trns.to_vec());
            }
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(data).unwrap();
        }
        out
    }

    #[test]
    fn gif_keeps_indices_and_table() {
        let pixels: Vec<u8> = (0..16).map(|i| (i % 2) as u8).collect();
        let data = encode_gif(4, 4, &pixels, &[10, 20, 30, 40, 50, 60], Some(1));

        let image = IndexedImage::load_from_bytes(&data, "test.gif").unwrap();

        assert_eq!((image.width, image.height), (4, 4));
        assert_eq!(image.pixels, pixels);
        let palette = image.palette.unwrap();
        assert_eq!(palette[0], [10, 20, 30, 255]);
        assert_eq!(palette[1], [40, 50, 60, 0]);
    }

    #[test]
    fn oversized_gif_screen_is_refused_before_decoding() {
        let mut data = Vec::new();
        {
            let mut encoder = gif::Encoder::new(&mut data, 65535, 65535, &[0, 0, 0, 255, 255, 255]).unwrap();
            let frame = gif::Frame::from_indexed_pixels(1, 1, vec![1], None);
            encoder.write_frame(&frame).unwrap();
        }

        let err = IndexedImage::load_from_bytes(&data, "huge.gif").unwrap_err();
        assert!(matches!(err, VideoError::UnsupportedFormat(_)));
    }

    #[test]
    fn size_limit_boundary() {
        assert!(check_size(4096, 4096, "edge").is_ok());
        assert!(check_size(4097, 4096, "over").is_err());
        assert!(check_size(usize::MAX, 2, "overflow").is_err());
    }

    #[test]
    fn palette_png_unpacks_low_bit_samples() {
        // 4x1 at 2 bits: indices 3, 2, 1, 0 in one byte
        let data = encode_png(
            4,
            1,
            png::ColorType::Indexed,
            png::BitDepth::Two,
            &[0b11_10_01_00],
            Some(&[0, 0, 0, 255, 0, 0, 0, 255, 0, 0, 0, 255]),
            Some(&[0]),
        );

        let image = IndexedImage::load_from_bytes(&data, "test.png").unwrap();

        assert_eq!(image.pixels, vec![3, 2, 1, 0]);
        let palette = image.palette.unwrap();
        assert_eq!(palette.len(), 4);
        assert_eq!(palette[0], [0, 0, 0, 0]);
        assert_eq!(palette[1], [255, 0, 0, 255]);
        assert_eq!(palette[3], [0, 0, 255, 255]);
    }

    #[test]
    fn rgb_png_is_unsupported() {
        let data = encode_png(1, 1, png::ColorType::Rgb, png::BitDepth::Eight, &[1, 2, 3], None, None);
        let err = IndexedImage::load_from_bytes(&data, "rgb.png").unwrap_err();
        assert!(matches!(err, VideoError::UnsupportedFormat(_)));
    }

    #[test]
    fn garbage_is_unavailable() {
        let err = IndexedImage::load_from_bytes(b"not an image", "junk").unwrap_err();
        assert!(matches!(err, VideoError::SourceUnavailable { .. }));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let err = IndexedImage::open(Path::new("/nonexistent/retrovid.png")).unwrap_err();
        assert!(matches!(err, VideoError::SourceUnavailable { .. }));
    }

    #[test]
    fn sample_unpacking() {
        assert_eq!(unpack_sample(&[0b1000_0001], 0, 1), 1);
        assert_eq!(unpack_sample(&[0b1000_0001], 7, 1), 1);
        assert_eq!(unpack_sample(&[0b1000_0001], 3, 1), 0);
        assert_eq!(unpack_sample(&[0xAB], 1, 4), 0xB);
        assert_eq!(unpack_sample(&[7, 9], 1, 8), 9);
    }
}
