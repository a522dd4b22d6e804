use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum FrameError {
    #[error("frame has zero width or height ({width}x{height})")]
    Empty { width: u32, height: u32 },
    #[error("frame buffer is {got} bytes, expected {expected} for {width}x{height} RGB")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        got: usize,
    },
}

/// A single RGB8 video frame at the camera's native resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Row-major packed RGB, `width * height * 3` bytes.
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::Empty { width, height });
        }
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(FrameError::BufferSize {
                width,
                height,
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Uniform frame filled with one colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self, FrameError> {
        let pixels = width as usize * height as usize;
        let data = rgb.iter().copied().cycle().take(pixels * 3).collect();
        Self::new(width, height, data)
    }

    pub fn from_rgb_image(img: RgbImage) -> Result<Self, FrameError> {
        let (width, height) = img.dimensions();
        Self::new(width, height, img.into_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_buffer_size() {
        let err = Frame::new(2, 2, vec![0; 11]).unwrap_err();
        assert_eq!(
            err,
            FrameError::BufferSize {
                width: 2,
                height: 2,
                expected: 12,
                got: 11
            }
        );
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(
            Frame::new(0, 4, vec![]),
            Err(FrameError::Empty { .. })
        ));
    }

    #[test]
    fn test_solid_fills_every_pixel() {
        let f = Frame::solid(3, 2, [10, 20, 30]).unwrap();
        assert_eq!(f.data.len(), 18);
        assert!(f.data.chunks(3).all(|px| px == [10, 20, 30]));
    }

    #[test]
    fn test_from_rgb_image() {
        let img = RgbImage::from_pixel(4, 3, image::Rgb([1, 2, 3]));
        let f = Frame::from_rgb_image(img).unwrap();
        assert_eq!((f.width, f.height), (4, 3));
        assert_eq!(&f.data[..3], &[1, 2, 3]);
    }
}
