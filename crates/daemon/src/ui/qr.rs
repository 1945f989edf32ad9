//! QR codes for the share URL.
//!
//! A phone on the same network can scan the code printed at startup instead
//! of typing the address. Output is either Unicode half blocks for the
//! terminal or a PNG image.

use std::io::Cursor;
use std::path::Path;

use image::{ImageBuffer, ImageFormat, Luma};
use qrcode::{Color, QrCode};

/// Size of each QR module in pixels for PNG output.
const PNG_MODULE_SIZE: u32 = 8;

/// Quiet zone around the code, in modules.
const QUIET_ZONE: usize = 4;

/// A QR code encoding one share URL.
pub struct ShareCode {
    url: String,
    code: QrCode,
}

impl ShareCode {
    /// Encode `url`.
    ///
    /// # Errors
    /// Returns an error if the data does not fit in a QR code.
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let url = url.into();
        let code = QrCode::new(url.as_bytes())?;
        Ok(Self { url, code })
    }

    /// The encoded URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Width of the code in modules, without the quiet zone.
    pub fn width(&self) -> usize {
        self.code.width()
    }

    fn is_dark(&self, row: usize, col: usize) -> bool {
        let width = self.code.width();
        row < width && col < width && self.code[(col, row)] == Color::Dark
    }

    /// Render with half-block characters, two module rows per text line.
    ///
    /// With `inverted`, dark modules are drawn as blank cells on a block
    /// background, which reads better on dark terminal themes.
    pub fn to_terminal(&self, inverted: bool) -> String {
        let width = self.code.width();
        let span = width + 2 * QUIET_ZONE;
        let mut output = String::new();

        let mut row = 0;
        while row < span {
            for col in 0..span {
                let top = self.module_at(row, col);
                let bottom = row + 1 < span && self.module_at(row + 1, col);
                let (top, bottom) = if inverted {
                    (!top, !bottom)
                } else {
                    (top, bottom)
                };
                output.push(match (top, bottom) {
                    (true, true) => '\u{2588}',
                    (true, false) => '\u{2580}',
                    (false, true) => '\u{2584}',
                    (false, false) => ' ',
                });
            }
            output.push('\n');
            row += 2;
        }

        output
    }

    /// Module value at a position that includes the quiet zone.
    fn module_at(&self, row: usize, col: usize) -> bool {
        match (row.checked_sub(QUIET_ZONE), col.checked_sub(QUIET_ZONE)) {
            (Some(r), Some(c)) => self.is_dark(r, c),
            _ => false,
        }
    }

    /// Render as a black-on-white grayscale image.
    pub fn to_image(&self) -> ImageBuffer<Luma<u8>, Vec<u8>> {
        let span = (self.code.width() + 2 * QUIET_ZONE) as u32;
        let size = span * PNG_MODULE_SIZE;

        ImageBuffer::from_fn(size, size, |x, y| {
            let col = (x / PNG_MODULE_SIZE) as usize;
            let row = (y / PNG_MODULE_SIZE) as usize;
            if self.module_at(row, col) {
                Luma([0u8])
            } else {
                Luma([255u8])
            }
        })
    }

    /// Encode as PNG bytes.
    pub fn to_png_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.to_image()
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    /// Write a PNG file.
    pub fn save_png(&self, path: &Path) -> anyhow::Result<()> {
        self.to_image().save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}

/// Terminal rendering of a QR code for `url`.
pub fn generate_terminal_qr(url: &str) -> anyhow::Result<String> {
    Ok(ShareCode::new(url)?.to_terminal(false))
}

/// Write a PNG QR code for `url` to `path`.
pub fn generate_png_qr(url: &str, path: &Path) -> anyhow::Result<()> {
    ShareCode::new(url)?.save_png(path)
}

/// PNG bytes of a QR code for `url`.
pub fn generate_png_qr_bytes(url: &str) -> anyhow::Result<Vec<u8>> {
    ShareCode::new(url)?.to_png_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];
    const URL: &str = "http://192.168.1.20:5000";

    #[test]
    fn test_terminal_qr_generation() {
        let qr = generate_terminal_qr(URL).unwrap();
        let code = ShareCode::new(URL).unwrap();

        let lines: Vec<&str> = qr.lines().collect();
        let span = code.width() + 2 * QUIET_ZONE;
        assert_eq!(lines.len(), span.div_ceil(2));
        assert!(lines.iter().all(|l| l.chars().count() == span));
        assert!(qr.contains('\u{2588}') || qr.contains('\u{2580}') || qr.contains('\u{2584}'));

        // Quiet zone stays blank.
        assert!(lines[0].chars().all(|c| c == ' '));
    }

    #[test]
    fn test_terminal_qr_inverted() {
        let qr = ShareCode::new(URL).unwrap().to_terminal(true);
        let first = qr.lines().next().unwrap();
        assert!(first.chars().all(|c| c == '\u{2588}'));
    }

    #[test]
    fn test_png_qr_bytes_generation() {
        let bytes = generate_png_qr_bytes(URL).unwrap();
        assert!(bytes.starts_with(&PNG_HEADER));

        let code = ShareCode::new(URL).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        let expected = (code.width() + 2 * QUIET_ZONE) as u32 * PNG_MODULE_SIZE;
        assert_eq!(decoded.width(), expected);
        assert_eq!(decoded.height(), expected);
    }

    #[test]
    fn test_png_qr_generation() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("share.png");

        generate_png_qr(URL, &path).unwrap();

        let file_bytes = std::fs::read(&path).unwrap();
        assert!(file_bytes.starts_with(&PNG_HEADER));
    }

    #[test]
    fn test_png_corners_are_quiet_zone_and_finder() {
        let image = ShareCode::new(URL).unwrap().to_image();
        let zone = QUIET_ZONE as u32 * PNG_MODULE_SIZE;

        assert_eq!(image.get_pixel(0, 0), &Luma([255u8]));
        // Top-left finder pattern starts right after the quiet zone.
        assert_eq!(image.get_pixel(zone, zone), &Luma([0u8]));
    }

    #[test]
    fn test_share_code_keeps_url() {
        let code = ShareCode::new(URL).unwrap();
        assert_eq!(code.url(), URL);
        // Version 2 is 25 modules wide; a short URL fits in a small code.
        assert!(code.width() <= 33);
    }
}
