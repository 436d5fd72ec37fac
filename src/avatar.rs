//! Avatar intake: multipart upload, file checks and normalization to a
//! fixed-size PNG.

use std::io::Cursor;

use actix_multipart::Multipart;
use futures::StreamExt;
use image::{imageops::FilterType, ImageFormat};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

/// Upload size cap in bytes.
pub const MAX_AVATAR_BYTES: usize = 1_000_000;
/// Stored avatars are square PNGs of this edge length.
pub const AVATAR_DIMENSION: u32 = 250;
/// Multipart field carrying the file.
pub const AVATAR_FIELD: &str = "avatar";

lazy_static! {
    static ref IMAGE_FILENAME: Regex = Regex::new(r"(?i)\.(jpg|jpeg|png)$").unwrap();
}

pub fn check_filename(filename: &str) -> Result<(), AppError> {
    if IMAGE_FILENAME.is_match(filename) {
        Ok(())
    } else {
        Err(AppError::BadRequest(
            "Please upload an image of type (jpg, jpeg or png)".into(),
        ))
    }
}

/// Decodes the upload and re-encodes it as a `250x250` PNG, cropping to fill.
pub fn normalize(bytes: &[u8]) -> Result<Vec<u8>, AppError> {
    let image = image::load_from_memory(bytes)?;
    let resized = image.resize_to_fill(AVATAR_DIMENSION, AVATAR_DIMENSION, FilterType::Lanczos3);

    let mut out = Cursor::new(Vec::new());
    resized.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Pulls the `avatar` file out of a multipart body.
///
/// Other fields are skipped. The size cap is enforced while streaming, so an
/// oversized upload is rejected without buffering all of it.
pub async fn read_upload(mut payload: Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(field) = payload.next().await {
        let mut field = field?;

        let disposition = field.content_disposition();
        if disposition.get_name() != Some(AVATAR_FIELD) {
            continue;
        }
        let filename = disposition.get_filename().unwrap_or_default().to_string();
        check_filename(&filename)?;

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if data.len() + chunk.len() > MAX_AVATAR_BYTES {
                return Err(AppError::BadRequest("File too large".into()));
            }
            data.extend_from_slice(&chunk);
        }
        return Ok(data);
    }

    Err(AppError::BadRequest("Please upload an avatar image".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_check_filename() {
        assert!(check_filename("me.png").is_ok());
        assert!(check_filename("me.jpg").is_ok());
        assert!(check_filename("me.JPEG").is_ok());
        assert!(check_filename("me.gif").is_err());
        assert!(check_filename("png").is_err());
        assert!(check_filename("me.png.exe").is_err());
        assert!(check_filename("").is_err());
    }

    #[test]
    fn test_normalize_resizes_to_square_png() {
        let out = normalize(&png(600, 300)).unwrap();

        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (AVATAR_DIMENSION, AVATAR_DIMENSION));
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert!(matches!(
            normalize(b"definitely not an image"),
            Err(AppError::BadRequest(_))
        ));
    }
}
