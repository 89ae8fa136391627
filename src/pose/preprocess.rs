use anyhow::{bail, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;

/// BlazePose ランドマークモデルの入力サイズ
pub const LANDMARK_INPUT_SIZE: u32 = 256;

/// レターボックス変換の情報（逆変換用）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxInfo {
    /// 元画像 1px あたりの入力ピクセル数
    pub scale_x: f32,
    pub scale_y: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub src_width: u32,
    pub src_height: u32,
}

impl LetterboxInfo {
    /// 入力ピクセル座標 → 元画像の正規化座標
    pub fn to_source(&self, x: f32, y: f32) -> (f32, f32) {
        let sx = (x - self.pad_x) / self.scale_x;
        let sy = (y - self.pad_y) / self.scale_y;
        (sx / self.src_width as f32, sy / self.src_height as f32)
    }
}

/// RGB画像をランドマークモデル用の入力テンソルに変換
///
/// - アスペクト比を保って size x size に収まるようリサイズ
/// - 余白は黒でパディング（中央寄せ）
/// - [1, size, size, 3] の f32 テンソル (0.0-1.0)
pub fn letterbox(image: &RgbImage, size: u32) -> Result<(Array4<f32>, LetterboxInfo)> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 || size == 0 {
        bail!("cannot letterbox {}x{} image into {}x{}", w, h, size, size);
    }

    let scale = (size as f32 / w as f32).min(size as f32 / h as f32);
    let new_w = ((w as f32 * scale).round() as u32).clamp(1, size);
    let new_h = ((h as f32 * scale).round() as u32).clamp(1, size);
    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);

    let pad_x = (size - new_w) / 2;
    let pad_y = (size - new_h) / 2;

    let s = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, s, s, 3));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let ty = (y + pad_y) as usize;
        let tx = (x + pad_x) as usize;
        for c in 0..3 {
            tensor[[0, ty, tx, c]] = pixel[c] as f32 / 255.0;
        }
    }

    let info = LetterboxInfo {
        scale_x: new_w as f32 / w as f32,
        scale_y: new_h as f32 / h as f32,
        pad_x: pad_x as f32,
        pad_y: pad_y as f32,
        src_width: w,
        src_height: h,
    };
    Ok((tensor, info))
}

/// RGB画像を NCHW [1, 3, size, size] テンソルに変換（アスペクト比は保たない）
pub fn to_nchw(image: &RgbImage, size: u32) -> Array4<f32> {
    let resized = imageops::resize(image, size, size, FilterType::Triangle);
    let s = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, s, s));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }
    tensor
}
