use image::imageops;
use image::RgbImage;

/// クロップ領域（正規化座標 0.0〜1.0）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropRegion {
    pub fn full() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.width >= 1.0 && self.height >= 1.0
    }

    /// クロップ内の正規化座標 → フレーム全体の正規化座標
    pub fn to_frame(&self, x: f32, y: f32) -> (f32, f32) {
        (self.x + x * self.width, self.y + y * self.height)
    }
}

/// BBox（ピクセル座標）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// BBoxからランドマーク推定用の正方形クロップ領域を計算
///
/// - BBoxを expand 倍に拡張（中心を保持）
/// - 長辺に合わせて正方形に
/// - フレーム境界にクリップし、整数ピクセルに揃える
pub fn square_region(bbox: &BBox, frame_w: u32, frame_h: u32, expand: f32) -> CropRegion {
    let fw = frame_w as f32;
    let fh = frame_h as f32;

    let cx = bbox.x + bbox.width / 2.0;
    let cy = bbox.y + bbox.height / 2.0;
    let side = bbox.width.max(bbox.height) * expand;

    // 左上・右下をフレーム境界にクリップ
    let x0 = (cx - side / 2.0).max(0.0).floor();
    let y0 = (cy - side / 2.0).max(0.0).floor();
    let x1 = (cx + side / 2.0).min(fw).ceil();
    let y1 = (cy + side / 2.0).min(fh).ceil();

    // 最低 1px は確保
    let x0 = x0.min(fw - 1.0).max(0.0);
    let y0 = y0.min(fh - 1.0).max(0.0);
    let w = (x1 - x0).max(1.0);
    let h = (y1 - y0).max(1.0);

    CropRegion {
        x: x0 / fw,
        y: y0 / fh,
        width: w / fw,
        height: h / fh,
    }
}

/// 正規化クロップ領域でフレームを切り出す
pub fn crop(image: &RgbImage, region: &CropRegion) -> RgbImage {
    let (fw, fh) = image.dimensions();
    let x = ((region.x * fw as f32).round() as u32).min(fw.saturating_sub(1));
    let y = ((region.y * fh as f32).round() as u32).min(fh.saturating_sub(1));
    let w = ((region.width * fw as f32).round() as u32).clamp(1, fw - x);
    let h = ((region.height * fh as f32).round() as u32).clamp(1, fh - y);
    imageops::crop_imm(image, x, y, w, h).to_image()
}
