//! Mask and geometry adapter: run-length codec, polygon rasterization,
//! mask IoU, and bounding-box convention conversion.
//!
//! Dense masks are column-major (Fortran order): pixel (x, y) is at index
//! `y + height * x`. Compressed counts use the COCO LEB128-like string
//! format, so masks round-trip against pycocotools output byte for byte.

use crate::error::{EvalError, Result};
use crate::types::Rle;

/// Bounding box in [x, y, width, height] format
pub type BBoxXYWH = [f64; 4];

/// Bounding box in [x1, y1, x2, y2] format
pub type BBoxXYXY = [f64; 4];

/// Convert bounding box from [x, y, width, height] to [x1, y1, x2, y2]
///
/// # Examples
///
/// ```
/// # use mask_eval::mask::xywh_to_xyxy;
/// let xywh = [10.0, 20.0, 30.0, 40.0];
/// let xyxy = xywh_to_xyxy(xywh);
/// assert_eq!(xyxy, [10.0, 20.0, 40.0, 60.0]);
/// ```
#[must_use]
pub fn xywh_to_xyxy(bbox: BBoxXYWH) -> BBoxXYXY {
    [bbox[0], bbox[1], bbox[0] + bbox[2], bbox[1] + bbox[3]]
}

/// Convert bounding box from [x1, y1, x2, y2] to [x, y, width, height]
///
/// # Examples
///
/// ```
/// # use mask_eval::mask::xyxy_to_xywh;
/// let xyxy = [10.0, 20.0, 40.0, 60.0];
/// let xywh = xyxy_to_xywh(xyxy);
/// assert_eq!(xywh, [10.0, 20.0, 30.0, 40.0]);
/// ```
#[must_use]
pub fn xyxy_to_xywh(bbox: BBoxXYXY) -> BBoxXYWH {
    [bbox[0], bbox[1], bbox[2] - bbox[0], bbox[3] - bbox[1]]
}

/// Encode a dense column-major binary mask into a compressed RLE.
///
/// `mask` length must equal `height * width`; any non-zero byte counts as
/// foreground.
pub fn encode(mask: &[u8], height: u32, width: u32) -> Result<Rle> {
    let n = (height as usize) * (width as usize);
    if mask.len() != n {
        return Err(EvalError::InvalidMask(format!(
            "mask length {} does not match {}x{}",
            mask.len(),
            height,
            width
        )));
    }

    let mut runs = Vec::new();
    let mut current: u8 = 0;
    let mut run: u32 = 0;
    for &v in mask {
        let v = u8::from(v != 0);
        if v != current {
            runs.push(run);
            run = 0;
            current = v;
        }
        run += 1;
    }
    runs.push(run);

    Ok(Rle {
        size: [height, width],
        counts: counts_to_string(&runs),
    })
}

/// Decode a compressed RLE to its dense column-major binary mask.
///
/// # Errors
///
/// Returns `InvalidMask` if the run lengths do not sum to `height * width`.
pub fn decode(rle: &Rle) -> Result<Vec<u8>> {
    let n = (rle.height() as usize) * (rle.width() as usize);
    let runs = counts_from_string(&rle.counts)?;

    let total: usize = runs.iter().map(|&c| c as usize).sum();
    if total != n {
        return Err(EvalError::InvalidMask(format!(
            "run lengths sum to {} but mask is {}x{}",
            total,
            rle.height(),
            rle.width()
        )));
    }

    let mut mask = vec![0u8; n];
    let mut idx = 0usize;
    let mut value = 0u8;
    for &run in &runs {
        let end = idx + run as usize;
        if value == 1 {
            for slot in &mut mask[idx..end] {
                *slot = 1;
            }
        }
        idx = end;
        value = 1 - value;
    }
    Ok(mask)
}

/// Number of foreground pixels in an RLE mask.
///
/// Foreground runs sit at odd indices, so no dense decode is needed.
pub fn area(rle: &Rle) -> Result<u64> {
    let runs = counts_from_string(&rle.counts)?;
    Ok(runs
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 2 == 1)
        .map(|(_, &c)| u64::from(c))
        .sum())
}

/// Intersection-over-union between two masks of identical size.
///
/// Both masks are decoded to their dense form and compared pixel-wise.
///
/// # Errors
///
/// Returns `InvalidMask` if the masks have different sizes or malformed runs.
pub fn mask_iou(a: &Rle, b: &Rle) -> Result<f64> {
    if a.size != b.size {
        return Err(EvalError::InvalidMask(format!(
            "size mismatch: {:?} vs {:?}",
            a.size, b.size
        )));
    }

    let da = decode(a)?;
    let db = decode(b)?;

    let mut intersection = 0u64;
    let mut union = 0u64;
    for (&pa, &pb) in da.iter().zip(db.iter()) {
        if pa != 0 && pb != 0 {
            intersection += 1;
        }
        if pa != 0 || pb != 0 {
            union += 1;
        }
    }

    if union == 0 {
        return Ok(0.0);
    }
    Ok(intersection as f64 / union as f64)
}

/// Rasterize one or more polygon rings into a single RLE mask.
///
/// Each polygon is a flat `[x0, y0, x1, y1, ...]` list; multiple rings are
/// merged with union, matching how COCO polygon segmentations are handled.
pub fn rasterize_polygons(polygons: &[Vec<f64>], height: u32, width: u32) -> Result<Rle> {
    let n = (height as usize) * (width as usize);
    let mut merged = vec![0u8; n];

    for polygon in polygons {
        let single = rasterize_ring(polygon, height, width);
        for (acc, v) in merged.iter_mut().zip(single.iter()) {
            if *v != 0 {
                *acc = 1;
            }
        }
    }

    encode(&merged, height, width)
}

/// Rasterize a single polygon ring to a dense column-major mask using the
/// scan-line toggle scheme of the COCO mask API: each edge toggles the
/// crossing cell in its column, then a parity fill runs down every column.
fn rasterize_ring(ring: &[f64], height: u32, width: u32) -> Vec<u8> {
    let h = height as usize;
    let w = width as usize;
    let n = h * w;
    let mut toggles = vec![0u8; n];

    let k = ring.len() / 2;
    if k < 3 {
        return toggles;
    }

    let h_f = f64::from(height);
    let w_f = f64::from(width);
    let xs: Vec<f64> = (0..k).map(|j| ring[j * 2].max(0.0)).collect();
    let ys: Vec<f64> = (0..k).map(|j| ring[j * 2 + 1].clamp(0.0, h_f)).collect();

    for j in 0..k {
        let jn = (j + 1) % k;
        let (mut ax, mut ay) = (xs[j], ys[j]);
        let (mut bx, mut by) = (xs[jn], ys[jn]);

        // Walk the longer axis; flipped edges iterate over rows instead of
        // columns.
        let flip = (bx - ax).abs() < (by - ay).abs();
        if flip {
            std::mem::swap(&mut ax, &mut ay);
            std::mem::swap(&mut bx, &mut by);
        }
        if ax > bx {
            std::mem::swap(&mut ax, &mut bx);
            std::mem::swap(&mut ay, &mut by);
        }

        let slope = if bx == ax { 0.0 } else { (by - ay) / (bx - ax) };
        let primary_bound = if flip { h_f } else { w_f };
        let secondary_bound = if flip { w_f } else { h_f };

        let start = ((ax + 1.0).floor() as i64).max(0) as usize;
        let stop = ((bx + 1.0).floor() as i64).min(primary_bound as i64).max(0) as usize;

        for d in start..stop {
            let t = ay + slope * (d as f64 - ax);
            let cross = if t < 0.0 {
                0
            } else if t >= secondary_bound {
                secondary_bound as usize - 1
            } else {
                t as usize
            };

            let idx = if flip { d + h * cross } else { cross + h * d };
            if idx < n {
                toggles[idx] ^= 1;
            }
        }
    }

    // Parity fill: inside/outside flips at every toggle while walking down a
    // column.
    for col in 0..w {
        let base = col * h;
        let mut inside = 0u8;
        for row in 0..h {
            inside ^= toggles[base + row];
            toggles[base + row] = inside;
        }
    }

    toggles
}

/// Compress run lengths into the COCO LEB128-like string format.
fn counts_to_string(runs: &[u32]) -> String {
    let mut s = String::new();
    for &run in runs {
        let mut x = i64::from(run);
        loop {
            let mut c = (x & 0x1f) as u8;
            x >>= 5;
            let more = if c & 0x10 != 0 { x != -1 } else { x != 0 };
            if more {
                c |= 0x20;
            }
            s.push(char::from(c + 48));
            if !more {
                break;
            }
        }
    }
    s
}

/// Decompress the COCO LEB128-like string format back into run lengths.
fn counts_from_string(s: &str) -> Result<Vec<u32>> {
    let bytes = s.as_bytes();
    let mut runs = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        let mut x: i64 = 0;
        let mut shift = 0u32;
        let mut more = true;
        while more {
            if i >= bytes.len() {
                return Err(EvalError::InvalidMask(
                    "truncated run-length string".to_string(),
                ));
            }
            let c = i64::from(bytes[i]) - 48;
            if !(0..64).contains(&c) {
                return Err(EvalError::InvalidMask(format!(
                    "invalid run-length byte {:#x}",
                    bytes[i]
                )));
            }
            x |= (c & 0x1f) << shift;
            more = c & 0x20 != 0;
            i += 1;
            shift += 5;
        }
        if shift > 0 && x & (1 << (shift - 1)) != 0 {
            x |= !0i64 << shift;
        }
        if x < 0 {
            return Err(EvalError::InvalidMask(format!("negative run length {x}")));
        }
        runs.push(x as u32);
    }

    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let mask = vec![0, 0, 0, 1, 1, 1, 0, 0, 1, 1, 0, 0];
        let rle = encode(&mask, 3, 4).unwrap();
        assert_eq!(decode(&rle).unwrap(), mask);
    }

    #[test]
    fn test_encode_all_zeros() {
        let mask = vec![0u8; 12];
        let rle = encode(&mask, 3, 4).unwrap();
        assert_eq!(area(&rle).unwrap(), 0);
        assert_eq!(decode(&rle).unwrap(), mask);
    }

    #[test]
    fn test_encode_leading_foreground() {
        let mask = vec![1u8; 12];
        let rle = encode(&mask, 3, 4).unwrap();
        assert_eq!(area(&rle).unwrap(), 12);
        assert_eq!(decode(&rle).unwrap(), mask);
    }

    #[test]
    fn test_encode_rejects_wrong_length() {
        let mask = vec![0u8; 11];
        assert!(encode(&mask, 3, 4).is_err());
    }

    #[test]
    fn test_decode_rejects_mismatched_runs() {
        let rle = encode(&[0u8; 12], 3, 4).unwrap();
        let truncated = Rle {
            size: [5, 4],
            counts: rle.counts,
        };
        assert!(decode(&truncated).is_err());
    }

    #[test]
    fn test_area() {
        let mask = vec![0, 0, 0, 1, 1, 1, 0, 0, 1, 1, 0, 0];
        let rle = encode(&mask, 3, 4).unwrap();
        assert_eq!(area(&rle).unwrap(), 5);
    }

    #[test]
    fn test_mask_iou_half_overlap() {
        let a = encode(&[0, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0, 0], 3, 4).unwrap();
        let b = encode(&[0, 0, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0], 3, 4).unwrap();
        // intersection 2, union 4
        let iou = mask_iou(&a, &b).unwrap();
        assert!((iou - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_mask_iou_size_mismatch() {
        let a = encode(&[0u8; 12], 3, 4).unwrap();
        let b = encode(&[0u8; 16], 4, 4).unwrap();
        assert!(mask_iou(&a, &b).is_err());
    }

    #[test]
    fn test_mask_iou_both_empty() {
        let a = encode(&[0u8; 12], 3, 4).unwrap();
        let b = encode(&[0u8; 12], 3, 4).unwrap();
        assert_eq!(mask_iou(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_counts_string_roundtrip_large() {
        let runs = vec![100, 200, 9700];
        let s = counts_to_string(&runs);
        assert_eq!(counts_from_string(&s).unwrap(), runs);
    }

    #[test]
    fn test_rasterize_triangle_has_area() {
        let poly = vec![2.0, 2.0, 7.0, 2.0, 4.0, 7.0];
        let rle = rasterize_polygons(&[poly], 10, 10).unwrap();
        assert!(area(&rle).unwrap() > 0);
    }

    #[test]
    fn test_rasterize_square_covers_interior() {
        // Axis-aligned square from (1,1) to (4,4) in a 6x6 image.
        let poly = vec![1.0, 1.0, 4.0, 1.0, 4.0, 4.0, 1.0, 4.0];
        let rle = rasterize_polygons(&[poly], 6, 6).unwrap();

        let dense = decode(&rle).unwrap();
        // Interior pixels are filled, far corners stay empty.
        assert_eq!(dense[2 + 6 * 2], 1); // (x=2, y=2)
        assert_eq!(dense[3 + 6 * 3], 1); // (x=3, y=3)
        assert_eq!(dense[0], 0); // (0, 0)

        let a = area(&rle).unwrap();
        assert!(a >= 4 && a < 36, "unexpected area {a}");
    }

    #[test]
    fn test_rasterize_degenerate_ring_is_empty() {
        let poly = vec![2.0, 2.0, 3.0, 3.0];
        let rle = rasterize_polygons(&[poly], 10, 10).unwrap();
        assert_eq!(area(&rle).unwrap(), 0);
    }

    #[test]
    fn test_bbox_convention_roundtrip() {
        let xywh = [5.0, 6.0, 7.0, 8.0];
        assert_eq!(xyxy_to_xywh(xywh_to_xyxy(xywh)), xywh);
    }
}
