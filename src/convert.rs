//! Pixel format conversion: YUYV422 (packed 4:2:2) to YUV420SP (NV21).
//!
//! YUV420SP is the layout the video path delivers while recording: a full-
//! resolution Y plane followed by one interleaved V/U pair per 2x2 pixel
//! block. Chroma is taken from even source rows only.

/// Convert one YUYV422 frame into YUV420SP (NV21).
///
/// `src` must hold at least `width * height * 2` bytes and `dst` at least
/// `width * height * 3 / 2` bytes; `width` and `height` must be even.
/// Oversized slices are allowed and the excess is ignored.
pub fn yuyv422_to_yuv420sp(src: &[u8], dst: &mut [u8], width: u32, height: u32) {
    let w = width as usize;
    let h = height as usize;
    debug_assert!(src.len() >= w * h * 2);
    debug_assert!(dst.len() >= w * h * 3 / 2);
    debug_assert!(w % 2 == 0 && h % 2 == 0);

    let (y_plane, vu_plane) = dst.split_at_mut(w * h);

    for row in 0..h {
        let src_row = &src[row * w * 2..(row + 1) * w * 2];
        let y_row = &mut y_plane[row * w..(row + 1) * w];

        for (pair, chunk) in src_row.chunks_exact(4).enumerate() {
            y_row[pair * 2] = chunk[0];
            y_row[pair * 2 + 1] = chunk[2];
        }

        // Chroma from even rows only (vertical 2:1 subsampling), V before U.
        if row % 2 == 0 {
            let vu_row = &mut vu_plane[(row / 2) * w..(row / 2 + 1) * w];
            for (pair, chunk) in src_row.chunks_exact(4).enumerate() {
                vu_row[pair * 2] = chunk[3];
                vu_row[pair * 2 + 1] = chunk[1];
            }
        }
    }
}
