//! AV1 pixel decoding via rav1d (the pure Rust port of dav1d).
//!
//! The `image` crate's `"avif"` feature only provides the encoder (rav1e);
//! its decoder feature (`"avif-native"`) would pull in the C library dav1d.
//! Driving rav1d directly keeps the binary fully statically linked.

use super::decoder::DecodeError;
use image::RgbImage;
use rav1d::include::dav1d::data::Dav1dData;
use rav1d::include::dav1d::dav1d::Dav1dSettings;
use rav1d::include::dav1d::headers::{
    DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
    DAV1D_PIXEL_LAYOUT_I444,
};
use rav1d::include::dav1d::picture::Dav1dPicture;
use std::ptr::NonNull;

fn av1_err(stage: &str, code: i32) -> DecodeError {
    DecodeError::Av1(format!("rav1d {stage} failed ({code})"))
}

/// Decode one AV1-coded still frame into interleaved RGB8.
pub(crate) fn decode_av1(av1: &[u8]) -> Result<RgbImage, DecodeError> {
    let mut settings = std::mem::MaybeUninit::<Dav1dSettings>::uninit();
    unsafe {
        rav1d::src::lib::dav1d_default_settings(NonNull::new(settings.as_mut_ptr()).unwrap())
    };
    let mut settings = unsafe { settings.assume_init() };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc =
        unsafe { rav1d::src::lib::dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(av1_err("open", rc.0));
    }

    // Copy the bitstream into a rav1d-owned buffer
    let mut data = Dav1dData::default();
    let buf_ptr = unsafe { rav1d::src::lib::dav1d_data_create(NonNull::new(&mut data), av1.len()) };
    if buf_ptr.is_null() {
        unsafe { rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(DecodeError::Av1("rav1d data_create failed".into()));
    }
    unsafe { std::ptr::copy_nonoverlapping(av1.as_ptr(), buf_ptr, av1.len()) };

    let rc = unsafe { rav1d::src::lib::dav1d_send_data(ctx, NonNull::new(&mut data)) };
    if rc.0 != 0 {
        unsafe {
            rav1d::src::lib::dav1d_data_unref(NonNull::new(&mut data));
            rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx));
        }
        return Err(av1_err("send_data", rc.0));
    }

    let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
    let rc = unsafe { rav1d::src::lib::dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
    if rc.0 != 0 {
        unsafe { rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(av1_err("get_picture", rc.0));
    }

    let rgb = picture_to_rgb(&pic);

    unsafe {
        rav1d::src::lib::dav1d_picture_unref(NonNull::new(&mut pic));
        rav1d::src::lib::dav1d_close(NonNull::new(&mut ctx));
    }

    let (w, h, rgb) = rgb?;
    RgbImage::from_raw(w, h, rgb)
        .ok_or_else(|| DecodeError::Av1("decoded frame has inconsistent dimensions".into()))
}

/// Convert the picture's YUV planes to interleaved RGB8.
///
/// Never early-returns ownership of the picture — the caller unrefs it —
/// so this only reads through the plane pointers.
fn picture_to_rgb(pic: &Dav1dPicture) -> Result<(u32, u32, Vec<u8>), DecodeError> {
    let w = pic.p.w as u32;
    let h = pic.p.h as u32;
    let bpc = pic.p.bpc as u32;
    let layout = pic.p.layout;

    let y_plane = Plane {
        ptr: pic.data[0]
            .ok_or_else(|| DecodeError::Av1("missing luma plane".into()))?
            .as_ptr() as *const u8,
        stride: pic.stride[0],
        bpc,
    };

    let chroma = if layout == DAV1D_PIXEL_LAYOUT_I400 {
        None
    } else {
        let (ss_x, ss_y) = match layout {
            DAV1D_PIXEL_LAYOUT_I420 => (true, true),
            DAV1D_PIXEL_LAYOUT_I422 => (true, false),
            DAV1D_PIXEL_LAYOUT_I444 => (false, false),
            _ => {
                return Err(DecodeError::Av1(format!(
                    "unsupported pixel layout {layout}"
                )));
            }
        };
        let plane = |i: usize| -> Result<Plane, DecodeError> {
            Ok(Plane {
                ptr: pic.data[i]
                    .ok_or_else(|| DecodeError::Av1("missing chroma plane".into()))?
                    .as_ptr() as *const u8,
                stride: pic.stride[1],
                bpc,
            })
        };
        Some((plane(1)?, plane(2)?, ss_x, ss_y))
    };

    // Scale 8/10/12-bit samples down to 8-bit output
    let max_val = ((1u32 << bpc) - 1) as f32;
    let center = (1u32 << (bpc - 1)) as f32;
    let scale = 255.0 / max_val;

    let mut rgb = vec![0u8; (w * h * 3) as usize];
    for row in 0..h {
        for col in 0..w {
            let y = y_plane.sample(col, row);

            let (r, g, b) = match &chroma {
                None => {
                    let v = (y * scale).clamp(0.0, 255.0);
                    (v, v, v)
                }
                Some((u_plane, v_plane, ss_x, ss_y)) => {
                    let cx = if *ss_x { col / 2 } else { col };
                    let cy = if *ss_y { row / 2 } else { row };
                    // BT.601 YCbCr → RGB
                    let cb = u_plane.sample(cx, cy) - center;
                    let cr = v_plane.sample(cx, cy) - center;
                    (
                        ((y + 1.402 * cr) * scale).clamp(0.0, 255.0),
                        ((y - 0.344136 * cb - 0.714136 * cr) * scale).clamp(0.0, 255.0),
                        ((y + 1.772 * cb) * scale).clamp(0.0, 255.0),
                    )
                }
            };

            let idx = ((row * w + col) * 3) as usize;
            rgb[idx] = r as u8;
            rgb[idx + 1] = g as u8;
            rgb[idx + 2] = b as u8;
        }
    }

    Ok((w, h, rgb))
}

/// One decoded plane. 10- and 12-bit content is stored as u16 samples.
struct Plane {
    ptr: *const u8,
    stride: isize,
    bpc: u32,
}

impl Plane {
    #[inline]
    fn sample(&self, x: u32, y: u32) -> f32 {
        if self.bpc <= 8 {
            (unsafe { *self.ptr.offset(y as isize * self.stride + x as isize) }) as f32
        } else {
            let at = y as isize * self.stride + x as isize * 2;
            (unsafe { *(self.ptr.offset(at) as *const u16) }) as f32
        }
    }
}
