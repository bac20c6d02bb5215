//! Application icon
//!
//! The icon is drawn at runtime (a monitor with a blue screen on a transparent
//! background) and shared by the tray and the window.

use image::{Rgba, RgbaImage};

/// Edge length of the tray icon in pixels
pub const TRAY_ICON_SIZE: u32 = 32;

/// Edge length of the window icon in pixels
pub const WINDOW_ICON_SIZE: u32 = 64;

const SCREEN: Rgba<u8> = Rgba([0x3d, 0x8b, 0xfd, 0xff]);
const BEZEL: Rgba<u8> = Rgba([0xe8, 0xe8, 0xe8, 0xff]);
const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Rasterize the icon at `size`×`size`
pub fn render(size: u32) -> RgbaImage {
    #[expect(
        clippy::cast_precision_loss,
        reason = "icon sizes are small enough to be exact in f32"
    )]
    let extent = size as f32;

    RgbaImage::from_fn(size, size, |x, y| {
        #[expect(clippy::cast_precision_loss, reason = "pixel coordinates are small")]
        let (fx, fy) = ((x as f32 + 0.5) / extent, (y as f32 + 0.5) / extent);
        let within = |x0: f32, x1: f32, y0: f32, y1: f32| fx >= x0 && fx <= x1 && fy >= y0 && fy <= y1;

        if within(0.16, 0.84, 0.22, 0.64) {
            SCREEN
        } else if within(0.06, 0.94, 0.12, 0.74)
            || within(0.42, 0.58, 0.74, 0.84)
            || within(0.26, 0.74, 0.84, 0.92)
        {
            BEZEL
        } else {
            CLEAR
        }
    })
}

/// Icon for the Slint window
pub fn window_icon() -> slint::Image {
    let icon = render(WINDOW_ICON_SIZE);
    let buffer = slint::SharedPixelBuffer::<slint::Rgba8Pixel>::clone_from_slice(
        icon.as_raw(),
        icon.width(),
        icon.height(),
    );
    slint::Image::from_rgba8(buffer)
}

/// Icon for the notification area
#[cfg(windows)]
pub fn tray_icon() -> parsec_vdisplay::Result<tray_icon::Icon> {
    let icon = render(TRAY_ICON_SIZE);
    let (width, height) = icon.dimensions();
    tray_icon::Icon::from_rgba(icon.into_raw(), width, height)
        .map_err(|e| parsec_vdisplay::VdisplayError::TrayError(Box::new(e)))
}
