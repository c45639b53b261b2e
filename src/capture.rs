//! X11 screen grabbing via Xlib.
//!
//! Opens the display named by `$DISPLAY`, reads the root window's visual
//! to learn the pixel format, and copies a fixed region of the root window
//! into any [`DrawSurface`] once per frame.
//!
//! ## Rust concepts
//! - `unsafe` blocks kept as small as the FFI calls they wrap
//! - RAII guards (`Drop`) for the display connection and each grabbed image

use crate::mirror::FrameSource;
use crate::pixel_format::{PixelFormat, PixelFormatError};
use crate::surface::DrawSurface;
use std::ffi::CString;
use std::mem;
use thiserror::Error;
use x11::xlib;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("DISPLAY environment variable not set")]
    DisplayUnset,

    #[error("display {0} cannot be opened")]
    OpenFailed(String),

    #[error("failed to read root window attributes")]
    Attributes,

    #[error(transparent)]
    PixelFormat(#[from] PixelFormatError),

    #[error("failed to capture {width}x{height} screenshot at ({x}, {y})")]
    GrabFailed {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
}

/// The part of the screen to mirror.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Closes the X connection when dropped.
#[derive(Debug)]
struct ManagedDisplay {
    ptr: *mut xlib::Display,
}

impl ManagedDisplay {
    fn open(name: &str) -> Result<Self, CaptureError> {
        let c_name = CString::new(name).map_err(|_| CaptureError::OpenFailed(name.to_string()))?;
        let ptr = unsafe { xlib::XOpenDisplay(c_name.as_ptr()) };
        if ptr.is_null() {
            return Err(CaptureError::OpenFailed(name.to_string()));
        }
        tracing::debug!("X display {} opened: {:p}", name, ptr);
        Ok(Self { ptr })
    }
}

impl Drop for ManagedDisplay {
    fn drop(&mut self) {
        tracing::debug!("Closing X display connection: {:p}", self.ptr);
        unsafe {
            xlib::XCloseDisplay(self.ptr);
        }
    }
}

/// Destroys a grabbed image when dropped.
struct ManagedImage {
    ptr: *mut xlib::XImage,
}

impl Drop for ManagedImage {
    fn drop(&mut self) {
        unsafe {
            xlib::XDestroyImage(self.ptr);
        }
    }
}

/// Grabs a region of the root window each frame.
pub struct ScreenGrabber {
    display: ManagedDisplay,
    root: xlib::Window,
    format: PixelFormat,
    region: ScreenRegion,
}

impl ScreenGrabber {
    /// Connect to the display named by `$DISPLAY`.
    pub fn open(region: ScreenRegion) -> Result<Self, CaptureError> {
        let name = std::env::var("DISPLAY")
            .ok()
            .filter(|name| !name.is_empty())
            .ok_or(CaptureError::DisplayUnset)?;
        tracing::info!("DISPLAY is {}", name);

        let display = ManagedDisplay::open(&name)?;

        let screen = unsafe { xlib::XDefaultScreen(display.ptr) };
        let root = unsafe { xlib::XRootWindow(display.ptr, screen) };

        let mut attribs: xlib::XWindowAttributes = unsafe { mem::zeroed() };
        let status = unsafe { xlib::XGetWindowAttributes(display.ptr, root, &mut attribs) };
        if status == 0 || attribs.visual.is_null() {
            return Err(CaptureError::Attributes);
        }

        let visual = unsafe { &*attribs.visual };
        let format = PixelFormat::from_masks(
            visual.red_mask as u64,
            visual.green_mask as u64,
            visual.blue_mask as u64,
        )?;

        tracing::info!(
            "Root window {}x{}, depth {}, format {:?}",
            attribs.width,
            attribs.height,
            attribs.depth,
            format
        );
        if region.x + region.width as i32 > attribs.width
            || region.y + region.height as i32 > attribs.height
        {
            tracing::warn!(
                "Screenshot region {:?} extends past the {}x{} screen",
                region,
                attribs.width,
                attribs.height
            );
        }

        Ok(Self {
            display,
            root,
            format,
            region,
        })
    }

    pub fn region(&self) -> ScreenRegion {
        self.region
    }
}

impl FrameSource for ScreenGrabber {
    type Error = CaptureError;

    fn draw_frame<D: DrawSurface + ?Sized>(&mut self, target: &mut D) -> Result<(), CaptureError> {
        let ScreenRegion {
            x,
            y,
            width,
            height,
        } = self.region;

        let ptr = unsafe {
            xlib::XGetImage(
                self.display.ptr,
                self.root,
                x,
                y,
                width,
                height,
                xlib::XAllPlanes(),
                xlib::XYPixmap,
            )
        };
        if ptr.is_null() {
            return Err(CaptureError::GrabFailed {
                x,
                y,
                width,
                height,
            });
        }
        let image = ManagedImage { ptr };

        let (image_width, image_height) = unsafe { ((*image.ptr).width, (*image.ptr).height) };
        for py in 0..image_height {
            for px in 0..image_width {
                let pixel = unsafe { xlib::XGetPixel(image.ptr, px, py) };
                target.set_pixel(px, py, self.format.decode(pixel as u64));
            }
        }

        Ok(())
    }
}
