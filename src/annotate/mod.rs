//! Frame annotation.
//!
//! Every function here takes the input frame by reference and returns a new
//! frame; inputs are never modified. Calls compose: annotating doors, then
//! windows, then people yields all three overlays.

mod font;

pub use font::{draw_text, text_size};

use image::{Rgb, RgbImage};

use crate::detect::{BoundingBox, DetectionSet, ObjectClass};
use crate::frame::Frame;

/// Outline and label style for one detection set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxStyle {
    pub color: [u8; 3],
    pub text_color: [u8; 3],
    pub thickness: u32,
    pub font_scale: u32,
}

impl BoxStyle {
    pub const fn new(color: [u8; 3]) -> Self {
        Self {
            color,
            text_color: [255, 255, 255],
            thickness: 2,
            font_scale: 2,
        }
    }

    pub fn for_class(class: ObjectClass) -> Self {
        match class {
            ObjectClass::Door => Self::new([128, 128, 255]),
            ObjectClass::Window => Self::new([128, 255, 128]),
            ObjectClass::Person => Self::new([255, 128, 128]),
        }
    }
}

/// Styles for one frame: one per class plus the proximity notices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnnotationStyles {
    pub door: BoxStyle,
    pub window: BoxStyle,
    pub person: BoxStyle,
    pub notice_scale: u32,
    pub door_notice: [u8; 3],
    pub window_notice: [u8; 3],
}

impl AnnotationStyles {
    pub fn for_class(&self, class: ObjectClass) -> &BoxStyle {
        match class {
            ObjectClass::Door => &self.door,
            ObjectClass::Window => &self.window,
            ObjectClass::Person => &self.person,
        }
    }
}

impl Default for AnnotationStyles {
    fn default() -> Self {
        Self {
            door: BoxStyle::for_class(ObjectClass::Door),
            window: BoxStyle::for_class(ObjectClass::Window),
            person: BoxStyle::for_class(ObjectClass::Person),
            notice_scale: 3,
            door_notice: [255, 0, 0],
            window_notice: [0, 0, 255],
        }
    }
}

/// Text drawn above a box: class name and confidence.
pub fn label_text(b: &BoundingBox) -> String {
    format!("{} {:.2}", b.label, b.confidence)
}

/// Outline and label every box in `detections` on a copy of `frame`.
pub fn annotate(frame: &Frame, detections: &DetectionSet, style: &BoxStyle) -> Frame {
    let mut out = frame.clone();
    for b in detections {
        draw_box(out.image_mut(), b, style);
    }
    out
}

/// Write the "next to door" / "next to window" notices on a copy of `frame`.
pub fn annotate_proximity(
    frame: &Frame,
    near_door: bool,
    near_window: bool,
    styles: &AnnotationStyles,
) -> Frame {
    let mut out = frame.clone();
    let scale = styles.notice_scale;
    if near_door {
        draw_notice(out.image_mut(), 50, "PERSON -", scale, styles.door_notice);
        draw_notice(out.image_mut(), 80, "NEXT TO DOOR", scale, styles.door_notice);
    }
    if near_window {
        draw_notice(out.image_mut(), 130, "PERSON -", scale, styles.window_notice);
        draw_notice(out.image_mut(), 160, "NEXT TO WINDOW", scale, styles.window_notice);
    }
    out
}

// `baseline` is the bottom row of the text, left margin is fixed at 5px.
fn draw_notice(image: &mut RgbImage, baseline: i64, text: &str, scale: u32, color: [u8; 3]) {
    let (_, height) = text_size(text, scale);
    draw_text(image, 5, baseline - height as i64, text, scale, color);
}

fn draw_box(image: &mut RgbImage, b: &BoundingBox, style: &BoxStyle) {
    let t = style.thickness.max(1) as i64;
    // Everything past this margin is clipped anyway; keeps the arithmetic below in range.
    let span = 2 * image.width().max(image.height()) as i64 + t;
    let coord = |v: f32| (v.round() as i64).clamp(-span, span);
    let x0 = coord(b.x_min);
    let y0 = coord(b.y_min);
    let x1 = coord(b.x_max);
    let y1 = coord(b.y_max);

    fill_rect(image, x0, y0, x1, y0 + t - 1, style.color);
    fill_rect(image, x0, y1 - t + 1, x1, y1, style.color);
    fill_rect(image, x0, y0, x0 + t - 1, y1, style.color);
    fill_rect(image, x1 - t + 1, y0, x1, y1, style.color);

    let text = label_text(b);
    let scale = style.font_scale.max(1);
    let (tw, th) = text_size(&text, scale);
    let pad = scale as i64;
    let tab_w = tw as i64 + 2 * pad;
    let tab_h = th as i64 + 2 * pad;

    // Tab sits on top of the box, or just inside it when there is no room above.
    let tab_y = if y0 - tab_h >= 0 { y0 - tab_h } else { y0 };
    let tab_x = x0.min(image.width() as i64 - tab_w).max(0);

    let (tab_x1, tab_y1) = (tab_x + tab_w - 1, tab_y + tab_h - 1);
    fill_rect(image, tab_x, tab_y, tab_x1, tab_y1, style.color);
    draw_text(image, tab_x + pad, tab_y + pad, &text, scale, style.text_color);
}

// Inclusive corners, clipped to the image.
fn fill_rect(image: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: [u8; 3]) {
    let (w, h) = (image.width() as i64, image.height() as i64);
    let (x0, x1) = (x0.max(0), x1.min(w - 1));
    let (y0, y1) = (y0.max(0), y1.min(h - 1));
    if x0 > x1 || y0 > y1 {
        return;
    }
    for y in y0..=y1 {
        for x in x0..=x1 {
            image.put_pixel(x as u32, y as u32, Rgb(color));
        }
    }
}
