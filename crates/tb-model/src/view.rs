//! Persisted view configuration.
//!
//! This is the part of the view that round-trips through a saved state:
//! display toggles, the rainbow legend, the color-mapping range and the text
//! annotations. Rendering itself lives outside this crate.

use serde::{Deserialize, Serialize};

use crate::part::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayFlags {
    pub grid: bool,
    pub ruler: bool,
    pub isotherm: bool,
    pub rainbow: bool,
    pub velocity: bool,
    pub streamline: bool,
    pub graph: bool,
    pub clock: bool,
    pub smooth: bool,
}

impl Default for DisplayFlags {
    fn default() -> Self {
        Self {
            grid: false,
            ruler: false,
            isotherm: false,
            rainbow: false,
            velocity: false,
            streamline: false,
            graph: false,
            clock: true,
            smooth: true,
        }
    }
}

/// Legend placement in view pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RainbowRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    pub text: String,
    pub size: i32,
    pub font: String,
    pub style: i32,
    pub color: Color,
    pub x: f32,
    pub y: f32,
}

impl TextBox {
    pub fn new(text: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            text: text.into(),
            size: 12,
            font: "Arial".to_string(),
            style: 0,
            color: Color(0xffffff),
            x,
            y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub flags: DisplayFlags,
    pub rainbow_rect: RainbowRect,
    /// Lower end of the temperature color map (°C).
    pub min_temperature: f32,
    /// Upper end of the temperature color map (°C).
    pub max_temperature: f32,
    pub text_boxes: Vec<TextBox>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            flags: DisplayFlags::default(),
            rainbow_rect: RainbowRect::default(),
            min_temperature: 0.0,
            max_temperature: 40.0,
            text_boxes: Vec::new(),
        }
    }
}

impl ViewState {
    /// Drop the annotations; display settings stay.
    pub fn clear(&mut self) {
        self.text_boxes.clear();
    }
}
