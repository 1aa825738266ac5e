//! Point temperature sensors.

use serde::{Deserialize, Serialize};
use tb_controls::Sensor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thermometer {
    uid: Option<String>,
    pub label: Option<String>,
    pub x: f32,
    pub y: f32,
    current: Option<f32>,
}

impl Thermometer {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            uid: None,
            label: None,
            x,
            y,
            current: None,
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        let uid = uid.into();
        self.uid = (!uid.is_empty()).then_some(uid);
        self
    }

    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    pub(crate) fn set_uid(&mut self, uid: Option<String>) {
        self.uid = uid.filter(|u| !u.is_empty());
    }

    /// Last sampled temperature.
    pub fn current(&self) -> Option<f32> {
        self.current
    }

    pub fn record(&mut self, value: f32) {
        self.current = Some(value);
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

impl Sensor for Thermometer {
    fn current_reading(&self) -> Option<f32> {
        self.current
    }
}
