//! Part outlines in model coordinates (origin at the upper-left corner, y down).

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Axis-aligned rectangle anchored at its upper-left corner.
    Rectangle {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    /// Axis-aligned ellipse centred at `(x, y)` with full width `a` and height `b`.
    Ellipse { x: f32, y: f32, a: f32, b: f32 },
    /// Closed polygon; the last vertex connects back to the first.
    Polygon { vertices: Vec<(f32, f32)> },
}

impl Shape {
    pub fn rectangle(x: f32, y: f32, width: f32, height: f32) -> ModelResult<Self> {
        let shape = Shape::Rectangle {
            x,
            y,
            width,
            height,
        };
        shape.validate()?;
        Ok(shape)
    }

    pub fn ellipse(x: f32, y: f32, a: f32, b: f32) -> ModelResult<Self> {
        let shape = Shape::Ellipse { x, y, a, b };
        shape.validate()?;
        Ok(shape)
    }

    pub fn polygon(vertices: Vec<(f32, f32)>) -> ModelResult<Self> {
        let shape = Shape::Polygon { vertices };
        shape.validate()?;
        Ok(shape)
    }

    pub fn validate(&self) -> ModelResult<()> {
        let finite = |v: &[f32]| v.iter().all(|c| c.is_finite());
        match self {
            Shape::Rectangle {
                x,
                y,
                width,
                height,
            } => {
                if !finite(&[*x, *y, *width, *height]) {
                    return Err(ModelError::InvalidShape {
                        what: "rectangle coordinates must be finite",
                    });
                }
                if *width <= 0.0 || *height <= 0.0 {
                    return Err(ModelError::InvalidShape {
                        what: "rectangle must have positive width and height",
                    });
                }
            }
            Shape::Ellipse { x, y, a, b } => {
                if !finite(&[*x, *y, *a, *b]) {
                    return Err(ModelError::InvalidShape {
                        what: "ellipse coordinates must be finite",
                    });
                }
                if *a <= 0.0 || *b <= 0.0 {
                    return Err(ModelError::InvalidShape {
                        what: "ellipse axes must be positive",
                    });
                }
            }
            Shape::Polygon { vertices } => {
                if vertices.len() < 3 {
                    return Err(ModelError::InvalidShape {
                        what: "polygon needs at least three vertices",
                    });
                }
                if !vertices.iter().all(|(x, y)| x.is_finite() && y.is_finite()) {
                    return Err(ModelError::InvalidShape {
                        what: "polygon vertices must be finite",
                    });
                }
            }
        }
        Ok(())
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        match self {
            Shape::Rectangle {
                x,
                y,
                width,
                height,
            } => px >= *x && px <= x + width && py >= *y && py <= y + height,
            Shape::Ellipse { x, y, a, b } => {
                let dx = (px - x) / (0.5 * a);
                let dy = (py - y) / (0.5 * b);
                dx * dx + dy * dy <= 1.0
            }
            Shape::Polygon { vertices } => {
                // even-odd ray casting
                let mut inside = false;
                let mut j = vertices.len() - 1;
                for i in 0..vertices.len() {
                    let (xi, yi) = vertices[i];
                    let (xj, yj) = vertices[j];
                    if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
                        inside = !inside;
                    }
                    j = i;
                }
                inside
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_contains() {
        let r = Shape::rectangle(1.0, 1.0, 2.0, 3.0).unwrap();
        assert!(r.contains(2.0, 2.0));
        assert!(!r.contains(0.5, 2.0));
        assert!(!r.contains(2.0, 4.5));
    }

    #[test]
    fn ellipse_contains() {
        let e = Shape::ellipse(5.0, 5.0, 2.0, 4.0).unwrap();
        assert!(e.contains(5.0, 6.9));
        assert!(!e.contains(6.5, 5.0));
    }

    #[test]
    fn polygon_contains() {
        let tri = Shape::polygon(vec![(0.0, 0.0), (4.0, 0.0), (0.0, 4.0)]).unwrap();
        assert!(tri.contains(1.0, 1.0));
        assert!(!tri.contains(3.0, 3.0));
    }

    #[test]
    fn degenerate_shapes_rejected() {
        assert!(Shape::rectangle(0.0, 0.0, 0.0, 1.0).is_err());
        assert!(Shape::ellipse(0.0, 0.0, 1.0, -1.0).is_err());
        assert!(Shape::polygon(vec![(0.0, 0.0), (1.0, 1.0)]).is_err());
        assert!(Shape::rectangle(f32::NAN, 0.0, 1.0, 1.0).is_err());
    }
}
