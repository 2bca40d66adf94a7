use std::fmt;

/// Object classes the pipeline fuses. Each is produced by its own detector.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    Door,
    Window,
    Person,
}

impl ObjectClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectClass::Door => "door",
            ObjectClass::Window => "window",
            ObjectClass::Person => "person",
        }
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis-aligned box in frame pixel coordinates.
///
/// Invariant: `x_min <= x_max` and `y_min <= y_max`. `confidence` is in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
    pub confidence: f32,
    pub label: String,
}

impl BoundingBox {
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
            confidence: 1.0,
            label: String::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Build from centre/size form, as emitted by YOLO-style heads.
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }

    /// Swap reversed edges so the ordering invariant holds.
    pub fn normalized(mut self) -> Self {
        if self.x_min > self.x_max {
            std::mem::swap(&mut self.x_min, &mut self.x_max);
        }
        if self.y_min > self.y_max {
            std::mem::swap(&mut self.y_min, &mut self.y_max);
        }
        self
    }

    pub fn is_finite(&self) -> bool {
        [self.x_min, self.y_min, self.x_max, self.y_max, self.confidence]
            .iter()
            .all(|v| v.is_finite())
    }

    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Corners in `(x_min,y_min), (x_max,y_min), (x_min,y_max), (x_max,y_max)` order.
    pub fn corners(&self) -> [(f32, f32); 4] {
        [
            (self.x_min, self.y_min),
            (self.x_max, self.y_min),
            (self.x_min, self.y_max),
            (self.x_max, self.y_max),
        ]
    }

    /// Grow by `margin` on all four sides. Label and confidence are kept.
    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            x_min: self.x_min - margin,
            y_min: self.y_min - margin,
            x_max: self.x_max + margin,
            y_max: self.y_max + margin,
            confidence: self.confidence,
            label: self.label.clone(),
        }
    }

    /// Inclusive on both axes.
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        self.x_min <= x && x <= self.x_max && self.y_min <= y && y <= self.y_max
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x_min.max(other.x_min);
        let y1 = self.y_min.max(other.y_min);
        let x2 = self.x_max.min(other.x_max);
        let y2 = self.y_max.min(other.y_max);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// Boxes of one class from one detector call on one frame, in detector output order.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionSet {
    class: ObjectClass,
    boxes: Vec<BoundingBox>,
}

impl DetectionSet {
    pub fn new(class: ObjectClass, boxes: Vec<BoundingBox>) -> Self {
        Self { class, boxes }
    }

    pub fn empty(class: ObjectClass) -> Self {
        Self::new(class, Vec::new())
    }

    pub fn class(&self) -> ObjectClass {
        self.class
    }

    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    /// Reference box for proximity tests.
    pub fn first(&self) -> Option<&BoundingBox> {
        self.boxes.first()
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BoundingBox> {
        self.boxes.iter()
    }
}

impl<'a> IntoIterator for &'a DetectionSet {
    type Item = &'a BoundingBox;
    type IntoIter = std::slice::Iter<'a, BoundingBox>;

    fn into_iter(self) -> Self::IntoIter {
        self.boxes.iter()
    }
}
