//! Text tree rendering for debugging output.
//!
//! ```text
//! median min_values=2
//! ├── origin value=Tick(BTC/USD, 1, 10) time=2023-11-14T22:13:20Z
//! └── origin error="data point is expired"
//! ```

use std::fmt::Write;

use crate::{Meta, ModelDesc, Point};

/// Render a point and its sub-points.
pub fn point_tree(point: &Point) -> String {
    let mut out = String::new();
    render(&mut out, point, "", "");
    out
}

/// Render a model description and its children.
pub fn model_tree(desc: &ModelDesc) -> String {
    let mut out = String::new();
    render(&mut out, desc, "", "");
    out
}

trait TreeItem: Sized {
    fn label(&self) -> String;
    fn children(&self) -> &[Self];
}

impl TreeItem for Point {
    fn label(&self) -> String {
        let mut label = kind(&self.meta, "point");
        if let Some(value) = &self.value {
            let _ = write!(label, " value={value}");
        }
        if let Some(time) = self.time {
            let _ = write!(label, " time={time}");
        }
        if let Some(error) = &self.error {
            let _ = write!(label, " error={:?}", error.to_string());
        }
        label
    }

    fn children(&self) -> &[Self] {
        &self.sub_points
    }
}

impl TreeItem for ModelDesc {
    fn label(&self) -> String {
        let mut label = kind(&self.meta, "node");
        for (key, value) in self.meta.iter().filter(|(key, _)| key.as_str() != "type") {
            let _ = write!(label, " {key}={value}");
        }
        label
    }

    fn children(&self) -> &[Self] {
        &self.models
    }
}

fn render<T: TreeItem>(out: &mut String, item: &T, lead: &str, indent: &str) {
    // Writing into a String cannot fail.
    let _ = writeln!(out, "{lead}{}", item.label());

    let children = item.children();
    for (index, child) in children.iter().enumerate() {
        let (branch, next) = if index + 1 == children.len() {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        render(out, child, &format!("{indent}{branch}"), &format!("{indent}{next}"));
    }
}

fn kind(meta: &Meta, fallback: &str) -> String {
    meta.get("type")
        .and_then(serde_json::Value::as_str)
        .unwrap_or(fallback)
        .to_owned()
}
