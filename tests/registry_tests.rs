use android_screen_control::{
    device::channel::{DeviceGeometry, Point},
    screen::{
        registry::{UNKNOWN_KIND, normalize},
        screen_model::{RelativeBox, Size},
    },
};
use serde_json::json;

use crate::common::{fakes::phone_geometry, fixtures::search_button};

mod common;

#[test]
fn relative_box_derives_click_point_and_size() {
    let registry = normalize(&[search_button()], &phone_geometry());

    assert_eq!(registry.total_count(), 1);
    let el = &registry.elements()[0];
    assert_eq!(el.index(), 0);
    assert_eq!(el.kind(), "button");
    assert_eq!(el.text(), Some("Search"));
    assert!(el.interactive());
    assert_eq!(el.click_point(), Point::new(540, 234));
    assert_eq!(el.size(), Size { w: 864, h: 234 });
}

#[test]
fn center_size_is_converted_to_relative_box() {
    let raw = json!({
        "type": "icon",
        "click_point": [540, 1170],
        "size": [108, 234],
    });
    let registry = normalize(&[raw], &phone_geometry());

    let el = &registry.elements()[0];
    let b = el.relative_bbox();
    assert!((b.x1() - 0.45).abs() < 1e-9);
    assert!((b.x2() - 0.55).abs() < 1e-9);
    assert!((b.y1() - 0.45).abs() < 1e-9);
    assert!((b.y2() - 0.55).abs() < 1e-9);

    // Re-deriving from the canonical box lands on the original pixels
    assert_eq!(el.click_point(), Point::new(540, 1170));
    assert_eq!(el.size(), Size { w: 108, h: 234 });
}

#[test]
fn center_size_accepts_object_form() {
    let raw = json!({
        "type": "button",
        "click_point": {"x": 100, "y": 200},
        "size": {"w": 50, "h": 40},
    });
    let registry = normalize(&[raw], &phone_geometry());
    assert_eq!(registry.total_count(), 1);
    assert_eq!(registry.elements()[0].click_point(), Point::new(100, 200));
}

#[test]
fn edge_hugging_center_size_is_clamped() {
    let raw = json!({
        "type": "icon",
        "click_point": [10, 10],
        "size": [60, 60],
    });
    let registry = normalize(&[raw], &phone_geometry());

    let b = registry.elements()[0].relative_bbox();
    assert_eq!(b.x1(), 0.0);
    assert_eq!(b.y1(), 0.0);
}

#[test]
fn bbox_wins_when_both_forms_present() {
    let raw = json!({
        "type": "button",
        "bbox": [0.0, 0.0, 0.5, 0.5],
        "click_point": [1000, 2000],
        "size": [10, 10],
    });
    let registry = normalize(&[raw], &phone_geometry());
    assert_eq!(registry.elements()[0].click_point(), Point::new(270, 585));
}

#[test]
fn malformed_entries_are_skipped_and_indices_stay_dense() {
    let raw = vec![
        json!({"type": "text", "content": "first", "bbox": [0.0, 0.0, 0.1, 0.1]}),
        json!({"type": "text", "content": "no geometry"}),
        json!({"type": "text", "bbox": [0.5, 0.5, 0.4, 0.6]}),
        json!({"type": "text", "bbox": [0.1, 0.1, 1.5, 0.2]}),
        json!({"type": "text", "bbox": [0.1, 0.1, 0.2]}),
        json!({"type": "text", "bbox": [0.1, "a", 0.2, 0.3]}),
        json!("not an object"),
        json!({"type": "button", "content": "last", "bbox": [0.2, 0.2, 0.3, 0.3]}),
    ];
    let registry = normalize(&raw, &phone_geometry());

    assert_eq!(registry.total_count(), 2);
    let indices: Vec<usize> = registry.elements().iter().map(|e| e.index()).collect();
    assert_eq!(indices, vec![0, 1]);
    assert_eq!(registry.elements()[0].text(), Some("first"));
    assert_eq!(registry.elements()[1].text(), Some("last"));
}

#[test]
fn off_screen_center_is_rejected() {
    let raw = json!({"type": "icon", "click_point": [2000, 100], "size": [10, 10]});
    let registry = normalize(&[raw], &phone_geometry());
    assert_eq!(registry.total_count(), 0);
}

#[test]
fn center_size_needs_nonempty_geometry() {
    let empty = DeviceGeometry {
        width: 0,
        height: 0,
        rotation: 0,
        power_on: true,
    };
    let raw = json!({"type": "icon", "click_point": [0, 0], "size": [10, 10]});
    assert_eq!(normalize(&[raw], &empty).total_count(), 0);
}

#[test]
fn histogram_counts_kinds_and_defaults_unknown() {
    let raw = vec![
        json!({"type": "text", "bbox": [0.0, 0.0, 0.1, 0.1]}),
        json!({"type": "icon", "bbox": [0.0, 0.0, 0.1, 0.1]}),
        json!({"type": "text", "bbox": [0.0, 0.0, 0.1, 0.1]}),
        json!({"bbox": [0.0, 0.0, 0.1, 0.1]}),
    ];
    let registry = normalize(&raw, &phone_geometry());

    let hist = registry.kind_histogram();
    assert_eq!(hist.get("text"), Some(&2));
    assert_eq!(hist.get("icon"), Some(&1));
    assert_eq!(hist.get(UNKNOWN_KIND), Some(&1));
    assert_eq!(hist.values().sum::<usize>(), registry.total_count());
}

#[test]
fn text_prefers_text_over_content_and_drops_blank() {
    let raw = vec![
        json!({"type": "text", "text": "label", "content": "caption", "bbox": [0.0, 0.0, 0.1, 0.1]}),
        json!({"type": "text", "content": "   ", "bbox": [0.0, 0.0, 0.1, 0.1]}),
    ];
    let registry = normalize(&raw, &phone_geometry());

    assert_eq!(registry.elements()[0].text(), Some("label"));
    assert_eq!(registry.elements()[1].text(), None);
}

#[test]
fn empty_detector_output_gives_empty_registry() {
    let registry = normalize(&[], &phone_geometry());
    assert_eq!(registry.total_count(), 0);
    assert!(registry.kind_histogram().is_empty());
}

#[test]
fn relative_box_rejects_bad_values() {
    assert!(RelativeBox::new(0.1, 0.1, 0.2, 0.2).is_some());
    assert!(RelativeBox::new(0.0, 0.0, 1.0, 1.0).is_some());
    assert!(RelativeBox::new(-0.1, 0.1, 0.2, 0.2).is_none());
    assert!(RelativeBox::new(0.3, 0.1, 0.2, 0.2).is_none());
    assert!(RelativeBox::new(f64::NAN, 0.1, 0.2, 0.2).is_none());
    assert!(RelativeBox::new(0.1, 0.1, f64::INFINITY, 0.2).is_none());
}

#[test]
fn element_serializes_with_wire_field_names() {
    let registry = normalize(&[search_button()], &phone_geometry());
    let json = serde_json::to_value(&registry.elements()[0]).unwrap();

    assert_eq!(json["index"], 0);
    assert_eq!(json["kind"], "button");
    assert_eq!(json["text"], "Search");
    assert_eq!(json["interactive"], true);
    assert_eq!(json["relative_bbox"], json!([0.1, 0.05, 0.9, 0.15]));
    assert_eq!(json["click_point"], json!({"x": 540, "y": 234}));
    assert_eq!(json["size"], json!({"w": 864, "h": 234}));
}
