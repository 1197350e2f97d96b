use serde_json::{Value, json};

/// Wrap raw elements the way the detection service does.
pub fn detector_body(elements: Vec<Value>) -> String {
    let total = elements.len();
    json!({
        "elements": elements,
        "total_elements": total,
        "element_types": {},
    })
    .to_string()
}

/// A "Search" button across the top of a 1080x2340 screen.
pub fn search_button() -> Value {
    json!({
        "type": "button",
        "content": "Search",
        "bbox": [0.1, 0.05, 0.9, 0.15],
        "interactivity": true
    })
}

pub fn text_label(text: &str, bbox: [f64; 4]) -> Value {
    json!({
        "type": "text",
        "content": text,
        "bbox": bbox,
        "interactivity": false
    })
}

/// Typical home-screen detection: a button, a label, an icon.
pub fn home_screen_body() -> String {
    detector_body(vec![
        search_button(),
        text_label("Recent notes", [0.05, 0.2, 0.6, 0.25]),
        json!({
            "type": "icon",
            "bbox": [0.8, 0.9, 0.95, 0.97],
            "interactivity": true
        }),
    ])
}

/// Same screen after navigation: different content.
pub fn results_screen_body() -> String {
    detector_body(vec![
        text_label("3 results", [0.05, 0.1, 0.5, 0.14]),
        text_label("Shopping list", [0.05, 0.2, 0.9, 0.26]),
    ])
}

pub fn empty_body() -> String {
    detector_body(vec![])
}
