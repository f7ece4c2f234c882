//! Update Fragment Rendering
//!
//! Turns one sampling cycle into the htmx out-of-band swap fragment that
//! gets broadcast to every dashboard. Each section targets a fixed element
//! id on the index page; htmx swaps them in place without a reload.

use chrono::{DateTime, Local};
use std::fmt::Write;

/// The dashboard index page served at `GET /`
pub const INDEX_HTML: &str = include_str!("../static/index.html");

/// Element id receiving the last-updated timestamp
pub const TIMESTAMP_TARGET: &str = "update-timestamp";

/// One rendered metric section and the element id it swaps into
#[derive(Debug, Clone)]
pub struct Section {
    pub target: &'static str,
    pub html: String,
}

/// Render the broadcast fragment for one sampling cycle.
///
/// Output is a sequence of `hx-swap-oob` divs: the timestamp first, then
/// each section in the order the sampler produced them.
pub fn update_fragment(timestamp: DateTime<Local>, sections: &[Section]) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<div hx-swap-oob=\"innerHTML:#{TIMESTAMP_TARGET}\">\
         <p><i style=\"color: green\" class=\"fa fa-circle\"></i> {}</p></div>",
        timestamp.format("%Y-%m-%d %H:%M:%S")
    );

    for section in sections {
        let _ = write!(
            out,
            "<div hx-swap-oob=\"innerHTML:#{}\">{}</div>",
            section.target, section.html
        );
    }

    out
}
