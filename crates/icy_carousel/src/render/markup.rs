//! Small helpers for building preview markup.

use std::fmt::Write;

/// Escape text for use in element content and quoted attribute values
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// `<p class="...">text</p>` with escaped text
pub fn paragraph(class: &str, text: &str) -> String {
    format!("<p class=\"{}\">{}</p>", class, escape(text))
}

/// Action button as reported back through `handle_action`
pub fn action_button(class: &str, action: &str, index: Option<usize>, label: &str) -> String {
    let mut out = String::new();
    let _ = write!(out, "<button type=\"button\" class=\"{}\" data-action=\"{}\"", class, action);
    if let Some(index) = index {
        let _ = write!(out, " data-index=\"{}\"", index);
    }
    let _ = write!(out, ">{}</button>", escape(label));
    out
}
