//! HTML serialization of a [`MarkupTree`]

use crate::tree::{MarkupEvent, MarkupTree, RenderedNode};
use canopy_core::{IconKind, RenderConfig};
use std::fmt::Write as _;

/// Markup options for [`MarkupTree::to_html`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlOptions {
    pub icon_prefix: String,
    pub show_checkbox: bool,
    /// Icon suffix shown for a parent without its own icon
    pub default_parent_icon: String,
    /// Icon suffix shown for a parent in expanded state
    pub default_parent_open_icon: String,
    /// Icon suffix shown for a leaf without its own icon
    pub default_child_icon: String,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            icon_prefix: "kv-icon-".to_string(),
            show_checkbox: false,
            default_parent_icon: "folder".to_string(),
            default_parent_open_icon: "folder-open".to_string(),
            default_child_icon: "file".to_string(),
        }
    }
}

impl From<&RenderConfig> for HtmlOptions {
    fn from(config: &RenderConfig) -> Self {
        Self {
            icon_prefix: config.icon_prefix.clone(),
            show_checkbox: config.show_checkbox,
            ..Self::default()
        }
    }
}

/// Escape text for use in element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

fn bit(value: bool) -> u8 {
    u8::from(value)
}

fn icon_span(options: &HtmlOptions, suffix: &str) -> String {
    format!(
        "<span class=\"{}{}\"></span>",
        escape(&options.icon_prefix),
        escape(suffix)
    )
}

fn render_icon(node: &RenderedNode, options: &HtmlOptions) -> String {
    let holder = if node.is_parent {
        "kv-node-icon kv-icon-parent"
    } else {
        "kv-node-icon kv-icon-child"
    };
    match &node.icon {
        Some(icon) => {
            let inner = match node.icon_kind {
                IconKind::CssSuffix => icon_span(options, icon),
                IconKind::RawMarkup => icon.clone(),
            };
            format!("<span class=\"{holder}\">{inner}</span>")
        }
        None => format!(
            "<span class=\"kv-node-icon kv-icon-parent\">{}{}</span>\
             <span class=\"kv-node-icon kv-icon-child\">{}</span>",
            icon_span(options, &options.default_parent_icon),
            icon_span(options, &options.default_parent_open_icon),
            icon_span(options, &options.default_child_icon),
        ),
    }
}

fn open_item(out: &mut String, node: &RenderedNode, options: &HtmlOptions) {
    let _ = write!(
        out,
        "<li data-key=\"{}\" data-lft=\"{}\" data-rgt=\"{}\" data-lvl=\"{}\" data-readonly=\"{}\" \
         data-movable-u=\"{}\" data-movable-d=\"{}\" data-movable-l=\"{}\" data-movable-r=\"{}\" \
         data-removable=\"{}\" data-removable-all=\"{}\" data-child-allowed=\"{}\"",
        node.id,
        node.left,
        node.right,
        node.depth,
        bit(node.readonly),
        bit(node.movable_up),
        bit(node.movable_down),
        bit(node.movable_left),
        bit(node.movable_right),
        bit(node.removable),
        bit(node.removable_all),
        bit(node.child_allowed),
    );
    let css = node.css_classes();
    if !css.is_empty() {
        let _ = write!(out, " class=\"{}\"", css.join(" "));
    }
    out.push_str(">\n<div tabindex=\"-1\" class=\"kv-tree-list\">\n");
    out.push_str("<div class=\"kv-node-indicators\">");
    out.push_str("<span class=\"kv-node-toggle\"></span>");
    if options.show_checkbox {
        out.push_str("<span class=\"kv-node-checkbox\"></span>");
    }
    out.push_str("</div>\n<div tabindex=\"-1\" class=\"kv-node-detail\">");
    out.push_str(&render_icon(node, options));
    let _ = write!(
        out,
        "<span class=\"kv-node-label\">{}</span></div>\n</div>\n",
        escape(&node.name)
    );
}

impl MarkupTree {
    /// Serialize to nested `<ul>/<li>` markup.
    pub fn to_html(&self, options: &HtmlOptions) -> String {
        let events = match self {
            MarkupTree::Placeholder { message } => {
                return format!("<div class=\"kv-tree-empty\">{}</div>", escape(message));
            }
            MarkupTree::Nodes(events) => events,
        };

        let mut out = String::new();
        let mut outer = true;
        for event in events {
            match event {
                MarkupEvent::OpenLevel if outer => {
                    out.push_str("<ul class=\"kv-tree\">\n");
                    outer = false;
                }
                MarkupEvent::OpenLevel => out.push_str("<ul>\n"),
                MarkupEvent::OpenItem(node) => open_item(&mut out, node, options),
                MarkupEvent::CloseItem => out.push_str("</li>\n"),
                MarkupEvent::CloseLevel => out.push_str("</ul>\n"),
            }
        }
        out
    }
}
