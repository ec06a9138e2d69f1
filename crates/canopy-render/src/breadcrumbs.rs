//! Breadcrumb trails for the detail panel

use crate::html::escape;
use canopy_core::{BreadcrumbConfig, Node};

/// Number of ancestors to fetch for a trail of `config.depth` crumbs.
///
/// `None` means the whole chain. A depth of one shows the node alone.
pub fn ancestor_limit(config: &BreadcrumbConfig) -> Option<u32> {
    match config.depth {
        None | Some(0) => None,
        Some(depth) => Some(depth - 1),
    }
}

fn wrap_active(label: &str, active_css: Option<&str>) -> String {
    match active_css {
        Some(css) if !css.is_empty() => {
            format!("<span class=\"{}\">{label}</span>", escape(css))
        }
        _ => label.to_string(),
    }
}

fn trail(
    node: &Node,
    ancestors: &[Node],
    config: &BreadcrumbConfig,
    active_css: Option<&str>,
) -> String {
    let keep = match ancestor_limit(config) {
        Some(limit) => ancestors.len().saturating_sub(limit as usize),
        None => 0,
    };
    let mut crumbs: Vec<String> = ancestors[keep..]
        .iter()
        .map(|ancestor| escape(ancestor.name()))
        .collect();
    crumbs.push(wrap_active(&escape(node.name()), active_css));
    crumbs.join(&config.glue)
}

/// Trail for a persisted node. `ancestors` are outermost first; extras beyond
/// the configured depth are dropped from the outer end.
pub fn breadcrumbs(node: &Node, ancestors: &[Node], config: &BreadcrumbConfig) -> String {
    trail(node, ancestors, config, Some(&config.active_css))
}

/// Trail for an unsaved node, optionally prefixed by its future parent's trail.
pub fn new_node_breadcrumbs(parent: Option<(&Node, &[Node])>, config: &BreadcrumbConfig) -> String {
    let current = wrap_active(&escape(&config.untitled), Some(&config.active_css));
    match parent {
        Some((parent, ancestors)) if config.depth != Some(0) => {
            format!("{}{}{current}", trail(parent, ancestors, config, None), config.glue)
        }
        _ => current,
    }
}
