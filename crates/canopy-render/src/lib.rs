//! Canopy Render - hierarchy renderer
//!
//! Turns a flat node list ordered by `(root_id, left)` into nested markup in
//! a single forward pass. The pass keeps one stack entry per open nesting
//! level, so auxiliary memory is bounded by the tree depth.
//!
//! Output is a [`MarkupTree`]: either a placeholder for an empty tree or a
//! balanced stream of [`MarkupEvent`]s carrying per-node derived flags. The
//! stream serializes to HTML via [`MarkupTree::to_html`] and to JSON for the
//! client controller.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

pub mod breadcrumbs;
pub mod html;
pub mod tree;

pub use breadcrumbs::{ancestor_limit, breadcrumbs, new_node_breadcrumbs};
pub use html::{escape, HtmlOptions};
pub use tree::{render, render_with_config, MarkupEvent, MarkupTree, RenderOptions, RenderedNode};
