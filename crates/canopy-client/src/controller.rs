//! Tree controller
//!
//! Binds one client tree to a transport and a clock. Local transitions
//! (toggle, check, search) complete synchronously. Server actions are split
//! into a `prepare_*` step that validates and marks the node busy, and a
//! `finish_*` step that reconciles the server's answer; `remove` and
//! `move_node` run both around the transport call.
//!
//! At most one mutating request per node is in flight. A second `prepare_*`
//! for a busy node fails with [`ClientError::Busy`] and the toolbar shows the
//! node's buttons disabled until the first request settles.
//!
//! Delete and admin policy is read back from the signed payloads in the
//! [`TreeBootstrap`], never from local configuration, so the local
//! reconciliation always matches what the server was told to do.

use crate::cache::{self, ResponseCache};
use crate::error::{ClientError, Result};
use crate::events::{EventBus, EventControl, TreeEvent};
use crate::ops::{self, MovePlan, RemoveReconcile, SearchOutcome, SelectionValue, Toolbar};
use crate::panel::{Alert, AlertLevel, DetailPanel};
use crate::tree::{ClientNode, ClientTree, NodeKey};
use canopy_core::{
    ActionEnvelope, ActionOutput, ActionTokens, CanopyConfig, ClientConfig, Direction,
    ManagePayload, ManageRequest, MovePayload, MoveRequest, NodeId, NodeTitles, NodeTransport,
    ParentKey, RemovePayload, RemoveRequest, TimeSource, TransportError,
};
use canopy_render::MarkupTree;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::broadcast;

/// Shown after an unsaved placeholder is discarded.
pub const EMPTY_NODE_REMOVED: &str = "The untitled {node} was removed.";

/// Everything the server hands the client at page load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeBootstrap {
    pub markup: MarkupTree,
    pub tokens: ActionTokens,
    pub selected: Option<NodeId>,
    pub manage: ManagePayload,
    pub remove: RemovePayload,
    #[serde(rename = "move")]
    pub move_: MovePayload,
    /// Inactive nodes are part of the rendered tree
    #[serde(default)]
    pub show_inactive: bool,
}

/// Search input state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub query: String,
    /// Non-matching nodes are hidden
    pub active_filter: bool,
    /// A keystroke is waiting for the debounce to settle
    pub loading: bool,
    settle_at: Option<u64>,
}

/// A validated remove waiting for its response.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRemove {
    pub key: NodeKey,
    pub request: RemoveRequest,
}

/// A validated move waiting for its response.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMove {
    pub key: NodeKey,
    pub plan: MovePlan,
    pub request: MoveRequest,
}

/// Stateful controller for one rendered tree.
pub struct TreeController<T, C> {
    config: ClientConfig,
    titles: NodeTitles,
    transport: T,
    clock: C,
    tokens: ActionTokens,
    manage: ManagePayload,
    remove: RemovePayload,
    move_: MovePayload,
    show_inactive: bool,
    tree: ClientTree,
    focus: Option<NodeKey>,
    value: SelectionValue,
    all_collapsed: bool,
    all_checked: bool,
    search: SearchState,
    detail: DetailPanel,
    alert: Option<Alert>,
    in_flight: HashSet<NodeKey>,
    cache: ResponseCache<ActionEnvelope>,
    events: EventBus,
}

impl<T, C> std::fmt::Debug for TreeController<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeController")
            .field("nodes", &self.tree.len())
            .field("focus", &self.focus)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl<T, C> TreeController<T, C>
where
    T: NodeTransport,
    C: TimeSource,
{
    pub fn new(config: &CanopyConfig, bootstrap: TreeBootstrap, transport: T, clock: C) -> Self {
        let tree = ClientTree::from_markup(&bootstrap.markup);
        let value = ops::selection_value(&tree);
        let mut controller = Self {
            config: config.client.clone(),
            titles: config.titles.clone(),
            transport,
            clock,
            tokens: bootstrap.tokens,
            manage: bootstrap.manage,
            remove: bootstrap.remove,
            move_: bootstrap.move_,
            show_inactive: bootstrap.show_inactive,
            tree,
            focus: None,
            value,
            all_collapsed: false,
            all_checked: false,
            search: SearchState::default(),
            detail: DetailPanel::Empty,
            alert: None,
            in_flight: HashSet::new(),
            cache: ResponseCache::with_ttl(config.client.cache_ttl_ms),
            events: EventBus::new(),
        };
        if let Some(id) = bootstrap.selected {
            controller.focus_initial(NodeKey::Node(id));
        }
        controller
    }

    // -- accessors ----------------------------------------------------------

    pub fn tree(&self) -> &ClientTree {
        &self.tree
    }

    pub fn focus(&self) -> Option<NodeKey> {
        self.focus
    }

    pub fn value(&self) -> &SelectionValue {
        &self.value
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn detail(&self) -> &DetailPanel {
        &self.detail
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    pub fn cache(&self) -> &ResponseCache<ActionEnvelope> {
        &self.cache
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_collapsed(&self) -> bool {
        self.all_collapsed
    }

    /// State of the check-all box
    pub fn is_all_checked(&self) -> bool {
        self.all_checked
    }

    pub fn is_busy(&self, key: NodeKey) -> bool {
        self.in_flight.contains(&key)
    }

    /// Register a listener that may veto default actions.
    pub fn listen<F>(&mut self, listener: F)
    where
        F: Fn(&TreeEvent) -> EventControl + Send + Sync + 'static,
    {
        self.events.listen(listener);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        self.events.subscribe()
    }

    /// Toolbar for the focused node, recomputed on every call.
    pub fn toolbar(&self) -> Toolbar {
        let node = self.focus.and_then(|key| self.tree.get(key));
        let busy = self.focus.is_some_and(|key| self.is_busy(key));
        ops::toolbar_for(node, self.remove.soft_delete, busy)
    }

    /// Local effect of a successful remove, as signed for the server.
    fn remove_reconcile(&self) -> RemoveReconcile {
        RemoveReconcile::for_mode(
            self.manage.is_admin,
            self.show_inactive,
            self.remove.soft_delete,
        )
    }

    // -- selection and detail -------------------------------------------------

    fn focus_initial(&mut self, key: NodeKey) {
        if self.tree.contains(key) {
            self.focus = Some(key);
            ops::expand_ancestors(&mut self.tree, key);
        }
    }

    /// Focus `key` and load its detail panel.
    pub async fn select(&mut self, key: NodeKey) -> Result<()> {
        if !self.tree.contains(key) {
            return Err(ClientError::UnknownNode { key });
        }
        self.focus = Some(key);
        self.load_detail(key, None).await
    }

    fn manage_url(&self, key: NodeKey) -> String {
        let (id, parent) = match key {
            NodeKey::Node(id) => (Some(id.to_string()), None),
            NodeKey::Placeholder(parent) => (None, Some(parent.to_string())),
        };
        cache::manage_url(
            &self.config.manage_url,
            id.as_deref(),
            &self.manage.store_class,
            self.manage.is_admin,
            parent.as_deref(),
        )
    }

    fn manage_request(&self, key: NodeKey) -> ManageRequest {
        let (id, parent_key) = match key {
            NodeKey::Node(id) => (Some(id), None),
            NodeKey::Placeholder(parent) => (None, Some(parent)),
        };
        ManageRequest {
            id,
            parent_key,
            payload: self.manage.clone(),
            signature: self.tokens.manage.clone(),
            remove_token: self.tokens.remove.clone(),
            move_token: self.tokens.move_.clone(),
        }
    }

    async fn fetch_manage(
        &mut self,
        key: NodeKey,
    ) -> std::result::Result<ActionEnvelope, TransportError> {
        let url = self.manage_url(key);
        if self.config.cache_enabled {
            if let Some(hit) = self.cache.fresh(&url, self.clock.now_ms()) {
                tracing::debug!(%key, %url, "manage served from cache");
                return Ok(hit.clone());
            }
        }
        let envelope = self.transport.manage(&url, self.manage_request(key)).await?;
        if self.config.cache_enabled && envelope.is_success() {
            self.cache.set(url, envelope.clone(), self.clock.now_ms());
        }
        Ok(envelope)
    }

    async fn load_detail(&mut self, key: NodeKey, notice: Option<Alert>) -> Result<()> {
        self.alert = None;
        if !self.events.raise(TreeEvent::BeforeSelect { key }) {
            return Ok(());
        }
        self.detail = DetailPanel::Loading { key };

        let envelope = match self.fetch_manage(key).await {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(%key, error = %err, "manage request failed");
                self.detail = DetailPanel::Error {
                    key,
                    message: err.to_string(),
                };
                return Err(err.into());
            }
        };

        if !self.events.raise(TreeEvent::Selected { key }) {
            self.detail = DetailPanel::Empty;
            return Ok(());
        }

        if !envelope.is_success() {
            let message = envelope.out.message().to_string();
            let shown = self.events.raise(TreeEvent::SelectError {
                key,
                message: message.clone(),
            });
            self.detail = if shown {
                DetailPanel::Error {
                    key,
                    message: message.clone(),
                }
            } else {
                DetailPanel::Empty
            };
            return Err(ClientError::rejected(message));
        }

        match envelope.out {
            ActionOutput::Detail(detail) => {
                self.detail = DetailPanel::Loaded { key, detail };
                self.alert = notice;
                Ok(())
            }
            other => {
                let message = format!("unexpected manage response: {}", other.message());
                self.detail = DetailPanel::Error {
                    key,
                    message: message.clone(),
                };
                Err(ClientError::rejected(message))
            }
        }
    }

    // -- expand / collapse ----------------------------------------------------

    /// Flip one parent. Returns `false` when nothing changed.
    pub fn toggle(&mut self, key: NodeKey) -> Result<bool> {
        let node = self.tree.get(key).ok_or(ClientError::UnknownNode { key })?;
        if !node.is_parent() {
            return Ok(false);
        }
        let collapsed = node.collapsed;
        let event = if collapsed {
            TreeEvent::Expand { key }
        } else {
            TreeEvent::Collapse { key }
        };
        if !self.events.raise(event) {
            return Ok(false);
        }
        if let Some(node) = self.tree.get_mut(key) {
            node.collapsed = !collapsed;
        }
        Ok(true)
    }

    /// Expand or collapse every parent.
    pub fn toggle_all(&mut self, expand: bool) -> bool {
        let event = if expand {
            TreeEvent::ExpandAll
        } else {
            TreeEvent::CollapseAll
        };
        if !self.events.raise(event) {
            return false;
        }
        ops::set_all_collapsed(&mut self.tree, !expand);
        self.all_collapsed = !expand;
        true
    }

    // -- checkboxes -----------------------------------------------------------

    /// Flip the checkbox of `key`. Returns `false` when a listener vetoed.
    pub fn check(&mut self, key: NodeKey) -> Result<bool> {
        let node = self.tree.get(key).ok_or(ClientError::UnknownNode { key })?;
        if node.disabled {
            return Err(ClientError::Disabled { key });
        }
        let was_selected = node.selected;
        let label = node.label.clone();
        let multiple = self.config.multiple;

        if was_selected {
            if !self.events.raise(TreeEvent::Unchecked { key: Some(key) }) {
                return Ok(false);
            }
            if multiple {
                if self.config.cascade_select_children {
                    let below = self.tree.descendants(key);
                    ops::set_selected(&mut self.tree, below, false);
                }
            } else {
                if !self.raise_change(SelectionValue::default()) {
                    return Ok(false);
                }
                ops::clear_selection(&mut self.tree);
            }
            ops::set_selected(&mut self.tree, [key], false);
        } else {
            if !self.events.raise(TreeEvent::Checked { key: Some(key) }) {
                return Ok(false);
            }
            if multiple {
                if self.config.cascade_select_children {
                    let below = self.tree.descendants(key);
                    ops::set_selected(&mut self.tree, below, true);
                }
            } else {
                let value = SelectionValue {
                    keys: key.to_string(),
                    description: label,
                };
                if !self.raise_change(value) {
                    return Ok(false);
                }
                ops::clear_selection(&mut self.tree);
            }
            ops::set_selected(&mut self.tree, [key], true);
        }

        if multiple {
            self.raise_change(ops::selection_value(&self.tree));
        }
        Ok(true)
    }

    /// Check every enabled node (multi-select only).
    pub fn check_all(&mut self) -> Result<bool> {
        self.set_all_checked(true)
    }

    /// Uncheck every enabled node (multi-select only).
    pub fn uncheck_all(&mut self) -> Result<bool> {
        self.set_all_checked(false)
    }

    fn set_all_checked(&mut self, checked: bool) -> Result<bool> {
        if !self.config.multiple {
            return Err(ClientError::SingleSelect);
        }
        let event = if checked {
            TreeEvent::Checked { key: None }
        } else {
            TreeEvent::Unchecked { key: None }
        };
        if !self.events.raise(event) {
            return Ok(false);
        }
        let all = self.tree.order();
        ops::set_selected(&mut self.tree, all, checked);
        self.all_checked = checked;
        self.raise_change(ops::selection_value(&self.tree));
        Ok(true)
    }

    /// Publish a new selection value; stored only when not vetoed.
    fn raise_change(&mut self, value: SelectionValue) -> bool {
        let accepted = self.events.raise(TreeEvent::Change {
            keys: value.keys.clone(),
            description: value.description.clone(),
        });
        if accepted {
            self.value = value;
        }
        accepted
    }

    // -- search ---------------------------------------------------------------

    /// Record a keystroke. The filter runs once the debounce settles.
    pub fn search_input(&mut self, text: impl Into<String>) {
        self.search.query = text.into();
        self.search.loading = true;
        self.search.settle_at = Some(self.clock.now_ms() + self.config.search_debounce_ms);
        ops::clear_search(&mut self.tree);
    }

    /// Run a settled search. Returns the outcome when one was applied.
    pub fn tick(&mut self) -> Option<SearchOutcome> {
        let settle_at = self.search.settle_at?;
        if self.clock.now_ms() < settle_at {
            return None;
        }
        self.search.settle_at = None;
        self.search.loading = false;

        let query = self.search.query.clone();
        let outcome = ops::apply_search(
            &mut self.tree,
            &query,
            self.config.hide_unmatched_search_items,
        );
        self.search.active_filter = outcome.active_filter && !query.is_empty();
        self.all_collapsed = false;
        tracing::debug!(%query, matches = outcome.matches.len(), "search applied");
        self.events.raise(TreeEvent::Search { query });
        Some(outcome)
    }

    /// Drop the query and its markup, and expand the whole tree.
    pub fn clear_search(&mut self) {
        self.search = SearchState::default();
        ops::clear_search(&mut self.tree);
        ops::set_all_collapsed(&mut self.tree, false);
        self.all_collapsed = false;
    }

    // -- create ---------------------------------------------------------------

    /// Open an unsaved child under the focused node.
    pub async fn create(&mut self) -> Result<()> {
        let key = self.focus.ok_or(ClientError::InvalidCreateTarget)?;
        let node = self.tree.get(key).ok_or(ClientError::UnknownNode { key })?;
        if node.disabled {
            return Err(ClientError::Disabled { key });
        }
        let id = key.node_id().ok_or(ClientError::InvalidCreateTarget)?;
        if !node.permissions.child_allowed {
            return Err(ClientError::ChildNotAllowed { key });
        }

        let parent = ParentKey::Node(id);
        if let Some(existing) = self.tree.placeholder_under(parent) {
            self.focus = Some(existing);
            return self.load_detail(existing, None).await;
        }
        if !self.events.raise(TreeEvent::Create { parent: key }) {
            return Ok(());
        }

        let placeholder = ClientNode::placeholder(parent);
        let new_key = placeholder.key;
        self.tree.push(placeholder);
        if let Some(node) = self.tree.get_mut(key) {
            node.collapsed = false;
        }
        self.focus = Some(new_key);
        tracing::debug!(parent = %key, "placeholder created");
        self.load_detail(new_key, None).await
    }

    /// Open an unsaved root.
    pub async fn create_root(&mut self) -> Result<()> {
        if !self.events.raise(TreeEvent::CreateRoot) {
            return Ok(());
        }
        let key = match self.tree.placeholder_under(ParentKey::Root) {
            Some(existing) => existing,
            None => {
                let placeholder = ClientNode::placeholder(ParentKey::Root);
                let key = placeholder.key;
                self.tree.push(placeholder);
                key
            }
        };
        self.focus = Some(key);
        self.load_detail(key, None).await
    }

    // -- remove ---------------------------------------------------------------

    /// Discard a placeholder locally.
    fn clear_placeholder(&mut self, key: NodeKey) {
        self.tree.remove_subtree(key);
        self.focus = None;
        self.detail = DetailPanel::Empty;
        self.alert = Some(Alert::new(
            AlertLevel::Info,
            self.titles.format(EMPTY_NODE_REMOVED),
        ));
    }

    /// Validate a remove of the focused node and mark it busy.
    ///
    /// Returns `None` when the remove completed locally (placeholder) or a
    /// listener vetoed it.
    pub fn prepare_remove(&mut self) -> Result<Option<PendingRemove>> {
        let key = self.focus.ok_or(ClientError::NoFocus)?;
        let node = self.tree.get(key).ok_or(ClientError::UnknownNode { key })?;
        if node.disabled {
            return Err(ClientError::Disabled { key });
        }
        let Some(id) = key.node_id() else {
            self.clear_placeholder(key);
            return Ok(None);
        };
        if self.is_busy(key) {
            return Err(ClientError::Busy { key });
        }
        if !self.events.raise(TreeEvent::BeforeRemove { key }) {
            return Ok(None);
        }

        self.in_flight.insert(key);
        self.alert = None;
        Ok(Some(PendingRemove {
            key,
            request: RemoveRequest {
                id,
                payload: self.remove.clone(),
                signature: self.tokens.remove.clone(),
            },
        }))
    }

    /// Reconcile the answer to a prepared remove.
    pub fn finish_remove(
        &mut self,
        pending: PendingRemove,
        response: std::result::Result<ActionEnvelope, TransportError>,
    ) -> Result<()> {
        let key = pending.key;
        self.in_flight.remove(&key);

        let envelope = match response {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(%key, error = %err, "remove request failed");
                self.fail(TreeEvent::RemoveError {
                    key,
                    message: err.to_string(),
                });
                return Err(err.into());
            }
        };

        if !envelope.is_success() {
            let message = envelope.out.message().to_string();
            self.fail_with(
                TreeEvent::RemoveError {
                    key,
                    message: message.clone(),
                },
                &envelope.out,
            );
            return Err(ClientError::rejected(message));
        }

        let message = envelope.out.message().to_string();
        let reconcile = self.remove_reconcile();
        let touched = ops::apply_remove(&mut self.tree, key, reconcile);
        if reconcile == RemoveReconcile::Drop {
            self.focus = None;
            self.detail = DetailPanel::Empty;
        }
        self.alert = Some(Alert::new(AlertLevel::Info, message.clone()));
        tracing::info!(%key, touched = touched.len(), ?reconcile, "node removed");
        self.events.notify(TreeEvent::Remove { key, message });
        Ok(())
    }

    /// Remove the focused node.
    pub async fn remove(&mut self) -> Result<()> {
        let Some(pending) = self.prepare_remove()? else {
            return Ok(());
        };
        let response = self.transport.remove(pending.request.clone()).await;
        self.finish_remove(pending, response)
    }

    // -- move -----------------------------------------------------------------

    /// Validate a move of the focused node and mark it busy.
    ///
    /// Returns `None` when a listener vetoed the move.
    pub fn prepare_move(&mut self, direction: Direction) -> Result<Option<PendingMove>> {
        let key = self.focus.ok_or(ClientError::NoFocus)?;
        let plan = ops::plan_move(&self.tree, key, direction)?;
        if self.is_busy(key) {
            return Err(ClientError::Busy { key });
        }
        if !self.events.raise(TreeEvent::BeforeMove {
            direction,
            from: key,
            to: NodeKey::Node(plan.to),
        }) {
            return Ok(None);
        }

        self.in_flight.insert(key);
        Ok(Some(PendingMove {
            key,
            plan,
            request: MoveRequest {
                id_from: plan.from,
                id_to: plan.to,
                direction,
                payload: self.move_.clone(),
                signature: self.tokens.move_.clone(),
            },
        }))
    }

    /// Reconcile the answer to a prepared move.
    ///
    /// On success the same positional transform is applied locally. A move
    /// across levels reloads the detail panel past the cache.
    pub async fn finish_move(
        &mut self,
        pending: PendingMove,
        response: std::result::Result<ActionEnvelope, TransportError>,
    ) -> Result<()> {
        let PendingMove { key, plan, .. } = pending;
        self.in_flight.remove(&key);
        let error_event = move |message: String| TreeEvent::MoveError {
            direction: plan.direction,
            from: key,
            to: NodeKey::Node(plan.to),
            message,
        };

        let envelope = match response {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(%key, error = %err, "move request failed");
                self.fail(error_event(err.to_string()));
                return Err(err.into());
            }
        };

        let message = envelope.out.message().to_string();
        if !envelope.is_success() {
            self.fail_with(error_event(message.clone()), &envelope.out);
            return Err(ClientError::rejected(message));
        }

        ops::apply_move(&mut self.tree, &plan);
        tracing::info!(%key, direction = %plan.direction, to = %plan.to, "node moved");
        self.events.notify(TreeEvent::Move {
            direction: plan.direction,
            from: key,
            to: NodeKey::Node(plan.to),
            message: message.clone(),
        });

        let notice = Alert::new(AlertLevel::Success, message);
        match plan.direction {
            Direction::Left | Direction::Right => {
                let ttl = self.cache.ttl();
                self.cache.set_ttl(0);
                let reloaded = self.load_detail(key, Some(notice)).await;
                self.cache.set_ttl(ttl);
                reloaded
            }
            Direction::Up | Direction::Down => {
                self.alert = Some(notice);
                Ok(())
            }
        }
    }

    /// Move the focused node one step in `direction`.
    pub async fn move_node(&mut self, direction: Direction) -> Result<()> {
        let Some(pending) = self.prepare_move(direction)? else {
            return Ok(());
        };
        let response = self.transport.move_node(pending.request.clone()).await;
        self.finish_move(pending, response).await
    }

    // -- failures -------------------------------------------------------------

    fn fail(&mut self, event: TreeEvent) {
        let message = match &event {
            TreeEvent::RemoveError { message, .. } | TreeEvent::MoveError { message, .. } => {
                message.clone()
            }
            _ => String::new(),
        };
        if self.events.raise(event) {
            self.alert = Some(Alert::new(AlertLevel::Danger, message));
        }
    }

    fn fail_with(&mut self, event: TreeEvent, out: &ActionOutput) {
        if !self.events.raise(event) {
            return;
        }
        let alert = Alert::new(AlertLevel::Danger, out.message());
        self.alert = Some(match out {
            ActionOutput::Failures { items, .. } => alert.with_items(items.clone()),
            _ => alert,
        });
    }
}
