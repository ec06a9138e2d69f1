//! Controller flows against the real service through a loopback transport

#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_matches::assert_matches;
use canopy_client::{
    AlertLevel, ClientError, DetailPanel, EventControl, NodeKey, Toolbar, TreeController,
    TreeEvent,
};
use canopy_core::{
    ActionPolicy, CanopyConfig, Direction, HierarchyStore, NodeFlag, NodeId, NodeTransport,
    ParentKey,
};
use canopy_testkit::{
    init_test_tracing, ControllableClock, LoopbackTransport, RecordedCall, TreeFixture,
};

const CATALOG: &[(u32, &str)] = &[
    (0, "Electronics"),
    (1, "Phones"),
    (1, "Laptops"),
    (2, "Ultrabooks"),
    (1, "Tablets"),
    (0, "Books"),
];

type Controller = TreeController<LoopbackTransport, ControllableClock>;

fn key(id: u64) -> NodeKey {
    NodeKey::Node(NodeId(id))
}

async fn catalog() -> (TreeFixture, ControllableClock, Controller) {
    init_test_tracing();
    let fx = TreeFixture::new(CATALOG).await.unwrap();
    let clock = ControllableClock::new(1_000);
    let ctrl = fx.controller(clock.clone());
    (fx, clock, ctrl)
}

async fn catalog_with(config: CanopyConfig) -> (TreeFixture, ControllableClock, Controller) {
    catalog_signed(config, ActionPolicy::default()).await
}

async fn catalog_signed(
    config: CanopyConfig,
    policy: ActionPolicy,
) -> (TreeFixture, ControllableClock, Controller) {
    init_test_tracing();
    let fx = TreeFixture::with_policy(CATALOG, config, policy).await.unwrap();
    let clock = ControllableClock::new(1_000);
    let ctrl = fx.controller(clock.clone());
    (fx, clock, ctrl)
}

fn client_children(ctrl: &Controller, parent: u64) -> Vec<NodeId> {
    ctrl.tree()
        .get(key(parent))
        .unwrap()
        .children()
        .iter()
        .filter_map(|k| k.node_id())
        .collect()
}

// -- detail and cache ---------------------------------------------------------

#[tokio::test]
async fn select_loads_detail_and_reuses_cache_within_ttl() {
    let (_fx, clock, mut ctrl) = catalog().await;

    ctrl.select(key(3)).await.unwrap();
    assert_eq!(ctrl.focus(), Some(key(3)));
    let detail = ctrl.detail().detail().unwrap();
    assert_eq!(detail.node.as_ref().unwrap().attrs.name, "Laptops");
    assert_eq!(ctrl.transport().manage_calls(), 1);

    clock.advance(299_999);
    ctrl.select(key(3)).await.unwrap();
    assert_eq!(ctrl.transport().manage_calls(), 1);

    clock.advance(1);
    ctrl.select(key(3)).await.unwrap();
    assert_eq!(ctrl.transport().manage_calls(), 2);
}

#[tokio::test]
async fn cache_can_be_disabled() {
    let mut config = CanopyConfig::default();
    config.client.cache_enabled = false;
    let (_fx, _clock, mut ctrl) = catalog_with(config).await;

    ctrl.select(key(2)).await.unwrap();
    ctrl.select(key(2)).await.unwrap();
    assert_eq!(ctrl.transport().manage_calls(), 2);
    assert!(ctrl.cache().is_empty());
}

#[tokio::test]
async fn select_unknown_node_is_refused() {
    let (_fx, _clock, mut ctrl) = catalog().await;
    assert_matches!(
        ctrl.select(key(99)).await,
        Err(ClientError::UnknownNode { .. })
    );
    assert_eq!(ctrl.transport().manage_calls(), 0);
}

#[tokio::test]
async fn vetoed_select_leaves_panel_empty() {
    let (_fx, _clock, mut ctrl) = catalog().await;
    ctrl.listen(|event| match event {
        TreeEvent::BeforeSelect { .. } => EventControl::Veto,
        _ => EventControl::Proceed,
    });

    ctrl.select(key(2)).await.unwrap();
    assert_eq!(ctrl.detail(), &DetailPanel::Empty);
    assert_eq!(ctrl.transport().manage_calls(), 0);
}

#[tokio::test]
async fn network_failure_shows_error_panel() {
    let (_fx, _clock, mut ctrl) = catalog().await;
    ctrl.transport().fail_next_request();

    assert_matches!(ctrl.select(key(2)).await, Err(ClientError::Transport(_)));
    assert_matches!(ctrl.detail(), DetailPanel::Error { key: k, .. } if *k == key(2));
    assert!(ctrl.cache().is_empty());

    ctrl.select(key(2)).await.unwrap();
    assert!(ctrl.detail().detail().is_some());
}

#[tokio::test]
async fn saved_selection_is_focused_on_load() {
    init_test_tracing();
    let fx = TreeFixture::new(CATALOG).await.unwrap();
    let attrs = fx
        .effects
        .store
        .find(NodeId(4))
        .await
        .unwrap()
        .unwrap()
        .attrs
        .named("Ultrabooks Pro");
    let request = fx.save_request(Some(NodeId(4)), None, attrs).await.unwrap();
    assert!(fx.service.save(&fx.effects, request).await.is_success());
    fx.effects.store.set_flag(NodeId(3), NodeFlag::Collapsed, true).await;

    let page = fx
        .service
        .tree_page(
            &fx.effects,
            fx.page.manage.clone(),
            fx.page.remove.clone(),
            fx.page.move_.clone(),
        )
        .await
        .unwrap();
    let fx = TreeFixture { page, ..fx };
    let ctrl = fx.controller(ControllableClock::new(0));

    assert_eq!(ctrl.focus(), Some(key(4)));
    assert!(!ctrl.tree().get(key(3)).unwrap().collapsed);
    assert!(!ctrl.tree().get(key(1)).unwrap().collapsed);
    assert_eq!(ctrl.transport().manage_calls(), 0);
}

// -- moves --------------------------------------------------------------------

#[tokio::test]
async fn up_and_down_mirror_the_store() {
    let (fx, _clock, mut ctrl) = catalog().await;
    ctrl.select(key(3)).await.unwrap();

    ctrl.move_node(Direction::Up).await.unwrap();
    let server = fx.effects.store.child_ids(Some(NodeId(1))).await;
    assert_eq!(server, vec![NodeId(3), NodeId(2), NodeId(5)]);
    assert_eq!(client_children(&ctrl, 1), server);
    assert_eq!(ctrl.alert().unwrap().level, AlertLevel::Success);

    ctrl.move_node(Direction::Down).await.unwrap();
    let server = fx.effects.store.child_ids(Some(NodeId(1))).await;
    assert_eq!(server, vec![NodeId(2), NodeId(3), NodeId(5)]);
    assert_eq!(client_children(&ctrl, 1), server);
    assert_eq!(ctrl.transport().manage_calls(), 1);
}

#[tokio::test]
async fn cross_level_move_reloads_past_the_cache() {
    let (fx, _clock, mut ctrl) = catalog().await;
    ctrl.select(key(5)).await.unwrap();
    assert_eq!(ctrl.transport().manage_calls(), 1);

    ctrl.move_node(Direction::Right).await.unwrap();
    assert_eq!(fx.effects.store.child_ids(Some(NodeId(3))).await, vec![NodeId(4), NodeId(5)]);
    assert_eq!(client_children(&ctrl, 3), vec![NodeId(4), NodeId(5)]);
    assert_eq!(ctrl.tree().get(key(5)).unwrap().parent(), Some(key(3)));
    assert_eq!(ctrl.transport().manage_calls(), 2);
    assert_eq!(ctrl.cache().ttl(), 300_000);
    assert_eq!(ctrl.alert().unwrap().level, AlertLevel::Success);

    ctrl.move_node(Direction::Left).await.unwrap();
    assert_eq!(
        fx.effects.store.child_ids(Some(NodeId(1))).await,
        vec![NodeId(2), NodeId(3), NodeId(5)]
    );
    assert_eq!(client_children(&ctrl, 1), vec![NodeId(2), NodeId(3), NodeId(5)]);
    assert_eq!(ctrl.transport().manage_calls(), 3);
}

#[tokio::test]
async fn refused_root_promotion_leaves_tree_untouched() {
    let policy = ActionPolicy {
        allow_new_roots: false,
        ..ActionPolicy::default()
    };
    let (fx, _clock, mut ctrl) = catalog_signed(CanopyConfig::default(), policy).await;
    let before = ctrl.tree().clone();
    ctrl.select(key(2)).await.unwrap();

    let result = ctrl.move_node(Direction::Left).await;
    assert_matches!(result, Err(ClientError::Rejected { .. }));
    assert_eq!(ctrl.tree(), &before);
    assert_eq!(ctrl.alert().unwrap().level, AlertLevel::Danger);
    assert!(!ctrl.is_busy(key(2)));
    assert_eq!(fx.effects.store.parent_of(NodeId(2)).await, Some(NodeId(1)));
}

#[tokio::test]
async fn committed_move_is_mirrored_even_when_listener_objects() {
    let (fx, _clock, mut ctrl) = catalog().await;
    ctrl.listen(|event| match event {
        TreeEvent::Move { .. } => EventControl::Veto,
        _ => EventControl::Proceed,
    });
    let mut rx = ctrl.subscribe();
    ctrl.select(key(3)).await.unwrap();

    ctrl.move_node(Direction::Up).await.unwrap();
    let server = fx.effects.store.child_ids(Some(NodeId(1))).await;
    assert_eq!(server, vec![NodeId(3), NodeId(2), NodeId(5)]);
    assert_eq!(client_children(&ctrl, 1), server);

    let mut moved = false;
    while let Ok(event) = rx.try_recv() {
        moved |= matches!(event, TreeEvent::Move { .. });
    }
    assert!(moved);
}

#[tokio::test]
async fn boundary_moves_fail_locally() {
    let (_fx, _clock, mut ctrl) = catalog().await;
    ctrl.select(key(2)).await.unwrap();

    assert_matches!(ctrl.move_node(Direction::Up).await, Err(ClientError::AtTop));
    assert_matches!(ctrl.move_node(Direction::Right).await, Err(ClientError::AtRightmost));
    ctrl.select(key(6)).await.unwrap();
    assert_matches!(ctrl.move_node(Direction::Left).await, Err(ClientError::AtLeftmost));
    assert_eq!(
        ctrl.transport()
            .calls()
            .iter()
            .filter(|call| **call == RecordedCall::Move)
            .count(),
        0
    );
}

#[tokio::test]
async fn second_request_for_a_busy_node_is_refused() {
    let (_fx, _clock, mut ctrl) = catalog().await;
    ctrl.select(key(3)).await.unwrap();

    let pending = ctrl.prepare_move(Direction::Up).unwrap().unwrap();
    assert!(ctrl.is_busy(key(3)));
    assert_eq!(ctrl.toolbar(), Toolbar::disabled());
    assert_matches!(
        ctrl.prepare_move(Direction::Down),
        Err(ClientError::Busy { .. })
    );
    assert_matches!(ctrl.prepare_remove(), Err(ClientError::Busy { .. }));

    let response = ctrl.transport().move_node(pending.request.clone()).await;
    ctrl.finish_move(pending, response).await.unwrap();
    assert!(!ctrl.is_busy(key(3)));
    assert!(ctrl.toolbar().move_down);
}

#[tokio::test]
async fn injected_network_failure_on_move() {
    let (fx, _clock, mut ctrl) = catalog().await;
    ctrl.select(key(3)).await.unwrap();
    let before = ctrl.tree().clone();

    ctrl.transport().fail_next_request();
    assert_matches!(
        ctrl.move_node(Direction::Up).await,
        Err(ClientError::Transport(_))
    );
    assert_eq!(ctrl.tree(), &before);
    assert_eq!(ctrl.alert().unwrap().level, AlertLevel::Danger);
    assert!(!ctrl.is_busy(key(3)));
    assert_eq!(
        fx.effects.store.child_ids(Some(NodeId(1))).await,
        vec![NodeId(2), NodeId(3), NodeId(5)]
    );
}

#[tokio::test]
async fn move_events_are_broadcast_in_order() {
    let (_fx, _clock, mut ctrl) = catalog().await;
    let mut rx = ctrl.subscribe();
    ctrl.select(key(5)).await.unwrap();
    ctrl.move_node(Direction::Up).await.unwrap();

    let mut names = Vec::new();
    while let Ok(event) = rx.try_recv() {
        names.push(event.name());
    }
    assert_eq!(names, vec!["beforeselect", "selected", "beforemove", "move"]);
}

// -- create and remove --------------------------------------------------------

#[tokio::test]
async fn placeholder_create_and_remove_stay_local() {
    let (_fx, _clock, mut ctrl) = catalog().await;
    ctrl.select(key(3)).await.unwrap();

    ctrl.create().await.unwrap();
    let placeholder = NodeKey::Placeholder(ParentKey::Node(NodeId(3)));
    assert_eq!(ctrl.focus(), Some(placeholder));
    assert_eq!(ctrl.tree().get(placeholder).unwrap().parent(), Some(key(3)));
    assert!(ctrl.detail().detail().unwrap().is_new());

    assert_matches!(
        ctrl.move_node(Direction::Up).await,
        Err(ClientError::UnsavedMove { .. })
    );
    assert_matches!(ctrl.create().await, Err(ClientError::InvalidCreateTarget));

    ctrl.remove().await.unwrap();
    assert!(!ctrl.tree().contains(placeholder));
    assert_eq!(ctrl.focus(), None);
    assert_eq!(ctrl.alert().unwrap().level, AlertLevel::Info);
    assert!(!ctrl.transport().calls().contains(&RecordedCall::Remove));
}

#[tokio::test]
async fn create_reuses_an_open_placeholder() {
    let (_fx, _clock, mut ctrl) = catalog().await;
    ctrl.create_root().await.unwrap();
    let root = NodeKey::Placeholder(ParentKey::Root);
    assert_eq!(ctrl.tree().roots().last(), Some(&root));

    ctrl.select(key(6)).await.unwrap();
    ctrl.create_root().await.unwrap();
    assert_eq!(ctrl.focus(), Some(root));
    assert_eq!(
        ctrl.tree().roots().iter().filter(|k| k.is_placeholder()).count(),
        1
    );
}

#[tokio::test]
async fn create_needs_a_focused_node() {
    let (_fx, _clock, mut ctrl) = catalog().await;
    assert_matches!(ctrl.create().await, Err(ClientError::InvalidCreateTarget));
}

#[tokio::test]
async fn soft_remove_drops_node_for_regular_users() {
    let (fx, _clock, mut ctrl) = catalog().await;
    ctrl.select(key(5)).await.unwrap();

    ctrl.remove().await.unwrap();
    assert!(!ctrl.tree().contains(key(5)));
    assert_eq!(ctrl.focus(), None);
    assert_eq!(ctrl.detail(), &DetailPanel::Empty);
    assert_eq!(ctrl.alert().unwrap().level, AlertLevel::Info);
    let node = fx.effects.store.find(NodeId(5)).await.unwrap().unwrap();
    assert!(!node.attrs.flags.get(NodeFlag::Active));
}

#[tokio::test]
async fn soft_remove_marks_node_inactive_for_admins() {
    let policy = ActionPolicy {
        is_admin: true,
        ..ActionPolicy::default()
    };
    let (_fx, _clock, mut ctrl) = catalog_signed(CanopyConfig::default(), policy).await;
    ctrl.select(key(5)).await.unwrap();

    ctrl.remove().await.unwrap();
    let node = ctrl.tree().get(key(5)).unwrap();
    assert!(node.inactive);
    assert_eq!(ctrl.focus(), Some(key(5)));
    assert!(!ctrl.toolbar().remove);
}

#[tokio::test]
async fn hard_delete_disables_toolbar() {
    let policy = ActionPolicy {
        soft_delete: false,
        ..ActionPolicy::default()
    };
    let (fx, _clock, mut ctrl) = catalog_signed(CanopyConfig::default(), policy).await;
    ctrl.select(key(4)).await.unwrap();

    ctrl.remove().await.unwrap();
    assert!(!ctrl.tree().contains(key(4)));
    assert!(!ctrl.tree().get(key(3)).unwrap().is_parent());
    assert_eq!(ctrl.toolbar(), Toolbar::disabled());
    assert!(fx.effects.store.find(NodeId(4)).await.unwrap().is_none());
}

#[tokio::test]
async fn server_refusal_keeps_node_and_shows_danger() {
    let (fx, _clock, mut ctrl) = catalog().await;
    fx.effects.store.set_flag(NodeId(5), NodeFlag::Removable, false).await;
    ctrl.select(key(5)).await.unwrap();

    assert_matches!(ctrl.remove().await, Err(ClientError::Rejected { .. }));
    assert!(ctrl.tree().contains(key(5)));
    assert_eq!(ctrl.alert().unwrap().level, AlertLevel::Danger);
    assert!(!ctrl.is_busy(key(5)));
}

#[tokio::test]
async fn committed_remove_is_mirrored_even_when_listener_objects() {
    let (fx, _clock, mut ctrl) = catalog().await;
    ctrl.listen(|event| match event {
        TreeEvent::Remove { .. } => EventControl::Veto,
        _ => EventControl::Proceed,
    });
    ctrl.select(key(5)).await.unwrap();

    ctrl.remove().await.unwrap();
    assert!(!ctrl.tree().contains(key(5)));
    assert_eq!(client_children(&ctrl, 1), vec![NodeId(2), NodeId(3)]);
    let node = fx.effects.store.find(NodeId(5)).await.unwrap().unwrap();
    assert!(!node.attrs.flags.get(NodeFlag::Active));
}

#[tokio::test]
async fn signed_hard_delete_wins_over_admin_mode() {
    let policy = ActionPolicy {
        soft_delete: false,
        is_admin: true,
        ..ActionPolicy::default()
    };
    let (fx, _clock, mut ctrl) = catalog_signed(CanopyConfig::default(), policy).await;
    ctrl.select(key(5)).await.unwrap();
    assert!(ctrl.toolbar().remove);

    ctrl.remove().await.unwrap();
    assert!(fx.effects.store.find(NodeId(5)).await.unwrap().is_none());
    assert!(!ctrl.tree().contains(key(5)));
}

#[tokio::test]
async fn rendered_inactive_nodes_stay_after_soft_remove() {
    let mut config = CanopyConfig::default();
    config.render.show_inactive = true;
    let (_fx, _clock, mut ctrl) = catalog_with(config).await;
    ctrl.select(key(5)).await.unwrap();

    ctrl.remove().await.unwrap();
    assert!(ctrl.tree().get(key(5)).unwrap().inactive);
}

#[tokio::test]
async fn vetoed_remove_sends_nothing() {
    let (_fx, _clock, mut ctrl) = catalog().await;
    ctrl.listen(|event| match event {
        TreeEvent::BeforeRemove { .. } => EventControl::Veto,
        _ => EventControl::Proceed,
    });
    ctrl.select(key(5)).await.unwrap();

    assert_eq!(ctrl.prepare_remove().unwrap(), None);
    assert!(!ctrl.is_busy(key(5)));
}

// -- search, expand, check ----------------------------------------------------

#[tokio::test]
async fn search_waits_for_the_debounce() {
    let (_fx, clock, mut ctrl) = catalog().await;

    ctrl.search_input("ultra");
    assert!(ctrl.search().loading);
    assert_eq!(ctrl.tick(), None);
    clock.advance(249);
    assert_eq!(ctrl.tick(), None);

    clock.advance(1);
    let outcome = ctrl.tick().unwrap();
    assert_eq!(outcome.matches, vec![key(4)]);
    assert!(ctrl.search().active_filter);
    assert!(!ctrl.search().loading);

    let tree = ctrl.tree();
    assert!(tree.get(key(4)).unwrap().highlight.is_some());
    assert!(tree.get(key(3)).unwrap().filter_match);
    assert!(!tree.get(key(3)).unwrap().collapsed);
    assert!(!tree.get(key(6)).unwrap().filter_match);
    assert_eq!(ctrl.tick(), None);

    ctrl.clear_search();
    assert!(ctrl.tree().iter().all(|node| node.highlight.is_none() && !node.filter_match));
    assert!(!ctrl.search().active_filter);
}

#[tokio::test]
async fn new_keystroke_restarts_the_debounce() {
    let (_fx, clock, mut ctrl) = catalog().await;
    ctrl.search_input("p");
    clock.advance(200);
    ctrl.search_input("pho");
    clock.advance(200);
    assert_eq!(ctrl.tick(), None);
    clock.advance(50);
    assert_eq!(ctrl.tick().unwrap().matches, vec![key(2)]);
    assert_eq!(ctrl.search().query, "pho");
}

#[tokio::test]
async fn toggle_expands_and_collapses_parents_only() {
    let (_fx, _clock, mut ctrl) = catalog().await;

    assert!(ctrl.toggle(key(1)).unwrap());
    assert!(ctrl.tree().get(key(1)).unwrap().collapsed);
    assert!(!ctrl.toggle(key(2)).unwrap());

    assert!(ctrl.toggle_all(false));
    assert!(ctrl.is_collapsed());
    assert!(ctrl.tree().get(key(3)).unwrap().collapsed);
    assert!(ctrl.toggle_all(true));
    assert!(ctrl.tree().iter().all(|node| !node.collapsed));
}

#[tokio::test]
async fn single_select_keeps_one_checked_node() {
    let (_fx, _clock, mut ctrl) = catalog().await;

    assert!(ctrl.check(key(2)).unwrap());
    assert!(ctrl.check(key(3)).unwrap());
    assert!(!ctrl.tree().get(key(2)).unwrap().selected);
    assert!(ctrl.tree().get(key(3)).unwrap().selected);
    assert_eq!(ctrl.value().keys, "3");
    assert_eq!(ctrl.value().description, "Laptops");

    assert!(ctrl.check(key(3)).unwrap());
    assert!(ctrl.value().is_empty());
    assert_matches!(ctrl.check_all(), Err(ClientError::SingleSelect));
}

#[tokio::test]
async fn multi_select_cascades_to_descendants() {
    let mut config = CanopyConfig::default();
    config.client.multiple = true;
    let (_fx, _clock, mut ctrl) = catalog_with(config).await;

    ctrl.check(key(3)).unwrap();
    assert_eq!(ctrl.value().keys, "3,4");
    ctrl.check(key(6)).unwrap();
    assert_eq!(ctrl.value().keys, "3,4,6");
    ctrl.check(key(3)).unwrap();
    assert_eq!(ctrl.value().keys, "6");

    ctrl.check_all().unwrap();
    assert!(ctrl.is_all_checked());
    assert_eq!(ctrl.value().keys, "1,2,3,4,5,6");
    ctrl.uncheck_all().unwrap();
    assert!(ctrl.value().is_empty());
}

#[tokio::test]
async fn vetoed_change_keeps_previous_value() {
    let (_fx, _clock, mut ctrl) = catalog().await;
    ctrl.check(key(2)).unwrap();
    ctrl.listen(|event| match event {
        TreeEvent::Change { .. } => EventControl::Veto,
        _ => EventControl::Proceed,
    });

    assert!(!ctrl.check(key(3)).unwrap());
    assert_eq!(ctrl.value().keys, "2");
    assert!(ctrl.tree().get(key(2)).unwrap().selected);
    assert!(!ctrl.tree().get(key(3)).unwrap().selected);
}
