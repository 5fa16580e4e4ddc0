use proptest::prelude::*;
use rvlist::{NodeId, RecordingHost, VirtualList, VirtualTree};

// ---------------------------------------------------------------------------
// Operation generators
// ---------------------------------------------------------------------------

/// List operation with positions taken modulo the current length.
#[derive(Debug, Clone)]
enum ListOp {
    Viewport(u32, u16),
    Insert(u16, Vec<u8>),
    Erase(u16, u8),
    Sort(bool),
    Select(u16),
    ScrollTo(u16),
    Resize(u16, u8),
    Width(u16),
}

fn height(raw: u8) -> u64 {
    u64::from(raw % 60) + 1
}

fn list_op() -> impl Strategy<Value = ListOp> {
    prop_oneof![
        4 => (any::<u32>(), 1u16..800).prop_map(|(o, e)| ListOp::Viewport(o % 40_000, e)),
        3 => (any::<u16>(), proptest::collection::vec(any::<u8>(), 1..30))
            .prop_map(|(at, hs)| ListOp::Insert(at, hs)),
        2 => (any::<u16>(), 1u8..40).prop_map(|(at, n)| ListOp::Erase(at, n)),
        1 => any::<bool>().prop_map(ListOp::Sort),
        1 => any::<u16>().prop_map(ListOp::Select),
        1 => any::<u16>().prop_map(ListOp::ScrollTo),
        1 => (any::<u16>(), any::<u8>()).prop_map(|(at, h)| ListOp::Resize(at, h)),
        1 => (100u16..1200).prop_map(ListOp::Width),
    ]
}

#[derive(Debug, Clone)]
enum TreeOp {
    Insert(u16, u8, bool),
    Erase(u16),
    Toggle(u16),
    Reveal(u16),
    Viewport(u32, u16),
    Sort(bool),
    Select(u16),
}

fn tree_op() -> impl Strategy<Value = TreeOp> {
    prop_oneof![
        5 => (any::<u16>(), any::<u8>(), any::<bool>()).prop_map(|(p, h, b)| TreeOp::Insert(p, h, b)),
        1 => any::<u16>().prop_map(TreeOp::Erase),
        3 => any::<u16>().prop_map(TreeOp::Toggle),
        1 => any::<u16>().prop_map(TreeOp::Reveal),
        3 => (any::<u32>(), 1u16..800).prop_map(|(o, e)| TreeOp::Viewport(o % 20_000, e)),
        1 => any::<bool>().prop_map(TreeOp::Sort),
        1 => any::<u16>().prop_map(TreeOp::Select),
    ]
}

/// Smallest contiguous range of items overlapping `[offset, offset + extent)`,
/// found by scanning prefix sums.
fn covering_range(heights: &[u64], offset: u64, extent: u64) -> Option<(usize, usize)> {
    if heights.is_empty() || extent == 0 {
        return None;
    }
    let bottom = offset.saturating_add(extent);
    let mut top = 0u64;
    let mut first = None;
    let mut last = None;
    for (i, &h) in heights.iter().enumerate() {
        let end = top + h;
        if first.is_none() && end > offset {
            first = Some(i);
        }
        if top < bottom {
            last = Some(i);
        }
        top = end;
    }
    first.zip(last)
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn list_invariants_hold_after_every_op(
        initial in proptest::collection::vec(any::<u8>(), 0..300),
        ops in proptest::collection::vec(list_op(), 1..60)
    ) {
        let mut list = VirtualList::new(RecordingHost::measurable());
        list.insert_many(0, initial.iter().map(|&h| height(h)));

        for op in ops {
            let len = list.len();
            match op {
                ListOp::Viewport(offset, extent) => {
                    list.set_viewport(u64::from(offset), u64::from(extent));
                    if let Some((_, last)) = list.visible_range() {
                        prop_assert!(list.next_precise() > last);
                    }
                }
                ListOp::Insert(at, hs) => {
                    list.insert_many(usize::from(at) % (len + 1), hs.into_iter().map(height));
                }
                ListOp::Erase(at, n) if len > 0 => {
                    let at = usize::from(at) % len;
                    let end = (at + usize::from(n)).min(len);
                    let removed = list.erase_range(at..end);
                    prop_assert_eq!(removed.len(), end - at);
                }
                ListOp::Sort(descending) => {
                    list.sort_by(|a, b| if descending { b.cmp(a) } else { a.cmp(b) });
                }
                ListOp::Select(at) if len > 0 => {
                    list.select(Some(usize::from(at) % len));
                }
                ListOp::ScrollTo(at) if len > 0 => {
                    let at = usize::from(at) % len;
                    list.scroll_to(at);
                    if list.viewport().extent > 0 {
                        prop_assert!(list.engine().window().contains(at));
                    }
                }
                ListOp::Resize(at, h) if len > 0 => {
                    list.update_item(usize::from(at) % len, |item| *item = height(h));
                }
                ListOp::Width(width) => {
                    list.set_width(u64::from(width));
                }
                _ => {}
            }
            if let Err(violation) = list.validate() {
                prop_assert!(false, "invariant broken: {}", violation);
            }
            prop_assert_eq!(list.host().stats().live, list.visible_range().map_or(0, |(f, l)| l - f + 1));
        }
    }

    #[test]
    fn window_is_minimal_cover_and_viewport_is_idempotent(
        initial in proptest::collection::vec(any::<u8>(), 1..300),
        inserted in proptest::collection::vec(any::<u8>(), 0..20),
        insert_at in any::<u16>(),
        viewports in proptest::collection::vec((0u32..30_000, 1u16..800), 1..12)
    ) {
        let mut list = VirtualList::new(RecordingHost::measurable());
        list.insert_many(0, initial.iter().map(|&h| height(h)));

        for (i, (offset, extent)) in viewports.into_iter().enumerate() {
            if i == 1 {
                let at = usize::from(insert_at) % (list.len() + 1);
                list.insert_many(at, inserted.iter().map(|&h| height(h)));
            }
            let (offset, extent) = (u64::from(offset), u64::from(extent));
            list.set_viewport(offset, extent);

            let viewport = list.viewport();
            prop_assert!(viewport.offset <= offset);
            let total: u64 = list.iter().sum();
            prop_assert!(viewport.offset < total);
            let heights: Vec<u64> = list.iter().copied().collect();
            prop_assert_eq!(
                list.visible_range(),
                covering_range(&heights, viewport.offset, viewport.extent)
            );

            let stats = list.host().stats();
            let delta = list.set_viewport(offset, extent);
            prop_assert!(delta.is_quiet());
            prop_assert_eq!(list.host().stats(), stats);
            prop_assert_eq!(list.viewport(), viewport);
        }
    }

    #[test]
    fn tree_invariants_hold_after_every_op(
        ops in proptest::collection::vec(tree_op(), 1..80)
    ) {
        let mut tree = VirtualTree::new(RecordingHost::measurable());
        let mut created: Vec<NodeId> = Vec::new();

        for op in ops {
            let alive: Vec<NodeId> = created.iter().copied().filter(|&id| tree.contains(id)).collect();
            let pick = |raw: u16| alive.get(usize::from(raw) % alive.len().max(1)).copied();
            match op {
                TreeOp::Insert(raw, h, branch) => {
                    let parent = pick(raw).filter(|&id| tree.is_branch(id) && raw % 4 != 0);
                    created.push(tree.push_node(parent, height(h), branch));
                }
                TreeOp::Erase(raw) => {
                    if let Some(id) = pick(raw) {
                        tree.erase_node(id);
                    }
                }
                TreeOp::Toggle(raw) => {
                    if let Some(id) = pick(raw).filter(|&id| tree.is_branch(id)) {
                        tree.toggle(id);
                    }
                }
                TreeOp::Reveal(raw) => {
                    if let Some(id) = pick(raw) {
                        tree.reveal(id);
                        prop_assert!(tree.find(id).is_some());
                    }
                }
                TreeOp::Viewport(offset, extent) => {
                    tree.set_viewport(u64::from(offset), u64::from(extent));
                }
                TreeOp::Sort(descending) => {
                    tree.sort(|a, b| if descending { b.cmp(a) } else { a.cmp(b) });
                }
                TreeOp::Select(raw) => {
                    if let Some(id) = pick(raw) {
                        tree.select(Some(id));
                        let selected = tree.selected();
                        prop_assert!(selected.is_some_and(|s| tree.is_shown(s)));
                    }
                }
            }
            if let Err(violation) = tree.validate() {
                prop_assert!(false, "invariant broken: {}", violation);
            }
            for &id in tree.shown() {
                prop_assert_eq!(tree.node_at(tree.find(id).unwrap_or(usize::MAX)), Some(id));
            }
        }
    }
}
