use anyhow::Result;
use rvlist::{replay, EngineConfig, ListEvent, Op, RecordingHost, Script, ScriptError, Target, TreeEvent};
use rvlist::{FnHost, ItemHost, VirtualList, VirtualTree};
use std::env;
use std::fs;

fn uniform_list(count: usize, height: u64) -> VirtualList<u64, RecordingHost<rvlist::MeasureHost>> {
    let mut list = VirtualList::new(RecordingHost::measurable());
    list.insert_many(0, vec![height; count]);
    list
}

#[test]
fn test_thousand_rows_window_and_insert() -> Result<()> {
    let mut list = uniform_list(1000, 20);
    list.set_viewport(500, 100);
    assert_eq!(list.visible_range(), Some((25, 29)));
    assert_eq!(list.total_extent(), 20_000);
    list.validate()?;

    let measured = list.host().stats().measured;
    list.insert(10, 20);
    assert_eq!(list.visible_range(), Some((26, 30)));
    assert_eq!(list.host().stats().measured, measured);
    list.validate()?;

    list.set_viewport(500, 100);
    assert_eq!(list.visible_range(), Some((25, 29)));
    assert_eq!(list.total_extent(), 20_020);
    list.validate()?;
    Ok(())
}

#[test]
fn test_tree_fold_releases_window_tail() -> Result<()> {
    let mut tree = VirtualTree::new(RecordingHost::measurable());
    for _ in 0..5 {
        tree.push_node(None, 10u64, false);
    }
    let branch = tree.push_node(None, 10, true);
    for _ in 0..40 {
        tree.push_node(Some(branch), 10, false);
    }
    for _ in 0..10 {
        tree.push_node(None, 10, false);
    }
    tree.set_viewport(0, 100);
    assert_eq!(tree.visible_range(), Some((0, 9)));
    let before = tree.shown_len();
    let released = tree.host().stats().released;

    tree.fold(branch);
    tree.validate()?;
    assert_eq!(tree.shown_len(), before - 40);
    assert_eq!(tree.visible_range(), Some((0, 5)));
    assert_eq!(tree.host().stats().released - released, 4);
    assert_eq!(tree.drain_events(), vec![TreeEvent::FoldChanged { node: branch, folded: true }]);
    Ok(())
}

/// Host that renders text rows wrapped at the given width.
struct TextHost;

impl ItemHost<String> for TextHost {
    fn measure(&mut self, item: &String, width: u64) -> u64 {
        let per_line = (width / 8).max(1);
        (item.len() as u64).div_ceil(per_line).max(1) * 16
    }

    fn selectable(&self, item: &String) -> bool {
        !item.starts_with('#')
    }
}

#[test]
fn test_width_change_remeasures_text() -> Result<()> {
    let mut list = VirtualList::new(TextHost);
    list.insert_many(0, (0..200).map(|i| "x".repeat(10 + i % 50)));
    list.set_width(800);
    list.set_viewport(0, 400);
    let wide = list.total_extent();
    list.validate()?;

    list.set_width(80);
    list.validate()?;
    assert!(list.total_extent() > wide);
    assert_eq!(list.offset_of(0), Some(0));
    Ok(())
}

#[test]
fn test_selection_skips_headers_and_survives_sort() -> Result<()> {
    let host = FnHost::new(|_: &String, _: u64| -> u64 { 20 })
        .with_selectable(|text: &String| !text.starts_with('#'));
    let mut list = VirtualList::new(host);
    list.insert_many(0, ["# fruit", "pear", "apple", "# veg", "leek"].map(String::from));
    list.set_viewport(0, 100);

    let first = list.next_selectable(0, false);
    assert_eq!(first, Some(1));
    assert!(!list.select(Some(0)));
    assert!(list.select(Some(2)));

    list.sort_by(|a, b| a.cmp(b));
    assert_eq!(list.get(list.selected().unwrap_or(usize::MAX)).map(String::as_str), Some("apple"));
    list.validate()?;

    let selected = list.selected().unwrap_or(0);
    list.erase(selected);
    assert_eq!(list.selected(), None);
    let events = list.drain_events();
    assert_eq!(
        events.last(),
        Some(&ListEvent::SelectionChanged { previous: Some(selected), current: None })
    );
    Ok(())
}

#[test]
fn test_script_file_replay() -> Result<()> {
    let path = env::temp_dir().join("rvlist_integration_script.json");
    let _ = fs::remove_file(&path);

    let mut script = Script::new(Target::List);
    script.seed = Some(9);
    script.ops = vec![
        Op::Insert { at: 0, heights: (0..500).map(|i| 10 + i % 30).collect() },
        Op::Viewport { offset: 1000, extent: 300 },
        Op::Sort { descending: true },
        Op::Erase { at: 0, count: 100 },
        Op::Resize { at: 3, height: 90 },
        Op::ScrollTo { at: 390 },
    ];
    script.save(&path)?;

    let text = fs::read_to_string(&path)?;
    assert!(text.contains("\"op\": \"scroll_to\""));

    let loaded = Script::load(&path)?;
    assert_eq!(loaded, script);
    let report = replay(&loaded, &EngineConfig::default())?;
    assert_eq!(report.len, 400);
    assert_eq!(report.range.map(|(_, last)| last), Some(390));

    fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn test_brotli_script_is_compressed() -> Result<()> {
    let plain = env::temp_dir().join("rvlist_integration_script_plain.json");
    let packed = env::temp_dir().join("rvlist_integration_script_packed.json.br");

    let mut script = Script::new(Target::Tree);
    script.ops.push(Op::InsertNode { parent: None, index: None, height: 20, branch: true });
    for _ in 0..300 {
        script.ops.push(Op::InsertNode { parent: Some(0), index: None, height: 20, branch: false });
    }
    script.ops.push(Op::Viewport { offset: 0, extent: 400 });
    script.ops.push(Op::Fold { node: 0 });
    script.save(&plain)?;
    script.save(&packed)?;

    assert!(fs::metadata(&packed)?.len() < fs::metadata(&plain)?.len());
    let report = replay(&Script::load(&packed)?, &EngineConfig::default())?;
    assert_eq!(report.len, 1);
    assert_eq!(report.events, 1);

    fs::remove_file(&plain)?;
    fs::remove_file(&packed)?;
    Ok(())
}

#[test]
fn test_replay_error_names_step() {
    let mut script = Script::new(Target::List);
    script.ops.push(Op::Insert { at: 0, heights: vec![20; 10] });
    script.ops.push(Op::Erase { at: 8, count: 5 });

    let err = replay(&script, &EngineConfig::default()).unwrap_err();
    assert!(matches!(err, ScriptError::OutOfRange { step: 1, op: "erase", .. }));
    assert_eq!(err.to_string(), "step 1: erase position 13 out of range (length 10)");
}

#[test]
fn test_config_file_drives_engine() -> Result<()> {
    let path = env::temp_dir().join("rvlist_integration_config.json");
    fs::write(&path, r#"{ "overscan": 2 }"#)?;
    let config = EngineConfig::load(&path)?;
    fs::remove_file(&path)?;

    let mut list = VirtualList::with_config(RecordingHost::measurable(), &config);
    list.insert_many(0, vec![20u64; 100]);
    list.set_viewport(200, 100);
    assert_eq!(list.visible_range(), Some((8, 16)));
    list.validate()?;
    Ok(())
}
