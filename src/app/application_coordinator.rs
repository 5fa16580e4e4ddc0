//! Application-level workflows: loading scripts, generating demo content and
//! routing panel interactions into the containers.

use crate::app::{AppState, PanelMode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rvlist::{apply_list_op, Extent, ListEvent, NodeId, Script, ScriptError, Target, TreeEvent, TreeReplay};
use std::path::Path;

const DEMO_ROWS: usize = 10_000;
const DEMO_ROOTS: usize = 200;
const DEMO_MAX_DEPTH: usize = 3;
const DEMO_MAX_CHILDREN: usize = 8;

fn row_height(rng: &mut StdRng) -> Extent {
    rng.gen_range(18..=60)
}

pub struct ApplicationCoordinator;

impl ApplicationCoordinator {
    /// Loads a script and replays it into the matching panel.
    ///
    /// The panel keeps whatever state the script reached when a step fails.
    pub fn open_script(state: &mut AppState, path: &Path) {
        state.reset_containers();
        match Script::load(path) {
            Ok(script) => {
                state.source = Some(path.to_path_buf());
                state.seed = script.seed;
                if let Err(err) = Self::replay_into(state, &script) {
                    state.error_message = Some(format!("Replay stopped: {err}"));
                }
            }
            Err(err) => {
                state.error_message = Some(format!("Error loading script: {err}"));
            }
        }
    }

    fn replay_into(state: &mut AppState, script: &Script) -> Result<(), ScriptError> {
        match script.target {
            Target::List => {
                state.mode = PanelMode::List;
                for (step, op) in script.ops.iter().enumerate() {
                    apply_list_op(&mut state.list, step, op)?;
                }
                state.list.drain_events();
            }
            Target::Tree => {
                state.mode = PanelMode::Tree;
                let mut replay = TreeReplay::new();
                for (step, op) in script.ops.iter().enumerate() {
                    replay.apply(&mut state.tree, step, op)?;
                }
                state.tree.drain_events();
            }
        }
        tracing::info!(ops = script.ops.len(), target = script.target.name(), "script replayed");
        Ok(())
    }

    /// Fills both panels with random rows and nodes.
    pub fn open_demo(state: &mut AppState, seed: u64) {
        state.reset_containers();
        state.seed = Some(seed);
        let mut rng = StdRng::seed_from_u64(seed);

        let heights: Vec<Extent> = (0..DEMO_ROWS).map(|_| row_height(&mut rng)).collect();
        state.list.insert_many(0, heights);

        for _ in 0..DEMO_ROOTS {
            Self::generate_node(state, &mut rng, None, 0);
        }
        // Start with everything below the roots folded
        for root in state.tree.roots().to_vec() {
            if state.tree.is_branch(root) {
                state.tree.fold(root);
            }
        }
        state.tree.drain_events();
    }

    fn generate_node(state: &mut AppState, rng: &mut StdRng, parent: Option<NodeId>, depth: usize) {
        let branch = depth < DEMO_MAX_DEPTH && rng.gen_bool(0.6);
        let id = state.tree.push_node(parent, row_height(rng), branch);
        if branch {
            let children = rng.gen_range(1..=DEMO_MAX_CHILDREN);
            for _ in 0..children {
                Self::generate_node(state, rng, Some(id), depth + 1);
            }
        }
    }

    pub fn sort(state: &mut AppState, descending: bool) {
        let compare = |a: &Extent, b: &Extent| if descending { b.cmp(a) } else { a.cmp(b) };
        match state.mode {
            PanelMode::List => {
                state.list.sort_by(compare);
            }
            PanelMode::Tree => {
                state.tree.sort(compare);
            }
        }
    }

    pub fn select_row(state: &mut AppState, at: usize) {
        let target = if state.list.selected() == Some(at) { None } else { Some(at) };
        state.list.select(target);
    }

    /// Moves the list selection to the next selectable row and scrolls to it.
    pub fn step_selection(state: &mut AppState, backward: bool) {
        let from = match (state.list.selected(), backward) {
            (Some(at), false) => at + 1,
            (Some(at), true) => at.saturating_sub(1),
            (None, _) => 0,
        };
        if from >= state.list.len() {
            return;
        }
        if let Some(next) = state.list.next_selectable(from, backward) {
            state.list.select(Some(next));
            state.list.scroll_to(next);
            state.list_scroll = state.list.viewport().offset as f32;
        }
    }

    pub fn select_node(state: &mut AppState, id: NodeId) {
        let target = if state.tree.selected() == Some(id) { None } else { Some(id) };
        state.tree.select(target);
    }

    pub fn toggle_node(state: &mut AppState, id: NodeId) {
        if state.tree.is_branch(id) {
            state.tree.toggle(id);
        }
    }

    /// Drains container events into the status bar log.
    pub fn collect_events(state: &mut AppState) {
        for event in state.list.drain_events() {
            let ListEvent::SelectionChanged { previous, current } = event;
            state.log_event(format!("list selection {previous:?} -> {current:?}"));
        }
        for event in state.tree.drain_events() {
            let line = match event {
                TreeEvent::SelectionChanged { previous, current } => format!(
                    "tree selection {} -> {}",
                    previous.map_or("none".to_string(), |id| id.to_string()),
                    current.map_or("none".to_string(), |id| id.to_string()),
                ),
                TreeEvent::FoldChanged { node, folded } => {
                    format!("{node} {}", if folded { "folded" } else { "unfolded" })
                }
            };
            state.log_event(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvlist::{EngineConfig, Op};

    fn state() -> AppState {
        AppState::new(EngineConfig::default(), PanelMode::List)
    }

    #[test]
    fn test_demo_is_deterministic() {
        let mut a = state();
        let mut b = state();
        ApplicationCoordinator::open_demo(&mut a, 7);
        ApplicationCoordinator::open_demo(&mut b, 7);

        assert_eq!(a.list.len(), DEMO_ROWS);
        assert_eq!(a.list.iter().collect::<Vec<_>>(), b.list.iter().collect::<Vec<_>>());
        assert_eq!(a.tree.len(), b.tree.len());
        assert_eq!(a.tree.shown_len(), DEMO_ROOTS);
        assert!(a.tree.validate().is_ok());
    }

    #[test]
    fn test_open_script_switches_panel() {
        let path = std::env::temp_dir().join(format!("rvlist-gui-script-{}.json", std::process::id()));
        let mut script = Script::new(Target::Tree);
        script.ops.push(Op::InsertNode { parent: None, index: None, height: 20, branch: true });
        script.ops.push(Op::InsertNode { parent: Some(0), index: None, height: 20, branch: false });
        script.save(&path).unwrap();

        let mut state = state();
        ApplicationCoordinator::open_script(&mut state, &path);
        std::fs::remove_file(&path).ok();

        assert_eq!(state.mode, PanelMode::Tree);
        assert_eq!(state.tree.shown_len(), 2);
        assert_eq!(state.error_message, None);
    }

    #[test]
    fn test_missing_script_reports_error() {
        let mut state = state();
        ApplicationCoordinator::open_script(&mut state, Path::new("/nonexistent/rvlist.json"));
        assert!(state.error_message.is_some());
    }

    #[test]
    fn test_step_selection_and_events() {
        let mut state = state();
        state.list.insert_many(0, vec![20; 50]);
        state.list.set_viewport(0, 100);

        ApplicationCoordinator::step_selection(&mut state, false);
        ApplicationCoordinator::step_selection(&mut state, false);
        assert_eq!(state.list.selected(), Some(1));

        ApplicationCoordinator::collect_events(&mut state);
        assert_eq!(state.event_log.len(), 2);
        assert_eq!(state.event_log[1], "list selection Some(0) -> Some(1)");
    }
}
