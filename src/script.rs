//! Operation scripts.
//!
//! A [`Script`] is a recorded sequence of container operations stored as JSON
//! (Brotli-compressed when the file name ends with `.br`). [`replay`] drives a
//! fresh list or tree through it and checks every invariant after each step,
//! which makes scripts usable as regression cases, benchmarks and GUI demos.
//!
//! List items and tree payloads are plain heights. Tree operations address
//! nodes by creation order: node `n` is the `n`-th node inserted by the script.

use crate::config::EngineConfig;
use crate::error::ScriptError;
use crate::host::{HostStats, ItemHost, RecordingHost};
use crate::list::VirtualList;
use crate::slot::Extent;
use crate::tree::{NodeId, VirtualTree};
use brotli::enc::BrotliEncoderParams;
use brotli::{CompressorWriter, Decompressor};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{info, trace};

/// Container a script drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    List,
    Tree,
}

impl Target {
    pub fn name(self) -> &'static str {
        match self {
            Target::List => "list",
            Target::Tree => "tree",
        }
    }
}

fn one() -> usize {
    1
}

/// A single scripted operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Viewport {
        offset: Extent,
        extent: Extent,
    },
    Width {
        width: Extent,
    },
    /// Sorts the list, or every sibling group of the tree, by height.
    Sort {
        #[serde(default)]
        descending: bool,
    },
    Clear,

    // List operations
    Insert {
        at: usize,
        heights: Vec<Extent>,
    },
    Erase {
        at: usize,
        #[serde(default = "one")]
        count: usize,
    },
    Select {
        at: Option<usize>,
    },
    ScrollTo {
        at: usize,
    },
    Resize {
        at: usize,
        height: Extent,
    },

    // Tree operations
    InsertNode {
        parent: Option<usize>,
        /// Child index; appends when absent.
        #[serde(default)]
        index: Option<usize>,
        height: Extent,
        #[serde(default)]
        branch: bool,
    },
    EraseNode {
        node: usize,
    },
    Fold {
        node: usize,
    },
    Unfold {
        node: usize,
    },
    Reveal {
        node: usize,
    },
    SortChildren {
        parent: Option<usize>,
        #[serde(default)]
        descending: bool,
    },
    SelectNode {
        node: Option<usize>,
    },
    ScrollToNode {
        node: usize,
    },
    ResizeNode {
        node: usize,
        height: Extent,
    },
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Viewport { .. } => "viewport",
            Op::Width { .. } => "width",
            Op::Sort { .. } => "sort",
            Op::Clear => "clear",
            Op::Insert { .. } => "insert",
            Op::Erase { .. } => "erase",
            Op::Select { .. } => "select",
            Op::ScrollTo { .. } => "scroll_to",
            Op::Resize { .. } => "resize",
            Op::InsertNode { .. } => "insert_node",
            Op::EraseNode { .. } => "erase_node",
            Op::Fold { .. } => "fold",
            Op::Unfold { .. } => "unfold",
            Op::Reveal { .. } => "reveal",
            Op::SortChildren { .. } => "sort_children",
            Op::SelectNode { .. } => "select_node",
            Op::ScrollToNode { .. } => "scroll_to_node",
            Op::ResizeNode { .. } => "resize_node",
        }
    }
}

/// A recorded operation sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub target: Target,
    /// Seed the script was generated from, if any.
    #[serde(default)]
    pub seed: Option<u64>,
    pub ops: Vec<Op>,
}

fn is_brotli(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "br")
}

impl Script {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            seed: None,
            ops: Vec::new(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ScriptError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads a script, decompressing `.br` files.
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let io_error = |source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_error)?;
        let reader: Box<dyn Read> = if is_brotli(path) {
            Box::new(Decompressor::new(file, 4096))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(serde_json::from_reader(reader)?)
    }

    /// Writes a script, compressing when the path ends with `.br`.
    pub fn save(&self, path: &Path) -> Result<(), ScriptError> {
        let io_error = |source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        };
        let bytes = serde_json::to_vec_pretty(self)?;
        let file = File::create(path).map_err(io_error)?;

        if is_brotli(path) {
            let params = BrotliEncoderParams {
                quality: 6,
                lgwin: 22,
                ..Default::default()
            };
            let mut writer = CompressorWriter::with_params(BufWriter::new(file), 4096, &params);
            writer.write_all(&bytes).map_err(io_error)?;
            writer.into_inner().flush().map_err(io_error)
        } else {
            let mut writer = BufWriter::new(file);
            writer.write_all(&bytes).map_err(io_error)?;
            writer.flush().map_err(io_error)
        }
    }
}

/// Outcome of a successful [`replay`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub target: Target,
    pub steps: usize,
    /// Items (list) or shown nodes (tree) at the end.
    pub len: usize,
    pub range: Option<(usize, usize)>,
    pub total_extent: Extent,
    pub stats: HostStats,
    /// Events drained over the whole run.
    pub events: usize,
}

fn check_position(step: usize, op: &Op, position: usize, len: usize) -> Result<(), ScriptError> {
    if position < len {
        Ok(())
    } else {
        Err(ScriptError::OutOfRange {
            step,
            op: op.name(),
            position,
            len,
        })
    }
}

/// Checks an exclusive end, which may equal `len`.
fn check_end(step: usize, op: &Op, end: usize, len: usize) -> Result<(), ScriptError> {
    if end <= len {
        Ok(())
    } else {
        Err(ScriptError::OutOfRange {
            step,
            op: op.name(),
            position: end,
            len,
        })
    }
}

fn unsupported(step: usize, op: &Op, target: Target) -> ScriptError {
    ScriptError::Unsupported {
        step,
        op: op.name(),
        target: target.name(),
    }
}

/// Applies one list operation, turning caller errors into [`ScriptError`]s.
pub fn apply_list_op<H: ItemHost<Extent>>(
    list: &mut VirtualList<Extent, H>,
    step: usize,
    op: &Op,
) -> Result<(), ScriptError> {
    let len = list.len();
    match op {
        Op::Viewport { offset, extent } => {
            list.set_viewport(*offset, *extent);
        }
        Op::Width { width } => {
            list.set_width(*width);
        }
        Op::Sort { descending } => {
            let descending = *descending;
            list.sort_by(|a, b| if descending { b.cmp(a) } else { a.cmp(b) });
        }
        Op::Clear => list.clear(),
        Op::Insert { at, heights } => {
            check_end(step, op, *at, len)?;
            list.insert_many(*at, heights.iter().copied());
        }
        Op::Erase { at, count } => {
            let end = at.checked_add(*count).unwrap_or(usize::MAX);
            check_end(step, op, end, len)?;
            list.erase_range(*at..end);
        }
        Op::Select { at } => {
            if let Some(at) = at {
                check_position(step, op, *at, len)?;
            }
            list.select(*at);
        }
        Op::ScrollTo { at } => {
            check_position(step, op, *at, len)?;
            list.scroll_to(*at);
        }
        Op::Resize { at, height } => {
            check_position(step, op, *at, len)?;
            list.update_item(*at, |h| *h = *height);
        }
        _ => return Err(unsupported(step, op, Target::List)),
    }
    Ok(())
}

/// Applies tree operations and remembers the nodes a script created.
#[derive(Debug, Default, Clone)]
pub struct TreeReplay {
    nodes: Vec<NodeId>,
}

impl TreeReplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes created so far, in creation order (erased ones included).
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    fn node<T, H: ItemHost<T>>(&self, tree: &VirtualTree<T, H>, step: usize, index: usize) -> Result<NodeId, ScriptError> {
        self.nodes
            .get(index)
            .copied()
            .filter(|&id| tree.contains(id))
            .ok_or(ScriptError::UnknownNode { step, node: index })
    }

    fn parent<T, H: ItemHost<T>>(
        &self,
        tree: &VirtualTree<T, H>,
        step: usize,
        index: Option<usize>,
    ) -> Result<Option<NodeId>, ScriptError> {
        index.map(|index| self.node(tree, step, index)).transpose()
    }

    pub fn apply<H: ItemHost<Extent>>(
        &mut self,
        tree: &mut VirtualTree<Extent, H>,
        step: usize,
        op: &Op,
    ) -> Result<(), ScriptError> {
        let rejected = |reason| ScriptError::Rejected {
            step,
            op: op.name(),
            reason,
        };
        match op {
            Op::Viewport { offset, extent } => {
                tree.set_viewport(*offset, *extent);
            }
            Op::Width { width } => {
                tree.set_width(*width);
            }
            Op::Sort { descending } => {
                let descending = *descending;
                tree.sort(|a, b| if descending { b.cmp(a) } else { a.cmp(b) });
            }
            Op::Clear => tree.clear(),
            Op::InsertNode {
                parent,
                index,
                height,
                branch,
            } => {
                let parent = self.parent(tree, step, *parent)?;
                if let Some(parent) = parent {
                    if !tree.is_branch(parent) {
                        return Err(rejected("parent is not a branch"));
                    }
                }
                let siblings = match parent {
                    Some(parent) => tree.children(parent).len(),
                    None => tree.roots().len(),
                };
                let index = index.unwrap_or(siblings);
                check_end(step, op, index, siblings)?;
                let id = tree.insert_node(parent, index, *height, *branch);
                self.nodes.push(id);
            }
            Op::EraseNode { node } => {
                let id = self.node(tree, step, *node)?;
                tree.erase_node(id);
            }
            Op::Fold { node } => {
                let id = self.node(tree, step, *node)?;
                if tree.is_folded(id) {
                    return Err(rejected("node is already folded"));
                }
                tree.fold(id);
            }
            Op::Unfold { node } => {
                let id = self.node(tree, step, *node)?;
                if !tree.is_folded(id) {
                    return Err(rejected("node is not folded"));
                }
                tree.unfold(id);
            }
            Op::Reveal { node } => {
                let id = self.node(tree, step, *node)?;
                tree.reveal(id);
            }
            Op::SortChildren { parent, descending } => {
                let parent = self.parent(tree, step, *parent)?;
                let descending = *descending;
                tree.sort_children(parent, |a, b| if descending { b.cmp(a) } else { a.cmp(b) });
            }
            Op::SelectNode { node } => {
                let id = self.parent(tree, step, *node)?;
                tree.select(id);
            }
            Op::ScrollToNode { node } => {
                let id = self.node(tree, step, *node)?;
                tree.scroll_to(id);
            }
            Op::ResizeNode { node, height } => {
                let id = self.node(tree, step, *node)?;
                tree.update_node(id, |h| *h = *height);
            }
            _ => return Err(unsupported(step, op, Target::Tree)),
        }
        Ok(())
    }
}

/// Replays `script` on a fresh container, validating after every step.
pub fn replay(script: &Script, config: &EngineConfig) -> Result<ReplayReport, ScriptError> {
    info!(target = script.target.name(), steps = script.ops.len(), "replaying script");
    let mut events = 0;

    match script.target {
        Target::List => {
            let mut list = VirtualList::with_config(RecordingHost::measurable(), config);
            for (step, op) in script.ops.iter().enumerate() {
                trace!(step, op = op.name(), "replay step");
                apply_list_op(&mut list, step, op)?;
                events += list.drain_events().len();
                list.validate()
                    .map_err(|violation| ScriptError::Invariant { step, violation })?;
            }
            Ok(ReplayReport {
                target: Target::List,
                steps: script.ops.len(),
                len: list.len(),
                range: list.visible_range(),
                total_extent: list.total_extent(),
                stats: list.host().stats(),
                events,
            })
        }
        Target::Tree => {
            let mut tree = VirtualTree::with_config(RecordingHost::measurable(), config);
            let mut replay = TreeReplay::new();
            for (step, op) in script.ops.iter().enumerate() {
                trace!(step, op = op.name(), "replay step");
                replay.apply(&mut tree, step, op)?;
                events += tree.drain_events().len();
                tree.validate()
                    .map_err(|violation| ScriptError::Invariant { step, violation })?;
            }
            Ok(ReplayReport {
                target: Target::Tree,
                steps: script.ops.len(),
                len: tree.shown_len(),
                range: tree.visible_range(),
                total_extent: tree.total_extent(),
                stats: tree.host().stats(),
                events,
            })
        }
    }
}
