use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rvlist::{replay, EngineConfig, Extent, Op, Script, Target};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const MIN_HEIGHT: Extent = 12;
const MAX_HEIGHT: Extent = 64;

struct Config {
    num_ops: usize,
    seed: u64,
    target: Target,
    output_file: Option<String>,
    use_brotli: bool,
    replay: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            num_ops: 200,
            seed: 42,
            target: Target::List,
            output_file: None,
            use_brotli: false,
            replay: false,
        }
    }
}

fn parse_args() -> Result<Config> {
    let args: Vec<String> = env::args().collect();
    let mut config = Config::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-ops" => {
                i += 1;
                if i >= args.len() {
                    anyhow::bail!("-ops requires an argument");
                }
                config.num_ops = args[i].parse()?;
            }
            "-seed" => {
                i += 1;
                if i >= args.len() {
                    anyhow::bail!("-seed requires an argument");
                }
                config.seed = args[i].parse()?;
            }
            "-tree" => {
                config.target = Target::Tree;
            }
            "-out" => {
                i += 1;
                if i >= args.len() {
                    anyhow::bail!("-out requires a file path argument");
                }
                config.output_file = Some(args[i].clone());
            }
            "-brotli" => {
                config.use_brotli = true;
            }
            "-replay" => {
                config.replay = true;
            }
            "-h" | "-help" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                tracing::warn!("unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    Ok(config)
}

fn print_help() {
    println!("Random operation script generator");
    println!("Usage: rvlist-opgen [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -ops <N>               Number of operations (default: 200)");
    println!("  -seed <N>              Random seed (default: 42)");
    println!("  -tree                  Generate a tree script instead of a list script");
    println!("  -out <FILE>            Output file path (default: ops.json)");
    println!("  -brotli                Write compressed script using Brotli (output: *.json.br)");
    println!("  -replay                Replay the script and print the report");
    println!("  -h, -help, --help      Show this help message");
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = parse_args()?;
    let output_path = PathBuf::from(config.output_file.clone().unwrap_or_else(|| {
        if config.use_brotli {
            "ops.json.br".to_string()
        } else {
            "ops.json".to_string()
        }
    }));

    let mut rng = StdRng::seed_from_u64(config.seed);
    let ops = match config.target {
        Target::List => generate_list_ops(&mut rng, config.num_ops),
        Target::Tree => generate_tree_ops(&mut rng, config.num_ops),
    };
    let script = Script {
        target: config.target,
        seed: Some(config.seed),
        ops,
    };
    script
        .save(&output_path)
        .with_context(|| format!("Failed to write script: {}", output_path.display()))?;
    println!("Script written to: {}", output_path.display());

    if config.replay {
        let report = replay(&script, &EngineConfig::load_or_default())
            .context("Replay failed")?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

fn height(rng: &mut StdRng) -> Extent {
    rng.gen_range(MIN_HEIGHT..=MAX_HEIGHT)
}

fn viewport(rng: &mut StdRng, total: Extent) -> Op {
    Op::Viewport {
        offset: rng.gen_range(0..=total.max(1)),
        extent: rng.gen_range(100..=800),
    }
}

fn generate_list_ops(rng: &mut StdRng, num_ops: usize) -> Vec<Op> {
    let mut ops = Vec::with_capacity(num_ops + 2);
    let initial = rng.gen_range(100..=2000);
    ops.push(Op::Insert {
        at: 0,
        heights: (0..initial).map(|_| height(rng)).collect(),
    });
    ops.push(Op::Viewport { offset: 0, extent: 600 });
    let mut len = initial;

    for _ in 0..num_ops {
        let op = match rng.gen_range(0..100) {
            0..=34 => viewport(rng, len as Extent * MAX_HEIGHT / 2),
            35..=49 => {
                let count = rng.gen_range(1..=20);
                let at = rng.gen_range(0..=len);
                len += count;
                Op::Insert {
                    at,
                    heights: (0..count).map(|_| height(rng)).collect(),
                }
            }
            50..=64 if len > 0 => {
                let at = rng.gen_range(0..len);
                let count = rng.gen_range(1..=(len - at).min(20));
                len -= count;
                Op::Erase { at, count }
            }
            65..=72 if len > 0 => Op::Select {
                at: Some(rng.gen_range(0..len)),
            },
            73..=80 if len > 0 => Op::ScrollTo {
                at: rng.gen_range(0..len),
            },
            81..=88 if len > 0 => Op::Resize {
                at: rng.gen_range(0..len),
                height: height(rng),
            },
            89..=93 => Op::Sort {
                descending: rng.gen_bool(0.5),
            },
            94..=96 => Op::Width {
                width: rng.gen_range(200..=1200),
            },
            97 => {
                len = 0;
                Op::Clear
            }
            _ => Op::Select { at: None },
        };
        ops.push(op);
    }
    ops
}

/// Generator-side shadow of the tree, enough to emit only valid operations.
struct NodeModel {
    parent: Option<usize>,
    branch: bool,
    folded: bool,
    alive: bool,
}

fn generate_tree_ops(rng: &mut StdRng, num_ops: usize) -> Vec<Op> {
    let mut ops = Vec::with_capacity(num_ops);
    let mut nodes: Vec<NodeModel> = Vec::new();
    ops.push(Op::Viewport { offset: 0, extent: 600 });

    for _ in 0..num_ops {
        let alive: Vec<usize> = (0..nodes.len()).filter(|&n| nodes[n].alive).collect();
        let branches: Vec<usize> = alive.iter().copied().filter(|&n| nodes[n].branch).collect();
        let pick = |rng: &mut StdRng, from: &[usize]| from[rng.gen_range(0..from.len())];

        let op = match rng.gen_range(0..100) {
            0..=39 => {
                let parent = if branches.is_empty() || rng.gen_bool(0.2) {
                    None
                } else {
                    Some(pick(rng, &branches))
                };
                let branch = rng.gen_bool(0.3);
                nodes.push(NodeModel {
                    parent,
                    branch,
                    folded: false,
                    alive: true,
                });
                Op::InsertNode {
                    parent,
                    index: None,
                    height: height(rng),
                    branch,
                }
            }
            40..=54 => viewport(rng, alive.len() as Extent * MAX_HEIGHT / 2),
            55..=64 if !branches.is_empty() => {
                let node = pick(rng, &branches);
                nodes[node].folded = !nodes[node].folded;
                if nodes[node].folded {
                    Op::Fold { node }
                } else {
                    Op::Unfold { node }
                }
            }
            65..=71 if !alive.is_empty() => {
                let node = pick(rng, &alive);
                erase_model(&mut nodes, node);
                Op::EraseNode { node }
            }
            72..=77 if !alive.is_empty() => Op::SelectNode {
                node: Some(pick(rng, &alive)),
            },
            78..=82 if !alive.is_empty() => Op::ScrollToNode {
                node: pick(rng, &alive),
            },
            83..=86 if !alive.is_empty() => {
                let node = pick(rng, &alive);
                unfold_ancestors(&mut nodes, node);
                Op::Reveal { node }
            }
            87..=91 if !alive.is_empty() => Op::ResizeNode {
                node: pick(rng, &alive),
                height: height(rng),
            },
            92..=95 => Op::SortChildren {
                parent: if branches.is_empty() { None } else { Some(pick(rng, &branches)) },
                descending: rng.gen_bool(0.5),
            },
            96..=97 => Op::Sort {
                descending: rng.gen_bool(0.5),
            },
            _ => Op::Width {
                width: rng.gen_range(200..=1200),
            },
        };
        ops.push(op);
    }
    ops
}

fn erase_model(nodes: &mut [NodeModel], node: usize) {
    nodes[node].alive = false;
    // Children always come after their parent in creation order.
    for n in node + 1..nodes.len() {
        if let Some(parent) = nodes[n].parent {
            if !nodes[parent].alive {
                nodes[n].alive = false;
            }
        }
    }
}

fn unfold_ancestors(nodes: &mut [NodeModel], node: usize) {
    let mut cursor = nodes[node].parent;
    while let Some(current) = cursor {
        nodes[current].folded = false;
        cursor = nodes[current].parent;
    }
}
