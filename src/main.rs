use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use collatz_forest::{
    compute_layout, trace_sample, Forest, ForestBuilder, LayoutParams, RuleConfig, RulePreset,
    RuleSet, SampleSpec, SavedTree, Trace, TraceLimits, Value,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "collatz-forest", about = "Build and lay out generalized Collatz forests")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct RuleArgs {
    /// Named rule family (classic, alternative, triple).
    #[arg(long, conflicts_with_all = ["modulus", "rule"])]
    preset: Option<RulePreset>,
    /// Modulus M; defaults to the number of --rule flags, or 2.
    #[arg(long)]
    modulus: Option<u32>,
    /// Rule for residue class i (repeat once per class, in order).
    #[arg(long = "rule")]
    rule: Vec<String>,
    /// Branch angle in degrees for residue class i (repeatable).
    #[arg(long = "angle", allow_negative_numbers = true)]
    angle: Vec<f64>,
    /// Initial heading in degrees (0 = up).
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    init_angle: f64,
}

impl RuleArgs {
    fn to_config(&self) -> RuleConfig {
        let mut config = match (self.preset, self.modulus) {
            (Some(preset), _) => preset.config(),
            (None, Some(modulus)) if self.rule.is_empty() => RuleConfig::default_for_modulus(modulus),
            (None, modulus) if !self.rule.is_empty() => {
                let modulus = modulus.unwrap_or(self.rule.len() as u32);
                RuleConfig::new(modulus, self.rule.clone())
            }
            _ => RuleConfig::classic(),
        };
        if !self.angle.is_empty() {
            config.angles = self.angle.clone();
        }
        config.init_angle = self.init_angle;
        config
    }
}

#[derive(Args, Debug, Clone)]
struct SampleArgs {
    /// Smallest sample.
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    min: Value,
    /// Number of consecutive candidates from --min.
    #[arg(long, default_value_t = 1000)]
    range: u64,
    /// Maximum number of samples (random subset when smaller than --range).
    #[arg(long)]
    samples: Option<u64>,
    /// Value of interest; always traced.
    #[arg(long, allow_negative_numbers = true)]
    start: Option<Value>,
    /// Seed for random sub-sampling.
    #[arg(long)]
    seed: Option<u64>,
    /// Magnitude ceiling for divergence.
    #[arg(long, default_value_t = collatz_forest::trace::DEFAULT_MAX_VALUE)]
    max_value: Value,
    /// Step ceiling for divergence.
    #[arg(long, default_value_t = collatz_forest::trace::DEFAULT_MAX_STEPS)]
    max_steps: usize,
}

impl SampleArgs {
    fn to_spec(&self) -> SampleSpec {
        let mut spec = SampleSpec::range(self.min, self.range)
            .with_max_samples(self.samples.unwrap_or(self.range))
            .with_start_value(self.start);
        if let Some(seed) = self.seed {
            spec = spec.with_seed(seed);
        }
        spec
    }

    fn limits(&self) -> TraceLimits {
        TraceLimits::default()
            .with_max_value(self.max_value)
            .with_max_steps(self.max_steps)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a forest from a sample range and print its trees.
    Build {
        #[command(flatten)]
        rules: RuleArgs,
        #[command(flatten)]
        samples: SampleArgs,
        /// Save the selected tree (start value's tree, else the largest).
        #[arg(long)]
        save: Option<PathBuf>,
        /// Save this tree instead of the default one.
        #[arg(long, requires = "save", allow_negative_numbers = true)]
        root: Option<Value>,
    },
    /// Print the trajectory of a single value.
    Trace {
        /// Starting value.
        #[arg(allow_negative_numbers = true)]
        value: Value,
        #[command(flatten)]
        rules: RuleArgs,
    },
    /// Rebuild a saved tree file and print it.
    Load {
        /// Saved tree (JSON).
        file: PathBuf,
    },
    /// Emit the layout of one tree as JSON.
    Layout {
        /// Load from a saved tree instead of building.
        #[arg(long)]
        file: Option<PathBuf>,
        #[command(flatten)]
        rules: RuleArgs,
        #[command(flatten)]
        samples: SampleArgs,
        /// Tree to lay out (defaults to the start value's tree or the largest).
        #[arg(long, allow_negative_numbers = true)]
        root: Option<Value>,
        /// Base branch length.
        #[arg(long, default_value_t = 50.0)]
        base_length: f64,
        /// Write to this file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Build {
            rules,
            samples,
            save,
            root,
        } => run_build(rules, samples, save, root)?,
        Commands::Trace { value, rules } => run_trace(value, rules)?,
        Commands::Load { file } => run_load(file)?,
        Commands::Layout {
            file,
            rules,
            samples,
            root,
            base_length,
            output,
        } => run_layout(file, rules, samples, root, base_length, output)?,
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "collatz_forest=info",
        1 => "collatz_forest=debug",
        _ => "collatz_forest=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_build(
    rules: RuleArgs,
    samples: SampleArgs,
    save: Option<PathBuf>,
    root: Option<Value>,
) -> Result<()> {
    let config = rules.to_config();
    let report = ForestBuilder::new(config.clone(), samples.to_spec())
        .with_limits(samples.limits())
        .build()
        .context("forest build failed")?;

    print_forest(&report.forest);

    if let Some(path) = save {
        let root = match root.or_else(|| report.default_root()) {
            Some(root) => root,
            None => bail!("no tree to save"),
        };
        let saved = SavedTree::capture(&report.forest, root, &config)
            .with_context(|| format!("failed to capture tree {}", root))?;
        saved
            .write_to(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!(
            "saved tree {} with {} leaves to {}",
            root,
            saved.leaves.len(),
            path.display()
        );
    }

    Ok(())
}

fn run_trace(value: Value, rules: RuleArgs) -> Result<()> {
    let config = rules.to_config();
    let rule_set = RuleSet::from_config(&config).context("invalid rules")?;
    let forest = Forest::new();

    match trace_sample(value, &rule_set, &forest, forest.limits()) {
        Trace::Diverged(reason) => println!("{}: {}", value, reason),
        trace => {
            let path = trace.path().unwrap_or_default();
            let line: Vec<String> = path.iter().map(|v| v.to_string()).collect();
            println!("{}", line.join(" -> "));
            println!(
                "steps={}\troot={}\tpeak={}",
                path.len().saturating_sub(1),
                trace.root().map_or("-".to_string(), |r| r.to_string()),
                trace.peak().map_or("-".to_string(), |p| p.to_string()),
            );
        }
    }

    Ok(())
}

fn run_load(file: PathBuf) -> Result<()> {
    let saved = SavedTree::read_from(&file)
        .with_context(|| format!("failed to load tree file {}", file.display()))?;
    let forest = saved
        .rebuild()
        .with_context(|| format!("failed to rebuild tree {}", saved.root))?;
    print_forest(&forest);
    Ok(())
}

fn run_layout(
    file: Option<PathBuf>,
    rules: RuleArgs,
    samples: SampleArgs,
    root: Option<Value>,
    base_length: f64,
    output: Option<PathBuf>,
) -> Result<()> {
    let (forest, config, default_root) = match file {
        Some(path) => {
            let saved = SavedTree::read_from(&path)
                .with_context(|| format!("failed to load tree file {}", path.display()))?;
            let forest = saved.rebuild()?;
            (forest, saved.config, Some(saved.root))
        }
        None => {
            let config = rules.to_config();
            let report = ForestBuilder::new(config.clone(), samples.to_spec())
                .with_limits(samples.limits())
                .build()
                .context("forest build failed")?;
            let default_root = report.default_root();
            (report.forest, config, default_root)
        }
    };

    let Some(root) = root.or(default_root) else {
        bail!("no tree to lay out");
    };
    let params = LayoutParams::from_config(&config).with_base_length(base_length);
    let layout = compute_layout(&forest, root, &params)
        .with_context(|| format!("layout of tree {} failed", root))?;

    let json = serde_json::to_string_pretty(&layout)?;
    match output {
        Some(path) => std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", json),
    }

    Ok(())
}

fn print_forest(forest: &Forest) {
    println!("root\tleaves\tnodes\thighest\tlowest\tdeepest\tdepth\thighest_leaf\tstart");
    for root in forest.roots_by_leaf_count() {
        let Some(tree) = forest.tree(root) else {
            continue;
        };
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            tree.root,
            tree.leaf_count,
            tree.node_count,
            tree.highest,
            tree.lowest,
            tree.deepest,
            tree.max_depth,
            tree.highest_leaf,
            tree.start_value.map_or("-".to_string(), |v| v.to_string()),
        );
    }
    if !forest.divergent().is_empty() {
        println!("divergent samples: {}", forest.divergent().len());
    }
}
