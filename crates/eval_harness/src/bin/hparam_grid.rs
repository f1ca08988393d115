use anyhow::Context;
use clap::Parser;
use data_contracts::ModelConfig;
use eval_harness::logging::init_tracing;
use inference::{init_version_dir, resolve_device, DeviceChoice};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "hparam_grid",
    about = "Expand a base model config over the grid-search option lists"
)]
struct Args {
    /// Base config.json (defaults when absent).
    #[arg(long)]
    base: Option<PathBuf>,
    /// Also expand options that are not marked tunable.
    #[arg(long = "include-untunable")]
    include_untunable: bool,
    /// Write `version_<i>/` directories with freshly initialised `best` checkpoints here.
    #[arg(long = "init-root")]
    init_root: Option<PathBuf>,
    #[arg(long, default_value = "cpu")]
    device: String,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let base = match &args.base {
        Some(path) => ModelConfig::from_path(path)?,
        None => ModelConfig::default(),
    };
    let grid = base.grid(args.include_untunable)?;
    tracing::info!(configs = grid.len(), "expanded grid");

    let Some(root) = args.init_root else {
        for cfg in &grid {
            println!("{}", serde_json::to_string(cfg)?);
        }
        return Ok(());
    };

    let device = resolve_device(args.device.parse::<DeviceChoice>()?);
    for (i, cfg) in grid.iter().enumerate() {
        let dir = root.join(format!("version_{i}"));
        let model = init_version_dir(&dir, cfg, &device)
            .with_context(|| format!("initialising {}", dir.display()))?;
        tracing::info!(
            dir = %dir.display(),
            generators = model.num_generators(),
            params = model.generator_params(),
            "initialised model version"
        );
    }
    Ok(())
}
