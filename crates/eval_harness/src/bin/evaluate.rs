use clap::Parser;
use eval_harness::logging::init_tracing;
use eval_harness::{EvalArgs, Evaluator, FsDatasetSource, HarnessConfig, RunOptions};
use inference::{resolve_device, BurnModelLoader};

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = EvalArgs::parse();
    let file = HarnessConfig::load(args.config.as_deref())?;
    let options = RunOptions::resolve(&args, &file)?;

    let device = resolve_device(options.device);
    let datasets = FsDatasetSource::new(options.data_root.clone());
    let evaluator = Evaluator::new(BurnModelLoader::new(device), datasets, options);
    println!("{}", evaluator.output_path().display());

    let report = evaluator.run()?;
    if report.rows == 0 {
        tracing::warn!(planned = report.planned, "no rows were produced");
    }
    Ok(())
}
