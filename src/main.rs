// src/main.rs

use pbspipe::{cli, config, logging, run};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("pbspipe error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    let cfg = config::load_and_validate(&args.config)?;

    let log_file = (!args.no_log_file && !args.dry_run)
        .then(|| logging::timestamped_log_path(&cfg.pipeline.work_dir, &cfg.pipeline.log_prefix));
    logging::init_logging(args.log_level, log_file.as_deref())?;

    run(&args, &cfg).await?;
    Ok(())
}
