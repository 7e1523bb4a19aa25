use clap::Parser;
use log::{error, info};
use simple_logger::init_with_level;

use starquant::{cli::Args, core::execute, executor::manager::LocalExecutor};

fn main() {
    let start = std::time::Instant::now();
    let args: Args = Args::parse();

    init_with_level(args.log_level()).unwrap_or_else(|e| {
        eprintln!("ERROR: could not start logger: {}", e);
        std::process::exit(1);
    });
    info!(
        "INFO: starquant v{} started at {}",
        env!("CARGO_PKG_VERSION"),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    let cwd = std::env::current_dir().unwrap_or_else(|e| {
        error!("ERROR: could not read current directory: {}", e);
        std::process::exit(1);
    });

    match execute(args, &cwd, &mut LocalExecutor::new()) {
        Ok(files) => {
            for file in &files {
                info!("OUTPUT: {}", file.display());
            }
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(e.exit_code());
        }
    }

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
