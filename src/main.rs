use std::error::Error;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use clap::Parser;
use log::info;

mod checks;
mod cli;
mod constants;
mod error;
mod meminfo;
mod sampler;
mod source;
mod ui;
mod util;

use cli::Cli;
use sampler::Sampler;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    // One-shot mode: no session to protect, so any failure terminates here.
    if cli.checks {
        return run_checks(cli.remote);
    }

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))?;
    }

    let source_label = if cli.remote {
        "adb"
    } else {
        constants::MEMINFO_PATH
    };
    let config = cli.sampler_config();
    info!(
        "sampling {:?} from {} every {}ms, window {}s",
        config.metrics, source_label, config.interval_ms, config.window_secs
    );

    let sampler = Sampler::new(config, source::make_source(cli.remote));
    ui::run(sampler, source_label, stop)?;
    Ok(())
}

fn run_checks(remote: bool) -> Result<(), Box<dyn Error>> {
    use source::CounterSource;

    let mut source = source::make_source(remote);
    let set = meminfo::parse(&source.read()?)?;
    for (label, diff) in checks::check(&set)? {
        println!("{} diff: {} kB", label, diff);
    }
    Ok(())
}
