use clap::Parser;
use colored::*;
use preap::{
    spawn_exit_key_listener, FileLogSink, MonitorCycle, Scheduler, SysInspector, SysTerminator,
    WatchConfig,
};
use std::path::PathBuf;
use std::process::exit;
use std::sync::atomic::Ordering;

/// Process lifetime watchdog: kills matching processes that run too long
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Name of the process to watch (exact match)
    process_name: String,

    /// Maximum allowed lifetime in minutes
    lifetime: u64,

    /// Minutes between checks
    #[clap(value_parser = clap::value_parser!(u64).range(1..))]
    frequency: u64,

    /// File the kill records are appended to
    #[clap(short, long, value_name = "FILE", default_value = "logs.txt")]
    log_file: PathBuf,

    /// Key that stops the watchdog
    #[clap(long, default_value = "q")]
    exit_key: char,

    /// Print kill records as JSON lines instead of the console report
    #[clap(short, long)]
    json: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = match WatchConfig::builder()
        .process_name(&args.process_name)
        .max_lifetime_mins(args.lifetime)
        .check_interval_mins(args.frequency)
        .log_path(&args.log_file)
        .exit_key(args.exit_key)
        .build()
    {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {}", err);
            exit(1);
        }
    };

    let scheduler =
        Scheduler::new(config.check_interval).with_poll_interval(config.cancel_poll_interval);

    let cancel = scheduler.cancel_flag();
    ctrlc::set_handler(move || {
        cancel.store(true, Ordering::SeqCst);
        println!("\nReceived Ctrl-C, finishing...");
    })
    .expect("Error setting Ctrl-C handler");

    let listener = spawn_exit_key_listener(
        config.exit_key,
        scheduler.cancel_flag(),
        config.cancel_poll_interval,
    );

    println!(
        "Watching '{}' every {} minute(s); lifetime limit {} minute(s)",
        config.target.process_name.cyan(),
        args.frequency,
        config.target.max_lifetime_mins
    );
    println!(
        "Press '{}' (or Ctrl+C) to stop",
        config.exit_key.to_string().yellow()
    );
    println!();

    let mut cycle = MonitorCycle::new(
        SysInspector::new(),
        SysTerminator::new(),
        FileLogSink::new(&config.log_path),
    );
    if args.json {
        cycle = cycle.silent();
    }

    let summary = scheduler.run_with_processor(&mut cycle, &config.target, |result| {
        if args.json {
            for record in &result.records {
                println!("{}", serde_json::to_string(record).unwrap_or_default());
            }
        }
    });

    // Unblock the listener thread if shutdown came from Ctrl+C.
    scheduler.cancel_flag().store(true, Ordering::SeqCst);
    let _ = listener.join();

    println!(
        "\nStopped after {} cycle(s), {} kill(s) in {:.1} seconds",
        summary.cycles,
        summary.kills,
        summary.elapsed.as_secs_f64()
    );
    if summary.kills > 0 {
        println!(
            "Kill records written to {}",
            config.log_path.display().to_string().green()
        );
    }
    println!("Exiting...");
}
