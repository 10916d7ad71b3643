mod log_engine;
mod rig;
mod script;

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use liveset_core::config::Config;
use liveset_core::engine::AudioContext;

use crate::log_engine::LogEngine;
use crate::script::parse_script;

const DEFAULT_LOOP_SECS: f64 = 8.0;

const USAGE: &str = "usage: liveset [--verbose] [--config FILE] [--loop-secs SECS] SCRIPT";

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("liveset")
        .join("liveset.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path)
        .or_else(|_| File::create(std::env::temp_dir().join("liveset.log")))
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("liveset: logging disabled: {}", e);
            return;
        }
    };

    if let Err(e) = WriteLogger::init(log_level, simplelog::Config::default(), log_file) {
        eprintln!("liveset: logging disabled: {}", e);
        return;
    }

    log::info!("liveset starting (log level: {:?})", log_level);
}

struct Args {
    verbose: bool,
    config: Option<PathBuf>,
    loop_secs: f64,
    script: PathBuf,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut verbose = false;
    let mut config = None;
    let mut loop_secs = DEFAULT_LOOP_SECS;
    let mut script = None;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--verbose" | "-v" => verbose = true,
            "--config" => {
                let path = iter.next().ok_or("--config needs a file")?;
                config = Some(PathBuf::from(path));
            }
            "--loop-secs" => {
                let value = iter.next().ok_or("--loop-secs needs a value")?;
                loop_secs = value
                    .parse::<f64>()
                    .ok()
                    .filter(|s| s.is_finite() && *s > 0.0)
                    .ok_or_else(|| format!("invalid --loop-secs {:?}", value))?;
            }
            other if other.starts_with('-') => return Err(format!("unknown option {}", other)),
            other => script = Some(PathBuf::from(other)),
        }
    }

    Ok(Args {
        verbose,
        config,
        loop_secs,
        script: script.ok_or("missing SCRIPT")?,
    })
}

fn run(args: &Args) -> io::Result<()> {
    let text = std::fs::read_to_string(&args.script)?;
    let events = parse_script(&text)?;

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    let engine = Arc::new(LogEngine::new());
    let ctx = AudioContext::new(engine.clone());
    let mut router = rig::build(&ctx, &config, args.loop_secs);

    let mut ignored = 0;
    for event in &events {
        engine.set_time(event.time);
        if router.handle_bytes(event.time, &event.bytes).is_none() {
            ignored += 1;
        }
    }

    let stats = engine.stats();
    println!("{}: {} events ({} ignored)", args.script.display(), events.len(), ignored);
    println!("  end time        {:.3}s", events.last().map(|e| e.time).unwrap_or(0.0));
    println!("  voices started  {}", stats.voices_started);
    println!("  voices stopped  {}", stats.voices_stopped);
    println!("  voices live     {}", engine.live_voices());
    println!("  param moves     {}", stats.param_moves);
    println!("  units");
    for (channel, name) in router.units() {
        println!("    ch{:<3} {}", channel, name);
    }
    Ok(())
}

fn main() -> io::Result<()> {
    let argv: Vec<String> = std::env::args().collect();
    let args = match parse_args(&argv) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("liveset: {}\n{}", e, USAGE);
            return Err(io::Error::new(io::ErrorKind::InvalidInput, e));
        }
    };
    init_logging(args.verbose);

    run(&args).map_err(|e| {
        log::warn!("replay failed: {}", e);
        e
    })
}
