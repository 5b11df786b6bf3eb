//! element_host - Drive a chain of frame elements from JSON lines.
//!
//! This binary:
//! 1. Loads the pipeline configuration (file + env overrides)
//! 2. Instantiates each element and resolves its settings
//! 3. Runs every startup hook (any failure aborts)
//! 4. Reads one JSON frame per input line and feeds it through the chain
//! 5. Writes each output frame of the last stage as a JSON line on stdout
//! 6. Runs every shutdown hook at end of input

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use frame_elements::{ElementHost, ElementRegistry, Frame, HostConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run frame elements over JSON-line frames")]
struct Args {
    /// Pipeline config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "ELEMENTS_CONFIG")]
    config: Option<PathBuf>,

    /// Read frames from this file instead of stdin.
    #[arg(long)]
    input: Option<PathBuf>,

    /// List registered elements and their settings, then exit.
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let registry = ElementRegistry::builtin();

    if args.list {
        print_registry(&registry);
        return Ok(());
    }

    let cfg = HostConfig::load_from(args.config.as_deref())?;
    let mut host = ElementHost::from_config(&cfg, &registry)?;
    host.start()?;
    log::info!(
        "pipeline running: {}",
        host.stages()
            .iter()
            .map(|stage| stage.name())
            .collect::<Vec<_>>()
            .join(" -> ")
    );

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("open input {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut frames = 0u64;
    let mut emitted = 0u64;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.context("read input line")?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: Frame = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("skipping line {}: invalid frame: {}", lineno + 1, e);
                continue;
            }
        };
        frames += 1;
        match host.process(&frame) {
            Ok(outputs) => {
                for output in outputs {
                    writeln!(out, "{}", serde_json::to_string(&output)?)?;
                    emitted += 1;
                }
                out.flush()?;
            }
            Err(e) => log::error!("frame {} dropped: {:#}", lineno + 1, e),
        }
    }

    log::info!("processed {} frames, emitted {} outputs", frames, emitted);
    host.shutdown()
}

fn print_registry(registry: &ElementRegistry) {
    for desc in registry.list() {
        println!(
            "{} ({}) v{} [{}]",
            desc.name, desc.display_name, desc.version, desc.id
        );
        if !desc.description.is_empty() {
            println!("    {}", desc.description);
        }
        for spec in desc.settings {
            let mut line = format!(
                "    - {} ({:?}, default {:?})",
                spec.name,
                spec.kind(),
                spec.default
            );
            if !spec.valid_values.is_empty() {
                line.push_str(&format!(" one of [{}]", spec.valid_values.join(", ")));
            }
            if let Some(min) = spec.min_value {
                line.push_str(&format!(" min {}", min));
            }
            if spec.required {
                line.push_str(" required");
            }
            if let Some(rule) = spec.depends_on {
                line.push_str(&format!(" when {} = {:?}", rule.setting, rule.equals));
            }
            println!("{}", line);
        }
    }
}
