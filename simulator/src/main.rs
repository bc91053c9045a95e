use anyhow::Context;
use clap::Parser;
use control::bridge::ControlBridge;
use generator::profile::FrameGenerator;
use log::{info, warn};
use smurfcore::{ControlCommand, SmurfProcessor};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use tokio::sync::mpsc;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod control;
mod generator;
mod workflow;

/// Output frames between two progress lines in serve mode.
const REPORT_EVERY: u64 = 1000;

#[derive(Parser)]
#[command(author, version, about = "Synthetic frame driver for the SMuRF stream core")]
struct Args {
    /// Run a single offline batch and print a summary
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, default_value_t = 400)]
    frames: usize,
    #[arg(long, default_value_t = 16)]
    channels: usize,
    #[arg(long, default_value_t = 20)]
    factor: usize,
    /// Control command as JSON, e.g. '{"op":"set_gain","gain":2.0}'
    #[arg(long = "command")]
    commands: Vec<ControlCommand>,
    /// Append the offline summary to this file
    #[arg(long)]
    report: Option<PathBuf>,
    /// Stream frames continuously behind the HTTP control bridge
    #[arg(long, default_value_t = false)]
    serve: bool,
    #[arg(long, default_value = "127.0.0.1:9000")]
    bind: SocketAddr,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(args.frames, args.channels, args.factor)
    };
    let runner = Runner::new(workflow_config).with_commands(args.commands);

    if args.offline {
        let result = runner.execute()?;
        let report = format!(
            "frames_in={} frames_out={} channels={} dominant_bin={:?} rms={:?} metrics={}\n",
            result.frames_in,
            result.frames_out,
            result.output_channels,
            result.dominant_bin,
            result.channel_rms,
            serde_json::to_string(&result.metrics)?
        );
        print!("{}", report);

        if let Some(report_path) = args.report {
            if let Some(parent) = report_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&report_path)
                .with_context(|| format!("opening report {}", report_path.display()))?;
            file.write_all(report.as_bytes())?;
        }
    }
    if args.serve {
        serve(&runner, args.bind)?;
    }

    Ok(())
}

/// Streams generated frames until Ctrl+C while the bridge serves control requests.
fn serve(runner: &Runner, bind: SocketAddr) -> anyhow::Result<()> {
    let (sink, mut outputs) = mpsc::unbounded_channel::<Vec<u8>>();
    let processor = Arc::new(runner.build_processor(sink)?);
    let bridge = ControlBridge::spawn(processor.clone(), bind)?;
    info!("Control bridge listening on http://{}", bridge.address());

    let _drain = thread::Builder::new()
        .name("output-drain".to_string())
        .spawn(move || {
            let mut received = 0u64;
            while outputs.blocking_recv().is_some() {
                received += 1;
                if received % REPORT_EVERY == 0 {
                    info!("{} output frames received", received);
                }
            }
        })
        .context("spawning output drain")?;

    let running = Arc::new(AtomicBool::new(true));
    let mut generator = FrameGenerator::new(runner.config().generator.clone())?;
    let interval = Duration::from_millis(runner.config().frame_interval_ms);
    let stream = {
        let running = running.clone();
        let processor = processor.clone();
        thread::Builder::new()
            .name("frame-stream".to_string())
            .spawn(move || {
                while running.load(Ordering::Relaxed) {
                    if let Err(err) = processor.process(&generator.next_frame()) {
                        warn!("generated frame rejected: {}", err);
                    }
                    thread::sleep(interval);
                }
            })
            .context("spawning frame stream")?
    };

    info!("Streaming frames (Ctrl+C to stop)...");
    let runtime = TokioBuilder::new_current_thread()
        .enable_all()
        .build()
        .context("creating runtime for signal handling")?;
    runtime.block_on(async {
        signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
        Ok::<(), anyhow::Error>(())
    })?;

    running.store(false, Ordering::Relaxed);
    if stream.join().is_err() {
        warn!("frame stream thread panicked");
    }
    let status = bridge.status();
    info!(
        "Stopped after {} frames in, {} frames sent",
        status.metrics.received, status.metrics.sent
    );
    Ok(())
}
