//! SMIL Player (smil-player) - Main entry point
//!
//! Plays a SMIL document against the wall clock (or a simulated one) and
//! prints every engine notification as it happens, either as a readable
//! trace or as JSON lines.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use smil_common::events::{EngineEvent, EventBus};
use smil_common::human_time::{format_deciseconds, parse_time};
use smil_common::timing::{ds_to_ms, ms_to_ds};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use smil_player::{xml, BitRates, Document, EventKind, Host, NodeId, PlayerConfig};

/// Command-line arguments for smil-player
#[derive(Parser, Debug)]
#[command(name = "smil-player")]
#[command(about = "Plays SMIL timed documents and traces their schedule")]
#[command(version)]
struct Args {
    /// SMIL document to play
    file: PathBuf,

    /// Config file (overrides SMIL_PLAYER_CONFIG and the default locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Jump from deadline to deadline instead of waiting in real time
    #[arg(short, long, env = "SMIL_PLAYER_SIMULATE")]
    simulate: bool,

    /// Print notifications as JSON lines
    #[arg(long)]
    json: bool,

    /// Stop the presentation at this document time (e.g. "90s")
    #[arg(long, value_parser = parse_clock_arg)]
    until: Option<u64>,

    /// Call beginElement on an element: `<id>@<time>`
    #[arg(long = "begin", value_name = "ID@TIME", value_parser = parse_trigger_arg)]
    begins: Vec<(String, u64)>,

    /// Deliver an activate (click) event to an element: `<id>@<time>`
    #[arg(long = "click", value_name = "ID@TIME", value_parser = parse_trigger_arg)]
    clicks: Vec<(String, u64)>,
}

fn parse_clock_arg(value: &str) -> std::result::Result<u64, String> {
    parse_time(value)
        .filter(|ds| *ds >= 0)
        .map(|ds| ds_to_ms(ds) as u64)
        .ok_or_else(|| format!("invalid time value '{}'", value))
}

fn parse_trigger_arg(value: &str) -> std::result::Result<(String, u64), String> {
    let (id, time) = value
        .rsplit_once('@')
        .ok_or_else(|| format!("expected <id>@<time>, got '{}'", value))?;
    if id.is_empty() {
        return Err(format!("missing element id in '{}'", value));
    }
    Ok((id.to_string(), parse_clock_arg(time)?))
}

/// Scripted external input
#[derive(Debug, Clone)]
enum TriggerKind {
    Begin,
    Click,
}

#[derive(Debug, Clone)]
struct Trigger {
    at_ms: u64,
    element: String,
    kind: TriggerKind,
}

/// Host wiring the engine to the event bus and the config's media table
struct PlayerHost {
    bus: EventBus,
    rates: BitRates,
    pending_media: Vec<(NodeId, Option<String>)>,
}

impl Host for PlayerHost {
    fn arm_wake(&mut self, delay_ms: u64) {
        debug!("Wake requested in {}ms", delay_ms);
    }

    fn request_media_length(&mut self, node: NodeId, src: Option<&str>) {
        self.pending_media.push((node, src.map(str::to_string)));
    }

    fn notify(&mut self, event: &EngineEvent) {
        self.bus.emit_lossy(event.clone());
    }

    fn bit_rates(&self) -> BitRates {
        self.rates
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config =
        PlayerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "smil-player {} [git {}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let bus = EventBus::new(1024);
    let printer = tokio::spawn(print_events(bus.subscribe(), args.json));

    let host = PlayerHost {
        bus,
        rates: config.bit_rates(),
        pending_media: Vec::new(),
    };
    let mut doc = Document::new(host);
    xml::parse_file(&mut doc, &args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;
    info!("Loaded {} ({} nodes)", args.file.display(), doc.len());

    let mut triggers: Vec<Trigger> = args
        .begins
        .into_iter()
        .map(|(element, at_ms)| Trigger {
            at_ms,
            element,
            kind: TriggerKind::Begin,
        })
        .chain(args.clicks.into_iter().map(|(element, at_ms)| Trigger {
            at_ms,
            element,
            kind: TriggerKind::Click,
        }))
        .collect();
    triggers.sort_by_key(|t| t.at_ms);

    let simulate = args.simulate || config.playback.simulate;
    play(&mut doc, &config, triggers.into(), args.until, simulate).await?;

    // Closing the bus ends the printer
    drop(doc);
    printer
        .await
        .map_err(|e| anyhow!("Printer task failed: {}", e))?;
    Ok(())
}

/// Drive the document until it finishes, idles, hits `until` or is interrupted
async fn play(
    doc: &mut Document<PlayerHost>,
    config: &PlayerConfig,
    mut triggers: VecDeque<Trigger>,
    until: Option<u64>,
    simulate: bool,
) -> Result<()> {
    let speed = config.playback.speed;
    let started = Instant::now();
    doc.start();

    loop {
        resolve_media(doc, config);
        if doc.is_finished() {
            info!("Presentation finished at {}", format_ms(doc.now_ms()));
            break;
        }

        let next = [doc.next_deadline(), triggers.front().map(|t| t.at_ms)]
            .into_iter()
            .flatten()
            .min();
        let Some(mut next) = next else {
            info!("Nothing left to schedule, stopping at {}", format_ms(doc.now_ms()));
            break;
        };
        let stop_here = until.is_some_and(|limit| next > limit);
        if let Some(limit) = until.filter(|_| stop_here) {
            next = limit;
        }

        if !simulate {
            let offset = Duration::from_secs_f64(next as f64 / 1000.0 / speed);
            tokio::select! {
                _ = tokio::time::sleep_until(started + offset) => {}
                _ = signal::ctrl_c() => {
                    info!("Received Ctrl+C, stopping at {}", format_ms(doc.now_ms()));
                    break;
                }
            }
        }

        doc.advance_to(next);
        while triggers.front().is_some_and(|t| t.at_ms <= doc.now_ms()) {
            if let Some(trigger) = triggers.pop_front() {
                apply_trigger(doc, &trigger);
            }
        }
        if stop_here {
            info!("Reached --until {}", format_ms(next));
            break;
        }

        // Let the printer catch up
        tokio::task::yield_now().await;
    }
    tokio::task::yield_now().await;
    Ok(())
}

/// Answer outstanding media length requests from the config's media table
fn resolve_media(doc: &mut Document<PlayerHost>, config: &PlayerConfig) {
    loop {
        let pending = std::mem::take(&mut doc.host_mut().pending_media);
        if pending.is_empty() {
            return;
        }
        for (node, src) in pending {
            match config.media.length_for(src.as_deref()) {
                Some(length) => {
                    debug!(
                        "Media {} is {} long",
                        src.as_deref().unwrap_or("<no src>"),
                        format_deciseconds(length)
                    );
                    if let Err(e) = doc.media_length_resolved(node, length) {
                        warn!("Could not resolve media length: {}", e);
                    }
                }
                None => debug!(
                    "No length known for {}, playing until stopped",
                    src.as_deref().unwrap_or("<no src>")
                ),
            }
        }
    }
}

fn apply_trigger(doc: &mut Document<PlayerHost>, trigger: &Trigger) {
    let Some(id) = doc.find_by_id(&trigger.element) else {
        warn!("No element with id '{}' for {:?}", trigger.element, trigger.kind);
        return;
    };
    let result = match trigger.kind {
        TriggerKind::Begin => doc.begin_element(id),
        TriggerKind::Click => doc.deliver_event(id, EventKind::Activated),
    };
    match result {
        Ok(()) => debug!("Applied {:?} to '{}'", trigger.kind, trigger.element),
        Err(e) => warn!("{:?} on '{}' failed: {}", trigger.kind, trigger.element, e),
    }
}

async fn print_events(mut rx: tokio::sync::broadcast::Receiver<EngineEvent>, json: bool) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if json {
                    match serde_json::to_string(&event) {
                        Ok(line) => println!("{}", line),
                        Err(e) => warn!("Failed to serialize event: {}", e),
                    }
                } else {
                    println!("{:>10}  {}", format_ms(event.time_ms()), describe(&event));
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Printer lagged, {} events dropped", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn format_ms(ms: u64) -> String {
    format_deciseconds(ms_to_ds(ms as i64))
}

fn describe(event: &EngineEvent) -> String {
    match event {
        EngineEvent::ElementActivated { element, .. } => format!("activated  {}", element.label),
        EngineEvent::ElementStarted { element, .. } => format!("started    {}", element.label),
        EngineEvent::ElementStopped {
            element, forced, ..
        } => {
            if *forced {
                format!("stopped    {} (forced)", element.label)
            } else {
                format!("stopped    {}", element.label)
            }
        }
        EngineEvent::ElementFinished { element, .. } => format!("finished   {}", element.label),
        EngineEvent::ElementDeactivated { element, .. } => {
            format!("deactivated {}", element.label)
        }
        EngineEvent::AttributeChanged {
            target,
            attribute,
            value,
            ..
        } => match value {
            Some(value) => format!("set        {}.{} = {:?}", target.label, attribute, value),
            None => format!("unset      {}.{}", target.label, attribute),
        },
        EngineEvent::MediaShown {
            element,
            src,
            region,
            ..
        } => format!(
            "show       {} src={} region={}",
            element.label,
            src.as_deref().unwrap_or("-"),
            region.as_deref().unwrap_or("-")
        ),
        EngineEvent::MediaHidden { element, .. } => format!("hide       {}", element.label),
        EngineEvent::MediaLengthRequested { element, src, .. } => format!(
            "probe      {} src={}",
            element.label,
            src.as_deref().unwrap_or("-")
        ),
        EngineEvent::DocumentFinished { .. } => "document finished".to_string(),
    }
}
