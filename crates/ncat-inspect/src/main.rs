//! # ncat-inspect
//!
//! Reads a bot-framework log (or JSON lines), parses every event payload,
//! and prints the re-encoded events or a summary of what was seen.

#![deny(unsafe_code)]

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use ncat_core::logging::init_subscriber_with_format;
use ncat_core::{Dispatcher, Event, MessageSegment, NodeContent, Segment};
use ncat_logline::LogLineExtractor;
use ncat_settings::{NcatSettings, get_settings};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

/// Inspect and round-trip check event logs.
#[derive(Parser, Debug)]
#[command(name = "ncat-inspect", about = "Parse event payloads out of logs")]
struct Cli {
    /// Log file to read (stdin when omitted).
    file: Option<PathBuf>,

    /// Treat every non-empty line as one JSON payload.
    #[arg(long)]
    json_lines: bool,

    /// Maximum forward nesting (overrides settings).
    #[arg(long)]
    max_depth: Option<usize>,

    /// Log level filter (overrides settings; `RUST_LOG` still wins).
    #[arg(long)]
    log_level: Option<String>,

    /// Exit non-zero if any event fails to parse or re-encodes differently.
    #[arg(long)]
    check_roundtrip: bool,

    /// Print event-kind and segment-tag counts instead of events.
    #[arg(long)]
    summary: bool,
}

impl Cli {
    fn settings(&self) -> Result<NcatSettings> {
        let mut settings = get_settings().clone();
        if let Some(depth) = self.max_depth {
            settings.parser.max_forward_depth = depth;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        settings.validate().context("invalid command-line override")?;
        Ok(settings)
    }

    fn read_input(&self) -> Result<String> {
        match &self.file {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display())),
            None => {
                let mut text = String::new();
                let _ = std::io::stdin()
                    .read_to_string(&mut text)
                    .context("Failed to read stdin")?;
                Ok(text)
            }
        }
    }
}

/// One payload pulled from the input, tagged with its source line.
struct Payload {
    line: usize,
    value: std::result::Result<Map<String, Value>, String>,
}

fn json_lines(text: &str) -> Vec<Payload> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| Payload {
            line: index + 1,
            value: match serde_json::from_str::<Value>(line) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(other) => Err(format!("expected a JSON object, found {other}")),
                Err(e) => Err(e.to_string()),
            },
        })
        .collect()
}

fn log_payloads(text: &str, extractor: &LogLineExtractor) -> Vec<Payload> {
    extractor
        .scan_events(text)
        .map(|scanned| Payload {
            line: scanned.line,
            value: scanned.result.map_err(|e| e.to_string()),
        })
        .collect()
}

#[derive(Default)]
struct Summary {
    events: BTreeMap<String, usize>,
    segments: BTreeMap<String, usize>,
    fallbacks: usize,
    failures: usize,
    mismatches: usize,
}

impl Summary {
    fn record_event(&mut self, event: &Event) {
        *self.events.entry(event.kind().to_owned()).or_default() += 1;
        if let Some(message) = event.as_message() {
            self.record_segments(&message.segments);
        }
    }

    fn record_segments(&mut self, segments: &[Segment]) {
        for segment in segments {
            *self.segments.entry(segment.kind().to_owned()).or_default() += 1;
            match segment {
                Segment::Forward(forward) => {
                    for node in forward.nodes.iter().flatten() {
                        self.record_segments(&node.segments);
                    }
                }
                Segment::Node(node) => {
                    if let Some(NodeContent::Segments(inner)) = &node.content {
                        self.record_segments(inner);
                    }
                }
                _ => {}
            }
        }
    }

    fn print(&self, out: &mut impl Write) -> std::io::Result<()> {
        writeln!(out, "events:")?;
        for (kind, count) in &self.events {
            writeln!(out, "  {kind}: {count}")?;
        }
        writeln!(out, "segments:")?;
        for (tag, count) in &self.segments {
            writeln!(out, "  {tag}: {count}")?;
        }
        writeln!(
            out,
            "fallbacks: {}, failures: {}, roundtrip mismatches: {}",
            self.fallbacks, self.failures, self.mismatches
        )
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let settings = cli.settings()?;
    init_subscriber_with_format(&settings.logging.level, settings.logging.log_format());

    let text = cli.read_input()?;
    let extractor = LogLineExtractor::new(settings.parser.event_label.clone());
    let payloads = if cli.json_lines {
        json_lines(&text)
    } else {
        log_payloads(&text, &extractor)
    };
    info!(count = payloads.len(), "payloads found");

    let dispatcher = Dispatcher::default().with_options(settings.parser.parse_options());

    let mut summary = Summary::default();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for payload in payloads {
        let map = match payload.value {
            Ok(map) => map,
            Err(reason) => {
                error!(line = payload.line, %reason, "could not extract payload");
                summary.failures += 1;
                continue;
            }
        };
        let input = Value::Object(map);
        let (event, report) = match dispatcher.parse_with_report(input.clone()) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(line = payload.line, error = %e, "event did not parse");
                summary.failures += 1;
                continue;
            }
        };

        for fallback in report.fallbacks() {
            warn!(
                line = payload.line,
                depth = fallback.depth,
                index = fallback.index,
                tag = %fallback.tag,
                error = %fallback.error,
                "segment kept as unknown"
            );
        }
        summary.fallbacks += report.len();

        let encoded = event.encode();
        if cli.check_roundtrip && encoded != input {
            warn!(line = payload.line, "re-encoded event differs from input");
            summary.mismatches += 1;
        }

        summary.record_event(&event);
        if !cli.summary {
            writeln!(out, "{encoded}")?;
        }
    }

    if cli.summary {
        summary.print(&mut out)?;
    }
    out.flush()?;

    if cli.check_roundtrip && (summary.mismatches > 0 || summary.failures > 0) {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
