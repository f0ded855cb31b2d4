use serde::Serialize;
use stxlink_arq::{ArqConfig, Link, LinkConfig, TransferReport};
use stxlink_transport::{ChannelConfig, ChannelStats, LossPolicy, MemoryChannel};
use tracing::info;

use crate::cmd::{parse_duration, SimulateArgs};
use crate::exit::{arq_error, outcome_code, CliResult};
use crate::output::{hex, print_fields, print_json, print_raw, OutputFormat};

#[derive(Serialize)]
struct SimulateOutput {
    outcome: String,
    succeeded: bool,
    retries: u8,
    transmissions: u32,
    turns: u64,
    elapsed_ms: u128,
    delivered: Vec<String>,
    channel: ChannelSummary,
}

#[derive(Serialize)]
struct ChannelSummary {
    transmissions: u64,
    transmissions_dropped: u64,
    bytes_received: u64,
    acks_sent: u64,
    acks_dropped: u64,
}

impl From<ChannelStats> for ChannelSummary {
    fn from(stats: ChannelStats) -> Self {
        Self {
            transmissions: stats.transmissions,
            transmissions_dropped: stats.transmissions_dropped,
            bytes_received: stats.bytes_received,
            acks_sent: stats.acks_sent,
            acks_dropped: stats.acks_dropped,
        }
    }
}

pub fn run(args: SimulateArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = args.payload.bytes()?;
    let arq = ArqConfig {
        max_retries: args.max_retries,
        ack_timeout: parse_duration(&args.timeout)?,
        ..ArqConfig::default()
    };
    let link_config = LinkConfig {
        tick: parse_duration(&args.tick)?,
        max_turns: args.max_turns,
    };

    let mut channel = MemoryChannel::with_config(channel_config(&args));
    if let Some(offset) = args.corrupt {
        channel.corrupt_next(offset, 0xFF);
    }

    let mut link = Link::with_config(channel, arq, link_config);
    let report = link
        .transfer(&payload)
        .map_err(|err| arq_error("transfer failed", err))?;
    info!(outcome = %report.outcome, turns = report.turns, "simulation finished");

    let code = outcome_code(&report.outcome);
    let out = summarize(&report, link.channel().stats());
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => print_fields(&[
            ("outcome", out.outcome.clone()),
            ("retries", out.retries.to_string()),
            ("transmissions", out.transmissions.to_string()),
            ("turns", out.turns.to_string()),
            ("elapsed", format!("{}ms", out.elapsed_ms)),
            ("delivered", out.delivered.len().to_string()),
            (
                "dropped",
                format!(
                    "{} frames, {} acks",
                    out.channel.transmissions_dropped, out.channel.acks_dropped
                ),
            ),
        ]),
        OutputFormat::Raw => {
            if let Some(first) = report.delivered.first() {
                print_raw(first);
            }
        }
    }

    Ok(code)
}

fn channel_config(args: &SimulateArgs) -> ChannelConfig {
    let data_loss = if args.drop_all {
        LossPolicy::Always
    } else {
        args.drop_first.map_or(LossPolicy::Never, LossPolicy::First)
    };
    ChannelConfig {
        data_loss,
        ack_loss: args.drop_acks.map_or(LossPolicy::Never, LossPolicy::First),
    }
}

fn summarize(report: &TransferReport, stats: ChannelStats) -> SimulateOutput {
    SimulateOutput {
        outcome: report.outcome.to_string(),
        succeeded: report.outcome.is_success(),
        retries: report.retries,
        transmissions: report.transmissions,
        turns: report.turns,
        elapsed_ms: report.elapsed.as_millis(),
        delivered: report.delivered.iter().map(|p| hex(p)).collect(),
        channel: stats.into(),
    }
}
