use serde::Serialize;
use stxlink_arq::{Link, SendFailure, SendOutcome, TransferReport};
use stxlink_frame::{encode, FrameParser, Outcome, MAX_FRAME_SIZE, MAX_PAYLOAD};
use stxlink_transport::{ChannelConfig, LossPolicy, MemoryChannel};

use crate::cmd::SelftestArgs;
use crate::exit::{CliResult, FAILURE, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: &'static str,
    status: CheckStatus,
    detail: String,
}

#[derive(Debug, Serialize)]
struct SelftestOutput {
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(_args: SelftestArgs, format: OutputFormat) -> CliResult<i32> {
    let checks = run_checks();
    let has_fail = checks.iter().any(|c| c.status == CheckStatus::Fail);
    let output = SelftestOutput {
        checks,
        overall: if has_fail { "fail" } else { "pass" },
    };

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table | OutputFormat::Pretty => print_report(&output),
        OutputFormat::Raw => println!("{}", output.overall),
    }

    if has_fail {
        Ok(FAILURE)
    } else {
        Ok(SUCCESS)
    }
}

fn run_checks() -> Vec<CheckResult> {
    vec![
        roundtrip_all_lengths_check(),
        noise_resync_check(),
        transfer_check(
            "lossless",
            ChannelConfig::default(),
            None,
            |r| r.outcome.is_success() && r.retries == 0 && r.transmissions == 1,
        ),
        transfer_check(
            "drop_all",
            ChannelConfig {
                data_loss: LossPolicy::Always,
                ..ChannelConfig::default()
            },
            None,
            |r| {
                matches!(r.outcome, SendOutcome::Failed(SendFailure::Timeout { .. }))
                    && r.retries == 3
                    && r.transmissions == 3
            },
        ),
        transfer_check(
            "drop_first",
            ChannelConfig {
                data_loss: LossPolicy::First(1),
                ..ChannelConfig::default()
            },
            None,
            |r| r.outcome.is_success() && r.retries == 1 && r.transmissions == 2,
        ),
        transfer_check(
            "corrupt_nack",
            ChannelConfig::default(),
            Some(2),
            |r| r.outcome.is_success() && r.retries == 1,
        ),
        transfer_check(
            "lost_nack",
            ChannelConfig {
                ack_loss: LossPolicy::First(1),
                ..ChannelConfig::default()
            },
            Some(2),
            |r| r.outcome.is_success() && r.retries == 1 && r.elapsed.as_millis() >= 1000,
        ),
    ]
}

fn check(name: &'static str, ok: bool, detail: String) -> CheckResult {
    CheckResult {
        name,
        status: if ok { CheckStatus::Pass } else { CheckStatus::Fail },
        detail,
    }
}

fn roundtrip_all_lengths_check() -> CheckResult {
    let mut parser = FrameParser::new();
    let mut failures = 0usize;
    for len in 1..=MAX_PAYLOAD {
        let payload: Vec<u8> = (0..len).map(|i| (i * 31 + len) as u8).collect();
        let ok = match encode(&payload, MAX_FRAME_SIZE) {
            Ok(frame) => matches!(
                parser.feed(frame.as_bytes()).as_slice(),
                [Outcome::Complete(p)] if p.as_ref() == payload.as_slice()
            ),
            Err(_) => false,
        };
        if !ok {
            failures += 1;
        }
    }
    check(
        "roundtrip_all_lengths",
        failures == 0,
        format!("{} lengths, {failures} failures", MAX_PAYLOAD),
    )
}

fn noise_resync_check() -> CheckResult {
    let mut parser = FrameParser::new();
    let mut wire = vec![0xFF, 0x03, 0x00, 0x7E];
    let mut corrupt = encode(b"bad", MAX_FRAME_SIZE)
        .map(|f| f.as_bytes().to_vec())
        .unwrap_or_default();
    if let Some(byte) = corrupt.get_mut(3) {
        *byte ^= 0x01;
    }
    wire.extend(corrupt);
    if let Ok(frame) = encode(b"good", MAX_FRAME_SIZE) {
        wire.extend_from_slice(frame.as_bytes());
    }

    let outcomes = parser.feed(&wire);
    let ok = matches!(
        outcomes.as_slice(),
        [Outcome::Rejected(_), Outcome::Complete(p)] if p.as_ref() == b"good"
    ) && parser.is_idle();
    check(
        "noise_resync",
        ok,
        format!(
            "{} discarded, {} rejected",
            parser.bytes_discarded(),
            parser.frames_rejected()
        ),
    )
}

fn transfer_check(
    name: &'static str,
    config: ChannelConfig,
    corrupt_offset: Option<usize>,
    passes: impl Fn(&TransferReport) -> bool,
) -> CheckResult {
    let mut channel = MemoryChannel::with_config(config);
    if let Some(offset) = corrupt_offset {
        channel.corrupt_next(offset, 0x01);
    }
    let mut link = Link::new(channel);
    match link.transfer(b"selftest") {
        Ok(report) => check(
            name,
            passes(&report),
            format!(
                "{}, retries={}, transmissions={}",
                report.outcome, report.retries, report.transmissions
            ),
        ),
        Err(err) => check(name, false, err.to_string()),
    }
}

fn print_report(output: &SelftestOutput) {
    let rows = output
        .checks
        .iter()
        .map(|c| {
            vec![
                match c.status {
                    CheckStatus::Pass => "PASS".to_string(),
                    CheckStatus::Fail => "FAIL".to_string(),
                },
                c.name.to_string(),
                c.detail.clone(),
            ]
        })
        .collect();
    print_table(&["STATUS", "CHECK", "DETAIL"], rows);
    if output.overall == "pass" {
        println!("Result: all checks passed");
    } else {
        println!("Result: one or more checks failed");
    }
}
