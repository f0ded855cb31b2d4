use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod selftest;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode a payload into a wire frame.
    Encode(EncodeArgs),
    /// Parse a byte stream and report every frame found.
    Decode(DecodeArgs),
    /// Run one ARQ transfer over the in-memory lossy link.
    Simulate(SimulateArgs),
    /// Run the built-in protocol scenarios.
    Selftest(SelftestArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Simulate(args) => simulate::run(args, format),
        Command::Selftest(args) => selftest::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Payload given either as text or as hex.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct PayloadArgs {
    /// Payload as a UTF-8 string.
    #[arg(long)]
    pub data: Option<String>,
    /// Payload as hex bytes (e.g. "aa bb cc" or "aabbcc").
    #[arg(long)]
    pub hex: Option<String>,
}

impl PayloadArgs {
    pub fn bytes(&self) -> CliResult<Vec<u8>> {
        if let Some(data) = &self.data {
            return Ok(data.as_bytes().to_vec());
        }
        if let Some(hex) = &self.hex {
            return parse_hex(hex).map_err(|msg| CliError::new(USAGE, format!("--hex: {msg}")));
        }
        Ok(Vec::new())
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Largest frame to emit, in bytes.
    #[arg(long, default_value_t = stxlink_frame::MAX_FRAME_SIZE)]
    pub max_frame_size: usize,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Wire bytes as hex. Reads stdin when neither --hex nor --file is given.
    #[arg(long, conflicts_with = "file")]
    pub hex: Option<String>,
    /// Read wire bytes from a file.
    #[arg(long, conflicts_with = "hex")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Drop the first N transmissions.
    #[arg(long, value_name = "N", conflicts_with = "drop_all")]
    pub drop_first: Option<u32>,
    /// Drop every transmission.
    #[arg(long)]
    pub drop_all: bool,
    /// Drop the first N acknowledgments.
    #[arg(long, value_name = "N")]
    pub drop_acks: Option<u32>,
    /// Flip bits of the first transmission at OFFSET (mask 0xff).
    #[arg(long, value_name = "OFFSET")]
    pub corrupt: Option<usize>,
    /// Acknowledgment timeout (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub timeout: String,
    /// Logical time per scheduling turn.
    #[arg(long, default_value = "10ms")]
    pub tick: String,
    /// Failed attempts tolerated before giving up.
    #[arg(long, default_value_t = stxlink_arq::MAX_RETRIES)]
    pub max_retries: u8,
    /// Scheduling turns before the transfer is abandoned.
    #[arg(long, default_value_t = 10_000)]
    pub max_turns: u64,
}

#[derive(Args, Debug, Default)]
pub struct SelftestArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `500ms`, `2s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}

/// Parse hex bytes, ignoring whitespace, `:` and `,` separators and `0x` prefixes.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, String> {
    let mut digits = String::with_capacity(input.len());
    for token in input.split(|c: char| c.is_whitespace() || c == ':' || c == ',') {
        let token = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        digits.push_str(token);
    }

    if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(format!("invalid hex digit '{bad}'"));
    }
    if digits.len() % 2 != 0 {
        return Err("odd number of hex digits".to_string());
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| format!("invalid hex byte '{}'", &digits[i..i + 2]))
        })
        .collect()
}
