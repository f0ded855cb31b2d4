use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("stxlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: stxlink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("STXLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("STXLINK_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "features: arq={}, async={}, cli=true",
        cfg!(feature = "arq"),
        cfg!(feature = "async")
    );
    println!(
        "protocol: max_payload={} max_retries={} ack_timeout={}ms",
        stxlink_frame::MAX_PAYLOAD,
        stxlink_arq::MAX_RETRIES,
        stxlink_arq::ACK_TIMEOUT.as_millis()
    );

    Ok(SUCCESS)
}
