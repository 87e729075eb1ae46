use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("gqlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: gqlink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("GQLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "defaults: port={} baud={} timeout={}s",
        gqlink_transport::DEFAULT_PORT,
        gqlink_transport::DEFAULT_BAUD_RATE,
        gqlink_transport::DEFAULT_TIMEOUT.as_secs()
    );
    println!(
        "heartbeat_queue: {}",
        gqlink_client::DEFAULT_QUEUE_CAPACITY
    );

    Ok(SUCCESS)
}
