//! controllerd - 网关控制器
//!
//! Usage:
//! - Normal mode: `controllerd`
//! - With custom port: `controllerd --port 9090`

use std::process::ExitCode;

use controllerd::RuntimeConfig;

/// 解析命令行参数
fn parse_args() -> RuntimeConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = RuntimeConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" if i + 1 < args.len() => {
                config.port_override = args[i + 1].parse().ok();
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    config
}

fn print_help() {
    println!("controllerd - 网关控制器");
    println!();
    println!("USAGE:");
    println!("    controllerd [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --port <PORT>    Override the listening port");
    println!("    -h, --help       Print help information");
    println!();
    println!("ENVIRONMENT:");
    println!("    SERVICES           Comma-separated gateway containers (dnsd is always added)");
    println!("    LETSENCRYPT_PROD   Any non-empty value selects the production CA");
    println!("    PORT               Listening port (default 8080)");
}

fn main() -> ExitCode {
    let config = parse_args();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(controllerd::init_and_run_with_config(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
