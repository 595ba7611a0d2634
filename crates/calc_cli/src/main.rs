//! CLI probe entry point.
//!
//! # Responsibility
//! - Evaluate one anonymous calculation through the JSON boundary.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `calc_cli <operand1> <operation> [operand2]`

use calc_core::api::{anonymous_calculate, CalculateRequest, OperandInput};
use calc_core::{core_version, init_from_config, AnonymousHistory, CalcConfig};
use log::{error, info};
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = match CalcConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("calc_cli: {err}");
            return ExitCode::from(2);
        }
    };
    if let Err(err) = init_from_config(&config) {
        eprintln!("calc_cli: logging disabled: {err}");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(request) = request_from_args(&args) else {
        eprintln!("usage: calc_cli <operand1> <operation> [operand2]");
        eprintln!("calc_core version={}", core_version());
        return ExitCode::from(2);
    };

    let history = AnonymousHistory::new(config.anonymous_history_capacity);
    let response = anonymous_calculate(&history, &request);
    match serde_json::to_string_pretty(&response.body) {
        Ok(body) => println!("{body}"),
        Err(err) => {
            error!("event=cli_print module=cli status=error error={err}");
            return ExitCode::FAILURE;
        }
    }
    info!(
        "event=cli_calculate module=cli status={} version={}",
        response.status,
        core_version()
    );

    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn request_from_args(args: &[String]) -> Option<CalculateRequest> {
    match args {
        [operand1, operation] | [operand1, operation, _] => Some(CalculateRequest {
            operand1: Some(OperandInput::Text(operand1.clone())),
            operand2: args.get(2).cloned().map(OperandInput::Text),
            operation: Some(operation.clone()),
        }),
        _ => None,
    }
}
