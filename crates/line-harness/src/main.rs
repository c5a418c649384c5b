//! CLI entry point for the `uart-sim` binary.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

use line_harness as _;
use line_harness::runner::{run_script, ScriptReport};
use line_harness::script::{parse_script, ScriptConfig};
#[cfg(test)]
use rstest as _;
use serde as _;
use serde_json as _;
#[cfg(test)]
use tempfile as _;
use uart_core::{compute_divisor, ReceiverState, TraceEvent, TraceSink, UartConfig};

const USAGE_TEXT: &str = "\
Usage: uart-sim <command> [options]

Commands:
  run <script> [options]            Drive a .uart script through the receiver
  divisor --clk <hz> --baud <rate>  Print the bit-period divisor for a rate

Options:
  --clk <hz>        System clock frequency (default: 24000000)
  --baud <rate>     Line rate in baud (default: 9600)
  --max-err <frac>  Allowed relative baud error (default: 0.05)
  --trace           Print receiver trace events to stderr (run only)
  --json            Print the report as JSON (run only)
  -h, --help        Show this help message

Command-line rates override a script's config line.

Examples:
  uart-sim run bench.uart
  uart-sim run bench.uart --baud 115200 --trace
  uart-sim divisor --clk 24000000 --baud 115200
";

#[derive(Debug, PartialEq)]
enum Command {
    Run(RunArgs),
    Divisor(ScriptConfig),
}

#[derive(Debug, PartialEq)]
struct RunArgs {
    input: PathBuf,
    rates: ScriptConfig,
    trace: bool,
    json: bool,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    let command_str = first.to_string_lossy().to_string();

    match command_str.as_str() {
        "run" => parse_run_args(args)
            .map(Command::Run)
            .map(ParseResult::Command),
        "divisor" => parse_divisor_args(args)
            .map(Command::Divisor)
            .map(ParseResult::Command),
        other => Err(format!("unknown command: {other}")),
    }
}

/// Consumes a rate option and its value. Returns false if `arg` is not one.
fn parse_rate_option(
    arg: &OsString,
    args: &mut impl Iterator<Item = OsString>,
    rates: &mut ScriptConfig,
) -> Result<bool, String> {
    let name = arg.to_string_lossy();
    if !matches!(name.as_ref(), "--clk" | "--baud" | "--max-err") {
        return Ok(false);
    }

    let value = args
        .next()
        .ok_or_else(|| format!("missing value for {name}"))?;
    let value = value.to_string_lossy();
    let invalid = || format!("invalid value for {name}: {value}");

    match name.as_ref() {
        "--clk" => rates.clk_freq_hz = Some(value.parse().map_err(|_| invalid())?),
        "--baud" => rates.baud_rate = Some(value.parse().map_err(|_| invalid())?),
        _ => rates.max_err = Some(value.parse().map_err(|_| invalid())?),
    }
    Ok(true)
}

#[allow(clippy::while_let_on_iterator)]
fn parse_run_args(mut args: impl Iterator<Item = OsString>) -> Result<RunArgs, String> {
    let mut input: Option<PathBuf> = None;
    let mut rates = ScriptConfig::default();
    let mut trace = false;
    let mut json = false;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg == "--trace" {
            trace = true;
            continue;
        }

        if arg == "--json" {
            json = true;
            continue;
        }

        if parse_rate_option(&arg, &mut args, &mut rates)? {
            continue;
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if input.is_some() {
            return Err("multiple script paths provided".to_string());
        }
        input = Some(PathBuf::from(arg));
    }

    let input = input.ok_or_else(|| "missing script path".to_string())?;
    Ok(RunArgs {
        input,
        rates,
        trace,
        json,
    })
}

#[allow(clippy::while_let_on_iterator)]
fn parse_divisor_args(mut args: impl Iterator<Item = OsString>) -> Result<ScriptConfig, String> {
    let mut rates = ScriptConfig::default();

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if parse_rate_option(&arg, &mut args, &mut rates)? {
            continue;
        }

        return Err(format!("unknown option: {}", arg.to_string_lossy()));
    }

    if rates.clk_freq_hz.is_none() || rates.baud_rate.is_none() {
        return Err("divisor needs --clk and --baud".to_string());
    }
    Ok(rates)
}

/// Prints trace events to stderr, one per line.
struct StderrSink;

impl TraceSink for StderrSink {
    fn on_event(&mut self, event: TraceEvent) {
        eprintln!("{}", format_event(&event));
    }
}

fn format_event(event: &TraceEvent) -> String {
    match *event {
        TraceEvent::StateChanged { tick, from, to } => format!("{tick:>8}: {from} -> {to}"),
        TraceEvent::BitSampled { tick, index, level } => {
            format!("{tick:>8}: bit {index} = {}", u8::from(level))
        }
        TraceEvent::ByteReceived { tick, value } => format!("{tick:>8}: byte 0x{value:02X}"),
        TraceEvent::FramingFault { tick, cause } => format!("{tick:>8}: fault {cause}"),
    }
}

fn print_report(report: &ScriptReport) {
    for result in &report.results {
        println!("{result}");
    }

    let received: Vec<String> = report
        .received
        .iter()
        .map(|b| format!("0x{b:02X}"))
        .collect();
    println!();
    println!(
        "Received: [{}] in {} ticks (divisor {})",
        received.join(", "),
        report.ticks,
        report.divisor
    );
    for fault in &report.faults {
        println!("Fault: {fault}");
    }
    let waiting = match report.final_state {
        _ if !report.awaiting_handshake => "",
        ReceiverState::Full => ", waiting for ack",
        _ => ", waiting for fix",
    };
    println!(
        "Final state: {} (status 0x{:02X}{waiting})",
        report.final_state, report.status
    );

    let summary = report.summary();
    println!("Expectations: {summary} (total: {})", summary.total);
}

fn run(args: &RunArgs) -> Result<(), i32> {
    let source = match fs::read_to_string(&args.input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: failed to read {}: {e}", args.input.display());
            return Err(1);
        }
    };

    let mut script = match parse_script(&source) {
        Ok(script) => script,
        Err(e) => {
            eprintln!("{}:{e}", args.input.display());
            return Err(1);
        }
    };
    script.config = script.config.overridden_by(args.rates);

    let base = UartConfig {
        tracing_enabled: args.trace,
        ..UartConfig::default()
    };
    let sink: Option<Box<dyn TraceSink>> = if args.trace {
        Some(Box::new(StderrSink))
    } else {
        None
    };

    let report = match run_script(&script, base, sink) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {e}");
            return Err(1);
        }
    };

    if args.json {
        match report.to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: failed to encode report: {e}");
                return Err(1);
            }
        }
    } else {
        print_report(&report);
    }

    if report.all_passed() {
        Ok(())
    } else {
        Err(1)
    }
}

fn run_divisor(rates: ScriptConfig) -> Result<(), i32> {
    let config = rates.apply(UartConfig::default());
    match compute_divisor(config.clk_freq_hz, config.baud_rate, config.max_err) {
        Ok(divisor) => {
            println!(
                "divisor: {} (achieved {:.1} baud, error {:.4}%)",
                divisor.get(),
                divisor.achieved_rate(config.clk_freq_hz),
                divisor.relative_error(config.clk_freq_hz, config.baud_rate) * 100.0
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("error: {e}");
            Err(1)
        }
    }
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(Command::Run(args))) => match run(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Ok(ParseResult::Command(Command::Divisor(rates))) => match run_divisor(rates) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Err(error) => {
            if error.starts_with("Usage:") {
                println!("{error}");
            } else {
                eprintln!("error: {error}");
                eprintln!("{USAGE_TEXT}");
            }
            1
        }
    };

    std::process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::path::PathBuf;
    use uart_core::FramingError;

    fn os_args(args: &[&str]) -> impl Iterator<Item = OsString> {
        args.iter()
            .map(OsString::from)
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn parses_run_command_with_overrides() {
        let result = parse_run_args(os_args(&[
            "bench.uart",
            "--baud",
            "115200",
            "--max-err",
            "0.01",
            "--trace",
            "--json",
        ]))
        .expect("valid run args should parse");

        assert_eq!(
            result,
            RunArgs {
                input: PathBuf::from("bench.uart"),
                rates: ScriptConfig {
                    clk_freq_hz: None,
                    baud_rate: Some(115_200),
                    max_err: Some(0.01),
                },
                trace: true,
                json: true,
            }
        );
    }

    #[test]
    fn parses_divisor_command() {
        let result = parse_args(os_args(&["divisor", "--clk", "24000000", "--baud", "9600"]))
            .expect("valid divisor args should parse");
        assert!(matches!(
            result,
            ParseResult::Command(Command::Divisor(ScriptConfig {
                clk_freq_hz: Some(24_000_000),
                baud_rate: Some(9600),
                max_err: None,
            }))
        ));
    }

    #[test]
    fn parses_help_flag() {
        let result = parse_args(os_args(&["-h"])).expect("help should parse without error");
        assert!(matches!(result, ParseResult::Help));
    }

    #[test]
    fn rejects_unknown_command() {
        let error = parse_args(os_args(&["decode"])).expect_err("unknown command should fail");
        assert!(error.contains("unknown command"));
    }

    #[test]
    fn divisor_requires_both_rates() {
        let error =
            parse_divisor_args(os_args(&["--clk", "24000000"])).expect_err("missing baud");
        assert!(error.contains("--clk and --baud"));
    }

    #[test]
    fn rate_option_requires_numeric_value() {
        let error = parse_run_args(os_args(&["bench.uart", "--clk", "fast"]))
            .expect_err("non-numeric clock");
        assert_eq!(error, "invalid value for --clk: fast");

        let error = parse_run_args(os_args(&["bench.uart", "--baud"])).expect_err("no value");
        assert_eq!(error, "missing value for --baud");
    }

    #[test]
    fn run_rejects_unknown_option_and_second_path() {
        let error = parse_run_args(os_args(&["a.uart", "--verbose"])).expect_err("bad option");
        assert!(error.contains("unknown option"));

        let error = parse_run_args(os_args(&["a.uart", "b.uart"])).expect_err("two paths");
        assert!(error.contains("multiple script paths"));
    }

    #[test]
    fn run_requires_script_path() {
        let error = parse_run_args(std::iter::empty()).expect_err("missing path");
        assert!(error.contains("missing script path"));
    }

    #[test]
    fn trace_lines_are_tick_aligned() {
        assert_eq!(
            format_event(&TraceEvent::StateChanged {
                tick: 229,
                from: ReceiverState::Stop,
                to: ReceiverState::Full,
            }),
            "     229: stop -> full"
        );
        assert_eq!(
            format_event(&TraceEvent::BitSampled {
                tick: 37,
                index: 0,
                level: true,
            }),
            "      37: bit 0 = 1"
        );
        assert_eq!(
            format_event(&TraceEvent::FramingFault {
                tick: 9,
                cause: FramingError::Overrun,
            }),
            format!("       9: fault {}", FramingError::Overrun)
        );
    }
}
