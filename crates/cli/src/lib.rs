pub mod commands;
pub mod util;

use clap::{Parser, Subcommand, ValueEnum};
use util::CliResult;

#[derive(Parser, Debug)]
#[command(name = "opxpath", version, about = "Tokenize, compile and disassemble XPath 3.1 expressions")]
pub struct Cli {
    /// Log filter used when RUST_LOG is not set.
    #[arg(long = "log-level", global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the token queue of an expression.
    Tokens(commands::tokens::TokensArgs),
    /// Compile an expression or match pattern and print its opcode map.
    Compile(commands::compile::CompileArgs),
    /// List the built-in function table.
    Functions(commands::functions::FunctionsArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn init_tracing(level: LogLevel) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.as_filter()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).compact().try_init();
}

pub fn run() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level);
    let output = execute(&cli.command)?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

pub fn execute(command: &Command) -> CliResult<String> {
    match command {
        Command::Tokens(args) => commands::tokens::run(args),
        Command::Compile(args) => commands::compile::run(args),
        Command::Functions(args) => commands::functions::run(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn parses_compile_flags() {
        let cli = Cli::try_parse_from([
            "opxpath",
            "compile",
            "a/b",
            "--deep",
            "--format",
            "json",
            "--namespace",
            "p=urn:p",
            "--namespace",
            "q=urn:q",
            "--max-depth",
            "8",
            "--xpath20",
        ])
        .expect("parse");
        let Command::Compile(args) = cli.command else { panic!("not compile") };
        assert_eq!(args.expression, "a/b");
        assert!(args.deep);
        assert!(!args.pattern);
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.namespaces, ["p=urn:p", "q=urn:q"]);
        assert_eq!(args.max_depth, Some(8));
        assert!(args.xpath20);
    }

    #[rstest]
    fn pattern_and_deep_conflict() {
        assert!(Cli::try_parse_from(["opxpath", "compile", "a", "--pattern", "--deep"]).is_err());
    }

    #[rstest]
    #[case(&["opxpath", "tokens", "1"], LogLevel::Warn)]
    #[case(&["opxpath", "--log-level", "debug", "tokens", "1"], LogLevel::Debug)]
    #[case(&["opxpath", "functions", "--log-level", "trace"], LogLevel::Trace)]
    fn log_level_is_global(#[case] argv: &[&str], #[case] expected: LogLevel) {
        let cli = Cli::try_parse_from(argv).expect("parse");
        assert_eq!(cli.log_level, expected);
    }

    #[rstest]
    fn execute_dispatches() {
        let cli = Cli::try_parse_from(["opxpath", "functions", "--namespace", "math", "--format", "json"])
            .expect("parse");
        let output = execute(&cli.command).expect("functions");
        let json: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(json[0]["namespace"], "math");
    }
}
