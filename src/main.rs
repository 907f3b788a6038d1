use anyhow::Context;
use clap::Parser;
use scriptdbg::console::config::Config;
use scriptdbg::console::AppBuilder;
use scriptdbg::debugger::utils::on_engine_thread;
use scriptdbg::log;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Script to debug
    script: String,

    /// Script arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    script_args: Vec<String>,

    /// Script interpreter, searched in PATH if not an absolute path
    #[arg(long, env = "SDBG_INTERPRETER", default_value_t = String::from("ipy"))]
    interpreter: String,

    /// Path to a configuration file, `~/.config/sdbg/config.toml` by default
    #[arg(long)]
    config: Option<PathBuf>,

    /// Step through infrastructure code too
    #[arg(long)]
    no_jmc: bool,

    /// Log every debug event
    #[arg(short, long)]
    verbose: bool,

    /// Disable debugger logs
    #[arg(long)]
    quiet: bool,
}

fn run(args: Args) -> anyhow::Result<i32> {
    let interpreter = which::which(&args.interpreter)
        .with_context(|| format!("interpreter `{}` not found", args.interpreter))?;
    let config = Config::load(args.config.as_deref());

    on_engine_thread(move || {
        let app = AppBuilder::new(interpreter, config)
            .with_jmc_stepping(!args.no_jmc)
            .build(&args.script, &args.script_args)?;
        app.run()
    })?
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log::default_filter(args.verbose)),
    )
    .init();
    if args.quiet {
        log::disable();
    }

    match run(args) {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
