//! match-iterate CLI
//!
//! Entry point for the `match-iterate` command-line tool.

use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use match_iterate::console::Level;
use match_iterate::{
    orchestrator_from_config, telemetry, CliOverrides, Console, InterruptHandler, IterateConfig,
    ReferenceTable, ThreadPause, Variant, Watcher,
};

#[derive(Parser)]
#[command(name = "match-iterate")]
#[command(about = "Automates the build -> verify -> analyze cycle for matching decompilation", version)]
struct Cli {
    /// Build variant to compile
    #[arg(long, value_enum, default_value_t = VariantArg::MainExe)]
    variant: VariantArg,

    /// Show verbose output including build logs
    #[arg(short, long)]
    verbose: bool,

    /// Watch a source file and rebuild on changes (e.g., ../source/libgv/file.c)
    #[arg(short, long, value_name = "FILE")]
    watch: Option<PathBuf>,

    /// Focus on a specific function (reserved, currently has no effect)
    #[arg(short, long, value_name = "NAME")]
    function: Option<String>,

    /// Path to config file (default: <build-dir>/iterate.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory the build and compare tools run in
    #[arg(long, value_name = "DIR")]
    build_dir: Option<PathBuf>,

    /// Kill build or compare tools running longer than this
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "snake_case")]
enum VariantArg {
    MainExe,
    VrExe,
    DevExe,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::MainExe => Variant::MainExe,
            VariantArg::VrExe => Variant::VrExe,
            VariantArg::DevExe => Variant::DevExe,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.verbose);

    let console = if cli.no_color {
        Console::plain()
    } else {
        Console::from_env()
    };
    let variant = Variant::from(cli.variant);

    if let Some(function) = &cli.function {
        tracing::debug!(function = %function, "--function is reserved and ignored");
    }

    let overrides = CliOverrides {
        build_dir: cli.build_dir.clone(),
        timeout_seconds: cli.timeout,
    };
    let config = match IterateConfig::load(cli.config.as_deref(), &overrides) {
        Ok(c) => c,
        Err(e) => {
            console.error(&format!("Error loading config: {}", e));
            process::exit(1);
        }
    };

    let table = if variant.skips_verification() {
        None
    } else {
        match ReferenceTable::load(&config.reference_path()) {
            Ok(t) => Some(t),
            Err(e) => {
                console.error(&format!("Error loading reference hashes: {}", e));
                process::exit(1);
            }
        }
    };

    let mut orchestrator = orchestrator_from_config(&config, table, variant, console)
        .verbose(cli.verbose)
        .watch_file(cli.watch.clone());

    match cli.watch {
        Some(path) => {
            let mut watcher = match Watcher::start(&path, config.watch_config(), console) {
                Ok(w) => w,
                Err(e) => {
                    console.error(&e.to_string());
                    process::exit(1);
                }
            };

            let handler = InterruptHandler::new();
            if let Err(e) = handler.install() {
                console.status(Level::Warn, &format!("Could not install interrupt handler: {}", e));
            }
            let interrupt = handler.state();

            watcher.run(&mut orchestrator, &mut ThreadPause, &interrupt);
        }
        None => {
            let result = orchestrator.run_cycle();
            process::exit(if result.success() { 0 } else { 1 });
        }
    }
}
