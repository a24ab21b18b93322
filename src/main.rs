mod cli;
mod render;

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;

use bitwatch::engine;
use cli::Cli;
use render::Renderer;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    cli.validate()?;

    let config = engine::EngineConfig::new(
        cli.workers,
        cli.force,
        cli.update,
        &cli.algo,
        cli.skip_symlinks,
        cli.index_name.clone(),
        cli.ignore_name.clone(),
        cli.show_ignored_only,
    )?;

    let renderer = Renderer::new(
        cli.quiet,
        cli.verbose,
        cli.plain,
        cli.log_file.as_deref(),
        cli.log_verbose,
    )
    .context("could not open log file")?;
    let renderer = Arc::new(Mutex::new(renderer));

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || {
            eprintln!("abort");
            cancel.store(true, Ordering::SeqCst);
        })
        .context("could not install Ctrl-C handler")?;
    }

    let renderer_for_events = Arc::clone(&renderer);
    let report = engine::run(
        config,
        cli.paths.clone(),
        move |event| {
            renderer_for_events.lock().unwrap().handle_event(event);
        },
        Arc::clone(&cancel),
    )?;

    renderer.lock().unwrap().finish(&report, cli.update);

    if cancel.load(Ordering::SeqCst) {
        return Ok(ExitCode::from(1));
    }

    Ok(ExitCode::from(report.exit_code() as u8))
}
