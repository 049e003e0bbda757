//! ttybridge - relay bytes between a serial device and stdin/stdout.

use std::io;
use std::os::fd::AsRawFd;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ttybridge::cli::Cli;
use ttybridge::core::lifecycle::{self, LifecycleGuard};
use ttybridge::core::term_mode::{self, InputOptions};
use ttybridge::core::relay::Relay;
use ttybridge::LineConfig;

fn main() -> ExitCode {
    // Stdout carries relayed bytes, so all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // clap's default exit status is 2; argument errors are plain
            // failures here. Help and version requests are not errors.
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ttybridge: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config: LineConfig = cli.config.parse()?;

    let device = term_mode::open_device(&cli.device)?;
    tracing::info!(device = %cli.device.display(), %config, "opened serial device");

    // Capture-before-mutate: both snapshots exist before the relay starts,
    // and the guard below is the only thing allowed to consume them.
    let device_saved = term_mode::configure_device(&device, &config)?;
    let input_saved = term_mode::configure_input(
        io::stdin(),
        InputOptions {
            canonical: cli.canonical,
            echo: cli.echo,
        },
    );

    let guard = LifecycleGuard::new(device.as_raw_fd(), device_saved, input_saved);

    let outcome = match lifecycle::install_signal_handler(Arc::clone(&guard)) {
        Ok(()) => {
            let mut relay = Relay::new(&device, io::stdin(), io::stdout());
            relay.run().context("relay terminated")
        }
        Err(err) => Err(anyhow::Error::new(err).context("could not install signal handler")),
    };

    guard.shutdown();
    outcome
}
