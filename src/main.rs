// SPDX-FileCopyrightText: © 2026 Kubvernor authors
// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2026 Kubvernor authors.
//         This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, version 3.
//         This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//         You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
//
//

use std::io::Write;

use clap::Parser;
use kubvernor_sendconfig::{configuration::Configuration, parse_flat_entity_errors, ConfigurationSnapshot, DiagnosticsRecorder};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Layer, Registry,
};

#[derive(Parser, Debug)]
#[command(version, about = "Explains a rejected declarative configuration push", long_about = None)]
pub struct CommandArgs {
    #[arg(long)]
    with_config_file: String,
    /// Response body returned by the admin API
    #[arg(long)]
    body: String,
}

fn init_tracing_logging(configuration: &Configuration) -> Option<WorkerGuard> {
    let console_filter = tracing_subscriber::EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned()));
    let console_layer = fmt::layer()
        .event_format(fmt::format().compact())
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(FmtSpan::NONE)
        .with_ansi(false)
        .with_filter(filter::filter_fn(|meta| !meta.is_span()))
        .with_filter(console_filter);

    let (file_layer, guard) = match &configuration.log_file {
        Some(log_file) => {
            let file_appender = tracing_appender::rolling::never(".", log_file);
            let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);
            let file_filter = tracing_subscriber::EnvFilter::new(std::env::var("RUST_FILE_LOG").unwrap_or_else(|_| "debug".to_owned()));
            let file_layer = fmt::layer()
                .with_writer(non_blocking_appender)
                .with_span_events(FmtSpan::NONE)
                .with_target(true)
                .with_ansi(false)
                .with_filter(filter::filter_fn(|meta| !meta.is_span()))
                .with_filter(file_filter);
            (Some(file_layer), Some(guard))
        },
        None => (None, None),
    };

    Registry::default().with(console_layer).with(file_layer).init();
    guard
}

fn main() -> kubvernor_sendconfig::Result<()> {
    let args = CommandArgs::parse();
    let configuration = Configuration::load(&args.with_config_file)?;
    let _guard = init_tracing_logging(&configuration);
    configuration.validate()?;

    let snapshot = ConfigurationSnapshot::from_slice(&std::fs::read(&configuration.snapshot_file)?)?;
    let body = std::fs::read(&args.body)?;

    let resource_errors = match parse_flat_entity_errors(&body, &snapshot) {
        Ok(resource_errors) => resource_errors,
        Err(e) => {
            warn!("Can't itemize errors from {} {e}", args.body);
            vec![]
        },
    };
    info!("Resolved errors for {} objects", resource_errors.len());

    let recorder = match configuration.reporting_instance {
        Some(reporting_instance) => DiagnosticsRecorder::builder().controller_name(configuration.controller_name).reporting_instance(reporting_instance).build(),
        None => DiagnosticsRecorder::builder().controller_name(configuration.controller_name).build(),
    };
    let report = recorder.report(None, resource_errors);
    writeln!(std::io::stdout().lock(), "{}", serde_yaml::to_string(&report)?)?;
    Ok(())
}
