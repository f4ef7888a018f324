//! GSP CLI - Main entry point

use clap::Parser;
use gsp_cli::commands::provision::ProvisionOptions;
use gsp_cli::commands::verify::VerifyArgs;
use gsp_cli::{Cli, Commands, ConfigCommand};
use gsp_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Handle markdown help generation
    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    // Ensure a command is provided
    if cli.command.is_none() {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        process::exit(2);
    }

    // .env may carry GSP_* settings; a missing file is fine
    dotenvy::dotenv().ok();

    // Warnings only by default, debug with --verbose; LOG_* variables win
    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Warn })
        .output(LogOutput::Console)
        .log_file_prefix("gsp")
        .build();
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // CLI should work without logging; keep the guard to flush file output
    let _guard = init_logging(&log_config).ok().flatten();

    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> gsp_cli::Result<()> {
    let Some(command) = &cli.command else {
        return Ok(());
    };
    let manifest = cli.manifest.as_path();

    match command {
        Commands::Init {
            path,
            name,
            gcp_project,
            bucket,
            force,
        } => {
            gsp_cli::commands::init::run(path.clone(), name.clone(), gcp_project.clone(), bucket.clone(), *force)
                .await
        }

        Commands::Plan {
            format,
            replace,
            teardown,
            include_table,
        } => gsp_cli::commands::plan::run(manifest, *format, *replace, *teardown, *include_table).await,

        Commands::Provision {
            dry_run,
            replace,
            skip_gcp,
            yes,
        } => {
            let options = ProvisionOptions {
                dry_run: *dry_run,
                replace: *replace,
                skip_gcp: *skip_gcp,
                yes: *yes,
            };
            gsp_cli::commands::provision::run(manifest, options).await
        }

        Commands::Describe { integration } => {
            gsp_cli::commands::describe::run(manifest, integration.clone()).await
        }

        Commands::Status { format } => gsp_cli::commands::status::run(manifest, *format).await,

        Commands::History { hours, file, format } => {
            gsp_cli::commands::history::run(manifest, *hours, file.clone(), *format).await
        }

        Commands::Validate { path, format } => gsp_cli::commands::validate::run(manifest, path, *format).await,

        Commands::Verify {
            file,
            expect_rows,
            local,
            malformed,
            timeout,
            interval,
            hours,
            format,
        } => {
            let args = VerifyArgs {
                file: file.clone(),
                expect_rows: *expect_rows,
                local: local.clone(),
                malformed: malformed.clone(),
                timeout_secs: *timeout,
                interval_secs: *interval,
                hours: *hours,
            };
            gsp_cli::commands::verify::run(manifest, args, *format).await
        }

        Commands::Pipe { command } => gsp_cli::commands::pipe::run(manifest, command).await,

        Commands::Teardown { include_table, yes } => {
            gsp_cli::commands::teardown::run(manifest, *include_table, *yes).await
        }

        Commands::Sample {
            out,
            rows,
            first_id,
            malformed,
        } => gsp_cli::commands::sample::run(manifest, out, *rows, *first_id, *malformed).await,

        Commands::Config { command } => match command {
            ConfigCommand::Get { key } => gsp_cli::commands::config::get(key).await,
            ConfigCommand::Show => gsp_cli::commands::config::show().await,
        },

        Commands::Audit { command } => gsp_cli::commands::audit::run(manifest, command).await,
    }
}
