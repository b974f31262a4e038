use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use skyfollow_adapters::{configuration, telemetry};
use skyfollow_adapters::{
    CsvOutcomeSink, CsvRecordSource, KeyringCredentialStore, TokioSleeper, XrpcAuthenticator,
    XrpcTransport,
};
use skyfollow_core::config::Settings;
use skyfollow_core::entities::{Credentials, MigrationProgress, OutcomeRecord};
use skyfollow_core::ports::{Authenticator, CredentialStore};
use skyfollow_core::retry::{RateLimitedClient, RetryPolicy};
use skyfollow_core::use_cases::MigrateUseCase;
use tracing::{error, info, warn};

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every handle in the input CSV and follow the matching accounts
    Migrate {
        /// CSV file with the source handles
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Where to write the results CSV
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Suffix appended to each handle (e.g. ".bsky.social")
        #[arg(short, long)]
        suffix: Option<String>,

        /// Skip confirmation prompt
        #[arg(short, long, default_value = "false")]
        yes: bool,
    },

    /// Log in once and print the account DID
    CheckAuth,

    /// Store the app password in the system keyring
    SavePassword {
        /// Account handle or email (defaults to account.identifier)
        #[arg(long)]
        identifier: Option<String>,
    },

    /// Remove the stored app password from the keyring
    ForgetPassword {
        /// Account handle or email (defaults to account.identifier)
        #[arg(long)]
        identifier: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = configuration::get_configuration()
        .map_err(|e| anyhow::anyhow!("configuration loading failed: {}", e))?;

    let _guard = telemetry::init_subscriber("skyfollow", &settings.log_level)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate {
            input,
            output,
            suffix,
            yes,
        } => migrate(settings, input, output, suffix, yes).await,

        Commands::CheckAuth => {
            let credentials = resolve_credentials(&settings).await?;
            let authenticator = XrpcAuthenticator::new(settings.service.url.clone())?;

            println!("Authenticating as {}...", credentials.identifier);
            let session = authenticator.authenticate(&credentials).await?;
            println!("Authentication successful.");
            println!("- DID: {}", session.own_account_id);
            Ok(())
        }

        Commands::SavePassword { identifier } => {
            let identifier = resolve_identifier(&settings, identifier)?;
            let prompt = format!("App password for {}: ", identifier);
            let password = rpassword::prompt_password(prompt)?;
            if password.is_empty() {
                return Err(anyhow::anyhow!("empty password, nothing stored"));
            }

            KeyringCredentialStore::for_service(&settings.service.url)?
                .store_password(&identifier, &password)
                .await?;
            println!("Password saved to keyring");
            Ok(())
        }

        Commands::ForgetPassword { identifier } => {
            let identifier = resolve_identifier(&settings, identifier)?;
            KeyringCredentialStore::for_service(&settings.service.url)?
                .delete_password(&identifier)
                .await?;
            println!("Password removed from keyring");
            Ok(())
        }
    }
}

async fn migrate(
    mut settings: Settings,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    suffix: Option<String>,
    yes: bool,
) -> anyhow::Result<()> {
    if let Some(input) = input {
        settings.migration.input_path = input;
    }
    if let Some(output) = output {
        settings.migration.output_path = output;
    }
    if let Some(suffix) = suffix {
        settings.migration.identifier_suffix = suffix;
    }

    let credentials = resolve_credentials(&settings).await?;
    let migration = &settings.migration;

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Follow every '{}' handle from {} as {}?",
                migration.identifier_suffix,
                migration.input_path.display(),
                credentials.identifier
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let pacing = migration.pacing();
    let sleeper = Arc::new(TokioSleeper);
    let client = Arc::new(RateLimitedClient::new(
        Arc::new(XrpcTransport::new(settings.service.url.clone())?),
        Arc::new(XrpcAuthenticator::new(settings.service.url.clone())?),
        sleeper.clone(),
        credentials,
        RetryPolicy::new(settings.service.status_map(), pacing.rate_limit_pause),
    ));
    let use_case = MigrateUseCase::new(
        client,
        sleeper,
        migration.identifier_suffix.clone(),
        pacing,
    );

    let source = CsvRecordSource::new(migration.input_path.clone(), &migration.source_column);
    let sink = CsvOutcomeSink::new(migration.output_path.clone());

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(PROGRESS_TEMPLATE)?
            .progress_chars("#>-"),
    );

    let pb_clone = pb.clone();
    let progress = move |progress: MigrationProgress| {
        pb_clone.set_length(progress.total as u64);
        pb_clone.set_position(progress.index as u64);
        pb_clone.set_message(progress.outcome.source_identifier);
    };

    match use_case.execute(&source, &sink, progress).await {
        Ok(outcomes) => {
            pb.finish_and_clear();
            print_summary(&outcomes);
            println!("Results saved to {}", sink.path().display());
            info!(count = outcomes.len(), "migration finished");
            Ok(())
        }
        Err(aborted) => {
            pb.abandon();
            error!(error = %aborted.source, "migration aborted");
            if aborted.outcomes.is_empty() {
                if aborted.source.is_fatal() {
                    println!("Check your credentials and network connection, then rerun.");
                }
            } else if aborted.source.is_fatal() {
                print_summary(&aborted.outcomes);
                warn!(
                    path = %sink.path().display(),
                    "partial results written; rerunning starts from the first handle"
                );
            } else {
                // The run finished but the results file could not be written
                print_summary(&aborted.outcomes);
                dump_outcomes(&aborted.outcomes);
            }
            Err(aborted.into())
        }
    }
}

fn print_summary(outcomes: &[OutcomeRecord]) {
    let followed = outcomes.iter().filter(|o| o.followed).count();
    let missing = outcomes
        .iter()
        .filter(|o| o.message == OutcomeRecord::NO_MATCH_MESSAGE)
        .count();
    let failed = outcomes.len() - followed - missing;

    println!("Processed {} handles:", outcomes.len());
    println!("- Followed: {}", followed);
    println!("- No matching account: {}", missing);
    println!("- Failed: {}", failed);
}

fn dump_outcomes(outcomes: &[OutcomeRecord]) {
    println!("Results:");
    for o in outcomes {
        println!(
            "{},{},{},{}",
            o.source_identifier, o.derived_identifier, o.followed, o.message
        );
    }
}

fn resolve_identifier(settings: &Settings, identifier: Option<String>) -> anyhow::Result<String> {
    if let Some(identifier) = identifier {
        return Ok(identifier);
    }
    if !settings.account.identifier.is_empty() {
        return Ok(settings.account.identifier.clone());
    }
    let identifier: String = Input::new()
        .with_prompt("Bluesky handle or email")
        .interact_text()?;
    Ok(identifier)
}

/// Configured password first, then the keyring, then an interactive prompt.
async fn resolve_credentials(settings: &Settings) -> anyhow::Result<Credentials> {
    let identifier = resolve_identifier(settings, None)?;

    if let Some(password) = settings.account.password.clone() {
        return Ok(Credentials::new(identifier, password));
    }

    let store = KeyringCredentialStore::for_service(&settings.service.url)?;
    let stored = match store.get_password(&identifier).await {
        Ok(stored) => stored,
        Err(e) => {
            warn!(error = %e, "keyring unavailable");
            None
        }
    };

    let password = match stored {
        Some(p) => {
            println!("Using saved password");
            p
        }
        None => rpassword::prompt_password("App password: ")?,
    };

    Ok(Credentials::new(identifier, password))
}
