//! Campaign Wizard: command-line front end for the fee engine, timeline
//! derivation and draft review.
//!
//! Every subcommand prints JSON to stdout; logs go to stderr.

use anyhow::Context;
use campaign_billing::{FeeCalculator, FeeInput};
use campaign_core::money::parse_money;
use campaign_core::{Addon, AppConfig, FeeMode, PlatformId};
use campaign_management::conflicts::ExistingCampaign;
use campaign_management::{
    CampaignWizard, ConflictDetector, InMemoryCampaignDirectory, TimelineDeriver, WizardStep,
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "campaign-wizard")]
#[command(about = "Film advertising campaign configuration tools")]
#[command(version)]
struct Cli {
    /// Optional TOML config file (environment variables still override it)
    #[arg(long, global = true, env = "CAMPAIGN_WIZARD_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Price a campaign
    Fees {
        /// Total investment, e.g. "12,500"
        #[arg(long)]
        investment: String,

        /// Advertising platforms, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        platforms: Vec<String>,

        /// integrated | additional
        #[arg(long, default_value = "integrated", value_parser = parse_snake::<FeeMode>)]
        mode: FeeMode,

        #[arg(long, default_value_t = false)]
        first_release: bool,

        /// Add-on to include (repeatable), e.g. content_adaptation
        #[arg(long = "addon", value_parser = parse_snake::<Addon>)]
        addons: Vec<Addon>,

        /// Campaigns already run with this distributor
        #[arg(long, default_value_t = 0)]
        prior_engagements: u32,
    },
    /// Derive the campaign calendar from a release date
    Timeline {
        /// Release date (YYYY-MM-DD)
        #[arg(long)]
        release_date: NaiveDate,

        #[arg(long, default_value_t = false)]
        content_adaptation: bool,

        /// Manual campaign end date (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<NaiveDate>,
    },
    /// Review a saved draft: fees, timeline, step gating and submission
    Summary {
        draft: PathBuf,
    },
    /// Check a saved draft against a directory of booked campaigns
    Conflicts {
        draft: PathBuf,

        /// JSON array of booked campaigns
        directory: PathBuf,

        #[arg(long, default_value_t = false)]
        admin: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campaign_wizard=info,campaign_management=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    match cli.command {
        Command::Fees {
            investment,
            platforms,
            mode,
            first_release,
            addons,
            prior_engagements,
        } => {
            let input = FeeInput {
                platforms: platforms.iter().map(|p| PlatformId::new(p.trim())).collect(),
                total_investment: parse_money("total_investment", &investment)?,
                fee_mode: mode,
                is_first_release: first_release,
                selected_addons: addons.into_iter().collect(),
                prior_engagements,
            };
            let breakdown = FeeCalculator::new(config.fees.clone()).calculate(&input)?;
            info!(
                total_estimated = %breakdown.total_estimated,
                fee_mode = ?breakdown.fee_mode,
                "Fees calculated"
            );
            print_json(&serde_json::json!({
                "breakdown": breakdown,
                "line_items": breakdown.line_items(),
            }))
        }
        Command::Timeline {
            release_date,
            content_adaptation,
            end_date,
        } => {
            let timeline = TimelineDeriver::new(config.timeline.clone()).derive(
                release_date,
                content_adaptation,
                end_date,
            )?;
            print_json(&serde_json::json!({
                "timeline": timeline,
                "milestones": timeline.milestones(),
            }))
        }
        Command::Summary { draft } => {
            let wizard = CampaignWizard::new(&config);
            let state = wizard.restore_json(&read(&draft)?)?;
            info!(campaign_id = %state.id, "Draft restored");

            let steps: Vec<_> = WizardStep::ALL
                .iter()
                .map(|step| wizard.step_report(&state, *step, None, false))
                .collect();
            let fees = wizard.fees(&state).map_err(|e| e.to_string());
            let timeline = wizard
                .timeline(&state)
                .map(|t| t.map_err(|e| e.to_string()));
            let submission = wizard.submission(&state).map_err(|e| e.to_string());

            print_json(&serde_json::json!({
                "campaign_id": state.id,
                "fees": fees,
                "timeline": timeline,
                "steps": steps,
                "submission": submission,
            }))
        }
        Command::Conflicts {
            draft,
            directory,
            admin,
        } => {
            let wizard = CampaignWizard::new(&config);
            let state = wizard.restore_json(&read(&draft)?)?;
            let Some(criteria) = state.conflict_criteria() else {
                anyhow::bail!("draft needs a release date, genre and territory before checking conflicts");
            };

            let booked: Vec<ExistingCampaign> = serde_json::from_str(&read(&directory)?)
                .with_context(|| format!("parsing {}", directory.display()))?;
            let lookup = Arc::new(InMemoryCampaignDirectory::from_campaigns(booked));
            let detector = ConflictDetector::new(lookup, config.conflicts.clone());

            let report = detector
                .check(criteria)
                .await
                .into_report()
                .context("conflict check was superseded")?;
            let step = wizard.step_report(&state, WizardStep::Schedule, Some(&report), admin);
            info!(
                severity = ?report.severity,
                conflicts = report.conflicts.len(),
                can_proceed = step.can_proceed,
                "Conflict check complete"
            );
            print_json(&serde_json::json!({
                "report": report,
                "schedule_step": step,
            }))
        }
    }
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse a snake_case enum value such as `content_adaptation`.
fn parse_snake<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_lowercase()))
        .map_err(|_| format!("unrecognised value '{raw}'"))
}
