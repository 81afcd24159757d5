mod config;
mod contracts;
mod error;
mod project;
mod runner;
mod transport;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use eyre::WrapErr;

use crate::config::{KeychainManager, NetworkProfile, Settings};
use crate::contracts::{ArtifactStore, ContractResolver, DeploymentRegistry};
use crate::project::{Project, ProjectType};
use crate::runner::{
    DeploymentPlan, DeploymentRunner, FailurePolicy, InteractionRunner, InteractionScript,
};
use crate::transport::{RpcTransport, Transport};

#[derive(Parser, Debug)]
#[command(name = "campaign-deployer")]
#[command(about = "Deploy and drive donation-campaign contracts on Ethereum networks")]
#[command(version)]
struct Cli {
    /// Path to the contracts project
    #[arg(long, global = true, default_value = ".")]
    project: PathBuf,

    /// Skip project detection and force a specific project type
    #[arg(long, global = true, value_enum)]
    project_type: Option<ProjectType>,

    /// Network settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deploy the contracts of a deployment plan, in order
    Deploy {
        #[arg(long)]
        network: Option<String>,

        /// TOML deployment plan; defaults to Migrations, DonationCampaigns, DonationCampaignsTime
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Leave an artifact out of this run (repeatable)
        #[arg(long)]
        skip: Vec<String>,

        /// Do not ask for confirmation on signer-backed networks
        #[arg(long, short)]
        yes: bool,
    },

    /// Run an interaction script against deployed contracts
    Interact {
        #[arg(long)]
        network: Option<String>,

        #[arg(long)]
        script: PathBuf,

        /// Override the script's failure policy
        #[arg(long, value_enum)]
        policy: Option<FailurePolicy>,
    },

    /// List the accounts available on a network
    Accounts {
        #[arg(long)]
        network: Option<String>,
    },

    /// Show the resolved network profiles
    Networks,

    /// Manage secrets in the OS keychain
    Secret {
        #[command(subcommand)]
        action: SecretCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SecretCommand {
    /// Store a secret (prompted, never echoed); reference it as `keychain:<entry>`
    Set { entry: String },
    Delete { entry: String },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false))
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .init();
    }

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    let default_network = settings.default_network();

    match cli.command {
        Command::Deploy {
            network,
            plan,
            skip,
            yes,
        } => {
            let profile = settings.resolve(network.as_deref().unwrap_or(default_network))?;
            let project = open_project(&cli.project, cli.project_type)?;
            deploy(project, &profile, plan.as_deref(), &skip, yes).await
        }
        Command::Interact {
            network,
            script,
            policy,
        } => {
            let profile = settings.resolve(network.as_deref().unwrap_or(default_network))?;
            let project = open_project(&cli.project, cli.project_type)?;
            interact(project, &profile, &script, policy).await
        }
        Command::Accounts { network } => {
            let profile = settings.resolve(network.as_deref().unwrap_or(default_network))?;
            let transport = RpcTransport::connect(&profile).await?;
            for (index, account) in transport.accounts().await?.iter().enumerate() {
                println!("[{}] {}", index, account);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Networks => {
            for profile in settings.profiles()? {
                print_profile(&profile);
            }
            if let Some(path) = settings.config_path() {
                println!("\nOverrides loaded from {}", path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Secret { action } => {
            manage_secret(action)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn open_project(path: &Path, project_type: Option<ProjectType>) -> Result<Project> {
    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    project::load(&path, project_type)
}

async fn deploy(
    project: Project,
    profile: &NetworkProfile,
    plan: Option<&Path>,
    skip: &[String],
    yes: bool,
) -> Result<ExitCode> {
    let plan = match plan {
        Some(path) => DeploymentPlan::load(path)?,
        None => DeploymentPlan::default(),
    };
    let steps = plan.steps(profile.default_gas(), skip)?;

    if steps.is_empty() {
        tracing::warn!("Nothing to deploy: every step was skipped");
        return Ok(ExitCode::SUCCESS);
    }

    if profile.is_remote() && !yes {
        let names: Vec<&str> = steps.iter().map(|s| s.artifact.as_str()).collect();
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!("Deploy {} to '{}'?", names.join(", "), profile.name))
            .default(false)
            .interact()?;
        if !confirmed {
            tracing::info!("Deployment cancelled");
            return Ok(ExitCode::SUCCESS);
        }
    }

    let transport = RpcTransport::connect(profile).await?;
    let registry = DeploymentRegistry::load(&project.deployments_dir, profile.name.as_str())?;
    let resolver = ContractResolver::new(&transport, ArtifactStore::new(project), registry);

    let mut runner = DeploymentRunner::new(resolver, plan.defaults.from);
    let deployed = runner.run(&steps).await?;

    for instance in &deployed {
        println!("{:<24} {}  (tx {})", instance.artifact, instance.address, instance.tx_hash);
    }
    Ok(ExitCode::SUCCESS)
}

async fn interact(
    project: Project,
    profile: &NetworkProfile,
    script_path: &Path,
    policy: Option<FailurePolicy>,
) -> Result<ExitCode> {
    let script = InteractionScript::load(script_path)?;
    let actions = script
        .actions()
        .wrap_err_with(|| format!("Invalid interaction script {:?}", script_path))?;
    let policy = policy.or(script.policy).unwrap_or_default();

    let transport = RpcTransport::connect(profile).await?;
    let registry = DeploymentRegistry::load(&project.deployments_dir, profile.name.as_str())?;
    let resolver = ContractResolver::new(&transport, ArtifactStore::new(project), registry);

    let report = InteractionRunner::new(&resolver, profile.default_gas(), policy)
        .run(&actions)
        .await;

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(events) => println!(
                "[{}] ok      {} ({} event(s))",
                outcome.index + 1,
                outcome.label,
                events.len()
            ),
            Err(e) => println!("[{}] failed  {}: {}", outcome.index + 1, outcome.label, e),
        }
    }

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!(
            failed = report.failures(),
            total = actions.len(),
            halted = report.halted,
            "Interaction run finished with failures"
        );
        Ok(ExitCode::FAILURE)
    }
}

fn print_profile(profile: &NetworkProfile) {
    println!("{}", profile.name);
    println!("  endpoint  {}:{}", profile.host, profile.port);
    println!("  chain id  {}", profile.chain_id);
    let gas = profile.default_gas();
    println!("  gas       {} @ {} wei", gas.gas_limit(), gas.gas_price());
    if let Some(signer) = &profile.signer {
        println!(
            "  signer    mnemonic {}, url {}, {} account(s)",
            signer.mnemonic, signer.rpc_url, signer.accounts
        );
    }
}

fn manage_secret(action: SecretCommand) -> Result<()> {
    let keychain = KeychainManager::new();

    match action {
        SecretCommand::Set { entry } => {
            let value = zeroize::Zeroizing::new(
                dialoguer::Password::new()
                    .with_prompt(format!("Value for '{}'", entry))
                    .with_confirmation("Confirm value", "Values do not match")
                    .interact()?,
            );
            if value.trim().is_empty() {
                eyre::bail!("Secret cannot be empty");
            }
            keychain.set(&entry, value.trim())?;
            println!("Stored. Reference it in networks.toml as \"keychain:{}\"", entry);
        }
        SecretCommand::Delete { entry } => keychain.delete(&entry)?,
    }

    Ok(())
}
