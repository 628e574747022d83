use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ec2_price::aws::resolver_from_config;
use ec2_price::config::{init_config, PricingConfig};
use ec2_price::output::{render_json, render_table, PriceRow};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ec2-price")]
#[command(
    about = "Look up on-demand EC2 prices from the AWS Price List API",
    long_about = "ec2-price queries the AWS Price List API for the on-demand hourly USD price of\nLinux EC2 instance types.\n\nCredentials come from the config file or the usual AWS_* environment variables.\nWith assume_role enabled, the configured IAM role is assumed once before the\nfirst lookup."
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    output: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the on-demand hourly price of one or more instance types
    ///
    /// Examples:
    ///   ec2-price price m5.large
    ///   ec2-price price t3.micro c5.xlarge --region eu-west-1
    Price {
        /// EC2 instance types (e.g., m5.large, g4dn.xlarge)
        #[arg(value_name = "INSTANCE_TYPE", required = true)]
        instance_types: Vec<String>,

        #[command(flatten)]
        overrides: Overrides,
    },
    /// Initialize configuration file
    Init {
        /// Output path for config file
        #[arg(short = 'o', long = "path", default_value = ".ec2-price.toml")]
        path: PathBuf,
    },
}

/// Values that take precedence over the config file
#[derive(clap::Args)]
struct Overrides {
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    access_key_id: Option<String>,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: Option<String>,

    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    session_token: Option<String>,

    /// Region to price
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Custom endpoint for STS and Price List calls
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    endpoint: Option<String>,

    /// Assume this IAM role before the first lookup
    #[arg(long, env = "AWS_IAM_ROLE_ARN")]
    role_arn: Option<String>,

    /// Identifier embedded in the STS session name
    #[arg(long, env = "GITHUB_JOB")]
    job_id: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut PricingConfig) {
        if self.access_key_id.is_some() {
            config.access_key_id = self.access_key_id;
        }
        if self.secret_access_key.is_some() {
            config.secret_access_key = self.secret_access_key;
        }
        if self.session_token.is_some() {
            config.session_token = self.session_token;
        }
        if let Some(region) = self.region {
            config.region = region;
        }
        if self.endpoint.is_some() {
            config.endpoint = self.endpoint;
        }
        if let Some(role_arn) = self.role_arn {
            config.assume_role = true;
            config.iam_role_arn = Some(role_arn);
        }
        if let Some(job_id) = self.job_id {
            config.job_id = job_id;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Only warnings and errors unless --verbose
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = PricingConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Price {
            instance_types,
            overrides,
        } => {
            overrides.apply(&mut config);
            let resolver = resolver_from_config(&config).await?;

            let mut rows = Vec::with_capacity(instance_types.len());
            for instance_type in instance_types {
                let price_usd = resolver
                    .get_price_usd(&instance_type)
                    .await
                    .with_context(|| format!("Failed to price {}", instance_type))?;
                rows.push(PriceRow {
                    instance_type,
                    region: config.region.clone(),
                    price_usd,
                });
            }

            if cli.output == "json" {
                println!("{}", render_json(&rows)?);
            } else {
                println!("{}", render_table(&rows));
            }
        }
        Commands::Init { path } => {
            init_config(&path)?;
        }
    }

    Ok(())
}
