use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use freshservice_report::config::{ApiKey, DEFAULT_IP_FIELD, DEFAULT_OS_FIELD, ServiceConfig};
use freshservice_report::export::{self, ExportOptions};
use freshservice_report::io::console;
use freshservice_report::lookup::{self, FullName};
use freshservice_report::model::UNKNOWN;
use freshservice_report::pipeline::{
    Attribute, AttributeSet, COMPONENT_ALIASES, ComponentFilter, EnrichmentRequest,
};
use freshservice_report::source::HttpAssetSource;
use freshservice_report::throttle::ThrottlePolicy;
use freshservice_report::{ReportError, Result};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging().and_then(|()| run(cli)) {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|error| ReportError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.service.into_config()?;
    match cli.command {
        Command::Assets(args) => execute_assets(config, args),
        Command::User(args) => execute_user(config, args),
    }
}

fn execute_assets(config: ServiceConfig, args: AssetsArgs) -> Result<()> {
    let verbose = args.verbose;
    let options = args.into_options();
    let source = HttpAssetSource::new(config)?;
    let outcome = export::run_export(&source, &options)?;

    let Some(table) = outcome.table else {
        println!("{}", "No data was obtained.".red());
        return Ok(());
    };

    if let Some(path) = &outcome.written {
        println!("{}", format!("Data saved to {}", path.display()).green());
    }
    if verbose {
        println!("{}", "Data obtained:".cyan());
        println!("{}", console::render_table(&table));
    }
    Ok(())
}

fn execute_user(config: ServiceConfig, args: UserArgs) -> Result<()> {
    let name = FullName::parse(&args.search_name)?;
    let source = HttpAssetSource::new(config)?;

    let Some(found) = lookup::find_user_assets(&source, &name) else {
        println!(
            "{}",
            format!(
                "No user found with first name '{}' and last name '{}'.",
                name.first_name, name.last_name
            )
            .yellow()
        );
        return Ok(());
    };

    let or_unknown = |value: Option<&str>| value.unwrap_or(UNKNOWN).to_string();
    let requester = &found.requester;
    println!("{}", "User found:".green());
    println!("  First name: {}", or_unknown(requester.first_name.as_deref()));
    println!("  Last name: {}", or_unknown(requester.last_name.as_deref()));
    println!(
        "  User ID: {}",
        requester
            .id
            .map_or_else(|| UNKNOWN.to_string(), |id| id.to_string())
    );

    if found.assets.is_empty() {
        println!("{}", "No assets are assigned to this user.".yellow());
        return Ok(());
    }

    println!("{}", "Assets assigned to the user:".cyan());
    for asset in &found.assets {
        println!("  - Asset name: {}", or_unknown(asset.name.as_deref()));
        println!(
            "    Display ID: {}",
            asset
                .display_id
                .map_or_else(|| UNKNOWN.to_string(), |id| id.to_string())
        );
    }
    Ok(())
}

fn component_help() -> String {
    let aliases: Vec<String> = COMPONENT_ALIASES
        .iter()
        .map(|(alias, full)| format!("{alias} = {full}"))
        .collect();
    format!(
        "Component types to include; known aliases: {}. Give the flag without values to include every type.",
        aliases.join(", ")
    )
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Report on Freshservice assets, their components and assigned users."
)]
struct Cli {
    #[command(flatten)]
    service: ServiceArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export asset data and components to a spreadsheet or the console.
    #[command(
        after_help = "Example: freshservice-report assets -i 143-150 -e 145,147 -c cpu ram -o output.xlsx -v false -d -t -l -u -s -n"
    )]
    Assets(AssetsArgs),
    /// Look up a user by full name and list the assets assigned to them.
    User(UserArgs),
}

#[derive(clap::Args)]
struct ServiceArgs {
    /// Account subdomain, as in https://<domain>.freshservice.com.
    #[arg(long, env = "FRESHSERVICE_DOMAIN", global = true)]
    domain: Option<String>,

    /// Full API root; takes precedence over --domain.
    #[arg(long, env = "FRESHSERVICE_BASE_URL", global = true)]
    base_url: Option<String>,

    /// API key used for basic authentication.
    #[arg(long, env = "FRESHSERVICE_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Seconds to wait after the service reports a rate limit.
    #[arg(long, default_value_t = 60, global = true)]
    throttle_delay_secs: u64,

    /// Give up after this many rate-limit retries instead of waiting forever.
    #[arg(long, global = true)]
    max_throttle_retries: Option<u32>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30, global = true)]
    timeout_secs: u64,

    /// Asset type field holding the operating system.
    #[arg(long, env = "FRESHSERVICE_OS_FIELD", default_value = DEFAULT_OS_FIELD, global = true)]
    os_field: String,

    /// Asset type field holding the IP address.
    #[arg(long, env = "FRESHSERVICE_IP_FIELD", default_value = DEFAULT_IP_FIELD, global = true)]
    ip_field: String,
}

impl ServiceArgs {
    fn into_config(self) -> Result<ServiceConfig> {
        let api_key = self.api_key.map(ApiKey::new).ok_or_else(|| {
            ReportError::Config("missing API key (--api-key or FRESHSERVICE_API_KEY)".into())
        })?;

        let mut config = match (self.base_url, self.domain) {
            (Some(base_url), _) => ServiceConfig::with_base_url(&base_url, api_key)?,
            (None, Some(domain)) => ServiceConfig::for_domain(&domain, api_key)?,
            (None, None) => {
                return Err(ReportError::Config(
                    "missing service location (--domain or --base-url)".into(),
                ));
            }
        };

        config.throttle = ThrottlePolicy {
            delay: Duration::from_secs(self.throttle_delay_secs),
            max_retries: self.max_throttle_retries,
        };
        config.timeout = Duration::from_secs(self.timeout_secs);
        config.os_field = self.os_field;
        config.ip_field = self.ip_field;
        Ok(config)
    }
}

#[derive(clap::Args)]
struct AssetsArgs {
    /// Asset IDs separated by commas, ranges such as 143-150, or a file holding them.
    #[arg(short, long)]
    ids: String,

    /// Asset IDs to exclude, in the same format.
    #[arg(short, long)]
    exclude: Option<String>,

    #[arg(short, long, num_args = 0.., value_name = "TYPE", help = component_help())]
    components: Option<Vec<String>>,

    /// Spreadsheet to write; `.xlsx` is appended when no extension is given.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the table on the console (true or false).
    #[arg(short, long, default_value_t = true, action = ArgAction::Set)]
    verbose: bool,

    /// Include every optional field (department, type, location, user, OS and IP).
    #[arg(short = 'a', long)]
    asset_data: bool,

    /// Include the department name.
    #[arg(short, long)]
    departments: bool,

    /// Include the asset type name.
    #[arg(short = 't', long)]
    asset_type: bool,

    /// Include the location name.
    #[arg(short, long)]
    location: bool,

    /// Include the assigned user's name and email.
    #[arg(short, long)]
    user: bool,

    /// Include the machine's operating system.
    #[arg(short, long)]
    system_os: bool,

    /// Include the machine's IP address.
    #[arg(short = 'n', long)]
    machine_ip: bool,
}

impl AssetsArgs {
    fn attributes(&self) -> AttributeSet {
        [
            (self.asset_data, Attribute::AssetData),
            (self.departments, Attribute::Department),
            (self.asset_type, Attribute::AssetType),
            (self.location, Attribute::Location),
            (self.user, Attribute::User),
            (self.system_os, Attribute::SystemOs),
            (self.machine_ip, Attribute::MachineIp),
        ]
        .into_iter()
        .filter_map(|(enabled, attribute)| enabled.then_some(attribute))
        .collect()
    }

    fn into_options(self) -> ExportOptions {
        let attributes = self.attributes();
        let components = self.components.map(ComponentFilter::from_aliases);
        ExportOptions {
            ids: self.ids,
            exclude: self.exclude,
            request: EnrichmentRequest::new(attributes, components),
            output: self.output,
        }
    }
}

#[derive(clap::Args)]
struct UserArgs {
    /// Full name of the user, for example: Jane Doe.
    #[arg(short = 'n', long, num_args = 1.., required = true)]
    search_name: Vec<String>,
}
