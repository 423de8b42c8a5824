//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use coursewise_catalog::Catalog;
use coursewise_core::{
    ProgressReporter, Session, UserDirectory, VerifyLinksConfig, VerifyLinksResult,
    verify_catalog_links,
};
use coursewise_shared::{AppConfig, ScrapeResult, init_config, init_config_at, load_config, load_config_from};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::chat;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Coursewise — course recommendations for finance professionals.
#[derive(Parser)]
#[command(
    name = "coursewise",
    version,
    about = "Chat about a training catalog and verify its course links.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.coursewise/coursewise.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Credentials for commands that need a logged-in session.
#[derive(Args, Debug, Clone)]
pub(crate) struct LoginArgs {
    /// Account name.
    #[arg(long, env = "COURSEWISE_USERNAME")]
    pub username: Option<String>,

    /// Account password.
    #[arg(long, env = "COURSEWISE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Check every course URL in a table and record its title and a snippet (admin only).
    Verify {
        /// Table with a `URL` column (defaults to `[defaults].catalog_path`).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Where to write `URL,title,snippet` (defaults to `[defaults].scraped_path`).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print results without writing the output table.
        #[arg(long)]
        no_save: bool,

        /// Pages navigating in parallel.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Per-URL navigation timeout in seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,

        #[command(flatten)]
        login: LoginArgs,
    },

    /// Interactive course-recommendation chat.
    Chat {
        /// Catalog table (defaults to `[defaults].catalog_path`).
        #[arg(long)]
        catalog: Option<PathBuf>,

        #[command(flatten)]
        login: LoginArgs,
    },

    /// Ask a single question and print the reply.
    Ask {
        /// The question.
        text: String,

        /// Catalog table (defaults to `[defaults].catalog_path`).
        #[arg(long)]
        catalog: Option<PathBuf>,

        #[command(flatten)]
        login: LoginArgs,
    },

    /// Print the competencies and their courses.
    Catalog {
        /// Catalog table (defaults to `[defaults].catalog_path`).
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "coursewise=info",
        1 => "coursewise=debug",
        _ => "coursewise=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Verify {
            input,
            output,
            no_save,
            concurrency,
            timeout_secs,
            login,
        } => {
            let config = load_app_config(config_path.as_deref())?;
            let mut verify = VerifyLinksConfig::from_app_config(&config);
            if let Some(input) = input {
                verify.input_path = input;
            }
            if let Some(output) = output {
                verify.output_path = Some(output);
            }
            if no_save {
                verify.output_path = None;
            }
            if let Some(n) = concurrency {
                verify.verifier.concurrency = n.max(1);
            }
            if let Some(secs) = timeout_secs {
                verify.verifier.timeout = std::time::Duration::from_secs(secs);
            }
            cmd_verify(&config, &verify, &login).await
        }
        Command::Chat { catalog, login } => {
            let config = load_app_config(config_path.as_deref())?;
            chat::cmd_chat(&config, catalog.as_deref(), &login).await
        }
        Command::Ask {
            text,
            catalog,
            login,
        } => {
            let config = load_app_config(config_path.as_deref())?;
            chat::cmd_ask(&config, catalog.as_deref(), &login, &text).await
        }
        Command::Catalog { path } => {
            let config = load_app_config(config_path.as_deref())?;
            cmd_catalog(&config, path.as_deref())
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path.as_deref()),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

/// Config from `--config` if given, otherwise the default location.
fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

/// Log a new session in with the credentials from flags or environment.
pub(crate) fn login(config: &AppConfig, args: &LoginArgs) -> Result<Session> {
    let (Some(username), Some(password)) = (args.username.as_deref(), args.password.as_deref())
    else {
        return Err(eyre!(
            "login required: pass --username/--password or set COURSEWISE_USERNAME/COURSEWISE_PASSWORD"
        ));
    };

    let directory = UserDirectory::from_config(&config.users)?;
    let mut session = Session::new();
    let role = session.login(&directory, username, password)?;
    info!(username, %role, "session started");
    Ok(session)
}

/// Path of the catalog table: the flag if given, else `[defaults].catalog_path`.
pub(crate) fn catalog_path(config: &AppConfig, flag: Option<&Path>) -> PathBuf {
    flag.map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.defaults.catalog_path))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_verify(config: &AppConfig, verify: &VerifyLinksConfig, args: &LoginArgs) -> Result<()> {
    let session = login(config, args)?;

    info!(
        input = %verify.input_path.display(),
        concurrency = verify.verifier.concurrency,
        "verifying catalog links"
    );

    let reporter = CliProgress::new();
    let result = verify_catalog_links(verify, &session, &reporter).await?;

    println!();
    print_scrape_table(&result.results);
    println!();
    println!("  Links checked: {}", result.results.len());
    println!("  OK:            {}", result.ok);
    println!("  Failed:        {}", result.failed);
    if let Some(path) = &result.output_path {
        println!("  Saved to:      {}", path.display());
    }
    println!("  Started:       {}", result.started_at.to_rfc3339());
    println!("  Time:          {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_catalog(config: &AppConfig, path: Option<&Path>) -> Result<()> {
    let path = catalog_path(config, path);
    let catalog = Catalog::load(&path)?;

    println!();
    println!("  {} courses in {} competencies", catalog.len(), catalog.competencies().len());
    for (competency, titles) in catalog.competencies().iter() {
        println!();
        println!("  {competency}");
        for title in titles {
            println!("    - {title}");
        }
    }
    println!();

    Ok(())
}

fn cmd_config_init(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(path) => {
            init_config_at(path)?;
            path.to_path_buf()
        }
        None => init_config()?,
    };
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = load_app_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

const URL_WIDTH: usize = 48;
const TITLE_WIDTH: usize = 32;
const SNIPPET_WIDTH: usize = 60;

fn print_scrape_table(results: &[ScrapeResult]) {
    println!(
        "  {:<URL_WIDTH$}  {:<TITLE_WIDTH$}  {}",
        "URL", "Title", "Snippet"
    );
    println!(
        "  {}  {}  {}",
        "-".repeat(URL_WIDTH),
        "-".repeat(TITLE_WIDTH),
        "-".repeat(SNIPPET_WIDTH)
    );
    for r in results {
        println!(
            "  {:<URL_WIDTH$}  {:<TITLE_WIDTH$}  {}",
            clip(&r.url, URL_WIDTH),
            clip(&r.title, TITLE_WIDTH),
            clip(&r.snippet, SNIPPET_WIDTH)
        );
    }
}

/// Shorten `text` to at most `width` characters, marking the cut with `…`.
pub(crate) fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter: a bar with `Progress: NN%` beside it.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.set_message("Progress: 0%");
        Self { bar }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.bar.set_prefix(name.to_string());
    }

    fn progress(&self, fraction: f64) {
        let percent = (fraction.clamp(0.0, 1.0) * 100.0).round() as u64;
        self.bar.set_position(percent);
        self.bar.set_message(format!("Progress: {percent}%"));
    }

    fn done(&self, _result: &VerifyLinksResult) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_keeps_short_text() {
        assert_eq!(clip("Example Domain", 32), "Example Domain");
    }

    #[test]
    fn clip_marks_cut() {
        let clipped = clip("https://courses.example.com/very/long/path", 20);
        assert_eq!(clipped.chars().count(), 20);
        assert!(clipped.ends_with('…'));
    }

    #[test]
    fn verify_flags_parse() {
        let cli = Cli::try_parse_from([
            "coursewise",
            "verify",
            "--no-save",
            "--concurrency",
            "4",
            "--username",
            "admin",
            "--password",
            "pw",
        ])
        .unwrap();
        match cli.command {
            Command::Verify {
                no_save,
                concurrency,
                login,
                ..
            } => {
                assert!(no_save);
                assert_eq!(concurrency, Some(4));
                assert_eq!(login.username.as_deref(), Some("admin"));
            }
            _ => panic!("expected verify"),
        }
    }

    #[test]
    fn login_without_credentials_is_refused() {
        let args = LoginArgs {
            username: None,
            password: None,
        };
        let err = login(&AppConfig::default(), &args).unwrap_err();
        assert!(err.to_string().contains("login required"));
    }
}
