use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;

use storefront_tester::driver::grid::{find_preset, GridCredentials, GridTarget, PRESETS};
use storefront_tester::driver::traits::SessionFactory;
use storefront_tester::driver::web::{BrowserType, WebDriverConfig, WebSessionFactory};
use storefront_tester::utils::{config::Config, logger};
use storefront_tester::{report, runner};

#[derive(Parser)]
#[command(name = "storefront-tester")]
#[command(version = "0.1.0")]
#[command(about = "Data-driven UI tests for the demo storefront", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Launch a browser on this machine
    Local,
    /// Run on the BrowserStack grid
    Grid,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the test cases of one or more sheets
    Run {
        /// Directory of <sheet>.csv files, a single CSV file, or an .xlsx workbook
        #[arg(short, long, default_value = "./data")]
        data: PathBuf,

        /// Sheet(s) to run. Can be specified multiple times; all sheets if omitted.
        #[arg(short, long)]
        sheet: Vec<String>,

        /// Where the browsers run
        #[arg(short, long, value_enum, default_value = "local")]
        mode: Mode,

        /// Local browser (chromium, firefox, webkit)
        #[arg(short, long, default_value = "chromium")]
        browser: String,

        /// Grid preset name (see `presets`)
        #[arg(long, default_value = "chrome_latest_win")]
        preset: String,

        /// Grid build name shown in the dashboard
        #[arg(long, default_value = "storefront-tester")]
        build: String,

        /// Run the local browser headless
        #[arg(long, default_value = "false")]
        headless: bool,

        /// Output directory for results and screenshots
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Storefront URL, overrides STOREFRONT_BASE_URL
        #[arg(long)]
        base_url: Option<String>,

        /// Also write a debug-level log to this file
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// List grid browser presets
    Presets,

    /// Print the summary of a saved results.json
    Summary {
        /// Path to results.json
        results: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            data,
            sheet,
            mode,
            browser,
            preset,
            build,
            headless,
            output,
            base_url,
            log_file,
        } => {
            logger::init(log_file.as_deref())?;

            let mut config = Config::from_env()?;
            if let Some(url) = base_url {
                config.base_url = url;
            }

            let mut web_config = WebDriverConfig::default();
            web_config.headless |= headless;

            println!(
                "{} Running tests from: {}",
                "▶".green().bold(),
                data.display()
            );
            println!("  Base URL: {}", config.base_url.cyan());
            if !sheet.is_empty() {
                println!("  Sheets: {}", sheet.join(", ").cyan());
            }

            // Grid preset and credentials are validated before any case runs
            let factory: Box<dyn SessionFactory> = match mode {
                Mode::Local => {
                    web_config.browser_type = browser.parse::<BrowserType>()?;
                    println!("  Browser: {} (local)", browser.cyan());
                    Box::new(WebSessionFactory::local(web_config))
                }
                Mode::Grid => {
                    let preset = find_preset(&preset)?;
                    let credentials = GridCredentials::from_env()?;
                    let target = GridTarget::new(preset, credentials, &build)?;
                    println!(
                        "  Grid: {} {} on {} {}",
                        preset.browser.cyan(),
                        preset.browser_version,
                        preset.os,
                        preset.os_version
                    );
                    Box::new(WebSessionFactory::grid(web_config, target))
                }
            };
            println!("  Output: {}", output.display().to_string().cyan());

            let options = runner::RunOptions {
                data,
                sheets: sheet,
                output,
                config,
            };
            let results = runner::run_tests(options, factory.as_ref()).await?;

            if results.summary.has_failures() {
                std::process::exit(1);
            }
        }

        Commands::Presets => {
            println!("{} Grid presets:", "🌐".to_string().blue());
            for preset in PRESETS.iter() {
                let note = if preset.supports_cdp() {
                    String::new()
                } else {
                    " (not supported)".yellow().to_string()
                };
                println!(
                    "  {:<20} {} {} on {} {}{}",
                    preset.name.cyan(),
                    preset.browser,
                    preset.browser_version,
                    preset.os,
                    preset.os_version,
                    note
                );
            }
        }

        Commands::Summary { results } => {
            let saved = report::show_saved(&results)?;
            if saved.summary.has_failures() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
