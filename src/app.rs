use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::gateway::DEFAULT_API_URL;
use crate::modal::{DetailOutcome, DEFAULT_REOPEN_DELAY};
use crate::orchestrator::{
    FetchOutcome, LoadMore, Storefront, StorefrontOptions, Submission, DEFAULT_PAGE_SIZE,
};
use crate::output::{self, OutputFormat};
use crate::render::{CurrencyFormat, Labels, RenderOptions};

const DEFAULT_TIMEOUT_SECS: u64 = 10;

fn print_banner() {
    eprintln!(
        ":: {} v{} ::",
        "storefront".bold(),
        env!("CARGO_PKG_VERSION")
    );
}

fn format_kv_line(label: &str, value: &str) {
    eprintln!(":: {:<10}: {}", label, value);
}

const HELP_FLAG_WIDTH: usize = 34;

/// `-q, --q, --query <TEXT>` for one argument.
fn flag_label(arg: &clap::Arg) -> String {
    let mut names: Vec<String> = arg.get_short().map(|c| format!("-{c}")).into_iter().collect();
    let longs = arg
        .get_long()
        .into_iter()
        .chain(arg.get_visible_aliases().unwrap_or_default());
    for long in longs {
        let name = format!("--{long}");
        if !names.contains(&name) {
            names.push(name);
        }
    }
    let mut label = names.join(", ");
    if arg.get_action().takes_values() {
        let value = arg
            .get_value_names()
            .and_then(|names| names.first())
            .map(|name| name.as_str())
            .unwrap_or("VALUE");
        label.push_str(&format!(" <{value}>"));
    }
    label
}

/// Help grouped by `help_heading`, in declaration order, one line per flag.
fn render_custom_help() -> String {
    let cmd = CliArgs::command();
    let mut out = format!(
        "{} {}\n{}\n\nUsage: {} [OPTIONS]\n",
        cmd.get_name(),
        cmd.get_version().unwrap_or(""),
        cmd.get_about().map(|a| a.to_string()).unwrap_or_default(),
        cmd.get_name(),
    );

    let mut sections: Vec<(&str, Vec<String>)> = Vec::new();
    for arg in cmd.get_arguments().filter(|a| !a.is_hide_set()) {
        let heading = arg.get_help_heading().unwrap_or("Options");
        let help = arg.get_help().map(|h| h.to_string()).unwrap_or_default();
        let line = format!("  {:<width$} {}", flag_label(arg), help.trim(), width = HELP_FLAG_WIDTH);
        match sections.iter_mut().find(|(h, _)| *h == heading) {
            Some((_, lines)) => lines.push(line),
            None => sections.push((heading, vec![line])),
        }
    }
    for (heading, lines) in sections {
        out.push_str(&format!("\n{heading}:\n"));
        for line in lines {
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }

    if let Some(long_about) = cmd.get_long_about() {
        out.push('\n');
        out.push_str(&long_about.to_string());
        out.push('\n');
    }
    out
}

#[derive(Clone, Debug)]
struct RunConfig {
    api_url: String,
    timeout: u64,
    page_size: u32,
    keyword_size: u32,
    reopen_delay: Duration,
    currency: CurrencyFormat,
    labels: Labels,
    no_color: bool,
    output: Option<String>,
    output_format: OutputFormat,
    query: Option<String>,
    category: Option<String>,
    pages: Option<u32>,
    detail: Option<String>,
    list_categories: bool,
}

fn resolve_output_format(
    explicit: Option<&str>,
    output_path: Option<&str>,
) -> Result<OutputFormat, String> {
    if let Some(raw) = explicit {
        return OutputFormat::parse(raw)
            .ok_or_else(|| format!("invalid --output-format '{raw}', expected text, json or html"));
    }
    Ok(output_path
        .and_then(output::infer_format_from_path)
        .unwrap_or(OutputFormat::Text))
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let api_url = args
        .api_url
        .or(cfg.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    validation::validate_api_url(&api_url)?;

    let timeout = args.timeout.or(cfg.timeout).unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout == 0 {
        return Err("invalid timeout, expected positive integer".to_string());
    }
    let page_size = args.page_size.or(cfg.page_size).unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size == 0 {
        return Err("invalid page_size, expected positive integer".to_string());
    }
    let keyword_size = cfg.keyword_size.unwrap_or(page_size);
    if keyword_size == 0 {
        return Err("invalid keyword_size, expected positive integer".to_string());
    }
    let reopen_delay = cfg
        .reopen_delay_ms
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_REOPEN_DELAY);

    let output = args.output.or(cfg.output).map(|p| {
        config::expand_tilde(&p).to_string_lossy().to_string()
    });
    let output_format = resolve_output_format(
        args.output_format.as_deref().or(cfg.output_format.as_deref()),
        output.as_deref(),
    )?;

    Ok(RunConfig {
        api_url,
        timeout,
        page_size,
        keyword_size,
        reopen_delay,
        currency: cfg.currency.unwrap_or_default(),
        labels: cfg.labels.unwrap_or_default(),
        no_color: args.no_color || cfg.no_color.unwrap_or(false),
        output,
        output_format,
        query: args.query,
        category: args.category,
        pages: args.pages,
        detail: args.detail,
        list_categories: args.list_categories,
    })
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn new_spinner() -> Result<ProgressBar, String> {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_style(
        ProgressStyle::with_template(":: {spinner} [{elapsed_precise}] :: {msg}")
            .map_err(|e| format!("failed to build progress style: {e}"))?,
    );
    Ok(pb)
}

fn describe_fetch(outcome: &FetchOutcome) -> String {
    match outcome {
        FetchOutcome::Rendered { cards } => format!("{cards} cards").green().to_string(),
        FetchOutcome::Failed(e) => e.to_string().red().to_string(),
        FetchOutcome::Stale => "superseded".yellow().to_string(),
    }
}

fn describe_detail(outcome: &DetailOutcome) -> String {
    match outcome {
        DetailOutcome::Loaded { recommendations } => {
            format!("{recommendations} recommendations").green().to_string()
        }
        DetailOutcome::Failed(e) => e.to_string().red().to_string(),
        DetailOutcome::Stale => "superseded".yellow().to_string(),
    }
}

async fn write_page(run: &RunConfig, rendered: &[u8]) -> Result<(), String> {
    match run.output.as_deref() {
        Some(path) => {
            let mut outfile = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
                .await
                .map_err(|e| format!("failed to open output file: {e}"))?;
            outfile
                .write_all(rendered)
                .await
                .map_err(|e| format!("failed to write output file: {e}"))?;
            format_kv_line("Output", path);
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(rendered)
                .await
                .map_err(|e| format!("failed to write page: {e}"))?;
            stdout
                .flush()
                .await
                .map_err(|e| format!("failed to write page: {e}"))?;
        }
    }
    Ok(())
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }
    print_banner();

    let options = StorefrontOptions {
        page_size: run.page_size,
        keyword_size: run.keyword_size,
        reopen_delay: run.reopen_delay,
        render: RenderOptions {
            currency: run.currency.clone(),
            labels: run.labels.clone(),
        },
    };
    let store = Storefront::connect(&run.api_url, Duration::from_secs(run.timeout), options)
        .map_err(|e| format!("failed to build storefront: {e}"))?;

    format_kv_line("Backend", &run.api_url);
    format_kv_line("Page size", &run.page_size.to_string());
    format_kv_line("Timeout", &format!("{}s", run.timeout));

    if run.list_categories {
        let count = store.refresh_categories().await;
        format_kv_line("Categories", &count.to_string());
        for category in store.snapshot().await.categories {
            println!("{category}");
        }
        return Ok(());
    }

    let now = Instant::now();
    let spinner = new_spinner()?;

    spinner.set_message("loading products");
    let home = store.start().await;
    spinner.suspend(|| format_kv_line("Products", &describe_fetch(&home)));

    if run.query.is_some() || run.category.is_some() {
        spinner.set_message("searching");
        let query = run.query.clone().unwrap_or_default();
        let category = run.category.clone().unwrap_or_default();
        match store.search(&query, &category).await {
            Submission::Search { keyword, semantic } => spinner.suspend(|| {
                format_kv_line("Keyword", &describe_fetch(&keyword));
                format_kv_line("Semantic", &describe_fetch(&semantic));
            }),
            Submission::Category(outcome) => {
                spinner.suspend(|| format_kv_line("Category", &describe_fetch(&outcome)))
            }
            Submission::Home(outcome) => {
                spinner.suspend(|| format_kv_line("Products", &describe_fetch(&outcome)))
            }
        }
    }

    if let Some(pages) = run.pages {
        loop {
            let current = store.snapshot().await.state.current_page;
            if current >= pages {
                break;
            }
            spinner.set_message(format!("loading page {}", current + 1));
            match store.load_more().await {
                LoadMore::Loaded { page, cards } => {
                    debug!(page, cards, "page appended");
                }
                LoadMore::Exhausted => {
                    spinner.suspend(|| format_kv_line("Pages", "no more results"));
                    break;
                }
                LoadMore::Failed(e) => {
                    spinner.suspend(|| format_kv_line("Pages", &e.to_string().red().to_string()));
                    break;
                }
                LoadMore::Busy | LoadMore::Stale => break,
            }
        }
    }

    if let Some(doc_id) = run.detail.as_deref() {
        spinner.set_message("loading details");
        let outcome = store.open_detail(doc_id).await;
        spinner.suspend(|| format_kv_line("Detail", &describe_detail(&outcome)));
    }

    spinner.finish_and_clear();

    let view = store.snapshot().await;
    let rendered = output::render(&view, run.output_format);
    write_page(&run, &rendered).await?;

    eprintln!(
        ":: Completed :: page {} :: took {}ms ::",
        view.state.current_page,
        now.elapsed().as_millis()
    );
    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                print!("{}", render_custom_help());
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    let user_config_path = args.config.clone().map(|p| config::expand_tilde(&p));
    let config_path = user_config_path
        .clone()
        .or_else(config::default_config_path);

    if args.init_config {
        let path = config_path.ok_or_else(|| "could not determine config path".to_string())?;
        config::ensure_default_config_file(&path)?;
        println!("{}", path.display());
        return Ok(());
    }

    let cfg = match config_path.as_ref() {
        Some(path) => config::load_config(path, user_config_path.is_none())?,
        None => ConfigFile::default(),
    };

    init_tracing(args.verbose);
    let run = build_run_config(args, cfg)?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}
