use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "storefront",
    version,
    about = "headless storefront client",
    long_about = "Storefront drives the product catalog front end against a catalog backend: listing, keyword and semantic search, pagination and product details.\n\nExamples:\n  storefront --api-url http://localhost:8000\n  storefront -q \"rice cooker\" -k Kitchen -p 2\n  storefront -d 65f1c0ffee -f html -o page.html\n\nTip: Use --config to persist the backend URL and display settings."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'n',
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write the page to a file."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'f',
        long = "of",
        visible_aliases = ["format", "output-format"],
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Page format (text, json, html)."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Config",
        help = "Path to config file (defaults to ~/.storefront/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "ic",
        visible_alias = "init-config",
        help_heading = "Config",
        help = "Write a commented default config file and exit."
    )]
    pub init_config: bool,

    #[arg(
        short = 'u',
        long = "api",
        visible_alias = "api-url",
        value_name = "URL",
        help_heading = "Backend",
        help = "Catalog backend base URL."
    )]
    pub api_url: Option<String>,

    #[arg(
        short = 'T',
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "Backend",
        help = "Per-request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 's',
        long = "ps",
        visible_alias = "page-size",
        value_name = "N",
        help_heading = "Backend",
        help = "Products per page."
    )]
    pub page_size: Option<u32>,

    #[arg(
        short = 'q',
        long = "q",
        visible_alias = "query",
        value_name = "TEXT",
        help_heading = "Actions",
        help = "Search text (runs keyword and semantic search)."
    )]
    pub query: Option<String>,

    #[arg(
        short = 'k',
        long = "cat",
        visible_alias = "category",
        value_name = "NAME",
        help_heading = "Actions",
        help = "Category filter."
    )]
    pub category: Option<String>,

    #[arg(
        short = 'p',
        long = "pg",
        visible_alias = "pages",
        value_name = "N",
        help_heading = "Actions",
        help = "Load more until N pages are shown."
    )]
    pub pages: Option<u32>,

    #[arg(
        short = 'd',
        long = "dt",
        visible_alias = "detail",
        value_name = "DOC_ID",
        help_heading = "Actions",
        help = "Open the detail overlay for a document id."
    )]
    pub detail: Option<String>,

    #[arg(
        long = "lc",
        visible_alias = "categories",
        help_heading = "Actions",
        help = "Print the category list and exit."
    )]
    pub list_categories: bool,
}
