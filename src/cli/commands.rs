use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Addon discovery and dependency queries for module repositories
#[derive(Parser, Debug)]
#[command(
    name = "addonscan",
    about = "Addon discovery and dependency queries for module repositories",
    version,
    long_about = "addonscan finds installable modules in a repository tree, resolves their \
                  dependencies and computes the module selections a CI pipeline installs \
                  or tests."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "List addon roots or selected module names",
        long_about = "Without -m, prints every directory under PATH that directly holds modules. \
                      With -m, prints the names of the modules found in each PATH, narrowed by \
                      the application and localization filters.\n\n\
                      Examples:\n  \
                      addonscan addons .\n  \
                      addonscan addons -m --only-applications -e web_tour addons\n  \
                      addonscan addons -m --exclude-localization --format lines addons"
    )]
    Addons(AddonsArgs),

    #[command(
        about = "Show the dependency closure of a module",
        long_about = "Prints the module plus everything it transitively depends on, or with \
                      --reverse everything that transitively depends on it.\n\n\
                      Examples:\n  \
                      addonscan deps addons sale\n  \
                      addonscan deps --reverse addons base"
    )]
    Deps(DepsArgs),

    #[command(
        about = "List module paths changed relative to a git reference",
        long_about = "Runs git diff-index against REF in the repository at PATH and prints the \
                      paths of the modules whose directories contain changes. The reference is \
                      not fetched. With --files the given paths are used instead of git.\n\n\
                      Examples:\n  \
                      addonscan changed .\n  \
                      addonscan changed --ref origin/16.0 .\n  \
                      addonscan changed --files sale/models.py,README.md addons"
    )]
    Changed(ChangedArgs),

    #[command(
        about = "Show descriptor versions of the named modules",
        long_about = "Examples:\n  \
                      addonscan versions -m sale,stock addons"
    )]
    Versions(VersionsArgs),
}

#[derive(Parser, Debug, Clone)]
#[command(group(ArgGroup::new("applications").args(["only_applications", "exclude_applications"])))]
#[command(group(ArgGroup::new("localization").args(["only_localization", "exclude_localization"])))]
pub struct AddonsArgs {
    #[arg(value_name = "PATH", required = true, help = "Repository or addons directories")]
    pub paths: Vec<PathBuf>,

    #[arg(short = 'm', long = "modules", help = "List module names instead of addon roots")]
    pub list_modules: bool,

    #[arg(
        short = 'e',
        long = "exclude",
        value_name = "NAMES",
        value_delimiter = ',',
        help = "Comma-separated names removed from the result"
    )]
    pub exclude: Vec<String>,

    #[arg(long, help = "Only applications and their dependencies")]
    pub only_applications: bool,

    #[arg(long, help = "Drop applications and their dependencies")]
    pub exclude_applications: bool,

    #[arg(long, help = "Only localization modules and their dependents")]
    pub only_localization: bool,

    #[arg(long, help = "Drop localization modules and their dependents")]
    pub exclude_localization: bool,

    #[arg(
        long,
        value_name = "N",
        allow_negative_numbers = true,
        help = "Directory levels to search (defaults to ADDONSCAN_DEPTH with -m, ADDONSCAN_ADDONS_DEPTH otherwise)"
    )]
    pub depth: Option<i64>,

    #[arg(short = 'f', long, value_enum, default_value = "plain", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct DepsArgs {
    #[arg(value_name = "PATH", help = "Addons directory")]
    pub path: PathBuf,

    #[arg(value_name = "MODULE", help = "Module name")]
    pub module: String,

    #[arg(short = 'r', long, help = "Show dependents instead of dependencies")]
    pub reverse: bool,

    #[arg(long, value_name = "N", help = "Directory levels to search")]
    pub depth: Option<usize>,

    #[arg(short = 'f', long, value_enum, default_value = "plain", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ChangedArgs {
    #[arg(
        value_name = "PATH",
        default_value = ".",
        help = "Repository root (defaults to current directory)"
    )]
    pub path: PathBuf,

    #[arg(long = "ref", value_name = "REF", default_value = "HEAD", help = "Git reference to diff against")]
    pub reference: String,

    #[arg(
        long = "files",
        value_name = "FILES",
        value_delimiter = ',',
        help = "Changed paths relative to PATH; skips git when given"
    )]
    pub files: Vec<String>,

    #[arg(short = 'f', long, value_enum, default_value = "plain", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct VersionsArgs {
    #[arg(value_name = "PATH", help = "Addons directory")]
    pub path: PathBuf,

    #[arg(
        short = 'm',
        long = "modules",
        value_name = "NAMES",
        value_delimiter = ',',
        required = true,
        help = "Comma-separated module names"
    )]
    pub modules: Vec<String>,

    #[arg(long, value_name = "N", help = "Directory levels to search")]
    pub depth: Option<usize>,

    #[arg(short = 'f', long, value_enum, default_value = "plain", help = "Output format")]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Plain,
    Lines,
    Json,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Plain => super::output::OutputFormat::Plain,
            OutputFormatArg::Lines => super::output::OutputFormat::Lines,
            OutputFormatArg::Json => super::output::OutputFormat::Json,
        }
    }
}
