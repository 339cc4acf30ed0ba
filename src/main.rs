use anyhow::Result;
use bit_checkout::areas::repository::Repository;
use bit_checkout::artifacts::checkout::conflict::{ConflictMessage, ConflictType};
use bit_checkout::artifacts::checkout::options::{CheckoutOptions, CheckoutStrategy};
use bit_checkout::errors::{CheckoutError, ConflictedPath};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "bit-checkout",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "A three-way git checkout engine",
    long_about = "Materializes git trees onto a working directory and index, \
    protecting local modifications, untracked and ignored files unless told otherwise.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "init",
        about = "Initialize a new repository",
        long_about = "This command initializes a new repository in the current directory or at the specified path."
    )]
    Init {
        #[arg(long, help = "Create a repository without a working directory")]
        bare: bool,
        #[arg(index = 1, help = "The path to the repository")]
        path: Option<PathBuf>,
    },
    #[command(name = "add", about = "Stage files for the next commit")]
    Add {
        #[arg(index = 1, required = true, help = "Files or directories to stage")]
        paths: Vec<PathBuf>,
    },
    #[command(
        name = "commit",
        about = "Create a new commit with the specified message",
        long_about = "This command creates a new commit in the repository with the specified commit message."
    )]
    Commit {
        #[arg(short, long, help = "The commit message")]
        message: String,
    },
    #[command(name = "branch", about = "Create a branch")]
    Branch {
        #[arg(index = 1, help = "Name of the new branch")]
        name: String,
        #[arg(index = 2, help = "Revision the branch starts at (defaults to HEAD)")]
        start: Option<String>,
    },
    #[command(
        name = "checkout",
        about = "Switch branches or restore working tree files",
        long_about = "This command makes the working tree and index match a revision, \
        then points HEAD at it. Local changes block the checkout unless --force is given."
    )]
    Checkout(CheckoutArgs),
}

#[derive(Args)]
struct CheckoutArgs {
    #[arg(index = 1, help = "Branch, commit or <rev>:<path> to check out")]
    target: String,
    #[arg(short, long, help = "Discard local changes")]
    force: bool,
    #[arg(short = 'n', long, help = "Report what would change without writing")]
    dry_run: bool,
    #[arg(long, help = "Recreate tracked files missing from the working tree")]
    recreate_missing: bool,
    #[arg(long, help = "Remove untracked files")]
    remove_untracked: bool,
    #[arg(long, help = "Remove ignored files")]
    remove_ignored: bool,
    #[arg(long, help = "Only update files that already exist")]
    update_only: bool,
    #[arg(long, help = "Refuse to overwrite ignored files")]
    dont_overwrite_ignored: bool,
    #[arg(long, help = "Leave directories that cannot be removed in place")]
    skip_locked_directories: bool,
    #[arg(long, help = "Treat paths literally rather than as patterns")]
    literal_paths: bool,
    #[arg(long = "strategy", value_name = "NAME", help = "Additional strategy flags by name")]
    strategies: Vec<String>,
    #[arg(long, value_name = "DIR", help = "Write files into DIR instead of the working tree")]
    target_directory: Option<PathBuf>,
    #[arg(long, help = "Show progress while writing files")]
    progress: bool,
    #[arg(index = 2, last = true, help = "Limit the checkout to these paths")]
    paths: Vec<String>,
}

impl CheckoutArgs {
    fn strategy(&self) -> Result<CheckoutStrategy> {
        let mut strategy = if self.force {
            CheckoutStrategy::FORCE
        } else {
            CheckoutStrategy::SAFE
        };

        for (enabled, flag) in [
            (self.dry_run, CheckoutStrategy::DRY_RUN),
            (self.recreate_missing, CheckoutStrategy::RECREATE_MISSING),
            (self.remove_untracked, CheckoutStrategy::REMOVE_UNTRACKED),
            (self.remove_ignored, CheckoutStrategy::REMOVE_IGNORED),
            (self.update_only, CheckoutStrategy::UPDATE_ONLY),
            (self.dont_overwrite_ignored, CheckoutStrategy::DONT_OVERWRITE_IGNORED),
            (self.skip_locked_directories, CheckoutStrategy::SKIP_LOCKED_DIRECTORIES),
            (self.literal_paths, CheckoutStrategy::DISABLE_PATHSPEC_MATCH),
        ] {
            strategy.set(flag, enabled);
        }

        for name in &self.strategies {
            strategy |= CheckoutStrategy::from_cli_name(name)
                .ok_or_else(|| anyhow::anyhow!("unknown checkout strategy '{name}'"))?;
        }

        Ok(strategy)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("BIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let pwd = std::env::current_dir()?;

    match cli.command {
        Commands::Init { bare, path } => {
            let path = path.unwrap_or(pwd);
            let repository = if bare {
                Repository::init_bare(&path)?
            } else {
                Repository::init(&path)?
            };

            println!(
                "Initialized empty Git repository in {}",
                repository.git_dir().display()
            );
        }
        Commands::Add { paths } => {
            let mut repository = Repository::open(&pwd)?;
            repository.add(&paths)?;
        }
        Commands::Commit { message } => {
            let mut repository = Repository::open(&pwd)?;
            repository.commit(&message)?;
        }
        Commands::Branch { name, start } => {
            let mut repository = Repository::open(&pwd)?;
            repository.branch(&name, start.as_deref())?;
        }
        Commands::Checkout(args) => checkout(&pwd, args)?,
    }

    Ok(())
}

fn checkout(pwd: &std::path::Path, args: CheckoutArgs) -> Result<()> {
    let mut repository = Repository::open(pwd)?;

    let mut options = CheckoutOptions::new()
        .strategy(args.strategy()?)
        .paths(args.paths.iter().cloned());
    if let Some(target_directory) = &args.target_directory {
        options = options
            .target_directory(target_directory)
            .allow_target_directory(true);
    }
    if args.progress {
        options = options.progress_callback(|path, completed, total| {
            if path.is_some() && total > 0 {
                eprint!(
                    "\rUpdating files: {:>3}% ({completed}/{total})",
                    completed * 100 / total
                );
                if completed == total {
                    eprintln!(", done.");
                }
            }
        });
    }

    match repository.switch(&args.target, options) {
        Ok(report) if report.dry_run => {
            for path in &report.created {
                println!("create {}", path.display());
            }
            for path in &report.updated {
                println!("update {}", path.display());
            }
            for path in &report.deleted {
                println!("delete {}", path.display());
            }
            for (from, to) in &report.renamed {
                println!("rename {} -> {}", from.display(), to.display());
            }
            Ok(())
        }
        Ok(report) => {
            for path in &report.locked {
                eprintln!("warning: could not remove locked directory {}", path.display());
            }
            Ok(())
        }
        Err(CheckoutError::Conflict { conflicts }) => {
            print_conflicts(&conflicts);
            std::process::exit(1);
        }
        Err(error) => Err(error.into()),
    }
}

fn print_conflicts(conflicts: &[ConflictedPath]) {
    let mut groups = BTreeMap::<ConflictType, Vec<&ConflictedPath>>::new();
    for conflict in conflicts {
        groups.entry(conflict.conflict_type).or_default().push(conflict);
    }

    for (conflict_type, conflicts) in groups {
        let ConflictMessage { header, footer } = (&conflict_type).into();
        let paths = conflicts
            .iter()
            .map(|conflict| format!("\t{}", conflict.path.display()))
            .collect::<Vec<_>>()
            .join("\n");

        eprintln!("{} {}\n{}\n{}", "error:".red().bold(), header, paths, footer);
    }

    eprintln!("Aborting");
}
