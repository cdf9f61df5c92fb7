use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for regionworld")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run fmt, clippy, tests and doc in order, stopping at the first failure
    Check,
    /// Check formatting of all crates
    Fmt,
    /// Lint all targets with warnings denied
    Clippy,
    /// Run all tests
    Test {
        /// Only test this package
        #[arg(short, long)]
        package: Option<String>,
    },
    /// Build the stream benchmarks and run them
    Bench,
    /// Build rustdoc for the workspace
    Doc,
    /// Build the entire workspace
    Build {
        #[arg(long)]
        release: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            fmt()?;
            clippy()?;
            test(None)?;
            doc()?;
        }
        Commands::Fmt => fmt()?,
        Commands::Clippy => clippy()?,
        Commands::Test { package } => test(package.as_deref())?,
        Commands::Bench => cargo("bench", &["bench", "-p", "regionworld-stream"])?,
        Commands::Doc => doc()?,
        Commands::Build { release } => {
            let mut args = vec!["build", "--workspace"];
            if release {
                args.push("--release");
            }
            cargo("build", &args)?;
        }
    }

    Ok(())
}

fn fmt() -> Result<()> {
    cargo("fmt", &["fmt", "--all", "--", "--check"])
}

fn clippy() -> Result<()> {
    cargo(
        "clippy",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    )
}

fn test(package: Option<&str>) -> Result<()> {
    match package {
        Some(name) => cargo("test", &["test", "-p", name]),
        None => cargo("test", &["test", "--workspace"]),
    }
}

fn doc() -> Result<()> {
    cargo("doc", &["doc", "--workspace", "--no-deps"])
}

fn cargo(step: &str, args: &[&str]) -> Result<()> {
    println!("==> cargo {}", args.join(" "));
    let status = Command::new(env_cargo()).args(args).status()?;
    if !status.success() {
        bail!("{step} failed ({status})");
    }
    Ok(())
}

/// The cargo that launched us, so toolchain overrides carry through.
fn env_cargo() -> String {
    std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_owned())
}
