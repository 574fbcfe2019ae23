use std::error::Error;
use std::process;

use clap::Command;
use duct::cmd;

type AnyResult<T> = Result<T, Box<dyn Error>>;
type StepFn = fn() -> AnyResult<()>;
type Step = (&'static str, StepFn);

const DEMO_VAULT: &str = "demos/vault";
const DEMO_OUTPUT: &str = "target/demo/colored-tags.css";

fn cli() -> Command {
    Command::new("colored-tags-task")
        .about("Tasks for the colored tags workspace")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("lint").about("Run rustfmt and clippy over the workspace"))
        .subcommand(Command::new("test").about("Run every unit, integration and property test"))
        .subcommand(Command::new("bench").about("Run the color engine benchmarks"))
        .subcommand(
            Command::new("demo").about("Generate the stylesheet for the bundled demo vault"),
        )
        .subcommand(Command::new("all").about("Run lint, tests and the demo"))
}

fn main() {
    if let Err(error) = run() {
        eprintln!("xtask error: {error}");
        process::exit(1);
    }
}

fn run() -> AnyResult<()> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("lint", _)) => run_lint(),
        Some(("test", _)) => run_tests(),
        Some(("bench", _)) => run_benches(),
        Some(("demo", _)) => run_demo(),
        Some(("all", _)) => run_all(),
        _ => unreachable!(),
    }
}

fn run_lint() -> AnyResult<()> {
    println!("Running lint...");
    run_cmd("cargo", &["fmt", "--all", "--check"])?;
    run_cmd(
        "cargo",
        &[
            "clippy",
            "--workspace",
            "--all-targets",
            "--",
            "-D",
            "warnings",
        ],
    )
}

fn run_tests() -> AnyResult<()> {
    println!("Running tests...");
    run_cmd("cargo", &["test", "--workspace"])
}

fn run_benches() -> AnyResult<()> {
    println!("Running benchmarks...");
    run_cmd("cargo", &["bench", "-p", "tag-colors"])
}

fn run_demo() -> AnyResult<()> {
    println!("Generating demo stylesheet...");
    run_cmd(
        "cargo",
        &[
            "run",
            "-p",
            "stylegen",
            "--",
            "--vault",
            DEMO_VAULT,
            "--settings",
            "demos/settings.json",
            "--output",
            DEMO_OUTPUT,
        ],
    )?;
    println!("Stylesheet written to {DEMO_OUTPUT}");
    Ok(())
}

fn run_all() -> AnyResult<()> {
    let mut errors = Vec::new();

    const STEPS: &[Step] = &[
        ("Lint", run_lint),
        ("Tests", run_tests),
        ("Demo", run_demo),
    ];

    for (label, step) in STEPS {
        if let Err(error) = step() {
            eprintln!("{label} failed: {error}");
            errors.push(format!("{label}: {error}"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(format!("One or more tasks failed:\n{}", errors.join("\n")).into())
    }
}

fn run_cmd(program: &str, args: &[&str]) -> AnyResult<()> {
    println!("> {} {}", program, args.join(" "));
    cmd(program, args).run()?;
    Ok(())
}
