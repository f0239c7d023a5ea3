use anyhow::Result;
use clap::Parser;
use tpfix::cli::{CheckArgs, Command, FixArgs, RootArgs};
use tpfix::fixers::for_provider;
use tpfix::inspect::{inspect, InspectionReport};
use tpfix::package::{derive_output_path, Package};
use tpfix::pipeline::run_pipeline;
use tpfix::provider::Provider;
use tpfix::report::ConsoleReporter;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();
    let args = RootArgs::parse();
    match args.command {
        Command::Check(args) => cmd_check(&args),
        Command::Fix(args) => cmd_fix(&args),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tpfix=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_check(args: &CheckArgs) -> Result<()> {
    let report = inspect(&args.package)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print_checks(&report);
    if report.conformant() {
        println!("DONE: package is conformant");
    } else {
        println!("ERROR: package is not conformant");
    }
    Ok(())
}

fn cmd_fix(args: &FixArgs) -> Result<()> {
    // Codes are case-insensitive at the CLI; the engine stays strict.
    let provider = Provider::parse(&args.provider.to_uppercase())?;

    println!("Input information:");
    println!("    Provider -> {provider}");
    println!("    Package  -> {}", args.package.display());

    let report = inspect(&args.package)?;
    print_checks(&report);

    let dest = match &args.out {
        Some(out) => out.clone(),
        None => derive_output_path(&args.package)?,
    };
    let work_dir = dest.with_extension("work");
    let pkg = Package::extract(&args.package, &work_dir)?;

    println!("Fixing package...");
    let fixer = for_provider(provider);
    let mut reporter = ConsoleReporter;
    run_pipeline(fixer.as_ref(), &pkg, &report, &dest, &mut reporter)?;

    println!("Output result:");
    println!("    {} is fixed", dest.display());
    Ok(())
}

fn print_checks(report: &InspectionReport) {
    println!("Analyzing package...");
    println!("    zip container          -> {}", check_mark(report.is_zip));
    println!(
        "    single top-level dir   -> {}",
        check_mark(report.has_single_top_level_dir)
    );
    println!("    META-INF directory     -> {}", check_mark(report.has_meta_inf));
    println!("    catalog.xml            -> {}", check_mark(report.has_catalog_xml));
    println!(
        "    taxonomyPackage.xml    -> {}",
        check_mark(report.has_taxonomy_package_xml)
    );
}

fn check_mark(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "missing"
    }
}
