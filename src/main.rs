use autogauss::{
    boltzmann, config::WorkflowConfig, esp, frequencies, parser, pdb, pipeline,
    qm_interface::GaussianInterface,
    search::{self, SearchDirection},
    settings::{SettingsManager, SETTINGS_FILE_NAME},
    template_generator, validation,
};
use log::{info, LevelFilter};
use std::env;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;

/// Log file used when `[logging] file_logging = true`
const DEBUG_LOG_FILE: &str = "autogauss_debug.log";

/// Main entry point for AutoGauss.
///
/// Dispatches on the first argument:
/// - `run [workflow.inp]` or `<workflow.inp>`: run the workflow
/// - `ci [file]`: write a workflow or settings template
/// - `search`, `esp`, `freq`, `boltzmann`, `xyz2pdb`: analysis tools
/// - `-h`/`--help [topic]`: help
fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage(&args[0]);
        process::exit(1);
    }

    // Check for help flags before processing commands
    check_help_flags(&args);

    let settings = match SettingsManager::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = init_logging(&settings) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
    info!("Settings loaded from: {}", settings.config_source());

    let command = args[1].as_str();
    let rest = &args[2..];

    let result = match command {
        "run" => run_workflow(rest.first().map(Path::new), &settings),
        "ci" => run_create_template(rest.first().map(String::as_str), &settings),
        "search" => run_search(rest),
        "esp" => run_esp(rest),
        "freq" => run_frequencies(rest),
        "boltzmann" => run_boltzmann(rest),
        "xyz2pdb" => run_xyz2pdb(rest),
        _ if !command.starts_with('-') => run_workflow(Some(Path::new(command)), &settings),
        _ => {
            eprintln!("Error: Unknown command: {}", command);
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Initializes env_logger from the `[logging]` settings.
///
/// `RUST_LOG` overrides the configured level.
fn init_logging(settings: &SettingsManager) -> Result<(), Box<dyn std::error::Error>> {
    let level = LevelFilter::from_str(&settings.logging().level).unwrap_or(LevelFilter::Info);

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).parse_default_env().format_timestamp_millis();

    if settings.logging().file_logging {
        let file = File::create(DEBUG_LOG_FILE)
            .map_err(|e| format!("Failed to create log file {}: {}", DEBUG_LOG_FILE, e))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    } else {
        builder.target(env_logger::Target::Stdout);
    }

    builder.try_init()?;
    Ok(())
}

/// Check for help flags and print appropriate help
fn check_help_flags(args: &[String]) {
    use autogauss::help::*;

    if args[1] == "--help" || args[1] == "-h" {
        match args.get(2).map(String::as_str) {
            Some("keywords") => print_keyword_help(),
            Some("tools") => print_tools_help(),
            _ => print_global_help(),
        }
        process::exit(0);
    }

    // Command-specific help (autogauss esp --help)
    if args.len() >= 3 && (args[2] == "--help" || args[2] == "-h") {
        match args[1].as_str() {
            "search" | "esp" | "freq" | "boltzmann" | "xyz2pdb" => print_tools_help(),
            "run" | "ci" => print_keyword_help(),
            _ => print_global_help(),
        }
        process::exit(0);
    }
}

/// Prints usage information to stderr.
fn print_usage(program_name: &str) {
    eprintln!("AutoGauss - Multi-step Gaussian workflows");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {} run [workflow.inp]", program_name);
    eprintln!("                    Run every molecule of input_dir through the steps");
    eprintln!();
    eprintln!("  {} ci [workflow.inp]", program_name);
    eprintln!("                    Create a workflow template");
    eprintln!();
    eprintln!("  {} ci {}", program_name, SETTINGS_FILE_NAME);
    eprintln!("                    Create a settings template file");
    eprintln!();
    eprintln!("  {} search <depth> <text> [beginning|end]", program_name);
    eprintln!("  {} esp <depth> [max_atoms]", program_name);
    eprintln!("  {} freq [directory]", program_name);
    eprintln!("  {} boltzmann <energies.csv> [temperature]", program_name);
    eprintln!("  {} xyz2pdb <input.xyz> <base.pdb> <prefix>", program_name);
    eprintln!();
    eprintln!("  {} --help [keywords|tools]", program_name);
}

fn parse_arg<T: FromStr>(value: &str, what: &str) -> Result<T, Box<dyn std::error::Error>> {
    value
        .parse()
        .map_err(|_| format!("invalid {} '{}'", what, value).into())
}

/// Creates a workflow template, or the settings template when asked for
/// `autogauss_config.cfg`.
fn run_create_template(
    file_arg: Option<&str>,
    settings: &SettingsManager,
) -> Result<(), Box<dyn std::error::Error>> {
    if file_arg == Some(SETTINGS_FILE_NAME) {
        let settings_path = Path::new(SETTINGS_FILE_NAME);

        // Check if file already exists to prevent accidental overwrite
        if settings_path.exists() {
            return Err(format!(
                "{} already exists. Please remove it first or choose a different location.",
                SETTINGS_FILE_NAME
            )
            .into());
        }
        SettingsManager::create_template(settings_path)?;

        println!("✓ Settings template created successfully!");
        println!("  Output file: {}", SETTINGS_FILE_NAME);
        return Ok(());
    }

    let output_path = file_arg
        .map(PathBuf::from)
        .unwrap_or_else(template_generator::get_default_output_path);
    let config = WorkflowConfig::from_settings(settings.settings());
    let template = template_generator::generate_workflow_template(&config);
    template_generator::write_template_to_file(&template, &output_path)?;

    println!("✓ Workflow template created successfully!");
    println!("  Output file: {}", output_path.display());
    println!("\nNext steps:");
    println!("  1. Put .xyz, .com/.gjf or .chk files in '{}'", config.input_dir.display());
    println!("  2. Adjust the route lines and resources in {}", output_path.display());
    println!("  3. Run: autogauss run {}", output_path.display());
    Ok(())
}

/// Runs the workflow described by `workflow_path` (or the defaults).
fn run_workflow(
    workflow_path: Option<&Path>,
    settings: &SettingsManager,
) -> Result<(), Box<dyn std::error::Error>> {
    let print_level = settings.general().print_level;
    let base = WorkflowConfig::from_settings(settings.settings());

    let config = match workflow_path {
        Some(path) => parser::parse_workflow(path, base)?,
        None => {
            info!("No workflow file given, using defaults");
            base
        }
    };

    validation::validate_workflow(&config)?;
    validation::provide_user_guidance(&config);

    if print_level >= 1 {
        print_configuration(&config, settings, print_level);
    }

    let gaussian = GaussianInterface::new(&config.gaussian_command);
    let summary = pipeline::run_workflow(&config, &gaussian)?;

    if print_level >= 1 {
        println!();
        println!("****Workflow Summary****");
        for report in &summary.molecules {
            match &report.outcome {
                pipeline::MoleculeOutcome::Completed => println!(
                    "  {:<30} completed  steps {:?}",
                    report.molecule,
                    [report.skipped_steps.as_slice(), report.completed_steps.as_slice()].concat()
                ),
                pipeline::MoleculeOutcome::Failed { step, reason } => println!(
                    "  {:<30} FAILED     {}{}",
                    report.molecule,
                    step.map_or(String::new(), |s| format!("step {}: ", s)),
                    reason
                ),
            }
        }
    }
    println!(
        "{} of {} molecules completed, {} failed. Summary: {}",
        summary.completed,
        summary.total,
        summary.failed,
        config.output_dir.join(pipeline::SUMMARY_FILE).display()
    );

    if summary.failed > 0 {
        return Err(format!("{} molecule(s) failed", summary.failed).into());
    }
    Ok(())
}

/// Prints the merged configuration before the run starts.
fn print_configuration(config: &WorkflowConfig, settings: &SettingsManager, print_level: u32) {
    println!("****AutoGauss {}****", env!("CARGO_PKG_VERSION"));
    println!("Settings:        {}", settings.config_source());
    println!("Gaussian:        {}", config.gaussian_command);
    println!("Resources:       %Mem={} %NProcShared={}", config.mem, config.nprocs);
    println!("Molecules:       {} -> {}", config.input_dir.display(), config.output_dir.display());
    println!("Concurrency:     {} molecule(s)", config.max_concurrent);
    println!("Steps:           {:?}", config.steps_to_execute);
    println!("Default charge:  {} {}", config.charge, config.multiplicity);
    println!("Polling:         every {:?}", config.poll_interval);
    if print_level >= 2 {
        for step in &config.steps_to_execute {
            println!("  step {}: {}", step, config.command_for(*step).unwrap_or("<none>"));
        }
        if let Some(timeout) = config.poll_timeout {
            println!("Timeout:         {:?}", timeout);
        }
        println!("Restart:         {}", config.restart);
    }
    println!();
}

/// `search <depth> <text> [beginning|end]`
fn run_search(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    if args.len() < 2 {
        return Err("usage: autogauss search <depth> <text> [beginning|end]".into());
    }
    let depth: usize = parse_arg(&args[0], "depth")?;
    let text = &args[1];
    let direction = match args.get(2) {
        Some(d) => SearchDirection::from_str(d)?,
        None => SearchDirection::End,
    };

    let base = env::current_dir()?;
    let hits = search::search_tree(&base, depth, text, direction);
    search::write_search_results(&base.join(search::SEARCH_RESULTS_FILE), &hits, text)?;

    let found = hits.iter().filter(|h| h.value.is_some()).count();
    println!(
        "Searched {} log file(s), '{}' found in {}. Results written to {}",
        hits.len(),
        text,
        found,
        search::SEARCH_RESULTS_FILE
    );
    Ok(())
}

/// `esp <depth> [max_atoms]`
fn run_esp(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let depth: usize = match args.first() {
        Some(d) => parse_arg(d, "depth")?,
        None => return Err("usage: autogauss esp <depth> [max_atoms]".into()),
    };
    let max_atoms = args.get(1).map(|m| parse_arg(m, "max_atoms")).transpose()?;

    let base = env::current_dir()?;
    let sets = esp::collect_esp_charges(&base, depth, max_atoms);
    if sets.is_empty() {
        return Err("no ESP charges found in any .log file".into());
    }
    esp::write_esp_csv(&base.join(esp::ESP_RESULTS_FILE), &sets)?;
    println!(
        "ESP charges of {} log file(s) written to {}",
        sets.len(),
        esp::ESP_RESULTS_FILE
    );
    Ok(())
}

/// `freq [directory]`
fn run_frequencies(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let base = match args.first() {
        Some(dir) => PathBuf::from(dir),
        None => env::current_dir()?,
    };

    let records = frequencies::scan_frequencies(&base)?;
    frequencies::write_frequency_csv(&base.join(frequencies::FREQUENCY_RESULTS_FILE), &records)?;

    if records.is_empty() {
        println!("No complete sequence found.");
    } else {
        let negatives = records.iter().filter(|r| r.has_negative).count();
        println!(
            "{} file(s) with frequencies, {} with an imaginary mode. Results written to {}",
            records.len(),
            negatives,
            frequencies::FREQUENCY_RESULTS_FILE
        );
    }
    Ok(())
}

/// `boltzmann <energies.csv> [temperature]`
fn run_boltzmann(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let path = args
        .first()
        .ok_or("usage: autogauss boltzmann <energies.csv> [temperature]")?;
    let temperature = match args.get(1) {
        Some(t) => parse_arg(t, "temperature")?,
        None => boltzmann::T,
    };

    let conformers = boltzmann::read_energy_file(Path::new(path))?;
    let populations = boltzmann::boltzmann_populations(&conformers, temperature)?;
    print!("{}", boltzmann::format_population_table(&populations));
    Ok(())
}

/// `xyz2pdb <input.xyz> <base.pdb> <prefix>`
fn run_xyz2pdb(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    if args.len() != 3 {
        return Err("usage: autogauss xyz2pdb <input.xyz> <base.pdb> <prefix>".into());
    }
    let xyz = Path::new(&args[0]);
    let base = Path::new(&args[1]);
    if !xyz.is_file() || !base.is_file() {
        return Err("One or more input files do not exist.".into());
    }

    let written = pdb::convert_frames(xyz, base, &args[2])?;
    for path in &written {
        println!("Generated: {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arg_reports_name() {
        let err = parse_arg::<usize>("two", "depth").unwrap_err();
        assert_eq!(err.to_string(), "invalid depth 'two'");
        assert_eq!(parse_arg::<f64>("310.5", "temperature").unwrap(), 310.5);
    }
}
