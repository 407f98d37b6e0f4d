//! Built-in help for AutoGauss
//!
//! Documents the workflow file keywords and the analysis tools.

use crate::settings::SETTINGS_FILE_NAME;

/// Category for organizing keywords in the help system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordCategory {
    /// Step selection and route lines.
    Steps,
    /// Memory, processors and concurrency.
    Resources,
    /// Charge, multiplicity and title.
    Molecule,
    /// Gaussian command, folders and file extensions.
    Program,
    /// Completion polling and restarts.
    Polling,
}

/// Order in which categories are printed
const CATEGORY_ORDER: [KeywordCategory; 5] = [
    KeywordCategory::Steps,
    KeywordCategory::Resources,
    KeywordCategory::Molecule,
    KeywordCategory::Program,
    KeywordCategory::Polling,
];

/// Documentation entry for a single workflow file keyword.
#[derive(Debug, Clone)]
pub struct Keyword {
    /// The name of the keyword (e.g., "nprocs", "steps").
    pub name: &'static str,
    /// Accepted alternative spellings
    pub aliases: &'static [&'static str],
    /// The category to which this keyword belongs.
    pub category: KeywordCategory,
    /// A brief description of what the keyword does.
    pub description: &'static str,
    /// The default value of the keyword, if applicable.
    pub default_value: Option<&'static str>,
    /// An example of how to use the keyword in a workflow file.
    pub example: Option<&'static str>,
}

/// All keyword documentation
pub const KEYWORDS: &[Keyword] = &[
    Keyword {
        name: "*STEPS",
        aliases: &[],
        category: KeywordCategory::Steps,
        description: "Section of '<step> = <route line>' entries, closed by '*'. Entries override the built-in six-step table",
        default_value: Some("Opt Freq, TD vertical excitations, CorrectedLR S1, TD Opt Freq S1, NonEquilibrium=Save, NonEquilibrium=Read (B3LYP/6-31+G(d,p), ethanol)"),
        example: Some("*STEPS\n             1 = # Opt Freq B3LYP/6-31+G(d,p)\n             *"),
    },
    Keyword {
        name: "steps",
        aliases: &[],
        category: KeywordCategory::Steps,
        description: "Steps to run for every molecule, in execution order. Checkpoints are chained in this order",
        default_value: Some("1, 2, 3, 4, 5, 6"),
        example: Some("steps = 1, 2, 5"),
    },
    Keyword {
        name: "mem",
        aliases: &["memory"],
        category: KeywordCategory::Resources,
        description: "Memory for each Gaussian job (%Mem). Integer plus KB/MB/GB/TB or KW/MW/GW/TW",
        default_value: Some("16GB"),
        example: Some("mem = 32GB"),
    },
    Keyword {
        name: "nprocs",
        aliases: &["nprocshared"],
        category: KeywordCategory::Resources,
        description: "Processors for each Gaussian job (%NProcShared)",
        default_value: Some("16"),
        example: Some("nprocs = 8"),
    },
    Keyword {
        name: "max_concurrent",
        aliases: &["max_concurrent_molecules"],
        category: KeywordCategory::Resources,
        description: "Molecules processed at the same time. Each runs its steps one after another",
        default_value: Some("2"),
        example: Some("max_concurrent = 4"),
    },
    Keyword {
        name: "charge",
        aliases: &[],
        category: KeywordCategory::Molecule,
        description: "Charge for .xyz and .chk sources. .com/.gjf sources keep their own",
        default_value: Some("0"),
        example: Some("charge = -1"),
    },
    Keyword {
        name: "mult",
        aliases: &["multiplicity"],
        category: KeywordCategory::Molecule,
        description: "Spin multiplicity for .xyz and .chk sources",
        default_value: Some("1"),
        example: Some("mult = 3"),
    },
    Keyword {
        name: "title",
        aliases: &[],
        category: KeywordCategory::Molecule,
        description: "Title card of every input file",
        default_value: Some("Title Card Required"),
        example: Some("title = coumarin screening"),
    },
    Keyword {
        name: "gaussian_comm",
        aliases: &["gaussian_command"],
        category: KeywordCategory::Program,
        description: "Gaussian executable, optionally with a launcher in front. Run as '<command> < input > log' inside the step folder",
        default_value: Some("g16"),
        example: Some("gaussian_comm = srun --exclusive g16"),
    },
    Keyword {
        name: "input_dir",
        aliases: &[],
        category: KeywordCategory::Program,
        description: "Folder scanned for .xyz, .com, .gjf and .chk molecule sources",
        default_value: Some("input"),
        example: Some("input_dir = conformers"),
    },
    Keyword {
        name: "output_dir",
        aliases: &[],
        category: KeywordCategory::Program,
        description: "Folder receiving one subfolder per molecule plus the run summary",
        default_value: Some("output"),
        example: Some("output_dir = results"),
    },
    Keyword {
        name: "input_ext",
        aliases: &[],
        category: KeywordCategory::Program,
        description: "Extension of generated input files",
        default_value: Some("com"),
        example: Some("input_ext = gjf"),
    },
    Keyword {
        name: "output_ext",
        aliases: &[],
        category: KeywordCategory::Program,
        description: "Extension of Gaussian log files",
        default_value: Some("log"),
        example: Some("output_ext = out"),
    },
    Keyword {
        name: "poll_interval",
        aliases: &[],
        category: KeywordCategory::Polling,
        description: "Seconds between two looks at a running job's log",
        default_value: Some("60"),
        example: Some("poll_interval = 30"),
    },
    Keyword {
        name: "poll_timeout",
        aliases: &[],
        category: KeywordCategory::Polling,
        description: "Seconds after which a running job is killed and the molecule marked failed. 0 waits forever",
        default_value: Some("0"),
        example: Some("poll_timeout = 86400"),
    },
    Keyword {
        name: "restart",
        aliases: &[],
        category: KeywordCategory::Polling,
        description: "Skip steps recorded in progress.json whose log still ends in Normal termination",
        default_value: Some("false"),
        example: Some("restart = true"),
    },
];

/// Looks up a keyword by name or alias (case-insensitive).
pub fn find_keyword(name: &str) -> Option<&'static Keyword> {
    let name = name.to_lowercase();
    KEYWORDS.iter().find(|k| {
        k.name.to_lowercase() == name || k.aliases.iter().any(|a| *a == name)
    })
}

/// Print global help
pub fn print_global_help() {
    println!("AutoGauss - Multi-step Gaussian workflow driver and log analysis tools");
    println!();
    println!("USAGE:");
    println!("    autogauss [OPTIONS] <COMMAND>");
    println!();
    println!("COMMANDS:");
    println!("    run [workflow.inp]   Run every molecule in input_dir through the steps");
    println!("    <workflow.inp>       Same as 'run <workflow.inp>'");
    println!();
    println!("    ci [workflow.inp]    Create a commented workflow template (default: workflow.inp)");
    println!("    ci {}", SETTINGS_FILE_NAME);
    println!("                        Create a settings template file");
    println!();
    println!("    search, esp, freq, boltzmann, xyz2pdb");
    println!("                        Analysis tools, see 'autogauss --help tools'");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help [topic]   Show help. Topics: keywords, tools");
    println!();
    println!("CONFIGURATION FILE:");
    println!("    AutoGauss reads '{}' for program defaults.", SETTINGS_FILE_NAME);
    println!("    Create template:     autogauss ci {}", SETTINGS_FILE_NAME);
    println!("    Supported locations:");
    println!("      - ./{} (local, highest priority)", SETTINGS_FILE_NAME);
    println!("      - ~/.config/autogauss/{} (user)", SETTINGS_FILE_NAME);
    println!("      - /etc/autogauss/{} (system)", SETTINGS_FILE_NAME);
    println!("    The workflow file overrides the settings file. RUST_LOG overrides the log level.");
    println!();
    println!("EXAMPLES:");
    println!("    Create workflow:     autogauss ci");
    println!("    Run workflow:        autogauss run workflow.inp");
    println!("    Restart after crash: set 'restart = true' and run again");
    println!("    View keywords:       autogauss --help keywords");
    println!();
}

/// Print keyword reference
pub fn print_keyword_help() {
    println!("WORKFLOW FILE KEYWORDS");
    println!("═══════════════════════════════════════════════════════════════════════");
    println!();

    for category in CATEGORY_ORDER {
        print_category_header(category);
        println!();

        for keyword in KEYWORDS.iter().filter(|k| k.category == category) {
            print_keyword(keyword);
            println!();
        }
        println!();
    }
}

/// Print analysis tool reference
pub fn print_tools_help() {
    println!("ANALYSIS TOOLS");
    println!("═══════════════════════════════════════════════════════════════════════");
    println!();
    println!("Depth 0 searches the subfolders of the current folder, 1 adds theirs, and so on.");
    println!("Logs directly in the current folder are not searched.");
    println!();
    println!("search <depth> <text> [beginning|end]");
    println!("    Finds the first line containing <text> in every .log and records what");
    println!("    follows it. Searches from the end by default.");
    println!("    Output: Search_Results.txt");
    println!("    Example: autogauss search 2 \"SCF Done:  E(RB3LYP) =\" end");
    println!();
    println!("esp <depth> [max_atoms]");
    println!("    Collects the first 'ESP charges:' block of every .log, with per-atom");
    println!("    mean and sample standard deviation (zero charges are ignored).");
    println!("    Output: ESP_Charges.csv");
    println!();
    println!("freq [directory]");
    println!("    Reports the lowest harmonic frequencies of every .log below the folder");
    println!("    and whether the first one is imaginary.");
    println!("    Output: frequency_results.csv");
    println!();
    println!("boltzmann <energies.csv> [temperature]");
    println!("    Boltzmann populations from 'name,energy' lines in Hartree.");
    println!("    Default temperature: 298.15 K. A workflow run writes output/energies.csv.");
    println!();
    println!("xyz2pdb <input.xyz> <base.pdb> <prefix>");
    println!("    Writes <prefix>_<k>.pdb for every frame, replacing the coordinates of");
    println!("    the ATOM/HETATM records of the template.");
    println!();
}

/// Print category header
fn print_category_header(category: KeywordCategory) {
    let title = match category {
        KeywordCategory::Steps => "STEPS",
        KeywordCategory::Resources => "RESOURCES",
        KeywordCategory::Molecule => "MOLECULE DEFAULTS",
        KeywordCategory::Program => "PROGRAM AND FILES",
        KeywordCategory::Polling => "POLLING AND RESTART",
    };
    println!("{}", title);
    println!("{}", "─".repeat(76));
}

/// Print single keyword
fn print_keyword(keyword: &Keyword) {
    if keyword.aliases.is_empty() {
        println!("{}", keyword.name);
    } else {
        println!("{} (also: {})", keyword.name, keyword.aliases.join(", "));
    }
    println!("    {}", keyword.description);

    if let Some(default) = keyword.default_value {
        println!("    Default: {}", default);
    }

    if let Some(example) = keyword.example {
        println!("    Example: {}", example);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_keyword_has_a_category_in_order() {
        for keyword in KEYWORDS {
            assert!(CATEGORY_ORDER.contains(&keyword.category), "{}", keyword.name);
        }
    }

    #[test]
    fn test_find_keyword_by_alias() {
        assert_eq!(find_keyword("NPROCSHARED").map(|k| k.name), Some("nprocs"));
        assert_eq!(find_keyword("gaussian_command").map(|k| k.name), Some("gaussian_comm"));
        assert!(find_keyword("method").is_none());
    }

    #[test]
    fn test_documented_keywords_are_understood_by_parser() {
        use crate::config::WorkflowConfig;
        use crate::parser::parse_workflow_str;

        for keyword in KEYWORDS.iter().filter(|k| !k.name.starts_with('*')) {
            let example = keyword.example.unwrap();
            let parsed = parse_workflow_str(&format!("{}\n", example), WorkflowConfig::default());
            assert!(parsed.is_ok(), "{}", example);
        }
    }
}
