use crate::config::WorkflowConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Template generator for workflow input files
///
/// Renders a commented workflow file holding every parameter with the values
/// of `config`, so `autogauss ci` output reflects the loaded settings.
pub fn generate_workflow_template(config: &WorkflowConfig) -> String {
    let mut steps_block = String::new();
    for (step, route) in &config.step_commands {
        steps_block.push_str(&format!("{} = {}\n", step, route));
    }

    let steps = config
        .steps_to_execute
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let poll_timeout = config.poll_timeout.map_or(0, |d| d.as_secs());

    format!(
        r#"#Between *STEPS and *, write one route line per step: <step number> = <route line>.
#Every step after the first should read the previous checkpoint (Geom=Check Guess=Read).
*STEPS
{steps_block}*

#This subset controls which steps run and the resources of each Gaussian job
steps = {steps} # executed in this order for every molecule
mem = {mem} # %Mem of every input file
nprocs = {nprocs} # %NProcShared of every input file
max_concurrent = {max_concurrent} # molecules processed at the same time

#Default charge and multiplicity for .xyz and .chk sources (.com/.gjf carry their own)
charge = {charge}
mult = {mult}
title = {title}

#This subset controls how Gaussian is called and where files go
gaussian_comm = {gaussian}
input_dir = {input_dir}
output_dir = {output_dir}
input_ext = {input_ext}
output_ext = {output_ext}

#Polling of running calculations (seconds). poll_timeout = 0 waits forever
poll_interval = {poll_interval}
poll_timeout = {poll_timeout}
restart = {restart} # skip steps already finished in a previous run
"#,
        steps_block = steps_block,
        steps = steps,
        mem = config.mem,
        nprocs = config.nprocs,
        max_concurrent = config.max_concurrent,
        charge = config.charge,
        mult = config.multiplicity,
        title = config.title,
        gaussian = config.gaussian_command,
        input_dir = config.input_dir.display(),
        output_dir = config.output_dir.display(),
        input_ext = config.input_extension,
        output_ext = config.output_extension,
        poll_interval = config.poll_interval.as_secs(),
        poll_timeout = poll_timeout,
        restart = config.restart,
    )
}

/// Write template to file
///
/// An existing file is never overwritten.
pub fn write_template_to_file<P: AsRef<Path>>(
    template: &str,
    output_path: P,
) -> Result<(), Box<dyn std::error::Error>> {
    let output_path = output_path.as_ref();

    if output_path.exists() {
        return Err(format!(
            "{} already exists; remove it or choose another name",
            output_path.display()
        )
        .into());
    }

    // Create parent directory if it doesn't exist
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(output_path, template)?;
    Ok(())
}

/// Default workflow file name for `autogauss ci`
pub fn get_default_output_path() -> PathBuf {
    PathBuf::from("workflow.inp")
}
