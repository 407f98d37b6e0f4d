use autogauss::config::WorkflowConfig;
use autogauss::parser::parse_workflow_str;
use autogauss::pipeline::{run_workflow, MoleculeOutcome, SUMMARY_FILE};
use autogauss::qm_interface::{QMInterface, Result as QMResult, RunningCalculation};
use autogauss::validation::validate_workflow;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

struct Done;

impl RunningCalculation for Done {
    fn has_exited(&mut self) -> QMResult<bool> {
        Ok(true)
    }

    fn terminate(&mut self) -> QMResult<()> {
        Ok(())
    }
}

/// Echoes the input into the log and terminates normally.
struct EchoGaussian;

impl QMInterface for EchoGaussian {
    fn launch(
        &self,
        input_path: &Path,
        output_path: &Path,
        _workdir: &Path,
    ) -> QMResult<Box<dyn RunningCalculation>> {
        let input = fs::read_to_string(input_path)?;
        fs::write(
            output_path,
            format!("{}\n Normal termination of Gaussian 16\n", input),
        )?;
        Ok(Box::new(Done))
    }
}

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input");
    fs::create_dir_all(&input).unwrap();
    fs::write(
        input.join("methanol.xyz"),
        "6\nmethanol\nC -0.046 0.663 0.0\nO -0.046 -0.756 0.0\nH -1.086 0.976 0.0\nH 0.438 1.071 0.890\nH 0.438 1.071 -0.890\nH 0.861 -1.078 0.0\n",
    )
    .unwrap();
    fs::write(
        input.join("anion.gjf"),
        "%chk=old.chk\n# HF/STO-3G\n\nformate\n\n-1 1\nC 0.0 0.0 0.0\nO 1.2 0.0 0.0\nO -0.6 1.0 0.0\nH -0.6 -1.0 0.0\n\n",
    )
    .unwrap();
    dir
}

fn workflow_for(dir: &Path) -> WorkflowConfig {
    let content = format!(
        "*STEPS\n\
         1 = # Opt HF/STO-3G\n\
         2 = # HF/STO-3G Pop=MK Geom=Check Guess=Read\n\
         *\n\
         steps = 1, 2\n\
         mem = 2GB\n\
         nprocs = 2\n\
         charge = 0\n\
         mult = 1\n\
         input_dir = {}\n\
         output_dir = {}\n\
         poll_interval = 1\n",
        dir.join("input").display(),
        dir.join("output").display()
    );
    let mut config = parse_workflow_str(&content, WorkflowConfig::default()).unwrap();
    config.poll_interval = Duration::from_millis(5);
    config
}

#[test]
fn test_workflow_file_drives_every_molecule() {
    let dir = workspace();
    let config = workflow_for(dir.path());
    validate_workflow(&config).unwrap();

    let summary = run_workflow(&config, &EchoGaussian).unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.completed, 2);

    let out = dir.path().join("output");

    // .gjf sources keep their own charge
    let anion_cmxyz = fs::read_to_string(out.join("anion/bases/anion.cmxyz")).unwrap();
    assert!(anion_cmxyz.starts_with("-1 1\nC 0.0 0.0 0.0\n"));
    let anion_step1 = fs::read_to_string(out.join("anion/step1/anion.com")).unwrap();
    assert!(anion_step1.contains("%Mem=2GB\n%NProcShared=2\n# Opt HF/STO-3G\n\nTitle Card Required\n\n-1 1\nC 0.0"));

    let methanol_step2 = fs::read_to_string(out.join("methanol/step2/methanol.com")).unwrap();
    assert!(methanol_step2.contains("# HF/STO-3G Pop=MK Geom=Check Guess=Read"));
    assert!(methanol_step2.ends_with("\n0 1\n\n"));

    let progress = fs::read_to_string(out.join("methanol/progress.json")).unwrap();
    let progress: serde_json::Value = serde_json::from_str(&progress).unwrap();
    assert_eq!(progress["completed_steps"], serde_json::json!([1, 2]));

    let summary_json = fs::read_to_string(out.join(SUMMARY_FILE)).unwrap();
    assert!(summary_json.contains("\"completed\": 2"));
}

#[test]
fn test_restart_with_nothing_left_runs_nothing() {
    let dir = workspace();
    let mut config = workflow_for(dir.path());
    run_workflow(&config, &EchoGaussian).unwrap();

    config.restart = true;
    let summary = run_workflow(&config, &EchoGaussian).unwrap();
    for report in &summary.molecules {
        assert_eq!(report.outcome, MoleculeOutcome::Completed);
        assert_eq!(report.skipped_steps, vec![1, 2]);
        assert!(report.completed_steps.is_empty());
    }
}

#[cfg(unix)]
mod real_process {
    use super::*;
    use autogauss::qm_interface::GaussianInterface;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    fn single_molecule(dir: &Path, command: String) -> WorkflowConfig {
        fs::remove_file(dir.join("input/anion.gjf")).unwrap();
        WorkflowConfig {
            gaussian_command: command,
            ..workflow_for(dir)
        }
    }

    #[test]
    fn test_fake_g16_reads_stdin_and_writes_chk_in_step_dir() {
        let dir = workspace();
        // Reads the input on stdin, creates the %Chk file in its working directory
        let g16 = script(
            dir.path(),
            "g16",
            "while IFS= read -r line; do\n\
             \x20 case \"$line\" in %Chk=*) chk=\"${line#%Chk=}\" ;; esac\n\
             done\n\
             echo chk > \"$chk\"\n\
             echo \" SCF Done:  E(RHF) =  -114.5     A.U. after 8 cycles\"\n\
             echo \" Normal termination of Gaussian 16\"\n",
        );
        let config = single_molecule(dir.path(), g16);

        let summary = run_workflow(&config, &GaussianInterface::new(&config.gaussian_command)).unwrap();
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.molecules[0].final_energy, Some(-114.5));

        let out = dir.path().join("output/methanol");
        assert!(out.join("step1/methanol.chk").exists());
        assert!(out.join("step2/methanol.chk").exists());
        let log = fs::read_to_string(out.join("step2/methanol.log")).unwrap();
        assert!(log.contains("Normal termination"));
    }

    #[test]
    fn test_linked_job_finishes_before_next_step_starts() {
        let dir = workspace();
        // First job ends normally, then a linked job keeps writing the checkpoint
        let g16 = script(
            dir.path(),
            "g16",
            "while IFS= read -r line; do\n\
             \x20 case \"$line\" in %Chk=*) chk=\"${line#%Chk=}\" ;; esac\n\
             done\n\
             if [ -f \"$chk\" ]; then cp \"$chk\" inherited.chk; fi\n\
             echo \" Normal termination of Gaussian 16\"\n\
             echo \" Link1:  Proceeding to internal job step number  2.\"\n\
             sleep 1\n\
             echo finished > \"$chk\"\n\
             echo \" Normal termination of Gaussian 16\"\n",
        );
        let config = single_molecule(dir.path(), g16);

        let summary = run_workflow(&config, &GaussianInterface::new(&config.gaussian_command)).unwrap();
        assert_eq!(summary.completed, 1);

        let out = dir.path().join("output/methanol");
        assert_eq!(
            fs::read_to_string(out.join("step2/inherited.chk")).unwrap(),
            "finished\n"
        );
        let log = fs::read_to_string(out.join("step1/methanol.log")).unwrap();
        assert_eq!(log.matches("Normal termination").count(), 2);
    }

    #[test]
    fn test_exit_without_termination_line_fails_molecule() {
        let dir = workspace();
        let g16 = script(dir.path(), "g16", "cat > /dev/null\necho \" Leave Link  101\"\nexit 1\n");
        let config = single_molecule(dir.path(), g16);

        let summary = run_workflow(&config, &GaussianInterface::new(&config.gaussian_command)).unwrap();
        assert_eq!(summary.failed, 1);
        assert!(matches!(
            summary.molecules[0].outcome,
            MoleculeOutcome::Failed { step: Some(1), .. }
        ));
        assert!(!dir.path().join("output/methanol/step2").exists());
    }

    #[test]
    fn test_timeout_kills_calculation() {
        let dir = workspace();
        let g16 = script(dir.path(), "g16", "exec sleep 30\n");
        let mut config = single_molecule(dir.path(), g16);
        config.poll_timeout = Some(Duration::from_millis(200));

        let summary = run_workflow(&config, &GaussianInterface::new(&config.gaussian_command)).unwrap();
        match &summary.molecules[0].outcome {
            MoleculeOutcome::Failed { step, reason } => {
                assert_eq!(*step, Some(1));
                assert!(reason.contains("still running"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_missing_executable_fails_molecule() {
        let dir = workspace();
        let config = single_molecule(
            dir.path(),
            dir.path().join("no_such_g16").display().to_string(),
        );

        let summary = run_workflow(&config, &GaussianInterface::new(&config.gaussian_command)).unwrap();
        assert_eq!(summary.failed, 1);
    }
}
