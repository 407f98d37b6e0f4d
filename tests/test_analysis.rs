use autogauss::boltzmann::{boltzmann_populations, format_population_table, read_energy_file, T};
use autogauss::esp::{atom_statistics, collect_esp_charges};
use autogauss::frequencies::scan_frequencies;
use autogauss::pdb::convert_frames;
use autogauss::search::{search_tree, SearchDirection};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn conformer_log(energy: f64, first_freq: f64, charges: &[f64]) -> String {
    let mut log = String::from(" Entering Gaussian System, Link 0=g16\n");
    log.push_str(&format!(
        " SCF Done:  E(RB3LYP) =  {:.8}     A.U. after   12 cycles\n",
        energy
    ));
    log.push_str(" ESP charges:\n               1\n");
    for (i, c) in charges.iter().enumerate() {
        log.push_str(&format!("     {}  C   {:.6}\n", i + 1, c));
    }
    log.push_str(" Sum of ESP charges =   0.00000\n");
    log.push_str(" Low frequencies ---   -1.2   0.5   0.9\n");
    log.push_str(" Diagonal vibrational polarizability:\n");
    log.push_str(" Harmonic frequencies (cm**-1), IR intensities (KM/Mole)\n");
    log.push_str(&format!(" Frequencies --  {:.4}  200.0000  300.0000\n", first_freq));
    log.push_str(" Normal termination of Gaussian 16\n");
    log
}

fn conformer_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, energy, freq, charges) in [
        ("conf_a", -300.0, 25.0, vec![-0.5, 0.25]),
        ("conf_b", -300.001, -80.0, vec![-0.3, 0.15]),
    ] {
        let sub = dir.path().join(name);
        fs::create_dir_all(&sub).unwrap();
        fs::write(
            sub.join(format!("{}.log", name)),
            conformer_log(energy, freq, &charges),
        )
        .unwrap();
    }
    dir
}

#[test]
fn test_search_collects_last_energy_of_each_conformer() {
    let dir = conformer_tree();
    // a log in the base folder itself is never searched
    fs::write(dir.path().join("stray.log"), conformer_log(-1.0, 10.0, &[0.1])).unwrap();

    let hits = search_tree(dir.path(), 0, "E(RB3LYP) =", SearchDirection::End);
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].file, Path::new("conf_a/conf_a.log"));
    assert!(hits[0].value.as_deref().unwrap().starts_with("-300.00000000"));
    assert!(hits.iter().all(|h| h.file != Path::new("stray.log")));
}

#[test]
fn test_esp_statistics_across_conformers() {
    let dir = conformer_tree();
    let sets = collect_esp_charges(dir.path(), 0, None);
    assert_eq!(sets.len(), 2);
    let stats = atom_statistics(&sets);
    assert!((stats[0].mean + 0.4).abs() < 1e-9);
    assert!((stats[1].mean - 0.2).abs() < 1e-9);
}

#[test]
fn test_frequency_scan_flags_saddle_point() {
    let dir = conformer_tree();
    let records = scan_frequencies(dir.path()).unwrap();
    assert_eq!(records.len(), 2);
    assert!(!records[0].has_negative);
    assert!(records[1].has_negative);
    assert_eq!(records[1].values[0], -80.0);
}

#[test]
fn test_boltzmann_from_energy_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("energies.csv");
    fs::write(&path, "conf_a,-300.0\nconf_b,-300.001\n").unwrap();

    let conformers = read_energy_file(&path).unwrap();
    let pops = boltzmann_populations(&conformers, T).unwrap();
    // 2.6255 kJ/mol lower
    assert_eq!(pops[0].name, "conf_b");
    assert!(pops[0].fraction > 0.7 && pops[0].fraction < 0.8);

    let table = format_population_table(&pops);
    assert_eq!(table.lines().count(), 3);
    assert!(table.lines().nth(1).unwrap().starts_with("conf_b\t-300.001000\t\t"));
}

#[test]
fn test_xyz_trajectory_to_pdb_files() {
    let dir = TempDir::new().unwrap();
    let xyz = dir.path().join("scan.xyz");
    let pdb = dir.path().join("base.pdb");
    fs::write(
        &xyz,
        "2\nstep 1\nC 0.0 0.0 0.0\nO 1.2 0.0 0.0\n2\nstep 2\nC 0.0 0.0 0.0\nO 1.3 0.0 0.0\n",
    )
    .unwrap();
    fs::write(
        &pdb,
        "ATOM      1  C   CO  A   1       9.000   9.000   9.000  1.00  0.00           C\n\
         ATOM      2  O   CO  A   1       9.000   9.000   9.000  1.00  0.00           O\n\
         END\n",
    )
    .unwrap();

    let prefix = dir.path().join("co");
    let written = convert_frames(&xyz, &pdb, prefix.to_str().unwrap()).unwrap();
    assert_eq!(written.len(), 2);

    let second = fs::read_to_string(&written[1]).unwrap();
    let o_line = second.lines().nth(1).unwrap();
    assert_eq!(&o_line[30..54], "   1.300   0.000   0.000");
    assert!(o_line.ends_with("O"));
}
