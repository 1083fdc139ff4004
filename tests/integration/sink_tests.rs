//! Result file output, driven through the pipeline and the CLI entry point.

use clap::Parser;
use dupefind::cli::Cli;
use dupefind::duplicates::DuplicateFinder;
use dupefind::error::ExitCode;
use dupefind::output::CsvSink;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Each line of the result file as a set of paths.
fn read_lines(path: &Path) -> Vec<BTreeSet<String>> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| line.split(',').map(str::to_string).collect())
        .collect()
}

fn cli(root: &Path, out: &Path, extra: &[&str]) -> Cli {
    let mut args: Vec<OsString> = vec!["dupefind".into(), root.into(), "-o".into(), out.into(), "-q".into()];
    args.extend(extra.iter().map(|arg| OsString::from(*arg)));
    Cli::try_parse_from(args).unwrap()
}

fn names(paths: &[&Path]) -> BTreeSet<String> {
    paths.iter().map(|p| p.to_string_lossy().into_owned()).collect()
}

#[test]
fn test_pipeline_into_sink() {
    let data = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let out = out_dir.path().join("result.csv");

    let a = data.path().join("a.txt");
    let b = data.path().join("b.txt");
    fs::write(&a, "hello").unwrap();
    fs::write(&b, "hello").unwrap();
    fs::write(data.path().join("c.txt"), "world").unwrap();

    let mut sink = CsvSink::append(&out).unwrap();
    DuplicateFinder::with_defaults()
        .find_duplicates(data.path(), |group| -> anyhow::Result<()> {
            sink.write_group(&group)?;
            Ok(())
        })
        .unwrap();

    assert_eq!(sink.groups_written(), 1);
    assert_eq!(read_lines(&out), vec![names(&[&a, &b])]);
}

#[test]
fn test_run_app_appends_and_preserves() {
    let data = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let out = out_dir.path().join("dupes.csv");
    fs::write(&out, "previous,run\n").unwrap();

    let x = data.path().join("x.bin");
    let y = data.path().join("y.bin");
    fs::write(&x, vec![0u8; 10_000]).unwrap();
    fs::write(&y, vec![0u8; 10_000]).unwrap();

    let cli = cli(data.path(), &out, &["--chunk-size", "1000"]);

    let code = dupefind::run_app(cli).unwrap();

    assert_eq!(code, ExitCode::Success);
    let lines = read_lines(&out);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], BTreeSet::from(["previous".to_string(), "run".to_string()]));
    assert_eq!(lines[1], names(&[&x, &y]));
}

#[test]
fn test_run_app_no_duplicates_still_succeeds() {
    let data = TempDir::new().unwrap();
    let out_dir = TempDir::new().unwrap();
    let out = out_dir.path().join("dupes.csv");
    fs::write(data.path().join("only"), "one file").unwrap();

    let cli = cli(data.path(), &out, &[]);

    assert_eq!(dupefind::run_app(cli).unwrap(), ExitCode::Success);
    assert_eq!(fs::read_to_string(&out).unwrap(), "");
}

#[test]
fn test_run_app_unwritable_output_fails() {
    let data = TempDir::new().unwrap();
    let out = data.path().join("no_such_dir").join("dupes.csv");

    let cli = cli(data.path(), &out, &[]);

    let err = dupefind::run_app(cli).unwrap_err();

    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
    assert!(format!("{err:#}").contains("error writing result"));
}

#[test]
fn test_run_app_missing_root_fails() {
    let out_dir = TempDir::new().unwrap();
    let out = out_dir.path().join("dupes.csv");
    let root = out_dir.path().join("does_not_exist");

    let cli = cli(&root, &out, &[]);

    let err = dupefind::run_app(cli).unwrap_err();
    assert!(err.to_string().contains("Path not found"));
}
