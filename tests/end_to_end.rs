//! Black-box integration tests that build flow files in a temp directory
//! and drive the evaluator through the public API — no mocking, real
//! subprocesses, matching the style of a builder crate's own pipeline
//! test suite.

use std::fs;
use std::io::Read;

use tempfile::TempDir;

use flowsh::eval::Evaluator;
use flowsh::parse::parse_flow_file;

fn write_flow(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("flow.txt");
    fs::write(&path, contents).unwrap();
    path
}

fn evaluate_to_string(flow: &std::path::Path, component: &str) -> Result<String, String> {
    let catalog = parse_flow_file(flow).map_err(|e| e.to_string())?;
    let mut evaluator = Evaluator::new(&catalog);
    let mut output = tempfile::tempfile().unwrap();
    evaluator
        .evaluate(component, &output)
        .map_err(|e| e.to_string())?;
    use std::io::Seek;
    output.seek(std::io::SeekFrom::Start(0)).unwrap();
    let mut s = String::new();
    output.read_to_string(&mut s).unwrap();
    Ok(s)
}

#[test]
fn node_runs_a_shell_command() {
    let dir = TempDir::new().unwrap();
    let flow = write_flow(&dir, "node=hello\ncommand=echo -n hello\n");
    assert_eq!(evaluate_to_string(&flow, "hello").unwrap(), "hello");
}

#[test]
fn file_source_emits_its_contents() {
    let dir = TempDir::new().unwrap();
    let data_path = dir.path().join("data.txt");
    fs::write(&data_path, "file contents\n").unwrap();
    let flow = write_flow(
        &dir,
        &format!("file=src\nname={}\n", data_path.to_str().unwrap()),
    );
    assert_eq!(evaluate_to_string(&flow, "src").unwrap(), "file contents\n");
}

#[test]
fn simple_pipe_through_tr() {
    let dir = TempDir::new().unwrap();
    let flow = write_flow(
        &dir,
        "node=src\ncommand=printf lower\n\
         node=upper\ncommand=tr a-z A-Z\n\
         pipe=p\nfrom=src\nto=upper\n",
    );
    assert_eq!(evaluate_to_string(&flow, "p").unwrap(), "LOWER");
}

#[test]
fn concatenation_preserves_order() {
    let dir = TempDir::new().unwrap();
    let flow = write_flow(
        &dir,
        "node=a\ncommand=printf A\n\
         node=b\ncommand=printf B\n\
         node=c\ncommand=printf C\n\
         concatenate=abc\nparts=3\npart_0=a\npart_1=b\npart_2=c\n",
    );
    assert_eq!(evaluate_to_string(&flow, "abc").unwrap(), "ABC");
}

#[test]
fn stderr_wrapper_captures_merged_streams() {
    let dir = TempDir::new().unwrap();
    let flow = write_flow(
        &dir,
        "node=noisy\ncommand=printf out; printf err 1>&2\n\
         stderr=captured\nfrom=noisy\n",
    );
    let out = evaluate_to_string(&flow, "captured").unwrap();
    assert!(out.contains("out"));
    assert!(out.contains("err"));
}

#[test]
fn pipe_to_file_writes_sink() {
    let dir = TempDir::new().unwrap();
    let sink_path = dir.path().join("out.txt");
    let flow = write_flow(
        &dir,
        &format!(
            "node=src\ncommand=printf piped\n\
             file=sink\nname={}\n\
             pipe=p\nfrom=src\nto=sink\n",
            sink_path.to_str().unwrap()
        ),
    );
    let catalog = parse_flow_file(&flow).unwrap();
    let mut evaluator = Evaluator::new(&catalog);
    let devnull = fs::OpenOptions::new().write(true).open("/dev/null").unwrap();
    evaluator.evaluate("p", &devnull).unwrap();
    assert_eq!(fs::read_to_string(&sink_path).unwrap(), "piped");
}

#[test]
fn cycle_is_detected() {
    let dir = TempDir::new().unwrap();
    let flow = write_flow(
        &dir,
        "concatenate=a\nparts=1\npart_0=b\n\
         concatenate=b\nparts=1\npart_0=a\n",
    );
    let err = evaluate_to_string(&flow, "a").unwrap_err();
    assert!(err.contains("Cyclic dependency") || err.to_lowercase().contains("cycl"));
}

#[test]
fn child_failure_propagates() {
    let dir = TempDir::new().unwrap();
    let flow = write_flow(&dir, "node=bad\ncommand=false\n");
    let err = evaluate_to_string(&flow, "bad").unwrap_err();
    assert!(err.contains("failed"));
}

#[test]
fn unknown_component_is_reported() {
    let dir = TempDir::new().unwrap();
    let flow = write_flow(&dir, "node=a\ncommand=true\n");
    let err = evaluate_to_string(&flow, "does-not-exist").unwrap_err();
    assert!(err.contains("unknown") || err.to_lowercase().contains("unknown"));
}
