//! End-to-end tests for the traceflow binary.
//!
//! Each test runs inside its own temporary directory so no configuration
//! file from the developer's working tree is picked up.

use std::process::{Command, Output};

use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

const TRACE: &str = "\
[10][Client][cli.c:12] sent Hello(id=7) to Server
[11][Server][srv.c:20] received Hello(id=7) from Client
[12][Server][srv.c:21] called Server::handle(mode=fast)
[13][Server][srv.c:22] created Session
[14][Server][srv.c:23] state Busy
this line is not a trace
[15][Server][srv.c:24] deleted Cache
[16][Server][srv.c:25] returned from Server::handle()
[17][Server][srv.c:26] returned from Server::handle()
";

fn run(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_traceflow"))
        .current_dir(dir.path())
        .args(args)
        .output()
        .expect("Failed to run traceflow")
}

#[test]
fn generate_writes_document_without_rendering() {
    let temp = TempDir::new().unwrap();
    temp.child("trace.log").write_str(TRACE).unwrap();

    let output = run(&temp, &["generate", "-i", "trace.log", "--no-render"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let document = temp.child("trace.fdl");
    document.assert(predicate::path::exists());
    document.assert(predicate::str::starts_with("#include <stdinc.FDL>\n\n"));
    document.assert(predicate::str::contains("eternal: Client, Server, System\n"));
    document.assert(predicate::str::contains("dynamic: Session, Cache\n"));
    document.assert(predicate::str::contains("    create Cache\n"));
    document.assert(predicate::str::contains(
        "    Hello(\"id\" = \"7\"): Client -> Server\n    (* 10 cli.c:12 *)\n",
    ));
    document.assert(predicate::str::contains(
        "    System invokes Server.handle(\"mode\" = \"fast\")\n",
    ));
    document.assert(predicate::str::contains("    Server creates Session\n"));
    document.assert(predicate::str::contains("    Server state = \"Busy\"\n"));
    document.assert(predicate::str::contains("    Server.handle returns\n"));
    document.assert(predicate::str::contains("not a trace").not());
    document.assert(predicate::str::ends_with("}\n"));

    // The second return has no open invocation
    let content = std::fs::read_to_string(document.path()).unwrap();
    assert_eq!(content.matches("returns").count(), 1);

    temp.child("project.scn.json")
        .assert(predicate::str::contains("\"modelPath\": \"trace.fdl\""));
}

#[test]
fn config_file_drives_bookmarks_and_groups() {
    let temp = TempDir::new().unwrap();
    temp.child("trace.log").write_str(TRACE).unwrap();
    temp.child("traceflow.toml")
        .write_str(
            r#"
[trace]
traced_entity = "Main"

[format]
bookmarks = ["Hello"]

[entities.parents]
Client = "Frontend"
Server = "Backend"
"#,
        )
        .unwrap();

    let output = run(&temp, &["generate", "-i", "trace.log", "-o", "out/flow.fdl", "--no-render"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let document = temp.child("out/flow.fdl");
    document.assert(predicate::str::contains("component: \"Frontend\", \"Backend\"\n"));
    document.assert(predicate::str::contains("component: \"Component\"\n"));
    document.assert(predicate::str::contains("\"Main\" in \"Component\""));
    document.assert(predicate::str::contains(
        "    heading \"Hello\"\n    Hello(\"id\" = \"7\"): Client -> Server\n",
    ));
    temp.child("out/project.scn.json").assert(predicate::path::exists());
}

#[test]
fn init_then_check_succeeds() {
    let temp = TempDir::new().unwrap();

    let output = run(&temp, &["init"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    temp.child("Traceflow.toml")
        .assert(predicate::str::contains("line_regex"));

    let output = run(&temp, &["check", "--strict"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn check_rejects_unknown_handler() {
    let temp = TempDir::new().unwrap();
    temp.child("broken.toml")
        .write_str(
            r#"
[trace.mapping]
received = "NoSuchHandler"
"#,
        )
        .unwrap();

    let output = run(&temp, &["--config", "broken.toml", "check"]);
    assert!(!output.status.success());
}

#[test]
fn template_mismatch_fails_generation() {
    let temp = TempDir::new().unwrap();
    temp.child("trace.log").write_str(TRACE).unwrap();
    temp.child("traceflow.toml")
        .write_str(
            r#"
[templates]
state_change = "{{ object }} is {{ mood }}"
"#,
        )
        .unwrap();

    let output = run(&temp, &["generate", "-i", "trace.log", "--no-render"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("state_change"), "{}", stderr);
}
