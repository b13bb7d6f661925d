use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar(workspace: Option<&PathBuf>) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_crcalcd");
    let mut cmd = Command::new(exe);
    if let Some(ws) = workspace {
        cmd.arg("--workspace").arg(ws);
    }
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn crcalcd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    serde_json::from_str(line.trim()).expect("parse response json")
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_default()
}

#[test]
fn bundle_moves_a_workspace_between_directories() {
    let source = temp_dir("crcalc-bundle-ipc-src");
    let target = temp_dir("crcalc-bundle-ipc-dst");
    let bundle_path = source.join("export").join("workspace.crcalc.zip");

    // Workspace opened from the command line.
    let (mut child, mut stdin, mut reader) = spawn_sidecar(Some(&source));
    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health["workspacePath"].is_string());

    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "subjects.create",
        json!({ "name": "Algebra", "score": 91, "credits": 4 }),
    );
    let export = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "workspace.exportBundle",
        json!({ "outPath": bundle_path.to_string_lossy() }),
    );
    assert_eq!(export["bundleFormat"], json!("crcalc-workspace-v1"));
    assert!(bundle_path.is_file());
    drop(stdin);
    let _ = child.wait();

    let (mut child, mut stdin, mut reader) = spawn_sidecar(None);
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": target.to_string_lossy() }),
    );
    let empty = request_ok(&mut stdin, &mut reader, "2", "subjects.list", json!({}));
    assert_eq!(empty["subjects"], json!([]));

    let missing = request(
        &mut stdin,
        &mut reader,
        "3",
        "workspace.importBundle",
        json!({ "inPath": target.join("nope.zip").to_string_lossy() }),
    );
    assert_eq!(missing["error"]["code"], json!("not_found"));

    let import = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "workspace.importBundle",
        json!({ "inPath": bundle_path.to_string_lossy() }),
    );
    assert_eq!(import["bundleFormatDetected"], json!("crcalc-workspace-v1"));

    let restored = request_ok(&mut stdin, &mut reader, "5", "subjects.list", json!({}));
    assert_eq!(restored["subjects"][0]["name"], json!("Algebra"));
    assert_eq!(restored["subjects"][0]["score"].as_f64(), Some(91.0));

    let junk = target.join("junk.bin");
    std::fs::write(&junk, b"definitely not a backup").expect("write junk");
    let rejected = request(
        &mut stdin,
        &mut reader,
        "6",
        "workspace.importBundle",
        json!({ "inPath": junk.to_string_lossy() }),
    );
    assert_eq!(rejected["error"]["code"], json!("bad_backup"));
    // The previous database stays usable after a rejected import.
    let still = request_ok(&mut stdin, &mut reader, "7", "subjects.list", json!({}));
    assert_eq!(still["subjects"].as_array().map(|a| a.len()), Some(1));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(source);
    let _ = std::fs::remove_dir_all(target);
}
