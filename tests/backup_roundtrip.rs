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

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_crcalcd");
    let mut child = Command::new(exe)
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
fn json_export_clear_import_restores_data() {
    let workspace = temp_dir("crcalc-json-backup");
    let out_dir = temp_dir("crcalc-json-backup-out");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "subjects.create",
        json!({ "name": "Algebra", "score": 80, "credits": 4 }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "partials.create",
        json!({ "name": "Fisica I", "credits": 3, "mode": "medias" }),
    );
    request_ok(&mut stdin, &mut reader, "4", "calcMode.set", json!({ "mode": "parcial" }));

    let info = request_ok(&mut stdin, &mut reader, "5", "storage.info", json!({}));
    assert_eq!(info["hasData"], json!(true));
    assert_eq!(info["subjectsCount"], json!(1));
    assert_eq!(info["partialsCount"], json!(1));
    assert!(info["lastModified"].is_string());

    // A directory target gets the dated default file name.
    let export = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "storage.exportJson",
        json!({ "path": out_dir.to_string_lossy() }),
    );
    let backup_path = PathBuf::from(export["path"].as_str().expect("path"));
    let file_name = backup_path
        .file_name()
        .and_then(|n| n.to_str())
        .expect("file name")
        .to_string();
    assert!(file_name.starts_with("backup-calculadora-cr-"));
    assert!(file_name.ends_with(".json"));
    assert_eq!(export["keysWritten"], json!(3));

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&backup_path).expect("read backup"))
            .expect("backup json");
    assert_eq!(doc["version"], json!("1.0"));
    assert!(doc["timestamp"].is_string());
    assert!(doc["disciplinas"].is_string());
    assert!(doc["periodos"].is_null());

    let cleared = request_ok(&mut stdin, &mut reader, "7", "storage.clear", json!({}));
    assert_eq!(cleared["info"]["hasData"], json!(false));
    let mode = request_ok(&mut stdin, &mut reader, "8", "calcMode.get", json!({}));
    assert_eq!(mode["mode"], json!("periodo"));

    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "storage.importJson",
        json!({ "path": backup_path.to_string_lossy() }),
    );
    assert_eq!(imported["info"]["subjectsCount"], json!(1));
    let subjects = request_ok(&mut stdin, &mut reader, "10", "subjects.list", json!({}));
    assert_eq!(subjects["subjects"][0]["name"], json!("Algebra"));
    let mode = request_ok(&mut stdin, &mut reader, "11", "calcMode.get", json!({}));
    assert_eq!(mode["mode"], json!("parcial"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn json_import_rejects_files_without_version_or_timestamp() {
    let workspace = temp_dir("crcalc-json-bad");
    let bad = workspace.join("bad.json");
    std::fs::write(&bad, r#"{ "disciplinas": "[]" }"#).expect("write bad backup");
    let browser = workspace.join("browser.json");
    std::fs::write(
        &browser,
        json!({
            "disciplinas": "[{\"id\":\"1700000000000x\",\"nome\":\"Quimica\",\"nota\":72,\"creditos\":2}]",
            "disciplinasParciais": null,
            "tipoCalculo": "\"periodo\"",
            "timestamp": "2024-05-01T12:00:00.000Z",
            "version": "1.0"
        })
        .to_string(),
    )
    .expect("write browser backup");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let rejected = request(
        &mut stdin,
        &mut reader,
        "2",
        "storage.importJson",
        json!({ "path": bad.to_string_lossy() }),
    );
    assert_eq!(rejected["error"]["code"], json!("bad_backup"));

    let missing = request(
        &mut stdin,
        &mut reader,
        "3",
        "storage.importJson",
        json!({ "path": workspace.join("nope.json").to_string_lossy() }),
    );
    assert_eq!(missing["error"]["code"], json!("not_found"));

    request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "storage.importJson",
        json!({ "path": browser.to_string_lossy() }),
    );
    let computed = request_ok(&mut stdin, &mut reader, "5", "results.compute", json!({}));
    assert_eq!(computed["result"]["mean"].as_f64(), Some(72.0));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
