use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn ascan_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("ascan");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();
    fs::create_dir_all(root.join("files")).unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/ascan.sqlite"

[storage]
upload_dir = "{root}/uploads"
max_upload_mb = 5

[enrichment]
provider = "disabled"

[server]
bind = "127.0.0.1:7341"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("ascan.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn write_docx(path: &Path, paragraphs: &[&str]) {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        "<w:document xmlns:w=\"w\"><w:body>{}</w:body></w:document>",
        body
    );
    let file = fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
        .unwrap();
    zip.write_all(xml.as_bytes()).unwrap();
    zip.finish().unwrap();
}

fn run_ascan(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = ascan_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run ascan binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// Value of a `key: value` line in a printed record.
fn field<'a>(stdout: &'a str, key: &str) -> Option<&'a str> {
    stdout.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        (k.trim() == key).then(|| v.trim())
    })
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ascan(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));

    let (_, _, success2) = run_ascan(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_scan_resume_docx() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("files").join("resume.docx");
    write_docx(
        &file,
        &["Work Experience", "Skills", "Education", "Contact details"],
    );

    run_ascan(&config_path, &["init"]);
    let (stdout, stderr, success) =
        run_ascan(&config_path, &["scan", file.to_str().unwrap()]);
    assert!(success, "scan failed: stdout={}, stderr={}", stdout, stderr);

    assert_eq!(field(&stdout, "status"), Some("Completed"));
    assert_eq!(field(&stdout, "accessibility_score"), Some("100"));
    assert_eq!(field(&stdout, "ats_score"), Some("100"));
    assert_eq!(field(&stdout, "error_count"), Some("0"));

    // The source file is untouched; the stored copy is removed.
    assert!(file.exists());
    let uploads = tmp.path().join("uploads");
    assert_eq!(fs::read_dir(&uploads).unwrap().count(), 0);
}

#[test]
fn test_scan_flags_image_mentions() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("files").join("deck.docx");
    write_docx(&file, &["Our team image", "Experience"]);

    let (stdout, stderr, success) =
        run_ascan(&config_path, &["scan", file.to_str().unwrap()]);
    assert!(success, "scan failed: stdout={}, stderr={}", stdout, stderr);

    // 100 - 5 + 25 * 0.1 = 97.5, then -5 for A1 = 92.5, rounded.
    assert_eq!(field(&stdout, "accessibility_score"), Some("93"));
    assert_eq!(field(&stdout, "ats_score"), Some("25"));
    assert_eq!(field(&stdout, "error_count"), Some("1"));
    assert!(stdout.contains("[A1]"));
}

#[test]
fn test_scan_rejects_unsupported_type() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("files").join("notes.txt");
    fs::write(&file, "Experience and skills").unwrap();

    let (_, stderr, success) = run_ascan(&config_path, &["scan", file.to_str().unwrap()]);
    assert!(!success, "a .txt upload must be rejected");
    assert!(stderr.contains("Only PDF, DOCX, PPTX, and image files are allowed"));

    let (stdout, _, _) = run_ascan(&config_path, &["history"]);
    assert!(stdout.contains("No analyses"));
}

#[test]
fn test_scan_url_rejects_invalid_url() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_ascan(&config_path, &["scan-url", "example.com"]);
    assert!(!success);
    assert!(stderr.contains("must start with http"));

    let (stdout, _, _) = run_ascan(&config_path, &["history"]);
    assert!(stdout.contains("No analyses"));
}

#[test]
fn test_history_report_delete_roundtrip() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("files").join("cv.docx");
    write_docx(&file, &["Skills"]);

    let (stdout, _, success) = run_ascan(
        &config_path,
        &["scan", file.to_str().unwrap(), "--owner", "alice"],
    );
    assert!(success);
    let id = field(&stdout, "id").unwrap().to_string();

    let (stdout, _, _) = run_ascan(&config_path, &["history", "--owner", "alice"]);
    assert!(stdout.contains(&id));
    assert!(stdout.contains("cv.docx"));

    let (stdout, _, _) = run_ascan(&config_path, &["history", "--owner", "bob"]);
    assert!(!stdout.contains(&id));

    let (stdout, _, success) = run_ascan(&config_path, &["report", &id, "--owner", "alice"]);
    assert!(success);
    assert_eq!(field(&stdout, "ats_score"), Some("25"));

    // Another owner can neither read nor delete it.
    let (_, _, success) = run_ascan(&config_path, &["report", &id, "--owner", "bob"]);
    assert!(!success);
    let (_, _, success) = run_ascan(&config_path, &["delete", &id, "--owner", "bob"]);
    assert!(!success);
    let (_, _, success) = run_ascan(&config_path, &["report", &id, "--owner", "alice"]);
    assert!(success, "record must survive a foreign delete");

    let (stdout, _, success) = run_ascan(&config_path, &["delete", &id, "--owner", "alice"]);
    assert!(success);
    assert!(stdout.contains("Deleted"));

    let (_, _, success) = run_ascan(&config_path, &["report", &id, "--owner", "alice"]);
    assert!(!success);
}

#[test]
fn test_report_unknown_id_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_ascan(&config_path, &["init"]);

    let (_, stderr, success) = run_ascan(&config_path, &["report", "no-such-id"]);
    assert!(!success);
    assert!(stderr.contains("not found"));
}

#[test]
fn test_scan_with_unusable_database_leaves_no_upload() {
    let (tmp, config_path) = setup_test_env();
    // The database directory is a regular file, so the store cannot open.
    fs::write(tmp.path().join("data").join("blocker"), "").unwrap();
    let config = fs::read_to_string(&config_path)
        .unwrap()
        .replace("/data/ascan.sqlite", "/data/blocker/ascan.sqlite");
    fs::write(&config_path, config).unwrap();

    let file = tmp.path().join("files").join("resume.docx");
    write_docx(&file, &["Experience"]);

    let (_, _, success) = run_ascan(&config_path, &["scan", file.to_str().unwrap()]);
    assert!(!success, "scan must fail when the database cannot be opened");

    let uploads = tmp.path().join("uploads");
    let leftovers = fs::read_dir(&uploads).map(|d| d.count()).unwrap_or(0);
    assert_eq!(leftovers, 0, "no artifact may remain in the upload directory");
}
