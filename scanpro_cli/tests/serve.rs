use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::tempdir;

struct KillOnDrop(Child);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn wait_for_listener(port: u16) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while TcpStream::connect(("127.0.0.1", port)).is_err() {
        assert!(Instant::now() < deadline, "service did not start on {port}");
        std::thread::sleep(Duration::from_millis(50));
    }
}

#[test]
fn scan_classifies_through_a_served_classifier() {
    let port = free_port();
    let server = KillOnDrop(
        Command::cargo_bin("scanpro")
            .unwrap()
            .args(["serve", "--bind", &format!("127.0.0.1:{port}")])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap(),
    );
    wait_for_listener(port);

    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(
        &cfg,
        format!(
            r#"
[stage]
x_travel_mm = 10.0
y_travel_mm = 20.0
reset_margin_mm = 1.0
steps_per_mm = 1.0

[timing]
step_delay_us = 100
row_stop_timeout_ms = 2000

[classifier]
mode = "remote"
endpoint = "http://127.0.0.1:{port}/analyze"
timeout_ms = 5000

[output]
image_dir = "{}"
width_px = 40
height_px = 40
"#,
            dir.path().join("heatmaps").display()
        ),
    )
    .unwrap();

    let out = Command::cargo_bin("scanpro")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .args(["scan", "--rate", "1000", "--pitch", "10"])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value =
        serde_json::from_str(String::from_utf8(out.stdout).unwrap().trim()).unwrap();
    assert!(v["classification_error"].is_null(), "{v}");
    assert!(v["classification"]["object"].is_string());
    drop(server);
}

#[test]
fn serve_rejects_a_malformed_bind_address() {
    Command::cargo_bin("scanpro")
        .unwrap()
        .args(["serve", "--bind", "localhost"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid service address"));
}

#[test]
fn serve_reports_an_address_in_use() {
    let taken = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = taken.local_addr().unwrap();
    Command::cargo_bin("scanpro")
        .unwrap()
        .args(["serve", "--bind", &addr.to_string()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(format!("bind {addr}")));
}
