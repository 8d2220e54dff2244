#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tempfile::TempDir;

pub struct Sidecar {
    pub child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    next_id: u64,
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn temp_workspace(prefix: &str) -> TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("create temp workspace")
}

pub fn spawn_sidecar() -> Sidecar {
    let exe = env!("CARGO_BIN_EXE_gradebookd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradebookd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    Sidecar {
        child,
        stdin,
        reader: BufReader::new(stdout),
        next_id: 0,
    }
}

impl Sidecar {
    pub fn send_raw(&mut self, line: &str) -> serde_json::Value {
        writeln!(self.stdin, "{}", line).expect("write request");
        self.stdin.flush().expect("flush request");
        let mut out = String::new();
        self.reader.read_line(&mut out).expect("read response line");
        assert!(!out.trim().is_empty(), "empty response for {}", line);
        serde_json::from_str(out.trim()).expect("parse response json")
    }

    pub fn request(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        self.next_id += 1;
        let id = self.next_id.to_string();
        let payload = json!({ "id": id, "method": method, "params": params });
        let value = self.send_raw(&payload.to_string());
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id.as_str()));
        value
    }

    pub fn request_ok(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or(serde_json::Value::Null)
    }

    /// Sends a request that must fail and returns its error code.
    pub fn request_err(&mut self, method: &str, params: serde_json::Value) -> String {
        let value = self.request(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .expect("error code")
            .to_string()
    }

    pub fn open_workspace(&mut self, workspace: &TempDir) {
        let _ = self.request_ok(
            "workspace.select",
            json!({ "path": workspace.path().to_string_lossy() }),
        );
    }
}

/// One JHS class with the four core subjects, three electives, four students
/// and two terms of 2024/2025.
pub fn school_batch() -> serde_json::Value {
    json!({
        "academicYears": ["2024/2025"],
        "terms": [
            { "id": "t1", "academicYear": "2024/2025", "name": "Term 1", "ordering": 1 },
            { "id": "t2", "academicYear": "2024/2025", "name": "Term 2", "ordering": 2 }
        ],
        "classes": [
            { "id": "jhs3", "name": "JHS 3", "level": "jhs" },
            { "id": "jhs2", "name": "JHS 2", "level": "jhs" }
        ],
        "subjects": [
            { "id": "eng", "name": "English Language", "category": "core", "level": "jhs" },
            { "id": "math", "name": "Mathematics", "category": "core", "level": "jhs" },
            { "id": "sci", "name": "Integrated Science", "category": "core", "level": "jhs" },
            { "id": "soc", "name": "Social Studies", "category": "core", "level": "jhs" },
            { "id": "fre", "name": "French", "category": "elective", "level": "jhs" },
            { "id": "rme", "name": "Religious and Moral Education", "category": "elective", "level": "jhs" },
            { "id": "ict", "name": "ICT", "category": "elective", "level": "jhs" }
        ],
        "students": [
            { "id": "s1", "classId": "jhs3", "lastName": "Mensah", "firstName": "Ama" },
            { "id": "s2", "classId": "jhs3", "lastName": "Owusu", "firstName": "Kofi" },
            { "id": "s3", "classId": "jhs3", "lastName": "Asante", "firstName": "Yaw" },
            { "id": "s4", "classId": "jhs3", "lastName": "Boateng", "firstName": "Efua" }
        ]
    })
}

pub fn seed_school(sidecar: &mut Sidecar) {
    let _ = sidecar.request_ok("records.sync", school_batch());
}

pub fn f64_at(v: &serde_json::Value, pointer: &str) -> f64 {
    v.pointer(pointer)
        .and_then(|x| x.as_f64())
        .unwrap_or_else(|| panic!("missing number at {} in {}", pointer, v))
}

pub fn str_at<'a>(v: &'a serde_json::Value, pointer: &str) -> &'a str {
    v.pointer(pointer)
        .and_then(|x| x.as_str())
        .unwrap_or_else(|| panic!("missing string at {} in {}", pointer, v))
}
