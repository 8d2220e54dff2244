mod test_support;

use serde_json::json;
use test_support::{f64_at, seed_school, spawn_sidecar, temp_workspace};

#[test]
fn deleting_a_year_cascades_and_clears_current_term() {
    let workspace = temp_workspace("gradebook-years");
    let mut sidecar = spawn_sidecar();
    sidecar.open_workspace(&workspace);
    seed_school(&mut sidecar);
    let _ = sidecar.request_ok(
        "records.sync",
        json!({
            "academicYears": ["2025/2026"],
            "terms": [{ "id": "n1", "academicYear": "2025/2026", "name": "Term 1", "ordering": 1 }]
        }),
    );
    let _ = sidecar.request_ok("terms.setCurrent", json!({ "termId": "t1" }));

    for (term, subject) in [("t1", "eng"), ("t1", "math"), ("t2", "eng"), ("n1", "eng")] {
        let _ = sidecar.request_ok(
            "scores.upsert",
            json!({ "studentId": "s1", "subjectId": subject, "termId": term, "classScore": 20, "examScore": 30 }),
        );
    }
    let a = sidecar.request_ok(
        "assessments.create",
        json!({ "subjectId": "eng", "classId": "jhs3", "title": "Quiz", "maxScore": 10 }),
    );
    let _ = sidecar.request_ok(
        "assessmentScores.set",
        json!({ "assessmentId": a["assessment"]["id"], "entries": [{ "studentId": "s1", "rawScore": 8 }] }),
    );
    let _ = sidecar.request_ok(
        "promotion.decide",
        json!({ "studentId": "s1", "academicYear": "2024/2025", "status": "promoted" }),
    );

    let out = sidecar.request_ok("years.delete", json!({ "academicYear": "2024/2025" }));
    assert_eq!(f64_at(&out, "/terms"), 2.0);
    assert_eq!(f64_at(&out, "/scores"), 3.0);
    assert_eq!(f64_at(&out, "/assessments"), 1.0);
    assert_eq!(f64_at(&out, "/assessmentScores"), 1.0);
    assert_eq!(f64_at(&out, "/promotionRecords"), 1.0);
    assert_eq!(out["clearedCurrentTerm"].as_bool(), Some(true));

    let years = sidecar.request_ok("years.list", json!({}));
    assert_eq!(years["years"], json!([{ "name": "2025/2026", "termCount": 1, "decidedCount": 0 }]));

    let settings = sidecar.request_ok("settings.get", json!({}));
    assert!(settings["currentTerm"].is_null());
    assert_eq!(
        sidecar.request_err("scores.sheet", json!({ "classId": "jhs3", "subjectId": "eng" })),
        "config_missing"
    );
    assert_eq!(
        sidecar.request_err("years.delete", json!({ "academicYear": "2024/2025" })),
        "not_found"
    );
}
