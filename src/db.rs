use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("gradebook.sqlite3");
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS academic_years(
            name TEXT PRIMARY KEY,
            created_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS terms(
            id TEXT PRIMARY KEY,
            academic_year TEXT NOT NULL,
            name TEXT NOT NULL,
            ordering INTEGER NOT NULL,
            FOREIGN KEY(academic_year) REFERENCES academic_years(name),
            UNIQUE(academic_year, ordering)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_terms_year ON terms(academic_year)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            level TEXT NOT NULL CHECK(level IN ('primary', 'jhs'))
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT NOT NULL CHECK(category IN ('core', 'elective')),
            level TEXT NOT NULL CHECK(level IN ('primary', 'jhs'))
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL,
            last_name TEXT NOT NULL,
            first_name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'active',
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_class ON students(class_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS class_assignments(
            student_id TEXT NOT NULL,
            academic_year TEXT NOT NULL,
            class_id TEXT NOT NULL,
            PRIMARY KEY(student_id, academic_year),
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(academic_year) REFERENCES academic_years(name),
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assessments(
            id TEXT PRIMARY KEY,
            subject_id TEXT NOT NULL,
            class_id TEXT NOT NULL,
            term_id TEXT NOT NULL,
            title TEXT NOT NULL,
            max_score REAL NOT NULL CHECK(max_score > 0),
            created_at TEXT,
            FOREIGN KEY(subject_id) REFERENCES subjects(id),
            FOREIGN KEY(class_id) REFERENCES classes(id),
            FOREIGN KEY(term_id) REFERENCES terms(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_assessments_scope ON assessments(subject_id, class_id, term_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assessment_scores(
            assessment_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            raw_score REAL NOT NULL,
            PRIMARY KEY(assessment_id, student_id),
            FOREIGN KEY(assessment_id) REFERENCES assessments(id),
            FOREIGN KEY(student_id) REFERENCES students(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_assessment_scores_student ON assessment_scores(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS scores(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            term_id TEXT NOT NULL,
            class_score REAL NOT NULL DEFAULT 0,
            exam_score REAL NOT NULL DEFAULT 0,
            total REAL NOT NULL DEFAULT 0,
            grade TEXT,
            remarks TEXT,
            updated_at TEXT,
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(subject_id) REFERENCES subjects(id),
            FOREIGN KEY(term_id) REFERENCES terms(id),
            UNIQUE(student_id, subject_id, term_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_scores_term ON scores(term_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_scores_subject_term ON scores(subject_id, term_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS promotion_records(
            student_id TEXT NOT NULL,
            academic_year TEXT NOT NULL,
            status TEXT NOT NULL,
            remarks TEXT,
            decided_by TEXT,
            decided_at TEXT,
            PRIMARY KEY(student_id, academic_year),
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(academic_year) REFERENCES academic_years(name)
        )",
        [],
    )?;

    Ok(())
}

pub fn settings_get_json(conn: &Connection, key: &str) -> rusqlite::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    // A corrupt value reads as absent rather than failing every caller.
    Ok(raw.and_then(|s| serde_json::from_str(&s).ok()))
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, value.to_string()),
    )?;
    Ok(())
}

pub fn settings_delete(conn: &Connection, key: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM settings WHERE key = ?", [key])?;
    Ok(())
}

#[cfg(test)]
pub fn table_count(conn: &Connection, table: &str) -> rusqlite::Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    conn.query_row(&sql, [], |r| r.get(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_is_idempotent() {
        let conn = open_in_memory().expect("open");
        init_schema(&conn).expect("second init");
        assert_eq!(table_count(&conn, "scores").expect("count"), 0);
    }

    #[test]
    fn settings_round_trip() {
        let conn = open_in_memory().expect("open");
        assert_eq!(settings_get_json(&conn, "teaching.model").expect("get"), None);
        settings_set_json(&conn, "teaching.model", &json!("subject_teacher")).expect("set");
        settings_set_json(&conn, "teaching.model", &json!("class_teacher")).expect("set");
        assert_eq!(
            settings_get_json(&conn, "teaching.model").expect("get"),
            Some(json!("class_teacher"))
        );
        settings_delete(&conn, "teaching.model").expect("delete");
        assert_eq!(settings_get_json(&conn, "teaching.model").expect("get"), None);
    }

    #[test]
    fn workspace_file_is_created() {
        let dir = tempfile::tempdir().expect("tempdir");
        let _conn = open_db(dir.path()).expect("open");
        assert!(dir.path().join("gradebook.sqlite3").exists());
    }
}
