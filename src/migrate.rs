use anyhow::Result;
use std::path::Path;

use crate::db;

/// Tables of the question bank, in dependency order.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS modules (
        module_id TEXT PRIMARY KEY CHECK (module_id GLOB '[0-9][0-9][0-9][0-9]' AND length(module_id) = 4),
        module_name TEXT NOT NULL CHECK (length(module_name) <= 10),
        module_type TEXT CHECK (module_type IN ('知识', '思想', '模型'))
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tags (
        tag_id TEXT PRIMARY KEY CHECK (tag_id GLOB '[0-9][0-9][0-9][0-9][0-9]' AND length(tag_id) = 5),
        module_id TEXT NOT NULL REFERENCES modules(module_id),
        tag_name TEXT NOT NULL CHECK (length(tag_name) <= 25),
        tag_intro TEXT CHECK (length(tag_intro) <= 100)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS items (
        item_id TEXT PRIMARY KEY CHECK (item_id GLOB '*[0-9A-Za-z-]*' AND length(item_id) <= 64 AND item_id NOT GLOB '*[^0-9A-Za-z-]*'),
        item_level INTEGER CHECK (item_level IN (1, 2, 3, 4)),
        item_usage TEXT CHECK (item_usage IN ('例', '练') OR item_usage IS NULL),
        item_intro TEXT CHECK (length(item_intro) <= 200)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS item_tag_relations (
        item_id TEXT NOT NULL REFERENCES items(item_id) ON DELETE CASCADE,
        tag_id TEXT NOT NULL REFERENCES tags(tag_id) ON DELETE CASCADE,
        PRIMARY KEY (item_id, tag_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS students (
        student_id TEXT PRIMARY KEY CHECK (student_id GLOB '[0-9][0-9][0-9][0-9][0-9][0-9]' AND length(student_id) = 6),
        student_name TEXT NOT NULL CHECK (length(student_name) <= 10)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS student_item_relations (
        student_id TEXT NOT NULL REFERENCES students(student_id),
        item_id TEXT NOT NULL REFERENCES items(item_id),
        date_created TEXT NOT NULL,
        PRIMARY KEY (student_id, item_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS clusters (
        cluster_id TEXT PRIMARY KEY CHECK (cluster_id GLOB '[0-9][0-9][0-9][0-9][0-9][0-9]' AND length(cluster_id) = 6),
        cluster_name TEXT NOT NULL CHECK (length(cluster_name) <= 20),
        cluster_intro TEXT CHECK (length(cluster_intro) <= 100),
        module_id TEXT NOT NULL REFERENCES modules(module_id),
        tag_id TEXT REFERENCES tags(tag_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS groups (
        group_id TEXT PRIMARY KEY CHECK (group_id GLOB '[0-9][0-9][0-9][0-9][0-9][0-9]' AND length(group_id) = 6),
        group_name TEXT NOT NULL CHECK (length(group_name) <= 20),
        group_level TEXT CHECK (group_level IN ('基础', '进阶', '疯狂', '暴躁')),
        cluster_id TEXT NOT NULL REFERENCES clusters(cluster_id),
        group_intro TEXT CHECK (length(group_intro) <= 100)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS group_examples (
        group_id TEXT NOT NULL REFERENCES groups(group_id) ON DELETE CASCADE,
        item_id TEXT NOT NULL REFERENCES items(item_id),
        PRIMARY KEY (group_id, item_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS group_exercises (
        group_id TEXT NOT NULL REFERENCES groups(group_id) ON DELETE CASCADE,
        item_id TEXT NOT NULL REFERENCES items(item_id),
        PRIMARY KEY (group_id, item_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS TF_questions (
        TF_question_id TEXT PRIMARY KEY CHECK (TF_question_id GLOB 'TF[0-9][0-9][0-9][0-9][0-9]' AND length(TF_question_id) = 7),
        TF_question_text TEXT NOT NULL CHECK (length(TF_question_text) <= 100),
        TF_question_ans BOOLEAN NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS TF_tag_relations (
        tag_id TEXT NOT NULL REFERENCES tags(tag_id),
        TF_question_id TEXT NOT NULL REFERENCES TF_questions(TF_question_id) ON DELETE CASCADE,
        PRIMARY KEY (tag_id, TF_question_id)
    )
    "#,
];

/// Creates the database file and every table. Safe to run repeatedly.
pub async fn run_migrations(db_path: &Path) -> Result<()> {
    let pool = db::connect(db_path, true).await?;

    for statement in SCHEMA {
        sqlx::query(statement).execute(&pool).await?;
    }

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_item_tag_relations_tag ON item_tag_relations(tag_id)")
        .execute(&pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_student_item_relations_item ON student_item_relations(item_id)",
    )
    .execute(&pool)
    .await?;

    pool.close().await;
    Ok(())
}
