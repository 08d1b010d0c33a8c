//! Idempotent schema bootstrap.
//!
//! Every statement is safe to run on each startup, against an empty database
//! or one created by the earlier release. That release stored the password in
//! `users.password`, used `TIMESTAMP` columns holding UTC wall time and left
//! `role`, `status` and `created_at` nullable; the reconcile steps at the end
//! bring such a database to the shape the models decode.

use crate::connection::DatabasePool;
use crate::error::{DatabaseError, DatabaseResult};
use tracing::{debug, info};

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id SERIAL PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        name TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'DOCTOR',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS patients (
        id SERIAL PRIMARY KEY,
        jkn_number TEXT UNIQUE,
        name TEXT NOT NULL,
        dob DATE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS consultations (
        id SERIAL PRIMARY KEY,
        doctor_id INTEGER NOT NULL REFERENCES users(id),
        patient_id INTEGER NOT NULL REFERENCES patients(id),
        diagnosis TEXT,
        transcription TEXT,
        ina_cbg_code TEXT,
        status TEXT NOT NULL DEFAULT 'PENDING',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    // Columns added after the first release
    "ALTER TABLE patients ALTER COLUMN jkn_number DROP NOT NULL",
    "ALTER TABLE patients ADD COLUMN IF NOT EXISTS dob DATE",
    "ALTER TABLE consultations ADD COLUMN IF NOT EXISTS notes_html TEXT",
    "ALTER TABLE consultations ADD COLUMN IF NOT EXISTS ai_diagnosis JSONB",
    "ALTER TABLE consultations ADD COLUMN IF NOT EXISTS ai_generated_at TIMESTAMPTZ",
    "ALTER TABLE consultations ADD COLUMN IF NOT EXISTS ai_model TEXT",
    "CREATE INDEX IF NOT EXISTS idx_consultations_created_at ON consultations (created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_patients_created_at ON patients (created_at DESC)",
    // Reconcile databases created by the earlier release
    r#"
    DO $$
    BEGIN
        IF EXISTS (
            SELECT 1 FROM information_schema.columns
            WHERE table_schema = current_schema()
              AND table_name = 'users' AND column_name = 'password'
        ) AND NOT EXISTS (
            SELECT 1 FROM information_schema.columns
            WHERE table_schema = current_schema()
              AND table_name = 'users' AND column_name = 'password_hash'
        ) THEN
            ALTER TABLE users RENAME COLUMN password TO password_hash;
        END IF;
    END $$
    "#,
    r#"
    DO $$
    DECLARE
        col RECORD;
    BEGIN
        FOR col IN
            SELECT table_name::text AS tbl, column_name::text AS name
            FROM information_schema.columns
            WHERE table_schema = current_schema()
              AND data_type = 'timestamp without time zone'
              AND (table_name::text, column_name::text) IN (
                  ('users', 'created_at'),
                  ('patients', 'created_at'),
                  ('consultations', 'created_at'),
                  ('consultations', 'ai_generated_at')
              )
        LOOP
            EXECUTE format(
                'ALTER TABLE %I ALTER COLUMN %I TYPE TIMESTAMPTZ USING %I AT TIME ZONE ''UTC''',
                col.tbl, col.name, col.name
            );
        END LOOP;
    END $$
    "#,
    "UPDATE users SET role = 'DOCTOR' WHERE role IS NULL",
    "UPDATE users SET created_at = NOW() WHERE created_at IS NULL",
    "UPDATE patients SET created_at = NOW() WHERE created_at IS NULL",
    "UPDATE consultations SET status = 'PENDING' WHERE status IS NULL",
    "UPDATE consultations SET created_at = NOW() WHERE created_at IS NULL",
    "ALTER TABLE users ALTER COLUMN role SET NOT NULL",
    "ALTER TABLE users ALTER COLUMN created_at SET NOT NULL",
    "ALTER TABLE patients ALTER COLUMN created_at SET NOT NULL",
    "ALTER TABLE consultations ALTER COLUMN status SET NOT NULL",
    "ALTER TABLE consultations ALTER COLUMN created_at SET NOT NULL",
];

/// Apply the bootstrap statements in order.
pub async fn bootstrap(db: &DatabasePool) -> DatabaseResult<()> {
    for (index, statement) in STATEMENTS.iter().enumerate() {
        debug!(step = index, "Applying schema statement");
        sqlx::query(statement)
            .execute(db.pool())
            .await
            .map_err(|e| DatabaseError::MigrationError(format!("step {}: {}", index, e)))?;
    }
    info!(statements = STATEMENTS.len(), "Database schema is up to date");
    Ok(())
}
