//! SQL schema for the admissions SQLite store.
//!
//! Executed once at connection startup. Every applicant table is keyed by
//! `user_code` (plus an attempt or institution number where an applicant
//! can have several) and carries `created_at`/`updated_at`, where
//! `updated_at` only moves when a tracked column actually changes.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Admissions cycles. Created lazily by uploads, never deleted.
CREATE TABLE IF NOT EXISTS sessions (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    program_code   TEXT    NOT NULL,
    program        TEXT    NOT NULL,
    session_abbrev TEXT    NOT NULL,
    year           INTEGER NOT NULL,
    campus         TEXT    NOT NULL,
    name           TEXT    NOT NULL,
    created_at     TEXT    NOT NULL,
    UNIQUE (program_code, year, session_abbrev, campus)
);

CREATE TABLE IF NOT EXISTS applicant_info (
    user_code           TEXT PRIMARY KEY,
    session_id          INTEGER REFERENCES sessions(id),
    family_name         TEXT,
    given_name          TEXT,
    middle_name         TEXT,
    preferred_name      TEXT,
    email               TEXT,
    phone               TEXT,
    address_line        TEXT,
    city                TEXT,
    province            TEXT,
    postal_code         TEXT,
    country             TEXT,
    birth_date          TEXT,
    age                 INTEGER,
    gender              TEXT,
    citizenship_country TEXT,
    citizenship_status  TEXT,
    dual_citizenship    TEXT,
    is_domestic         INTEGER NOT NULL DEFAULT 0,
    created_at          TEXT    NOT NULL,
    updated_at          TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS applicant_status (
    user_code              TEXT PRIMARY KEY REFERENCES applicant_info(user_code),
    application_start_date TEXT,
    submit_date            TEXT,
    status_code            TEXT,
    detailed_status        TEXT,
    created_at             TEXT NOT NULL,
    updated_at             TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS institution_info (
    user_code          TEXT    NOT NULL REFERENCES applicant_info(user_code),
    institution_number INTEGER NOT NULL CHECK (institution_number BETWEEN 1 AND 6),
    institution_name   TEXT,
    country            TEXT,
    program_study      TEXT,
    credential         TEXT,
    start_date         TEXT,
    end_date           TEXT,
    date_confer        TEXT,
    gpa                TEXT,
    created_at         TEXT    NOT NULL,
    updated_at         TEXT    NOT NULL,
    PRIMARY KEY (user_code, institution_number)
);

-- ── Test scores ─────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS toefl (
    user_code           TEXT    NOT NULL REFERENCES applicant_info(user_code),
    toefl_number        INTEGER NOT NULL CHECK (toefl_number BETWEEN 1 AND 3),
    registration_number TEXT,
    date_written        TEXT,
    listening           INTEGER,
    reading             INTEGER,
    writing             INTEGER,
    speaking            INTEGER,
    total               INTEGER,
    mybest_listening    INTEGER,
    mybest_reading      INTEGER,
    mybest_writing      INTEGER,
    mybest_speaking     INTEGER,
    mybest_total        INTEGER,
    created_at          TEXT    NOT NULL,
    updated_at          TEXT    NOT NULL,
    PRIMARY KEY (user_code, toefl_number)
);

CREATE TABLE IF NOT EXISTS ielts (
    user_code        TEXT    NOT NULL REFERENCES applicant_info(user_code),
    ielts_number     INTEGER NOT NULL CHECK (ielts_number BETWEEN 1 AND 3),
    candidate_number TEXT,
    date_written     TEXT,
    listening        REAL,
    reading          REAL,
    writing          REAL,
    speaking         REAL,
    total            REAL,
    created_at       TEXT    NOT NULL,
    updated_at       TEXT    NOT NULL,
    PRIMARY KEY (user_code, ielts_number)
);

CREATE TABLE IF NOT EXISTS melab (
    user_code        TEXT PRIMARY KEY REFERENCES applicant_info(user_code),
    reference_number TEXT,
    date_written     TEXT,
    listening        INTEGER,
    gcvr             INTEGER,
    writing          INTEGER,
    speaking         INTEGER,
    total            INTEGER,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS pte (
    user_code        TEXT PRIMARY KEY REFERENCES applicant_info(user_code),
    reference_number TEXT,
    date_written     TEXT,
    listening        INTEGER,
    reading          INTEGER,
    speaking         INTEGER,
    writing          INTEGER,
    total            INTEGER,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cael (
    user_code        TEXT PRIMARY KEY REFERENCES applicant_info(user_code),
    reference_number TEXT,
    date_written     TEXT,
    reading          INTEGER,
    listening        INTEGER,
    writing          INTEGER,
    speaking         INTEGER,
    total            INTEGER,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS celpip (
    user_code       TEXT PRIMARY KEY REFERENCES applicant_info(user_code),
    date_written    TEXT,
    listening       INTEGER,
    speaking        INTEGER,
    reading_writing INTEGER,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS duolingo (
    user_code     TEXT PRIMARY KEY REFERENCES applicant_info(user_code),
    date_written  TEXT,
    score         INTEGER,
    literacy      INTEGER,
    conversation  INTEGER,
    comprehension INTEGER,
    production    INTEGER,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS alt_elpp (
    user_code    TEXT PRIMARY KEY REFERENCES applicant_info(user_code),
    test_type    TEXT,
    date_written TEXT,
    total        TEXT,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS gre (
    user_code           TEXT PRIMARY KEY REFERENCES applicant_info(user_code),
    registration_number TEXT,
    date_written        TEXT,
    verbal              INTEGER,
    verbal_below        REAL,
    quantitative        INTEGER,
    quantitative_below  REAL,
    writing             REAL,
    writing_below       REAL,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS gmat (
    user_code            TEXT PRIMARY KEY REFERENCES applicant_info(user_code),
    reference_number     TEXT,
    date_written         TEXT,
    total                INTEGER,
    integrated_reasoning INTEGER,
    quantitative         INTEGER,
    verbal               INTEGER,
    writing              REAL,
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL
);

-- ── Review ──────────────────────────────────────────────────────────────

-- Reviewer-owned. Uploads only refresh the degree and English columns.
CREATE TABLE IF NOT EXISTS application_info (
    user_code           TEXT PRIMARY KEY REFERENCES applicant_info(user_code),
    sent                TEXT    NOT NULL DEFAULT 'Not Reviewed',
    cs                  INTEGER,
    stat                INTEGER,
    math                INTEGER,
    gpa                 TEXT,
    highest_degree      TEXT,
    degree_area         TEXT,
    english_status      TEXT,
    english_description TEXT,
    english             INTEGER NOT NULL DEFAULT 0,
    comment             TEXT,
    created_at          TEXT    NOT NULL,
    updated_at          TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL,   -- 'Viewer' | 'Faculty' | 'Admin'
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ratings (
    user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    user_code  TEXT    NOT NULL REFERENCES applicant_info(user_code),
    rating     REAL    NOT NULL CHECK (rating BETWEEN 0.0 AND 10.0),
    comment    TEXT,
    created_at TEXT    NOT NULL,
    updated_at TEXT    NOT NULL,
    PRIMARY KEY (user_id, user_code)
);

-- Login sessions, keyed by the SHA-256 of the cookie token.
CREATE TABLE IF NOT EXISTS auth_sessions (
    token_hash TEXT PRIMARY KEY,
    user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT    NOT NULL,
    expires_at TEXT    NOT NULL
);

-- Append-only. No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS activity_log (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    INTEGER REFERENCES users(id) ON DELETE SET NULL,
    action     TEXT NOT NULL,
    target     TEXT,
    details    TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS applicant_info_session_idx ON applicant_info(session_id);
CREATE INDEX IF NOT EXISTS ratings_user_code_idx      ON ratings(user_code);
CREATE INDEX IF NOT EXISTS auth_sessions_expiry_idx   ON auth_sessions(expires_at);

PRAGMA user_version = 1;
";
