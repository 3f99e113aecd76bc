//! PostgreSQL schema. Applied idempotently at startup.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS profiles (
    user_id UUID PRIMARY KEY,
    identity JSONB NOT NULL DEFAULT '{}'::jsonb,
    summary TEXT NOT NULL DEFAULT '',
    additional JSONB NOT NULL DEFAULT '[]'::jsonb,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS experience (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES profiles(user_id),
    company TEXT NOT NULL DEFAULT '',
    title TEXT NOT NULL DEFAULT '',
    dates TEXT NOT NULL DEFAULT '',
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS idx_experience_user ON experience(user_id, sort_order);

CREATE TABLE IF NOT EXISTS bullets (
    id UUID PRIMARY KEY,
    experience_id UUID NOT NULL REFERENCES experience(id) ON DELETE CASCADE,
    text TEXT NOT NULL DEFAULT '',
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS idx_bullets_experience ON bullets(experience_id, sort_order);

CREATE TABLE IF NOT EXISTS education (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES profiles(user_id),
    institution TEXT NOT NULL DEFAULT '',
    degree TEXT NOT NULL DEFAULT '',
    field_of_study TEXT NOT NULL DEFAULT '',
    dates TEXT NOT NULL DEFAULT '',
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS idx_education_user ON education(user_id, sort_order);

CREATE TABLE IF NOT EXISTS achievements (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES profiles(user_id),
    title TEXT NOT NULL DEFAULT '',
    issuer TEXT NOT NULL DEFAULT '',
    date TEXT NOT NULL DEFAULT '',
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS idx_achievements_user ON achievements(user_id, sort_order);

CREATE TABLE IF NOT EXISTS skills (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES profiles(user_id),
    name TEXT NOT NULL DEFAULT '',
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS idx_skills_user ON skills(user_id, sort_order);

CREATE TABLE IF NOT EXISTS languages (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES profiles(user_id),
    language TEXT NOT NULL DEFAULT '',
    level TEXT NOT NULL DEFAULT '',
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS idx_languages_user ON languages(user_id, sort_order);

CREATE TABLE IF NOT EXISTS documents (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    file_name TEXT NOT NULL,
    raw_text TEXT NOT NULL DEFAULT '',
    parsed_data JSONB NOT NULL DEFAULT '{}'::jsonb,
    storage_key TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS idx_documents_user ON documents(user_id, created_at DESC);

CREATE TABLE IF NOT EXISTS applications (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    job_title TEXT NOT NULL,
    company TEXT NOT NULL,
    job_url TEXT,
    location TEXT,
    status TEXT NOT NULL DEFAULT 'applied'
        CHECK (status IN ('applied', 'interview', 'offer', 'rejected')),
    document_id UUID REFERENCES documents(id) ON DELETE SET NULL,
    cover_letter TEXT,
    notes TEXT,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS idx_applications_user ON applications(user_id, applied_at DESC);
"#;
