//! Canonical SQLite schema for the catalog database.
//!
//! Entities are soft-deleted (`is_deleted = 1`) and keep their rows. Child
//! collections live in join tables keyed by the owning entity. Edit diffs are
//! stored as a JSON document tagged by target type.
//!
//! Timestamps are microseconds since the Unix epoch (`*_at_us`).

/// Migration v1: entities, edits, votes, redirects, fingerprints.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS catalog_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO catalog_meta (id, schema_version) VALUES (1, 0);

CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    roles TEXT NOT NULL DEFAULT '',
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS tags (
    tag_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    is_deleted INTEGER NOT NULL DEFAULT 0 CHECK (is_deleted IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS tag_aliases (
    tag_id TEXT NOT NULL REFERENCES tags(tag_id) ON DELETE CASCADE,
    alias TEXT NOT NULL,
    PRIMARY KEY (tag_id, alias)
);

CREATE TABLE IF NOT EXISTS studios (
    studio_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    parent_studio_id TEXT REFERENCES studios(studio_id),
    is_deleted INTEGER NOT NULL DEFAULT 0 CHECK (is_deleted IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS studio_aliases (
    studio_id TEXT NOT NULL REFERENCES studios(studio_id) ON DELETE CASCADE,
    alias TEXT NOT NULL,
    PRIMARY KEY (studio_id, alias)
);

CREATE TABLE IF NOT EXISTS studio_urls (
    studio_id TEXT NOT NULL REFERENCES studios(studio_id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    site TEXT NOT NULL,
    PRIMARY KEY (studio_id, url, site)
);

CREATE TABLE IF NOT EXISTS studio_images (
    studio_id TEXT NOT NULL REFERENCES studios(studio_id) ON DELETE CASCADE,
    image_id TEXT NOT NULL,
    PRIMARY KEY (studio_id, image_id)
);

CREATE TABLE IF NOT EXISTS performers (
    performer_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    disambiguation TEXT,
    gender TEXT,
    birthdate TEXT,
    ethnicity TEXT,
    country TEXT,
    eye_color TEXT,
    hair_color TEXT,
    height INTEGER,
    career_start_year INTEGER,
    career_end_year INTEGER,
    is_deleted INTEGER NOT NULL DEFAULT 0 CHECK (is_deleted IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS performer_aliases (
    performer_id TEXT NOT NULL REFERENCES performers(performer_id) ON DELETE CASCADE,
    alias TEXT NOT NULL,
    PRIMARY KEY (performer_id, alias)
);

CREATE TABLE IF NOT EXISTS performer_urls (
    performer_id TEXT NOT NULL REFERENCES performers(performer_id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    site TEXT NOT NULL,
    PRIMARY KEY (performer_id, url, site)
);

CREATE TABLE IF NOT EXISTS performer_images (
    performer_id TEXT NOT NULL REFERENCES performers(performer_id) ON DELETE CASCADE,
    image_id TEXT NOT NULL,
    PRIMARY KEY (performer_id, image_id)
);

CREATE TABLE IF NOT EXISTS performer_tattoos (
    performer_id TEXT NOT NULL REFERENCES performers(performer_id) ON DELETE CASCADE,
    location TEXT NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS performer_piercings (
    performer_id TEXT NOT NULL REFERENCES performers(performer_id) ON DELETE CASCADE,
    location TEXT NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS scenes (
    scene_id TEXT PRIMARY KEY,
    title TEXT,
    details TEXT,
    date TEXT,
    studio_id TEXT REFERENCES studios(studio_id),
    duration INTEGER,
    director TEXT,
    code TEXT,
    is_deleted INTEGER NOT NULL DEFAULT 0 CHECK (is_deleted IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS scene_urls (
    scene_id TEXT NOT NULL REFERENCES scenes(scene_id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    site TEXT NOT NULL,
    PRIMARY KEY (scene_id, url, site)
);

CREATE TABLE IF NOT EXISTS scene_images (
    scene_id TEXT NOT NULL REFERENCES scenes(scene_id) ON DELETE CASCADE,
    image_id TEXT NOT NULL,
    PRIMARY KEY (scene_id, image_id)
);

CREATE TABLE IF NOT EXISTS scene_tags (
    scene_id TEXT NOT NULL REFERENCES scenes(scene_id) ON DELETE CASCADE,
    tag_id TEXT NOT NULL REFERENCES tags(tag_id),
    PRIMARY KEY (scene_id, tag_id)
);

CREATE TABLE IF NOT EXISTS scene_performers (
    scene_id TEXT NOT NULL REFERENCES scenes(scene_id) ON DELETE CASCADE,
    performer_id TEXT NOT NULL REFERENCES performers(performer_id),
    alias TEXT,
    PRIMARY KEY (scene_id, performer_id)
);

CREATE TABLE IF NOT EXISTS edits (
    edit_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(user_id),
    target_type TEXT NOT NULL CHECK (target_type IN ('performer', 'scene', 'studio', 'tag')),
    operation TEXT NOT NULL CHECK (operation IN ('create', 'modify', 'destroy', 'merge')),
    status TEXT NOT NULL,
    applied INTEGER NOT NULL DEFAULT 0 CHECK (applied IN (0, 1)),
    target_id TEXT,
    merge_source_ids TEXT NOT NULL DEFAULT '[]',
    data TEXT NOT NULL,
    vote_count INTEGER NOT NULL DEFAULT 0,
    update_count INTEGER NOT NULL DEFAULT 0,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER,
    closed_at_us INTEGER,
    CHECK (applied = 0 OR status IN ('accepted', 'immediate_accepted'))
);

CREATE TABLE IF NOT EXISTS edit_votes (
    edit_id TEXT NOT NULL REFERENCES edits(edit_id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(user_id),
    vote TEXT NOT NULL,
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (edit_id, user_id)
);

CREATE TABLE IF NOT EXISTS edit_comments (
    comment_id TEXT PRIMARY KEY,
    edit_id TEXT NOT NULL REFERENCES edits(edit_id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(user_id),
    body TEXT NOT NULL,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS redirects (
    target_type TEXT NOT NULL,
    source_id TEXT NOT NULL,
    target_id TEXT NOT NULL,
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (target_type, source_id)
);

CREATE TABLE IF NOT EXISTS fingerprints (
    fingerprint_id INTEGER PRIMARY KEY AUTOINCREMENT,
    scene_id TEXT NOT NULL REFERENCES scenes(scene_id),
    hash TEXT NOT NULL,
    algorithm TEXT NOT NULL CHECK (algorithm IN ('MD5', 'OSHASH', 'PHASH')),
    duration INTEGER NOT NULL,
    submissions INTEGER NOT NULL DEFAULT 0,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    UNIQUE (scene_id, hash, algorithm)
);

CREATE TABLE IF NOT EXISTS fingerprint_submissions (
    fingerprint_id INTEGER NOT NULL REFERENCES fingerprints(fingerprint_id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(user_id),
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (fingerprint_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_edits_status_created
    ON edits(status, created_at_us);

CREATE INDEX IF NOT EXISTS idx_edits_target
    ON edits(target_type, target_id);

CREATE INDEX IF NOT EXISTS idx_edits_user
    ON edits(user_id, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_scene_performers_performer
    ON scene_performers(performer_id);

CREATE INDEX IF NOT EXISTS idx_scene_tags_tag
    ON scene_tags(tag_id);

CREATE INDEX IF NOT EXISTS idx_scenes_studio
    ON scenes(studio_id);

CREATE INDEX IF NOT EXISTS idx_studios_parent
    ON studios(parent_studio_id);

CREATE INDEX IF NOT EXISTS idx_fingerprints_hash
    ON fingerprints(hash, algorithm);

CREATE INDEX IF NOT EXISTS idx_redirects_target
    ON redirects(target_type, target_id);
";

/// Indexes the query layer relies on.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_edits_status_created",
    "idx_edits_target",
    "idx_edits_user",
    "idx_scene_performers_performer",
    "idx_scene_tags_tag",
    "idx_scenes_studio",
    "idx_studios_parent",
    "idx_fingerprints_hash",
    "idx_redirects_target",
];
