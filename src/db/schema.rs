//! Database schema and migrations for feedsync.
//!
//! Migrations are applied sequentially when the database is first opened
//! or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script executed in order inside a transaction.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Accounts and their feed settings
    r#"
CREATE TABLE accounts (
    id                      INTEGER PRIMARY KEY AUTOINCREMENT,
    name                    TEXT NOT NULL,
    feed_url                TEXT,               -- NULL when no feed is configured
    auto_publish_from_feed  INTEGER NOT NULL DEFAULT 0,
    created_at              TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_accounts_feed_url ON accounts(feed_url);
"#,
    // v2: Imported posts
    r#"
CREATE TABLE posts (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_account_id    INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    title               TEXT NOT NULL,
    slug                TEXT NOT NULL,
    content             TEXT NOT NULL,
    excerpt             TEXT NOT NULL,
    featured_image_url  TEXT,
    status              TEXT NOT NULL,      -- 'draft' or 'published'
    source_feed_url     TEXT NOT NULL,
    source_platform     TEXT NOT NULL,      -- 'youtube' or 'rss'
    external_id         TEXT NOT NULL,
    published_at        TEXT,
    created_at          TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (owner_account_id, external_id),
    UNIQUE (owner_account_id, slug)
);

CREATE INDEX idx_posts_owner_created ON posts(owner_account_id, created_at);
"#,
];
