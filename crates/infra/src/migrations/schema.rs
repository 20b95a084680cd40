//! `0001_initial`: entry and settings tables.

/// Statements are idempotent so a half-applied run can simply be repeated.
pub(crate) const UP: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS stock_history_stockhistoryentry (
        id BIGSERIAL PRIMARY KEY,
        part_id INTEGER NOT NULL
            REFERENCES part_part (id) ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED,
        item_count INTEGER NOT NULL DEFAULT 1,
        quantity NUMERIC(19, 5) NOT NULL CHECK (quantity >= 0),
        date DATE NOT NULL DEFAULT CURRENT_DATE,
        cost_min NUMERIC(19, 6) NULL,
        cost_min_currency VARCHAR(3) NULL,
        cost_max NUMERIC(19, 6) NULL,
        cost_max_currency VARCHAR(3) NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS stock_history_stockhistoryentry_part_id_idx
        ON stock_history_stockhistoryentry (part_id)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS stock_history_stockhistoryentry_date_idx
        ON stock_history_stockhistoryentry (date)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS stock_history_settings (
        key VARCHAR(50) PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
];

pub(crate) const DOWN: &[&str] = &[
    "DROP TABLE IF EXISTS stock_history_settings",
    "DROP TABLE IF EXISTS stock_history_stockhistoryentry",
];

pub(crate) const LEDGER: &str = r#"
    CREATE TABLE IF NOT EXISTS stock_history_migrations (
        name TEXT PRIMARY KEY,
        applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;
