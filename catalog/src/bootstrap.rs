//! Idempotent table bootstrap for the portfolio schema.

use diesel_async::AsyncPgConnection;
use diesel_async::SimpleAsyncConnection;

/// DDL for the portfolio tables.
///
/// Child tables cascade on application delete, so removing an application
/// drops its integrations (both directions), debt items and capability links.
pub const BOOTSTRAP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS applications (
    id                  BIGSERIAL PRIMARY KEY,
    name                VARCHAR(200) NOT NULL,
    domain              VARCHAR(100) NOT NULL,
    criticality         VARCHAR(50) NOT NULL,
    lifecycle           VARCHAR(50) NOT NULL,
    environment         VARCHAR(50) NOT NULL,
    region              VARCHAR(100) NOT NULL,
    hosting             VARCHAR(50) NOT NULL,
    business_owner      VARCHAR(120) NOT NULL DEFAULT '',
    it_owner            VARCHAR(120) NOT NULL DEFAULT '',
    vendor              VARCHAR(100) NOT NULL,
    tech_stack          TEXT NOT NULL,
    runtime             VARCHAR(100) NOT NULL,
    database_technology VARCHAR(120) NOT NULL DEFAULT '',
    vendor_products     TEXT NOT NULL DEFAULT '',
    data_sensitivity    VARCHAR(50) NOT NULL,
    tech_debt_score     INTEGER NOT NULL DEFAULT 0
                        CHECK (tech_debt_score BETWEEN 0 AND 100),
    create_date         TIMESTAMPTZ DEFAULT NOW(),
    write_date          TIMESTAMPTZ DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_applications_name ON applications (name);

CREATE TABLE IF NOT EXISTS capabilities (
    id          BIGSERIAL PRIMARY KEY,
    name        VARCHAR(120) NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS application_capabilities (
    application_id BIGINT NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
    capability_id  BIGINT NOT NULL REFERENCES capabilities(id) ON DELETE CASCADE,
    PRIMARY KEY (application_id, capability_id)
);

CREATE TABLE IF NOT EXISTS integrations (
    id               BIGSERIAL PRIMARY KEY,
    source_app_id    BIGINT NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
    target_app_id    BIGINT NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
    integration_type VARCHAR(50) NOT NULL,
    direction        VARCHAR(50) NOT NULL,
    daily_volume     BIGINT NOT NULL DEFAULT 0 CHECK (daily_volume >= 0),
    data_sensitivity VARCHAR(50) NOT NULL DEFAULT '',
    transport        VARCHAR(80) NOT NULL DEFAULT '',
    frequency        VARCHAR(80) NOT NULL DEFAULT '',
    interface_name   VARCHAR(120) NOT NULL DEFAULT '',
    create_date      TIMESTAMPTZ DEFAULT NOW(),
    write_date       TIMESTAMPTZ DEFAULT NOW(),
    CHECK (source_app_id <> target_app_id)
);

CREATE INDEX IF NOT EXISTS idx_integrations_source ON integrations (source_app_id);
CREATE INDEX IF NOT EXISTS idx_integrations_target ON integrations (target_app_id);
CREATE INDEX IF NOT EXISTS idx_integrations_key
    ON integrations (source_app_id, target_app_id, integration_type);

CREATE TABLE IF NOT EXISTS tech_debt_items (
    id             BIGSERIAL PRIMARY KEY,
    application_id BIGINT NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
    category       VARCHAR(80) NOT NULL,
    severity       VARCHAR(30) NOT NULL,
    status         VARCHAR(30) NOT NULL DEFAULT 'Open',
    title          VARCHAR(140) NOT NULL,
    description    TEXT NOT NULL DEFAULT '',
    created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    target_date    DATE
);

CREATE INDEX IF NOT EXISTS idx_tech_debt_items_app ON tech_debt_items (application_id);
"#;

/// Create the portfolio tables if they do not exist yet.
pub async fn ensure_tables(conn: &mut AsyncPgConnection) -> anyhow::Result<()> {
    conn.batch_execute(BOOTSTRAP_SQL)
        .await
        .map_err(|e| anyhow::anyhow!("portfolio bootstrap failed: {e}"))?;
    Ok(())
}
