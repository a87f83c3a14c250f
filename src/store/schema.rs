//! Database schema bootstrap

use deadpool_postgres::Pool;
use tracing::info;

const CREATE_PROPOSALS: &str = "CREATE TABLE IF NOT EXISTS proposals (
    id UUID PRIMARY KEY,
    title VARCHAR(255) NOT NULL,
    client_name VARCHAR(255) NOT NULL,
    rfp_text TEXT NOT NULL DEFAULT '',
    total_amount DOUBLE PRECISION,
    payment_type VARCHAR(32),
    num_deliverables INTEGER,
    start_date DATE,
    end_date DATE,
    company_name VARCHAR(255),
    company_logo_url TEXT,
    company_contact VARCHAR(255),
    version INTEGER NOT NULL DEFAULT 1,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

const CREATE_SECTIONS: &str = "CREATE TABLE IF NOT EXISTS sections (
    id UUID PRIMARY KEY,
    proposal_id UUID NOT NULL REFERENCES proposals(id) ON DELETE CASCADE,
    position INTEGER NOT NULL CHECK (position >= 0),
    title VARCHAR(255) NOT NULL,
    content_html TEXT NOT NULL DEFAULT '',
    image_placement VARCHAR(32),
    mermaid_chart TEXT,
    chart_type VARCHAR(32),
    version INTEGER NOT NULL DEFAULT 1,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT sections_position_unique UNIQUE (proposal_id, position) DEFERRABLE INITIALLY DEFERRED
)";

const CREATE_SECTION_VERSIONS: &str = "CREATE TABLE IF NOT EXISTS section_versions (
    id UUID PRIMARY KEY,
    section_id UUID NOT NULL REFERENCES sections(id) ON DELETE CASCADE,
    title VARCHAR(255) NOT NULL,
    content_html TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
)";

const CREATE_IMAGES: &str = "CREATE TABLE IF NOT EXISTS images (
    id UUID PRIMARY KEY,
    owner_id UUID NOT NULL,
    url TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
)";

const CREATE_SECTION_IMAGES: &str = "CREATE TABLE IF NOT EXISTS section_images (
    section_id UUID NOT NULL REFERENCES sections(id) ON DELETE CASCADE,
    image_id UUID NOT NULL REFERENCES images(id) ON DELETE CASCADE,
    attached_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
    PRIMARY KEY (section_id, image_id)
)";

const INDEXES: [&str; 4] = [
    "CREATE INDEX IF NOT EXISTS idx_proposals_created_at ON proposals(created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_section_versions_section_id ON section_versions(section_id)",
    "CREATE INDEX IF NOT EXISTS idx_images_owner_id ON images(owner_id)",
    "CREATE INDEX IF NOT EXISTS idx_section_images_image_id ON section_images(image_id)",
];

/// Create the tables and indexes if they don't exist
pub async fn create_tables(pool: &Pool) -> anyhow::Result<()> {
    let client = pool.get().await?;

    for statement in [
        CREATE_PROPOSALS,
        CREATE_SECTIONS,
        CREATE_SECTION_VERSIONS,
        CREATE_IMAGES,
        CREATE_SECTION_IMAGES,
    ] {
        client.execute(statement, &[]).await?;
    }

    for statement in INDEXES {
        client.execute(statement, &[]).await?;
    }

    info!("✅ Database tables initialized");
    Ok(())
}
