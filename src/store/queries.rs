//! SQL query constants
//!
//! Column lists are always explicit. The legacy `proposals.custom_css` column
//! may still exist in older databases and is never read or written.

pub const INSERT_PROPOSAL: &str = r#"
    INSERT INTO proposals (
        id, title, client_name, rfp_text, total_amount, payment_type, num_deliverables,
        start_date, end_date, company_name, company_logo_url, company_contact
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
"#;

pub const SELECT_PROPOSAL: &str = r#"
    SELECT id, title, client_name, rfp_text, total_amount, payment_type, num_deliverables,
           start_date, end_date, company_name, company_logo_url, company_contact,
           version, created_at, updated_at
    FROM proposals
    WHERE id = $1
"#;

/// Row lock serialising structural changes to one proposal's sections
pub const LOCK_PROPOSAL: &str = "SELECT version FROM proposals WHERE id = $1 FOR UPDATE";

pub const LIST_PROPOSALS: &str = r#"
    SELECT p.id, p.title, p.client_name, p.version, p.created_at, p.updated_at,
           (SELECT COUNT(*) FROM sections s WHERE s.proposal_id = p.id) AS section_count
    FROM proposals p
    ORDER BY p.created_at DESC, p.id
    OFFSET $1
    LIMIT $2
"#;

pub const UPDATE_PROPOSAL: &str = r#"
    UPDATE proposals
    SET title = $2, client_name = $3, rfp_text = $4, total_amount = $5, payment_type = $6,
        num_deliverables = $7, start_date = $8, end_date = $9, company_name = $10,
        company_logo_url = $11, company_contact = $12,
        version = version + 1, updated_at = NOW()
    WHERE id = $1
"#;

pub const BUMP_PROPOSAL_VERSION: &str =
    "UPDATE proposals SET version = version + 1, updated_at = NOW() WHERE id = $1";

pub const DELETE_PROPOSAL: &str = "DELETE FROM proposals WHERE id = $1";

pub const SELECT_SECTION: &str = r#"
    SELECT id, proposal_id, position, title, content_html, image_placement, mermaid_chart,
           chart_type, version, created_at, updated_at
    FROM sections
    WHERE id = $1
"#;

pub const SELECT_PROPOSAL_SECTIONS: &str = r#"
    SELECT id, proposal_id, position, title, content_html, image_placement, mermaid_chart,
           chart_type, version, created_at, updated_at
    FROM sections
    WHERE proposal_id = $1
    ORDER BY position
"#;

pub const COUNT_SECTIONS: &str = "SELECT COUNT(*) FROM sections WHERE proposal_id = $1";

pub const INSERT_SECTION: &str = r#"
    INSERT INTO sections (
        id, proposal_id, position, title, content_html, image_placement, mermaid_chart, chart_type
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
"#;

pub const SELECT_SECTION_IDS: &str =
    "SELECT id FROM sections WHERE proposal_id = $1 ORDER BY position";

/// Section row locked for the rest of the transaction
pub const LOCK_SECTION: &str = r#"
    SELECT proposal_id, position, title, content_html, version
    FROM sections
    WHERE id = $1
    FOR UPDATE
"#;

pub const UPDATE_SECTION: &str = r#"
    UPDATE sections
    SET title = $2, content_html = $3, image_placement = $4, mermaid_chart = $5, chart_type = $6,
        version = version + 1, updated_at = NOW()
    WHERE id = $1
"#;

pub const UPDATE_SECTION_TEXT: &str = r#"
    UPDATE sections
    SET title = $2, content_html = $3, version = version + 1, updated_at = NOW()
    WHERE id = $1
"#;

pub const DELETE_SECTION: &str = "DELETE FROM sections WHERE id = $1";

pub const DELETE_PROPOSAL_SECTIONS: &str = "DELETE FROM sections WHERE proposal_id = $1";

/// Close the gap left by a deleted section. The unique position constraint is
/// deferred, so the intermediate states of this statement are allowed.
pub const CLOSE_POSITION_GAP: &str = r#"
    UPDATE sections
    SET position = position - 1
    WHERE proposal_id = $1 AND position > $2
"#;

/// Apply a full ordering in one statement: `$2` is the id array in its new order
pub const APPLY_ORDER: &str = r#"
    UPDATE sections s
    SET position = (o.ordinality - 1)::int
    FROM unnest($2::uuid[]) WITH ORDINALITY AS o(id, ordinality)
    WHERE s.id = o.id AND s.proposal_id = $1
"#;

pub const INSERT_SECTION_VERSION: &str = r#"
    INSERT INTO section_versions (id, section_id, title, content_html)
    VALUES ($1, $2, $3, $4)
"#;

pub const LIST_SECTION_VERSIONS: &str = r#"
    SELECT id, section_id, title, content_html, created_at
    FROM section_versions
    WHERE section_id = $1
    ORDER BY created_at DESC, id
"#;

pub const SELECT_SECTION_VERSION: &str = r#"
    SELECT id, section_id, title, content_html, created_at
    FROM section_versions
    WHERE id = $1 AND section_id = $2
"#;

pub const INSERT_IMAGE: &str = r#"
    INSERT INTO images (id, owner_id, url)
    VALUES ($1, $2, $3)
    RETURNING id, owner_id, url, created_at
"#;

pub const LIST_USER_IMAGES: &str = r#"
    SELECT id, owner_id, url, created_at
    FROM images
    WHERE owner_id = $1
    ORDER BY created_at DESC, id
"#;

pub const IMAGE_EXISTS: &str = "SELECT 1 FROM images WHERE id = $1";

/// Owner check is part of the predicate, so another user's image counts as missing
pub const DELETE_IMAGE: &str = "DELETE FROM images WHERE id = $1 AND owner_id = $2";

pub const ATTACH_IMAGE: &str = r#"
    INSERT INTO section_images (section_id, image_id)
    VALUES ($1, $2)
    ON CONFLICT (section_id, image_id) DO NOTHING
"#;

pub const DETACH_IMAGE: &str =
    "DELETE FROM section_images WHERE section_id = $1 AND image_id = $2";

/// Images attached to any of the given sections, in attachment order
pub const SELECT_SECTION_IMAGES: &str = r#"
    SELECT si.section_id, i.id, i.owner_id, i.url, i.created_at
    FROM section_images si
    JOIN images i ON i.id = si.image_id
    WHERE si.section_id = ANY($1)
    ORDER BY si.attached_at, i.id
"#;

pub const SECTION_EXISTS: &str = "SELECT 1 FROM sections WHERE id = $1";

pub const SECTION_PROPOSAL: &str = "SELECT proposal_id FROM sections WHERE id = $1";
