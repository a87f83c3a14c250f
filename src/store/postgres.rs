//! PostgreSQL repository
//!
//! Every operation runs in one transaction. Operations that change the set or
//! order of a proposal's sections first lock the proposal row, so concurrent
//! structural edits of the same proposal are serialised and positions stay
//! contiguous.

use crate::error::AppError;
use crate::models::{
    Image, Proposal, ProposalDetails, ProposalSummary, Section, SectionContent, SectionVersion,
};
use crate::ordering;
use crate::store::queries;
use crate::store::{
    check_version, image_not_found, proposal_not_found, section_not_found, ProposalRepository,
};
use async_trait::async_trait;
use deadpool_postgres::Pool;
use postgres_types::ToSql;
use std::str::FromStr;
use tokio_postgres::{Row, Transaction};
use tracing::debug;
use uuid::Uuid;

/// Repository backed by a deadpool-postgres pool
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

/// Read an optional text column holding one of our string enums
fn enum_column<T>(row: &Row, column: &str) -> Result<Option<T>, AppError>
where
    T: FromStr<Err = String>,
{
    row.try_get::<_, Option<String>>(column)?
        .map(|value| {
            value
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid {} in database: {}", column, e)))
        })
        .transpose()
}

fn details_from_row(row: &Row) -> Result<ProposalDetails, AppError> {
    Ok(ProposalDetails {
        title: row.try_get("title")?,
        client_name: row.try_get("client_name")?,
        rfp_text: row.try_get("rfp_text")?,
        total_amount: row.try_get("total_amount")?,
        payment_type: enum_column(row, "payment_type")?,
        num_deliverables: row.try_get("num_deliverables")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        company_name: row.try_get("company_name")?,
        company_logo_url: row.try_get("company_logo_url")?,
        company_contact: row.try_get("company_contact")?,
    })
}

fn section_from_row(row: &Row) -> Result<Section, AppError> {
    Ok(Section {
        id: row.try_get("id")?,
        proposal_id: row.try_get("proposal_id")?,
        position: row.try_get("position")?,
        content: SectionContent {
            title: row.try_get("title")?,
            content_html: row.try_get("content_html")?,
            image_placement: enum_column(row, "image_placement")?,
            mermaid_chart: row.try_get("mermaid_chart")?,
            chart_type: enum_column(row, "chart_type")?,
        },
        images: Vec::new(),
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn image_from_row(row: &Row) -> Result<Image, AppError> {
    Ok(Image {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        url: row.try_get("url")?,
        created_at: row.try_get("created_at")?,
    })
}

fn version_from_row(row: &Row) -> Result<SectionVersion, AppError> {
    Ok(SectionVersion {
        id: row.try_get("id")?,
        section_id: row.try_get("section_id")?,
        title: row.try_get("title")?,
        content_html: row.try_get("content_html")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Fill in the attached images of `sections`
async fn load_images(tx: &Transaction<'_>, sections: &mut [Section]) -> Result<(), AppError> {
    if sections.is_empty() {
        return Ok(());
    }

    let ids: Vec<Uuid> = sections.iter().map(|s| s.id).collect();
    let rows = tx.query(queries::SELECT_SECTION_IMAGES, &[&ids]).await?;
    for row in rows {
        let section_id: Uuid = row.try_get("section_id")?;
        let image = image_from_row(&row)?;
        if let Some(section) = sections.iter_mut().find(|s| s.id == section_id) {
            section.images.push(image);
        }
    }
    Ok(())
}

async fn load_section(tx: &Transaction<'_>, id: Uuid) -> Result<Section, AppError> {
    let row = tx
        .query_opt(queries::SELECT_SECTION, &[&id])
        .await?
        .ok_or_else(|| section_not_found(id))?;
    let mut sections = [section_from_row(&row)?];
    load_images(tx, &mut sections).await?;
    let [section] = sections;
    Ok(section)
}

async fn load_sections(tx: &Transaction<'_>, proposal_id: Uuid) -> Result<Vec<Section>, AppError> {
    let rows = tx.query(queries::SELECT_PROPOSAL_SECTIONS, &[&proposal_id]).await?;
    let mut sections = rows
        .iter()
        .map(section_from_row)
        .collect::<Result<Vec<_>, _>>()?;
    load_images(tx, &mut sections).await?;
    Ok(sections)
}

async fn load_proposal(tx: &Transaction<'_>, id: Uuid) -> Result<Proposal, AppError> {
    let row = tx
        .query_opt(queries::SELECT_PROPOSAL, &[&id])
        .await?
        .ok_or_else(|| proposal_not_found(id))?;

    Ok(Proposal {
        id: row.try_get("id")?,
        details: details_from_row(&row)?,
        version: row.try_get("version")?,
        sections: load_sections(tx, id).await?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Lock the proposal row and return its current version
async fn lock_proposal(tx: &Transaction<'_>, id: Uuid) -> Result<i32, AppError> {
    let row = tx
        .query_opt(queries::LOCK_PROPOSAL, &[&id])
        .await?
        .ok_or_else(|| proposal_not_found(id))?;
    Ok(row.try_get("version")?)
}

async fn ensure_section(tx: &Transaction<'_>, id: Uuid) -> Result<(), AppError> {
    tx.query_opt(queries::SECTION_EXISTS, &[&id])
        .await?
        .map(|_| ())
        .ok_or_else(|| section_not_found(id))
}

async fn insert_section(
    tx: &Transaction<'_>,
    proposal_id: Uuid,
    position: i32,
    content: &SectionContent,
) -> Result<Uuid, AppError> {
    let id = Uuid::new_v4();
    let image_placement = content.image_placement.map(|p| p.as_str());
    let chart_type = content.chart_type.map(|c| c.as_str());
    let params: [&(dyn ToSql + Sync); 8] = [
        &id,
        &proposal_id,
        &position,
        &content.title,
        &content.content_html,
        &image_placement,
        &content.mermaid_chart,
        &chart_type,
    ];
    tx.execute(queries::INSERT_SECTION, &params).await?;
    Ok(id)
}

async fn snapshot_section(
    tx: &Transaction<'_>,
    section_id: Uuid,
    title: &str,
    content_html: &str,
) -> Result<(), AppError> {
    tx.execute(
        queries::INSERT_SECTION_VERSION,
        &[&Uuid::new_v4(), &section_id, &title, &content_html],
    )
    .await?;
    Ok(())
}

async fn bump_proposal(tx: &Transaction<'_>, id: Uuid) -> Result<(), AppError> {
    tx.execute(queries::BUMP_PROPOSAL_VERSION, &[&id]).await?;
    Ok(())
}

#[async_trait]
impl ProposalRepository for PgStore {
    async fn create_proposal(&self, details: &ProposalDetails) -> Result<Proposal, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let id = Uuid::new_v4();
        let payment_type = details.payment_type.map(|p| p.as_str());
        let params: [&(dyn ToSql + Sync); 12] = [
            &id,
            &details.title,
            &details.client_name,
            &details.rfp_text,
            &details.total_amount,
            &payment_type,
            &details.num_deliverables,
            &details.start_date,
            &details.end_date,
            &details.company_name,
            &details.company_logo_url,
            &details.company_contact,
        ];
        tx.execute(queries::INSERT_PROPOSAL, &params).await?;

        let proposal = load_proposal(&tx, id).await?;
        tx.commit().await?;
        debug!("Inserted proposal {}", id);
        Ok(proposal)
    }

    async fn get_proposal(&self, id: Uuid) -> Result<Proposal, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        let proposal = load_proposal(&tx, id).await?;
        tx.commit().await?;
        Ok(proposal)
    }

    async fn list_proposals(&self, skip: i64, limit: i64) -> Result<Vec<ProposalSummary>, AppError> {
        let client = self.pool.get().await?;
        let rows = client.query(queries::LIST_PROPOSALS, &[&skip, &limit]).await?;

        rows.iter()
            .map(|row| -> Result<ProposalSummary, AppError> {
                Ok(ProposalSummary {
                    id: row.try_get("id")?,
                    title: row.try_get("title")?,
                    client_name: row.try_get("client_name")?,
                    section_count: row.try_get("section_count")?,
                    version: row.try_get("version")?,
                    created_at: row.try_get("created_at")?,
                    updated_at: row.try_get("updated_at")?,
                })
            })
            .collect()
    }

    async fn update_proposal(
        &self,
        id: Uuid,
        details: &ProposalDetails,
        expected_version: Option<i32>,
    ) -> Result<Proposal, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let current = lock_proposal(&tx, id).await?;
        check_version("Proposal", id, current, expected_version)?;

        let payment_type = details.payment_type.map(|p| p.as_str());
        let params: [&(dyn ToSql + Sync); 12] = [
            &id,
            &details.title,
            &details.client_name,
            &details.rfp_text,
            &details.total_amount,
            &payment_type,
            &details.num_deliverables,
            &details.start_date,
            &details.end_date,
            &details.company_name,
            &details.company_logo_url,
            &details.company_contact,
        ];
        tx.execute(queries::UPDATE_PROPOSAL, &params).await?;

        let proposal = load_proposal(&tx, id).await?;
        tx.commit().await?;
        Ok(proposal)
    }

    async fn delete_proposal(&self, id: Uuid) -> Result<(), AppError> {
        let client = self.pool.get().await?;
        let deleted = client.execute(queries::DELETE_PROPOSAL, &[&id]).await?;
        if deleted == 0 {
            return Err(proposal_not_found(id));
        }
        Ok(())
    }

    async fn create_section(
        &self,
        proposal_id: Uuid,
        content: &SectionContent,
    ) -> Result<Section, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        lock_proposal(&tx, proposal_id).await?;
        let count: i64 = tx
            .query_one(queries::COUNT_SECTIONS, &[&proposal_id])
            .await?
            .try_get(0)?;
        let count = usize::try_from(count)
            .map_err(|_| AppError::Internal(format!("Invalid section count {}", count)))?;
        let position = ordering::append_position(count)?;

        let id = insert_section(&tx, proposal_id, position, content).await?;
        bump_proposal(&tx, proposal_id).await?;

        let section = load_section(&tx, id).await?;
        tx.commit().await?;
        Ok(section)
    }

    async fn get_section(&self, id: Uuid) -> Result<Section, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        let section = load_section(&tx, id).await?;
        tx.commit().await?;
        Ok(section)
    }

    async fn update_section(
        &self,
        id: Uuid,
        content: &SectionContent,
        expected_version: Option<i32>,
    ) -> Result<Section, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let row = tx
            .query_opt(queries::LOCK_SECTION, &[&id])
            .await?
            .ok_or_else(|| section_not_found(id))?;
        check_version("Section", id, row.try_get("version")?, expected_version)?;

        let title: String = row.try_get("title")?;
        let content_html: String = row.try_get("content_html")?;
        if title != content.title || content_html != content.content_html {
            snapshot_section(&tx, id, &title, &content_html).await?;
        }

        let image_placement = content.image_placement.map(|p| p.as_str());
        let chart_type = content.chart_type.map(|c| c.as_str());
        let params: [&(dyn ToSql + Sync); 6] = [
            &id,
            &content.title,
            &content.content_html,
            &image_placement,
            &content.mermaid_chart,
            &chart_type,
        ];
        tx.execute(queries::UPDATE_SECTION, &params).await?;

        let section = load_section(&tx, id).await?;
        tx.commit().await?;
        Ok(section)
    }

    async fn delete_section(&self, id: Uuid) -> Result<(), AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let proposal_id: Uuid = tx
            .query_opt(queries::SECTION_PROPOSAL, &[&id])
            .await?
            .ok_or_else(|| section_not_found(id))?
            .try_get("proposal_id")?;
        lock_proposal(&tx, proposal_id).await?;

        // Re-read under the proposal lock: a concurrent delete may have won
        let row = tx
            .query_opt(queries::LOCK_SECTION, &[&id])
            .await?
            .ok_or_else(|| section_not_found(id))?;
        let position: i32 = row.try_get("position")?;

        tx.execute(queries::DELETE_SECTION, &[&id]).await?;
        tx.execute(queries::CLOSE_POSITION_GAP, &[&proposal_id, &position])
            .await?;
        bump_proposal(&tx, proposal_id).await?;

        tx.commit().await?;
        debug!("Deleted section {} at position {}", id, position);
        Ok(())
    }

    async fn reorder_sections(
        &self,
        proposal_id: Uuid,
        order: &[Uuid],
        expected_version: Option<i32>,
    ) -> Result<Vec<Section>, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let current_version = lock_proposal(&tx, proposal_id).await?;
        check_version("Proposal", proposal_id, current_version, expected_version)?;

        let current: Vec<Uuid> = tx
            .query(queries::SELECT_SECTION_IDS, &[&proposal_id])
            .await?
            .iter()
            .map(|row| row.try_get::<_, Uuid>("id"))
            .collect::<Result<_, _>>()?;
        ordering::validate_permutation(&current, order)?;

        let order = order.to_vec();
        tx.execute(queries::APPLY_ORDER, &[&proposal_id, &order]).await?;
        bump_proposal(&tx, proposal_id).await?;

        let sections = load_sections(&tx, proposal_id).await?;
        tx.commit().await?;
        Ok(sections)
    }

    async fn replace_sections(
        &self,
        proposal_id: Uuid,
        sections: &[SectionContent],
    ) -> Result<Vec<Section>, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        lock_proposal(&tx, proposal_id).await?;
        tx.execute(queries::DELETE_PROPOSAL_SECTIONS, &[&proposal_id])
            .await?;
        for (index, content) in sections.iter().enumerate() {
            let position = ordering::append_position(index)?;
            insert_section(&tx, proposal_id, position, content).await?;
        }
        bump_proposal(&tx, proposal_id).await?;

        let sections = load_sections(&tx, proposal_id).await?;
        tx.commit().await?;
        Ok(sections)
    }

    async fn list_section_versions(&self, section_id: Uuid) -> Result<Vec<SectionVersion>, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        ensure_section(&tx, section_id).await?;
        let versions = tx
            .query(queries::LIST_SECTION_VERSIONS, &[&section_id])
            .await?
            .iter()
            .map(version_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tx.commit().await?;
        Ok(versions)
    }

    async fn revert_section(&self, section_id: Uuid, version_id: Uuid) -> Result<Section, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let current = tx
            .query_opt(queries::LOCK_SECTION, &[&section_id])
            .await?
            .ok_or_else(|| section_not_found(section_id))?;
        let target = tx
            .query_opt(queries::SELECT_SECTION_VERSION, &[&version_id, &section_id])
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Version {} not found for section {}",
                    version_id, section_id
                ))
            })?;
        let target = version_from_row(&target)?;

        let title: String = current.try_get("title")?;
        let content_html: String = current.try_get("content_html")?;
        snapshot_section(&tx, section_id, &title, &content_html).await?;
        tx.execute(
            queries::UPDATE_SECTION_TEXT,
            &[&section_id, &target.title, &target.content_html],
        )
        .await?;

        let section = load_section(&tx, section_id).await?;
        tx.commit().await?;
        Ok(section)
    }

    async fn add_image(&self, owner_id: Uuid, url: &str) -> Result<Image, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(queries::INSERT_IMAGE, &[&Uuid::new_v4(), &owner_id, &url])
            .await?;
        image_from_row(&row)
    }

    async fn list_user_images(&self, owner_id: Uuid) -> Result<Vec<Image>, AppError> {
        let client = self.pool.get().await?;
        client
            .query(queries::LIST_USER_IMAGES, &[&owner_id])
            .await?
            .iter()
            .map(image_from_row)
            .collect()
    }

    async fn delete_image(&self, owner_id: Uuid, image_id: Uuid) -> Result<(), AppError> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute(queries::DELETE_IMAGE, &[&image_id, &owner_id])
            .await?;
        if deleted == 0 {
            return Err(image_not_found(image_id));
        }
        Ok(())
    }

    async fn attach_image(&self, section_id: Uuid, image_id: Uuid) -> Result<Section, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        ensure_section(&tx, section_id).await?;
        if tx.query_opt(queries::IMAGE_EXISTS, &[&image_id]).await?.is_none() {
            return Err(image_not_found(image_id));
        }
        tx.execute(queries::ATTACH_IMAGE, &[&section_id, &image_id])
            .await?;

        let section = load_section(&tx, section_id).await?;
        tx.commit().await?;
        Ok(section)
    }

    async fn detach_image(&self, section_id: Uuid, image_id: Uuid) -> Result<Section, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        ensure_section(&tx, section_id).await?;
        let removed = tx
            .execute(queries::DETACH_IMAGE, &[&section_id, &image_id])
            .await?;
        if removed == 0 {
            return Err(AppError::NotFound(format!(
                "Image {} is not attached to section {}",
                image_id, section_id
            )));
        }

        let section = load_section(&tx, section_id).await?;
        tx.commit().await?;
        Ok(section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::schema;
    use crate::testing::sample_details;
    use deadpool_postgres::{Manager, ManagerConfig, RecyclingMethod};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    async fn connect() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a scratch database");
        let config: tokio_postgres::Config = url.parse().expect("valid DATABASE_URL");
        let manager = Manager::from_config(
            config,
            tokio_postgres::NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = Pool::builder(manager).max_size(8).build().expect("pool");
        schema::create_tables(&pool).await.expect("schema");
        PgStore::new(pool)
    }

    fn titles_and_positions(sections: &[Section]) -> Vec<(String, i32)> {
        sections
            .iter()
            .map(|s| (s.content.title.clone(), s.position))
            .collect()
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL database"]
    async fn test_reorder_and_delete_keep_positions_contiguous() {
        let store = connect().await;
        let proposal = store.create_proposal(&sample_details()).await.unwrap();
        let mut ids = Vec::new();
        for title in ["A", "B", "C"] {
            let section = store
                .create_section(proposal.id, &SectionContent::new(title, "Text"))
                .await
                .unwrap();
            ids.push(section.id);
        }

        let sections = store
            .reorder_sections(proposal.id, &[ids[2], ids[0], ids[1]], None)
            .await
            .unwrap();
        assert_eq!(
            titles_and_positions(&sections),
            vec![("C".into(), 0), ("A".into(), 1), ("B".into(), 2)]
        );

        assert!(matches!(
            store.reorder_sections(proposal.id, &[ids[0], ids[1]], None).await,
            Err(AppError::Validation(_))
        ));

        store.delete_section(ids[2]).await.unwrap();
        let reloaded = store.get_proposal(proposal.id).await.unwrap();
        assert_eq!(
            titles_and_positions(&reloaded.sections),
            vec![("A".into(), 0), ("B".into(), 1)]
        );
        assert_eq!(reloaded.version, proposal.version + 5);

        store.delete_proposal(proposal.id).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a PostgreSQL database"]
    async fn test_concurrent_appends_get_distinct_positions() {
        let store = Arc::new(connect().await);
        let proposal = store.create_proposal(&sample_details()).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .create_section(proposal.id, &SectionContent::new(format!("S{}", i), ""))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let reloaded = store.get_proposal(proposal.id).await.unwrap();
        let positions: Vec<i32> = reloaded.sections.iter().map(|s| s.position).collect();
        assert_eq!(positions, (0..8).collect::<Vec<i32>>());

        let replaced = store
            .replace_sections(
                proposal.id,
                &[SectionContent::new("Summary", "x"), SectionContent::new("Pricing", "y")],
            )
            .await
            .unwrap();
        assert_eq!(
            titles_and_positions(&replaced),
            vec![("Summary".into(), 0), ("Pricing".into(), 1)]
        );

        store.delete_proposal(proposal.id).await.unwrap();
    }
}
