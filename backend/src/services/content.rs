//! Marketing site content: team, works, footer and page sections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct ContentService {
    db: PgPool,
}

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TeamMember {
    pub id: Uuid,
    pub name: String,
    pub role_title: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Work {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FooterLink {
    pub id: Uuid,
    pub section: String,
    pub label: String,
    pub url: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FooterContent {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Everything the site footer renders
#[derive(Debug, Serialize)]
pub struct Footer {
    pub links: Vec<FooterLink>,
    pub content: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PageSection {
    pub id: Uuid,
    pub page: String,
    pub section: String,
    pub content: serde_json::Value,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Inputs
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct TeamMemberInput {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 120, message = "Role title is required"))]
    pub role_title: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct WorkInput {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[validate(url(message = "Link must be a URL"))]
    pub link_url: Option<String>,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FooterLinkInput {
    #[validate(length(min = 1, max = 60, message = "Section is required"))]
    pub section: String,
    #[validate(length(min = 1, max = 120, message = "Label is required"))]
    pub label: String,
    #[validate(length(min = 1, max = 500, message = "URL is required"))]
    pub url: String,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Deserialize)]
pub struct FooterContentInput {
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct PageSectionInput {
    pub content: serde_json::Value,
}

/// Page, section and footer keys are short lowercase identifiers
pub fn validate_content_key(field: &str, key: &str) -> AppResult<()> {
    let valid = !key.is_empty()
        && key.len() <= 60
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(AppError::validation(
            field,
            "Use lowercase letters, digits, '_' or '-'",
        ))
    }
}

impl ContentService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ------------------------------------------------------------------------
    // Team
    // ------------------------------------------------------------------------

    pub async fn list_team(&self) -> AppResult<Vec<TeamMember>> {
        let rows = sqlx::query_as::<_, TeamMember>(
            "SELECT * FROM team_members ORDER BY position, created_at",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    pub async fn create_team_member(&self, input: TeamMemberInput) -> AppResult<TeamMember> {
        input.validate()?;
        let row = sqlx::query_as::<_, TeamMember>(
            r#"
            INSERT INTO team_members (name, role_title, bio, photo_url, position)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(input.name.trim())
        .bind(input.role_title.trim())
        .bind(&input.bio)
        .bind(&input.photo_url)
        .bind(input.position)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    pub async fn update_team_member(&self, id: Uuid, input: TeamMemberInput) -> AppResult<TeamMember> {
        input.validate()?;
        sqlx::query_as::<_, TeamMember>(
            r#"
            UPDATE team_members
            SET name = $2, role_title = $3, bio = $4, photo_url = $5, position = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(input.role_title.trim())
        .bind(&input.bio)
        .bind(&input.photo_url)
        .bind(input.position)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Team member".to_string()))
    }

    pub async fn delete_team_member(&self, id: Uuid) -> AppResult<()> {
        self.delete_by_id("team_members", "Team member", id).await
    }

    // ------------------------------------------------------------------------
    // Works
    // ------------------------------------------------------------------------

    pub async fn list_works(&self) -> AppResult<Vec<Work>> {
        let rows = sqlx::query_as::<_, Work>("SELECT * FROM works ORDER BY position, created_at")
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    pub async fn create_work(&self, input: WorkInput) -> AppResult<Work> {
        input.validate()?;
        let row = sqlx::query_as::<_, Work>(
            r#"
            INSERT INTO works (title, description, image_url, link_url, position)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(&input.image_url)
        .bind(&input.link_url)
        .bind(input.position)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    pub async fn update_work(&self, id: Uuid, input: WorkInput) -> AppResult<Work> {
        input.validate()?;
        sqlx::query_as::<_, Work>(
            r#"
            UPDATE works
            SET title = $2, description = $3, image_url = $4, link_url = $5, position = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(&input.image_url)
        .bind(&input.link_url)
        .bind(input.position)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Work".to_string()))
    }

    pub async fn delete_work(&self, id: Uuid) -> AppResult<()> {
        self.delete_by_id("works", "Work", id).await
    }

    // ------------------------------------------------------------------------
    // Footer
    // ------------------------------------------------------------------------

    pub async fn footer(&self) -> AppResult<Footer> {
        let links = sqlx::query_as::<_, FooterLink>(
            "SELECT * FROM footer_links ORDER BY section, position, created_at",
        )
        .fetch_all(&self.db)
        .await?;

        let content = sqlx::query_as::<_, (String, String)>("SELECT key, value FROM footer_content")
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .collect();

        Ok(Footer { links, content })
    }

    pub async fn create_footer_link(&self, input: FooterLinkInput) -> AppResult<FooterLink> {
        input.validate()?;
        let row = sqlx::query_as::<_, FooterLink>(
            r#"
            INSERT INTO footer_links (section, label, url, position)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(input.section.trim())
        .bind(input.label.trim())
        .bind(input.url.trim())
        .bind(input.position)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    pub async fn update_footer_link(&self, id: Uuid, input: FooterLinkInput) -> AppResult<FooterLink> {
        input.validate()?;
        sqlx::query_as::<_, FooterLink>(
            r#"
            UPDATE footer_links SET section = $2, label = $3, url = $4, position = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.section.trim())
        .bind(input.label.trim())
        .bind(input.url.trim())
        .bind(input.position)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Footer link".to_string()))
    }

    pub async fn delete_footer_link(&self, id: Uuid) -> AppResult<()> {
        self.delete_by_id("footer_links", "Footer link", id).await
    }

    /// Insert or replace one footer text entry
    pub async fn set_footer_content(&self, key: &str, value: &str) -> AppResult<FooterContent> {
        validate_content_key("key", key)?;
        let row = sqlx::query_as::<_, FooterContent>(
            r#"
            INSERT INTO footer_content (key, value) VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            RETURNING key, value, updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    // ------------------------------------------------------------------------
    // Pages
    // ------------------------------------------------------------------------

    /// Sections of one page keyed by section name
    pub async fn page(&self, page: &str) -> AppResult<BTreeMap<String, serde_json::Value>> {
        validate_content_key("page", page)?;
        let sections = sqlx::query_as::<_, (String, serde_json::Value)>(
            "SELECT section, content FROM page_content WHERE page = $1",
        )
        .bind(page)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .collect();
        Ok(sections)
    }

    pub async fn set_page_section(
        &self,
        editor: Uuid,
        page: &str,
        section: &str,
        content: serde_json::Value,
    ) -> AppResult<PageSection> {
        validate_content_key("page", page)?;
        validate_content_key("section", section)?;

        let row = sqlx::query_as::<_, PageSection>(
            r#"
            INSERT INTO page_content (page, section, content, updated_by)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (page, section)
            DO UPDATE SET content = EXCLUDED.content, updated_by = EXCLUDED.updated_by, updated_at = NOW()
            RETURNING id, page, section, content, updated_by, updated_at
            "#,
        )
        .bind(page)
        .bind(section)
        .bind(&content)
        .bind(editor)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete_by_id(&self, table: &'static str, resource: &str, id: Uuid) -> AppResult<()> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table))
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(resource.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_content_key() {
        assert!(validate_content_key("page", "home").is_ok());
        assert!(validate_content_key("page", "about-us_2").is_ok());
        assert!(validate_content_key("page", "").is_err());
        assert!(validate_content_key("page", "Home").is_err());
        assert!(validate_content_key("page", "../etc").is_err());
    }

    #[test]
    fn test_work_input_rejects_bad_link() {
        let input = WorkInput {
            title: "Landing page".to_string(),
            description: None,
            image_url: None,
            link_url: Some("nope".to_string()),
            position: 0,
        };
        assert!(input.validate().is_err());
    }
}
