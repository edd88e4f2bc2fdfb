//! Repositories for `projects` and `project_members`.

use planpoker_core::types::DbId;
use sqlx::PgPool;

use crate::models::project::{CreateProject, Project, ProjectMember};

const PROJECT_COLUMNS: &str = "id, name, description, created_at, updated_at";

const MEMBER_COLUMNS: &str = "id, project_id, user_id, role, joined_at";

/// Minimal project access; project management itself is handled elsewhere.
pub struct ProjectRepo;

impl ProjectRepo {
    pub async fn create(pool: &PgPool, input: &CreateProject) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (name, description) VALUES ($1, $2) RETURNING {PROJECT_COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

/// Project membership and role checks.
pub struct ProjectMemberRepo;

impl ProjectMemberRepo {
    /// Add a user to a project with the given role, or update their role if
    /// they are already a member.
    pub async fn upsert(
        pool: &PgPool,
        project_id: DbId,
        user_id: DbId,
        role: &str,
    ) -> Result<ProjectMember, sqlx::Error> {
        let query = format!(
            "INSERT INTO project_members (project_id, user_id, role) VALUES ($1, $2, $3) \
             ON CONFLICT (project_id, user_id) DO UPDATE SET role = EXCLUDED.role \
             RETURNING {MEMBER_COLUMNS}"
        );
        sqlx::query_as::<_, ProjectMember>(&query)
            .bind(project_id)
            .bind(user_id)
            .bind(role)
            .fetch_one(pool)
            .await
    }

    /// Whether the user holds one of `roles` on the project.
    pub async fn has_role(
        pool: &PgPool,
        project_id: DbId,
        user_id: DbId,
        roles: &[&str],
    ) -> Result<bool, sqlx::Error> {
        let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS ( \
                 SELECT 1 FROM project_members \
                 WHERE project_id = $1 AND user_id = $2 AND role = ANY($3) \
             )",
        )
        .bind(project_id)
        .bind(user_id)
        .bind(&roles)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Whether the user holds one of `roles` on the project owning the
    /// planning session.
    pub async fn has_role_for_session(
        pool: &PgPool,
        session_id: DbId,
        user_id: DbId,
        roles: &[&str],
    ) -> Result<bool, sqlx::Error> {
        let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS ( \
                 SELECT 1 FROM planning_sessions ps \
                 JOIN project_members pm ON pm.project_id = ps.project_id \
                 WHERE ps.id = $1 AND pm.user_id = $2 AND pm.role = ANY($3) \
             )",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(&roles)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }
}
