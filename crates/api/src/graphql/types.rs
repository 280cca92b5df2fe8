//! GraphQL object types over the database models.

use async_graphql::{Context, Object, Result, SimpleObject};
use revoltwiki_core::access::AccessLevel;
use revoltwiki_core::diff::DiffSpan;
use revoltwiki_core::member::contributions_by_article;
use revoltwiki_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use revoltwiki_core::permissions::{can_manage_article, can_manage_version, Action, Caller};
use revoltwiki_core::types::{DbId, Timestamp};
use revoltwiki_db::models::article::{Article, ArticleFilter};
use revoltwiki_db::models::article_version::ArticleVersion;
use revoltwiki_db::models::category::Category;
use revoltwiki_db::models::member::MemberResponse;
use revoltwiki_db::repositories::{ArticleRepo, ArticleVersionRepo, CategoryRepo, MemberRepo};
use sqlx::PgPool;

/* --------------------------------------------------------------------------
Context helpers
-------------------------------------------------------------------------- */

pub(super) fn pool<'ctx>(ctx: &Context<'ctx>) -> Result<&'ctx PgPool> {
    ctx.data::<PgPool>()
}

pub(super) fn caller<'ctx>(ctx: &Context<'ctx>) -> Result<&'ctx Caller> {
    ctx.data::<Caller>()
}

/// Log a database failure and hide its details from the client.
pub(super) fn internal(err: sqlx::Error) -> async_graphql::Error {
    tracing::error!(error = %err, "GraphQL database error");
    async_graphql::Error::new("Internal server error")
}

pub(super) fn readable_article(caller: &Caller, article: Article) -> Option<ArticleObject> {
    can_manage_article(caller, Action::View, article.access_level())
        .then_some(ArticleObject(article))
}

pub(super) fn readable_version(
    caller: &Caller,
    version: ArticleVersion,
) -> Option<ArticleVersionObject> {
    can_manage_version(caller, Action::View, version.access_level())
        .then_some(ArticleVersionObject(version))
}

pub(super) async fn load_member(pool: &PgPool, id: DbId) -> Result<Option<MemberObject>> {
    let member = MemberRepo::find_by_id(pool, id).await.map_err(internal)?;
    Ok(member.map(|m| MemberObject(MemberResponse::from(&m))))
}

async fn load_members(pool: &PgPool, ids: &[DbId]) -> Result<Vec<MemberObject>> {
    let mut members = Vec::with_capacity(ids.len());
    for &id in ids {
        if let Some(member) = load_member(pool, id).await? {
            members.push(member);
        }
    }
    Ok(members)
}

pub(super) fn article_filter(
    caller: &Caller,
    category_id: Option<DbId>,
    limit: Option<i64>,
    offset: Option<i64>,
) -> ArticleFilter {
    ArticleFilter {
        category_id,
        include_deleted: false,
        visible_access: AccessLevel::visible_to(&caller.roles),
        limit: clamp_limit(limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT),
        offset: clamp_offset(offset),
    }
}

/* --------------------------------------------------------------------------
Article
-------------------------------------------------------------------------- */

pub struct ArticleObject(pub Article);

#[Object(name = "Article")]
impl ArticleObject {
    async fn id(&self) -> DbId {
        self.0.id
    }

    async fn title(&self) -> &str {
        &self.0.title
    }

    async fn slug(&self) -> String {
        self.0.slug()
    }

    /// Access bitmask: 1 everyone, 2 staff, 4 superusers.
    async fn access(&self) -> i16 {
        self.0.access
    }

    async fn deleted(&self) -> bool {
        self.0.deleted
    }

    async fn created_at(&self) -> Timestamp {
        self.0.created_at
    }

    async fn updated_at(&self) -> Timestamp {
        self.0.updated_at
    }

    async fn created_by(&self, ctx: &Context<'_>) -> Result<Option<MemberObject>> {
        load_member(pool(ctx)?, self.0.created_by).await
    }

    async fn category(&self, ctx: &Context<'_>) -> Result<Option<CategoryObject>> {
        let Some(category_id) = self.0.category_id else {
            return Ok(None);
        };
        let category = CategoryRepo::find_by_id(pool(ctx)?, category_id)
            .await
            .map_err(internal)?;
        Ok(category.map(CategoryObject))
    }

    /// All versions, oldest first.
    async fn versions(&self, ctx: &Context<'_>) -> Result<Vec<ArticleVersionObject>> {
        let versions = ArticleVersionRepo::list_by_article(pool(ctx)?, self.0.id)
            .await
            .map_err(internal)?;
        Ok(versions.into_iter().map(ArticleVersionObject).collect())
    }

    async fn current_version(&self, ctx: &Context<'_>) -> Result<Option<ArticleVersionObject>> {
        let Some(version_id) = self.0.current_version_id else {
            return Ok(None);
        };
        let version = ArticleVersionRepo::find_by_id(pool(ctx)?, version_id)
            .await
            .map_err(internal)?;
        Ok(version.map(ArticleVersionObject))
    }

    /// Distinct version authors in first-contribution order.
    async fn authors(&self, ctx: &Context<'_>) -> Result<Vec<MemberObject>> {
        let pool = pool(ctx)?;
        let detail = ArticleRepo::detail(pool, self.0.clone())
            .await
            .map_err(internal)?;
        load_members(pool, &detail.authors).await
    }

    async fn last_edited_by(&self, ctx: &Context<'_>) -> Result<Option<MemberObject>> {
        let pool = pool(ctx)?;
        let detail = ArticleRepo::detail(pool, self.0.clone())
            .await
            .map_err(internal)?;
        match detail.last_edited_by {
            Some(id) => load_member(pool, id).await,
            None => Ok(None),
        }
    }
}

/* --------------------------------------------------------------------------
ArticleVersion
-------------------------------------------------------------------------- */

/// One span of a stored diff. `type` is -1 (delete), 0 (equal) or 1 (insert).
#[derive(SimpleObject)]
#[graphql(name = "DiffSpan")]
pub struct DiffSpanObject {
    #[graphql(name = "type")]
    pub op: i32,
    pub text: String,
}

impl From<&DiffSpan> for DiffSpanObject {
    fn from(span: &DiffSpan) -> Self {
        Self {
            op: i32::from(span.op.code()),
            text: span.text.clone(),
        }
    }
}

#[derive(SimpleObject)]
#[graphql(name = "DiffStats")]
pub struct DiffStatsObject {
    pub insertions: i64,
    pub deletions: i64,
    pub distance: i64,
}

pub struct ArticleVersionObject(pub ArticleVersion);

#[Object(name = "ArticleVersion")]
impl ArticleVersionObject {
    async fn id(&self) -> DbId {
        self.0.id
    }

    async fn content(&self) -> &str {
        &self.0.content
    }

    async fn created_at(&self) -> Timestamp {
        self.0.created_at
    }

    async fn created_by(&self, ctx: &Context<'_>) -> Result<Option<MemberObject>> {
        load_member(pool(ctx)?, self.0.created_by).await
    }

    /// The article this version belongs to; `null` once it is deleted.
    async fn parent_article(&self, ctx: &Context<'_>) -> Result<Option<ArticleObject>> {
        let article = ArticleRepo::find_by_id(pool(ctx)?, self.0.article_id)
            .await
            .map_err(internal)?;
        let caller = caller(ctx)?;
        Ok(article.and_then(|a| readable_article(caller, a)))
    }

    /// Spans turning the previous version's content into this one.
    async fn diff(&self) -> Vec<DiffSpanObject> {
        self.0.diff.0.iter().map(DiffSpanObject::from).collect()
    }

    async fn stats(&self) -> DiffStatsObject {
        let stats = self.0.diff_stats();
        DiffStatsObject {
            insertions: stats.insertions as i64,
            deletions: stats.deletions as i64,
            distance: stats.distance as i64,
        }
    }
}

/* --------------------------------------------------------------------------
Category
-------------------------------------------------------------------------- */

pub struct CategoryObject(pub Category);

#[Object(name = "Category")]
impl CategoryObject {
    async fn id(&self) -> DbId {
        self.0.id
    }

    async fn title(&self) -> &str {
        &self.0.title
    }

    async fn slug(&self) -> String {
        self.0.slug()
    }

    async fn created_at(&self) -> Timestamp {
        self.0.created_at
    }

    /// Live articles in this category the caller may read.
    async fn articles(
        &self,
        ctx: &Context<'_>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<ArticleObject>> {
        let filter = article_filter(caller(ctx)?, Some(self.0.id), limit, offset);
        let articles = ArticleRepo::list(pool(ctx)?, &filter)
            .await
            .map_err(internal)?;
        Ok(articles.into_iter().map(ArticleObject).collect())
    }
}

/* --------------------------------------------------------------------------
Member
-------------------------------------------------------------------------- */

pub struct MemberObject(pub MemberResponse);

#[Object(name = "Member")]
impl MemberObject {
    async fn id(&self) -> DbId {
        self.0.id
    }

    async fn username(&self) -> &str {
        &self.0.username
    }

    async fn email(&self) -> &str {
        &self.0.email
    }

    async fn full_name(&self) -> &str {
        &self.0.full_name
    }

    async fn short_name(&self) -> &str {
        &self.0.short_name
    }

    async fn is_staff(&self) -> bool {
        self.0.is_staff
    }

    async fn is_superuser(&self) -> bool {
        self.0.is_superuser
    }

    async fn date_joined(&self) -> Timestamp {
        self.0.date_joined
    }

    /// Versions this member wrote that the caller may read, oldest first.
    async fn contributions_by_version(
        &self,
        ctx: &Context<'_>,
    ) -> Result<Vec<ArticleVersionObject>> {
        let pool = pool(ctx)?;
        let caller = caller(ctx)?;
        let contributions = ArticleVersionRepo::contributions(pool, self.0.id)
            .await
            .map_err(internal)?;

        let mut versions = Vec::with_capacity(contributions.len());
        for (version_id, _) in contributions {
            let version = ArticleVersionRepo::find_by_id(pool, version_id)
                .await
                .map_err(internal)?;
            versions.extend(version.and_then(|v| readable_version(caller, v)));
        }
        Ok(versions)
    }

    /// Live articles this member contributed to, in first-contribution order.
    async fn contributions_by_article(&self, ctx: &Context<'_>) -> Result<Vec<ArticleObject>> {
        let pool = pool(ctx)?;
        let caller = caller(ctx)?;
        let contributions = ArticleVersionRepo::contributions(pool, self.0.id)
            .await
            .map_err(internal)?;

        let ids = contributions_by_article(contributions.iter().map(|(_, a)| *a));
        let mut articles = Vec::with_capacity(ids.len());
        for id in ids {
            let article = ArticleRepo::find_by_id(pool, id).await.map_err(internal)?;
            articles.extend(article.and_then(|a| readable_article(caller, a)));
        }
        Ok(articles)
    }
}
