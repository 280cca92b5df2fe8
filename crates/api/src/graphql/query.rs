use async_graphql::{Context, Object, Result};
use revoltwiki_core::access::AccessLevel;
use revoltwiki_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use revoltwiki_core::types::DbId;
use revoltwiki_db::models::member::MemberResponse;
use revoltwiki_db::repositories::{ArticleRepo, ArticleVersionRepo, CategoryRepo, MemberRepo};

use super::types::{
    article_filter, caller, internal, load_member, pool, readable_article, readable_version,
    ArticleObject, ArticleVersionObject, CategoryObject, MemberObject,
};

/// Root of every read query.
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// A live article, or `null` if it is missing or hidden from the caller.
    async fn article(&self, ctx: &Context<'_>, id: DbId) -> Result<Option<ArticleObject>> {
        let caller = caller(ctx)?;
        let article = ArticleRepo::find_by_id(pool(ctx)?, id)
            .await
            .map_err(internal)?;
        Ok(article.and_then(|a| readable_article(caller, a)))
    }

    async fn all_articles(
        &self,
        ctx: &Context<'_>,
        category_id: Option<DbId>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<ArticleObject>> {
        let filter = article_filter(caller(ctx)?, category_id, limit, offset);
        let articles = ArticleRepo::list(pool(ctx)?, &filter)
            .await
            .map_err(internal)?;
        Ok(articles.into_iter().map(ArticleObject).collect())
    }

    async fn article_version(
        &self,
        ctx: &Context<'_>,
        id: DbId,
    ) -> Result<Option<ArticleVersionObject>> {
        let caller = caller(ctx)?;
        let version = ArticleVersionRepo::find_by_id(pool(ctx)?, id)
            .await
            .map_err(internal)?;
        Ok(version.and_then(|v| readable_version(caller, v)))
    }

    /// Versions of live articles the caller may read, newest first.
    async fn all_article_versions(
        &self,
        ctx: &Context<'_>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<ArticleVersionObject>> {
        let visible = AccessLevel::visible_to(&caller(ctx)?.roles);
        let versions = ArticleVersionRepo::list(
            pool(ctx)?,
            &visible,
            clamp_limit(limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT),
            clamp_offset(offset),
        )
        .await
        .map_err(internal)?;
        Ok(versions.into_iter().map(ArticleVersionObject).collect())
    }

    async fn category(&self, ctx: &Context<'_>, id: DbId) -> Result<Option<CategoryObject>> {
        let category = CategoryRepo::find_by_id(pool(ctx)?, id)
            .await
            .map_err(internal)?;
        Ok(category.map(CategoryObject))
    }

    async fn all_categories(&self, ctx: &Context<'_>) -> Result<Vec<CategoryObject>> {
        let categories = CategoryRepo::list(pool(ctx)?).await.map_err(internal)?;
        Ok(categories.into_iter().map(CategoryObject).collect())
    }

    async fn member(&self, ctx: &Context<'_>, id: DbId) -> Result<Option<MemberObject>> {
        load_member(pool(ctx)?, id).await
    }

    async fn all_members(
        &self,
        ctx: &Context<'_>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<MemberObject>> {
        let members = MemberRepo::list(
            pool(ctx)?,
            clamp_limit(limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT),
            clamp_offset(offset),
        )
        .await
        .map_err(internal)?;
        Ok(members
            .iter()
            .map(|m| MemberObject(MemberResponse::from(m)))
            .collect())
    }

    /// The authenticated member, or `null` for anonymous callers.
    async fn me(&self, ctx: &Context<'_>) -> Result<Option<MemberObject>> {
        match caller(ctx)?.member_id {
            Some(id) => load_member(pool(ctx)?, id).await,
            None => Ok(None),
        }
    }
}
