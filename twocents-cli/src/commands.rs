use crate::{
    cli::{CacheAction, OutputFormat, PostKind},
    config::AppConfig,
    output::OutputManager,
};
use anyhow::{Context, Result, bail};
use bytes::Bytes;
use std::{path::PathBuf, sync::Arc};
use tracing::{debug, info};
use twocents_client::{
    ApiClient, FeedPager, HtmlMetadataProvider, JsonValidatorStore, MediaCacheManager, MediaKind,
    PostRequest, SessionTokens, group_by_day, resolve_media,
};
use url::Url;
use uuid::Uuid;

const VALIDATORS_FILE: &str = "validators.json";

pub struct CommandExecutor {
    client: ApiClient,
    cache: MediaCacheManager,
    output: OutputManager,
}

/// Options given on the command line that override the configuration file
#[derive(Debug, Default)]
pub struct Overrides {
    pub token: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Option<u64>,
}

impl CommandExecutor {
    pub async fn new(
        config: &AppConfig,
        overrides: Overrides,
        format: OutputFormat,
    ) -> Result<Self> {
        let client_config = config.client_config(overrides.base_url.as_deref(), overrides.timeout);

        let tokens = SessionTokens::new();
        if let Some(token) = overrides.token.or_else(|| config.token.clone()) {
            tokens.sign_in(token);
        }

        let client = ApiClient::new(&client_config, Arc::new(tokens))
            .context("Failed to create API client")?;

        let cache_dir = client_config.cache_config.directory();
        let validators = JsonValidatorStore::open(cache_dir.join(VALIDATORS_FILE))
            .await
            .context("Failed to open validator store")?;

        let link_provider = Arc::new(HtmlMetadataProvider::new(client.transport()));
        let cache = MediaCacheManager::new(
            client_config.cache_config.clone(),
            client.transport(),
            Arc::new(validators),
        )
        .await
        .context("Failed to initialize media cache")?
        .with_link_provider(link_provider);

        debug!(base_url = %client.base_url(), cache_dir = ?cache.cache_dir(), "Executor ready");
        Ok(Self {
            client,
            cache,
            output: OutputManager::new(format),
        })
    }

    pub async fn fetch(&self, url: &str, kind: MediaKind) -> Result<()> {
        let media = self
            .cache
            .fetch(url, kind)
            .await
            .with_context(|| format!("Failed to fetch {url}"))?;
        println!("{}", self.output.format_cached(&media)?);
        Ok(())
    }

    pub async fn whoami(&self) -> Result<()> {
        let user = self.client.get_current_user().await?;
        println!("{}", self.output.format_user(&user)?);
        Ok(())
    }

    pub async fn groups(&self) -> Result<()> {
        let groups = self.client.get_user_groups().await?;
        println!("{}", self.output.format_groups(&groups)?);
        Ok(())
    }

    pub async fn members(&self, group: Uuid) -> Result<()> {
        let members = self.client.get_members(group).await?;
        println!("{}", self.output.format_members(&members)?);
        Ok(())
    }

    pub async fn feed(&self, group: Uuid, all: bool, resolve: bool) -> Result<()> {
        let mut pager = FeedPager::new(&self.client, group);
        pager.load_initial().await?;

        while all && pager.can_load_more() {
            let added = pager.load_more().await?.len();
            debug!(added, "Loaded feed page");
        }

        let posts = pager.into_posts();
        info!(group = %group, count = posts.len(), "Feed loaded");
        println!("{}", self.output.format_feed(&group_by_day(&posts))?);

        if resolve {
            for item in &posts {
                let resolved = resolve_media(&item.media, &self.cache).await;
                if !resolved.is_empty() {
                    println!("{}", self.output.format_resolved(&resolved)?);
                }
            }
        }
        Ok(())
    }

    pub async fn top(&self, group: Uuid) -> Result<()> {
        let post = self.client.get_top_post(group).await?;
        println!("{}", self.output.format_post(&post)?);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn post(
        &self,
        kind: PostKind,
        file: Option<PathBuf>,
        text: Option<String>,
        link: Option<String>,
        caption: Option<String>,
        groups: Vec<Uuid>,
    ) -> Result<()> {
        // Validate the content before creating the post
        let content = match kind {
            PostKind::Image | PostKind::Video => {
                let Some(path) = file else {
                    bail!("--file is required for {kind:?} posts");
                };
                let data = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                PostContent::File(Bytes::from(data))
            }
            PostKind::Link => {
                let link = link.context("--link is required for link posts")?;
                PostContent::Link(Url::parse(&link).context("Invalid link URL")?)
            }
            PostKind::Text => PostContent::Text(text.context("--text is required for text posts")?),
        };

        let mut request = PostRequest::new(kind.into(), groups);
        if let Some(caption) = caption {
            request = request.with_caption(caption);
        }

        let post = self.client.create_post(&request).await?;
        info!(post = %post.id, media = %post.media, "Post created");

        match content {
            PostContent::File(data) => {
                self.client.upload_media_post(&post, data).await?;
            }
            PostContent::Link(url) => {
                self.client.upload_link_post(&post, &url).await?;
            }
            PostContent::Text(text) => {
                self.client.upload_text_post(&post, &text).await?;
            }
        }

        println!("{}", post.id);
        Ok(())
    }

    pub async fn cache(&self, action: CacheAction) -> Result<()> {
        match action {
            CacheAction::Sweep => {
                let report = self.cache.sweep().await?;
                println!("{}", self.output.format_sweep(&report)?);
            }
            CacheAction::Clear => {
                let removed = self.cache.clear().await?;
                println!("Removed {removed} cached files");
            }
            CacheAction::Info => {
                let usage = self.cache.usage().await?;
                println!("{}", self.output.format_usage(self.cache.cache_dir(), &usage)?);
            }
        }
        Ok(())
    }
}

enum PostContent {
    File(Bytes),
    Link(Url),
    Text(String),
}
