use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use twocents_client::{Media, MediaKind};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(
    name = "twocents",
    about = "TwoCents - share your two cents with your friend groups from the command line",
    version,
    author
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Bearer token of the signed-in session
    #[arg(long, global = true, env = "TWOCENTS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Override the API base URL from the configuration
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(short, long, global = true, default_value = "pretty")]
    pub output: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a remote file through the media cache and print its local path
    Fetch {
        /// Remote URL of the media
        url: String,

        /// What the URL points at
        #[arg(short, long, default_value = "image")]
        kind: KindArg,
    },

    /// Show the signed-in user
    Whoami,

    /// List the groups of the signed-in user
    Groups,

    /// List the members of a group
    Members {
        #[arg(short, long)]
        group: Uuid,
    },

    /// Show a group feed, grouped by day
    Feed {
        #[arg(short, long)]
        group: Uuid,

        /// Keep loading pages until the feed is exhausted
        #[arg(long)]
        all: bool,

        /// Download the media of every post into the cache
        #[arg(long)]
        resolve: bool,
    },

    /// Show the newest post of a group
    Top {
        #[arg(short, long)]
        group: Uuid,
    },

    /// Create a post and upload its content
    Post {
        /// Kind of post
        #[arg(short, long)]
        kind: PostKind,

        /// File to upload (image and video posts)
        #[arg(short, long, required_if_eq_any = [("kind", "image"), ("kind", "video")])]
        file: Option<PathBuf>,

        /// Text of a text post
        #[arg(long, required_if_eq("kind", "text"))]
        text: Option<String>,

        /// URL shared by a link post
        #[arg(long, required_if_eq("kind", "link"))]
        link: Option<String>,

        /// Optional caption
        #[arg(long)]
        caption: Option<String>,

        /// Groups to share the post with
        #[arg(short, long = "group", required = true, num_args = 1..)]
        groups: Vec<Uuid>,
    },

    /// Manage the local media cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show configuration information
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Evict expired and least recently used files
    Sweep,
    /// Remove every cached file
    Clear,
    /// Show the cache location and size
    Info,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindArg {
    Image,
    Video,
    Link,
}

impl From<KindArg> for MediaKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Image => MediaKind::Image,
            KindArg::Video => MediaKind::Video,
            KindArg::Link => MediaKind::Link,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostKind {
    Image,
    Video,
    Link,
    Text,
}

impl From<PostKind> for Media {
    fn from(kind: PostKind) -> Self {
        match kind {
            PostKind::Image => Media::Image,
            PostKind::Video => Media::Video,
            PostKind::Link => Media::Link,
            PostKind::Text => Media::Text,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON output
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Pretty => write!(f, "pretty"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_fetch_defaults_to_image() {
        let args = Args::try_parse_from(["twocents", "fetch", "https://cdn.test/a.jpg"]).unwrap();
        match args.command {
            Commands::Fetch { url, kind } => {
                assert_eq!(url, "https://cdn.test/a.jpg");
                assert_eq!(kind, KindArg::Image);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(args.output, OutputFormat::Pretty);
    }

    #[test]
    fn test_text_post_requires_text() {
        let group = Uuid::new_v4().to_string();
        let group = group.as_str();
        let err = Args::try_parse_from(["twocents", "post", "--kind", "text", "--group", group])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let args = Args::try_parse_from([
            "twocents", "post", "--kind", "text", "--text", "hello", "--group", group,
        ])
        .unwrap();
        match args.command {
            Commands::Post { kind, text, groups, .. } => {
                assert_eq!(Media::from(kind), Media::Text);
                assert_eq!(text.as_deref(), Some("hello"));
                assert_eq!(groups.len(), 1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let err = Args::try_parse_from(["twocents", "-q", "-v", "groups"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_cache_subcommand() {
        let args = Args::try_parse_from(["twocents", "cache", "sweep"]).unwrap();
        assert!(matches!(
            args.command,
            Commands::Cache {
                action: CacheAction::Sweep
            }
        ));
    }
}
