//! Wire models exchanged with the API. JSON field names are camelCase.

mod group;
mod media;
mod post;
mod user;

pub use group::{FriendGroup, GroupMember, Member, Role};
pub use media::{
    ImageDownload, LinkDownload, MediaPayload, PaginatedPosts, PostWithMedia, TextDownload,
    VideoDownload,
};
pub use post::{AddPostRequest, Media, Post, PostRequest};
pub use user::User;
