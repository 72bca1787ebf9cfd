use serde::Serialize;
use uuid::Uuid;

use super::ApiClient;
use crate::error::Result;
use crate::models::{AddPostRequest, FriendGroup, GroupMember};

#[derive(Serialize)]
struct CreateGroup<'a> {
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddMember {
    friend_id: Uuid,
    group_id: Uuid,
}

impl ApiClient {
    pub async fn create_group(&self, name: &str) -> Result<FriendGroup> {
        self.post_json("group/create-group", CreateGroup { name }).await
    }

    /// Add a friend to a group owned by the signed-in user
    pub async fn add_member(&self, group_id: Uuid, friend_id: Uuid) -> Result<FriendGroup> {
        self.post_json("group/add-member", AddMember { friend_id, group_id })
            .await
    }

    pub async fn get_members(&self, group_id: Uuid) -> Result<Vec<GroupMember>> {
        let url =
            self.endpoint_with_query("group/get-members", &[("groupId", group_id.to_string())])?;
        self.get_json(url).await
    }

    /// Groups the signed-in user belongs to
    pub async fn get_user_groups(&self) -> Result<Vec<FriendGroup>> {
        self.get_json(self.endpoint("group/get-user-groups")?).await
    }

    /// Share an existing post with more groups. Groups the user is not a
    /// member of are skipped by the server.
    pub async fn add_post_to_groups(&self, post_id: Uuid, groups: Vec<Uuid>) -> Result<()> {
        self.post("group/add-post", AddPostRequest { post_id, groups })
            .await?;
        Ok(())
    }
}
