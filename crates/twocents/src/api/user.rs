use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use super::ApiClient;
use crate::error::Result;
use crate::models::User;
use crate::multipart::MultipartForm;

#[derive(Serialize)]
struct RegisterUser<'a> {
    username: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FriendRequest {
    friend_id: Uuid,
}

impl ApiClient {
    /// Create the profile of the signed-in account
    pub async fn register_user(&self, username: &str) -> Result<User> {
        self.post_json("user/register-user", RegisterUser { username })
            .await
    }

    pub async fn get_current_user(&self) -> Result<User> {
        self.get_json(self.endpoint("user/get-current-user")?).await
    }

    pub async fn send_friend_request(&self, friend_id: Uuid) -> Result<()> {
        self.post("user/friend-request", FriendRequest { friend_id })
            .await?;
        Ok(())
    }

    pub async fn accept_friend_request(&self, friend_id: Uuid) -> Result<()> {
        self.post("user/accept-friend-request", FriendRequest { friend_id })
            .await?;
        Ok(())
    }

    /// Replace the profile picture with a JPEG image
    pub async fn update_profile_pic(&self, image: Bytes) -> Result<()> {
        let form = MultipartForm::new().file_part("file", "profile.jpeg", "image/jpeg", image);
        self.post_multipart("user/update-profile-pic", &form).await?;
        Ok(())
    }
}
