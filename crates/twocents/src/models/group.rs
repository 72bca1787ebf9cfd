use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Member,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendGroup {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "crate::codec::iso8601")]
    pub date_created: DateTime<Utc>,
    pub owner_id: Uuid,
}

/// Membership row of a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub group_id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "crate::codec::iso8601")]
    pub joined_at: DateTime<Utc>,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub user: User,
    pub member: Member,
}

impl GroupMember {
    pub fn is_admin(&self) -> bool {
        self.member.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_group_member_decodes() {
        let member: GroupMember = serde_json::from_value(json!({
            "user": {
                "userId": "33333333-3333-4333-8333-333333333333",
                "username": "penny",
                "name": "Penny",
            },
            "member": {
                "groupId": "44444444-4444-4444-8444-444444444444",
                "userId": "33333333-3333-4333-8333-333333333333",
                "joinedAt": "2025-02-01",
                "role": "ADMIN",
            },
        }))
        .unwrap();

        assert!(member.is_admin());
        assert_eq!(member.user.display_name(), "Penny");
    }

    #[test]
    fn test_friend_group_round_trips_date_format() {
        let group: FriendGroup = serde_json::from_value(json!({
            "id": "44444444-4444-4444-8444-444444444444",
            "name": "Roommates",
            "dateCreated": "2025-02-01T08:30:00Z",
            "ownerId": "33333333-3333-4333-8333-333333333333",
        }))
        .unwrap();
        let encoded = serde_json::to_value(&group).unwrap();
        assert_eq!(encoded["dateCreated"], "2025-02-01T08:30:00.000Z");
    }
}
