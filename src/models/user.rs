use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Registered news reader (collection "users")
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    /// bcrypt hash, never the plaintext password
    pub password: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub created_at: i64,
}
