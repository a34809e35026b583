//! Entity types for the authoritative relational store (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserStatus {
    Normal,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupStatus {
    Normal,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AddMode {
    Direct,
    Approval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ContactType {
    User,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ContactStatus {
    Normal,
    Black,
    BeBlack,
    QuitGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplyStatus {
    Pending,
    Agree,
    Refuse,
    Black,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    Text,
    File,
    Av,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageStatus {
    Unsent,
    Sent,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub uuid: String,
    pub telephone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub nickname: String,
    pub avatar: String,
    pub email: Option<String>,
    pub gender: Option<i32>,
    pub birthday: Option<String>,
    pub signature: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_admin: bool,
    pub status: UserStatus,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Group {
    pub uuid: String,
    pub name: String,
    pub notice: Option<String>,
    pub owner_user_id: String,
    pub member_count: i64,
    pub add_mode: AddMode,
    pub avatar: String,
    pub status: GroupStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GroupMember {
    pub group_id: String,
    pub user_id: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserContact {
    pub user_id: String,
    pub contact_id: String,
    pub contact_type: ContactType,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContactApply {
    pub uuid: String,
    pub applicant_user_id: String,
    pub target_id: String,
    pub contact_type: ContactType,
    pub status: ApplyStatus,
    pub message: Option<String>,
    pub last_apply_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Session {
    pub uuid: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub receiver_display_name: String,
    pub avatar: String,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Message {
    pub uuid: String,
    pub session_id: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub content: Option<String>,
    pub url: Option<String>,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_avatar: String,
    pub receiver_id: String,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    pub file_name: Option<String>,
    pub status: MessageStatus,
    pub av_data: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Format the creation timestamp the way egress envelopes and history
    /// responses render it on the wire (spec.md §6).
    pub fn created_at_display(&self) -> String {
        self.created_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
