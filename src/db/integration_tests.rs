//! Repository-layer integration tests against a real MySQL instance
//! (spec.md §8, two of the six end-to-end scenarios). Gated behind the
//! `database-tests` feature: `cargo test --features database-tests` with
//! `DATABASE_URL` pointed at a MySQL server `sqlx::test` can provision
//! per-test databases against.

use super::contact::ContactRepository;
use super::contact_apply::ContactApplyRepository;
use super::entities::{AddMode, ContactStatus, ContactType, MessageType};
use super::group::GroupRepository;
use super::group_member::GroupMemberRepository;
use super::message::{MessageRepository, NewMessage};
use super::session::SessionRepository;
use super::user::UserRepository;
use crate::ids::{Kind, new_id};
use sqlx::MySqlPool;

/// spec.md §3 invariant: registering a telephone number that belongs to a
/// soft-deleted account revives that row instead of minting a new uuid.
#[sqlx::test]
async fn register_revives_soft_deleted_user(pool: MySqlPool) {
    let telephone = "13800000001";

    let mut tx = pool.begin().await.unwrap();
    let original = UserRepository::insert(&mut tx, telephone, "hash-v1", "老王").await.unwrap();
    tx.commit().await.unwrap();

    UserRepository::new(&pool).soft_delete(&[original.uuid.clone()]).await.unwrap();

    assert!(UserRepository::new(&pool).find_active_by_telephone(telephone).await.unwrap().is_none());

    let mut tx = pool.begin().await.unwrap();
    assert!(UserRepository::find_active_by_telephone_for_update(&mut tx, telephone).await.unwrap().is_none());
    let deleted = UserRepository::find_deleted_by_telephone_for_update(&mut tx, telephone)
        .await
        .unwrap()
        .expect("soft-deleted row must still be found for revival");
    assert_eq!(deleted.uuid, original.uuid);

    let revived = UserRepository::revive(&mut tx, &deleted.uuid, "hash-v2", "老王二号").await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(revived.uuid, original.uuid, "revival reuses the original uuid");
    assert_eq!(revived.nickname, "老王二号");
    assert!(revived.deleted_at.is_none());

    let active = UserRepository::new(&pool)
        .find_active_by_telephone(telephone)
        .await
        .unwrap()
        .expect("revived account is active again");
    assert_eq!(active.uuid, original.uuid);
}

/// spec.md §3 invariant 1 / §4.B: dismissing a group soft-deletes the group
/// row, hard-deletes its memberships, and cascades soft-deletes across
/// every session/contact/contact-apply/message row that references it.
#[sqlx::test]
async fn dismiss_group_cascades_across_dependents(pool: MySqlPool) {
    let mut tx = pool.begin().await.unwrap();
    let owner = UserRepository::insert(&mut tx, "13800000002", "hash", "群主").await.unwrap();
    let member = UserRepository::insert(&mut tx, "13800000003", "hash", "群员").await.unwrap();
    tx.commit().await.unwrap();

    let group = GroupRepository::new(&pool)
        .insert("测试群", None, &owner.uuid, AddMode::Direct, "")
        .await
        .unwrap();
    let gid = group.uuid.clone();

    let mut tx = pool.begin().await.unwrap();
    GroupMemberRepository::insert(&mut tx, &gid, &owner.uuid).await.unwrap();
    GroupMemberRepository::insert(&mut tx, &gid, &member.uuid).await.unwrap();
    tx.commit().await.unwrap();

    SessionRepository::new(&pool).insert(&member.uuid, &gid, "测试群", "").await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    ContactRepository::upsert(&mut tx, &member.uuid, &gid, ContactType::Group, ContactStatus::Normal)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let applicant_uuid = new_id(Kind::User);
    ContactApplyRepository::new(&pool)
        .upsert_pending(&applicant_uuid, &gid, ContactType::Group, None)
        .await
        .unwrap();

    let message = MessageRepository::new(&pool)
        .insert(NewMessage {
            session_id: "unused",
            message_type: MessageType::Text,
            content: Some("hello group"),
            url: None,
            sender_id: &member.uuid,
            sender_name: "群员",
            sender_avatar: "",
            receiver_id: &gid,
            file_size: None,
            file_type: None,
            file_name: None,
            av_data: None,
        })
        .await
        .unwrap();

    // The cascade itself, mirroring services::group::dismiss_internal.
    let mut tx = pool.begin().await.unwrap();
    GroupRepository::find_for_update(&mut tx, &gid).await.unwrap().expect("group exists before dismissal");
    GroupRepository::soft_delete(&mut tx, &gid).await.unwrap();
    GroupMemberRepository::remove_all(&mut tx, &gid).await.unwrap();
    SessionRepository::soft_delete_by_receiver(&mut tx, &gid).await.unwrap();
    ContactRepository::soft_delete_by_group(&mut tx, &gid).await.unwrap();
    ContactApplyRepository::new(&pool).soft_delete_by_group(&mut tx, &gid).await.unwrap();
    MessageRepository::delete_by_group(&mut tx, &gid).await.unwrap();
    tx.commit().await.unwrap();

    assert!(GroupRepository::new(&pool).find_by_id(&gid).await.unwrap().is_none(), "group is soft-deleted");
    assert!(
        GroupMemberRepository::new(&pool).member_ids(&gid).await.unwrap().is_empty(),
        "memberships are hard-deleted"
    );
    assert!(
        SessionRepository::new(&pool).find(&member.uuid, &gid).await.unwrap().is_none(),
        "session referencing the group is soft-deleted"
    );
    assert!(
        ContactRepository::new(&pool).find(&member.uuid, &gid).await.unwrap().is_none(),
        "contact referencing the group is soft-deleted"
    );
    let apply = ContactApplyRepository::new(&pool).find_pair(&applicant_uuid, &gid).await.unwrap().unwrap();
    assert_eq!(apply.status, super::entities::ApplyStatus::Refuse);
    assert!(
        MessageRepository::new(&pool).find_by_id(&message.uuid).await.unwrap().is_none(),
        "message addressed to the group is hard-deleted"
    );
}
