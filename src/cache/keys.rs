//! Named cache key families (spec.md §4.G).

pub fn user_info(uid: &str) -> String {
    format!("user_info_{uid}")
}

pub fn contact_info(id: &str) -> String {
    format!("contact_info_{id}")
}

pub fn contact_user_list(uid: &str) -> String {
    format!("contact_user_list_{uid}")
}

pub fn contact_mygroup_list(uid: &str) -> String {
    format!("contact_mygroup_list_{uid}")
}

pub fn my_joined_group_list(uid: &str) -> String {
    format!("my_joined_group_list_{uid}")
}

pub fn group_info(gid: &str) -> String {
    format!("group_info_{gid}")
}

pub fn group_memberlist(gid: &str) -> String {
    format!("group_memberlist_{gid}")
}

pub fn session(uid: &str, peer: &str) -> String {
    format!("session_{uid}_{peer}")
}

pub fn session_list(uid: &str) -> String {
    format!("session_list_{uid}")
}

pub fn group_session_list(uid: &str) -> String {
    format!("group_session_list_{uid}")
}

pub fn group_messagelist(gid: &str) -> String {
    format!("group_messagelist_{gid}")
}

/// Glob pattern matching every `session_<uid>_*` key, used to invalidate a
/// user's direct sessions in bulk when the peer side changes.
pub fn session_pattern(uid: &str) -> String {
    format!("session_{uid}_*")
}

/// Glob pattern matching every `session_*_<peer>` key (peer-side invalidation).
pub fn session_peer_pattern(peer: &str) -> String {
    format!("session_*_{peer}")
}
