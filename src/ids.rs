//! Identity prefixing (spec.md §3).
//!
//! Every entity UUID carries a one-character kind prefix used at routing
//! time to distinguish recipients without a lookup.

/// Entity kinds distinguished by their id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    User,
    Group,
    Session,
    Message,
    ContactApply,
}

impl Kind {
    pub fn prefix(self) -> char {
        match self {
            Kind::User => 'U',
            Kind::Group => 'G',
            Kind::Session => 'S',
            Kind::Message => 'M',
            Kind::ContactApply => 'A',
        }
    }
}

/// Generate a new prefixed id for the given entity kind.
pub fn new_id(kind: Kind) -> String {
    format!("{}{}", kind.prefix(), uuid::Uuid::new_v4().simple())
}

/// Check whether an id starts with the given kind's prefix.
pub fn is_kind(id: &str, kind: Kind) -> bool {
    id.starts_with(kind.prefix())
}

/// Classify a receiver id as a direct user or a group, per spec.md §4.F
/// step 5 ("Resolve recipients by receiver-id prefix").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverKind {
    User,
    Group,
}

pub fn classify_receiver(receiver_id: &str) -> Option<ReceiverKind> {
    match receiver_id.chars().next() {
        Some('U') => Some(ReceiverKind::User),
        Some('G') => Some(ReceiverKind::Group),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_are_stable() {
        assert_eq!(Kind::User.prefix(), 'U');
        assert_eq!(Kind::Group.prefix(), 'G');
        assert_eq!(Kind::Session.prefix(), 'S');
        assert_eq!(Kind::Message.prefix(), 'M');
        assert_eq!(Kind::ContactApply.prefix(), 'A');
    }

    #[test]
    fn new_id_carries_prefix() {
        let id = new_id(Kind::Group);
        assert!(is_kind(&id, Kind::Group));
        assert!(!is_kind(&id, Kind::User));
    }

    #[test]
    fn classify_receiver_rejects_unknown_prefix() {
        assert_eq!(classify_receiver("Uabc"), Some(ReceiverKind::User));
        assert_eq!(classify_receiver("Gabc"), Some(ReceiverKind::Group));
        assert_eq!(classify_receiver("Xabc"), None);
        assert_eq!(classify_receiver(""), None);
    }
}
