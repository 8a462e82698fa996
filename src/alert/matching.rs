use super::{Event, Subscription};

/// Whether `event` should be notified to the holder of `subscription`.
///
/// Resource identifiers are compared case-insensitively.
pub fn matches(event: &Event, subscription: &Subscription) -> bool {
    if subscription.all {
        return true;
    }

    match subscription.resource_id.as_deref() {
        Some(resource_id) => event.resource_id.eq_ignore_ascii_case(resource_id),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESOURCE: &str = "5f1c7a0e-4f7b-4c55-9e1b-0d4d8c3b2a11";

    fn event_for(resource_id: &str) -> Event {
        Event {
            uid: "evt".to_string(),
            resource_id: resource_id.to_string(),
            ..Event::default()
        }
    }

    fn subscription(all: bool, resource_id: Option<&str>) -> Subscription {
        Subscription {
            id: None,
            email: "someone@example.com".to_string(),
            all,
            resource_id: resource_id.map(str::to_string),
        }
    }

    #[test]
    fn test_all_matches_any_event() {
        let sub = subscription(true, None);
        assert!(matches(&event_for(RESOURCE), &sub));
        assert!(matches(&event_for(""), &sub));
        assert!(matches(&event_for("unrelated"), &sub));
    }

    #[test]
    fn test_all_ignores_resource_id() {
        let sub = subscription(true, Some("00000000-0000-0000-0000-000000000001"));
        assert!(matches(&event_for(RESOURCE), &sub));
    }

    #[test]
    fn test_resource_match_is_case_insensitive() {
        let sub = subscription(false, Some(RESOURCE));
        assert!(matches(&event_for(RESOURCE), &sub));
        assert!(matches(&event_for(&RESOURCE.to_uppercase()), &sub));
    }

    #[test]
    fn test_plain_string_identifiers() {
        let sub = subscription(false, Some("r1"));
        assert!(matches(&event_for("R1"), &sub));
        assert!(!matches(&event_for("r2"), &sub));
    }

    #[test]
    fn test_resource_mismatch() {
        let sub = subscription(false, Some(RESOURCE));
        assert!(!matches(&event_for("00000000-0000-0000-0000-000000000001"), &sub));
        assert!(!matches(&event_for(""), &sub));
    }

    #[test]
    fn test_specific_without_resource_never_matches() {
        let sub = subscription(false, None);
        assert!(!matches(&event_for(RESOURCE), &sub));
        assert!(!matches(&event_for(""), &sub));
    }
}
