//! Strips derivable, volatile and redundant fields from records before they
//! are stored.
//!
//! Each entity kind is described by an [`EntitySchema`]: the fields that can
//! be dropped (and when), the embedded entities to recurse into, and whether
//! the entity as a whole only exists while some counter is positive. The
//! transform is pure and reaches a fixed point after one application.

use serde_json::{Map, Value};

use crate::mirror::record::RecordKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DropWhen {
    Present,
    Zero,
}

#[derive(Debug, Clone, Copy)]
enum Nested {
    One(&'static EntitySchema),
    Each(&'static EntitySchema),
    /// A list that repeats a singular field when it has exactly one entry.
    EachUnlessSingleton(&'static EntitySchema),
}

#[derive(Debug)]
struct EntitySchema {
    name: &'static str,
    drop: &'static [(&'static str, DropWhen)],
    nested: &'static [(&'static str, Nested)],
    /// The entity is removed from its parent unless this counter is positive.
    present_while: Option<&'static str>,
    drop_nulls: bool,
}

static USER: EntitySchema = EntitySchema {
    name: "user",
    drop: &[
        ("avatar_url", DropWhen::Present),
        ("html_url", DropWhen::Present),
        ("gravatar_id", DropWhen::Present),
        ("url", DropWhen::Present),
        ("events_url", DropWhen::Present),
        ("following_url", DropWhen::Present),
        ("followers_url", DropWhen::Present),
        ("gists_url", DropWhen::Present),
        ("organizations_url", DropWhen::Present),
        ("received_events_url", DropWhen::Present),
        ("repos_url", DropWhen::Present),
        ("starred_url", DropWhen::Present),
        ("subscriptions_url", DropWhen::Present),
    ],
    nested: &[],
    present_while: None,
    drop_nulls: false,
};

static LABEL: EntitySchema = EntitySchema {
    name: "label",
    drop: &[("url", DropWhen::Present), ("color", DropWhen::Present)],
    nested: &[],
    present_while: None,
    drop_nulls: false,
};

// Only the identity and title of a milestone are kept.
static MILESTONE: EntitySchema = EntitySchema {
    name: "milestone",
    drop: &[
        ("url", DropWhen::Present),
        ("html_url", DropWhen::Present),
        ("labels_url", DropWhen::Present),
        ("state", DropWhen::Present),
        ("description", DropWhen::Present),
        ("creator", DropWhen::Present),
        ("created_at", DropWhen::Present),
        ("updated_at", DropWhen::Present),
        ("closed_at", DropWhen::Present),
        ("due_on", DropWhen::Present),
        ("open_issues", DropWhen::Present),
        ("closed_issues", DropWhen::Present),
    ],
    nested: &[],
    present_while: None,
    drop_nulls: false,
};

static REACTIONS: EntitySchema = EntitySchema {
    name: "reactions",
    drop: &[
        ("url", DropWhen::Present),
        ("+1", DropWhen::Zero),
        ("-1", DropWhen::Zero),
        ("laugh", DropWhen::Zero),
        ("confused", DropWhen::Zero),
        ("heart", DropWhen::Zero),
        ("hooray", DropWhen::Zero),
        ("rocket", DropWhen::Zero),
        ("eyes", DropWhen::Zero),
    ],
    nested: &[],
    present_while: Some("total_count"),
    drop_nulls: false,
};

static ISSUE: EntitySchema = EntitySchema {
    name: "issue",
    drop: &[("url", DropWhen::Present), ("html_url", DropWhen::Present)],
    nested: &[
        ("user", Nested::One(&USER)),
        ("labels", Nested::Each(&LABEL)),
        ("reactions", Nested::One(&REACTIONS)),
        ("assignee", Nested::One(&USER)),
        ("assignees", Nested::EachUnlessSingleton(&USER)),
        ("milestone", Nested::One(&MILESTONE)),
    ],
    present_while: None,
    drop_nulls: true,
};

static COMMENT: EntitySchema = EntitySchema {
    name: "comment",
    drop: &[
        ("url", DropWhen::Present),
        ("html_url", DropWhen::Present),
        ("issue_url", DropWhen::Present),
    ],
    nested: &[
        ("user", Nested::One(&USER)),
        ("reactions", Nested::One(&REACTIONS)),
    ],
    present_while: None,
    drop_nulls: true,
};

fn schema_for(kind: RecordKind) -> &'static EntitySchema {
    match kind {
        RecordKind::Issue => &ISSUE,
        RecordKind::Comment => &COMMENT,
    }
}

/// Normalizes `record` in place. Returns whether anything was removed.
pub fn normalize(kind: RecordKind, record: &mut Value) -> bool {
    match record.as_object_mut() {
        Some(fields) => clean_entity(schema_for(kind), fields),
        None => false,
    }
}

fn is_zero(value: &Value) -> bool {
    value.as_f64() == Some(0.0)
}

fn is_positive(value: Option<&Value>) -> bool {
    value.and_then(Value::as_f64).is_some_and(|n| n > 0.0)
}

fn clean_entity(schema: &EntitySchema, fields: &mut Map<String, Value>) -> bool {
    let mut cleaned = false;

    if schema.drop_nulls {
        let before = fields.len();
        fields.retain(|_, value| !value.is_null());
        cleaned |= fields.len() != before;
    }

    for &(field, when) in schema.drop {
        let droppable = match (fields.get(field), when) {
            (None, _) => false,
            (Some(_), DropWhen::Present) => true,
            (Some(value), DropWhen::Zero) => is_zero(value),
        };
        if droppable {
            fields.remove(field);
            cleaned = true;
        }
    }

    for &(field, nested) in schema.nested {
        cleaned |= clean_nested(field, nested, fields);
    }
    cleaned
}

fn clean_nested(field: &str, nested: Nested, fields: &mut Map<String, Value>) -> bool {
    match nested {
        Nested::One(schema) => {
            let Some(Value::Object(child)) = fields.get_mut(field) else {
                return false;
            };
            if let Some(counter) = schema.present_while
                && !is_positive(child.get(counter))
            {
                fields.remove(field);
                return true;
            }
            clean_entity(schema, child)
        }
        Nested::Each(schema) => clean_each(schema, fields.get_mut(field)),
        Nested::EachUnlessSingleton(schema) => {
            let singleton = fields
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.len() == 1);
            if singleton {
                tracing::trace!(entity = schema.name, field, "dropping singleton list");
                fields.remove(field);
                return true;
            }
            clean_each(schema, fields.get_mut(field))
        }
    }
}

fn clean_each(schema: &EntitySchema, items: Option<&mut Value>) -> bool {
    let Some(Value::Array(items)) = items else {
        return false;
    };
    let mut cleaned = false;
    for item in items.iter_mut() {
        if let Value::Object(child) = item {
            cleaned |= clean_entity(schema, child);
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_user(login: &str) -> Value {
        json!({
            "login": login,
            "id": 7,
            "avatar_url": "https://avatars/7",
            "html_url": "https://github.com/u",
            "gravatar_id": "",
            "url": "https://api/users/u",
            "events_url": "e",
            "following_url": "f",
            "followers_url": "f",
            "gists_url": "g",
            "organizations_url": "o",
            "received_events_url": "r",
            "repos_url": "r",
            "starred_url": "s",
            "subscriptions_url": "s",
            "type": "User",
            "site_admin": false
        })
    }

    fn fetched_issue() -> Value {
        json!({
            "number": 42,
            "title": "crash on startup",
            "url": "https://api/issues/42",
            "html_url": "https://github.com/issues/42",
            "updated_at": "2016-07-01T12:00:00Z",
            "comments": 2,
            "closed_at": null,
            "user": full_user("alice"),
            "labels": [
                {"id": 1, "name": "Bug", "url": "https://api/labels/Bug", "color": "ff0000"}
            ],
            "assignee": full_user("bob"),
            "assignees": [full_user("bob")],
            "milestone": {
                "id": 9,
                "number": 3,
                "title": "Go1.7",
                "url": "u",
                "html_url": "h",
                "labels_url": "l",
                "state": "open",
                "description": "release",
                "creator": full_user("carol"),
                "created_at": "2016-01-01T00:00:00Z",
                "updated_at": "2016-06-01T00:00:00Z",
                "closed_at": null,
                "due_on": "2016-08-01T00:00:00Z",
                "open_issues": 10,
                "closed_issues": 20
            },
            "reactions": {
                "url": "https://api/issues/42/reactions",
                "total_count": 3,
                "+1": 3,
                "-1": 0,
                "laugh": 0,
                "confused": 0,
                "heart": 0,
                "hooray": 0
            }
        })
    }

    #[test]
    fn issue_is_reduced_to_non_derivable_fields() {
        let mut issue = fetched_issue();
        assert!(normalize(RecordKind::Issue, &mut issue));

        assert_eq!(
            issue,
            json!({
                "number": 42,
                "title": "crash on startup",
                "updated_at": "2016-07-01T12:00:00Z",
                "comments": 2,
                "user": {"login": "alice", "id": 7, "type": "User", "site_admin": false},
                "labels": [{"id": 1, "name": "Bug"}],
                "assignee": {"login": "bob", "id": 7, "type": "User", "site_admin": false},
                "milestone": {"id": 9, "number": 3, "title": "Go1.7"},
                "reactions": {"total_count": 3, "+1": 3}
            })
        );
    }

    #[test]
    fn second_application_is_a_fixed_point() {
        let mut once = fetched_issue();
        normalize(RecordKind::Issue, &mut once);
        let mut twice = once.clone();
        assert!(!normalize(RecordKind::Issue, &mut twice));
        assert_eq!(once, twice);
    }

    #[test]
    fn singleton_assignees_collapse_but_pairs_are_kept() {
        let mut single = json!({"number": 1, "assignees": [full_user("bob")]});
        assert!(normalize(RecordKind::Issue, &mut single));
        assert!(single.get("assignees").is_none());

        let mut pair = json!({"number": 2, "assignees": [full_user("bob"), full_user("eve")]});
        assert!(normalize(RecordKind::Issue, &mut pair));
        assert_eq!(
            pair["assignees"],
            json!([
                {"login": "bob", "id": 7, "type": "User", "site_admin": false},
                {"login": "eve", "id": 7, "type": "User", "site_admin": false}
            ])
        );
    }

    #[test]
    fn empty_reaction_summaries_are_removed() {
        let mut zero = json!({"id": 5, "reactions": {"url": "u", "total_count": 0, "+1": 0}});
        assert!(normalize(RecordKind::Comment, &mut zero));
        assert_eq!(zero, json!({"id": 5}));

        let mut missing_total = json!({"id": 6, "reactions": {"heart": 0}});
        assert!(normalize(RecordKind::Comment, &mut missing_total));
        assert_eq!(missing_total, json!({"id": 6}));
    }

    #[test]
    fn zero_reaction_counters_count_as_a_change() {
        let mut comment = json!({"id": 5, "reactions": {"total_count": 1, "heart": 1, "laugh": 0}});
        assert!(normalize(RecordKind::Comment, &mut comment));
        assert_eq!(comment["reactions"], json!({"total_count": 1, "heart": 1}));
    }

    #[test]
    fn comment_drops_urls_and_cleans_user() {
        let mut comment = json!({
            "id": 100,
            "body": "LGTM",
            "url": "u",
            "html_url": "h",
            "issue_url": "i",
            "user": full_user("dave"),
            "updated_at": "2016-07-01T12:00:00Z"
        });
        assert!(normalize(RecordKind::Comment, &mut comment));
        assert_eq!(
            comment,
            json!({
                "id": 100,
                "body": "LGTM",
                "user": {"login": "dave", "id": 7, "type": "User", "site_admin": false},
                "updated_at": "2016-07-01T12:00:00Z"
            })
        );
    }

    #[test]
    fn null_embedded_entities_are_dropped() {
        let mut issue = json!({"number": 3, "assignee": null, "milestone": null, "title": "t"});
        assert!(normalize(RecordKind::Issue, &mut issue));
        assert_eq!(issue, json!({"number": 3, "title": "t"}));
    }

    #[test]
    fn clean_record_reports_unchanged() {
        let mut issue = json!({"number": 3, "title": "t", "labels": [{"name": "Bug"}]});
        let before = issue.clone();
        assert!(!normalize(RecordKind::Issue, &mut issue));
        assert_eq!(issue, before);
    }

    #[test]
    fn non_object_records_are_left_alone() {
        let mut value = json!([1, 2, 3]);
        assert!(!normalize(RecordKind::Issue, &mut value));
    }
}
