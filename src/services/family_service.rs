// ==================== FAMILY DIRECTORY ====================
// CRUD over the "families" collection. Members are embedded documents and
// are addressed by their own `_id` inside the parent.

use crate::{
    database::{MongoDB, FAMILIES},
    models::{Family, FamilyMember, FamilyUpdate, HeadDetails, MemberDetails, UpdateTicket},
    utils::AppError,
};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct NewFamily {
    #[serde(flatten)]
    pub head: HeadDetails,
    #[serde(default)]
    pub members: Vec<MemberDetails>,
}

/// Raw body fields that select and carry an update; see `into_update`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct UpdatePayload {
    pub ticket: UpdateTicket,
    pub member_id: Option<String>,
    pub head: Option<HeadDetails>,
    pub member: Option<MemberDetails>,
}

impl UpdatePayload {
    /// Checks that the payload needed by the ticket is present.
    pub fn into_update(self) -> Result<FamilyUpdate, AppError> {
        match self.ticket {
            UpdateTicket::HeadUpdate => {
                let head = self
                    .head
                    .ok_or_else(|| AppError::BadRequest("head details are required for head-update".to_string()))?;
                validate_head(&head)?;
                Ok(FamilyUpdate::Head(head))
            }
            UpdateTicket::MemberUpdate => {
                let raw_id = self
                    .member_id
                    .ok_or_else(|| AppError::BadRequest("member_id is required for member-update".to_string()))?;
                let member_id = parse_id(&raw_id, "member")?;
                let details = self
                    .member
                    .ok_or_else(|| AppError::BadRequest("member details are required for member-update".to_string()))?;
                validate_member(&details)?;
                Ok(FamilyUpdate::Member { member_id, details })
            }
            UpdateTicket::NewMember => {
                let details = self
                    .member
                    .ok_or_else(|| AppError::BadRequest("member details are required for new-member".to_string()))?;
                validate_member(&details)?;
                Ok(FamilyUpdate::NewMember(details))
            }
        }
    }
}

pub fn parse_id(raw: &str, what: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw.trim()).map_err(|_| AppError::BadRequest(format!("Invalid {} ID", what)))
}

fn validate_head(head: &HeadDetails) -> Result<(), AppError> {
    if head.full_name.trim().is_empty() {
        return Err(AppError::BadRequest("full_name is required".to_string()));
    }
    Ok(())
}

fn validate_member(member: &MemberDetails) -> Result<(), AppError> {
    if member.name.trim().is_empty() {
        return Err(AppError::BadRequest("member name is required".to_string()));
    }
    if matches!(member.age, Some(age) if age < 0) {
        return Err(AppError::BadRequest("member age cannot be negative".to_string()));
    }
    Ok(())
}

/// Filter and update document for an update against family `family_id`.
/// Member updates go through the positional operator so only the member
/// whose `_id` matched is rewritten.
pub fn build_update(
    family_id: ObjectId,
    update: FamilyUpdate,
    now: i64,
) -> Result<(Document, Document), AppError> {
    match update {
        FamilyUpdate::Head(head) => Ok((
            doc! { "_id": family_id },
            doc! { "$set": {
                "full_name": head.full_name.trim(),
                "first_name": head.first_name,
                "last_name": head.last_name,
                "current_residence": head.current_residence,
                "native_residence": head.native_residence,
                "updated_at": now,
            } },
        )),
        FamilyUpdate::Member { member_id, details } => {
            let member = FamilyMember::from_details(member_id, details);
            Ok((
                doc! { "_id": family_id, "members._id": member_id },
                doc! { "$set": {
                    "members.$": mongodb::bson::to_bson(&member)?,
                    "updated_at": now,
                } },
            ))
        }
        FamilyUpdate::NewMember(details) => {
            let member = FamilyMember::from_details(ObjectId::new(), details);
            Ok((
                doc! { "_id": family_id },
                doc! {
                    "$push": { "members": mongodb::bson::to_bson(&member)? },
                    "$set": { "updated_at": now },
                },
            ))
        }
    }
}

/// Case-insensitive substring filter over names and residences.
pub fn search_filter(query: &str) -> Result<Document, AppError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::BadRequest("query is required".to_string()));
    }

    let pattern = regex::escape(query);
    let matcher = doc! { "$regex": pattern, "$options": "i" };

    Ok(doc! {
        "$or": [
            { "full_name": matcher.clone() },
            { "first_name": matcher.clone() },
            { "last_name": matcher.clone() },
            { "current_residence": matcher.clone() },
            { "native_residence": matcher.clone() },
            { "members.name": matcher },
        ]
    })
}

pub async fn create_family(db: &MongoDB, request: NewFamily) -> Result<ObjectId, AppError> {
    validate_head(&request.head)?;
    for member in &request.members {
        validate_member(member)?;
    }

    let now = chrono::Utc::now().timestamp();
    let family = Family {
        id: None,
        full_name: request.head.full_name.trim().to_string(),
        first_name: request.head.first_name,
        last_name: request.head.last_name,
        current_residence: request.head.current_residence,
        native_residence: request.head.native_residence,
        members: request
            .members
            .into_iter()
            .map(|details| FamilyMember::from_details(ObjectId::new(), details))
            .collect(),
        image_url: None,
        created_at: now,
        updated_at: now,
    };

    let result = db.collection::<Family>(FAMILIES).insert_one(&family).await?;

    result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| AppError::Database("Inserted family has no ObjectId".to_string()))
}

pub async fn list_families(db: &MongoDB) -> Result<Vec<Family>, AppError> {
    let cursor = db
        .collection::<Family>(FAMILIES)
        .find(doc! {})
        .sort(doc! { "full_name": 1 })
        .await?;

    let families: Vec<Family> = cursor.try_collect().await?;
    Ok(families)
}

pub async fn get_family(db: &MongoDB, family_id: ObjectId) -> Result<Family, AppError> {
    db.collection::<Family>(FAMILIES)
        .find_one(doc! { "_id": family_id })
        .await?
        .ok_or_else(|| AppError::NotFound("Family not found".to_string()))
}

pub async fn search_families(db: &MongoDB, query: &str) -> Result<Vec<Family>, AppError> {
    let filter = search_filter(query)?;

    let cursor = db
        .collection::<Family>(FAMILIES)
        .find(filter)
        .sort(doc! { "full_name": 1 })
        .await?;

    let families: Vec<Family> = cursor.try_collect().await?;
    Ok(families)
}

/// Applies one of the three update paths and returns the stored result.
pub async fn apply_update(
    db: &MongoDB,
    family_id: ObjectId,
    update: FamilyUpdate,
) -> Result<Family, AppError> {
    let not_found = match &update {
        FamilyUpdate::Member { .. } => "Family member not found",
        _ => "Family not found",
    };

    let (filter, update_doc) = build_update(family_id, update, chrono::Utc::now().timestamp())?;

    let result = db
        .collection::<Family>(FAMILIES)
        .update_one(filter, update_doc)
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound(not_found.to_string()));
    }

    get_family(db, family_id).await
}

/// Removes the family and hands back what was stored, image URL included.
pub async fn delete_family(db: &MongoDB, family_id: ObjectId) -> Result<Family, AppError> {
    db.collection::<Family>(FAMILIES)
        .find_one_and_delete(doc! { "_id": family_id })
        .await?
        .ok_or_else(|| AppError::NotFound("Family not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str) -> MemberDetails {
        MemberDetails {
            name: name.into(),
            relation: "Son".into(),
            gotra: "Kashyap".into(),
            qualification: "MA".into(),
            age: Some(30),
            occupation: "Teacher".into(),
        }
    }

    fn head(full_name: &str) -> HeadDetails {
        HeadDetails {
            full_name: full_name.into(),
            first_name: "Ravi".into(),
            last_name: "Sharma".into(),
            current_residence: "Pune".into(),
            native_residence: "Jaipur".into(),
        }
    }

    #[test]
    fn test_head_update_requires_head() {
        let payload = UpdatePayload { ticket: UpdateTicket::HeadUpdate, member_id: None, head: None, member: None };
        assert!(matches!(payload.into_update(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_head_update_rejects_blank_name() {
        let payload = UpdatePayload {
            ticket: UpdateTicket::HeadUpdate,
            member_id: None,
            head: Some(head("   ")),
            member: None,
        };
        assert!(payload.into_update().is_err());
    }

    #[test]
    fn test_member_update_requires_valid_member_id() {
        let missing = UpdatePayload {
            ticket: UpdateTicket::MemberUpdate,
            member_id: None,
            head: None,
            member: Some(member("Amit")),
        };
        assert!(missing.into_update().is_err());

        let malformed = UpdatePayload {
            ticket: UpdateTicket::MemberUpdate,
            member_id: Some("not-an-id".into()),
            head: None,
            member: Some(member("Amit")),
        };
        let err = malformed.into_update().unwrap_err();
        assert_eq!(err.to_string(), "Invalid member ID");
    }

    #[test]
    fn test_new_member_requires_member() {
        let payload = UpdatePayload { ticket: UpdateTicket::NewMember, member_id: None, head: Some(head("X")), member: None };
        assert!(payload.into_update().is_err());
    }

    #[test]
    fn test_negative_age_rejected() {
        let mut details = member("Amit");
        details.age = Some(-1);
        let payload = UpdatePayload { ticket: UpdateTicket::NewMember, member_id: None, head: None, member: Some(details) };
        assert!(payload.into_update().is_err());
    }

    #[test]
    fn test_payload_from_json() {
        let member_id = ObjectId::new();
        let payload: UpdatePayload = serde_json::from_value(serde_json::json!({
            "ticket": "member-update",
            "member_id": member_id.to_hex(),
            "member": { "name": "Amit", "age": "12" }
        }))
        .unwrap();

        match payload.into_update().unwrap() {
            FamilyUpdate::Member { member_id: id, details } => {
                assert_eq!(id, member_id);
                assert_eq!(details.age, Some(12));
            }
            other => panic!("unexpected update: {:?}", other),
        }
    }

    #[test]
    fn test_head_update_document_touches_head_fields_only() {
        let family_id = ObjectId::new();
        let (filter, update) = build_update(family_id, FamilyUpdate::Head(head(" Sharma Family ")), 42).unwrap();

        assert_eq!(filter, doc! { "_id": family_id });
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("full_name").unwrap(), "Sharma Family");
        assert_eq!(set.get_i64("updated_at").unwrap(), 42);
        assert!(!set.contains_key("members"));
        assert!(!set.contains_key("image_url"));
    }

    #[test]
    fn test_member_update_targets_single_member_by_id() {
        let family_id = ObjectId::new();
        let member_id = ObjectId::new();
        let (filter, update) = build_update(
            family_id,
            FamilyUpdate::Member { member_id, details: member("Amit") },
            42,
        )
        .unwrap();

        assert_eq!(filter, doc! { "_id": family_id, "members._id": member_id });

        let set = update.get_document("$set").unwrap();
        // Only the positional slot and the timestamp are written
        let keys: Vec<&String> = set.keys().collect();
        assert_eq!(keys, vec!["members.$", "updated_at"]);

        let replaced = set.get_document("members.$").unwrap();
        assert_eq!(replaced.get_object_id("_id").unwrap(), member_id);
        assert_eq!(replaced.get_str("name").unwrap(), "Amit");
    }

    #[test]
    fn test_new_member_is_appended_with_fresh_id() {
        let family_id = ObjectId::new();
        let (filter, update) = build_update(family_id, FamilyUpdate::NewMember(member("Neha")), 42).unwrap();

        assert_eq!(filter, doc! { "_id": family_id });
        let pushed = update.get_document("$push").unwrap().get_document("members").unwrap();
        assert!(pushed.get_object_id("_id").is_ok());
        assert_eq!(pushed.get_str("name").unwrap(), "Neha");
        assert_eq!(update.get_document("$set").unwrap().get_i64("updated_at").unwrap(), 42);
    }

    #[test]
    fn test_search_filter_escapes_regex() {
        let filter = search_filter("  a.b(c)  ").unwrap();
        let clauses = filter.get_array("$or").unwrap();
        assert_eq!(clauses.len(), 6);

        let first = clauses[0].as_document().unwrap().get_document("full_name").unwrap();
        assert_eq!(first.get_str("$regex").unwrap(), r"a\.b\(c\)");
        assert_eq!(first.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn test_search_filter_rejects_empty_query() {
        assert!(matches!(search_filter("   "), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_new_family_flattened_from_json() {
        let request: NewFamily = serde_json::from_value(serde_json::json!({
            "full_name": "Sharma Family",
            "first_name": "Ravi",
            "members": [{ "name": "Asha", "relation": "Wife" }]
        }))
        .unwrap();
        assert_eq!(request.head.full_name, "Sharma Family");
        assert_eq!(request.members.len(), 1);
        assert!(request.head.native_residence.is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_member_update_leaves_siblings_untouched() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let db = MongoDB::new(&uri, "news_family_test").await.unwrap();

        let id = create_family(&db, NewFamily {
            head: head("Update Test Family"),
            members: vec![member("First"), member("Second")],
        })
        .await
        .unwrap();

        let before = get_family(&db, id).await.unwrap();
        let target = before.members[0].id;

        let mut details = member("First Renamed");
        details.age = Some(31);
        let after = apply_update(&db, id, FamilyUpdate::Member { member_id: target, details }).await.unwrap();

        assert_eq!(after.members.len(), 2);
        assert_eq!(after.members[0].id, target);
        assert_eq!(after.members[0].name, "First Renamed");
        assert_eq!(after.members[1], before.members[1]);

        let missing = apply_update(&db, id, FamilyUpdate::Member { member_id: ObjectId::new(), details: member("Ghost") }).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let appended = apply_update(&db, id, FamilyUpdate::NewMember(member("Third"))).await.unwrap();
        assert_eq!(appended.members.len(), 3);

        let deleted = delete_family(&db, id).await.unwrap();
        assert_eq!(deleted.id, Some(id));
        assert!(matches!(get_family(&db, id).await, Err(AppError::NotFound(_))));
    }
}
