use mongodb::bson::{oid::ObjectId, Bson};
use serde::{Deserialize, Serialize};

/// Family record (collection "families"). Members are embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Family {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub full_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub current_residence: String,
    #[serde(default)]
    pub native_residence: String,
    #[serde(default)]
    pub members: Vec<FamilyMember>,
    /// Filled in by the background upload after the record is created
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyMember {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub relation: String,
    #[serde(default)]
    pub gotra: String,
    #[serde(default)]
    pub qualification: String,
    #[serde(default, deserialize_with = "deserialize_age")]
    pub age: Option<i32>,
    #[serde(default)]
    pub occupation: String,
}

impl FamilyMember {
    pub fn from_details(id: ObjectId, details: MemberDetails) -> Self {
        FamilyMember {
            id,
            name: details.name,
            relation: details.relation,
            gotra: details.gotra,
            qualification: details.qualification,
            age: details.age,
            occupation: details.occupation,
        }
    }
}

/// Head-of-family fields, i.e. everything except members and image.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct HeadDetails {
    pub full_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub current_residence: String,
    #[serde(default)]
    pub native_residence: String,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct MemberDetails {
    pub name: String,
    #[serde(default)]
    pub relation: String,
    #[serde(default)]
    pub gotra: String,
    #[serde(default)]
    pub qualification: String,
    /// Accepts a number or a numeric string
    #[serde(default, deserialize_with = "deserialize_age")]
    pub age: Option<i32>,
    #[serde(default)]
    pub occupation: String,
}

/// Forms send the age either as a number or as text.
fn deserialize_age<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Bson::deserialize(deserializer)?;
    match value {
        Bson::Null => Ok(None),
        Bson::Int32(n) => Ok(Some(n)),
        Bson::Int64(n) => i32::try_from(n)
            .map(Some)
            .map_err(|_| serde::de::Error::custom("age out of range")),
        Bson::Double(f) if f.fract() == 0.0 && f >= 0.0 && f <= i32::MAX as f64 => {
            Ok(Some(f as i32))
        }
        Bson::String(s) if s.trim().is_empty() => Ok(None),
        Bson::String(s) => s
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid age: {}", s))),
        _ => Err(serde::de::Error::custom("age must be a number")),
    }
}

/// Selects which of the three update paths `/update-family-member` takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateTicket {
    HeadUpdate,
    MemberUpdate,
    NewMember,
}

/// A validated update, ready to be turned into a Mongo update document.
#[derive(Debug, Clone)]
pub enum FamilyUpdate {
    Head(HeadDetails),
    Member { member_id: ObjectId, details: MemberDetails },
    NewMember(MemberDetails),
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FamilyMemberResponse {
    pub id: String,
    pub name: String,
    pub relation: String,
    pub gotra: String,
    pub qualification: String,
    pub age: Option<i32>,
    pub occupation: String,
}

impl From<FamilyMember> for FamilyMemberResponse {
    fn from(member: FamilyMember) -> Self {
        FamilyMemberResponse {
            id: member.id.to_hex(),
            name: member.name,
            relation: member.relation,
            gotra: member.gotra,
            qualification: member.qualification,
            age: member.age,
            occupation: member.occupation,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FamilyResponse {
    pub id: String,
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    pub current_residence: String,
    pub native_residence: String,
    pub members: Vec<FamilyMemberResponse>,
    pub image_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Family> for FamilyResponse {
    fn from(family: Family) -> Self {
        FamilyResponse {
            id: family.id.map(|id| id.to_hex()).unwrap_or_default(),
            full_name: family.full_name,
            first_name: family.first_name,
            last_name: family.last_name,
            current_residence: family.current_residence,
            native_residence: family.native_residence,
            members: family.members.into_iter().map(FamilyMemberResponse::from).collect(),
            image_url: family.image_url,
            created_at: family.created_at,
            updated_at: family.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_age_accepts_number_or_text() {
        let from_number: MemberDetails =
            serde_json::from_value(serde_json::json!({ "name": "Asha", "age": 31 })).unwrap();
        assert_eq!(from_number.age, Some(31));

        let from_text: MemberDetails =
            serde_json::from_value(serde_json::json!({ "name": "Asha", "age": "31" })).unwrap();
        assert_eq!(from_text.age, Some(31));

        let blank: MemberDetails =
            serde_json::from_value(serde_json::json!({ "name": "Asha", "age": "" })).unwrap();
        assert_eq!(blank.age, None);

        let missing: MemberDetails =
            serde_json::from_value(serde_json::json!({ "name": "Asha" })).unwrap();
        assert_eq!(missing.age, None);
    }

    #[test]
    fn test_member_age_rejects_garbage() {
        let result = serde_json::from_value::<MemberDetails>(
            serde_json::json!({ "name": "Asha", "age": "thirty" }),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_ticket_names() {
        let t: UpdateTicket = serde_json::from_str("\"head-update\"").unwrap();
        assert_eq!(t, UpdateTicket::HeadUpdate);
        let t: UpdateTicket = serde_json::from_str("\"member-update\"").unwrap();
        assert_eq!(t, UpdateTicket::MemberUpdate);
        let t: UpdateTicket = serde_json::from_str("\"new-member\"").unwrap();
        assert_eq!(t, UpdateTicket::NewMember);
        assert!(serde_json::from_str::<UpdateTicket>("\"delete\"").is_err());
    }

    #[test]
    fn test_family_bson_round_trip_keeps_member_ids() {
        let member_id = ObjectId::new();
        let family = Family {
            id: Some(ObjectId::new()),
            full_name: "Sharma Family".into(),
            first_name: "Ravi".into(),
            last_name: "Sharma".into(),
            current_residence: "Pune".into(),
            native_residence: "Jaipur".into(),
            members: vec![FamilyMember {
                id: member_id,
                name: "Asha".into(),
                relation: "Daughter".into(),
                gotra: "Bharadwaj".into(),
                qualification: "BSc".into(),
                age: Some(24),
                occupation: "Engineer".into(),
            }],
            image_url: None,
            created_at: 1,
            updated_at: 1,
        };

        let doc = mongodb::bson::to_document(&family).unwrap();
        assert!(!doc.contains_key("image_url"));
        let back: Family = mongodb::bson::from_document(doc).unwrap();
        assert_eq!(back.members[0].id, member_id);
        assert_eq!(back.members[0].age, Some(24));
    }

    #[test]
    fn test_response_uses_hex_ids() {
        let id = ObjectId::new();
        let family = Family {
            id: Some(id),
            full_name: "Sharma Family".into(),
            first_name: String::new(),
            last_name: String::new(),
            current_residence: String::new(),
            native_residence: String::new(),
            members: vec![],
            image_url: Some("https://res.cloudinary.com/demo/image/upload/x.jpg".into()),
            created_at: 0,
            updated_at: 0,
        };
        let response = FamilyResponse::from(family);
        assert_eq!(response.id, id.to_hex());
        assert!(response.image_url.is_some());
    }
}
