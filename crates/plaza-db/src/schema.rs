//! Per-collection schemas: the fixed column set every record carries, the
//! type each column holds, and validation of caller-supplied fields. Both
//! store implementations build canonical records through [`new_record`] so
//! their behavior stays aligned.

use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use uuid::Uuid;

use plaza_types::record::Record;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    ProfileLikes,
    ChatRooms,
    Messages,
}

impl Collection {
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::ProfileLikes => "profile_likes",
            Collection::ChatRooms => "chat_rooms",
            Collection::Messages => "messages",
        }
    }

    pub(crate) fn columns(&self) -> &'static [Column] {
        match self {
            Collection::Users => USER_COLUMNS,
            Collection::ProfileLikes => PROFILE_LIKE_COLUMNS,
            Collection::ChatRooms => CHAT_ROOM_COLUMNS,
            Collection::Messages => MESSAGE_COLUMNS,
        }
    }

    pub(crate) fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns().iter().find(|column| column.name == name)
    }

    pub(crate) fn has_updated_at(&self) -> bool {
        self.column("updated_at").is_some()
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnType {
    Text,
    Uuid,
    Timestamp,
    Real,
    Bool,
}

#[derive(Debug)]
pub(crate) struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub required: bool,
}

const fn col(name: &'static str, ty: ColumnType, required: bool) -> Column {
    Column { name, ty, required }
}

static USER_COLUMNS: &[Column] = &[
    col("id", ColumnType::Uuid, false),
    col("username", ColumnType::Text, true),
    col("email", ColumnType::Text, true),
    col("full_name", ColumnType::Text, true),
    col("bio", ColumnType::Text, false),
    col("profile_image", ColumnType::Text, false),
    col("location", ColumnType::Text, false),
    col("latitude", ColumnType::Real, false),
    col("longitude", ColumnType::Real, false),
    col("created_at", ColumnType::Timestamp, false),
    col("updated_at", ColumnType::Timestamp, false),
];

static PROFILE_LIKE_COLUMNS: &[Column] = &[
    col("id", ColumnType::Uuid, false),
    col("user_id", ColumnType::Uuid, true),
    col("liked_user_id", ColumnType::Uuid, true),
    col("created_at", ColumnType::Timestamp, false),
];

static CHAT_ROOM_COLUMNS: &[Column] = &[
    col("id", ColumnType::Uuid, false),
    col("user1_id", ColumnType::Uuid, true),
    col("user2_id", ColumnType::Uuid, true),
    col("created_at", ColumnType::Timestamp, false),
    col("updated_at", ColumnType::Timestamp, false),
];

static MESSAGE_COLUMNS: &[Column] = &[
    col("id", ColumnType::Uuid, false),
    col("chat_room_id", ColumnType::Uuid, true),
    col("sender_id", ColumnType::Uuid, true),
    col("content", ColumnType::Text, false),
    col("message_type", ColumnType::Text, true),
    col("file_url", ColumnType::Text, false),
    col("file_name", ColumnType::Text, false),
    col("file_type", ColumnType::Text, false),
    col("is_read", ColumnType::Bool, false),
    col("created_at", ColumnType::Timestamp, false),
];

/// Timestamps are stored as fixed-width RFC 3339 strings so lexicographic
/// order matches chronological order in both store implementations.
pub(crate) fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Check that a caller-supplied value fits the column's type. `Null` is
/// accepted on optional columns only.
pub(crate) fn check_value(
    collection: Collection,
    column: &Column,
    value: &Value,
) -> Result<(), StoreError> {
    let reject = |reason: &str| StoreError::InvalidValue {
        collection,
        field: column.name.to_string(),
        reason: reason.to_string(),
    };

    match value {
        Value::Null => {
            if column.required {
                Err(reject("null on a required field"))
            } else {
                Ok(())
            }
        }
        Value::String(text) => match column.ty {
            ColumnType::Text => Ok(()),
            ColumnType::Uuid => text
                .parse::<Uuid>()
                .map(|_| ())
                .map_err(|_| reject("not a uuid")),
            ColumnType::Timestamp => chrono::DateTime::parse_from_rfc3339(text)
                .map(|_| ())
                .map_err(|_| reject("not an RFC 3339 timestamp")),
            _ => Err(reject("unexpected string")),
        },
        Value::Number(_) => match column.ty {
            ColumnType::Real => Ok(()),
            _ => Err(reject("unexpected number")),
        },
        Value::Bool(_) => match column.ty {
            ColumnType::Bool => Ok(()),
            _ => Err(reject("unexpected boolean")),
        },
        Value::Array(_) | Value::Object(_) => Err(reject("nested values are not storable")),
    }
}

/// Reject a filter/order field that is not part of the collection schema.
pub(crate) fn check_field(
    collection: Collection,
    field: &str,
) -> Result<&'static Column, StoreError> {
    collection.column(field).ok_or_else(|| StoreError::UnknownField {
        collection,
        field: field.to_string(),
    })
}

/// Build the canonical record for an insert: validates the supplied fields,
/// generates `id` unless the caller provided one (profile creation reuses
/// the auth identity's id), stamps timestamps unless supplied, and fills
/// boolean defaults.
pub(crate) fn new_record(collection: Collection, fields: Record) -> Result<Record, StoreError> {
    for key in fields.keys() {
        check_field(collection, key)?;
    }

    let id = match fields.get("id") {
        None | Some(Value::Null) => Uuid::new_v4(),
        Some(Value::String(text)) => text.parse::<Uuid>().map_err(|_| StoreError::InvalidValue {
            collection,
            field: "id".to_string(),
            reason: "not a uuid".to_string(),
        })?,
        Some(_) => {
            return Err(StoreError::InvalidValue {
                collection,
                field: "id".to_string(),
                reason: "not a uuid".to_string(),
            });
        }
    };

    let now = timestamp_now();
    let mut record = Record::new();
    for column in collection.columns() {
        let value = match column.name {
            "id" => Value::String(id.to_string()),
            "created_at" | "updated_at" => match fields.get(column.name) {
                Some(supplied) if !supplied.is_null() => {
                    check_value(collection, column, supplied)?;
                    supplied.clone()
                }
                _ => Value::String(now.clone()),
            },
            name => match fields.get(name) {
                Some(supplied) => {
                    check_value(collection, column, supplied)?;
                    supplied.clone()
                }
                None if column.required => {
                    return Err(StoreError::MissingField {
                        collection,
                        field: name.to_string(),
                    });
                }
                None if column.ty == ColumnType::Bool => Value::Bool(false),
                None => Value::Null,
            },
        };
        record.insert(column.name.to_string(), value);
    }

    Ok(record)
}

/// Validate an update patch: every field must be a known, mutable column
/// with a type-correct value.
pub(crate) fn check_patch(collection: Collection, fields: &Record) -> Result<(), StoreError> {
    for (key, value) in fields {
        if key == "id" {
            return Err(StoreError::InvalidValue {
                collection,
                field: "id".to_string(),
                reason: "id is immutable".to_string(),
            });
        }
        let column = check_field(collection, key)?;
        check_value(collection, column, value)?;
    }
    Ok(())
}
