//! Account and entitlement messages.

use serde_json::json;

use crate::protocol::message::{Body, Message, Method, Target};

/// Groups the current user belongs to.
///
/// Also used as a cheap authenticated call to check session validity.
#[derive(Debug, Clone, Default)]
pub struct GroupsMessage;

impl Message for GroupsMessage {
    fn method(&self) -> Method {
        Method::Get
    }

    fn path(&self) -> String {
        "/Account/GetGroupsCurrentUserBelongsTo".to_string()
    }

    fn failure_message(&self) -> String {
        "Failed to get groups for the current user".to_string()
    }
}

/// Claims of the current user from the identity server
/// (`GET {authority}/connect/userinfo`).
#[derive(Debug, Clone, Default)]
pub struct UserInfoMessage;

impl Message for UserInfoMessage {
    fn method(&self) -> Method {
        Method::Get
    }

    fn target(&self) -> Target {
        Target::Authority
    }

    fn path(&self) -> String {
        "/connect/userinfo".to_string()
    }

    fn failure_message(&self) -> String {
        "Failed to get user info".to_string()
    }
}

/// Table lookup for entitlements.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRef<'a> {
    /// Numeric table id.
    Id(i64),
    /// Table GUID.
    Guid(&'a str),
    /// Domain and table name.
    Name { domain: &'a str, table: &'a str },
}

/// Entitlements of the current user on a table.
#[derive(Debug, Clone)]
pub struct TableEntitlementsMessage<'a> {
    pub table: TableRef<'a>,
}

impl Message for TableEntitlementsMessage<'_> {
    fn path(&self) -> String {
        let suffix = match self.table {
            TableRef::Id(_) => "Id",
            TableRef::Guid(_) => "Guid",
            TableRef::Name { .. } => "Name",
        };
        format!("/Account/GetTableEntitlementsBy{}", suffix)
    }

    fn body(&self) -> Body {
        Body::Json(match self.table {
            TableRef::Id(id) => json!({ "tableId": id }),
            TableRef::Guid(guid) => json!({ "tableGuid": guid }),
            TableRef::Name { domain, table } => json!({ "domainName": domain, "tableName": table }),
        })
    }

    fn failure_message(&self) -> String {
        format!("Failed to get table entitlements for {:?}", self.table)
    }
}
