//! Value Objects for domain models.
//!
//! Value Objects are immutable objects that represent values in the domain.
//! They are compared by their value, not by identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ValueObjectError;

/// User identifier value object.
///
/// Represents the identity id bound to a connection at handshake.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a new UserId.
    ///
    /// # Arguments
    ///
    /// * `id` - The user identifier string
    ///
    /// # Returns
    ///
    /// A Result containing the UserId or an error if validation fails
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::UserIdEmpty);
        }
        let len = id.len();
        if len > 100 {
            return Err(ValueObjectError::UserIdTooLong {
                max: 100,
                actual: len,
            });
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User display name value object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserName(String);

impl UserName {
    /// Create a new UserName.
    pub fn new(name: String) -> Result<Self, ValueObjectError> {
        if name.is_empty() {
            return Err(ValueObjectError::UserNameEmpty);
        }
        let len = name.len();
        if len > 100 {
            return Err(ValueObjectError::UserNameTooLong {
                max: 100,
                actual: len,
            });
        }
        Ok(Self(name))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Email address value object.
///
/// Validation is intentionally shallow (non-empty, contains `@`, bounded
/// length). The identity provider upstream is the authority on email shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    /// Create a new Email.
    pub fn new(email: String) -> Result<Self, ValueObjectError> {
        if email.is_empty() {
            return Err(ValueObjectError::EmailEmpty);
        }
        let len = email.len();
        if len > 254 {
            return Err(ValueObjectError::EmailTooLong {
                max: 254,
                actual: len,
            });
        }
        if !email.contains('@') {
            return Err(ValueObjectError::EmailInvalidFormat(email));
        }
        Ok(Self(email))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// File identifier value object.
///
/// Represents the resource whose viewer set is tracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(String);

impl FileId {
    /// Create a new FileId.
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::FileIdEmpty);
        }
        let len = id.len();
        if len > 100 {
            return Err(ValueObjectError::FileIdTooLong {
                max: 100,
                actual: len,
            });
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection identifier value object.
///
/// Server-assigned per transport session (UUID v4). A user reconnecting gets
/// a fresh ConnectionId; presence entries carry it so that dead sessions can
/// be swept without an explicit stop message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a new ConnectionId.
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::ConnectionIdEmpty);
        }
        Ok(Self(id))
    }

    /// Create a ConnectionId from a UUID.
    pub fn from_uuid(uuid: uuid::Uuid) -> Result<Self, ValueObjectError> {
        Self::new(uuid.to_string())
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timestamp value object.
///
/// Represents a Unix timestamp in milliseconds (JST).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create a new Timestamp.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the inner i64 value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_new_success() {
        // テスト項目: 有効なユーザー ID を作成できる
        // given (前提条件):
        let id = "u-alice".to_string();

        // when (操作):
        let result = UserId::new(id);

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(result.unwrap().as_str(), "u-alice");
    }

    #[test]
    fn test_user_id_new_empty_fails() {
        // テスト項目: 空のユーザー ID は作成できない
        // given (前提条件):
        let id = "".to_string();

        // when (操作):
        let result = UserId::new(id);

        // then (期待する結果):
        assert!(result.is_err());
        assert_eq!(result.unwrap_err(), ValueObjectError::UserIdEmpty);
    }

    #[test]
    fn test_user_id_new_too_long_fails() {
        // テスト項目: 101 文字以上のユーザー ID は作成できない
        // given (前提条件):
        let id = "a".repeat(101);

        // when (操作):
        let result = UserId::new(id);

        // then (期待する結果):
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err(),
            ValueObjectError::UserIdTooLong {
                max: 100,
                actual: 101
            }
        );
    }

    #[test]
    fn test_user_id_equality() {
        // テスト項目: 同じ値を持つ UserId は等価
        // given (前提条件):
        let id1 = UserId::new("alice".to_string()).unwrap();
        let id2 = UserId::new("alice".to_string()).unwrap();
        let id3 = UserId::new("bob".to_string()).unwrap();

        // then (期待する結果):
        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_email_new_success() {
        // テスト項目: 有効なメールアドレスを作成できる
        // given (前提条件):
        let email = "alice@example.com".to_string();

        // when (操作):
        let result = Email::new(email);

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(result.unwrap().as_str(), "alice@example.com");
    }

    #[test]
    fn test_email_new_missing_at_fails() {
        // テスト項目: `@` を含まないメールアドレスは作成できない
        // given (前提条件):
        let email = "alice.example.com".to_string();

        // when (操作):
        let result = Email::new(email);

        // then (期待する結果):
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ValueObjectError::EmailInvalidFormat(_)
        ));
    }

    #[test]
    fn test_email_new_empty_fails() {
        // テスト項目: 空のメールアドレスは作成できない
        // when (操作):
        let result = Email::new("".to_string());

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), ValueObjectError::EmailEmpty);
    }

    #[test]
    fn test_file_id_new_success() {
        // テスト項目: 有効なファイル ID を作成できる
        // given (前提条件):
        let id = "file-001".to_string();

        // when (操作):
        let result = FileId::new(id);

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(result.unwrap().as_str(), "file-001");
    }

    #[test]
    fn test_file_id_new_empty_fails() {
        // テスト項目: 空のファイル ID は作成できない
        // when (操作):
        let result = FileId::new("".to_string());

        // then (期待する結果):
        assert!(result.is_err());
        assert_eq!(result.unwrap_err(), ValueObjectError::FileIdEmpty);
    }

    #[test]
    fn test_connection_id_from_uuid() {
        // テスト項目: UUID から ConnectionId を作成できる
        // given (前提条件):
        let uuid = uuid::Uuid::new_v4();

        // when (操作):
        let result = ConnectionId::from_uuid(uuid);

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(result.unwrap().as_str(), uuid.to_string());
    }

    #[test]
    fn test_timestamp_new() {
        // テスト項目: タイムスタンプを作成できる
        // given (前提条件):
        let value = 1672498800000i64;

        // when (操作):
        let timestamp = Timestamp::new(value);

        // then (期待する結果):
        assert_eq!(timestamp.value(), value);
    }

    #[test]
    fn test_timestamp_ordering() {
        // テスト項目: タイムスタンプは順序付けできる
        // given (前提条件):
        let ts1 = Timestamp::new(1000);
        let ts2 = Timestamp::new(2000);

        // then (期待する結果):
        assert!(ts1 < ts2);
        assert!(ts2 > ts1);
    }
}
