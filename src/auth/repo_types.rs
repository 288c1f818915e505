use sqlx::FromRow;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,          // assigned by the database
    pub username: String, // unique, case-sensitive
    pub email: String,    // unique
    pub hash: String,     // PBKDF2 digest, hex
    pub salt: String,     // per-account, base64
    pub is_admin: bool,
}

/// Fields written when a user registers.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hash: String,
    pub salt: String,
    pub is_admin: bool,
}
